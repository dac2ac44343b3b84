//! EventLink Core
//!
//! Core types and error handling shared across EventLink components.
//!
//! This crate provides:
//! - The load-time error taxonomy and result alias
//! - Prediction and recommendation result types handed to callers

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{ItemMetadata, Prediction, RankedResult};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{ItemMetadata, Prediction, RankedResult};
}
