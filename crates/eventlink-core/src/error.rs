//! Error types for EventLink

use std::path::PathBuf;
use std::sync::Arc;

/// Result type alias using EventLink's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for EventLink operations
///
/// Every variant is a load-time failure. Inference itself is total and never
/// produces an `Error`. The type is `Clone` so a cached load failure can be
/// handed to every caller that raced for it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A required artifact field is absent or has the wrong JSON type
    #[error("model schema error: {0}")]
    Schema(String),

    /// Dimensions in the artifact disagree with each other
    #[error("model shape error: {0}")]
    Shape(String),

    /// The artifact could not be read from its source
    #[error("failed to read artifact {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The artifact is not valid JSON
    #[error("malformed artifact: {0}")]
    Parse(#[source] Arc<serde_json::Error>),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new schema error
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Create a new shape error
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::Shape(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a read error for the artifact at `path`
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    /// Whether the failure came from the artifact's contents rather than its source
    pub fn is_model_error(&self) -> bool {
        matches!(self, Self::Schema(_) | Self::Shape(_) | Self::Parse(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(Arc::new(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::schema("missing 'classes' array");
        assert_eq!(err.to_string(), "model schema error: missing 'classes' array");

        let err = Error::read(
            "assets/model.json",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        assert!(err.to_string().contains("assets/model.json"));
        assert!(!err.is_model_error());
    }

    #[test]
    fn test_parse_error_is_clonable() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        let copy = err.clone();
        assert!(copy.is_model_error());
        assert_eq!(err.to_string(), copy.to_string());
    }
}
