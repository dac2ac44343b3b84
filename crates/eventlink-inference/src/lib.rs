//! EventLink Inference
//!
//! On-device intent classification and event recommendation from exported
//! linear TF-IDF artifacts.
//!
//! Components are organized by stage:
//! - Loading: tolerant JSON artifact parsing into canonical models
//! - Intent: vectorizer, linear classifier, confidence gate, rule overrides
//! - Recommendation: cosine ranking of events against an interest query
//! - Post-processing: cue-based guardrails and clarification
//!
//! Inference is pure and synchronous. Models are loaded once through
//! [`ModelCache`] and shared read-only.

pub mod cache;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod evaluator;
pub mod gate;
pub mod guardrails;
pub mod linear;
pub mod model_loader;
pub mod ranker;
pub mod rules;
pub mod schema;
pub mod telemetry;
pub mod vectorizer;

pub use cache::ModelCache;
pub use classifier::{Classifier, IntentClassifier};
pub use config::{EngineConfig, IntentConfig, RecommenderConfig};
pub use engine::{Answer, Engine};
pub use evaluator::{thresholds_or_default, Evaluation, EvaluationSource, IntentEvaluator};
pub use gate::{ConfidenceGate, ThresholdTable, OUT_OF_SCOPE};
pub use guardrails::{clarify_message, Decision, GuardrailConfig, Guardrails};
pub use linear::{softmax, top_two, LinearClassifier};
pub use model_loader::{ArtifactSource, IntentModel, RecommenderItem, RecommenderModel};
pub use ranker::{category_matches, SimilarityRanker};
pub use rules::{RuleOverride, RuleSet, RuleSpec};
pub use schema::VocabShape;
pub use telemetry::describe_metrics;
pub use vectorizer::{AnalyzerConfig, AnalyzerMode, SparseVector, Vectorizer, Vocabulary};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::{Classifier, IntentClassifier};
    pub use crate::engine::Engine;
    pub use crate::gate::{ConfidenceGate, OUT_OF_SCOPE};
    pub use crate::model_loader::{IntentModel, RecommenderModel};
    pub use crate::ranker::SimilarityRanker;
    pub use eventlink_core::prelude::*;
}
