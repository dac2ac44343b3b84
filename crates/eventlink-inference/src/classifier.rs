//! Classifier trait and the TF-IDF intent classifier

use crate::gate::{ConfidenceGate, ThresholdTable, OUT_OF_SCOPE};
use crate::model_loader::IntentModel;
use crate::telemetry::{CLASSIFICATIONS_TOTAL, INFERENCE_LATENCY_US};
use eventlink_core::Prediction;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Trait for all text classifiers
pub trait Classifier: Send + Sync {
    /// Classify the given text
    fn classify(&self, text: &str) -> Prediction;

    /// Class labels in model order
    fn labels(&self) -> &[String];

    /// Get the classifier name
    fn name(&self) -> &str;
}

/// Intent classifier backed by a loaded [`IntentModel`]
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    model: Arc<IntentModel>,
    gate: ConfidenceGate,
}

impl IntentClassifier {
    /// Wrap a model, gating to [`OUT_OF_SCOPE`]
    pub fn new(model: Arc<IntentModel>) -> Self {
        Self::with_reserved_label(model, OUT_OF_SCOPE)
    }

    pub fn with_reserved_label(model: Arc<IntentModel>, reserved_label: impl Into<String>) -> Self {
        let gate = ConfidenceGate::new(model.classes(), reserved_label);
        Self { model, gate }
    }

    pub fn model(&self) -> &IntentModel {
        &self.model
    }

    pub fn gate(&self) -> &ConfidenceGate {
        &self.gate
    }

    /// Classify and then gate with a default and per-class thresholds
    pub fn classify_gated(
        &self,
        text: &str,
        default_threshold: f64,
        per_class: &HashMap<String, f64>,
    ) -> Prediction {
        self.gate.gate(self.classify(text), default_threshold, per_class)
    }

    /// Classify and then gate against a threshold table
    pub fn classify_with(&self, text: &str, thresholds: &ThresholdTable) -> Prediction {
        self.gate.gate_with(self.classify(text), thresholds)
    }
}

impl Classifier for IntentClassifier {
    fn classify(&self, text: &str) -> Prediction {
        let start = Instant::now();

        let features = self.model.vectorizer().vectorize(text);
        let prediction = self.model.classifier().classify(&features);

        metrics::counter!(CLASSIFICATIONS_TOTAL, "label" => prediction.top1_label.clone())
            .increment(1);
        metrics::histogram!(INFERENCE_LATENCY_US, "op" => "classify")
            .record(start.elapsed().as_micros() as f64);
        tracing::debug!(
            "Classified as '{}' ({:.3}), runner-up '{}' ({:.3})",
            prediction.top1_label,
            prediction.top1_prob,
            prediction.top2_label,
            prediction.top2_prob
        );

        prediction
    }

    fn labels(&self) -> &[String] {
        self.model.classes()
    }

    fn name(&self) -> &str {
        "intent"
    }
}
