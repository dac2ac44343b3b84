//! Intent evaluation: empty-input handling, rule overrides, then the gated model

use crate::classifier::{Classifier, IntentClassifier};
use crate::gate::ThresholdTable;
use crate::rules::RuleSet;
use eventlink_core::Prediction;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What produced the final prediction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum EvaluationSource {
    /// The gated classifier
    Model,
    /// A rule override, by rule name
    Rule(String),
    /// Empty or whitespace-only input
    EmptyInput,
}

/// Result of [`IntentEvaluator::evaluate`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Final prediction after rules and gating
    pub prediction: Prediction,

    /// Ungated classifier output for the same text
    pub raw: Prediction,

    pub source: EvaluationSource,
}

/// Gated intent classifier with rule overrides
#[derive(Debug, Clone)]
pub struct IntentEvaluator {
    classifier: IntentClassifier,
    thresholds: ThresholdTable,
    rules: RuleSet,
}

impl IntentEvaluator {
    pub fn new(classifier: IntentClassifier, thresholds: ThresholdTable, rules: RuleSet) -> Self {
        Self {
            classifier,
            thresholds,
            rules,
        }
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    pub fn thresholds(&self) -> &ThresholdTable {
        &self.thresholds
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Classify `text`, applying empty-input handling and rules before the gate
    pub fn evaluate(&self, text: &str) -> Evaluation {
        let raw = self.classifier.classify(text);
        let gate = self.classifier.gate();

        if text.trim().is_empty() {
            if let Some(forced) = gate.force(&raw) {
                return Evaluation {
                    prediction: forced,
                    raw,
                    source: EvaluationSource::EmptyInput,
                };
            }
        }

        if let Some(rule) = self.rules.first_match(text) {
            tracing::debug!("Rule '{}' matched, routing to '{}'", rule.name(), rule.label());
            return Evaluation {
                prediction: rule.prediction(self.classifier.labels(), gate.reserved_label()),
                raw,
                source: EvaluationSource::Rule(rule.name().to_string()),
            };
        }

        Evaluation {
            prediction: gate.gate_with(raw.clone(), &self.thresholds),
            raw,
            source: EvaluationSource::Model,
        }
    }
}

/// Load per-class thresholds, falling back to the default alone on failure
///
/// A missing or malformed thresholds file is not fatal for inference.
pub fn thresholds_or_default(path: Option<&Path>, labels: &[String], default: f64) -> ThresholdTable {
    let Some(path) = path else {
        return ThresholdTable::new(default);
    };

    match ThresholdTable::from_path(path, labels, default) {
        Ok(table) => {
            tracing::info!("Loaded {} per-class thresholds from {}", table.len(), path.display());
            table
        }
        Err(e) => {
            tracing::warn!("Thresholds unavailable ({}), using default {:.2}", e, default);
            ThresholdTable::new(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_loader::IntentModel;
    use serde_json::json;
    use std::sync::Arc;

    fn evaluator(default_threshold: f64) -> IntentEvaluator {
        let model = IntentModel::from_value(&json!({
            "classes": ["event_date_time", "event_location", "out_of_scope"],
            "vocab": {"venue": 0, "where": 1, "pizza": 2},
            "analyzer": "token",
            "coef": [[0.0, 0.0, 0.0], [3.0, 3.0, 0.0], [0.0, 0.0, 3.0]],
            "intercept": [0.0, 0.0, 0.0]
        }))
        .unwrap();
        IntentEvaluator::new(
            IntentClassifier::new(Arc::new(model)),
            ThresholdTable::new(default_threshold),
            RuleSet::builtin().unwrap(),
        )
    }

    #[test]
    fn test_empty_input_forced() {
        let eval = evaluator(0.0).evaluate("   ");
        assert_eq!(eval.source, EvaluationSource::EmptyInput);
        assert_eq!(eval.prediction.top1_label, "out_of_scope");
        assert_eq!(eval.prediction.top1_prob, 1.0);
    }

    #[test]
    fn test_rule_override() {
        let eval = evaluator(0.3).evaluate("When does it begin?");
        assert_eq!(eval.source, EvaluationSource::Rule("date_time_question".into()));
        assert_eq!(eval.prediction.top1_label, "event_date_time");
        assert_eq!(eval.prediction.top2_label, "out_of_scope");
        assert_eq!(eval.prediction.probabilities, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_model_path_is_gated() {
        let eval = evaluator(0.3).evaluate("where is the venue");
        assert_eq!(eval.source, EvaluationSource::Model);
        assert_eq!(eval.prediction.top1_label, "event_location");

        let eval = evaluator(0.999).evaluate("where is the venue");
        assert_eq!(eval.prediction.top1_label, "out_of_scope");
        assert_eq!(eval.raw.top1_label, "event_location");
    }

    #[test]
    fn test_thresholds_fallback() {
        let labels: Vec<String> = vec!["a".into()];
        let table = thresholds_or_default(Some(Path::new("/nonexistent/thresholds.json")), &labels, 0.4);
        assert_eq!(table, ThresholdTable::new(0.4));
        assert!(thresholds_or_default(None, &labels, 0.2).is_empty());
    }
}
