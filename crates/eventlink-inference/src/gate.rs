//! Confidence gating of classifier predictions
//!
//! A prediction whose top-1 probability falls below its threshold is
//! rerouted to a reserved label so callers have a single fallback path.

use eventlink_core::{Error, Prediction, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

use crate::telemetry::GATE_FALLBACKS_TOTAL;

/// Reserved label for low-confidence or off-domain input
pub const OUT_OF_SCOPE: &str = "out_of_scope";

/// Default threshold plus optional per-class overrides
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
    default: f64,
    per_class: HashMap<String, f64>,
}

impl ThresholdTable {
    /// Table with only a default threshold
    pub fn new(default: f64) -> Self {
        Self {
            default,
            per_class: HashMap::new(),
        }
    }

    pub fn with_class(mut self, label: impl Into<String>, threshold: f64) -> Self {
        self.per_class.insert(label.into(), threshold);
        self
    }

    /// Parse a flat `{"label": threshold}` object
    ///
    /// Labels not in `known_labels` are ignored.
    pub fn from_json_str(json: &str, known_labels: &[String], default: f64) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        let obj = value
            .as_object()
            .ok_or_else(|| Error::schema("thresholds must be a JSON object"))?;

        let mut table = Self::new(default);
        for label in known_labels {
            if let Some(v) = obj.get(label) {
                let thr = v
                    .as_f64()
                    .ok_or_else(|| Error::schema(format!("threshold for '{}' is not a number", label)))?;
                table.per_class.insert(label.clone(), thr);
            }
        }
        Ok(table)
    }

    pub fn from_path(path: impl AsRef<Path>, known_labels: &[String], default: f64) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| Error::read(path, e))?;
        Self::from_json_str(&json, known_labels, default)
    }

    pub fn default_threshold(&self) -> f64 {
        self.default
    }

    pub fn per_class(&self) -> &HashMap<String, f64> {
        &self.per_class
    }

    /// Effective threshold for `label`
    pub fn get(&self, label: &str) -> f64 {
        self.per_class.get(label).copied().unwrap_or(self.default)
    }

    /// Number of per-class overrides
    pub fn len(&self) -> usize {
        self.per_class.len()
    }

    pub fn is_empty(&self) -> bool {
        self.per_class.is_empty()
    }
}

/// Reroutes low-confidence predictions to the reserved label
#[derive(Debug, Clone)]
pub struct ConfidenceGate {
    labels: Vec<String>,
    reserved_label: String,
    reserved_index: Option<usize>,
}

impl ConfidenceGate {
    /// Create a gate for a model with the given class labels
    ///
    /// If `reserved_label` is not one of `labels` the gate never reroutes.
    pub fn new(labels: &[String], reserved_label: impl Into<String>) -> Self {
        let reserved_label = reserved_label.into();
        let reserved_index = labels.iter().position(|l| *l == reserved_label);
        Self {
            labels: labels.to_vec(),
            reserved_label,
            reserved_index,
        }
    }

    pub fn reserved_label(&self) -> &str {
        &self.reserved_label
    }

    /// Whether the reserved label is one of the model's classes
    pub fn is_active(&self) -> bool {
        self.reserved_index.is_some()
    }

    /// Apply a default and optional per-class thresholds to `prediction`
    pub fn gate(
        &self,
        prediction: Prediction,
        default_threshold: f64,
        per_class: &HashMap<String, f64>,
    ) -> Prediction {
        let threshold = per_class
            .get(&prediction.top1_label)
            .copied()
            .unwrap_or(default_threshold);

        if self.reserved_index.is_some() && prediction.top1_prob < threshold {
            tracing::debug!(
                "Gating '{}' ({:.3} < {:.3}) to '{}'",
                prediction.top1_label,
                prediction.top1_prob,
                threshold,
                self.reserved_label
            );
            metrics::counter!(GATE_FALLBACKS_TOTAL).increment(1);
            if let Some(forced) = self.force(&prediction) {
                return forced;
            }
        }
        prediction
    }

    /// Gate against a threshold table
    pub fn gate_with(&self, prediction: Prediction, thresholds: &ThresholdTable) -> Prediction {
        self.gate(prediction, thresholds.default_threshold(), thresholds.per_class())
    }

    /// Forced reserved-label prediction derived from `prediction`
    ///
    /// The runner-up is the most probable non-reserved class with its
    /// original probability. Returns `None` when the reserved label is not a
    /// model class.
    pub fn force(&self, prediction: &Prediction) -> Option<Prediction> {
        let reserved = self.reserved_index?;
        let n = self.labels.len();

        let mut probabilities = vec![0.0; n];
        probabilities[reserved] = 1.0;

        let alt = best_alternative(reserved, &prediction.probabilities);
        let alt_prob = prediction.probabilities.get(alt).copied().unwrap_or(0.0);

        Some(Prediction::new(
            self.reserved_label.clone(),
            1.0,
            self.labels[alt.min(n - 1)].clone(),
            alt_prob,
            probabilities,
        ))
    }
}

/// Highest-probability index other than `exclude`; 0 when there is none
fn best_alternative(exclude: usize, probs: &[f64]) -> usize {
    let mut best = None;
    let mut best_val = -1.0;
    for (i, &p) in probs.iter().enumerate() {
        if i == exclude {
            continue;
        }
        if p > best_val {
            best_val = p;
            best = Some(i);
        }
    }
    best.unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        ["event_time", "event_location", OUT_OF_SCOPE, "user_name"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn low_confidence() -> Prediction {
        Prediction::new("event_time", 0.4, "user_name", 0.3, vec![0.4, 0.1, 0.2, 0.3])
    }

    #[test]
    fn test_gate_forces_reserved_label() {
        let gate = ConfidenceGate::new(&labels(), OUT_OF_SCOPE);
        let gated = gate.gate(low_confidence(), 0.9, &HashMap::new());

        assert_eq!(gated.top1_label, OUT_OF_SCOPE);
        assert_eq!(gated.top1_prob, 1.0);
        assert_eq!(gated.top2_label, "event_time");
        assert_eq!(gated.top2_prob, 0.4);
        assert_eq!(gated.probabilities, vec![0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_gate_passes_confident_prediction() {
        let gate = ConfidenceGate::new(&labels(), OUT_OF_SCOPE);
        let p = low_confidence();
        assert_eq!(gate.gate(p.clone(), 0.3, &HashMap::new()), p);
    }

    #[test]
    fn test_per_class_threshold_wins() {
        let gate = ConfidenceGate::new(&labels(), OUT_OF_SCOPE);
        let table = ThresholdTable::new(0.9).with_class("event_time", 0.35);
        assert_eq!(gate.gate_with(low_confidence(), &table).top1_label, "event_time");

        let table = ThresholdTable::new(0.1).with_class("event_time", 0.5);
        assert_eq!(gate.gate_with(low_confidence(), &table).top1_label, OUT_OF_SCOPE);
    }

    #[test]
    fn test_gate_inactive_without_reserved_label() {
        let names: Vec<String> = vec!["a".into(), "b".into()];
        let gate = ConfidenceGate::new(&names, OUT_OF_SCOPE);
        assert!(!gate.is_active());
        let p = Prediction::new("a", 0.51, "b", 0.49, vec![0.51, 0.49]);
        assert_eq!(gate.gate(p.clone(), 0.99, &HashMap::new()), p);
    }

    #[test]
    fn test_runner_up_skips_reserved_even_when_highest() {
        let gate = ConfidenceGate::new(&labels(), OUT_OF_SCOPE);
        let p = Prediction::new(OUT_OF_SCOPE, 0.45, "event_time", 0.25, vec![0.25, 0.1, 0.45, 0.2]);
        let gated = gate.gate(p, 0.9, &HashMap::new());
        assert_eq!(gated.top2_label, "event_time");
        assert_eq!(gated.top2_prob, 0.25);
    }

    #[test]
    fn test_threshold_table_from_json() {
        let json = r#"{"event_time": 0.42, "unknown_label": 0.9}"#;
        let table = ThresholdTable::from_json_str(json, &labels(), 0.3).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("event_time"), 0.42);
        assert_eq!(table.get("user_name"), 0.3);

        assert!(ThresholdTable::from_json_str("[1, 2]", &labels(), 0.3).is_err());
        assert!(ThresholdTable::from_json_str(r#"{"event_time": "high"}"#, &labels(), 0.3).is_err());
    }
}
