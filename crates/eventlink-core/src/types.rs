//! Core types for EventLink

use serde::{Deserialize, Serialize};

/// Output of the intent classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Highest-probability label
    pub top1_label: String,

    /// Probability of `top1_label` (0.0-1.0)
    pub top1_prob: f64,

    /// Runner-up label
    pub top2_label: String,

    /// Probability of `top2_label` (0.0-1.0)
    pub top2_prob: f64,

    /// Probability per class, index-aligned with the model's class labels
    pub probabilities: Vec<f64>,
}

impl Prediction {
    /// Create a new prediction
    pub fn new(
        top1_label: impl Into<String>,
        top1_prob: f64,
        top2_label: impl Into<String>,
        top2_prob: f64,
        probabilities: Vec<f64>,
    ) -> Self {
        Self {
            top1_label: top1_label.into(),
            top1_prob,
            top2_label: top2_label.into(),
            top2_prob,
            probabilities,
        }
    }

    /// Margin between the two best labels
    pub fn margin(&self) -> f64 {
        self.top1_prob - self.top2_prob
    }

    /// Check if the top-1 probability reaches `threshold`
    pub fn meets_threshold(&self, threshold: f64) -> bool {
        self.top1_prob >= threshold
    }
}

/// Passthrough description of a recommendable event
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub date: String,
}

/// One entry of a recommendation list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub metadata: ItemMetadata,

    /// Cosine similarity between the query and the item
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_margin() {
        let p = Prediction::new("event_name", 0.6, "event_location", 0.25, vec![0.6, 0.25, 0.15]);
        assert!((p.margin() - 0.35).abs() < 1e-12);
        assert!(p.meets_threshold(0.6));
        assert!(!p.meets_threshold(0.61));
    }

    #[test]
    fn test_item_metadata_serde_names() {
        let json = r#"{"id":"e1","name":"RustConf","category":"Systems","image_url":"https://x/y.png"}"#;
        let meta: ItemMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.image_url, "https://x/y.png");
        assert_eq!(meta.date, "");
    }
}
