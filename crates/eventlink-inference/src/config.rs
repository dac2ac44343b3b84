//! Configuration for the inference engine

use crate::gate::OUT_OF_SCOPE;
use crate::guardrails::GuardrailConfig;
use crate::rules::RuleSpec;
use eventlink_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for all engine components
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub intent: IntentConfig,

    #[serde(default)]
    pub recommender: RecommenderConfig,

    #[serde(default)]
    pub guardrails: GuardrailConfig,
}

/// Intent model and gating settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentConfig {
    /// Classifier artifact
    #[serde(default = "default_intent_model")]
    pub model_path: PathBuf,

    /// Optional per-class thresholds (flat JSON object)
    #[serde(default)]
    pub thresholds_path: Option<PathBuf>,

    #[serde(default = "default_threshold")]
    pub default_threshold: f64,

    /// Label low-confidence predictions are rerouted to
    #[serde(default = "default_reserved_label")]
    pub reserved_label: String,

    /// Regex overrides, tried in order
    #[serde(default = "default_rules")]
    pub rules: Vec<RuleSpec>,
}

/// Event recommender settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommenderConfig {
    #[serde(default = "default_recommender_model")]
    pub model_path: PathBuf,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default)]
    pub strict_category: bool,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            model_path: default_intent_model(),
            thresholds_path: None,
            default_threshold: default_threshold(),
            reserved_label: default_reserved_label(),
            rules: default_rules(),
        }
    }
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            model_path: default_recommender_model(),
            top_k: default_top_k(),
            strict_category: false,
        }
    }
}

impl EngineConfig {
    /// Load from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("invalid engine config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::read(path, e))?;
        Self::from_yaml(&content)
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.intent.default_threshold) {
            return Err(Error::config(format!(
                "intent.default_threshold {} outside [0, 1]",
                self.intent.default_threshold
            )));
        }
        if self.intent.reserved_label.is_empty() {
            return Err(Error::config("intent.reserved_label must not be empty"));
        }
        if !unit.contains(&self.guardrails.low_confidence) || !unit.contains(&self.guardrails.near_delta) {
            return Err(Error::config("guardrail knobs must lie in [0, 1]"));
        }
        Ok(())
    }
}

fn default_intent_model() -> PathBuf {
    PathBuf::from("./assets/intent_model_android.json")
}

fn default_recommender_model() -> PathBuf {
    PathBuf::from("./assets/weights_events.json")
}

fn default_threshold() -> f64 {
    0.30
}

fn default_reserved_label() -> String {
    OUT_OF_SCOPE.to_string()
}

fn default_rules() -> Vec<RuleSpec> {
    vec![RuleSpec::date_time()]
}

fn default_top_k() -> usize {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_yaml() {
        let yaml = r#"
intent:
  model_path: ./models/intent.json
  thresholds_path: ./models/thresholds.json
  default_threshold: 0.4
  rules:
    - name: venue
      pattern: '\bvenue\b'
      label: event_location
      confidence: 0.9

recommender:
  model_path: ./models/events.json
  top_k: 3
  strict_category: true

guardrails:
  enabled: false
  near_delta: 0.2
"#;

        let config = EngineConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.intent.model_path, PathBuf::from("./models/intent.json"));
        assert_eq!(config.intent.thresholds_path, Some(PathBuf::from("./models/thresholds.json")));
        assert_eq!(config.intent.default_threshold, 0.4);
        assert_eq!(config.intent.reserved_label, OUT_OF_SCOPE);
        assert_eq!(config.intent.rules.len(), 1);
        assert_eq!(config.intent.rules[0].label, "event_location");
        assert_eq!(config.recommender.top_k, 3);
        assert!(config.recommender.strict_category);
        assert!(!config.guardrails.enabled);
        assert_eq!(config.guardrails.near_delta, 0.2);
        assert_eq!(config.guardrails.low_confidence, 0.35);
        assert!(config.guardrails.time_cues.contains(&"when".to_string()));
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = EngineConfig::from_yaml("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.intent.default_threshold, 0.30);
        assert_eq!(config.recommender.top_k, 10);
        assert_eq!(config.intent.rules, vec![RuleSpec::date_time()]);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = EngineConfig::from_yaml("intent:\n  default_threshold: 1.5\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        assert!(EngineConfig::from_yaml("recommender: [1, 2]").is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.yaml");
        std::fs::write(&path, "recommender:\n  top_k: 5\n").unwrap();

        assert_eq!(EngineConfig::from_file(&path).unwrap().recommender.top_k, 5);
        assert!(matches!(
            EngineConfig::from_file(dir.path().join("missing.yaml")),
            Err(Error::Read { .. })
        ));
    }
}
