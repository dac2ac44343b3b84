//! Regex rule overrides applied before the statistical classifier

use eventlink_core::{Error, Prediction, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Date/time question pattern routed to `event_date_time`
pub const DATE_TIME_PATTERN: &str =
    r"\b(when|what\s*time|date|schedule|start\s*time|begin|happen|time\s*of)\b";

/// Serialized form of a rule, as found in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    pub pattern: String,
    pub label: String,
    #[serde(default = "default_rule_confidence")]
    pub confidence: f64,
}

fn default_rule_confidence() -> f64 {
    0.98
}

impl RuleSpec {
    /// The built-in date/time question rule
    pub fn date_time() -> Self {
        Self {
            name: "date_time_question".to_string(),
            pattern: DATE_TIME_PATTERN.to_string(),
            label: "event_date_time".to_string(),
            confidence: default_rule_confidence(),
        }
    }
}

/// A compiled, case-insensitive rule
#[derive(Debug, Clone)]
pub struct RuleOverride {
    name: String,
    regex: Regex,
    label: String,
    confidence: f64,
}

impl RuleOverride {
    pub fn compile(spec: &RuleSpec) -> Result<Self> {
        if !(0.0..=1.0).contains(&spec.confidence) {
            return Err(Error::config(format!(
                "rule '{}' confidence {} outside [0, 1]",
                spec.name, spec.confidence
            )));
        }

        let regex = RegexBuilder::new(&spec.pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::config(format!("rule '{}' has an invalid pattern: {}", spec.name, e)))?;

        Ok(Self {
            name: spec.name.clone(),
            regex,
            label: spec.label.clone(),
            confidence: spec.confidence,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Prediction produced when this rule fires
    ///
    /// The runner-up is `fallback_label` with the remaining probability mass.
    /// `probabilities` is one-hot at the rule label when it is a model class.
    pub fn prediction(&self, labels: &[String], fallback_label: &str) -> Prediction {
        let probabilities = labels
            .iter()
            .map(|l| if *l == self.label { 1.0 } else { 0.0 })
            .collect();

        Prediction::new(
            self.label.clone(),
            self.confidence,
            fallback_label,
            1.0 - self.confidence,
            probabilities,
        )
    }
}

/// Ordered rules; the first match wins
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<RuleOverride>,
}

impl RuleSet {
    pub fn compile(specs: &[RuleSpec]) -> Result<Self> {
        let rules = specs.iter().map(RuleOverride::compile).collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Just the date/time question rule
    pub fn builtin() -> Result<Self> {
        Self::compile(&[RuleSpec::date_time()])
    }

    pub fn first_match(&self, text: &str) -> Option<&RuleOverride> {
        self.rules.iter().find(|r| r.is_match(text))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
