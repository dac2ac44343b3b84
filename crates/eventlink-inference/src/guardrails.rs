//! Cue-based post-processing of intent predictions (Tier A)
//!
//! Guardrails run after the evaluator and can reroute off-domain chatter,
//! flag time questions for clarification and disambiguate the two location
//! intents.

use crate::gate::OUT_OF_SCOPE;
use crate::vectorizer::tokenize_words;
use aho_corasick::AhoCorasick;
use eventlink_core::{Error, Prediction, Result};
use serde::{Deserialize, Serialize};

/// Label for questions about the user's own location
pub const USER_LOCATION: &str = "user_location";

/// Label for questions about an event's venue
pub const EVENT_LOCATION: &str = "event_location";

/// Cue lists and clarify knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailConfig {
    pub enabled: bool,

    /// Clarify when the top-1 probability is below this
    pub low_confidence: f64,

    /// Clarify when top-1 minus top-2 is below this
    pub near_delta: f64,

    pub off_domain_cues: Vec<String>,
    pub event_words: Vec<String>,
    pub user_location_cues: Vec<String>,

    /// Matched as whole words
    pub time_cues: Vec<String>,

    pub venue_words: Vec<String>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            low_confidence: 0.35,
            near_delta: 0.12,
            off_domain_cues: words(&[
                "ronaldo", "messi", "elon", "bitcoin", "weather", "recipe", "cab", "camera",
                "translate", "password", "order",
            ]),
            event_words: words(&["event", "seminar", "workshop", "session", "conference"]),
            user_location_cues: words(&[
                "my location",
                "where am i",
                "where do i live",
                "current location",
                "my place",
            ]),
            time_cues: words(&["when", "time", "date", "schedule", "start", "begin", "ends", "ending"]),
            venue_words: words(&["location", "venue", "place"]),
        }
    }
}

/// Outcome of applying guardrails to a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub intent: String,
    pub confidence: f64,
    pub needs_clarify: bool,

    /// Name of the cue rule that changed the decision, if any
    pub guardrail: Option<String>,
}

impl Decision {
    /// Follow-up question offering the two best intents
    pub fn clarify_message(&self, prediction: &Prediction) -> Option<String> {
        if !self.needs_clarify && self.intent != OUT_OF_SCOPE {
            return None;
        }
        Some(clarify_message(&prediction.top1_label, &prediction.top2_label))
    }
}

/// "I can help with X or Y, which one did you mean?"
pub fn clarify_message(first: &str, second: &str) -> String {
    format!(
        "I can help with {} or {}, which one did you mean?",
        first.replace('_', " "),
        second.replace('_', " ")
    )
}

/// Compiled guardrail matchers
#[derive(Debug, Clone)]
pub struct Guardrails {
    config: GuardrailConfig,
    off_domain: AhoCorasick,
    in_domain: AhoCorasick,
    user_location: AhoCorasick,
    event: AhoCorasick,
    venue: AhoCorasick,
}

impl Guardrails {
    pub fn new(config: GuardrailConfig) -> Result<Self> {
        let in_domain: Vec<&String> = config
            .event_words
            .iter()
            .chain(&config.user_location_cues)
            .collect();

        Ok(Self {
            off_domain: matcher(&config.off_domain_cues, "off-domain")?,
            in_domain: matcher(&in_domain, "in-domain")?,
            user_location: matcher(&config.user_location_cues, "user-location")?,
            event: matcher(&config.event_words, "event")?,
            venue: matcher(&config.venue_words, "venue")?,
            config,
        })
    }

    pub fn config(&self) -> &GuardrailConfig {
        &self.config
    }

    /// Decide the final intent for `text`
    ///
    /// `prediction` is the (gated) evaluator output. The first cue rule that
    /// fires decides; later rules are not consulted.
    pub fn apply(&self, text: &str, prediction: &Prediction) -> Decision {
        let mut decision = Decision {
            intent: prediction.top1_label.clone(),
            confidence: prediction.top1_prob,
            needs_clarify: prediction.top1_prob < self.config.low_confidence
                || prediction.margin() < self.config.near_delta,
            guardrail: None,
        };

        if !self.config.enabled {
            return decision;
        }

        let lowered = text.to_lowercase();

        if self.off_domain.is_match(&lowered) && !self.in_domain.is_match(&lowered) {
            decision.intent = OUT_OF_SCOPE.to_string();
            decision.confidence = decision.confidence.max(0.50);
            decision.guardrail = Some("off_domain".into());
        } else if self.is_time_question(&lowered) {
            decision.needs_clarify = true;
            decision.guardrail = Some("time_question".into());
        } else if self.user_location.is_match(&lowered) {
            decision.intent = USER_LOCATION.to_string();
            decision.confidence = decision.confidence.max(0.60);
            decision.guardrail = Some("user_location".into());
        } else if self.event.is_match(&lowered) && self.venue.is_match(&lowered) {
            decision.intent = EVENT_LOCATION.to_string();
            decision.confidence = decision.confidence.max(0.60);
            decision.guardrail = Some("event_location".into());
        }

        if let Some(rule) = &decision.guardrail {
            tracing::debug!("Guardrail '{}' applied: intent='{}'", rule, decision.intent);
        }
        decision
    }

    fn is_time_question(&self, lowered: &str) -> bool {
        lowered.contains("when is")
            || tokenize_words(lowered)
                .iter()
                .any(|w| self.config.time_cues.iter().any(|cue| cue == w))
    }
}

fn matcher<S: AsRef<str>>(patterns: &[S], what: &str) -> Result<AhoCorasick> {
    let patterns: Vec<String> = patterns.iter().map(|p| p.as_ref().to_lowercase()).collect();
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(&patterns)
        .map_err(|e| Error::config(format!("Failed to build {} cue matcher: {}", what, e)))
}
