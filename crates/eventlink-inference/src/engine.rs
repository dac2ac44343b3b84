//! Engine facade: configured, lazily loaded models shared by all callers

use crate::cache::ModelCache;
use crate::classifier::{Classifier, IntentClassifier};
use crate::config::EngineConfig;
use crate::evaluator::{thresholds_or_default, Evaluation, IntentEvaluator};
use crate::guardrails::{Decision, Guardrails};
use crate::model_loader::{ArtifactSource, IntentModel, RecommenderModel};
use crate::ranker::SimilarityRanker;
use crate::rules::RuleSet;
use eventlink_core::{Prediction, RankedResult, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Evaluation plus guardrail decision for one message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    #[serde(flatten)]
    pub decision: Decision,

    pub evaluation: Evaluation,

    /// Follow-up question when the intent is unclear
    pub clarify_message: Option<String>,
}

/// Shared inference entry point
///
/// Construct once at startup and share by reference or `Arc`. Models are
/// read on first use and reused until [`Engine::reset`].
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    intent: ModelCache<IntentEvaluator>,
    recommender: ModelCache<SimilarityRanker>,
    guardrails: Guardrails,
}

impl Engine {
    /// Create an engine; rules and guardrails are compiled eagerly, models lazily
    pub fn new(config: EngineConfig) -> Result<Self> {
        let rules = RuleSet::compile(&config.intent.rules)?;
        let guardrails = Guardrails::new(config.guardrails.clone())?;

        let intent_source = ArtifactSource::from(config.intent.model_path.clone());
        let intent_config = config.intent.clone();
        let intent = ModelCache::new("intent", move || {
            let model = IntentModel::load(&intent_source)?;
            let thresholds = thresholds_or_default(
                intent_config.thresholds_path.as_deref(),
                model.classes(),
                intent_config.default_threshold,
            );
            let classifier =
                IntentClassifier::with_reserved_label(Arc::new(model), intent_config.reserved_label.clone());
            Ok(IntentEvaluator::new(classifier, thresholds, rules.clone()))
        });

        let recommender_source = ArtifactSource::from(config.recommender.model_path.clone());
        let recommender = ModelCache::new("recommender", move || {
            RecommenderModel::load(&recommender_source).map(SimilarityRanker::new)
        });

        info!(
            "Engine configured: intent={}, recommender={}",
            config.intent.model_path.display(),
            config.recommender.model_path.display()
        );

        Ok(Self {
            config,
            intent,
            recommender,
            guardrails,
        })
    }

    /// Load from configuration file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Self::new(EngineConfig::from_file(path)?)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Load both models now instead of on first use
    pub fn preload(&self) -> Result<()> {
        self.intent.get()?;
        self.recommender.get()?;
        Ok(())
    }

    /// Ungated classifier output
    pub fn classify(&self, text: &str) -> Result<Prediction> {
        Ok(self.intent.get()?.classifier().classify(text))
    }

    /// Classifier output gated by the configured thresholds
    ///
    /// `default_threshold` replaces the configured default; per-class
    /// thresholds still apply.
    pub fn classify_gated(&self, text: &str, default_threshold: Option<f64>) -> Result<Prediction> {
        let evaluator = self.intent.get()?;
        let thresholds = evaluator.thresholds();
        let default = default_threshold.unwrap_or(thresholds.default_threshold());
        Ok(evaluator
            .classifier()
            .classify_gated(text, default, thresholds.per_class()))
    }

    /// Rules, gate and guardrails for one message
    pub fn evaluate(&self, text: &str) -> Result<Answer> {
        let evaluation = self.intent.get()?.evaluate(text);
        let decision = self.guardrails.apply(text, &evaluation.prediction);
        let clarify_message = decision.clarify_message(&evaluation.prediction);

        Ok(Answer {
            decision,
            evaluation,
            clarify_message,
        })
    }

    /// Class labels of the intent model
    pub fn labels(&self) -> Result<Vec<String>> {
        Ok(self.intent.get()?.classifier().labels().to_vec())
    }

    pub fn recommend(&self, interest: &str, top_k: usize, strict_category: bool) -> Result<Vec<RankedResult>> {
        Ok(self.recommender.get()?.recommend(interest, top_k, strict_category))
    }

    /// Recommend with the configured `top_k` and category mode
    pub fn recommend_default(&self, interest: &str) -> Result<Vec<RankedResult>> {
        let cfg = &self.config.recommender;
        self.recommend(interest, cfg.top_k, cfg.strict_category)
    }

    /// Drop both cached models so the next call reloads them
    pub fn reset(&self) {
        self.intent.reset();
        self.recommender.reset();
    }

    /// Number of model loads so far, as (intent, recommender)
    pub fn load_counts(&self) -> (usize, usize) {
        (self.intent.load_count(), self.recommender.load_count())
    }
}
