//! Cosine-similarity ranking of events against an interest query

use crate::model_loader::RecommenderModel;
use crate::telemetry::{INFERENCE_LATENCY_US, RECOMMENDATIONS_TOTAL};
use crate::vectorizer::tokenize_words;
use eventlink_core::RankedResult;
use std::cmp::Ordering;
use std::time::Instant;

/// Ranks recommender items by similarity to a free-text interest
///
/// Holds no per-call state; every `recommend` call starts from scratch.
#[derive(Debug, Clone)]
pub struct SimilarityRanker {
    model: RecommenderModel,
}

impl SimilarityRanker {
    pub fn new(model: RecommenderModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &RecommenderModel {
        &self.model
    }

    /// Rank items whose category matches `interest`
    ///
    /// Scores are sorted in descending order. Equal scores keep ascending
    /// item-id order. At most `top_k` results are returned.
    pub fn recommend(&self, interest: &str, top_k: usize, strict_category: bool) -> Vec<RankedResult> {
        if top_k == 0 {
            return Vec::new();
        }

        let start = Instant::now();
        metrics::counter!(RECOMMENDATIONS_TOTAL).increment(1);

        let query = self.model.vectorizer().vectorize(interest);

        let mut results: Vec<RankedResult> = self
            .model
            .items()
            .iter()
            .filter(|item| category_matches(&item.metadata.category, interest, strict_category))
            .map(|item| RankedResult {
                metadata: item.metadata.clone(),
                score: query.dot(&item.vector),
            })
            .collect();

        // Stable sort keeps id order among equal scores.
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        results.truncate(top_k);

        metrics::histogram!(INFERENCE_LATENCY_US, "op" => "recommend")
            .record(start.elapsed().as_micros() as f64);
        tracing::debug!(
            "Recommended {} items for '{}' (strict={})",
            results.len(),
            interest,
            strict_category
        );

        results
    }
}

/// Category filter used by [`SimilarityRanker::recommend`]
///
/// Strict mode needs a case-insensitive exact match. Otherwise an exact match
/// also passes, as does either side's word sequence appearing as a
/// contiguous run of words in the other ("ai" matches "AI/ML" but not
/// "Blockchain").
///
/// Partial words never match, so "tech" does not select "Technology".
pub fn category_matches(category: &str, query: &str, strict: bool) -> bool {
    if category.to_lowercase() == query.to_lowercase() {
        return true;
    }
    if strict {
        return false;
    }

    let category = word_run(category);
    let query = word_run(query);
    if category.trim().is_empty() || query.trim().is_empty() {
        return false;
    }
    category.contains(&query) || query.contains(&category)
}

/// Normalized words joined by single spaces, padded with one space each side
fn word_run(text: &str) -> String {
    format!(" {} ", tokenize_words(text).join(" "))
}
