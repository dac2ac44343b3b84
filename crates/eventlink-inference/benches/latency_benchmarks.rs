//! Latency benchmarks for on-device inference
//!
//! Classification and recommendation should stay well under a millisecond
//! for realistic vocabulary sizes.
//!
//! Run with: cargo bench -p eventlink-inference

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use eventlink_inference::{
    Classifier, IntentClassifier, IntentModel, RecommenderModel, SimilarityRanker,
};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

const CLASSES: &[&str] = &[
    "event_date_time",
    "event_location",
    "event_speaker",
    "user_location",
    "out_of_scope",
];

/// Synthetic char_wb 3..5 vocabulary from a small corpus
fn vocabulary() -> Map<String, Value> {
    let corpus = "when where who what venue speaker location schedule start time \
                  hackathon workshop seminar conference keynote registration ticket";
    let mut vocab = Map::new();
    for word in corpus.split_whitespace() {
        let padded: Vec<char> = format!(" {} ", word).chars().collect();
        for n in 3..=5 {
            for window in padded.windows(n) {
                let gram: String = window.iter().collect();
                let next = vocab.len();
                vocab.entry(gram).or_insert_with(|| json!(next));
            }
        }
    }
    vocab
}

fn intent_classifier() -> IntentClassifier {
    let vocab = vocabulary();
    let n = vocab.len();
    let coef: Vec<Vec<f64>> = (0..CLASSES.len())
        .map(|c| (0..n).map(|f| (((c * 31 + f * 7) % 13) as f64 - 6.0) / 6.0).collect())
        .collect();

    let model = IntentModel::from_value(&json!({
        "classes": CLASSES,
        "vectorizer": {"vocab": vocab, "idf": vec![1.5; n]},
        "coef": coef,
        "intercept": vec![0.0; CLASSES.len()]
    }))
    .expect("Failed to build benchmark model");
    IntentClassifier::new(Arc::new(model))
}

fn ranker(items: usize) -> SimilarityRanker {
    let vocab = vocabulary();
    let tokens: Vec<String> = vocab.keys().cloned().collect();
    let categories = ["AI/ML", "Blockchain", "Web Development", "Design"];

    let mut vectors = Map::new();
    let mut events = Map::new();
    for i in 0..items {
        let id = format!("ev-{:04}", i);
        let mut weights: HashMap<&str, f64> = (0..8)
            .map(|k| (tokens[(i * 13 + k * 29) % tokens.len()].as_str(), 1.0 + k as f64))
            .collect();
        // Exported item vectors are unit length
        let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
        weights.values_mut().for_each(|w| *w /= norm);
        vectors.insert(id.clone(), json!(weights));
        events.insert(
            id,
            json!({"name": format!("Event {}", i), "category": categories[i % categories.len()]}),
        );
    }

    let model = RecommenderModel::from_value(json!({
        "vectorizer": {"vocab": vocab},
        "event_vectors": vectors,
        "events": events
    }))
    .expect("Failed to build benchmark recommender");
    SimilarityRanker::new(model)
}

fn benchmark_classify(c: &mut Criterion) {
    let classifier = intent_classifier();

    let test_cases = vec![
        ("short", "where is the venue"),
        ("question", "When does the hackathon keynote start?"),
        ("long", "Can you tell me who the speaker at the workshop is and where the conference registration happens"),
        ("out_of_vocabulary", "zzz qqq xxx"),
    ];

    let mut group = c.benchmark_group("Intent_Classifier");
    group.sample_size(100);

    for (name, text) in test_cases {
        group.bench_with_input(BenchmarkId::new("classify", name), &text, |b, text| {
            b.iter(|| classifier.classify(black_box(text)))
        });
        group.bench_with_input(BenchmarkId::new("classify_gated", name), &text, |b, text| {
            b.iter(|| classifier.classify_gated(black_box(text), 0.3, &HashMap::new()))
        });
    }

    group.finish();
}

fn benchmark_recommend(c: &mut Criterion) {
    let mut group = c.benchmark_group("Similarity_Ranker");

    for items in [50, 500] {
        let ranker = ranker(items);
        group.bench_with_input(BenchmarkId::new("recommend", items), &ranker, |b, ranker| {
            b.iter(|| ranker.recommend(black_box("AI/ML"), 10, false))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_classify, benchmark_recommend);
criterion_main!(benches);
