//! Concurrent first access to shared models

use eventlink_core::Error;
use eventlink_inference::{Classifier, IntentClassifier, IntentModel, ModelCache};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

const THREADS: usize = 16;

fn artifact_json() -> String {
    json!({
        "classes": ["greeting", "out_of_scope"],
        "vocab": {"hi": 0},
        "analyzer": "token",
        "coef": [[2.0], [0.0]]
    })
    .to_string()
}

#[test]
fn test_racing_first_access_loads_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let json = artifact_json();
    let cache = ModelCache::new("intent", move || {
        counter.fetch_add(1, Ordering::SeqCst);
        // widen the race window
        std::thread::sleep(Duration::from_millis(20));
        IntentModel::from_json_str(&json)
    });

    let barrier = Barrier::new(THREADS);
    let handles: Vec<Arc<IntentModel>> = std::thread::scope(|s| {
        let workers: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    cache.get().unwrap()
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.load_count(), 1);
    assert!(handles.iter().all(|h| Arc::ptr_eq(h, &handles[0])));

    let clf = IntentClassifier::new(Arc::clone(&handles[0]));
    assert_eq!(clf.classify("hi").top1_label, "greeting");
}

#[test]
fn test_racing_callers_share_failure() {
    let cache: ModelCache<IntentModel> =
        ModelCache::new("broken", || IntentModel::from_json_str(r#"{"vocab": {"a": 0}}"#));

    let barrier = Barrier::new(THREADS);
    let errors: Vec<Error> = std::thread::scope(|s| {
        let workers: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    cache.get().unwrap_err()
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    assert_eq!(cache.load_count(), 1);
    assert!(errors.iter().all(|e| matches!(e, Error::Schema(_))));
    assert!(errors.iter().all(|e| e.to_string() == errors[0].to_string()));
}

#[test]
fn test_reset_while_shared() {
    let json = artifact_json();
    let cache = ModelCache::new("intent", move || IntentModel::from_json_str(&json));

    let before = cache.get().unwrap();
    cache.reset();
    let after = cache.get().unwrap();

    assert_eq!(cache.load_count(), 2);
    assert!(!Arc::ptr_eq(&before, &after));
    // the old handle keeps working
    assert_eq!(before.classes(), after.classes());
}
