//! Load-once shared model handles

use crate::telemetry::MODEL_LOADS_TOTAL;
use eventlink_core::Result;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

type Loader<T> = Box<dyn Fn() -> Result<T> + Send + Sync>;
type Slot<T> = Arc<OnceLock<Result<Arc<T>>>>;

/// Lazily loads one model and shares it between callers
///
/// The first `get` runs the loader; concurrent first callers block on the
/// same cell, so the loader runs at most once per generation. A failed load
/// is cached as well and every caller sees the same error until `reset`.
pub struct ModelCache<T> {
    name: String,
    loader: Loader<T>,
    slot: RwLock<Slot<T>>,
    loads: AtomicUsize,
}

impl<T: Send + Sync + 'static> ModelCache<T> {
    pub fn new<F>(name: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            loader: Box::new(loader),
            slot: RwLock::new(Arc::new(OnceLock::new())),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared model handle, loading it on first access
    pub fn get(&self) -> Result<Arc<T>> {
        // Clone the slot out so a concurrent reset never blocks on a load.
        let slot = self.slot.read().clone();
        slot.get_or_init(|| self.load()).clone()
    }

    /// Whether the current generation has finished loading
    pub fn is_loaded(&self) -> bool {
        matches!(self.slot.read().get(), Some(Ok(_)))
    }

    /// Drop the cached model so the next `get` loads again
    ///
    /// Handles already returned by `get` stay valid.
    pub fn reset(&self) {
        *self.slot.write() = Arc::new(OnceLock::new());
        tracing::info!("Model cache '{}' reset", self.name);
    }

    /// Number of times the loader has run
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    fn load(&self) -> Result<Arc<T>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        tracing::info!("Loading model '{}'", self.name);

        match (self.loader)() {
            Ok(model) => {
                metrics::counter!(MODEL_LOADS_TOTAL, "outcome" => "ok").increment(1);
                Ok(Arc::new(model))
            }
            Err(e) => {
                metrics::counter!(MODEL_LOADS_TOTAL, "outcome" => "error").increment(1);
                tracing::error!("Failed to load model '{}': {}", self.name, e);
                Err(e)
            }
        }
    }
}

impl<T> std::fmt::Debug for ModelCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCache")
            .field("name", &self.name)
            .field("loads", &self.loads.load(Ordering::SeqCst))
            .finish()
    }
}
