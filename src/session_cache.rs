//! Segmentation session caching
//!
//! Loading a segmentation network is the slowest step of a removal request, so
//! sessions are loaded once per model identifier and kept for the lifetime of
//! the cache. The cache is an explicit object: callers that want sharing hold
//! it behind an `Arc`, the tile workers each build a private one.
//!
//! The load path is a per-model critical section. Concurrent first requests
//! for the same model trigger exactly one load; the other callers block until
//! it finishes and then share the result. Requests for different models never
//! wait on each other.

use crate::{
    error::{BgRemovalError, Result},
    inference::SegmentationBackend,
    models::ModelId,
    tracing_config::spans,
};
use instant::Instant;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

type SessionSlot<S> = Arc<OnceCell<Arc<S>>>;

/// Session cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionCacheStats {
    /// Number of sessions currently held
    pub loaded_sessions: usize,
    /// Requests answered from the cache
    pub cache_hits: u64,
    /// Requests that loaded a session
    pub cache_misses: u64,
    /// Loads that failed (the slot stays empty and is retried next time)
    pub failed_loads: u64,
}

/// Cache of loaded segmentation sessions keyed by model
pub struct SessionCache<B: SegmentationBackend> {
    backend: Arc<B>,
    slots: Mutex<HashMap<ModelId, SessionSlot<B::Session>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    failures: AtomicU64,
}

impl<B: SegmentationBackend> SessionCache<B> {
    /// Create an empty cache that loads sessions through `backend`
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            slots: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Backend used for loading and removal
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Return the session for `model`, loading it on first use
    ///
    /// # Errors
    /// `BgRemovalError::Model` when the backend fails to load the session.
    /// A failed load is not cached.
    pub fn get_or_load(&self, model: ModelId) -> Result<Arc<B::Session>> {
        let slot = self.slot(model);

        let mut loaded_here = false;
        let session = slot.get_or_try_init(|| {
            loaded_here = true;
            self.load(model)
        });

        match session {
            Ok(session) => {
                if loaded_here {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                } else {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(model = %model, "Session cache hit");
                }
                Ok(Arc::clone(session))
            },
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!(model = %model, error = %e, "Session load failed");
                Err(e)
            },
        }
    }

    /// Whether a session for `model` is already loaded
    pub fn contains(&self, model: ModelId) -> bool {
        self.lock_slots()
            .get(&model)
            .is_some_and(|slot| slot.get().is_some())
    }

    /// Models with a loaded session, sorted
    pub fn loaded_models(&self) -> Vec<ModelId> {
        let mut models: Vec<ModelId> = self
            .lock_slots()
            .iter()
            .filter(|(_, slot)| slot.get().is_some())
            .map(|(model, _)| *model)
            .collect();
        models.sort();
        models
    }

    /// Current statistics
    pub fn stats(&self) -> SessionCacheStats {
        SessionCacheStats {
            loaded_sessions: self.loaded_models().len(),
            cache_hits: self.hits.load(Ordering::Relaxed),
            cache_misses: self.misses.load(Ordering::Relaxed),
            failed_loads: self.failures.load(Ordering::Relaxed),
        }
    }

    /// Per-model slot; the map lock is held only for the lookup
    fn slot(&self, model: ModelId) -> SessionSlot<B::Session> {
        Arc::clone(self.lock_slots().entry(model).or_default())
    }

    fn lock_slots(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<ModelId, SessionSlot<B::Session>>> {
        // Slots are inserted fully constructed; a poisoned map is still valid
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load(&self, model: ModelId) -> Result<Arc<B::Session>> {
        let _span = spans::model_loading(model).entered();
        info!(model = %model, "Loading segmentation session");

        let start = Instant::now();
        let session = self.backend.load_session(model).map_err(|e| {
            BgRemovalError::model(format!("Failed to load session for '{}': {:#}", model, e))
        })?;

        info!(
            model = %model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Segmentation session loaded"
        );
        Ok(Arc::new(session))
    }
}
