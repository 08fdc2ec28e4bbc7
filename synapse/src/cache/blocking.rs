//! Bridge from synchronous stores to the async adapter contract.
//!
//! [`BlockingAdapter`] implements [`BackendAdapter`] for any [`SyncBackend`]
//! by dispatching each call onto a shared [`WorkerPool`]. From the caller's
//! side every call is a suspension point; the blocking work happens on the
//! pool's threads.
//!
//! ```text
//! orchestrator ──await──► BlockingAdapter ──run()──► WorkerPool ──► SyncBackend
//!                         (async)                    (spawn_blocking)  (std::fs, socket…)
//! ```
//!
//! # Error Mapping on Lookup
//!
//! - Connectivity and I/O failures → [`CacheResult::Unavailable`]
//! - Corrupt entries → [`CacheResult::Miss`], so the write-back replaces them

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::warn;

use crate::cache::traits::{
    AdapterError, BackendAdapter, BoxFuture, CacheResult, Capabilities, SyncBackend,
};
use crate::executor::WorkerPool;

/// Async adapter over a blocking store.
pub struct BlockingAdapter<S: SyncBackend> {
    store: Arc<S>,
    pool: Arc<WorkerPool>,
}

impl<S: SyncBackend> BlockingAdapter<S> {
    /// Wrap a store, dispatching its calls on `pool`.
    pub fn new(store: S, pool: Arc<WorkerPool>) -> Self {
        Self::from_arc(Arc::new(store), pool)
    }

    /// Wrap an already shared store.
    pub fn from_arc(store: Arc<S>, pool: Arc<WorkerPool>) -> Self {
        Self { store, pool }
    }

    /// Returns the wrapped store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns the pool calls are dispatched on.
    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }
}

impl<S: SyncBackend> BackendAdapter for BlockingAdapter<S> {
    fn get(&self, key: &str) -> BoxFuture<'_, CacheResult> {
        let store = Arc::clone(&self.store);
        let key = key.to_string();
        Box::pin(async move {
            let lookup_key = key.clone();
            let outcome = self
                .pool
                .run(move || store.get(&lookup_key))
                .await
                .map_err(AdapterError::from)
                .and_then(|res| res);

            match outcome {
                Ok(Some(value)) => CacheResult::Hit(value),
                Ok(None) => CacheResult::Miss,
                Err(AdapterError::Corrupt(reason)) => {
                    warn!(key = %key, reason = %reason, "Corrupt cache entry treated as miss");
                    CacheResult::Miss
                }
                Err(e) => {
                    warn!(error = %e, key = %key, pool = %self.pool.label(), "Blocking lookup failed");
                    CacheResult::Unavailable
                }
            }
        })
    }

    fn set(
        &self,
        key: &str,
        value: Bytes,
        ttl: Option<Duration>,
    ) -> BoxFuture<'_, Result<(), AdapterError>> {
        let store = Arc::clone(&self.store);
        let key = key.to_string();
        Box::pin(async move {
            self.pool
                .run(move || store.set(&key, value, ttl))
                .await
                .map_err(AdapterError::from)?
        })
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::blocking(self.store.own_eviction())
    }
}
