//! Cache-aside orchestration.
//!
//! [`CacheAside::resolve`] runs the get-or-populate protocol against one
//! registered backend:
//!
//! ```text
//! registry ──► adapter.get ──Hit──────────────────────────────► Cache
//!                  │
//!                  ├─Unavailable──────────────────────────────► degraded
//!                  │
//!                  └─Miss──► loader.load ──► adapter.set ─────► Origin
//!                               │               │
//!                               └─ fails ──►    └─ fails: warn, value still returned
//!                                  LoadFailure
//! ```
//!
//! Every stage is timed by a [`LatencyRecorder`]. Stages within one request
//! run strictly in order. There is no single-flight: concurrent misses for
//! the same key each call the loader and write back, last writer wins.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::{AdapterError, CacheResult};
use crate::config::DEFAULT_RESOLVE_TTL;
use crate::latency::{LatencyRecorder, LatencyReport, Outcome, Stage};
use crate::origin::{LoadError, OriginLoader};
use crate::registry::{BackendRegistry, BackendUnavailable};
use crate::telemetry::{BackendMetrics, ResolverMetrics};

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cache,
    Origin,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Source::Cache => "cache",
            Source::Origin => "origin",
        })
    }
}

/// Result of the write-back stage.
#[derive(Debug)]
pub enum StoreOutcome {
    /// The value was served from cache; nothing was written.
    Skipped,
    /// The backend accepted the write.
    Stored,
    /// The backend rejected or failed the write.
    Failed(AdapterError),
}

impl StoreOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, StoreOutcome::Failed(_))
    }
}

/// A successfully resolved value.
#[derive(Debug)]
pub struct Resolved {
    pub value: Bytes,
    pub source: Source,
    pub latency: LatencyReport,
    pub store: StoreOutcome,
}

/// Errors returned by [`CacheAside::resolve`].
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The backend is not registered or could not be reached.
    ///
    /// Callers should treat this as a degraded response, not a failure.
    #[error("backend '{backend}' is not available")]
    Unavailable { backend: String },

    /// The origin could not produce a value. Never retried or cached.
    #[error("failed to load '{key}' from origin: {source}")]
    LoadFailure {
        key: String,
        #[source]
        source: LoadError,
    },
}

impl ResolveError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ResolveError::Unavailable { .. })
    }
}

impl From<BackendUnavailable> for ResolveError {
    fn from(err: BackendUnavailable) -> Self {
        ResolveError::Unavailable { backend: err.0 }
    }
}

/// Get-or-populate over a frozen backend registry.
///
/// Cheap to share: wrap in `Arc` and call [`resolve`](Self::resolve) from
/// any number of tasks.
pub struct CacheAside {
    registry: Arc<BackendRegistry>,
    loader: Arc<dyn OriginLoader>,
    ttl: Option<Duration>,
    metrics: Arc<ResolverMetrics>,
}

impl CacheAside {
    /// Create an orchestrator with the default write-back TTL.
    pub fn new(registry: Arc<BackendRegistry>, loader: Arc<dyn OriginLoader>) -> Self {
        let metrics = Arc::new(ResolverMetrics::for_backends(registry.names()));
        Self {
            registry,
            loader,
            ttl: Some(DEFAULT_RESOLVE_TTL),
            metrics,
        }
    }

    /// Set the TTL passed to the backend on write-back.
    ///
    /// `None` leaves expiry to the backend default.
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }

    pub fn loader(&self) -> &Arc<dyn OriginLoader> {
        &self.loader
    }

    pub fn metrics(&self) -> &Arc<ResolverMetrics> {
        &self.metrics
    }

    /// Resolve `key` against `backend`.
    ///
    /// # Errors
    ///
    /// - `Unavailable` if `backend` is not registered (no adapter or loader
    ///   call is made) or its `get` reported `Unavailable`
    /// - `LoadFailure` if the key missed and the origin failed
    ///
    /// A failed write-back is not an error; see [`Resolved::store`].
    pub async fn resolve(&self, backend: &str, key: &str) -> Result<Resolved, ResolveError> {
        let adapter = self.registry.adapter(backend).map_err(|e| {
            self.metrics.unknown_backend();
            debug!(backend, key, "Request for unregistered backend");
            ResolveError::from(e)
        })?;

        let metrics = self.metrics.backend(backend);
        let count = |f: fn(&BackendMetrics)| {
            if let Some(m) = metrics {
                f(m);
            }
        };

        let mut recorder = LatencyRecorder::new(backend, key);

        let lookup = recorder.time(Stage::Lookup, adapter.get(key)).await;
        if let (Some(m), Some(elapsed)) = (
            metrics,
            recorder.samples().last().and_then(|s| s.duration()),
        ) {
            m.lookup_timed(elapsed);
        }

        match lookup {
            CacheResult::Hit(value) => {
                count(BackendMetrics::cache_hit);
                debug!(backend, key, bytes = value.len(), "Cache hit");
                return Ok(Resolved {
                    value,
                    source: Source::Cache,
                    latency: recorder.finish(Outcome::Hit),
                    store: StoreOutcome::Skipped,
                });
            }
            CacheResult::Unavailable => {
                count(BackendMetrics::backend_unavailable);
                warn!(backend, key, "Backend unavailable during lookup");
                recorder.finish(Outcome::Unavailable);
                return Err(ResolveError::Unavailable {
                    backend: backend.to_string(),
                });
            }
            CacheResult::Miss => {
                count(BackendMetrics::cache_miss);
                debug!(backend, key, "Cache miss, loading from origin");
            }
        }

        let value = match recorder.time(Stage::Load, self.loader.load(key)).await {
            Ok(value) => {
                count(BackendMetrics::origin_loaded);
                value
            }
            Err(e) => {
                count(BackendMetrics::origin_failed);
                warn!(
                    backend,
                    key,
                    origin = self.loader.name(),
                    error = %e,
                    "Origin load failed"
                );
                recorder.finish(Outcome::LoadFailure);
                return Err(ResolveError::LoadFailure {
                    key: key.to_string(),
                    source: e,
                });
            }
        };

        let store = match recorder
            .time(Stage::Store, adapter.set(key, value.clone(), self.ttl))
            .await
        {
            Ok(()) => StoreOutcome::Stored,
            Err(e) => {
                count(BackendMetrics::write_failed);
                warn!(backend, key, error = %e, "Failed to write back to cache");
                StoreOutcome::Failed(e)
            }
        };

        Ok(Resolved {
            value,
            source: Source::Origin,
            latency: recorder.finish(Outcome::Miss),
            store,
        })
    }
}

impl fmt::Debug for CacheAside {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheAside")
            .field("backends", &self.registry.names().collect::<Vec<_>>())
            .field("loader", &self.loader.name())
            .field("ttl", &self.ttl)
            .finish()
    }
}
