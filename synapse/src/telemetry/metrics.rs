//! Lock-free per-backend request counters.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::snapshot::MetricsSnapshot;

/// Counters for one backend.
///
/// All methods use relaxed atomics; counters are independent and only read
/// through [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct BackendMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    unavailable: AtomicU64,
    loads: AtomicU64,
    load_failures: AtomicU64,
    write_failures: AtomicU64,
    lookup_micros: AtomicU64,
    lookups_timed: AtomicU64,
}

impl BackendMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cache_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn backend_unavailable(&self) {
        self.unavailable.fetch_add(1, Ordering::Relaxed);
    }

    pub fn origin_loaded(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn origin_failed(&self) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn write_failed(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Add a lookup duration to the running average.
    pub fn lookup_timed(&self, duration: Duration) {
        self.lookup_micros
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.lookups_timed.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of the counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let timed = self.lookups_timed.load(Ordering::Relaxed);
        let micros = self.lookup_micros.load(Ordering::Relaxed);
        MetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            unavailable: self.unavailable.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            avg_lookup_us: if timed == 0 { 0.0 } else { micros as f64 / timed as f64 },
        }
    }
}

/// Counters for every registered backend, plus requests for unknown names.
///
/// The backend set is fixed at construction, matching the registry.
#[derive(Debug, Default)]
pub struct ResolverMetrics {
    backends: HashMap<String, Arc<BackendMetrics>>,
    unknown_backend: AtomicU64,
}

impl ResolverMetrics {
    /// Create counters for the given backend names.
    pub fn for_backends<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            backends: names
                .into_iter()
                .map(|name| (name.into(), Arc::new(BackendMetrics::new())))
                .collect(),
            unknown_backend: AtomicU64::new(0),
        }
    }

    /// Counters for `backend`, if it was registered.
    pub fn backend(&self, backend: &str) -> Option<&Arc<BackendMetrics>> {
        self.backends.get(backend)
    }

    pub fn unknown_backend(&self) {
        self.unknown_backend.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of requests that named an unregistered backend.
    pub fn unknown_backend_requests(&self) -> u64 {
        self.unknown_backend.load(Ordering::Relaxed)
    }

    /// Snapshots for all backends, sorted by name.
    pub fn snapshots(&self) -> Vec<(String, MetricsSnapshot)> {
        let mut all: Vec<_> = self
            .backends
            .iter()
            .map(|(name, m)| (name.clone(), m.snapshot()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }
}
