//! Request telemetry for observability and benchmarking.
//!
//! Lock-free atomic counters per backend, updated by the orchestrator on every
//! request.
//!
//! # Architecture
//!
//! ```text
//! CacheAside ─────► ResolverMetrics ─────► MetricsSnapshot ─────► Views
//!                   (atomic counters)      (point-in-time copy)   (CLI, logs)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use synapse::telemetry::ResolverMetrics;
//!
//! let metrics = ResolverMetrics::for_backends(["mem"]);
//! metrics.backend("mem").unwrap().cache_hit();
//!
//! for (name, snapshot) in metrics.snapshots() {
//!     println!("{name}: {snapshot}");
//! }
//! ```

mod metrics;
mod snapshot;

pub use metrics::{BackendMetrics, ResolverMetrics};
pub use snapshot::MetricsSnapshot;
