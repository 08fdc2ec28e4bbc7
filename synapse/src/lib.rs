//! Synapse - backend-agnostic cache-aside orchestration
//!
//! Given a backend name and a key, synapse looks the key up in the selected
//! cache, falls back to a slow origin on a miss, writes the loaded value back
//! and returns it together with per-stage latency.
//!
//! Backends are normalized behind [`cache::BackendAdapter`]. Asynchronous
//! stores (the in-process moka cache) are awaited directly; synchronous
//! stores (the embedded disk store) only ever run on the bounded blocking
//! [`executor::WorkerPool`].
//!
//! # Example
//!
//! ```ignore
//! use synapse::app::SynapseApp;
//! use synapse::config::{AppConfig, MEMORY_BACKEND};
//!
//! let app = SynapseApp::start(AppConfig::default())?;
//! let resolved = app.resolve(MEMORY_BACKEND, "user:42").await?;
//! println!("{} from {} ({})", resolved.value.len(), resolved.source, resolved.latency);
//! ```

pub mod app;
pub mod cache;
pub mod config;
pub mod executor;
pub mod latency;
pub mod logging;
pub mod orchestrator;
pub mod origin;
pub mod registry;
pub mod telemetry;

pub use app::{AppError, SynapseApp};
pub use cache::{BackendAdapter, CacheResult, Capabilities, SyncBackend};
pub use orchestrator::{CacheAside, ResolveError, Resolved, Source, StoreOutcome};
pub use registry::{BackendRegistry, BackendUnavailable};
