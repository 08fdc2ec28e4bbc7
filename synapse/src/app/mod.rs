//! Application bootstrap and lifecycle management.
//!
//! [`SynapseApp`] owns everything a request needs: the blocking worker pool,
//! the frozen backend registry, the origin loader and the cache-aside
//! orchestrator. Nothing is global; callers hold the app (or an `Arc` of its
//! orchestrator) and pass it where needed.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         SynapseApp                            │
//! │                                                               │
//! │  1. WorkerPool ("blocking") ◄──────────────┐                  │
//! │                                            │                  │
//! │  2. BackendRegistry::from_config           │                  │
//! │     ├── "mem"  MemoryAdapter               │                  │
//! │     └── "disk" BlockingAdapter<DiskStore> ─┤                  │
//! │                                            │                  │
//! │  3. OriginLoader                           │                  │
//! │     ├── FileLoader ────────────────────────┘                  │
//! │     └── SyntheticLoader                                       │
//! │                                                               │
//! │  4. CacheAside (registry + loader + TTL + metrics)            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use synapse::app::SynapseApp;
//! use synapse::config::AppConfig;
//!
//! let app = SynapseApp::start(AppConfig::default())?;
//! let resolved = app.resolve("mem", "k1").await?;
//! app.shutdown().await;
//! ```

mod bootstrap;
mod error;

pub use bootstrap::SynapseApp;
pub use error::AppError;
