//! Cache backends behind one adapter contract.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                  Cache-Aside Orchestrator              │
//! └───────────────────────────┬────────────────────────────┘
//!                             │ Arc<dyn BackendAdapter>
//!              ┌──────────────┴───────────────┐
//!              ▼                              ▼
//! ┌────────────────────────┐    ┌────────────────────────────┐
//! │ MemoryAdapter (moka)   │    │ BlockingAdapter<S>         │
//! │ non-blocking           │    │  └── WorkerPool            │
//! └────────────────────────┘    │       └── S: SyncBackend   │
//!                               │           (DiskStore, …)   │
//!                               └────────────────────────────┘
//! ```

mod blocking;
pub mod providers;
mod traits;

pub use blocking::BlockingAdapter;
pub use providers::{DiskStore, MemoryAdapter, DEFAULT_MAX_VALUE_BYTES};
pub use traits::{
    AdapterError, BackendAdapter, BoxFuture, CacheResult, Capabilities, SyncBackend,
};
