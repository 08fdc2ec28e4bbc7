//! Cache backend implementations.
//!
//! # Available Providers
//!
//! - [`MemoryAdapter`]: In-process bounded cache using moka (non-blocking)
//! - [`DiskStore`]: Embedded file-per-key store (blocking, wrap it in a
//!   [`BlockingAdapter`](super::BlockingAdapter))
//!
//! Clients for external cache services plug in the same way: an async client
//! implements [`BackendAdapter`](super::BackendAdapter) directly, a
//! synchronous one implements [`SyncBackend`](super::SyncBackend).

mod disk;
mod memory;

pub use disk::{DiskStore, DEFAULT_MAX_VALUE_BYTES};
pub use memory::MemoryAdapter;
