//! Core traits for cache backends.
//!
//! The [`BackendAdapter`] trait provides a uniform, backend-agnostic interface
//! over one concrete cache store. The cache-aside orchestrator only ever talks
//! to stores through this trait, so an in-process map, an embedded file store
//! and a client for an external cache service all look the same to it.
//!
//! # Design Principles
//!
//! - **String keys**: Human-readable for debugging, scoped per backend
//! - **`Bytes` values**: Opaque payloads, cheap to clone between the caller
//!   and the write-back
//! - **Miss is not an error**: `get` reports [`CacheResult::Miss`], never `Err`
//! - **Dyn-compatible**: Uses `Pin<Box<dyn Future>>` for trait object support
//!
//! # Blocking Stores
//!
//! Stores whose client has no asynchronous variant implement [`SyncBackend`]
//! instead. A `SyncBackend` cannot be used by the orchestrator directly; it is
//! wrapped in a [`BlockingAdapter`](super::BlockingAdapter), which dispatches
//! every call onto the blocking worker pool.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheResult {
    /// The key is present. Zero-length values are valid hits.
    Hit(Bytes),
    /// The key is not present (or has expired).
    Miss,
    /// The backend could not be reached.
    Unavailable,
}

impl CacheResult {
    /// Returns `true` for [`CacheResult::Hit`].
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheResult::Hit(_))
    }

    /// Returns `true` for [`CacheResult::Miss`].
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheResult::Miss)
    }
}

/// Static capability metadata reported by every adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Calls block the calling thread and must run on the worker pool.
    pub blocking: bool,
    /// The store evicts entries on its own (capacity or LRU based).
    pub own_eviction: bool,
}

impl Capabilities {
    /// Capabilities of an asynchronous store with its own eviction.
    pub const fn non_blocking() -> Self {
        Self {
            blocking: false,
            own_eviction: true,
        }
    }

    /// Capabilities of a synchronous store.
    pub const fn blocking(own_eviction: bool) -> Self {
        Self {
            blocking: true,
            own_eviction,
        }
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}",
            if self.blocking { "blocking" } else { "non-blocking" },
            if self.own_eviction {
                "own eviction"
            } else {
                "no eviction"
            }
        )
    }
}

/// Errors reported by backend adapters.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// I/O error talking to the store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store is not reachable.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// The operation did not complete within its deadline.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Value exceeds maximum allowed size.
    #[error("Value too large: {size} bytes (max: {max})")]
    ValueTooLarge { size: usize, max: usize },

    /// The store refused the write.
    #[error("Write rejected: {0}")]
    Rejected(String),

    /// The blocking worker pool failed to run the call.
    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    /// Stored data could not be decoded.
    #[error("Corrupt entry: {0}")]
    Corrupt(String),
}

impl AdapterError {
    /// Whether the error means the store itself could not be reached.
    ///
    /// Lookups map these to [`CacheResult::Unavailable`].
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            AdapterError::Unavailable(_) | AdapterError::Timeout(_) | AdapterError::WorkerPool(_)
        )
    }
}

/// Uniform async interface over one concrete cache store.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. The orchestrator calls adapters
/// concurrently from many requests without external locking, so each adapter
/// serializes its own mutations.
///
/// # TTL
///
/// `ttl` is advisory. `None` means the backend's default, which may be
/// "never expire". The adapter is the sole authority on whether a stored key
/// is still present.
pub trait BackendAdapter: Send + Sync {
    /// Look up a key.
    ///
    /// # Returns
    ///
    /// - `Hit(data)` if the key exists
    /// - `Miss` if the key is not found
    /// - `Unavailable` if the store could not be reached
    fn get(&self, key: &str) -> BoxFuture<'_, CacheResult>;

    /// Store a value, replacing any existing entry for the key.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError` if the store rejected or failed the write.
    fn set(
        &self,
        key: &str,
        value: Bytes,
        ttl: Option<Duration>,
    ) -> BoxFuture<'_, Result<(), AdapterError>>;

    /// Static capability tag of this adapter.
    fn capabilities(&self) -> Capabilities;
}

/// Synchronous interface for stores without an async client.
///
/// Implementations may block the calling thread for the duration of a call.
pub trait SyncBackend: Send + Sync + 'static {
    /// Look up a key. `Ok(None)` means "not found".
    fn get(&self, key: &str) -> Result<Option<Bytes>, AdapterError>;

    /// Store a value, replacing any existing entry for the key.
    fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), AdapterError>;

    /// Whether the store evicts entries on its own.
    fn own_eviction(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_result_predicates() {
        assert!(CacheResult::Hit(Bytes::from_static(b"v")).is_hit());
        assert!(CacheResult::Hit(Bytes::new()).is_hit());
        assert!(CacheResult::Miss.is_miss());
        assert!(!CacheResult::Unavailable.is_hit());
        assert!(!CacheResult::Unavailable.is_miss());
    }

    #[test]
    fn test_capabilities_display() {
        assert_eq!(
            Capabilities::non_blocking().to_string(),
            "non-blocking, own eviction"
        );
        assert_eq!(
            Capabilities::blocking(false).to_string(),
            "blocking, no eviction"
        );
    }

    #[test]
    fn test_adapter_error_display() {
        let err = AdapterError::ValueTooLarge { size: 100, max: 50 };
        assert!(format!("{}", err).contains("100"));
        assert!(format!("{}", err).contains("50"));

        let err = AdapterError::Timeout(Duration::from_millis(250));
        assert!(err.to_string().contains("250ms"));
    }

    #[test]
    fn test_adapter_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AdapterError = io_err.into();
        assert!(matches!(err, AdapterError::Io(_)));
        assert!(!err.is_connectivity());
    }

    #[test]
    fn test_connectivity_classification() {
        assert!(AdapterError::Unavailable("gone".into()).is_connectivity());
        assert!(AdapterError::Timeout(Duration::from_secs(1)).is_connectivity());
        assert!(AdapterError::WorkerPool("closed".into()).is_connectivity());
        assert!(!AdapterError::Rejected("full".into()).is_connectivity());
    }
}
