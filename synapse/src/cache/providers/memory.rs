//! In-process bounded cache using moka.
//!
//! This adapter wraps `moka::future::Cache` to provide an async-safe,
//! memory-bounded map with automatic eviction and per-entry expiry.
//!
//! Reads are lock-free, writes never block the runtime, and both size-bounded
//! eviction and per-entry expiry (through the [`Expiry`] policy) are handled
//! by moka itself.
//!
//! # TTL
//!
//! Each entry carries its own TTL. `set` with `ttl = None` falls back to the
//! adapter's default TTL; when that is also `None` the entry only leaves the
//! cache through eviction.

use std::time::{Duration, Instant};

use bytes::Bytes;
use moka::future::Cache as MokaCache;
use moka::Expiry;

use crate::cache::traits::{AdapterError, BackendAdapter, BoxFuture, CacheResult, Capabilities};

#[derive(Clone)]
struct Entry {
    value: Bytes,
    ttl: Option<Duration>,
}

/// Expires each entry after its own TTL, restarting on overwrite.
struct EntryExpiry;

impl Expiry<String, Entry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// Bounded in-process cache adapter.
///
/// Entries are weighted by key plus value length, so `max_size_bytes` bounds
/// the payload held in memory.
pub struct MemoryAdapter {
    cache: MokaCache<String, Entry>,
    max_size_bytes: u64,
    default_ttl: Option<Duration>,
}

impl MemoryAdapter {
    /// Create a new memory adapter.
    ///
    /// # Arguments
    ///
    /// * `max_size_bytes` - Maximum cache size in bytes
    /// * `default_ttl` - TTL applied when `set` is called without one
    pub fn new(max_size_bytes: u64, default_ttl: Option<Duration>) -> Self {
        let cache = MokaCache::builder()
            .weigher(|key: &String, entry: &Entry| -> u32 {
                // moka uses u32 for weights, cap at u32::MAX for very large entries
                (key.len() + entry.value.len()).min(u32::MAX as usize) as u32
            })
            .max_capacity(max_size_bytes)
            .expire_after(EntryExpiry)
            .build();

        Self {
            cache,
            max_size_bytes,
            default_ttl,
        }
    }

    /// Remove a key. Returns whether it was present.
    pub async fn delete(&self, key: &str) -> bool {
        self.cache.remove(key).await.is_some()
    }

    /// Check if a key exists without cloning the value.
    pub fn contains(&self, key: &str) -> bool {
        self.cache.contains_key(key)
    }

    /// Weighted size of all entries (eventually consistent).
    pub fn size_bytes(&self) -> u64 {
        self.cache.weighted_size()
    }

    /// Number of entries (eventually consistent).
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Maximum configured size in bytes.
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// TTL applied when `set` receives none.
    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    /// Run pending eviction and expiry maintenance.
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

impl BackendAdapter for MemoryAdapter {
    fn get(&self, key: &str) -> BoxFuture<'_, CacheResult> {
        let key = key.to_string();
        Box::pin(async move {
            match self.cache.get(&key).await {
                Some(entry) => CacheResult::Hit(entry.value),
                None => CacheResult::Miss,
            }
        })
    }

    fn set(
        &self,
        key: &str,
        value: Bytes,
        ttl: Option<Duration>,
    ) -> BoxFuture<'_, Result<(), AdapterError>> {
        let key = key.to_string();
        Box::pin(async move {
            let weight = (key.len() + value.len()) as u64;
            if weight > self.max_size_bytes {
                // Larger than the whole cache
                return Err(AdapterError::ValueTooLarge {
                    size: weight as usize,
                    max: self.max_size_bytes as usize,
                });
            }

            let entry = Entry {
                value,
                ttl: ttl.or(self.default_ttl),
            };
            self.cache.insert(key, entry).await;
            Ok(())
        })
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::non_blocking()
    }
}
