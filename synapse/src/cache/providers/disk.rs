//! Embedded on-disk store.
//!
//! One file per key under a root directory. The store is synchronous
//! (`std::fs`), so it implements [`SyncBackend`] and reaches the orchestrator
//! only through a [`BlockingAdapter`](crate::cache::BlockingAdapter).
//!
//! # Layout
//!
//! ```text
//! <root>/<hh>/<sha256(key) as hex>
//! ```
//!
//! where `hh` is the first two hex characters of the digest. Each file holds
//! an 8-byte big-endian expiry timestamp (unix milliseconds, `0` = never)
//! followed by the raw value.
//!
//! # Expiry
//!
//! The store has no eviction of its own. Expired entries are detected and
//! removed lazily when read.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::cache::traits::{AdapterError, SyncBackend};

/// Length of the expiry header preceding every value.
const HEADER_LEN: usize = 8;

/// Default maximum value size (64 MB).
pub const DEFAULT_MAX_VALUE_BYTES: usize = 64 * 1024 * 1024;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// File-per-key store rooted at a directory.
#[derive(Debug)]
pub struct DiskStore {
    root: PathBuf,
    max_value_bytes: usize,
}

impl DiskStore {
    /// Open (creating if needed) a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::Io` if the directory cannot be created, or
    /// `AdapterError::Unavailable` if `root` exists but is not a directory.
    pub fn open(root: impl Into<PathBuf>, max_value_bytes: usize) -> Result<Self, AdapterError> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        if !fs::metadata(&root)?.is_dir() {
            return Err(AdapterError::Unavailable(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        Ok(Self {
            root,
            max_value_bytes,
        })
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the maximum accepted value size.
    pub fn max_value_bytes(&self) -> usize {
        self.max_value_bytes
    }

    /// Remove a key. Returns whether a file was deleted.
    pub fn remove(&self, key: &str) -> Result<bool, AdapterError> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Constructs the path for a key.
    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = format!("{:x}", Sha256::digest(key.as_bytes()));
        self.root.join(&digest[..2]).join(digest)
    }
}

impl SyncBackend for DiskStore {
    fn get(&self, key: &str) -> Result<Option<Bytes>, AdapterError> {
        let path = self.entry_path(key);

        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let (expires_at, value) = decode_entry(Bytes::from(raw))?;

        if expires_at != 0 && now_millis() >= expires_at {
            debug!(key = %key, "Disk entry expired");
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != ErrorKind::NotFound {
                    warn!(error = %e, path = %path.display(), "Failed to remove expired entry");
                }
            }
            return Ok(None);
        }

        Ok(Some(value))
    }

    fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), AdapterError> {
        if value.len() > self.max_value_bytes {
            return Err(AdapterError::ValueTooLarge {
                size: value.len(),
                max: self.max_value_bytes,
            });
        }

        let path = self.entry_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let expires_at = ttl.map(|ttl| {
            let ttl_millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
            now_millis().saturating_add(ttl_millis).max(1)
        });
        let mut buf = Vec::with_capacity(HEADER_LEN + value.len());
        buf.extend_from_slice(&expires_at.unwrap_or(0).to_be_bytes());
        buf.extend_from_slice(&value);

        // Write-then-rename so readers never observe a partial entry
        let temp = path.with_extension(format!(
            "tmp.{}.{}",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&temp, &buf)?;
        if let Err(e) = fs::rename(&temp, &path) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }

        Ok(())
    }
}

fn decode_entry(raw: Bytes) -> Result<(u64, Bytes), AdapterError> {
    if raw.len() < HEADER_LEN {
        return Err(AdapterError::Corrupt(format!(
            "entry is {} bytes, shorter than its header",
            raw.len()
        )));
    }

    let mut header = [0u8; HEADER_LEN];
    header.copy_from_slice(&raw[..HEADER_LEN]);
    Ok((u64::from_be_bytes(header), raw.slice(HEADER_LEN..)))
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
