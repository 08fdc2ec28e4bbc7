//! Origin loaders: the authoritative, slow source consulted on a cache miss.
//!
//! # Available Loaders
//!
//! - [`FileLoader`]: Reads one static file through the blocking worker pool
//! - [`SyntheticLoader`]: Produces `"Data for {key}"` after a fixed delay,
//!   standing in for a slow database query

mod file;
mod synthetic;

use std::path::PathBuf;

use bytes::Bytes;
use thiserror::Error;

use crate::cache::BoxFuture;
use crate::executor::PoolError;

pub use file::FileLoader;
pub use synthetic::{SyntheticLoader, DEFAULT_SYNTHETIC_DELAY};

/// Errors produced while loading from the origin.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The origin has no data for the key.
    ///
    /// For keyed origins such as a database table. The bundled loaders
    /// answer every key and never return it.
    #[error("no origin data for key '{key}'")]
    NotFound { key: String },

    /// The backing data source does not exist.
    #[error("origin source missing: {}", .0.display())]
    SourceMissing(PathBuf),

    /// I/O error reading the origin.
    #[error("origin I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking read could not be dispatched.
    #[error("origin read failed: {0}")]
    WorkerPool(#[from] PoolError),
}

/// Source of truth for values missing from the cache.
///
/// A load failure is fatal to the request that triggered it and is never
/// cached as a negative result.
pub trait OriginLoader: Send + Sync {
    /// Produce the value for `key`.
    fn load(&self, key: &str) -> BoxFuture<'_, Result<Bytes, LoadError>>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_display() {
        let err = LoadError::NotFound {
            key: "k2".to_string(),
        };
        assert_eq!(err.to_string(), "no origin data for key 'k2'");

        let err = LoadError::SourceMissing(PathBuf::from("/data/big.json"));
        assert!(err.to_string().contains("/data/big.json"));
    }

    #[test]
    fn test_load_error_from_pool_error() {
        let err: LoadError = PoolError::Cancelled.into();
        assert!(matches!(err, LoadError::WorkerPool(PoolError::Cancelled)));
    }
}
