//! Static file origin.
//!
//! Every key resolves to the contents of the same file, which makes the miss
//! path cost a real disk read. The read is synchronous (`std::fs::read`) and
//! therefore always runs on the worker pool.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use super::{LoadError, OriginLoader};
use crate::cache::BoxFuture;
use crate::executor::WorkerPool;

/// Loads a static file for any key.
pub struct FileLoader {
    path: PathBuf,
    pool: Arc<WorkerPool>,
}

impl FileLoader {
    /// Create a loader reading `path` on `pool`.
    ///
    /// The file is not checked here; a missing file surfaces as
    /// [`LoadError::SourceMissing`] on the first load.
    pub fn new(path: impl Into<PathBuf>, pool: Arc<WorkerPool>) -> Self {
        Self {
            path: path.into(),
            pool,
        }
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OriginLoader for FileLoader {
    fn load(&self, key: &str) -> BoxFuture<'_, Result<Bytes, LoadError>> {
        let key = key.to_string();
        Box::pin(async move {
            let path = self.path.clone();
            let read = self.pool.run(move || std::fs::read(path)).await?;

            match read {
                Ok(data) => {
                    debug!(key = %key, bytes = data.len(), "Loaded origin file");
                    Ok(Bytes::from(data))
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    Err(LoadError::SourceMissing(self.path.clone()))
                }
                Err(e) => Err(LoadError::Io(e)),
            }
        })
    }

    fn name(&self) -> &str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> Arc<WorkerPool> {
        Arc::new(WorkerPool::new(2, "origin_test"))
    }

    #[tokio::test]
    async fn test_file_loader_reads_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("big.json");
        std::fs::write(&path, b"{\"payload\":true}").unwrap();

        let loader = FileLoader::new(&path, pool());

        let first = loader.load("k1").await.unwrap();
        let second = loader.load("k2").await.unwrap();
        assert_eq!(first, Bytes::from_static(b"{\"payload\":true}"));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_file_loader_missing_source() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("absent.json");
        let loader = FileLoader::new(&path, pool());

        let result = loader.load("k1").await;
        assert!(matches!(result, Err(LoadError::SourceMissing(p)) if p == path));
    }

    #[tokio::test]
    async fn test_file_loader_directory_is_io_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let loader = FileLoader::new(temp_dir.path(), pool());

        assert!(matches!(loader.load("k1").await, Err(LoadError::Io(_))));
    }
}
