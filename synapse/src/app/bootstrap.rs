//! Application bootstrap implementation.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use super::error::AppError;
use crate::config::{AppConfig, ConfigFile};
use crate::executor::WorkerPool;
use crate::orchestrator::{CacheAside, ResolveError, Resolved};
use crate::origin::{FileLoader, OriginLoader, SyntheticLoader};
use crate::registry::BackendRegistry;

/// Label of the shared blocking pool.
const BLOCKING_POOL_LABEL: &str = "blocking";

/// A started synapse instance.
///
/// Startup order:
/// 1. Blocking worker pool
/// 2. Backend registry (backends that fail to open are skipped)
/// 3. Origin loader
/// 4. Cache-aside orchestrator
pub struct SynapseApp {
    config: AppConfig,
    pool: Arc<WorkerPool>,
    registry: Arc<BackendRegistry>,
    cache_aside: Arc<CacheAside>,
}

impl SynapseApp {
    /// Start from an already loaded configuration.
    ///
    /// Backend initialization failures are logged and leave that backend
    /// out of the registry; they do not fail startup.
    pub fn start(config: AppConfig) -> Result<Self, AppError> {
        info!("Starting synapse");

        let mut pool = WorkerPool::new(config.executor.blocking_threads, BLOCKING_POOL_LABEL);
        if let Some(timeout) = config.executor.timeout {
            pool = pool.with_timeout(timeout);
        }
        let pool = Arc::new(pool);

        let registry = Arc::new(BackendRegistry::from_config(&config, Arc::clone(&pool)));
        if registry.is_empty() {
            warn!("No backends registered, every request will be unavailable");
        }

        let loader = Self::create_loader(&config, &pool);
        info!(
            origin = loader.name(),
            ttl_secs = config.resolve.ttl.map(|t| t.as_secs()),
            "Origin loader ready"
        );

        let cache_aside =
            Arc::new(CacheAside::new(Arc::clone(&registry), loader).with_ttl(config.resolve.ttl));

        info!(backends = registry.len(), "Synapse started");

        Ok(Self {
            config,
            pool,
            registry,
            cache_aside,
        })
    }

    /// Load configuration (file, then environment) and start.
    pub fn from_config_file(path: Option<&Path>) -> Result<Self, AppError> {
        let config = ConfigFile::load(path)?;
        Self::start(config)
    }

    fn create_loader(config: &AppConfig, pool: &Arc<WorkerPool>) -> Arc<dyn OriginLoader> {
        match &config.origin.file {
            Some(path) => {
                if !path.exists() {
                    // Reported per request as a load failure
                    warn!(path = %path.display(), "Origin file does not exist yet");
                }
                Arc::new(FileLoader::new(path.clone(), Arc::clone(pool)))
            }
            None => Arc::new(SyntheticLoader::new(config.origin.delay)),
        }
    }

    /// Resolve `key` against `backend`.
    pub async fn resolve(&self, backend: &str, key: &str) -> Result<Resolved, ResolveError> {
        self.cache_aside.resolve(backend, key).await
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }

    /// Shared handle to the orchestrator for spawning concurrent requests.
    pub fn cache_aside(&self) -> Arc<CacheAside> {
        Arc::clone(&self.cache_aside)
    }

    /// Shut down: stop accepting blocking work.
    ///
    /// Calls already dispatched to the pool run to completion.
    pub async fn shutdown(self) {
        info!("Shutting down synapse");
        self.pool.close();
        for (name, snapshot) in self.cache_aside.metrics().snapshots() {
            info!(backend = %name, stats = %snapshot, "Backend totals");
        }
        info!("Synapse shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DISK_BACKEND, MEMORY_BACKEND};
    use crate::orchestrator::Source;
    use bytes::Bytes;
    use std::time::Duration;
    use tempfile::tempdir;

    fn fast_config() -> AppConfig {
        AppConfig::default().with_origin_delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_app_start_and_shutdown() {
        let app = SynapseApp::start(fast_config()).unwrap();

        assert_eq!(app.registry().names().collect::<Vec<_>>(), vec![MEMORY_BACKEND]);
        assert_eq!(app.pool().label(), "blocking");
        assert_eq!(app.cache_aside().loader().name(), "synthetic");

        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_app_resolves_through_memory() {
        let app = SynapseApp::start(fast_config()).unwrap();

        let first = app.resolve(MEMORY_BACKEND, "k1").await.unwrap();
        assert_eq!(first.source, Source::Origin);
        assert_eq!(first.value, Bytes::from("Data for k1"));

        let second = app.resolve(MEMORY_BACKEND, "k1").await.unwrap();
        assert_eq!(second.source, Source::Cache);

        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_app_with_disk_and_file_origin() {
        let temp_dir = tempdir().unwrap();
        let origin = temp_dir.path().join("big.json");
        std::fs::write(&origin, br#"{"big":true}"#).unwrap();

        let config = fast_config()
            .with_memory_enabled(false)
            .with_disk_directory(temp_dir.path().join("disk"))
            .with_origin_file(&origin);
        let app = SynapseApp::start(config).unwrap();

        assert_eq!(app.cache_aside().loader().name(), "file");
        let first = app.resolve(DISK_BACKEND, "any").await.unwrap();
        assert_eq!(first.source, Source::Origin);
        assert_eq!(first.value, Bytes::from_static(br#"{"big":true}"#));

        let second = app.resolve(DISK_BACKEND, "any").await.unwrap();
        assert_eq!(second.source, Source::Cache);
        assert_eq!(second.value, first.value);

        assert!(app.resolve(MEMORY_BACKEND, "any").await.unwrap_err().is_unavailable());

        app.shutdown().await;
    }

    #[tokio::test]
    async fn test_closed_pool_makes_disk_unavailable() {
        let temp_dir = tempdir().unwrap();
        let config = fast_config().with_disk_directory(temp_dir.path());
        let app = SynapseApp::start(config).unwrap();

        app.pool().close();

        let err = app.resolve(DISK_BACKEND, "k").await.unwrap_err();
        assert!(err.is_unavailable());
        // Memory does not use the pool
        assert!(app.resolve(MEMORY_BACKEND, "k").await.is_ok());
    }

    #[test]
    fn test_from_config_file_missing() {
        let temp_dir = tempdir().unwrap();
        let missing = temp_dir.path().join("absent.ini");
        let result = SynapseApp::from_config_file(Some(missing.as_path()));
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
