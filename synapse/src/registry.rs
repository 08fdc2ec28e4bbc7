//! Backend registry.
//!
//! The set of usable backends is decided once at startup and frozen. A
//! backend that fails to initialize is recorded as a startup failure and is
//! never retried; requests naming it get [`BackendUnavailable`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::cache::{
    BackendAdapter, BlockingAdapter, Capabilities, DiskStore, MemoryAdapter, SyncBackend,
};
use crate::config::{AppConfig, BackendConfig};
use crate::executor::WorkerPool;

/// Returned when a backend name is not registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("backend '{0}' is not available")]
pub struct BackendUnavailable(pub String);

/// One registered backend.
#[derive(Clone)]
pub struct BackendDescriptor {
    pub name: String,
    pub adapter: Arc<dyn BackendAdapter>,
    pub capabilities: Capabilities,
}

impl fmt::Debug for BackendDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendDescriptor")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

/// A backend that could not be initialized at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupFailure {
    pub name: String,
    pub reason: String,
}

/// Collects backends before the registry is frozen.
pub struct RegistryBuilder {
    pool: Arc<WorkerPool>,
    backends: BTreeMap<String, BackendDescriptor>,
    failures: Vec<StartupFailure>,
}

impl RegistryBuilder {
    /// Start an empty registry whose blocking stores run on `pool`.
    pub fn new(pool: Arc<WorkerPool>) -> Self {
        Self {
            pool,
            backends: BTreeMap::new(),
            failures: Vec::new(),
        }
    }

    /// Register an adapter. A later registration under the same name wins.
    pub fn register(mut self, name: impl Into<String>, adapter: Arc<dyn BackendAdapter>) -> Self {
        let name = name.into();
        let capabilities = adapter.capabilities();
        if self.backends.contains_key(&name) {
            warn!(backend = %name, "Backend registered twice, replacing");
        }
        self.backends.insert(
            name.clone(),
            BackendDescriptor {
                name,
                adapter,
                capabilities,
            },
        );
        self
    }

    /// Register a synchronous store, wrapped so it runs on the worker pool.
    pub fn register_blocking<S: SyncBackend>(self, name: impl Into<String>, store: S) -> Self {
        let adapter = BlockingAdapter::new(store, Arc::clone(&self.pool));
        self.register(name, Arc::new(adapter))
    }

    /// Record a backend that failed to initialize.
    pub fn record_failure(mut self, name: impl Into<String>, reason: impl fmt::Display) -> Self {
        let name = name.into();
        let reason = reason.to_string();
        warn!(backend = %name, error = %reason, "Backend unavailable, skipping");
        self.failures.push(StartupFailure { name, reason });
        self
    }

    /// Freeze the registry.
    pub fn build(self) -> BackendRegistry {
        for descriptor in self.backends.values() {
            info!(
                backend = %descriptor.name,
                capabilities = %descriptor.capabilities,
                "Backend registered"
            );
        }
        BackendRegistry {
            backends: self.backends,
            failures: self.failures,
        }
    }
}

/// Immutable map of backend name to adapter, shared across requests.
#[derive(Debug, Default)]
pub struct BackendRegistry {
    backends: BTreeMap<String, BackendDescriptor>,
    failures: Vec<StartupFailure>,
}

impl BackendRegistry {
    /// Start building a registry.
    pub fn builder(pool: Arc<WorkerPool>) -> RegistryBuilder {
        RegistryBuilder::new(pool)
    }

    /// Build every backend enabled in `config`.
    ///
    /// Failures are logged and leave the backend absent.
    pub fn from_config(config: &AppConfig, pool: Arc<WorkerPool>) -> Self {
        let mut builder = RegistryBuilder::new(pool);
        for backend in config.backends() {
            let name = backend.name();
            builder = match backend {
                BackendConfig::Memory {
                    max_size_bytes,
                    default_ttl,
                } => builder.register(
                    name,
                    Arc::new(MemoryAdapter::new(max_size_bytes, default_ttl)),
                ),
                BackendConfig::Disk {
                    directory,
                    max_value_bytes,
                } => match DiskStore::open(&directory, max_value_bytes) {
                    Ok(store) => builder.register_blocking(name, store),
                    Err(e) => builder.record_failure(name, e),
                },
            };
        }
        builder.build()
    }

    /// Descriptor for `name`, if registered.
    pub fn lookup(&self, name: &str) -> Option<&BackendDescriptor> {
        self.backends.get(name)
    }

    /// Adapter for `name`.
    pub fn adapter(&self, name: &str) -> Result<Arc<dyn BackendAdapter>, BackendUnavailable> {
        self.lookup(name)
            .map(|d| Arc::clone(&d.adapter))
            .ok_or_else(|| BackendUnavailable(name.to_string()))
    }

    /// Registered backend names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.backends.keys().map(String::as_str)
    }

    /// Registered descriptors in name order.
    pub fn descriptors(&self) -> impl Iterator<Item = &BackendDescriptor> {
        self.backends.values()
    }

    /// Backends that failed to initialize.
    pub fn failures(&self) -> &[StartupFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{AdapterError, BoxFuture, CacheResult};
    use crate::config::{DISK_BACKEND, MEMORY_BACKEND};
    use bytes::Bytes;
    use std::time::Duration;

    struct NullAdapter;

    impl BackendAdapter for NullAdapter {
        fn get(&self, _key: &str) -> BoxFuture<'_, CacheResult> {
            Box::pin(async { CacheResult::Miss })
        }

        fn set(
            &self,
            _key: &str,
            _value: Bytes,
            _ttl: Option<Duration>,
        ) -> BoxFuture<'_, Result<(), AdapterError>> {
            Box::pin(async { Ok(()) })
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::non_blocking()
        }
    }

    struct NullStore;

    impl SyncBackend for NullStore {
        fn get(&self, _key: &str) -> Result<Option<Bytes>, AdapterError> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: Bytes, _ttl: Option<Duration>) -> Result<(), AdapterError> {
            Ok(())
        }
    }

    fn pool() -> Arc<WorkerPool> {
        Arc::new(WorkerPool::new(2, "test"))
    }

    #[test]
    fn test_empty_registry() {
        let registry = BackendRegistry::builder(pool()).build();

        assert!(registry.is_empty());
        assert!(registry.lookup("redis").is_none());
        assert_eq!(
            registry.adapter("redis").err(),
            Some(BackendUnavailable("redis".to_string()))
        );
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = BackendRegistry::builder(pool())
            .register("null", Arc::new(NullAdapter))
            .register_blocking("sync", NullStore)
            .build();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["null", "sync"]);

        let null = registry.lookup("null").unwrap();
        assert!(!null.capabilities.blocking);

        let sync = registry.lookup("sync").unwrap();
        assert!(sync.capabilities.blocking);
        assert!(!sync.capabilities.own_eviction);

        assert!(registry.adapter("sync").is_ok());
    }

    #[test]
    fn test_reregistration_replaces() {
        let registry = BackendRegistry::builder(pool())
            .register("x", Arc::new(NullAdapter))
            .register_blocking("x", NullStore)
            .build();

        assert_eq!(registry.len(), 1);
        assert!(registry.lookup("x").unwrap().capabilities.blocking);
    }

    #[tokio::test]
    async fn test_from_config_defaults_to_memory() {
        let registry = BackendRegistry::from_config(&AppConfig::default(), pool());

        assert_eq!(registry.names().collect::<Vec<_>>(), vec![MEMORY_BACKEND]);
        assert!(registry.failures().is_empty());
        let caps = registry.lookup(MEMORY_BACKEND).unwrap().capabilities;
        assert!(!caps.blocking);
        assert!(caps.own_eviction);
    }

    #[tokio::test]
    async fn test_from_config_with_disk() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = AppConfig::default().with_disk_directory(temp_dir.path().join("store"));

        let registry = BackendRegistry::from_config(&config, pool());

        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec![DISK_BACKEND, MEMORY_BACKEND]
        );
        assert!(registry.lookup(DISK_BACKEND).unwrap().capabilities.blocking);
    }

    #[tokio::test]
    async fn test_disk_failure_leaves_backend_absent() {
        let temp_dir = tempfile::tempdir().unwrap();
        // A regular file where the directory should be
        let blocker = temp_dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();
        let config = AppConfig::default().with_disk_directory(&blocker);

        let registry = BackendRegistry::from_config(&config, pool());

        assert!(registry.lookup(DISK_BACKEND).is_none());
        assert!(registry.lookup(MEMORY_BACKEND).is_some());
        assert_eq!(registry.failures().len(), 1);
        assert_eq!(registry.failures()[0].name, DISK_BACKEND);
    }
}
