//! Configuration for synapse.
//!
//! Settings are layered: built-in defaults, then an optional INI file, then
//! `SYNAPSE_*` environment variables. Everything is read once at startup;
//! backend availability is derived from the result and never re-checked.
//!
//! # Example `config.ini`
//!
//! ```ini
//! [memory]
//! enabled = true
//! max_size = 256M
//! default_ttl_secs = 0
//!
//! [disk]
//! directory = /var/cache/synapse
//! max_value_size = 64M
//!
//! [origin]
//! file = /srv/data/big.json
//! delay_ms = 300
//!
//! [resolve]
//! ttl_secs = 60
//!
//! [executor]
//! blocking_threads = 32
//! timeout_ms = 2000
//!
//! [logging]
//! level = info
//! file = /var/log/synapse/synapse.log
//! ```

mod file;
mod size;

use std::path::PathBuf;
use std::time::Duration;

pub use file::{default_config_path, ConfigError, ConfigFile, SETTINGS};
pub use size::{format_size, parse_size};

use crate::cache::DEFAULT_MAX_VALUE_BYTES;
use crate::executor::default_worker_count;
use crate::origin::DEFAULT_SYNTHETIC_DELAY;

/// Registry name of the in-process memory backend.
pub const MEMORY_BACKEND: &str = "mem";

/// Registry name of the embedded disk backend.
pub const DISK_BACKEND: &str = "disk";

/// Default memory cache size (256 MB).
pub const DEFAULT_MEMORY_SIZE: u64 = 256 * 1024 * 1024;

/// Default TTL passed to `set` on write-back.
pub const DEFAULT_RESOLVE_TTL: Duration = Duration::from_secs(60);

/// Complete application configuration.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub memory: MemoryConfig,
    pub disk: DiskConfig,
    pub origin: OriginConfig,
    pub resolve: ResolveConfig,
    pub executor: ExecutorConfig,
    pub logging: LoggingConfig,
}

/// In-process memory backend settings.
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Register the memory backend at startup.
    pub enabled: bool,
    /// Maximum weighted size in bytes.
    pub max_size_bytes: u64,
    /// TTL used when `set` is called without one.
    pub default_ttl: Option<Duration>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size_bytes: DEFAULT_MEMORY_SIZE,
            default_ttl: None,
        }
    }
}

/// Embedded disk backend settings.
#[derive(Debug, Clone)]
pub struct DiskConfig {
    /// Root directory. `None` means the disk backend is never registered.
    pub directory: Option<PathBuf>,
    /// Largest value accepted by `set`.
    pub max_value_bytes: usize,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            directory: None,
            max_value_bytes: DEFAULT_MAX_VALUE_BYTES,
        }
    }
}

/// Origin loader settings.
#[derive(Debug, Clone)]
pub struct OriginConfig {
    /// Static file served for every key. `None` selects the synthetic origin.
    pub file: Option<PathBuf>,
    /// Simulated latency of the synthetic origin.
    pub delay: Duration,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            file: None,
            delay: DEFAULT_SYNTHETIC_DELAY,
        }
    }
}

/// Orchestrator settings.
#[derive(Debug, Clone)]
pub struct ResolveConfig {
    /// TTL passed to the backend on write-back. `None` = backend default.
    pub ttl: Option<Duration>,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            ttl: Some(DEFAULT_RESOLVE_TTL),
        }
    }
}

/// Blocking worker pool settings.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Maximum concurrent blocking calls.
    pub blocking_threads: usize,
    /// Deadline for each blocking call.
    pub timeout: Option<Duration>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            blocking_threads: default_worker_count(),
            timeout: None,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default filter directive (overridden by `RUST_LOG`).
    pub level: String,
    /// Optional log file, written through a non-blocking appender.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// A backend the registry should try to build at startup.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendConfig {
    Memory {
        max_size_bytes: u64,
        default_ttl: Option<Duration>,
    },
    Disk {
        directory: PathBuf,
        max_value_bytes: usize,
    },
}

impl BackendConfig {
    /// Registry name of this backend.
    pub fn name(&self) -> &'static str {
        match self {
            BackendConfig::Memory { .. } => MEMORY_BACKEND,
            BackendConfig::Disk { .. } => DISK_BACKEND,
        }
    }
}

impl AppConfig {
    /// Backends enabled by this configuration, in registration order.
    pub fn backends(&self) -> Vec<BackendConfig> {
        let mut backends = Vec::with_capacity(2);
        if self.memory.enabled {
            backends.push(BackendConfig::Memory {
                max_size_bytes: self.memory.max_size_bytes,
                default_ttl: self.memory.default_ttl,
            });
        }
        if let Some(directory) = &self.disk.directory {
            backends.push(BackendConfig::Disk {
                directory: directory.clone(),
                max_value_bytes: self.disk.max_value_bytes,
            });
        }
        backends
    }

    /// Set the disk backend directory.
    pub fn with_disk_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.disk.directory = Some(directory.into());
        self
    }

    /// Set the origin file.
    pub fn with_origin_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.origin.file = Some(file.into());
        self
    }

    /// Set the synthetic origin delay.
    pub fn with_origin_delay(mut self, delay: Duration) -> Self {
        self.origin.delay = delay;
        self
    }

    /// Set the write-back TTL.
    pub fn with_resolve_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.resolve.ttl = ttl;
        self
    }

    /// Enable or disable the memory backend.
    pub fn with_memory_enabled(mut self, enabled: bool) -> Self {
        self.memory.enabled = enabled;
        self
    }
}
