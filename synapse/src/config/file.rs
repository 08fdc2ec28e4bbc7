//! Loading configuration from an INI file and the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;
use tracing::debug;

use super::size::parse_size;
use super::AppConfig;

/// Every supported setting: `(section.key, environment variable)`.
pub const SETTINGS: &[(&str, &str)] = &[
    ("memory.enabled", "SYNAPSE_MEMORY_ENABLED"),
    ("memory.max_size", "SYNAPSE_MEMORY_MAX_SIZE"),
    ("memory.default_ttl_secs", "SYNAPSE_MEMORY_TTL_SECS"),
    ("disk.directory", "SYNAPSE_DISK_DIR"),
    ("disk.max_value_size", "SYNAPSE_DISK_MAX_VALUE_SIZE"),
    ("origin.file", "SYNAPSE_ORIGIN_FILE"),
    ("origin.delay_ms", "SYNAPSE_ORIGIN_DELAY_MS"),
    ("resolve.ttl_secs", "SYNAPSE_TTL_SECS"),
    ("executor.blocking_threads", "SYNAPSE_BLOCKING_THREADS"),
    ("executor.timeout_ms", "SYNAPSE_BLOCKING_TIMEOUT_MS"),
    ("logging.level", "SYNAPSE_LOG_LEVEL"),
    ("logging.file", "SYNAPSE_LOG_FILE"),
];

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file could not be read or parsed.
    #[error("failed to read config {}: {reason}", .path.display())]
    Read { path: PathBuf, reason: String },

    /// A setting has a value of the wrong shape.
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: &'static str,
    },
}

/// Default config location: `~/.synapse/config.ini`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".synapse").join("config.ini"))
}

/// Layered configuration loader.
pub struct ConfigFile;

impl ConfigFile {
    /// Load defaults, then the INI file, then environment overrides.
    ///
    /// With `path = None` the default location is used when it exists; an
    /// explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::default();

        let file = match path {
            Some(p) if !p.exists() => return Err(ConfigError::NotFound(p.to_path_buf())),
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        };

        if let Some(file) = file {
            let ini = Ini::load_from_file(&file).map_err(|e| ConfigError::Read {
                path: file.clone(),
                reason: e.to_string(),
            })?;
            debug!(path = %file.display(), "Loaded config file");
            Self::apply_ini(&mut config, &ini)?;
        }

        Self::apply_env(&mut config, |name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Apply every recognised key present in `ini`.
    pub fn apply_ini(config: &mut AppConfig, ini: &Ini) -> Result<(), ConfigError> {
        for (key, _) in SETTINGS {
            let (section, name) = key.split_once('.').unwrap_or(("", key));
            if let Some(value) = ini.get_from(Some(section), name) {
                apply(config, key, value)?;
            }
        }
        Ok(())
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        for (key, env) in SETTINGS {
            if let Some(value) = lookup(env) {
                apply(config, key, &value)?;
            }
        }
        Ok(())
    }
}

fn apply(config: &mut AppConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    let value = value.trim();
    match key {
        "memory.enabled" => config.memory.enabled = parse_bool(key, value)?,
        "memory.max_size" => config.memory.max_size_bytes = size(key, value)?,
        "memory.default_ttl_secs" => config.memory.default_ttl = secs_or_none(key, value)?,
        "disk.directory" => config.disk.directory = path_or_none(value),
        "disk.max_value_size" => config.disk.max_value_bytes = size(key, value)? as usize,
        "origin.file" => config.origin.file = path_or_none(value),
        "origin.delay_ms" => config.origin.delay = Duration::from_millis(number(key, value)?),
        "resolve.ttl_secs" => config.resolve.ttl = secs_or_none(key, value)?,
        "executor.blocking_threads" => {
            let threads = number(key, value)?;
            if threads == 0 {
                return Err(invalid(key, value, "must be at least 1"));
            }
            config.executor.blocking_threads = threads as usize;
        }
        "executor.timeout_ms" => {
            config.executor.timeout = match number(key, value)? {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            }
        }
        "logging.level" => config.logging.level = value.to_string(),
        "logging.file" => config.logging.file = path_or_none(value),
        _ => {}
    }
    Ok(())
}

fn invalid(key: &str, value: &str, reason: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason,
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value, "expected true or false")),
    }
}

fn number(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .parse()
        .map_err(|_| invalid(key, value, "expected a non-negative integer"))
}

fn size(key: &str, value: &str) -> Result<u64, ConfigError> {
    parse_size(value).ok_or_else(|| invalid(key, value, "expected a size like 512K, 64M or 1G"))
}

/// `0` disables the duration.
fn secs_or_none(key: &str, value: &str) -> Result<Option<Duration>, ConfigError> {
    Ok(match number(key, value)? {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    })
}

fn path_or_none(value: &str) -> Option<PathBuf> {
    if value.is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = "\
[memory]
enabled = false
max_size = 64M
default_ttl_secs = 30

[disk]
directory = /var/cache/synapse
max_value_size = 1M

[origin]
file = /srv/big.json
delay_ms = 25

[resolve]
ttl_secs = 0

[executor]
blocking_threads = 8
timeout_ms = 1500

[logging]
level = debug
";

    #[test]
    fn test_apply_ini() {
        let ini = Ini::load_from_str(SAMPLE).unwrap();
        let mut config = AppConfig::default();

        ConfigFile::apply_ini(&mut config, &ini).unwrap();

        assert!(!config.memory.enabled);
        assert_eq!(config.memory.max_size_bytes, 64 * 1024 * 1024);
        assert_eq!(config.memory.default_ttl, Some(Duration::from_secs(30)));
        assert_eq!(config.disk.directory, Some(PathBuf::from("/var/cache/synapse")));
        assert_eq!(config.disk.max_value_bytes, 1024 * 1024);
        assert_eq!(config.origin.file, Some(PathBuf::from("/srv/big.json")));
        assert_eq!(config.origin.delay, Duration::from_millis(25));
        assert_eq!(config.resolve.ttl, None);
        assert_eq!(config.executor.blocking_threads, 8);
        assert_eq!(config.executor.timeout, Some(Duration::from_millis(1500)));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_env_overrides_file() {
        let ini = Ini::load_from_str(SAMPLE).unwrap();
        let mut config = AppConfig::default();
        ConfigFile::apply_ini(&mut config, &ini).unwrap();

        let env: HashMap<&str, &str> = [
            ("SYNAPSE_MEMORY_ENABLED", "true"),
            ("SYNAPSE_DISK_DIR", ""),
            ("SYNAPSE_TTL_SECS", "120"),
        ]
        .into_iter()
        .collect();
        ConfigFile::apply_env(&mut config, |name| env.get(name).map(|v| v.to_string())).unwrap();

        assert!(config.memory.enabled);
        assert_eq!(config.disk.directory, None);
        assert_eq!(config.resolve.ttl, Some(Duration::from_secs(120)));
        // Untouched by env
        assert_eq!(config.origin.delay, Duration::from_millis(25));
    }

    #[test]
    fn test_invalid_values_name_the_key() {
        let mut config = AppConfig::default();

        let err = ConfigFile::apply_env(&mut config, |name| {
            (name == "SYNAPSE_MEMORY_MAX_SIZE").then(|| "huge".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("memory.max_size"));

        let err = ConfigFile::apply_env(&mut config, |name| {
            (name == "SYNAPSE_BLOCKING_THREADS").then(|| "0".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = ConfigFile::apply_env(&mut config, |name| {
            (name == "SYNAPSE_MEMORY_ENABLED").then(|| "maybe".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("nope.ini");

        let err = ConfigFile::load(Some(&missing)).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(p) if p == missing));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.ini");
        std::fs::write(&path, "[origin]\ndelay_ms = 7\n").unwrap();

        let config = ConfigFile::load(Some(&path)).unwrap();
        assert_eq!(config.origin.delay, Duration::from_millis(7));
    }

    #[test]
    fn test_every_setting_is_applied() {
        for (key, _) in SETTINGS {
            let mut config = AppConfig::default();
            // "1" is valid for every numeric, bool, size, path and level setting
            apply(&mut config, key, "1").unwrap();
        }
    }
}
