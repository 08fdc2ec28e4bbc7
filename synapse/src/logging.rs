//! Tracing subscriber setup.
//!
//! Installs a global subscriber with:
//! - an `EnvFilter` whose default directive comes from [`LoggingConfig::level`]
//!   and which `RUST_LOG` overrides
//! - a console `fmt` layer with local timestamps (UTC if the local offset
//!   cannot be determined)
//! - an optional plain-text file layer behind a non-blocking writer
//!
//! The returned [`WorkerGuard`] flushes the file writer on drop and must be
//! held until the process exits.

use std::path::{Path, PathBuf};

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::UtcOffset;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::time::{OffsetTime, UtcTime};
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Errors installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log level '{level}': {reason}")]
    InvalidLevel { level: String, reason: String },

    #[error("cannot open log file {}: {source}", .path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to install tracing subscriber: {0}")]
    Install(String),
}

/// Build the filter: `level` as default, `RUST_LOG` on top.
pub fn build_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    let directive = level
        .parse::<Directive>()
        .map_err(|e| LoggingError::InvalidLevel {
            level: level.to_string(),
            reason: e.to_string(),
        })?;
    Ok(EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy())
}

/// Install the global subscriber.
///
/// Returns the file writer guard when a log file is configured.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = build_filter(&config.level)?;

    let console = match UtcOffset::current_local_offset() {
        Ok(offset) => fmt::layer()
            .with_target(true)
            .with_timer(OffsetTime::new(offset, Rfc3339))
            .boxed(),
        Err(_) => fmt::layer()
            .with_target(true)
            .with_timer(UtcTime::rfc_3339())
            .boxed(),
    };

    let (file_layer, guard) = match &config.file {
        Some(path) => {
            let writer = open_appender(path)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(writer);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(non_blocking);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::Install(e.to_string()))?;

    Ok(guard)
}

fn open_appender(path: &Path) -> Result<tracing_appender::rolling::RollingFileAppender, LoggingError> {
    let file_name = path.file_name().ok_or_else(|| LoggingError::LogFile {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
    })?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|source| LoggingError::LogFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(tracing_appender::rolling::never(dir, file_name))
}
