//! CLI error type and exit codes.

use std::fmt;

use synapse::config::ConfigError;
use synapse::logging::LoggingError;
use synapse::{AppError, ResolveError};

/// Errors surfaced to the user by the `synapse` binary.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded or is invalid.
    Config(String),

    /// Logging could not be initialized.
    Logging(LoggingError),

    /// The Tokio runtime could not be created.
    Runtime(String),

    /// The requested backend is not registered or not reachable.
    Unavailable { backend: String },

    /// The origin failed to produce a value.
    LoadFailure(String),

    /// Output could not be rendered.
    Output(String),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) => 2,
            CliError::Unavailable { .. } => 3,
            CliError::LoadFailure(_) => 4,
            CliError::Logging(_) | CliError::Runtime(_) | CliError::Output(_) => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Logging(e) => write!(f, "Logging error: {}", e),
            CliError::Runtime(msg) => write!(f, "Failed to create Tokio runtime: {}", msg),
            CliError::Unavailable { backend } => {
                write!(f, "Backend '{}' is not available", backend)
            }
            CliError::LoadFailure(msg) => write!(f, "Origin load failed: {}", msg),
            CliError::Output(msg) => write!(f, "Failed to render output: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Logging(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<AppError> for CliError {
    fn from(e: AppError) -> Self {
        match e {
            AppError::Config(e) => e.into(),
        }
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<ResolveError> for CliError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::Unavailable { backend } => CliError::Unavailable { backend },
            e @ ResolveError::LoadFailure { .. } => CliError::LoadFailure(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Output(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synapse::origin::LoadError;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Config("x".into()).exit_code(), 2);
        assert_eq!(
            CliError::Unavailable {
                backend: "redis".into()
            }
            .exit_code(),
            3
        );
        assert_eq!(CliError::LoadFailure("x".into()).exit_code(), 4);
        assert_eq!(CliError::Output("x".into()).exit_code(), 1);
    }

    #[test]
    fn test_from_resolve_error() {
        let err: CliError = ResolveError::Unavailable {
            backend: "redis".into(),
        }
        .into();
        assert!(matches!(err, CliError::Unavailable { ref backend } if backend == "redis"));
        assert!(err.to_string().contains("redis"));

        let err: CliError = ResolveError::LoadFailure {
            key: "k2".into(),
            source: LoadError::NotFound { key: "k2".into() },
        }
        .into();
        assert!(matches!(err, CliError::LoadFailure(ref msg) if msg.contains("k2")));
    }
}
