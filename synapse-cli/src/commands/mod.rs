//! CLI subcommands.

pub mod backends;
pub mod bench;
pub mod get;

use synapse::config::MEMORY_BACKEND;

/// Backend used when `--backend` is not given.
pub const DEFAULT_BACKEND: &str = MEMORY_BACKEND;
