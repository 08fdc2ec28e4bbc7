//! Synapse CLI - Command-line interface
//!
//! Drives the cache-aside core from the terminal: list backends, resolve
//! keys with per-stage timing, and run concurrent benchmarks.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use synapse::config::{AppConfig, ConfigFile};
use synapse::logging::init_logging;
use synapse::SynapseApp;

use commands::{bench, get};
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "synapse", version, about = "Cache-aside orchestration with per-stage latency")]
struct Cli {
    /// Config file (default: ~/.synapse/config.ini if present)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log filter, e.g. "info" or "synapse=debug" (RUST_LOG takes precedence)
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List registered backends and their capabilities
    Backends,
    /// Resolve a key and print its source and timing
    Get(get::GetArgs),
    /// Drive concurrent resolves and report hit rate and latency
    Bench(bench::BenchArgs),
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(cli.config.as_deref(), cli.log_level)?;
    let _log_guard = init_logging(&config.logging)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    let app = SynapseApp::start(config)?;
    runtime.block_on(async move {
        let result = match cli.command {
            Command::Backends => commands::backends::run(&app),
            Command::Get(args) => get::run(&app, args).await,
            Command::Bench(args) => bench::run(&app, args).await,
        };
        app.shutdown().await;
        result
    })
}

/// Load layered config; `--log-level` overrides file and environment.
fn load_config(
    path: Option<&std::path::Path>,
    log_level: Option<String>,
) -> Result<AppConfig, CliError> {
    let mut config = ConfigFile::load(path)?;
    if let Some(level) = log_level {
        config.logging.level = level;
    }
    Ok(config)
}
