//! `synapse get`: resolve one key and show where it came from.

use clap::Args;
use serde_json::json;
use synapse::{Resolved, StoreOutcome, SynapseApp};

use super::DEFAULT_BACKEND;
use crate::error::CliError;

/// Bytes of the value shown in the preview.
const PREVIEW_BYTES: usize = 64;

#[derive(Debug, Args)]
pub struct GetArgs {
    /// Key to resolve
    pub key: String,

    /// Backend to resolve against
    #[arg(long, short, default_value = DEFAULT_BACKEND)]
    pub backend: String,

    /// Resolve the key this many times in sequence
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub repeat: u32,

    /// Print one JSON object per resolve
    #[arg(long)]
    pub json: bool,
}

/// Resolve `args.key` `args.repeat` times, printing each result.
pub async fn run(app: &SynapseApp, args: GetArgs) -> Result<(), CliError> {
    for _ in 0..args.repeat {
        let resolved = app.resolve(&args.backend, &args.key).await?;
        if args.json {
            println!("{}", render_json(&resolved)?);
        } else {
            println!("{}", render_text(&resolved));
        }
    }
    Ok(())
}

fn store_label(store: &StoreOutcome) -> String {
    match store {
        StoreOutcome::Skipped => "skipped".to_string(),
        StoreOutcome::Stored => "stored".to_string(),
        StoreOutcome::Failed(e) => format!("failed: {}", e),
    }
}

/// First [`PREVIEW_BYTES`] of the value, lossily decoded.
fn preview(value: &[u8]) -> String {
    let shown = &value[..value.len().min(PREVIEW_BYTES)];
    let mut text = String::from_utf8_lossy(shown).into_owned();
    if value.len() > PREVIEW_BYTES {
        text.push_str("...");
    }
    text
}

fn render_text(resolved: &Resolved) -> String {
    format!(
        "source={} bytes={} store={} {}\n  {:?}",
        resolved.source,
        resolved.value.len(),
        store_label(&resolved.store),
        resolved.latency,
        preview(&resolved.value)
    )
}

fn render_json(resolved: &Resolved) -> Result<String, CliError> {
    let body = json!({
        "key": resolved.latency.key,
        "backend": resolved.latency.backend,
        "source": resolved.source,
        "bytes": resolved.value.len(),
        "preview": preview(&resolved.value),
        "store": store_label(&resolved.store),
        "timing": resolved.latency.summary(),
    });
    Ok(serde_json::to_string(&body)?)
}
