//! `synapse backends`: list what the registry contains.

use synapse::config::format_size;
use synapse::SynapseApp;

use crate::error::CliError;

/// Print registered backends, startup failures and resolver settings.
pub fn run(app: &SynapseApp) -> Result<(), CliError> {
    let registry = app.registry();

    if registry.is_empty() {
        println!("No backends registered");
    } else {
        println!("Registered backends:");
        for descriptor in registry.descriptors() {
            println!("  {:<8} {}", descriptor.name, descriptor.capabilities);
        }
    }

    if !registry.failures().is_empty() {
        println!();
        println!("Unavailable:");
        for failure in registry.failures() {
            println!("  {:<8} {}", failure.name, failure.reason);
        }
    }

    let config = app.config();
    println!();
    println!("Origin:         {}", app.cache_aside().loader().name());
    match config.resolve.ttl {
        Some(ttl) => println!("Write-back TTL: {}s", ttl.as_secs()),
        None => println!("Write-back TTL: backend default"),
    }
    if config.memory.enabled {
        println!("Memory limit:   {}", format_size(config.memory.max_size_bytes));
    }
    println!(
        "Blocking pool:  {} threads{}",
        app.pool().permits(),
        app.pool()
            .timeout()
            .map(|t| format!(", {}ms timeout", t.as_millis()))
            .unwrap_or_default()
    );

    Ok(())
}
