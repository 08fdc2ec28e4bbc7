//! `synapse bench`: concurrent resolves against one backend.
//!
//! Runs two phases over the same key set:
//!
//! - **cold**: every key is requested `concurrency` times back to back, so
//!   the duplicates are in flight together. With no single-flight in the
//!   core, each of them misses and loads from origin (a visible stampede).
//! - **warm**: every key once; all should be cache hits.

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Args;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use synapse::latency::Stage;
use synapse::{CacheAside, ResolveError, Resolved, Source, SynapseApp};

use super::DEFAULT_BACKEND;
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct BenchArgs {
    /// Backend to benchmark
    #[arg(long, short, default_value = DEFAULT_BACKEND)]
    pub backend: String,

    /// Number of distinct keys
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(1..))]
    pub keys: u32,

    /// Requests in flight at once
    #[arg(long, short, default_value_t = 8, value_parser = clap::value_parser!(u32).range(1..))]
    pub concurrency: u32,

    /// Key prefix, so repeated runs can start cold
    #[arg(long, default_value = "bench")]
    pub prefix: String,
}

/// Counters and latencies of one phase.
#[derive(Debug, Default)]
struct PhaseStats {
    requests: usize,
    from_cache: usize,
    from_origin: usize,
    unavailable: usize,
    load_failures: usize,
    write_failures: usize,
    lookups: Vec<Duration>,
    totals: Vec<Duration>,
    elapsed: Duration,
}

impl PhaseStats {
    fn record(&mut self, result: Result<Resolved, ResolveError>) {
        self.requests += 1;
        match result {
            Ok(resolved) => {
                match resolved.source {
                    Source::Cache => self.from_cache += 1,
                    Source::Origin => self.from_origin += 1,
                }
                if resolved.store.is_failed() {
                    self.write_failures += 1;
                }
                if let Some(lookup) = resolved.latency.duration(Stage::Lookup) {
                    self.lookups.push(lookup);
                }
                self.totals.push(resolved.latency.total());
            }
            Err(ResolveError::Unavailable { .. }) => self.unavailable += 1,
            Err(ResolveError::LoadFailure { .. }) => self.load_failures += 1,
        }
    }

    fn print(&mut self, name: &str) {
        self.lookups.sort();
        self.totals.sort();
        let secs = self.elapsed.as_secs_f64();
        let rate = if secs > 0.0 {
            self.requests as f64 / secs
        } else {
            0.0
        };

        println!(
            "{}: {} requests in {:.2}s ({:.1} req/s)",
            name, self.requests, secs, rate
        );
        println!(
            "  cache={} origin={} unavailable={} load_failures={} write_failures={}",
            self.from_cache,
            self.from_origin,
            self.unavailable,
            self.load_failures,
            self.write_failures
        );
        println!(
            "  lookup p50={} p99={}  total p50={} p99={}",
            fmt_ms(percentile(&self.lookups, 50.0)),
            fmt_ms(percentile(&self.lookups, 99.0)),
            fmt_ms(percentile(&self.totals, 50.0)),
            fmt_ms(percentile(&self.totals, 99.0)),
        );
    }
}

/// Nearest-rank percentile of an ascending slice.
fn percentile(sorted: &[Duration], pct: f64) -> Option<Duration> {
    if sorted.is_empty() {
        return None;
    }
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    let index = rank.clamp(1, sorted.len()) - 1;
    Some(sorted[index])
}

fn fmt_ms(duration: Option<Duration>) -> String {
    match duration {
        Some(d) => format!("{:.2}ms", d.as_secs_f64() * 1000.0),
        None => "n/a".to_string(),
    }
}

fn progress_bar(len: usize, label: &str) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    let style = ProgressStyle::with_template("{msg:>5} [{bar:40}] {pos}/{len} {per_sec}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    bar.set_style(style);
    bar.set_message(label.to_string());
    bar
}

async fn run_phase(
    cache_aside: &Arc<CacheAside>,
    backend: &str,
    keys: Vec<String>,
    concurrency: usize,
    progress: &ProgressBar,
) -> PhaseStats {
    let started = Instant::now();
    let mut results = stream::iter(keys.into_iter().map(|key| {
        let cache_aside = Arc::clone(cache_aside);
        let backend = backend.to_string();
        async move { cache_aside.resolve(&backend, &key).await }
    }))
    .buffer_unordered(concurrency);

    let mut stats = PhaseStats::default();
    while let Some(result) = results.next().await {
        stats.record(result);
        progress.inc(1);
    }
    stats.elapsed = started.elapsed();
    stats
}

fn cold_keys(prefix: &str, keys: u32, concurrency: u32) -> Vec<String> {
    (0..keys)
        .flat_map(|i| std::iter::repeat(format!("{}:{}", prefix, i)).take(concurrency as usize))
        .collect()
}

fn warm_keys(prefix: &str, keys: u32) -> Vec<String> {
    (0..keys).map(|i| format!("{}:{}", prefix, i)).collect()
}

/// Run both phases and print per-phase and per-backend statistics.
pub async fn run(app: &SynapseApp, args: BenchArgs) -> Result<(), CliError> {
    if app.registry().lookup(&args.backend).is_none() {
        return Err(CliError::Unavailable {
            backend: args.backend,
        });
    }

    let cache_aside = app.cache_aside();
    let concurrency = args.concurrency as usize;

    println!(
        "Benchmarking '{}' with {} keys, concurrency {} (origin: {})",
        args.backend,
        args.keys,
        args.concurrency,
        cache_aside.loader().name()
    );

    let cold = cold_keys(&args.prefix, args.keys, args.concurrency);
    let progress = progress_bar(cold.len(), "cold");
    let mut cold_stats = run_phase(&cache_aside, &args.backend, cold, concurrency, &progress).await;
    progress.finish_and_clear();

    let warm = warm_keys(&args.prefix, args.keys);
    let progress = progress_bar(warm.len(), "warm");
    let mut warm_stats = run_phase(&cache_aside, &args.backend, warm, concurrency, &progress).await;
    progress.finish_and_clear();

    cold_stats.print("cold");
    if cold_stats.from_origin > args.keys as usize {
        println!(
            "  {} redundant origin loads from concurrent misses",
            cold_stats.from_origin - args.keys as usize
        );
    }
    warm_stats.print("warm");

    println!();
    if let Some(metrics) = cache_aside.metrics().backend(&args.backend) {
        println!("{}: {}", args.backend, metrics.snapshot());
    }
    println!(
        "blocking pool: peak {} of {} threads",
        app.pool().peak_in_flight(),
        app.pool().permits()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use synapse::config::AppConfig;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_percentile() {
        let sorted: Vec<Duration> = (1..=100).map(ms).collect();
        assert_eq!(percentile(&sorted, 50.0), Some(ms(50)));
        assert_eq!(percentile(&sorted, 99.0), Some(ms(99)));
        assert_eq!(percentile(&sorted, 100.0), Some(ms(100)));
        assert_eq!(percentile(&sorted, 0.0), Some(ms(1)));
        assert_eq!(percentile(&[], 50.0), None);
        assert_eq!(percentile(&[ms(7)], 99.0), Some(ms(7)));
    }

    #[test]
    fn test_key_sets() {
        assert_eq!(
            cold_keys("b", 2, 3),
            vec!["b:0", "b:0", "b:0", "b:1", "b:1", "b:1"]
        );
        assert_eq!(warm_keys("b", 2), vec!["b:0", "b:1"]);
    }

    #[test]
    fn test_fmt_ms() {
        assert_eq!(fmt_ms(Some(Duration::from_micros(1500))), "1.50ms");
        assert_eq!(fmt_ms(None), "n/a");
    }

    #[tokio::test]
    async fn test_phases_against_memory() {
        let config = AppConfig::default().with_origin_delay(Duration::from_millis(5));
        let app = SynapseApp::start(config).unwrap();
        let cache_aside = app.cache_aside();
        let progress = ProgressBar::hidden();

        let cold = run_phase(&cache_aside, "mem", cold_keys("t", 10, 4), 4, &progress).await;
        assert_eq!(cold.requests, 40);
        assert_eq!(cold.from_cache + cold.from_origin, 40);
        assert!(cold.from_origin >= 10);

        let warm = run_phase(&cache_aside, "mem", warm_keys("t", 10), 4, &progress).await;
        assert_eq!(warm.from_cache, 10);
        assert_eq!(warm.from_origin, 0);
        assert_eq!(warm.lookups.len(), 10);
    }

    #[tokio::test]
    async fn test_unknown_backend_is_rejected() {
        let app = SynapseApp::start(AppConfig::default()).unwrap();
        let args = BenchArgs {
            backend: "redis".to_string(),
            keys: 1,
            concurrency: 1,
            prefix: "x".to_string(),
        };

        let err = run(&app, args).await.unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
