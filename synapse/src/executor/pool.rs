//! Bounded worker pool for blocking work.
//!
//! Blocking store clients and file reads must never run on the async
//! scheduler's threads: one slow call would stall every request interleaved
//! on that thread. The pool moves each call onto tokio's blocking threads via
//! `spawn_blocking` and caps how many run at once with a semaphore, so a burst
//! of misses cannot exhaust the blocking thread budget.
//!
//! # Cancellation
//!
//! The semaphore permit and the in-flight counter travel *into* the blocking
//! closure. If the awaiting request is dropped, the call still runs to
//! completion and keeps its permit until it does.
//!
//! ```ignore
//! use std::sync::Arc;
//! use synapse::executor::WorkerPool;
//!
//! let pool = Arc::new(WorkerPool::with_defaults("blocking_io"));
//! let bytes = pool.run(move || std::fs::read(&path)).await??;
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::cache::AdapterError;

/// Upper bound on the default pool size.
pub const MAX_DEFAULT_WORKERS: usize = 64;

/// Default workers per available CPU.
pub const WORKERS_PER_CPU: usize = 4;

/// Errors produced when dispatching onto the pool.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The pool was closed and accepts no more work.
    #[error("worker pool '{0}' is closed")]
    Closed(String),

    /// The call did not finish before the pool's deadline.
    #[error("blocking call timed out after {0:?}")]
    Timeout(Duration),

    /// The blocking closure panicked.
    #[error("blocking call panicked: {0}")]
    Panicked(String),

    /// The runtime cancelled the blocking task (shutdown).
    #[error("blocking call cancelled")]
    Cancelled,
}

impl From<PoolError> for AdapterError {
    fn from(e: PoolError) -> Self {
        match e {
            PoolError::Timeout(d) => AdapterError::Timeout(d),
            other => AdapterError::WorkerPool(other.to_string()),
        }
    }
}

/// Decrements the in-flight counter when the blocking call ends.
struct InFlightGuard {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Semaphore-bounded dispatcher onto tokio's blocking threads.
#[derive(Debug)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    permits: usize,
    /// Optional deadline applied to every call.
    timeout: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: AtomicUsize,
    /// Label for debugging
    label: String,
}

impl WorkerPool {
    /// Creates a pool allowing `permits` concurrent blocking calls.
    ///
    /// A permit count of zero is raised to one.
    pub fn new(permits: usize, label: impl Into<String>) -> Self {
        let permits = permits.max(1);
        let label = label.into();

        info!(permits, label = %label, "Created blocking worker pool");

        Self {
            semaphore: Arc::new(Semaphore::new(permits)),
            permits,
            timeout: None,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: AtomicUsize::new(0),
            label,
        }
    }

    /// Creates a pool sized `min(num_cpus * 4, 64)`.
    pub fn with_defaults(label: impl Into<String>) -> Self {
        Self::new(default_worker_count(), label)
    }

    /// Applies a deadline to every dispatched call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Runs `f` on a blocking thread once a permit is available.
    ///
    /// The caller is suspended (not blocked) while waiting for the permit and
    /// while the call runs.
    ///
    /// # Errors
    ///
    /// - [`PoolError::Closed`] after [`close`](Self::close)
    /// - [`PoolError::Timeout`] when the deadline elapses first; the call
    ///   itself keeps running in the background
    /// - [`PoolError::Panicked`] / [`PoolError::Cancelled`] from the task
    pub async fn run<F, T>(&self, f: F) -> Result<T, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed(self.label.clone()))?;

        let current = self.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::Relaxed);
        let guard = InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
        };

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let _guard = guard;
            f()
        });

        let joined = match self.timeout {
            Some(deadline) => match tokio::time::timeout(deadline, handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    debug!(label = %self.label, ?deadline, "Blocking call exceeded deadline");
                    return Err(PoolError::Timeout(deadline));
                }
            },
            None => handle.await,
        };

        joined.map_err(|e| {
            if e.is_panic() {
                PoolError::Panicked(e.to_string())
            } else {
                PoolError::Cancelled
            }
        })
    }

    /// Stops accepting new work. Calls already dispatched complete normally.
    pub fn close(&self) {
        self.semaphore.close();
    }

    /// Returns the configured number of permits.
    pub fn permits(&self) -> usize {
        self.permits
    }

    /// Returns the number of calls currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Returns the highest number of concurrent calls observed.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::Relaxed)
    }

    /// Returns the configured deadline, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns the label.
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Default pool size: `min(num_cpus * 4, 64)`.
pub fn default_worker_count() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4);
    (cpus * WORKERS_PER_CPU).min(MAX_DEFAULT_WORKERS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_returns_value() {
        let pool = WorkerPool::new(2, "test");
        let result = pool.run(|| 40 + 2).await;
        assert_eq!(result, Ok(42));
        assert_eq!(pool.in_flight(), 0);
    }

    #[test]
    fn test_zero_permits_raised_to_one() {
        let pool = WorkerPool::new(0, "test");
        assert_eq!(pool.permits(), 1);
    }

    #[test]
    fn test_default_worker_count_bounds() {
        let count = default_worker_count();
        assert!(count >= 1);
        assert!(count <= MAX_DEFAULT_WORKERS);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrency_is_bounded() {
        let pool = Arc::new(WorkerPool::new(2, "bounded"));
        let mut handles = Vec::new();

        for _ in 0..8 {
            let pool = Arc::clone(&pool);
            handles.push(tokio::spawn(async move {
                pool.run(|| std::thread::sleep(Duration::from_millis(20)))
                    .await
            }));
        }

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert!(pool.peak_in_flight() >= 1);
        assert!(
            pool.peak_in_flight() <= 2,
            "peak {} exceeded permits",
            pool.peak_in_flight()
        );
    }

    #[tokio::test]
    async fn test_timeout() {
        let pool = WorkerPool::new(1, "slow").with_timeout(Duration::from_millis(10));
        let result = pool
            .run(|| std::thread::sleep(Duration::from_millis(200)))
            .await;
        assert_eq!(result, Err(PoolError::Timeout(Duration::from_millis(10))));
    }

    #[tokio::test]
    async fn test_panic_is_reported() {
        let pool = WorkerPool::new(1, "panicky");
        let result: Result<(), _> = pool.run(|| panic!("boom")).await;
        assert!(matches!(result, Err(PoolError::Panicked(_))));
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_closed_pool_rejects_work() {
        let pool = WorkerPool::new(1, "closing");
        pool.close();
        let result = pool.run(|| 1).await;
        assert_eq!(result, Err(PoolError::Closed("closing".to_string())));
    }

    #[test]
    fn test_pool_error_into_adapter_error() {
        let err: AdapterError = PoolError::Timeout(Duration::from_secs(1)).into();
        assert!(matches!(err, AdapterError::Timeout(_)));

        let err: AdapterError = PoolError::Cancelled.into();
        assert!(matches!(err, AdapterError::WorkerPool(_)));
    }
}
