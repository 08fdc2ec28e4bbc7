//! Synthetic slow origin.

use std::time::Duration;

use bytes::Bytes;

use super::{LoadError, OriginLoader};
use crate::cache::BoxFuture;

/// Default simulated origin latency.
pub const DEFAULT_SYNTHETIC_DELAY: Duration = Duration::from_millis(300);

/// Produces `"Data for {key}"` after sleeping for `delay`.
///
/// The sleep is a timer, not a blocked thread, so this loader is safe to
/// await directly on the runtime.
#[derive(Debug, Clone)]
pub struct SyntheticLoader {
    delay: Duration,
}

impl SyntheticLoader {
    /// Create a loader with the given simulated latency.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Returns the simulated latency.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for SyntheticLoader {
    fn default() -> Self {
        Self::new(DEFAULT_SYNTHETIC_DELAY)
    }
}

impl OriginLoader for SyntheticLoader {
    fn load(&self, key: &str) -> BoxFuture<'_, Result<Bytes, LoadError>> {
        let value = Bytes::from(format!("Data for {}", key));
        Box::pin(async move {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(value)
        })
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}
