//! Point-in-time copy of backend counters.

use std::fmt;

use serde::Serialize;

/// Immutable view of [`BackendMetrics`](super::BackendMetrics).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub unavailable: u64,
    pub loads: u64,
    pub load_failures: u64,
    pub write_failures: u64,
    /// Mean lookup latency in microseconds.
    pub avg_lookup_us: f64,
}

impl MetricsSnapshot {
    /// Fraction of answered lookups that were hits (0.0 when none).
    pub fn hit_rate(&self) -> f64 {
        let answered = self.hits + self.misses;
        if answered == 0 {
            0.0
        } else {
            self.hits as f64 / answered as f64
        }
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={} misses={} ({:.1}% hit) loads={} load_failures={} write_failures={} unavailable={} avg_lookup={:.1}us",
            self.hits,
            self.misses,
            self.hit_rate() * 100.0,
            self.loads,
            self.load_failures,
            self.write_failures,
            self.unavailable,
            self.avg_lookup_us
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let snap = MetricsSnapshot {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((snap.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(MetricsSnapshot::default().hit_rate(), 0.0);
    }

    #[test]
    fn test_display() {
        let snap = MetricsSnapshot {
            hits: 1,
            misses: 1,
            ..Default::default()
        };
        let rendered = snap.to_string();
        assert!(rendered.contains("hits=1"));
        assert!(rendered.contains("50.0% hit"));
    }
}
