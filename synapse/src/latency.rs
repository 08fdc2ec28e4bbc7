//! Per-request stage timing.
//!
//! A [`LatencyRecorder`] is created for each request and wraps the lookup,
//! load and store stages. Recording never fails and never changes control
//! flow: a stage that was started but never ended simply reports an unknown
//! duration.
//!
//! Finishing a recorder emits one `tracing` event on the `synapse::timing`
//! target, e.g.
//!
//! ```text
//! INFO synapse::timing: request timing backend=mem key=k1 outcome=miss stages=lookup=0.02ms load=300.41ms store=0.05ms
//! ```

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

/// A timed stage of the get-or-populate protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// `adapter.get`
    Lookup,
    /// Origin load on a miss.
    Load,
    /// Write-back `adapter.set` on a miss.
    Store,
}

impl Stage {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Lookup => "lookup",
            Stage::Load => "load",
            Stage::Store => "store",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a request ended, as seen by the recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Hit,
    Miss,
    Unavailable,
    LoadFailure,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Hit => "hit",
            Outcome::Miss => "miss",
            Outcome::Unavailable => "unavailable",
            Outcome::LoadFailure => "load_failure",
        })
    }
}

/// Timing of one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatencySample {
    pub stage: Stage,
    pub started_at: Instant,
    /// `None` if the stage never completed.
    pub ended_at: Option<Instant>,
}

impl LatencySample {
    /// Wall-clock duration, or `None` when unknown.
    pub fn duration(&self) -> Option<Duration> {
        self.ended_at?.checked_duration_since(self.started_at)
    }

    /// Duration in fractional milliseconds, or `None` when unknown.
    pub fn millis(&self) -> Option<f64> {
        self.duration().map(|d| d.as_secs_f64() * 1000.0)
    }
}

/// Collects stage samples for a single request.
#[derive(Debug)]
pub struct LatencyRecorder {
    backend: String,
    key: String,
    samples: Vec<LatencySample>,
}

impl LatencyRecorder {
    /// Start recording for a request against `backend` for `key`.
    pub fn new(backend: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            key: key.into(),
            samples: Vec::with_capacity(3),
        }
    }

    /// Mark the start of a stage. Returns a handle for [`end`](Self::end).
    pub fn begin(&mut self, stage: Stage) -> usize {
        self.samples.push(LatencySample {
            stage,
            started_at: Instant::now(),
            ended_at: None,
        });
        self.samples.len() - 1
    }

    /// Mark the end of a stage started with [`begin`](Self::begin).
    ///
    /// Unknown handles are ignored.
    pub fn end(&mut self, handle: usize) {
        if let Some(sample) = self.samples.get_mut(handle) {
            sample.ended_at = Some(Instant::now());
        }
    }

    /// Await `fut`, recording its duration as `stage`.
    pub async fn time<F>(&mut self, stage: Stage, fut: F) -> F::Output
    where
        F: Future,
    {
        let handle = self.begin(stage);
        let output = fut.await;
        self.end(handle);
        output
    }

    /// Samples recorded so far.
    pub fn samples(&self) -> &[LatencySample] {
        &self.samples
    }

    /// Close the request, emit the timing event, and return the report.
    pub fn finish(self, outcome: Outcome) -> LatencyReport {
        let report = LatencyReport {
            backend: self.backend,
            key: self.key,
            outcome,
            samples: self.samples,
        };
        report.emit();
        report
    }
}

/// Aggregated timing of one request. Never persisted.
#[derive(Debug, Clone)]
pub struct LatencyReport {
    pub backend: String,
    pub key: String,
    pub outcome: Outcome,
    pub samples: Vec<LatencySample>,
}

impl LatencyReport {
    /// First sample for `stage`.
    pub fn sample(&self, stage: Stage) -> Option<&LatencySample> {
        self.samples.iter().find(|s| s.stage == stage)
    }

    /// Whether `stage` was recorded.
    pub fn has(&self, stage: Stage) -> bool {
        self.sample(stage).is_some()
    }

    /// Duration of `stage`, or `None` if absent or unknown.
    pub fn duration(&self, stage: Stage) -> Option<Duration> {
        self.sample(stage).and_then(LatencySample::duration)
    }

    /// Sum of all known stage durations.
    pub fn total(&self) -> Duration {
        self.samples.iter().filter_map(LatencySample::duration).sum()
    }

    /// Serializable view with millisecond values.
    pub fn summary(&self) -> TimingSummary {
        TimingSummary {
            backend: self.backend.clone(),
            key: self.key.clone(),
            outcome: self.outcome,
            stages: self
                .samples
                .iter()
                .map(|s| StageTiming {
                    stage: s.stage,
                    millis: s.millis(),
                })
                .collect(),
            total_ms: self.total().as_secs_f64() * 1000.0,
        }
    }

    fn emit(&self) {
        info!(
            target: "synapse::timing",
            backend = %self.backend,
            key = %self.key,
            outcome = %self.outcome,
            stages = %self,
            "request timing"
        );
    }
}

impl fmt::Display for LatencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, sample) in self.samples.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match sample.millis() {
                Some(ms) => write!(f, "{}={:.2}ms", sample.stage, ms)?,
                None => write!(f, "{}=unknown", sample.stage)?,
            }
        }
        Ok(())
    }
}

/// JSON-friendly timing of one request.
#[derive(Debug, Clone, Serialize)]
pub struct TimingSummary {
    pub backend: String,
    pub key: String,
    pub outcome: Outcome,
    pub stages: Vec<StageTiming>,
    pub total_ms: f64,
}

/// JSON-friendly timing of one stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageTiming {
    pub stage: Stage,
    pub millis: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_time_records_sample() {
        let mut recorder = LatencyRecorder::new("mem", "k1");

        let value = recorder
            .time(Stage::Lookup, async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                7
            })
            .await;

        assert_eq!(value, 7);
        let report = recorder.finish(Outcome::Hit);
        assert!(report.has(Stage::Lookup));
        assert!(!report.has(Stage::Load));
        assert!(report.duration(Stage::Lookup).unwrap() >= Duration::from_millis(5));
    }

    #[test]
    fn test_unended_stage_is_unknown() {
        let mut recorder = LatencyRecorder::new("mem", "k1");
        recorder.begin(Stage::Load);

        let report = recorder.finish(Outcome::LoadFailure);
        assert!(report.has(Stage::Load));
        assert_eq!(report.duration(Stage::Load), None);
        assert_eq!(report.total(), Duration::ZERO);
        assert_eq!(report.to_string(), "load=unknown");
    }

    #[test]
    fn test_end_with_unknown_handle_is_ignored() {
        let mut recorder = LatencyRecorder::new("mem", "k1");
        recorder.end(42);
        assert!(recorder.samples().is_empty());
    }

    #[test]
    fn test_end_before_start_is_unknown() {
        let now = Instant::now();
        let sample = LatencySample {
            stage: Stage::Store,
            started_at: now + Duration::from_secs(1),
            ended_at: Some(now),
        };
        assert_eq!(sample.duration(), None);
    }

    #[test]
    fn test_report_display_orders_stages() {
        let mut recorder = LatencyRecorder::new("disk", "k1");
        for stage in [Stage::Lookup, Stage::Load, Stage::Store] {
            let handle = recorder.begin(stage);
            recorder.end(handle);
        }

        let rendered = recorder.finish(Outcome::Miss).to_string();
        let parts: Vec<&str> = rendered.split(' ').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[0].starts_with("lookup="));
        assert!(parts[1].starts_with("load="));
        assert!(parts[2].starts_with("store="));
        assert!(parts.iter().all(|p| p.ends_with("ms")));
    }

    #[test]
    fn test_summary_serializes() {
        let mut recorder = LatencyRecorder::new("mem", "k1");
        let handle = recorder.begin(Stage::Lookup);
        recorder.end(handle);

        let json = serde_json::to_value(recorder.finish(Outcome::Hit).summary()).unwrap();
        assert_eq!(json["backend"], "mem");
        assert_eq!(json["outcome"], "hit");
        assert_eq!(json["stages"][0]["stage"], "lookup");
        assert!(json["stages"][0]["millis"].is_number());
    }
}
