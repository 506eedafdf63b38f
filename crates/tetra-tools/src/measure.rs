//! Wall-clock and RSS measurement of named pipeline stages.

use crate::memory::{capture_rss_bytes, rss_delta};
use std::time::{Duration, Instant};
use tracing::debug;

/// Duration and memory growth of one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageMeasurement {
    pub stage: String,
    pub duration: Duration,
    pub rss_before_bytes: Option<u64>,
    pub rss_after_bytes: Option<u64>,
    pub rss_delta_bytes: Option<i64>,
}

impl StageMeasurement {
    pub fn duration_ms(&self) -> f64 {
        self.duration.as_secs_f64() * 1000.0
    }
}

/// Handle for an open stage, returned by [`MeasurementRecorder::begin_stage`].
#[derive(Debug)]
#[must_use = "pass the token to end_stage to record the stage"]
pub struct StageToken {
    stage: String,
    started: Instant,
    rss_before_bytes: Option<u64>,
}

impl StageToken {
    pub fn stage(&self) -> &str {
        &self.stage
    }
}

/// Collects [`StageMeasurement`]s in the order stages end.
#[derive(Debug, Default)]
pub struct MeasurementRecorder {
    stages: Vec<StageMeasurement>,
}

impl MeasurementRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_stage(&self, stage: &str) -> StageToken {
        StageToken {
            stage: stage.to_string(),
            rss_before_bytes: capture_rss_bytes(stage),
            started: Instant::now(),
        }
    }

    pub fn end_stage(&mut self, token: StageToken) -> &StageMeasurement {
        let duration = token.started.elapsed();
        let rss_after_bytes = capture_rss_bytes(&token.stage);
        let measurement = StageMeasurement {
            rss_delta_bytes: rss_delta(token.rss_before_bytes, rss_after_bytes),
            stage: token.stage,
            duration,
            rss_before_bytes: token.rss_before_bytes,
            rss_after_bytes,
        };
        debug!(
            component = "measure",
            operation = "end_stage",
            status = "complete",
            stage = measurement.stage.as_str(),
            rss_delta_bytes = ?measurement.rss_delta_bytes,
            duration_ms = measurement.duration_ms(),
            "Stage measured"
        );
        self.stages.push(measurement);
        &self.stages[self.stages.len() - 1]
    }

    /// Run `work` as one stage and return its output.
    pub fn measure<T>(&mut self, stage: &str, work: impl FnOnce() -> T) -> T {
        let token = self.begin_stage(stage);
        let output = work();
        self.end_stage(token);
        output
    }

    /// Record a measurement taken elsewhere, e.g. a total spanning all stages.
    pub fn push(&mut self, measurement: StageMeasurement) {
        self.stages.push(measurement);
    }

    pub fn stages(&self) -> &[StageMeasurement] {
        &self.stages
    }

    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|stage| stage.duration).sum()
    }

    pub fn into_stages(self) -> Vec<StageMeasurement> {
        self.stages
    }
}
