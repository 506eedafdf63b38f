//! Solver configuration types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Limits and tuning shared by every backend.
///
/// Durations serialize as fractional seconds so JSON configs stay readable:
/// `{"time_limit": 60, "optimality_gap": 0.01}`. Missing fields take their
/// defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Wall-clock limit for one solve.
    #[serde(with = "seconds")]
    pub time_limit: Duration,
    /// Relative optimality gap at which a MIP solve stops.
    pub optimality_gap: f64,
    /// Worker threads the engine may use.
    pub thread_count: usize,
    /// Abort when neither objective nor bound improved for this long.
    #[serde(with = "optional_seconds")]
    pub no_improvement_time_limit: Option<Duration>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(3600),
            optimality_gap: 1e-4,
            thread_count: num_cpus::get(),
            no_improvement_time_limit: None,
        }
    }
}

impl SolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = limit;
        self
    }

    pub fn with_optimality_gap(mut self, gap: f64) -> Self {
        self.optimality_gap = gap;
        self
    }

    /// Set the thread count; zero is raised to one.
    pub fn with_thread_count(mut self, count: usize) -> Self {
        self.thread_count = count.max(1);
        self
    }

    pub fn with_no_improvement_time_limit(mut self, limit: Duration) -> Self {
        self.no_improvement_time_limit = Some(limit);
        self
    }
}

mod seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

mod optional_seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&duration.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(deserializer)?
            .map(|secs| Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = SolverConfig::new();
        assert_eq!(config.time_limit, Duration::from_secs(3600));
        assert_eq!(config.optimality_gap, 1e-4);
        assert_eq!(config.thread_count, num_cpus::get());
        assert_eq!(config.no_improvement_time_limit, None);
    }

    #[test]
    fn test_config_builder_pattern() {
        let config = SolverConfig::new()
            .with_time_limit(Duration::from_secs(60))
            .with_optimality_gap(0.01)
            .with_thread_count(0)
            .with_no_improvement_time_limit(Duration::from_millis(1500));

        assert_eq!(config.time_limit, Duration::from_secs(60));
        assert_eq!(config.optimality_gap, 0.01);
        assert_eq!(config.thread_count, 1);
        assert_eq!(
            config.no_improvement_time_limit,
            Some(Duration::from_millis(1500))
        );
    }

    #[test]
    fn test_config_json_uses_seconds() {
        let config = SolverConfig::new()
            .with_time_limit(Duration::from_millis(2500))
            .with_thread_count(2);
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["time_limit"], 2.5);
        assert_eq!(json["thread_count"], 2);
        assert!(json["no_improvement_time_limit"].is_null());

        let back: SolverConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_config_partial_json_fills_defaults() {
        let config: SolverConfig =
            serde_json::from_str(r#"{"optimality_gap": 0.05, "no_improvement_time_limit": 3}"#)
                .unwrap();
        assert_eq!(config.optimality_gap, 0.05);
        assert_eq!(config.time_limit, Duration::from_secs(3600));
        assert_eq!(
            config.no_improvement_time_limit,
            Some(Duration::from_secs(3))
        );
    }

    #[test]
    fn test_config_rejects_negative_duration() {
        let result = serde_json::from_str::<SolverConfig>(r#"{"time_limit": -1}"#);
        assert!(result.is_err());
    }
}
