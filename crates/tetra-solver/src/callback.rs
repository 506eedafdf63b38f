//! Progress reporting between a running engine and its caller.

use std::sync::Arc;
use std::time::Duration;

/// Snapshot of a running solve, handed to status callbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct SolvingStatus {
    pub solver_name: String,
    /// Best incumbent objective, infinite before the first one.
    pub objective: f64,
    pub best_bound: f64,
    pub gap: f64,
    pub elapsed: Duration,
}

impl SolvingStatus {
    pub fn new(
        solver_name: impl Into<String>,
        objective: f64,
        best_bound: f64,
        elapsed: Duration,
    ) -> Self {
        Self {
            solver_name: solver_name.into(),
            objective,
            best_bound,
            gap: relative_gap(objective, best_bound),
            elapsed,
        }
    }
}

/// Returned by a status callback to stop the solve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelRequest {
    pub reason: String,
}

impl CancelRequest {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for CancelRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cancelled by callback: {}", self.reason)
    }
}

/// Caller hook invoked on each progress report. `Err` requests cancellation.
pub type StatusCallback = Arc<dyn Fn(&SolvingStatus) -> Result<(), CancelRequest> + Send + Sync>;

/// Relative distance between incumbent and bound, `|obj - bound| / |obj|`.
///
/// Infinite while either side is unknown; zero when both coincide.
pub fn relative_gap(objective: f64, best_bound: f64) -> f64 {
    if !objective.is_finite() || !best_bound.is_finite() {
        return f64::INFINITY;
    }
    let distance = (objective - best_bound).abs();
    if distance == 0.0 {
        return 0.0;
    }
    distance / objective.abs().max(1e-10)
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_gap() {
        assert_eq!(relative_gap(100.0, 90.0), 0.1);
        assert_eq!(relative_gap(5.0, 5.0), 0.0);
        assert_eq!(relative_gap(0.0, 0.0), 0.0);
        assert!(relative_gap(f64::INFINITY, 3.0).is_infinite());
        assert!(relative_gap(3.0, f64::NEG_INFINITY).is_infinite());
    }

    #[test]
    fn test_solving_status_computes_gap() {
        let status = SolvingStatus::new("mock", 200.0, 150.0, Duration::from_secs(1));
        assert_eq!(status.gap, 0.25);
        assert_eq!(status.solver_name, "mock");
    }

    #[test]
    fn test_callback_cancel() {
        let callback: StatusCallback = Arc::new(|status: &SolvingStatus| {
            if status.gap < 0.5 {
                Err(CancelRequest::new("good enough"))
            } else {
                Ok(())
            }
        });
        let loose = SolvingStatus::new("mock", 10.0, 1.0, Duration::ZERO);
        let tight = SolvingStatus::new("mock", 10.0, 9.0, Duration::ZERO);
        assert!(callback(&loose).is_ok());
        let cancel = callback(&tight).unwrap_err();
        assert_eq!(cancel.to_string(), "cancelled by callback: good enough");
    }
}
