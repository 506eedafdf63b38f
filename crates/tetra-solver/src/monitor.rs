//! Cooperative cancellation for long solves.

use crate::callback::{CancelRequest, SolvingStatus, StatusCallback};
use crate::config::SolverConfig;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

/// What an adapter should do after reporting progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Abort,
}

/// Why the monitor asked for an abort.
#[derive(Debug, Clone, PartialEq)]
pub enum AbortReason {
    /// Neither objective nor bound moved for longer than the window.
    Stalled { since: Duration, window: Duration },
    Cancelled(CancelRequest),
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::Stalled { since, window } => write!(
                f,
                "no improvement since {:.3}s (window {:.3}s)",
                since.as_secs_f64(),
                window.as_secs_f64()
            ),
            AbortReason::Cancelled(request) => write!(f, "{request}"),
        }
    }
}

/// Tracks the last-improved (objective, bound) snapshot of a running solve.
///
/// Adapters call [`ImprovementMonitor::observe`] from their progress hook and
/// stop the engine on [`Decision::Abort`]. Once aborted, the monitor stays
/// aborted.
pub struct ImprovementMonitor {
    window: Option<Duration>,
    tolerance: f64,
    callback: Option<StatusCallback>,
    snapshot: Option<(f64, f64)>,
    last_improvement: Duration,
    reports: usize,
    abort: Option<AbortReason>,
}

impl ImprovementMonitor {
    pub fn new(window: Option<Duration>) -> Self {
        Self {
            window,
            tolerance: 1e-9,
            callback: None,
            snapshot: None,
            last_improvement: Duration::ZERO,
            reports: 0,
            abort: None,
        }
    }

    pub fn from_config(config: &SolverConfig) -> Self {
        Self::new(config.no_improvement_time_limit)
    }

    pub fn with_callback(mut self, callback: StatusCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Relative change below which a move does not count as improvement.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance.max(0.0);
        self
    }

    pub fn reports(&self) -> usize {
        self.reports
    }

    pub fn abort_reason(&self) -> Option<&AbortReason> {
        self.abort.as_ref()
    }

    pub fn observe(&mut self, status: &SolvingStatus) -> Decision {
        self.reports += 1;
        if self.abort.is_some() {
            return Decision::Abort;
        }

        if let Some(callback) = &self.callback {
            if let Err(request) = callback(status) {
                warn!(
                    component = "monitor",
                    operation = "observe",
                    status = "warn",
                    solver = status.solver_name.as_str(),
                    reason = request.reason.as_str(),
                    "Status callback requested cancellation"
                );
                self.abort = Some(AbortReason::Cancelled(request));
                return Decision::Abort;
            }
        }

        let improved = match self.snapshot {
            None => true,
            Some((objective, bound)) => {
                moved(objective, status.objective, self.tolerance)
                    || moved(bound, status.best_bound, self.tolerance)
            }
        };
        if improved {
            self.snapshot = Some((status.objective, status.best_bound));
            self.last_improvement = status.elapsed;
            return Decision::Continue;
        }

        let Some(window) = self.window else {
            return Decision::Continue;
        };
        let stale = status.elapsed.saturating_sub(self.last_improvement);
        if stale <= window {
            return Decision::Continue;
        }
        debug!(
            component = "monitor",
            operation = "observe",
            status = "complete",
            solver = status.solver_name.as_str(),
            stale_ms = stale.as_secs_f64() * 1000.0,
            window_ms = window.as_secs_f64() * 1000.0,
            "Aborting stalled solve"
        );
        self.abort = Some(AbortReason::Stalled {
            since: self.last_improvement,
            window,
        });
        Decision::Abort
    }
}

impl fmt::Debug for ImprovementMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImprovementMonitor")
            .field("window", &self.window)
            .field("has_callback", &self.callback.is_some())
            .field("reports", &self.reports)
            .field("abort", &self.abort)
            .finish_non_exhaustive()
    }
}

fn moved(previous: f64, next: f64, tolerance: f64) -> bool {
    if previous.is_finite() != next.is_finite() {
        return true;
    }
    if !previous.is_finite() {
        return false;
    }
    (next - previous).abs() > tolerance * previous.abs().max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn report(objective: f64, bound: f64, secs: u64) -> SolvingStatus {
        SolvingStatus::new("mock", objective, bound, Duration::from_secs(secs))
    }

    #[test]
    fn test_monitor_without_window_never_stalls() {
        let mut monitor = ImprovementMonitor::new(None);
        for secs in 0..100 {
            assert_eq!(monitor.observe(&report(10.0, 5.0, secs)), Decision::Continue);
        }
        assert!(monitor.abort_reason().is_none());
        assert_eq!(monitor.reports(), 100);
    }

    #[test]
    fn test_monitor_aborts_after_window() {
        let mut monitor = ImprovementMonitor::new(Some(Duration::from_secs(5)));
        assert_eq!(monitor.observe(&report(10.0, 5.0, 0)), Decision::Continue);
        assert_eq!(monitor.observe(&report(10.0, 5.0, 3)), Decision::Continue);
        assert_eq!(monitor.observe(&report(10.0, 5.0, 5)), Decision::Continue);
        assert_eq!(monitor.observe(&report(10.0, 5.0, 6)), Decision::Abort);
        assert_eq!(
            monitor.abort_reason(),
            Some(&AbortReason::Stalled {
                since: Duration::ZERO,
                window: Duration::from_secs(5)
            })
        );
        // Sticky even if progress resumes.
        assert_eq!(monitor.observe(&report(1.0, 1.0, 7)), Decision::Abort);
    }

    #[test]
    fn test_monitor_improvement_resets_window() {
        let mut monitor = ImprovementMonitor::new(Some(Duration::from_secs(5)));
        monitor.observe(&report(10.0, 5.0, 0));
        assert_eq!(monitor.observe(&report(10.0, 6.0, 4)), Decision::Continue);
        assert_eq!(monitor.observe(&report(10.0, 6.0, 8)), Decision::Continue);
        assert_eq!(monitor.observe(&report(10.0, 6.0, 10)), Decision::Abort);
    }

    #[test]
    fn test_monitor_first_incumbent_counts_as_improvement() {
        let mut monitor = ImprovementMonitor::new(Some(Duration::from_secs(1)));
        monitor.observe(&report(f64::INFINITY, 0.0, 0));
        assert_eq!(monitor.observe(&report(7.0, 0.0, 3)), Decision::Continue);
        assert_eq!(monitor.observe(&report(7.0, 0.0, 5)), Decision::Abort);
    }

    #[test]
    fn test_monitor_ignores_moves_below_tolerance() {
        let mut monitor =
            ImprovementMonitor::new(Some(Duration::from_secs(1))).with_tolerance(1e-3);
        monitor.observe(&report(1000.0, 0.0, 0));
        assert_eq!(monitor.observe(&report(999.5, 0.0, 2)), Decision::Abort);
    }

    #[test]
    fn test_monitor_callback_cancels() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let callback: StatusCallback = Arc::new(move |status: &SolvingStatus| {
            seen.fetch_add(1, Ordering::SeqCst);
            if status.elapsed >= Duration::from_secs(2) {
                Err(CancelRequest::new("deadline"))
            } else {
                Ok(())
            }
        });
        let mut monitor = ImprovementMonitor::new(None).with_callback(callback);
        assert_eq!(monitor.observe(&report(10.0, 5.0, 1)), Decision::Continue);
        assert_eq!(monitor.observe(&report(9.0, 5.0, 2)), Decision::Abort);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        match monitor.abort_reason() {
            Some(AbortReason::Cancelled(request)) => assert_eq!(request.reason, "deadline"),
            other => panic!("unexpected abort reason: {other:?}"),
        }
        // Aborted monitors stop consulting the callback.
        monitor.observe(&report(8.0, 5.0, 3));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_monitor_from_config() {
        let config = SolverConfig::new().with_no_improvement_time_limit(Duration::from_secs(2));
        let mut monitor = ImprovementMonitor::from_config(&config);
        monitor.observe(&report(3.0, 1.0, 0));
        assert_eq!(monitor.observe(&report(3.0, 1.0, 3)), Decision::Abort);
    }
}
