//! Thin wrapper over the `highs` crate plus raw info queries.
//!
//! This module contains unsafe code for interacting with the C library.
#![allow(unsafe_code)]

use highs::{Col, RowProblem, Sense as HighsSense, SolvedModel};
use std::ffi::{CStr, CString, c_char, c_int, c_void};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::{Duration, Instant};
use tetra_core::Sense;
use tracing::{debug, trace, warn};

/// Native model status, before mapping onto the four protocol statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighsStatus {
    Optimal,
    Infeasible,
    Unbounded,
    UnboundedOrInfeasible,
    ReachedTimeLimit,
    ReachedIterationLimit,
    ReachedSolutionLimit,
    /// A progress hook asked HiGHS to stop.
    Interrupted,
    Unknown,
}

// Native model status codes (`HighsModelStatus` in the C API).
const MODEL_STATUS_OPTIMAL: highs_sys::HighsInt = 7;
const MODEL_STATUS_INFEASIBLE: highs_sys::HighsInt = 8;
const MODEL_STATUS_UNBOUNDED_OR_INFEASIBLE: highs_sys::HighsInt = 9;
const MODEL_STATUS_UNBOUNDED: highs_sys::HighsInt = 10;
const MODEL_STATUS_TIME_LIMIT: highs_sys::HighsInt = 13;
const MODEL_STATUS_ITERATION_LIMIT: highs_sys::HighsInt = 14;
const MODEL_STATUS_SOLUTION_LIMIT: highs_sys::HighsInt = 16;
const MODEL_STATUS_INTERRUPT: highs_sys::HighsInt = 17;

// Callback kinds (`kHighsCallback*` in the C API).
const CALLBACK_SIMPLEX_INTERRUPT: highs_sys::HighsInt = 1;
const CALLBACK_IPM_INTERRUPT: highs_sys::HighsInt = 2;
const CALLBACK_MIP_IMPROVING_SOLUTION: highs_sys::HighsInt = 4;
const CALLBACK_MIP_INTERRUPT: highs_sys::HighsInt = 6;

/// Progress HiGHS reports from inside a running solve.
///
/// Values are in the native objective, without any constant offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighsProgress {
    /// Incumbent objective; infinite while a MIP has none.
    pub objective: f64,
    /// Best proven bound; equals `objective` for pure LPs.
    pub best_bound: f64,
    pub elapsed: Duration,
}

/// Hook called on every progress report; returning `false` interrupts HiGHS.
type ProgressHook<'a> = &'a mut dyn FnMut(&HighsProgress) -> bool;

/// Errors returned by the session wrapper.
#[derive(Debug, Clone, PartialEq)]
pub enum HighsSessionError {
    ColumnIndexOutOfBounds {
        column_index: usize,
        num_columns: usize,
    },
    PrimalStartLengthMismatch {
        expected: usize,
        got: usize,
    },
    SolveRequired {
        operation: &'static str,
    },
    /// HiGHS reported an error status for a native call.
    Engine {
        operation: &'static str,
        detail: String,
    },
}

impl fmt::Display for HighsSessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HighsSessionError::ColumnIndexOutOfBounds {
                column_index,
                num_columns,
            } => write!(
                f,
                "column index {} out of bounds (num_columns = {})",
                column_index, num_columns
            ),
            HighsSessionError::PrimalStartLengthMismatch { expected, got } => write!(
                f,
                "primal start length must match number of columns (expected {}, got {})",
                expected, got
            ),
            HighsSessionError::SolveRequired { operation } => {
                write!(f, "solve must be called before {}", operation)
            }
            HighsSessionError::Engine { operation, detail } => {
                write!(f, "HiGHS {} failed: {}", operation, detail)
            }
        }
    }
}

impl std::error::Error for HighsSessionError {}

/// Option value types for HiGHS solver configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum HighsOption {
    Bool(bool),
    Int(i32),
    Float(f64),
    Str(String),
}

/// One HiGHS problem: built column by column, solved once.
pub struct HighsSession {
    problem: RowProblem,
    columns: Vec<Col>,
    sense: Sense,
    solved: Option<SolvedModel>,
    log_to_console: bool,
    primal_start: Option<Vec<f64>>,
    options: Vec<(String, HighsOption)>,
    wall_time: Duration,
    integer_columns: usize,
    progress_reports: usize,
}

impl HighsSession {
    pub fn new() -> Self {
        debug!(
            component = "highs",
            operation = "init_session",
            status = "success",
            "Creating HiGHS session"
        );
        HighsSession {
            problem: RowProblem::default(),
            columns: Vec::new(),
            sense: Sense::Minimize,
            solved: None,
            log_to_console: false,
            primal_start: None,
            options: Vec::new(),
            wall_time: Duration::ZERO,
            integer_columns: 0,
            progress_reports: 0,
        }
    }

    // ── Building ──

    /// Add a column with its objective coefficient; returns its position.
    pub fn add_column(&mut self, cost: f64, lower: f64, upper: f64, integer: bool) -> usize {
        trace!(
            lower,
            upper,
            cost,
            integer,
            component = "highs",
            operation = "add_column",
            status = "success",
            "Adding column"
        );
        self.solved = None;
        self.primal_start = None;
        let col = if integer {
            self.integer_columns += 1;
            self.problem.add_integer_column(cost, lower..=upper)
        } else {
            self.problem.add_column(cost, lower..=upper)
        };
        self.columns.push(col);
        self.columns.len() - 1
    }

    /// Add `lower <= sum(factors) <= upper`; returns the row position.
    pub fn add_row(
        &mut self,
        lower: f64,
        upper: f64,
        factors: &[(usize, f64)],
    ) -> Result<usize, HighsSessionError> {
        self.solved = None;
        let num_columns = self.columns.len();
        let mut native = Vec::with_capacity(factors.len());
        for &(column_index, coefficient) in factors {
            let col = *self.columns.get(column_index).ok_or_else(|| {
                warn!(
                    component = "highs",
                    operation = "add_row",
                    status = "error",
                    column_index,
                    num_columns,
                    "Column index out of bounds for row"
                );
                HighsSessionError::ColumnIndexOutOfBounds {
                    column_index,
                    num_columns,
                }
            })?;
            native.push((col, coefficient));
        }
        trace!(
            lower,
            upper,
            nonzeros = native.len(),
            component = "highs",
            operation = "add_row",
            status = "success",
            "Adding row"
        );
        self.problem.add_row(lower..=upper, native);
        Ok(self.problem.num_rows().saturating_sub(1))
    }

    pub fn set_sense(&mut self, sense: Sense) {
        self.sense = sense;
    }

    pub fn set_log_to_console(&mut self, enabled: bool) {
        self.log_to_console = enabled;
    }

    /// Queue a HiGHS option for the next solve.
    pub fn set_option(&mut self, option: impl Into<String>, value: HighsOption) {
        self.options.push((option.into(), value));
    }

    /// Set primal start values for warm-start hints.
    pub fn set_primal_start(&mut self, values: Vec<f64>) -> Result<(), HighsSessionError> {
        if values.len() != self.columns.len() {
            return Err(HighsSessionError::PrimalStartLengthMismatch {
                expected: self.columns.len(),
                got: values.len(),
            });
        }
        self.primal_start = Some(values);
        Ok(())
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.problem.num_rows()
    }

    // ── Solving ──

    /// Hand the built problem to HiGHS and block until it returns.
    ///
    /// The problem is consumed; a second solve needs a rebuilt session.
    pub fn solve(&mut self) -> Result<HighsStatus, HighsSessionError> {
        self.solve_with_progress(&mut |_: &HighsProgress| true)
    }

    /// [`HighsSession::solve`] with `on_progress` called from HiGHS' interrupt
    /// callbacks (MIP node loop and improving solutions for MIPs, simplex and
    /// IPM iterations for LPs).
    ///
    /// When `on_progress` returns `false` the user-interrupt flag is raised and
    /// HiGHS stops at its next check, ending in [`HighsStatus::Interrupted`].
    pub fn solve_with_progress(
        &mut self,
        on_progress: ProgressHook<'_>,
    ) -> Result<HighsStatus, HighsSessionError> {
        debug!(
            num_cols = self.problem.num_cols(),
            num_rows = self.problem.num_rows(),
            sense = self.sense.as_str(),
            component = "highs",
            operation = "solve",
            status = "start",
            "Solving model"
        );

        let sense = match self.sense {
            Sense::Minimize => HighsSense::Minimise,
            Sense::Maximize => HighsSense::Maximise,
        };
        let problem = std::mem::take(&mut self.problem);
        let mut model =
            problem
                .try_optimise(sense)
                .map_err(|status| HighsSessionError::Engine {
                    operation: "optimise",
                    detail: format!("{status:?}"),
                })?;
        if !self.log_to_console {
            model.make_quiet();
        }
        for (option, value) in self.options.drain(..) {
            let applied = match &value {
                HighsOption::Bool(val) => model.try_set_option(option.as_str(), *val),
                HighsOption::Int(val) => model.try_set_option(option.as_str(), *val),
                HighsOption::Float(val) => model.try_set_option(option.as_str(), *val),
                HighsOption::Str(val) => model.try_set_option(option.as_str(), val.as_str()),
            };
            if let Err(err) = applied {
                warn!(
                    component = "highs",
                    operation = "set_option",
                    status = "warn",
                    option = option.as_str(),
                    ?value,
                    ?err,
                    "HiGHS rejected option; continuing with its default"
                );
            }
        }
        if self.log_to_console {
            model.set_option("output_flag", true);
            model.set_option("log_to_console", true);
        }
        if let Some(values) = self.primal_start.take() {
            if let Err(err) = model.try_set_solution(Some(&values), None, None, None) {
                warn!(
                    component = "highs",
                    operation = "set_primal_start",
                    status = "warn",
                    ?err,
                    "Failed to set warm-start solution; continuing without hints"
                );
            }
        }

        let mut hook = ProgressState {
            hook: on_progress,
            is_mip: self.integer_columns > 0,
            reports: 0,
        };
        let hook_ptr: *mut ProgressState<'_> = &raw mut hook;
        let kinds: &[highs_sys::HighsInt] = if hook.is_mip {
            &[CALLBACK_MIP_INTERRUPT, CALLBACK_MIP_IMPROVING_SOLUTION]
        } else {
            &[CALLBACK_SIMPLEX_INTERRUPT, CALLBACK_IPM_INTERRUPT]
        };
        // SAFETY: `hook` outlives `try_solve`, the only call that runs callbacks.
        let registered = unsafe {
            highs_sys::Highs_setCallback(
                model.as_mut_ptr(),
                Some(progress_callback),
                hook_ptr.cast::<c_void>(),
            )
        } == highs_sys::STATUS_OK
            && kinds.iter().all(|kind| {
                unsafe { highs_sys::Highs_startCallback(model.as_mut_ptr(), *kind) }
                    == highs_sys::STATUS_OK
            });
        if !registered {
            warn!(
                component = "highs",
                operation = "set_callback",
                status = "warn",
                "Failed to register progress callback; solve cannot be interrupted"
            );
        }

        let started = Instant::now();
        let solved = model.try_solve().map_err(|status| HighsSessionError::Engine {
            operation: "run",
            detail: format!("{status:?}"),
        })?;
        self.wall_time = started.elapsed();
        self.progress_reports = hook.reports;
        // SAFETY: the pointer comes from a live solved model.
        let status = map_status(unsafe { highs_sys::Highs_getModelStatus(solved.as_ptr()) });
        trace!(
            component = "highs",
            operation = "solve",
            status = "success",
            ?status,
            progress_reports = self.progress_reports,
            wall_ms = self.wall_time.as_secs_f64() * 1000.0,
            "Solution status received"
        );
        self.solved = Some(solved);
        self.columns.clear();
        Ok(status)
    }

    // ── Results ──

    fn solved(&self, operation: &'static str) -> Result<&SolvedModel, HighsSessionError> {
        self.solved
            .as_ref()
            .ok_or(HighsSessionError::SolveRequired { operation })
    }

    pub fn wall_time(&self) -> Duration {
        self.wall_time
    }

    /// Progress reports delivered during the last solve.
    pub fn progress_reports(&self) -> usize {
        self.progress_reports
    }

    pub fn objective_value(&self) -> Result<f64, HighsSessionError> {
        Ok(self.solved("objective_value")?.objective_value())
    }

    /// Relative MIP gap (infinite for pure LPs, NaN before a solve).
    pub fn mip_gap(&self) -> f64 {
        match self.solved.as_ref() {
            Some(solved) => solved.mip_gap(),
            None => f64::NAN,
        }
    }

    pub fn mip_dual_bound(&self) -> Option<f64> {
        self.double_info("mip_dual_bound")
    }

    /// Whether HiGHS holds a feasible primal point (`primal_solution_status == 2`).
    pub fn has_primal_solution(&self) -> bool {
        self.int_info("primal_solution_status") == Some(2)
    }

    pub fn primal_values(&self) -> Result<Vec<f64>, HighsSessionError> {
        Ok(self.solved("primal_values")?.get_solution().columns().to_vec())
    }

    pub fn row_duals(&self) -> Result<Vec<f64>, HighsSessionError> {
        Ok(self.solved("row_duals")?.get_solution().dual_rows().to_vec())
    }

    fn int_info(&self, name: &str) -> Option<i64> {
        let solved = self.solved.as_ref()?;
        let c_name = CString::new(name).ok()?;
        let mut value: highs_sys::HighsInt = 0;
        let status = unsafe {
            highs_sys::Highs_getIntInfoValue(solved.as_ptr(), c_name.as_ptr(), &raw mut value)
        };
        if status == highs_sys::STATUS_OK {
            Some(i64::from(value))
        } else {
            debug!(
                component = "highs",
                operation = "solve_info",
                info = name,
                status_code = status,
                "Info value not available"
            );
            None
        }
    }

    fn double_info(&self, name: &str) -> Option<f64> {
        let solved = self.solved.as_ref()?;
        let c_name = CString::new(name).ok()?;
        let mut value: f64 = 0.0;
        let status = unsafe {
            highs_sys::Highs_getDoubleInfoValue(solved.as_ptr(), c_name.as_ptr(), &raw mut value)
        };
        (status == highs_sys::STATUS_OK).then_some(value)
    }
}

impl Default for HighsSession {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HighsSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let objective_value = self.solved.as_ref().map(|s| s.objective_value());
        f.debug_struct("HighsSession")
            .field("num_columns", &self.problem.num_cols())
            .field("num_rows", &self.problem.num_rows())
            .field("sense", &self.sense)
            .field("objective_value", &objective_value)
            .finish_non_exhaustive()
    }
}

/// Return the HiGHS library version string, if available.
pub fn highs_version() -> Option<String> {
    unsafe {
        let ptr = highs_sys::Highs_version();
        if ptr.is_null() {
            None
        } else {
            CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
        }
    }
}

fn map_status(status: highs_sys::HighsInt) -> HighsStatus {
    match status {
        MODEL_STATUS_OPTIMAL => HighsStatus::Optimal,
        MODEL_STATUS_INFEASIBLE => HighsStatus::Infeasible,
        MODEL_STATUS_UNBOUNDED => HighsStatus::Unbounded,
        MODEL_STATUS_UNBOUNDED_OR_INFEASIBLE => HighsStatus::UnboundedOrInfeasible,
        MODEL_STATUS_TIME_LIMIT => HighsStatus::ReachedTimeLimit,
        MODEL_STATUS_ITERATION_LIMIT => HighsStatus::ReachedIterationLimit,
        MODEL_STATUS_SOLUTION_LIMIT => HighsStatus::ReachedSolutionLimit,
        MODEL_STATUS_INTERRUPT => HighsStatus::Interrupted,
        _ => HighsStatus::Unknown,
    }
}

/// State handed to HiGHS as callback user data.
struct ProgressState<'a> {
    hook: ProgressHook<'a>,
    is_mip: bool,
    reports: usize,
}

unsafe extern "C" fn progress_callback(
    callback_type: c_int,
    _message: *const c_char,
    data_out: *const highs_sys::HighsCallbackDataOut,
    data_in: *mut highs_sys::HighsCallbackDataIn,
    user_data: *mut c_void,
) {
    if data_out.is_null() || user_data.is_null() {
        return;
    }
    // SAFETY: HiGHS passes back the `ProgressState` registered in
    // `solve_with_progress`, which is alive for the whole native solve.
    let state = unsafe { &mut *user_data.cast::<ProgressState<'_>>() };
    let out = unsafe { &*data_out };
    let elapsed = Duration::try_from_secs_f64(out.running_time).unwrap_or_default();
    let progress = if state.is_mip {
        HighsProgress {
            objective: out.mip_primal_bound,
            best_bound: out.mip_dual_bound,
            elapsed,
        }
    } else {
        HighsProgress {
            objective: out.objective_function_value,
            best_bound: out.objective_function_value,
            elapsed,
        }
    };
    state.reports += 1;
    let keep_going = catch_unwind(AssertUnwindSafe(|| (state.hook)(&progress))).unwrap_or(false);
    trace!(
        component = "highs",
        operation = "progress",
        status = if keep_going { "success" } else { "interrupt" },
        callback_type,
        objective = progress.objective,
        best_bound = progress.best_bound,
        "Progress reported"
    );
    if !keep_going && !data_in.is_null() {
        // SAFETY: non-null `data_in` is writable for the duration of the callback.
        unsafe { (*data_in).user_interrupt = 1 };
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_session_counts_columns_and_rows() {
        let mut session = HighsSession::new();
        let x = session.add_column(1.0, 0.0, 4.0, false);
        let y = session.add_column(2.0, 0.0, 1.0, true);
        assert_eq!((x, y), (0, 1));
        let row = session
            .add_row(f64::NEG_INFINITY, 3.0, &[(x, 1.0), (y, 1.0)])
            .unwrap();
        assert_eq!(row, 0);
        assert_eq!(session.num_columns(), 2);
        assert_eq!(session.num_rows(), 1);
    }

    #[test]
    fn test_add_row_rejects_unknown_column() {
        let mut session = HighsSession::new();
        session.add_column(1.0, 0.0, 1.0, false);
        let err = session.add_row(0.0, 1.0, &[(3, 1.0)]).unwrap_err();
        assert_eq!(
            err,
            HighsSessionError::ColumnIndexOutOfBounds {
                column_index: 3,
                num_columns: 1
            }
        );
    }

    #[test]
    fn test_results_require_solve() {
        let session = HighsSession::new();
        assert!(matches!(
            session.objective_value(),
            Err(HighsSessionError::SolveRequired { .. })
        ));
        assert!(session.mip_gap().is_nan());
        assert!(!session.has_primal_solution());
    }

    #[test]
    fn test_primal_start_length_checked() {
        let mut session = HighsSession::new();
        session.add_column(1.0, 0.0, 1.0, false);
        assert!(session.set_primal_start(vec![0.0, 1.0]).is_err());
        assert!(session.set_primal_start(vec![0.5]).is_ok());
    }

    #[test]
    fn test_solve_small_lp() {
        // max x + y  s.t. x + 2y <= 4, 0 <= x <= 2, y >= 0
        let mut session = HighsSession::new();
        let x = session.add_column(1.0, 0.0, 2.0, false);
        let y = session.add_column(1.0, 0.0, f64::INFINITY, false);
        session
            .add_row(f64::NEG_INFINITY, 4.0, &[(x, 1.0), (y, 2.0)])
            .unwrap();
        session.set_sense(Sense::Maximize);

        let status = session.solve().unwrap();
        assert_eq!(status, HighsStatus::Optimal);
        assert!((session.objective_value().unwrap() - 3.0).abs() < 1e-6);
        let values = session.primal_values().unwrap();
        assert!((values[0] - 2.0).abs() < 1e-6);
        assert!((values[1] - 1.0).abs() < 1e-6);
        assert_eq!(session.row_duals().unwrap().len(), 1);
        assert!(session.has_primal_solution());
    }

    #[test]
    fn test_native_status_codes() {
        assert_eq!(map_status(MODEL_STATUS_OPTIMAL), HighsStatus::Optimal);
        assert_eq!(
            map_status(MODEL_STATUS_UNBOUNDED_OR_INFEASIBLE),
            HighsStatus::UnboundedOrInfeasible
        );
        assert_eq!(map_status(MODEL_STATUS_INTERRUPT), HighsStatus::Interrupted);
        assert_eq!(map_status(MODEL_STATUS_SOLUTION_LIMIT), HighsStatus::ReachedSolutionLimit);
        assert_eq!(map_status(0), HighsStatus::Unknown);
    }

    /// Equal-halves partition over four weight rows; hard for branch and bound.
    fn split_session() -> HighsSession {
        let mut session = HighsSession::new();
        let items: Vec<usize> = (0..30).map(|_| session.add_column(0.0, 0.0, 1.0, true)).collect();
        let mut seed: u64 = 17;
        for _ in 0..4 {
            let mut factors = Vec::new();
            let mut total = 0.0;
            for &item in &items {
                seed = seed
                    .wrapping_mul(6_364_136_223_846_793_005)
                    .wrapping_add(1_442_695_040_888_963_407);
                let weight = ((seed >> 33) % 100) as f64;
                total += weight;
                factors.push((item, weight));
            }
            let over = session.add_column(1.0, 0.0, 1e4, false);
            let under = session.add_column(1.0, 0.0, 1e4, false);
            factors.push((over, -1.0));
            factors.push((under, 1.0));
            let target = (total / 2.0).floor();
            session.add_row(target, target, &factors).unwrap();
        }
        session
    }

    #[test]
    fn test_progress_hook_interrupts_mip() {
        let mut session = split_session();
        session.set_option("threads", HighsOption::Int(1));
        let mut seen = Vec::new();
        let status = session
            .solve_with_progress(&mut |progress: &HighsProgress| {
                seen.push(*progress);
                false
            })
            .unwrap();
        assert_eq!(status, HighsStatus::Interrupted);
        assert!(!seen.is_empty());
        assert_eq!(session.progress_reports(), seen.len());
        assert!(session.wall_time() < Duration::from_secs(30));
    }

    #[test]
    fn test_progress_hook_panic_interrupts() {
        let mut session = split_session();
        session.set_option("threads", HighsOption::Int(1));
        let status = session
            .solve_with_progress(&mut |_: &HighsProgress| -> bool { panic!("hook failed") })
            .unwrap();
        assert_eq!(status, HighsStatus::Interrupted);
    }
}
