//! `SolverAdapter` implementation on top of [`HighsSession`].

use crate::dump::{RowDump, SOLVER_NAME, objective_costs};
use crate::ffi::{
    HighsOption, HighsProgress, HighsSession, HighsSessionError, HighsStatus, highs_version,
};
use crate::status::{highs_status_string, to_solver_status};
use std::time::Instant;
use tetra_core::{Column, IntermediateModel};
use tetra_solver::{
    AdapterSolver, Decision, ImprovementMonitor, SolverAdapter, SolverConfig, SolverError,
    SolverOutput, SolverStatus, SolvingStatus, relative_gap,
};
use tetra_tools::capture_rss_bytes;
use tracing::{debug, trace, warn};

/// HiGHS backend. One adapter serves one solve.
///
/// The monitor is fed from HiGHS' native interrupt callbacks while the engine
/// runs, and an abort raises the HiGHS user interrupt. Models that finish
/// before any callback fires (typically in presolve) get one report once the
/// engine returns. The wall-clock limit is enforced natively.
#[derive(Debug)]
pub struct HighsAdapter {
    session: Option<HighsSession>,
    problem: String,
    parallel_dump: bool,
    chunk_count: usize,
    log_to_console: bool,
    is_mip: bool,
    objective_constant: f64,
    num_rows: usize,
    native_status: Option<HighsStatus>,
}

impl HighsAdapter {
    pub fn new() -> Self {
        Self {
            session: None,
            problem: String::new(),
            parallel_dump: true,
            chunk_count: num_cpus::get(),
            log_to_console: false,
            is_mip: false,
            objective_constant: 0.0,
            num_rows: 0,
            native_status: None,
        }
    }

    /// Translate rows on the rayon pool (when the `parallel` feature is on).
    pub fn with_parallel_dump(mut self, enabled: bool) -> Self {
        self.parallel_dump = enabled;
        self
    }

    pub fn with_chunk_count(mut self, count: usize) -> Self {
        self.chunk_count = count.max(1);
        self
    }

    pub fn with_log_to_console(mut self, enabled: bool) -> Self {
        self.log_to_console = enabled;
        self
    }

    fn session(&self) -> Result<&HighsSession, SolverError> {
        self.session.as_ref().ok_or_else(session_lost)
    }

    fn session_mut(&mut self) -> Result<&mut HighsSession, SolverError> {
        self.session.as_mut().ok_or_else(session_lost)
    }

    fn best_bound(&self, session: &HighsSession, objective: f64) -> f64 {
        if !self.is_mip {
            return objective;
        }
        session
            .mip_dual_bound()
            .filter(|bound| bound.is_finite())
            .map_or(objective, |bound| bound + self.objective_constant)
    }
}

impl Default for HighsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverAdapter for HighsAdapter {
    fn name(&self) -> &str {
        SOLVER_NAME
    }

    fn init(&mut self, name: &str) -> Result<(), SolverError> {
        let version = highs_version();
        debug!(
            component = "highs",
            operation = "init",
            status = "success",
            problem = name,
            version = version.as_deref().unwrap_or("unknown"),
            "Acquired HiGHS session"
        );
        self.problem = name.to_string();
        self.session = Some(HighsSession::new());
        self.native_status = None;
        Ok(())
    }

    fn dump(&mut self, model: &IntermediateModel) -> Result<(), SolverError> {
        let started = Instant::now();
        let rss_before = capture_rss_bytes("highs_dump");
        let columns = model.columns();
        let objective = model.objective();

        let costs = objective_costs(objective, columns.len())?;
        let rows = RowDump::new()
            .with_chunk_count(self.chunk_count)
            .with_parallel(self.parallel_dump)
            .translate(model.rows())?;

        let session = self.session_mut()?;
        for (column, cost) in columns.iter().zip(costs) {
            session.add_column(cost, column.lower, column.upper, column.is_integral());
        }
        for row in &rows {
            session
                .add_row(row.lower, row.upper, &row.factors)
                .map_err(engine_error)?;
        }
        session.set_sense(objective.sense);
        if let Some(start) = primal_start(columns) {
            session.set_primal_start(start).map_err(engine_error)?;
        }

        self.is_mip = model.is_mip();
        self.objective_constant = objective.constant;
        self.num_rows = rows.len();
        let rss_after = capture_rss_bytes("highs_dump");
        debug!(
            component = "highs",
            operation = "dump",
            status = "success",
            problem = self.problem.as_str(),
            columns = columns.len(),
            rows = rows.len(),
            is_mip = self.is_mip,
            rss_before_bytes = ?rss_before,
            rss_after_bytes = ?rss_after,
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Dumped model into HiGHS"
        );
        Ok(())
    }

    fn configure(&mut self, config: &SolverConfig) -> Result<(), SolverError> {
        let log_to_console = self.log_to_console;
        let session = self.session_mut()?;
        session.set_option(
            "time_limit",
            HighsOption::Float(config.time_limit.as_secs_f64()),
        );
        session.set_option("mip_rel_gap", HighsOption::Float(config.optimality_gap));
        session.set_option(
            "threads",
            HighsOption::Int(i32::try_from(config.thread_count).unwrap_or(i32::MAX)),
        );
        session.set_log_to_console(log_to_console);
        trace!(
            component = "highs",
            operation = "configure",
            status = "success",
            time_limit_s = config.time_limit.as_secs_f64(),
            optimality_gap = config.optimality_gap,
            thread_count = config.thread_count,
            "Configured HiGHS options"
        );
        Ok(())
    }

    fn solve(&mut self, monitor: &mut ImprovementMonitor) -> Result<(), SolverError> {
        let constant = self.objective_constant;
        let session = self.session_mut()?;
        let native = session
            .solve_with_progress(&mut |progress: &HighsProgress| {
                let report = SolvingStatus::new(
                    SOLVER_NAME,
                    progress.objective + constant,
                    progress.best_bound + constant,
                    progress.elapsed,
                );
                monitor.observe(&report) == Decision::Continue
            })
            .map_err(engine_error)?;
        self.native_status = Some(native);

        let session = self.session()?;
        if session.progress_reports() == 0 {
            let objective = if session.has_primal_solution() {
                session.objective_value().map_err(engine_error)? + constant
            } else {
                f64::INFINITY
            };
            let report = SolvingStatus::new(
                SOLVER_NAME,
                objective,
                self.best_bound(session, objective),
                session.wall_time(),
            );
            monitor.observe(&report);
        }

        let reason = match monitor.abort_reason() {
            Some(reason) => reason.to_string(),
            None if native == HighsStatus::Interrupted => "interrupted".to_string(),
            None => return Ok(()),
        };
        warn!(
            component = "highs",
            operation = "solve",
            status = "warn",
            problem = self.problem.as_str(),
            reason = reason.as_str(),
            native_status = highs_status_string(native),
            wall_ms = session.wall_time().as_secs_f64() * 1000.0,
            "HiGHS stopped on abort request"
        );
        Err(SolverError::EngineTerminated { reason })
    }

    fn analyze_status(&self) -> Result<SolverStatus, SolverError> {
        let native = self.native_status.ok_or_else(|| {
            SolverError::EngineEnvironmentLost("HiGHS has not solved this session".to_string())
        })?;
        let status = to_solver_status(native, self.session()?.has_primal_solution());
        debug!(
            component = "highs",
            operation = "analyze_status",
            status = "success",
            native_status = highs_status_string(native),
            solve_status = status.as_str(),
            "Mapped HiGHS status"
        );
        Ok(status)
    }

    fn analyze_solution(&self, status: SolverStatus) -> Result<SolverOutput, SolverError> {
        let session = self.session()?;
        let solution = session.primal_values().map_err(engine_error)?;
        let objective = session.objective_value().map_err(engine_error)? + self.objective_constant;
        let best_bound = self.best_bound(session, objective);
        let gap = if !self.is_mip {
            0.0
        } else if session.mip_gap().is_finite() {
            session.mip_gap()
        } else {
            relative_gap(objective, best_bound)
        };
        let row_duals = if !self.is_mip && status.is_optimal() {
            let duals = session.row_duals().map_err(engine_error)?;
            (duals.len() == self.num_rows).then_some(duals)
        } else {
            None
        };

        debug!(
            component = "highs",
            operation = "extract_solution",
            status = "success",
            objective,
            best_bound,
            gap,
            num_primal_values = solution.len(),
            has_duals = row_duals.is_some(),
            "Solution extracted"
        );
        Ok(SolverOutput {
            status,
            objective,
            solution,
            wall_time: session.wall_time(),
            best_bound,
            gap,
            row_duals,
        })
    }
}

/// A [`tetra_solver::Solver`] creating a default [`HighsAdapter`] per solve.
pub fn highs_solver() -> AdapterSolver<fn() -> HighsAdapter> {
    AdapterSolver::new(SOLVER_NAME, HighsAdapter::new as fn() -> HighsAdapter)
}

fn session_lost() -> SolverError {
    SolverError::EngineEnvironmentLost("HiGHS session not initialised".to_string())
}

fn engine_error(err: HighsSessionError) -> SolverError {
    SolverError::EngineSolvingException(err.to_string())
}

/// Full start vector when any column carries an initial value.
///
/// Columns without one start at the feasible value closest to zero.
fn primal_start(columns: &[Column]) -> Option<Vec<f64>> {
    if columns.iter().all(|column| column.initial.is_none()) {
        return None;
    }
    Some(
        columns
            .iter()
            .map(|column| {
                column
                    .initial
                    .unwrap_or_else(|| default_primal_value(column.lower, column.upper))
            })
            .collect(),
    )
}

fn default_primal_value(lower: f64, upper: f64) -> f64 {
    if lower.is_finite() && upper.is_finite() {
        if lower <= 0.0 && 0.0 <= upper {
            0.0
        } else if 0.0 < lower {
            lower
        } else {
            upper
        }
    } else if lower.is_finite() {
        if 0.0 < lower { lower } else { 0.0 }
    } else if upper.is_finite() {
        if 0.0 > upper { upper } else { 0.0 }
    } else {
        0.0
    }
}
