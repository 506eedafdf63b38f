//! The phase protocol every backend implements, and its driver.

use crate::callback::StatusCallback;
use crate::config::SolverConfig;
use crate::error::SolverError;
use crate::monitor::ImprovementMonitor;
use crate::output::SolverOutput;
use crate::status::SolverStatus;
use std::time::Instant;
use tetra_core::IntermediateModel;
use tracing::{debug, trace, warn};

/// Lifecycle of one backend session over an intermediate model.
///
/// Phases run in declaration order; [`run_adapter`] stops at the first error.
/// Implementations own their native handles and release them on drop.
pub trait SolverAdapter {
    /// Engine name used in logs, progress reports and errors.
    fn name(&self) -> &str;

    /// Acquire a session for a problem called `name`.
    fn init(&mut self, name: &str) -> Result<(), SolverError>;

    /// Translate columns, rows and objective into native structures.
    fn dump(&mut self, model: &IntermediateModel) -> Result<(), SolverError>;

    fn configure(&mut self, config: &SolverConfig) -> Result<(), SolverError>;

    /// Run the engine, reporting progress to `monitor` and aborting when it says so.
    fn solve(&mut self, monitor: &mut ImprovementMonitor) -> Result<(), SolverError>;

    fn analyze_status(&self) -> Result<SolverStatus, SolverError>;

    fn analyze_solution(&self, status: SolverStatus) -> Result<SolverOutput, SolverError>;
}

/// Drive `adapter` through every phase.
///
/// `NoSolution` and `Unbounded` statuses become the definitive
/// [`SolverError::ModelNoSolution`] and [`SolverError::ModelUnbounded`].
pub fn run_adapter<A: SolverAdapter + ?Sized>(
    adapter: &mut A,
    model: &IntermediateModel,
    config: &SolverConfig,
    monitor: &mut ImprovementMonitor,
) -> Result<SolverOutput, SolverError> {
    let started = Instant::now();
    let solver = adapter.name().to_string();

    let result = run_phases(adapter, model, config, monitor);
    let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
    match &result {
        Ok(output) => debug!(
            component = "solver",
            operation = "run_adapter",
            status = "success",
            solver = solver.as_str(),
            model = model.name(),
            solve_status = output.status.as_str(),
            objective = output.objective,
            duration_ms,
            "Solver finished"
        ),
        Err(err) => warn!(
            component = "solver",
            operation = "run_adapter",
            status = "error",
            solver = solver.as_str(),
            model = model.name(),
            code = err.code(),
            duration_ms,
            "Solver failed: {err}"
        ),
    }
    result
}

fn run_phases<A: SolverAdapter + ?Sized>(
    adapter: &mut A,
    model: &IntermediateModel,
    config: &SolverConfig,
    monitor: &mut ImprovementMonitor,
) -> Result<SolverOutput, SolverError> {
    adapter.init(model.name())?;
    trace!(
        component = "solver",
        operation = "init",
        status = "success",
        solver = adapter.name()
    );

    let started = Instant::now();
    adapter.dump(model)?;
    trace!(
        component = "solver",
        operation = "dump",
        status = "success",
        solver = adapter.name(),
        columns = model.columns().len(),
        rows = model.rows().len(),
        duration_ms = started.elapsed().as_secs_f64() * 1000.0
    );

    adapter.configure(config)?;
    adapter.solve(monitor)?;

    let status = adapter.analyze_status()?;
    trace!(
        component = "solver",
        operation = "analyze_status",
        status = "success",
        solver = adapter.name(),
        solve_status = status.as_str()
    );
    match status {
        SolverStatus::NoSolution => Err(SolverError::ModelNoSolution),
        SolverStatus::Unbounded => Err(SolverError::ModelUnbounded),
        SolverStatus::Optimal | SolverStatus::Feasible => adapter.analyze_solution(status),
    }
}

/// Anything that can solve an intermediate model end to end.
pub trait Solver {
    fn name(&self) -> &str;

    fn solve(
        &self,
        model: &IntermediateModel,
        config: &SolverConfig,
        callback: Option<StatusCallback>,
    ) -> Result<SolverOutput, SolverError>;
}

/// A [`Solver`] that builds a fresh adapter per solve.
pub struct AdapterSolver<F> {
    name: String,
    factory: F,
}

impl<F> AdapterSolver<F> {
    pub fn new(name: impl Into<String>, factory: F) -> Self {
        Self {
            name: name.into(),
            factory,
        }
    }
}

impl<F, A> Solver for AdapterSolver<F>
where
    F: Fn() -> A,
    A: SolverAdapter,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn solve(
        &self,
        model: &IntermediateModel,
        config: &SolverConfig,
        callback: Option<StatusCallback>,
    ) -> Result<SolverOutput, SolverError> {
        let mut adapter = (self.factory)();
        let mut monitor = ImprovementMonitor::from_config(config);
        if let Some(callback) = callback {
            monitor = monitor.with_callback(callback);
        }
        run_adapter(&mut adapter, model, config, &mut monitor)
    }
}
