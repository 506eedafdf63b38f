//! Try several solvers in order until one answers.

use crate::adapter::Solver;
use crate::callback::StatusCallback;
use crate::config::SolverConfig;
use crate::error::SolverError;
use crate::output::SolverOutput;
use std::time::Instant;
use tetra_core::IntermediateModel;
use tracing::{debug, warn};

/// Chains solvers: the first success wins.
///
/// A definitive failure (no solution, unbounded) is returned at once since
/// another engine would reach the same verdict. Other failures fall through
/// to the next solver; if none succeeds the result is
/// [`SolverError::SolverNotFound`].
#[derive(Default)]
pub struct SerialCombinatorialSolver {
    solvers: Vec<Box<dyn Solver>>,
}

impl SerialCombinatorialSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_solver(mut self, solver: impl Solver + 'static) -> Self {
        self.push(solver);
        self
    }

    pub fn push(&mut self, solver: impl Solver + 'static) {
        self.solvers.push(Box::new(solver));
    }

    pub fn len(&self) -> usize {
        self.solvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solvers.is_empty()
    }

    pub fn solver_names(&self) -> Vec<&str> {
        self.solvers.iter().map(|solver| solver.name()).collect()
    }
}

impl Solver for SerialCombinatorialSolver {
    fn name(&self) -> &str {
        "serial"
    }

    fn solve(
        &self,
        model: &IntermediateModel,
        config: &SolverConfig,
        callback: Option<StatusCallback>,
    ) -> Result<SolverOutput, SolverError> {
        let started = Instant::now();
        let mut attempts = Vec::new();

        for (position, solver) in self.solvers.iter().enumerate() {
            match solver.solve(model, config, callback.clone()) {
                Ok(output) => {
                    debug!(
                        component = "serial_solver",
                        operation = "solve",
                        status = "success",
                        solver = solver.name(),
                        position,
                        failed_before = attempts.len(),
                        duration_ms = started.elapsed().as_secs_f64() * 1000.0,
                        "Solver succeeded"
                    );
                    return Ok(output);
                }
                Err(err) if err.is_definitive() => {
                    debug!(
                        component = "serial_solver",
                        operation = "solve",
                        status = "error",
                        solver = solver.name(),
                        code = err.code(),
                        "Definitive failure; not trying remaining solvers"
                    );
                    return Err(err);
                }
                Err(err) => {
                    warn!(
                        component = "serial_solver",
                        operation = "solve",
                        status = "warn",
                        solver = solver.name(),
                        code = err.code(),
                        "Solver failed, falling through: {err}"
                    );
                    attempts.push(format!("{}: {}", solver.name(), err));
                }
            }
        }

        Err(SolverError::SolverNotFound { attempts })
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::adapter::AdapterSolver;
    use crate::adapter::tests::{MockAdapter, tiny_model};
    use crate::status::SolverStatus;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    /// Returns a fixed result and counts how often it was asked.
    struct Scripted {
        name: &'static str,
        result: Result<f64, SolverError>,
        calls: Rc<Cell<usize>>,
    }

    impl Scripted {
        fn new(name: &'static str, result: Result<f64, SolverError>) -> (Self, Rc<Cell<usize>>) {
            let calls = Rc::new(Cell::new(0));
            let solver = Self {
                name,
                result,
                calls: Rc::clone(&calls),
            };
            (solver, calls)
        }
    }

    impl Solver for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        fn solve(
            &self,
            model: &IntermediateModel,
            _config: &SolverConfig,
            _callback: Option<StatusCallback>,
        ) -> Result<SolverOutput, SolverError> {
            self.calls.set(self.calls.get() + 1);
            self.result.clone().map(|objective| SolverOutput {
                status: SolverStatus::Optimal,
                objective,
                solution: vec![0.0; model.columns().len()],
                wall_time: Duration::ZERO,
                best_bound: objective,
                gap: 0.0,
                row_duals: None,
            })
        }
    }

    fn engine_failure() -> SolverError {
        SolverError::EngineEnvironmentLost("license".to_string())
    }

    #[test]
    fn test_first_success_wins() {
        let (first, first_calls) = Scripted::new("first", Ok(3.0));
        let (second, second_calls) = Scripted::new("second", Ok(4.0));
        let serial = SerialCombinatorialSolver::new()
            .with_solver(first)
            .with_solver(second);

        let output = serial
            .solve(&tiny_model(), &SolverConfig::new(), None)
            .unwrap();
        assert_eq!(output.objective, 3.0);
        assert_eq!(first_calls.get(), 1);
        assert_eq!(second_calls.get(), 0);
    }

    #[test]
    fn test_non_definitive_failure_falls_through() {
        let (broken, _) = Scripted::new("broken", Err(engine_failure()));
        let (working, working_calls) = Scripted::new("working", Ok(7.0));
        let serial = SerialCombinatorialSolver::new()
            .with_solver(broken)
            .with_solver(working);
        assert_eq!(serial.solver_names(), vec!["broken", "working"]);

        let output = serial
            .solve(&tiny_model(), &SolverConfig::new(), None)
            .unwrap();
        assert_eq!(output.objective, 7.0);
        assert_eq!(working_calls.get(), 1);
    }

    #[test]
    fn test_definitive_failure_stops_chain() {
        for definitive in [SolverError::ModelNoSolution, SolverError::ModelUnbounded] {
            let (infeasible, _) = Scripted::new("infeasible", Err(definitive.clone()));
            let (never, never_calls) = Scripted::new("never", Ok(1.0));
            let serial = SerialCombinatorialSolver::new()
                .with_solver(infeasible)
                .with_solver(never);

            let err = serial
                .solve(&tiny_model(), &SolverConfig::new(), None)
                .unwrap_err();
            assert_eq!(err, definitive);
            assert_eq!(never_calls.get(), 0);
        }
    }

    #[test]
    fn test_all_failures_end_in_solver_not_found() {
        let (a, _) = Scripted::new("a", Err(engine_failure()));
        let (b, _) = Scripted::new(
            "b",
            Err(SolverError::UnsupportedModel {
                solver: "b".to_string(),
                reason: "quadratic".to_string(),
            }),
        );
        let serial = SerialCombinatorialSolver::new().with_solver(a).with_solver(b);

        match serial.solve(&tiny_model(), &SolverConfig::new(), None) {
            Err(SolverError::SolverNotFound { attempts }) => {
                assert_eq!(attempts.len(), 2);
                assert!(attempts[0].starts_with("a: [SOLVER_ENGINE_ENVIRONMENT_LOST]"));
                assert!(attempts[1].starts_with("b: [SOLVER_UNSUPPORTED_MODEL]"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_empty_chain() {
        let serial = SerialCombinatorialSolver::new();
        assert!(serial.is_empty());
        let err = serial
            .solve(&tiny_model(), &SolverConfig::new(), None)
            .unwrap_err();
        assert_eq!(err.code(), "SOLVER_NOT_FOUND");
    }

    #[test]
    fn test_adapter_backed_chain() {
        let serial = SerialCombinatorialSolver::new()
            .with_solver(AdapterSolver::new("flaky", || {
                let mut adapter = MockAdapter::new(SolverStatus::Optimal);
                adapter.fail_at = Some(("init", engine_failure()));
                adapter
            }))
            .with_solver(AdapterSolver::new("steady", || {
                MockAdapter::new(SolverStatus::Feasible)
            }));
        assert_eq!(serial.len(), 2);

        let output = serial
            .solve(&tiny_model(), &SolverConfig::new(), None)
            .unwrap();
        assert_eq!(output.status, SolverStatus::Feasible);
        assert_eq!(output.solution.len(), 1);
    }
}
