//! Mapping native HiGHS statuses onto the protocol statuses.

use crate::ffi::HighsStatus;
use tetra_solver::SolverStatus;

/// `has_incumbent` decides between `Feasible` and `NoSolution` when a limit stopped the run.
pub(crate) fn to_solver_status(status: HighsStatus, has_incumbent: bool) -> SolverStatus {
    match status {
        HighsStatus::Optimal => SolverStatus::Optimal,
        HighsStatus::Unbounded => SolverStatus::Unbounded,
        HighsStatus::Infeasible | HighsStatus::UnboundedOrInfeasible => SolverStatus::NoSolution,
        HighsStatus::ReachedTimeLimit
        | HighsStatus::ReachedIterationLimit
        | HighsStatus::ReachedSolutionLimit
        | HighsStatus::Interrupted
        | HighsStatus::Unknown => {
            if has_incumbent {
                SolverStatus::Feasible
            } else {
                SolverStatus::NoSolution
            }
        }
    }
}

pub(crate) fn highs_status_string(status: HighsStatus) -> &'static str {
    match status {
        HighsStatus::Optimal => "optimal",
        HighsStatus::Infeasible => "infeasible",
        HighsStatus::Unbounded => "unbounded",
        HighsStatus::UnboundedOrInfeasible => "unbounded_or_infeasible",
        HighsStatus::ReachedTimeLimit => "time_limit",
        HighsStatus::ReachedIterationLimit => "iteration_limit",
        HighsStatus::ReachedSolutionLimit => "solution_limit",
        HighsStatus::Interrupted => "interrupted",
        HighsStatus::Unknown => "unknown",
    }
}
