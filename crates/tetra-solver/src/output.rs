//! Uniform solve result.

use crate::status::SolverStatus;
use std::time::Duration;

/// What every backend hands back after a successful solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOutput {
    pub status: SolverStatus,
    pub objective: f64,
    /// Primal value per intermediate-model column.
    pub solution: Vec<f64>,
    pub wall_time: Duration,
    pub best_bound: f64,
    pub gap: f64,
    /// Row duals in intermediate-model row order; only filled for pure LPs.
    pub row_duals: Option<Vec<f64>>,
}

impl SolverOutput {
    pub fn value(&self, column: usize) -> Option<f64> {
        self.solution.get(column).copied()
    }

    pub fn is_optimal(&self) -> bool {
        self.status.is_optimal()
    }
}
