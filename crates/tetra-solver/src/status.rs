//! Solver status types.

/// Outcome of a solve as reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverStatus {
    /// Proven optimal solution.
    Optimal,
    /// A feasible solution exists but optimality was not proven (limit reached).
    Feasible,
    /// No solution was found (infeasible, or a limit hit before any incumbent).
    NoSolution,
    /// The objective is unbounded.
    Unbounded,
}

impl SolverStatus {
    pub fn is_optimal(self) -> bool {
        matches!(self, SolverStatus::Optimal)
    }

    /// Whether a primal solution can be read back.
    pub fn has_solution(self) -> bool {
        matches!(self, SolverStatus::Optimal | SolverStatus::Feasible)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SolverStatus::Optimal => "optimal",
            SolverStatus::Feasible => "feasible",
            SolverStatus::NoSolution => "no_solution",
            SolverStatus::Unbounded => "unbounded",
        }
    }
}

impl std::fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
