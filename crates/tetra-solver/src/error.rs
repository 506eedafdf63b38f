//! Solver error types.

/// Error type for solver operations.
#[derive(Debug, Clone, PartialEq)]
pub enum SolverError {
    /// The model has no feasible solution.
    ModelNoSolution,
    /// The model objective is unbounded.
    ModelUnbounded,
    /// The engine failed while building or solving the model.
    EngineSolvingException(String),
    /// The engine session or license could not be acquired or was lost.
    EngineEnvironmentLost(String),
    /// The solve was aborted by the improvement monitor or a status callback.
    EngineTerminated { reason: String },
    /// Every solver in a chain failed without a definitive answer.
    SolverNotFound { attempts: Vec<String> },
    /// The backend cannot consume this model shape (e.g. quadratic terms).
    UnsupportedModel { solver: String, reason: String },
}

impl SolverError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            SolverError::ModelNoSolution => "SOLVER_MODEL_NO_SOLUTION",
            SolverError::ModelUnbounded => "SOLVER_MODEL_UNBOUNDED",
            SolverError::EngineSolvingException(_) => "SOLVER_ENGINE_EXCEPTION",
            SolverError::EngineEnvironmentLost(_) => "SOLVER_ENGINE_ENVIRONMENT_LOST",
            SolverError::EngineTerminated { .. } => "SOLVER_ENGINE_TERMINATED",
            SolverError::SolverNotFound { .. } => "SOLVER_NOT_FOUND",
            SolverError::UnsupportedModel { .. } => "SOLVER_UNSUPPORTED_MODEL",
        }
    }

    /// Failures that describe the model itself; trying another engine cannot help.
    pub fn is_definitive(&self) -> bool {
        matches!(
            self,
            SolverError::ModelNoSolution | SolverError::ModelUnbounded
        )
    }
}

impl std::fmt::Display for SolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverError::ModelNoSolution => {
                write!(f, "[{}] Model has no feasible solution", self.code())
            }
            SolverError::ModelUnbounded => write!(f, "[{}] Model is unbounded", self.code()),
            SolverError::EngineSolvingException(msg) => {
                write!(f, "[{}] Engine failed: {}", self.code(), msg)
            }
            SolverError::EngineEnvironmentLost(msg) => {
                write!(f, "[{}] Engine environment unavailable: {}", self.code(), msg)
            }
            SolverError::EngineTerminated { reason } => {
                write!(f, "[{}] Solve terminated: {}", self.code(), reason)
            }
            SolverError::SolverNotFound { attempts } => {
                if attempts.is_empty() {
                    write!(f, "[{}] No solver configured", self.code())
                } else {
                    write!(
                        f,
                        "[{}] No solver succeeded: {}",
                        self.code(),
                        attempts.join("; ")
                    )
                }
            }
            SolverError::UnsupportedModel { solver, reason } => {
                write!(
                    f,
                    "[{}] Solver '{}' cannot handle model: {}",
                    self.code(),
                    solver,
                    reason
                )
            }
        }
    }
}

impl std::error::Error for SolverError {}
