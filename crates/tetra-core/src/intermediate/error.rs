//! Compile error types.

use crate::model::ModelError;

/// Errors raised while compiling a mechanism model into an intermediate model.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    Model(ModelError),
    /// A quadratic cell reached a linear-only model
    QuadraticCell { row: String },
    /// Symbol substitution produced a product above degree 2
    DegreeOverflow { context: String },
    /// No sub-objective was declared
    NoObjective,
    /// No variable carries an active token
    EmptyModel,
}

impl CompileError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::Model(inner) => inner.code(),
            CompileError::QuadraticCell { .. } => "COMPILE_QUADRATIC_CELL",
            CompileError::DegreeOverflow { .. } => "COMPILE_DEGREE_OVERFLOW",
            CompileError::NoObjective => "COMPILE_NO_OBJECTIVE",
            CompileError::EmptyModel => "COMPILE_EMPTY_MODEL",
        }
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::Model(inner) => write!(f, "{inner}"),
            CompileError::QuadraticCell { row } => write!(
                f,
                "[{}] '{}' has a quadratic term but the model is linear",
                self.code(),
                row
            ),
            CompileError::DegreeOverflow { context } => write!(
                f,
                "[{}] '{}' expands to a term above degree 2",
                self.code(),
                context
            ),
            CompileError::NoObjective => {
                write!(f, "[{}] Model has no objective", self.code())
            }
            CompileError::EmptyModel => {
                write!(f, "[{}] Model has no active variables", self.code())
            }
        }
    }
}

impl std::error::Error for CompileError {}

impl From<ModelError> for CompileError {
    fn from(error: ModelError) -> Self {
        CompileError::Model(error)
    }
}
