//! Model error types.

use tetra_expr::{PolynomialError, SymbolId, VariableId};

/// Errors raised while building, registering or evaluating a model.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Two distinct symbols share a name
    DuplicateSymbol { name: String },
    /// A variable with the same name already exists
    DuplicateVariable { name: String },
    InvalidVariableId(VariableId),
    InvalidSymbolId(SymbolId),
    /// A variable range became empty
    EmptyRange { variable: String },
    /// A big-M would be derived from an unbounded range
    UnboundedExpression { symbol: String },
    /// Function inputs do not form a valid domain
    InvalidFunctionInput { symbol: String, reason: String },
    /// Reference to a variable without an active token under `TokenPolicy::Manual`
    UnregisteredVariable(VariableId),
    /// Solution vector does not match the column count
    SolutionLength { expected: usize, actual: usize },
    Polynomial(PolynomialError),
}

impl ModelError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            ModelError::DuplicateSymbol { .. } => "SYMBOL_DUPLICATE_NAME",
            ModelError::DuplicateVariable { .. } => "VARIABLE_DUPLICATE_NAME",
            ModelError::InvalidVariableId(_) => "VARIABLE_INVALID_ID",
            ModelError::InvalidSymbolId(_) => "SYMBOL_INVALID_ID",
            ModelError::EmptyRange { .. } => "VARIABLE_EMPTY_RANGE",
            ModelError::UnboundedExpression { .. } => "SYMBOL_UNBOUNDED_EXPRESSION",
            ModelError::InvalidFunctionInput { .. } => "SYMBOL_INVALID_INPUT",
            ModelError::UnregisteredVariable(_) => "VARIABLE_UNREGISTERED",
            ModelError::SolutionLength { .. } => "SOLUTION_LENGTH_MISMATCH",
            ModelError::Polynomial(inner) => inner.code(),
        }
    }
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::DuplicateSymbol { name } => write!(
                f,
                "[{}] A different symbol named '{}' already exists",
                self.code(),
                name
            ),
            ModelError::DuplicateVariable { name } => write!(
                f,
                "[{}] A variable named '{}' already exists",
                self.code(),
                name
            ),
            ModelError::InvalidVariableId(id) => write!(
                f,
                "[{}] Variable ID {} does not exist",
                self.code(),
                id.inner()
            ),
            ModelError::InvalidSymbolId(id) => write!(
                f,
                "[{}] Symbol ID {} does not exist",
                self.code(),
                id.inner()
            ),
            ModelError::EmptyRange { variable } => write!(
                f,
                "[{}] Range of variable '{}' is empty",
                self.code(),
                variable
            ),
            ModelError::UnboundedExpression { symbol } => write!(
                f,
                "[{}] Symbol '{}' needs a bounded input range",
                self.code(),
                symbol
            ),
            ModelError::InvalidFunctionInput { symbol, reason } => write!(
                f,
                "[{}] Symbol '{}' has invalid input: {}",
                self.code(),
                symbol,
                reason
            ),
            ModelError::UnregisteredVariable(id) => write!(
                f,
                "[{}] Variable ID {} has no active token",
                self.code(),
                id.inner()
            ),
            ModelError::SolutionLength { expected, actual } => write!(
                f,
                "[{}] Expected {} values, got {}",
                self.code(),
                expected,
                actual
            ),
            ModelError::Polynomial(inner) => write!(f, "{inner}"),
        }
    }
}

impl std::error::Error for ModelError {}

impl From<PolynomialError> for ModelError {
    fn from(error: PolynomialError) -> Self {
        ModelError::Polynomial(error)
    }
}
