//! Polynomial algebra errors.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolynomialError {
    DegreeOverflow { degree: usize },
    DivisionByZero,
    NonFiniteCoefficient,
    MismatchedLengths { operands: usize, coefficients: usize },
}

impl PolynomialError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            PolynomialError::DegreeOverflow { .. } => "POLY_DEGREE_OVERFLOW",
            PolynomialError::DivisionByZero => "POLY_DIVISION_BY_ZERO",
            PolynomialError::NonFiniteCoefficient => "POLY_NON_FINITE_COEFFICIENT",
            PolynomialError::MismatchedLengths { .. } => "POLY_MISMATCHED_LENGTHS",
        }
    }
}

impl std::fmt::Display for PolynomialError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolynomialError::DegreeOverflow { degree } => write!(
                f,
                "[{}] Product has degree {degree}, at most 2 is supported",
                self.code()
            ),
            PolynomialError::DivisionByZero => {
                write!(f, "[{}] Polynomial divided by zero", self.code())
            }
            PolynomialError::NonFiniteCoefficient => write!(
                f,
                "[{}] Polynomial has a NaN or infinite coefficient",
                self.code()
            ),
            PolynomialError::MismatchedLengths {
                operands,
                coefficients,
            } => write!(
                f,
                "[{}] {operands} operands but {coefficients} coefficients",
                self.code()
            ),
        }
    }
}

impl std::error::Error for PolynomialError {}
