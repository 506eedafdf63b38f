//! Builder functions for sums of operands.

use super::error::PolynomialError;
use super::operand::Operand;
use super::polynomial::Polynomial;

/// Sum any mix of polynomials, variables, symbols and constants.
pub fn sum<T: Into<Polynomial>>(items: impl IntoIterator<Item = T>) -> Polynomial {
    items.into_iter().map(Into::into).sum()
}

/// `Σ coefficients[i] * operands[i]`; lengths must match.
pub fn weighted_sum<O: Into<Operand>>(
    operands: Vec<O>,
    coefficients: Vec<f64>,
) -> Result<Polynomial, PolynomialError> {
    if operands.len() != coefficients.len() {
        return Err(PolynomialError::MismatchedLengths {
            operands: operands.len(),
            coefficients: coefficients.len(),
        });
    }
    Ok(operands
        .into_iter()
        .zip(coefficients)
        .map(|(operand, coefficient)| Polynomial::term(operand, coefficient))
        .sum())
}
