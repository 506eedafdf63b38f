//! In-place polynomial accumulation.
//!
//! `MutablePolynomial` keeps a keyed table so repeated `+=` stays cheap when
//! building long sums; it merges exactly like [`Polynomial::from_monomials`].

use super::error::PolynomialError;
use super::monomial::{Monomial, MonomialKey, accumulate, collect_nonzero};
use super::operand::Operand;
use super::polynomial::Polynomial;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct MutablePolynomial {
    terms: BTreeMap<MonomialKey, f64>,
    constant: f64,
}

impl MutablePolynomial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// Number of stored keys, including ones that summed to zero.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty() && self.constant == 0.0
    }

    pub fn add_term(&mut self, operand: impl Into<Operand>, coefficient: f64) {
        accumulate(&mut self.terms, Monomial::linear(operand, coefficient));
    }

    pub fn add_quadratic_term(
        &mut self,
        a: impl Into<Operand>,
        b: impl Into<Operand>,
        coefficient: f64,
    ) {
        accumulate(&mut self.terms, Monomial::quadratic(a, b, coefficient));
    }

    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    pub fn add_polynomial(&mut self, polynomial: &Polynomial) {
        for monomial in polynomial.monomials() {
            accumulate(&mut self.terms, *monomial);
        }
        self.constant += polynomial.constant();
    }

    pub fn sub_polynomial(&mut self, polynomial: &Polynomial) {
        for monomial in polynomial.monomials() {
            accumulate(&mut self.terms, monomial.scaled(-1.0));
        }
        self.constant -= polynomial.constant();
    }

    pub fn scale(&mut self, by: f64) {
        for coefficient in self.terms.values_mut() {
            *coefficient *= by;
        }
        self.constant *= by;
    }

    pub fn checked_div(&mut self, divisor: f64) -> Result<(), PolynomialError> {
        if divisor == 0.0 {
            return Err(PolynomialError::DivisionByZero);
        }
        self.scale(1.0 / divisor);
        Ok(())
    }

    pub fn to_polynomial(&self) -> Polynomial {
        Polynomial::from_canonical(collect_nonzero(&self.terms), self.constant)
    }

    pub fn into_polynomial(self) -> Polynomial {
        self.to_polynomial()
    }
}

impl From<Polynomial> for MutablePolynomial {
    fn from(polynomial: Polynomial) -> Self {
        let mut accumulator = MutablePolynomial::new();
        accumulator.add_polynomial(&polynomial);
        accumulator
    }
}

impl From<MutablePolynomial> for Polynomial {
    fn from(accumulator: MutablePolynomial) -> Self {
        accumulator.into_polynomial()
    }
}

impl<T: Into<Polynomial>> std::ops::AddAssign<T> for MutablePolynomial {
    fn add_assign(&mut self, rhs: T) {
        self.add_polynomial(&rhs.into());
    }
}

impl<T: Into<Polynomial>> std::ops::SubAssign<T> for MutablePolynomial {
    fn sub_assign(&mut self, rhs: T) {
        self.sub_polynomial(&rhs.into());
    }
}

impl std::ops::MulAssign<f64> for MutablePolynomial {
    fn mul_assign(&mut self, rhs: f64) {
        self.scale(rhs);
    }
}

impl std::ops::DivAssign<f64> for MutablePolynomial {
    fn div_assign(&mut self, rhs: f64) {
        self.scale(1.0 / rhs);
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::MutablePolynomial;
    use crate::ids::{SymbolId, VariableId};
    use crate::poly::{Polynomial, PolynomialError};

    #[test]
    fn in_place_matches_pure_arithmetic() {
        let x = VariableId::new(0);
        let s = SymbolId::new(1);

        let mut accumulator = MutablePolynomial::new();
        accumulator += x * 2.0;
        accumulator += s;
        accumulator -= x + 4.0;
        accumulator *= 3.0;

        let pure = ((x * 2.0 + s) - (x + 4.0)) * 3.0;
        assert_eq!(accumulator.into_polynomial(), pure);
    }

    #[test]
    fn cancelled_terms_are_dropped_on_conversion() {
        let x = VariableId::new(0);
        let mut accumulator = MutablePolynomial::from(Polynomial::from(x));
        accumulator.add_term(x, -1.0);
        assert_eq!(accumulator.len(), 1);
        assert!(accumulator.to_polynomial().is_constant());
    }

    #[test]
    fn division_checks_zero() {
        let mut accumulator = MutablePolynomial::new();
        accumulator.add_constant(2.0);
        assert_eq!(
            accumulator.checked_div(0.0),
            Err(PolynomialError::DivisionByZero)
        );
        accumulator /= 4.0;
        assert_eq!(accumulator.constant(), 0.5);
    }
}
