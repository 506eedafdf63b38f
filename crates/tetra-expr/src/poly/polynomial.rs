//! Immutable polynomial: monomials in canonical order plus a constant.
//!
//! Monomials are kept merged and sorted by key, so two structurally equal
//! polynomials compare equal. Degree is capped at 2; products that would
//! exceed it fail with [`PolynomialError::DegreeOverflow`].

use super::error::PolynomialError;
use super::inequality::{Inequality, Sign};
use super::monomial::{Monomial, MonomialKey, is_integral, merge_monomials};
use super::operand::{Operand, OperandDomain, OperandValues};
use crate::ids::{SymbolId, VariableId};
use crate::range::ValueRange;
use std::collections::BTreeSet;

/// Highest degree class of a polynomial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Category {
    Linear,
    Quadratic,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Polynomial {
    monomials: Vec<Monomial>,
    constant: f64,
}

impl Polynomial {
    // ── Constructors ────────────────────────────────────────

    pub fn new_empty() -> Self {
        Self::default()
    }

    pub fn from_constant(constant: f64) -> Self {
        Self {
            monomials: Vec::new(),
            constant,
        }
    }

    /// Single linear term: coefficient * operand.
    pub fn term(operand: impl Into<Operand>, coefficient: f64) -> Self {
        if coefficient == 0.0 {
            return Self::default();
        }
        Self {
            monomials: vec![Monomial::linear(operand, coefficient)],
            constant: 0.0,
        }
    }

    /// Single quadratic term: coefficient * a * b.
    pub fn quadratic_term(a: impl Into<Operand>, b: impl Into<Operand>, coefficient: f64) -> Self {
        if coefficient == 0.0 {
            return Self::default();
        }
        Self {
            monomials: vec![Monomial::quadratic(a, b, coefficient)],
            constant: 0.0,
        }
    }

    /// Merges duplicate keys; input order does not matter.
    pub fn from_monomials(monomials: impl IntoIterator<Item = Monomial>, constant: f64) -> Self {
        Self {
            monomials: merge_monomials(monomials),
            constant,
        }
    }

    /// Caller guarantees `monomials` is already merged and sorted.
    pub(crate) fn from_canonical(monomials: Vec<Monomial>, constant: f64) -> Self {
        Self {
            monomials,
            constant,
        }
    }

    // ── Accessors ───────────────────────────────────────────

    pub fn monomials(&self) -> &[Monomial] {
        &self.monomials
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    pub fn into_parts(self) -> (Vec<Monomial>, f64) {
        (self.monomials, self.constant)
    }

    /// Max degree of any monomial (0 = constant only).
    pub fn degree(&self) -> usize {
        self.monomials
            .iter()
            .map(|monomial| monomial.key.degree())
            .max()
            .unwrap_or(0)
    }

    pub fn category(&self) -> Category {
        if self.degree() > 1 {
            Category::Quadratic
        } else {
            Category::Linear
        }
    }

    pub fn is_constant(&self) -> bool {
        self.monomials.is_empty()
    }

    pub fn coefficient_of(&self, key: MonomialKey) -> f64 {
        self.monomials
            .binary_search_by(|monomial| monomial.key.cmp(&key))
            .map_or(0.0, |position| self.monomials[position].coefficient)
    }

    /// Every operand referenced, in canonical order.
    pub fn operands(&self) -> BTreeSet<Operand> {
        let mut operands = BTreeSet::new();
        for monomial in &self.monomials {
            let (a, b) = monomial.key.operands();
            operands.insert(a);
            if let Some(b) = b {
                operands.insert(b);
            }
        }
        operands
    }

    pub fn symbols(&self) -> BTreeSet<SymbolId> {
        self.operands()
            .into_iter()
            .filter_map(Operand::as_symbol)
            .collect()
    }

    pub fn variables(&self) -> BTreeSet<VariableId> {
        self.operands()
            .into_iter()
            .filter_map(Operand::as_variable)
            .collect()
    }

    pub fn is_finite(&self) -> bool {
        self.constant.is_finite()
            && self
                .monomials
                .iter()
                .all(|monomial| monomial.coefficient.is_finite())
    }

    pub fn validate(&self) -> Result<(), PolynomialError> {
        if self.is_finite() {
            Ok(())
        } else {
            Err(PolynomialError::NonFiniteCoefficient)
        }
    }

    // ── Arithmetic ──────────────────────────────────────────

    pub fn add(&self, other: &Polynomial) -> Self {
        Self::from_monomials(
            self.monomials.iter().chain(other.monomials.iter()).copied(),
            self.constant + other.constant,
        )
    }

    pub fn sub(&self, other: &Polynomial) -> Self {
        self.add(&other.neg())
    }

    pub fn neg(&self) -> Self {
        self.scale(-1.0)
    }

    /// Scale every coefficient and the constant.
    pub fn scale(&self, by: f64) -> Self {
        Self {
            monomials: self
                .monomials
                .iter()
                .map(|monomial| monomial.scaled(by))
                .filter(|monomial| monomial.coefficient != 0.0)
                .collect(),
            constant: self.constant * by,
        }
    }

    pub fn add_constant(&self, value: f64) -> Self {
        Self {
            monomials: self.monomials.clone(),
            constant: self.constant + value,
        }
    }

    pub fn without_constant(&self) -> Self {
        Self {
            monomials: self.monomials.clone(),
            constant: 0.0,
        }
    }

    pub fn checked_div(&self, divisor: f64) -> Result<Self, PolynomialError> {
        if divisor == 0.0 {
            return Err(PolynomialError::DivisionByZero);
        }
        Ok(self.scale(1.0 / divisor))
    }

    /// Pairwise product, valid while the result stays within degree 2.
    pub fn try_mul(&self, other: &Polynomial) -> Result<Self, PolynomialError> {
        let degree = self.degree() + other.degree();
        if degree > 2 {
            return Err(PolynomialError::DegreeOverflow { degree });
        }
        let mut monomials = Vec::with_capacity(
            self.monomials.len() * other.monomials.len()
                + self.monomials.len()
                + other.monomials.len(),
        );
        for theirs in &other.monomials {
            monomials.push(theirs.scaled(self.constant));
        }
        for ours in &self.monomials {
            monomials.push(ours.scaled(other.constant));
            for theirs in &other.monomials {
                let key = ours
                    .key
                    .product(theirs.key)
                    .ok_or(PolynomialError::DegreeOverflow { degree })?;
                monomials.push(Monomial {
                    coefficient: ours.coefficient * theirs.coefficient,
                    key,
                });
            }
        }
        Ok(Self::from_monomials(
            monomials,
            self.constant * other.constant,
        ))
    }

    // ── Evaluation ──────────────────────────────────────────

    /// Evaluate against `values`; `None` if an operand has no value and
    /// `zero_if_none` is false.
    pub fn value<V: OperandValues + ?Sized>(&self, values: &V, zero_if_none: bool) -> Option<f64> {
        let mut total = self.constant;
        for monomial in &self.monomials {
            total += monomial.value(values, zero_if_none)?;
        }
        Some(total)
    }

    /// Propagated bounds given operand ranges.
    pub fn range<D: OperandDomain + ?Sized>(&self, domain: &D) -> ValueRange<f64> {
        self.monomials
            .iter()
            .fold(ValueRange::point(self.constant), |acc, monomial| {
                acc.add(&monomial.range(domain))
            })
    }

    /// Integral coefficients, integral constant and integral operands.
    pub fn discrete<D: OperandDomain + ?Sized>(&self, domain: &D) -> bool {
        is_integral(self.constant)
            && self
                .monomials
                .iter()
                .all(|monomial| monomial.discrete(domain))
    }

    // ── Comparisons (produce Inequality) ────────────────────

    pub fn compare_scalar(&self, rhs: f64, sign: Sign) -> Inequality {
        Inequality::new(self.clone(), sign, rhs)
    }

    pub fn compare_expr(&self, other: &Polynomial, sign: Sign) -> Inequality {
        Inequality::new(self.sub(other), sign, 0.0)
    }

    pub fn le_scalar(&self, rhs: f64) -> Inequality {
        self.compare_scalar(rhs, Sign::LessEqual)
    }

    pub fn ge_scalar(&self, rhs: f64) -> Inequality {
        self.compare_scalar(rhs, Sign::GreaterEqual)
    }

    pub fn eq_scalar(&self, rhs: f64) -> Inequality {
        self.compare_scalar(rhs, Sign::Equal)
    }

    pub fn le_expr(&self, rhs: &Polynomial) -> Inequality {
        self.compare_expr(rhs, Sign::LessEqual)
    }

    pub fn ge_expr(&self, rhs: &Polynomial) -> Inequality {
        self.compare_expr(rhs, Sign::GreaterEqual)
    }

    pub fn eq_expr(&self, rhs: &Polynomial) -> Inequality {
        self.compare_expr(rhs, Sign::Equal)
    }
}

impl std::fmt::Display for Polynomial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for monomial in &self.monomials {
            let coefficient = monomial.coefficient;
            if first {
                if coefficient < 0.0 {
                    f.write_str("-")?;
                }
            } else if coefficient < 0.0 {
                f.write_str(" - ")?;
            } else {
                f.write_str(" + ")?;
            }
            if coefficient.abs() != 1.0 {
                write!(f, "{} ", coefficient.abs())?;
            }
            match monomial.key {
                MonomialKey::Linear(a) => write!(f, "{a}")?,
                MonomialKey::Quadratic(a, b) => write!(f, "{a} * {b}")?,
            }
            first = false;
        }
        if first {
            write!(f, "{}", self.constant)
        } else if self.constant > 0.0 {
            write!(f, " + {}", self.constant)
        } else if self.constant < 0.0 {
            write!(f, " - {}", -self.constant)
        } else {
            Ok(())
        }
    }
}

// ── Conversions ─────────────────────────────────────────────

impl From<f64> for Polynomial {
    fn from(constant: f64) -> Self {
        Polynomial::from_constant(constant)
    }
}

impl From<Operand> for Polynomial {
    fn from(operand: Operand) -> Self {
        Polynomial::term(operand, 1.0)
    }
}

impl From<Monomial> for Polynomial {
    fn from(monomial: Monomial) -> Self {
        Polynomial::from_monomials([monomial], 0.0)
    }
}

impl From<&Polynomial> for Polynomial {
    fn from(polynomial: &Polynomial) -> Self {
        polynomial.clone()
    }
}

// ── Operator overloads ──────────────────────────────────────

impl<T: Into<Polynomial>> std::ops::Add<T> for Polynomial {
    type Output = Polynomial;

    fn add(self, rhs: T) -> Self::Output {
        Polynomial::add(&self, &rhs.into())
    }
}

impl<T: Into<Polynomial>> std::ops::Sub<T> for Polynomial {
    type Output = Polynomial;

    fn sub(self, rhs: T) -> Self::Output {
        Polynomial::sub(&self, &rhs.into())
    }
}

impl std::ops::Mul<f64> for Polynomial {
    type Output = Polynomial;

    fn mul(self, rhs: f64) -> Self::Output {
        self.scale(rhs)
    }
}

impl std::ops::Mul<Polynomial> for f64 {
    type Output = Polynomial;

    fn mul(self, rhs: Polynomial) -> Self::Output {
        rhs.scale(self)
    }
}

/// Operator division does not fail: dividing by zero yields non-finite
/// coefficients, which the model rejects on insertion. Use
/// [`Polynomial::checked_div`] to fail early.
impl std::ops::Div<f64> for Polynomial {
    type Output = Polynomial;

    fn div(self, rhs: f64) -> Self::Output {
        self.scale(1.0 / rhs)
    }
}

impl std::ops::Neg for Polynomial {
    type Output = Polynomial;

    fn neg(self) -> Self::Output {
        self.scale(-1.0)
    }
}

impl std::iter::Sum for Polynomial {
    fn sum<I: Iterator<Item = Polynomial>>(iter: I) -> Self {
        let mut monomials = Vec::new();
        let mut constant = 0.0;
        for polynomial in iter {
            let (theirs, their_constant) = polynomial.into_parts();
            monomials.extend(theirs);
            constant += their_constant;
        }
        Polynomial::from_monomials(monomials, constant)
    }
}

macro_rules! operand_arithmetic {
    ($id:ty) => {
        impl From<$id> for Polynomial {
            fn from(id: $id) -> Self {
                Polynomial::term(id, 1.0)
            }
        }

        impl std::ops::Mul<f64> for $id {
            type Output = Polynomial;

            fn mul(self, rhs: f64) -> Self::Output {
                Polynomial::term(self, rhs)
            }
        }

        impl std::ops::Mul<$id> for f64 {
            type Output = Polynomial;

            fn mul(self, rhs: $id) -> Self::Output {
                Polynomial::term(rhs, self)
            }
        }

        impl<T: Into<Polynomial>> std::ops::Add<T> for $id {
            type Output = Polynomial;

            fn add(self, rhs: T) -> Self::Output {
                Polynomial::add(&Polynomial::from(self), &rhs.into())
            }
        }

        impl<T: Into<Polynomial>> std::ops::Sub<T> for $id {
            type Output = Polynomial;

            fn sub(self, rhs: T) -> Self::Output {
                Polynomial::sub(&Polynomial::from(self), &rhs.into())
            }
        }

        impl std::ops::Neg for $id {
            type Output = Polynomial;

            fn neg(self) -> Self::Output {
                Polynomial::term(self, -1.0)
            }
        }
    };
}

operand_arithmetic!(VariableId);
operand_arithmetic!(SymbolId);
