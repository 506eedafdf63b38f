//! Comparison of a polynomial against a constant right-hand side.

use super::operand::OperandValues;
use super::polynomial::Polynomial;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Sign {
    LessEqual,
    Equal,
    GreaterEqual,
}

impl Sign {
    pub fn as_str(self) -> &'static str {
        match self {
            Sign::LessEqual => "<=",
            Sign::Equal => "=",
            Sign::GreaterEqual => ">=",
        }
    }

    /// Sign after swapping both sides.
    pub fn reverse(self) -> Sign {
        match self {
            Sign::LessEqual => Sign::GreaterEqual,
            Sign::Equal => Sign::Equal,
            Sign::GreaterEqual => Sign::LessEqual,
        }
    }

    /// Whether `lhs sign rhs` holds up to `tolerance`.
    pub fn holds(self, lhs: f64, rhs: f64, tolerance: f64) -> bool {
        match self {
            Sign::LessEqual => lhs <= rhs + tolerance,
            Sign::Equal => (lhs - rhs).abs() <= tolerance,
            Sign::GreaterEqual => lhs >= rhs - tolerance,
        }
    }
}

impl std::fmt::Display for Sign {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `lhs sign rhs` where `lhs` carries no constant.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Inequality {
    lhs: Polynomial,
    sign: Sign,
    rhs: f64,
}

impl Inequality {
    /// Moves the constant of `lhs` to the right-hand side.
    pub fn new(lhs: Polynomial, sign: Sign, rhs: f64) -> Self {
        let constant = lhs.constant();
        Self {
            lhs: lhs.without_constant(),
            sign,
            rhs: rhs - constant,
        }
    }

    pub fn lhs(&self) -> &Polynomial {
        &self.lhs
    }

    pub fn sign(&self) -> Sign {
        self.sign
    }

    pub fn rhs(&self) -> f64 {
        self.rhs
    }

    pub fn into_parts(self) -> (Polynomial, Sign, f64) {
        (self.lhs, self.sign, self.rhs)
    }

    /// `lhs - rhs`, compared against zero with the same sign.
    pub fn residual(&self) -> Polynomial {
        self.lhs.add_constant(-self.rhs)
    }

    /// `None` when an operand has no value.
    pub fn is_satisfied<V: OperandValues + ?Sized>(
        &self,
        values: &V,
        tolerance: f64,
    ) -> Option<bool> {
        let lhs = self.lhs.value(values, false)?;
        Some(self.sign.holds(lhs, self.rhs, tolerance))
    }
}

impl std::fmt::Display for Inequality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.sign, self.rhs)
    }
}
