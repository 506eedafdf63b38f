//! Monomials: a coefficient times one operand or an operand pair.

use super::operand::{Operand, OperandDomain, OperandValues};
use crate::range::ValueRange;
use std::collections::BTreeMap;

/// Merge key of a monomial. Quadratic pairs are stored with `a <= b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MonomialKey {
    Linear(Operand),
    Quadratic(Operand, Operand),
}

impl MonomialKey {
    /// Canonical quadratic key.
    pub fn quadratic(a: Operand, b: Operand) -> Self {
        if a <= b {
            MonomialKey::Quadratic(a, b)
        } else {
            MonomialKey::Quadratic(b, a)
        }
    }

    pub fn degree(self) -> usize {
        match self {
            MonomialKey::Linear(_) => 1,
            MonomialKey::Quadratic(_, _) => 2,
        }
    }

    pub fn operands(self) -> (Operand, Option<Operand>) {
        match self {
            MonomialKey::Linear(a) => (a, None),
            MonomialKey::Quadratic(a, b) => (a, Some(b)),
        }
    }

    /// Key of the product, or `None` when it would exceed degree 2.
    pub fn product(self, other: MonomialKey) -> Option<MonomialKey> {
        match (self, other) {
            (MonomialKey::Linear(a), MonomialKey::Linear(b)) => Some(MonomialKey::quadratic(a, b)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Monomial {
    pub coefficient: f64,
    pub key: MonomialKey,
}

impl Monomial {
    pub fn linear(operand: impl Into<Operand>, coefficient: f64) -> Self {
        Self {
            coefficient,
            key: MonomialKey::Linear(operand.into()),
        }
    }

    pub fn quadratic(a: impl Into<Operand>, b: impl Into<Operand>, coefficient: f64) -> Self {
        Self {
            coefficient,
            key: MonomialKey::quadratic(a.into(), b.into()),
        }
    }

    pub fn scaled(self, by: f64) -> Self {
        Self {
            coefficient: self.coefficient * by,
            key: self.key,
        }
    }

    pub fn value<V: OperandValues + ?Sized>(&self, values: &V, zero_if_none: bool) -> Option<f64> {
        let lookup = |operand: Operand| {
            values
                .operand_value(operand)
                .or(if zero_if_none { Some(0.0) } else { None })
        };
        match self.key {
            MonomialKey::Linear(a) => Some(self.coefficient * lookup(a)?),
            MonomialKey::Quadratic(a, b) => Some(self.coefficient * lookup(a)? * lookup(b)?),
        }
    }

    pub fn range<D: OperandDomain + ?Sized>(&self, domain: &D) -> ValueRange<f64> {
        let base = match self.key {
            MonomialKey::Linear(a) => domain.operand_range(a),
            MonomialKey::Quadratic(a, b) if a == b => domain.operand_range(a).square(),
            MonomialKey::Quadratic(a, b) => domain
                .operand_range(a)
                .mul(&domain.operand_range(b)),
        };
        base.scale(self.coefficient)
    }

    pub fn discrete<D: OperandDomain + ?Sized>(&self, domain: &D) -> bool {
        if !is_integral(self.coefficient) {
            return false;
        }
        match self.key {
            MonomialKey::Linear(a) => domain.operand_is_integral(a),
            MonomialKey::Quadratic(a, b) => {
                domain.operand_is_integral(a) && domain.operand_is_integral(b)
            }
        }
    }
}

pub(crate) fn is_integral(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0
}

/// Sum one monomial into a merge table.
pub(crate) fn accumulate(table: &mut BTreeMap<MonomialKey, f64>, monomial: Monomial) {
    *table.entry(monomial.key).or_insert(0.0) += monomial.coefficient;
}

/// Canonical monomial list of a merge table, zeros dropped.
pub(crate) fn collect_nonzero(table: &BTreeMap<MonomialKey, f64>) -> Vec<Monomial> {
    table
        .iter()
        .filter(|(_, coefficient)| **coefficient != 0.0)
        .map(|(key, coefficient)| Monomial {
            coefficient: *coefficient,
            key: *key,
        })
        .collect()
}

/// Concatenate, then sum every monomial sharing a key.
pub(crate) fn merge_monomials(monomials: impl IntoIterator<Item = Monomial>) -> Vec<Monomial> {
    let mut table = BTreeMap::new();
    for monomial in monomials {
        accumulate(&mut table, monomial);
    }
    collect_nonzero(&table)
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::{Monomial, MonomialKey, merge_monomials};
    use crate::ids::{SymbolId, VariableId};
    use crate::poly::Operand;

    #[test]
    fn quadratic_key_is_order_independent() {
        let a = Operand::Variable(VariableId::new(2));
        let b = Operand::Symbol(SymbolId::new(0));
        assert_eq!(MonomialKey::quadratic(a, b), MonomialKey::quadratic(b, a));
    }

    #[test]
    fn product_of_quadratic_overflows() {
        let a = Operand::Variable(VariableId::new(0));
        let linear = MonomialKey::Linear(a);
        assert_eq!(linear.product(linear), Some(MonomialKey::Quadratic(a, a)));
        assert_eq!(MonomialKey::quadratic(a, a).product(linear), None);
    }

    #[test]
    fn merge_sums_equal_keys_and_drops_zeros() {
        let x = VariableId::new(1);
        let y = VariableId::new(2);
        let merged = merge_monomials(vec![
            Monomial::linear(y, 2.0),
            Monomial::linear(x, 1.0),
            Monomial::linear(y, -2.0),
            Monomial::linear(x, 0.5),
        ]);
        assert_eq!(merged, vec![Monomial::linear(x, 1.5)]);
    }
}
