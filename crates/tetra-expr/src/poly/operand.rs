//! Operands of a monomial and the lookups used to evaluate them.

use crate::ids::{SymbolId, VariableId};
use crate::range::ValueRange;

/// A variable or a symbol referenced by a monomial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operand {
    Variable(VariableId),
    Symbol(SymbolId),
}

impl Operand {
    pub fn as_variable(self) -> Option<VariableId> {
        match self {
            Operand::Variable(id) => Some(id),
            Operand::Symbol(_) => None,
        }
    }

    pub fn as_symbol(self) -> Option<SymbolId> {
        match self {
            Operand::Symbol(id) => Some(id),
            Operand::Variable(_) => None,
        }
    }
}

impl From<VariableId> for Operand {
    fn from(id: VariableId) -> Self {
        Operand::Variable(id)
    }
}

impl From<SymbolId> for Operand {
    fn from(id: SymbolId) -> Self {
        Operand::Symbol(id)
    }
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Variable(id) => write!(f, "x{}", id.inner()),
            Operand::Symbol(id) => write!(f, "s{}", id.inner()),
        }
    }
}

/// Bounds and integrality of operands as known to the owning model.
pub trait OperandDomain {
    fn operand_range(&self, operand: Operand) -> ValueRange<f64>;

    fn operand_is_integral(&self, operand: Operand) -> bool;
}

/// Realized operand values, e.g. a solution.
pub trait OperandValues {
    fn operand_value(&self, operand: Operand) -> Option<f64>;
}

impl<F> OperandValues for F
where
    F: Fn(Operand) -> Option<f64>,
{
    fn operand_value(&self, operand: Operand) -> Option<f64> {
        self(operand)
    }
}
