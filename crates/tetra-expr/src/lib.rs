pub mod ids;
pub mod poly;
pub mod range;

pub use ids::{ConstraintId, SymbolId, VariableId};
pub use poly::{
    Category, Cell, CellKey, Inequality, Monomial, MonomialKey, MutablePolynomial, Operand,
    OperandDomain, OperandValues, Polynomial, PolynomialError, Sign, merge_cells, split_constant,
    sum, weighted_sum,
};
pub use range::{Bound, Interval, RangeError, ValueRange};
