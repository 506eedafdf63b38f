//! Polynomial algebra over variables and symbols.
//!
//! - `operand`     : Operand plus the domain and value lookup traits
//! - `monomial`    : coefficient times one operand or an operand pair
//! - `polynomial`  : immutable Polynomial with canonical monomial order
//! - `accumulator` : MutablePolynomial, the in-place variant
//! - `cell`        : column-resolved cells and `merge_cells`
//! - `inequality`  : comparison sign and Inequality
//! - `error`       : algebra errors

pub mod accumulator;
pub mod builders;
pub mod cell;
pub mod error;
pub mod inequality;
pub mod monomial;
pub mod operand;
pub mod polynomial;

pub use accumulator::MutablePolynomial;
pub use builders::{sum, weighted_sum};
pub use cell::{Cell, CellKey, merge_cells, split_constant};
pub use error::PolynomialError;
pub use inequality::{Inequality, Sign};
pub use monomial::{Monomial, MonomialKey};
pub use operand::{Operand, OperandDomain, OperandValues};
pub use polynomial::{Category, Polynomial};
