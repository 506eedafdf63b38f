//! Tetra core: mechanism model, derived-function lowering and the
//! intermediate-model compiler.

pub mod intermediate;
pub mod model;
pub mod symbol;
pub mod token;
pub mod types;

pub use intermediate::{
    Column, CompileError, IntermediateModel, LinearTriadModel, ObjectiveRow,
    QuadraticTetradModel, Row,
};
pub use model::{
    ConstraintGroup, DEFAULT_TOLERANCE, IndexAllocator, MechanismModel, ModelError, ModelOptions,
    SolutionCheck, interpolate_1d, interpolate_2d,
};
pub use symbol::{
    CacheState, Function, Registration, Seed, SlackDirection, Symbol, SymbolKind, SymbolState,
};
pub use token::{Token, TokenList, TokenPolicy};
pub use types::{Constraint, Objective, Sense, SubObjective, Variable, VariableType};

pub use tetra_expr::{
    Cell, CellKey, Inequality, Operand, Polynomial, Sign, SymbolId, ValueRange, VariableId,
};
