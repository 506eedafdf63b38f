//! Intermediate models: immutable, column-resolved snapshots handed to solvers.
//!
//! # Module Organization
//!
//! - [`compile`]: Symbol substitution and column resolution
//! - [`triad`]: Linear models and their relax/normalize/dual transforms
//! - [`tetrad`]: Models that may carry quadratic cells
//! - [`lp`]: CPLEX-LP text export
//! - [`error`]: Compile error types

mod compile;
mod error;
mod lp;
mod tetrad;
mod triad;

use crate::types::{Sense, VariableType};
use tetra_expr::{Cell, CellKey, Sign};

pub use error::CompileError;
pub use tetrad::QuadraticTetradModel;
pub use triad::LinearTriadModel;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Column {
    pub name: String,
    pub kind: VariableType,
    pub lower: f64,
    pub upper: f64,
    /// Warm-start value taken from the token result.
    pub initial: Option<f64>,
}

impl Column {
    pub fn is_integral(&self) -> bool {
        self.kind.is_integral()
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Row {
    pub name: String,
    /// Merged cells without a constant.
    pub cells: Vec<Cell>,
    pub sign: Sign,
    pub rhs: f64,
}

impl Row {
    pub fn is_linear(&self) -> bool {
        self.cells.iter().all(|cell| cell.key.degree() < 2)
    }

    /// Left-hand side under `solution`.
    pub fn activity(&self, solution: &[f64]) -> f64 {
        cells_value(&self.cells, solution)
    }

    pub fn is_satisfied(&self, solution: &[f64], tolerance: f64) -> bool {
        self.sign.holds(self.activity(solution), self.rhs, tolerance)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectiveRow {
    pub sense: Sense,
    pub cells: Vec<Cell>,
    pub constant: f64,
}

impl ObjectiveRow {
    pub fn value(&self, solution: &[f64]) -> f64 {
        self.constant + cells_value(&self.cells, solution)
    }

    pub fn is_linear(&self) -> bool {
        self.cells.iter().all(|cell| cell.key.degree() < 2)
    }
}

fn cells_value(cells: &[Cell], solution: &[f64]) -> f64 {
    cells
        .iter()
        .map(|cell| {
            let product = match cell.key {
                CellKey::Constant => 1.0,
                CellKey::Linear(column) => solution[column],
                CellKey::Quadratic(a, b) => solution[a] * solution[b],
            };
            cell.coefficient * product
        })
        .sum()
}

/// A compiled model of either shape, as consumed by solver adapters.
#[derive(Debug, Clone, PartialEq)]
pub enum IntermediateModel {
    Linear(LinearTriadModel),
    Quadratic(QuadraticTetradModel),
}

impl IntermediateModel {
    pub fn name(&self) -> &str {
        match self {
            IntermediateModel::Linear(model) => &model.name,
            IntermediateModel::Quadratic(model) => &model.name,
        }
    }

    pub fn columns(&self) -> &[Column] {
        match self {
            IntermediateModel::Linear(model) => &model.columns,
            IntermediateModel::Quadratic(model) => &model.columns,
        }
    }

    pub fn rows(&self) -> &[Row] {
        match self {
            IntermediateModel::Linear(model) => &model.rows,
            IntermediateModel::Quadratic(model) => &model.rows,
        }
    }

    pub fn objective(&self) -> &ObjectiveRow {
        match self {
            IntermediateModel::Linear(model) => &model.objective,
            IntermediateModel::Quadratic(model) => &model.objective,
        }
    }

    /// True when any row or the objective holds a quadratic cell.
    pub fn is_quadratic(&self) -> bool {
        match self {
            IntermediateModel::Linear(_) => false,
            IntermediateModel::Quadratic(model) => model.is_quadratic(),
        }
    }

    /// True when some column is integral.
    pub fn is_mip(&self) -> bool {
        self.columns().iter().any(Column::is_integral)
    }
}

impl From<LinearTriadModel> for IntermediateModel {
    fn from(model: LinearTriadModel) -> Self {
        IntermediateModel::Linear(model)
    }
}

impl From<QuadraticTetradModel> for IntermediateModel {
    fn from(model: QuadraticTetradModel) -> Self {
        IntermediateModel::Quadratic(model)
    }
}
