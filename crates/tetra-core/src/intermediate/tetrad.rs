//! Intermediate model that may carry quadratic cells.

use super::compile::compile;
use super::error::CompileError;
use super::lp::write_lp;
use super::triad::LinearTriadModel;
use super::{Column, ObjectiveRow, Row};
use crate::model::MechanismModel;
use std::io;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuadraticTetradModel {
    pub name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
    pub objective: ObjectiveRow,
}

impl QuadraticTetradModel {
    /// Compile `model`, accepting linear and quadratic cells.
    pub fn compile(model: &MechanismModel) -> Result<Self, CompileError> {
        let compiled = compile(model, false)?;
        Ok(Self {
            name: compiled.name,
            columns: compiled.columns,
            rows: compiled.rows,
            objective: compiled.objective,
        })
    }

    pub fn is_quadratic(&self) -> bool {
        !self.objective.is_linear() || self.rows.iter().any(|row| !row.is_linear())
    }

    /// Linear view of the model; fails on the first quadratic row.
    pub fn to_linear(self) -> Result<LinearTriadModel, CompileError> {
        if let Some(row) = self.rows.iter().find(|row| !row.is_linear()) {
            return Err(CompileError::QuadraticCell {
                row: row.name.clone(),
            });
        }
        if !self.objective.is_linear() {
            return Err(CompileError::QuadraticCell {
                row: "objective".to_string(),
            });
        }
        Ok(LinearTriadModel {
            name: self.name,
            columns: self.columns,
            rows: self.rows,
            objective: self.objective,
        })
    }

    pub fn objective_value(&self, solution: &[f64]) -> f64 {
        self.objective.value(solution)
    }

    /// CPLEX-LP text; quadratic terms use the bracketed `[ ... ]` syntax.
    pub fn export_lp<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        write_lp(writer, &self.name, &self.columns, &self.rows, &self.objective)
    }
}
