//! Linear intermediate model and its LP transforms.

use super::compile::compile;
use super::error::CompileError;
use super::lp::write_lp;
use super::{Column, ObjectiveRow, Row};
use crate::model::MechanismModel;
use crate::types::{Sense, VariableType};
use std::io;
use tetra_expr::{Cell, CellKey, Sign};

/// Columns, rows and objective of a model whose cells are all linear.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinearTriadModel {
    pub name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
    pub objective: ObjectiveRow,
}

impl LinearTriadModel {
    /// Compile `model`; fails with `QuadraticCell` on any quadratic cell.
    pub fn compile(model: &MechanismModel) -> Result<Self, CompileError> {
        let compiled = compile(model, true)?;
        Ok(Self {
            name: compiled.name,
            columns: compiled.columns,
            rows: compiled.rows,
            objective: compiled.objective,
        })
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of non-zero row cells.
    pub fn num_nonzeros(&self) -> usize {
        self.rows.iter().map(|row| row.cells.len()).sum()
    }

    // ── Column kinds ────────────────────────────────────────

    pub fn contains_binary(&self) -> bool {
        self.columns
            .iter()
            .any(|column| column.kind == VariableType::Binary)
    }

    pub fn contains_integer(&self) -> bool {
        self.columns.iter().any(Column::is_integral)
    }

    /// True when some integral column is not binary.
    pub fn contains_not_binary_integer(&self) -> bool {
        self.columns
            .iter()
            .any(|column| column.is_integral() && column.kind != VariableType::Binary)
    }

    // ── Transforms ──────────────────────────────────────────

    /// Same model with every integral column made continuous.
    pub fn linear_relax(&self) -> Self {
        let mut relaxed = self.clone();
        for column in &mut relaxed.columns {
            column.kind = column.kind.relaxed();
        }
        relaxed
    }

    /// Move finite non-zero column bounds into rows.
    ///
    /// A lower bound becomes row `<column>_lb` (`>=`) and the column lower
    /// bound becomes `-inf`; an upper bound becomes `<column>_ub` (`<=`) and
    /// the column upper bound becomes `+inf`. Zero bounds stay on the column.
    pub fn normalize(&self) -> Self {
        let mut normalized = self.clone();
        for (index, column) in normalized.columns.iter_mut().enumerate() {
            if column.lower.is_finite() && column.lower != 0.0 {
                normalized.rows.push(Row {
                    name: format!("{}_lb", column.name),
                    cells: vec![Cell::linear(index, 1.0)],
                    sign: Sign::GreaterEqual,
                    rhs: column.lower,
                });
                column.lower = f64::NEG_INFINITY;
            }
            if column.upper.is_finite() && column.upper != 0.0 {
                normalized.rows.push(Row {
                    name: format!("{}_ub", column.name),
                    cells: vec![Cell::linear(index, 1.0)],
                    sign: Sign::LessEqual,
                    rhs: column.upper,
                });
                column.upper = f64::INFINITY;
            }
        }
        normalized
    }

    /// LP dual of the continuous relaxation.
    ///
    /// The model is normalized first. Each row becomes a dual column named
    /// `<row>_dual` whose sign follows the row sign and the objective sense;
    /// each primal column becomes a row with the objective coefficient as
    /// right-hand side. A column fixed at zero imposes no dual row.
    pub fn dual(&self) -> Self {
        let primal = self.normalize();
        let minimize = primal.objective.sense == Sense::Minimize;

        let columns = primal
            .rows
            .iter()
            .map(|row| {
                // min: >= rows price non-negative, <= rows non-positive; max flips.
                let (lower, upper) = match (row.sign, minimize) {
                    (Sign::Equal, _) => (f64::NEG_INFINITY, f64::INFINITY),
                    (Sign::GreaterEqual, true) | (Sign::LessEqual, false) => (0.0, f64::INFINITY),
                    (Sign::LessEqual, true) | (Sign::GreaterEqual, false) => {
                        (f64::NEG_INFINITY, 0.0)
                    }
                };
                Column {
                    name: format!("{}_dual", row.name),
                    kind: VariableType::Continuous,
                    lower,
                    upper,
                    initial: None,
                }
            })
            .collect();

        let mut transposed: Vec<Vec<Cell>> = vec![Vec::new(); primal.columns.len()];
        for (row_index, row) in primal.rows.iter().enumerate() {
            for cell in &row.cells {
                if let CellKey::Linear(column) = cell.key {
                    transposed[column].push(Cell::linear(row_index, cell.coefficient));
                }
            }
        }
        let mut costs = vec![0.0; primal.columns.len()];
        for cell in &primal.objective.cells {
            if let CellKey::Linear(column) = cell.key {
                costs[column] += cell.coefficient;
            }
        }

        let mut rows = Vec::with_capacity(primal.columns.len());
        for ((column, cells), cost) in primal.columns.iter().zip(transposed).zip(costs) {
            let non_negative = column.lower == 0.0;
            let non_positive = column.upper == 0.0;
            let sign = match (non_negative, non_positive, minimize) {
                (true, true, _) => continue,
                (false, false, _) => Sign::Equal,
                (true, false, true) | (false, true, false) => Sign::LessEqual,
                (false, true, true) | (true, false, false) => Sign::GreaterEqual,
            };
            rows.push(Row {
                name: column.name.clone(),
                cells,
                sign,
                rhs: cost,
            });
        }

        let objective = ObjectiveRow {
            sense: primal.objective.sense.reverse(),
            cells: primal
                .rows
                .iter()
                .enumerate()
                .filter(|(_, row)| row.rhs != 0.0)
                .map(|(index, row)| Cell::linear(index, row.rhs))
                .collect(),
            constant: primal.objective.constant,
        };

        tracing::debug!(
            component = "intermediate",
            operation = "dual",
            status = "success",
            columns = primal.rows.len(),
            rows = rows.len(),
            "Built dual model"
        );

        Self {
            name: format!("{}-dual", primal.name),
            columns,
            rows,
            objective,
        }
    }

    // ── Evaluation and export ───────────────────────────────

    pub fn objective_value(&self, solution: &[f64]) -> f64 {
        self.objective.value(solution)
    }

    /// Names of rows `solution` breaks.
    pub fn violated_rows(&self, solution: &[f64], tolerance: f64) -> Vec<&str> {
        self.rows
            .iter()
            .filter(|row| !row.is_satisfied(solution, tolerance))
            .map(|row| row.name.as_str())
            .collect()
    }

    pub fn export_lp<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        write_lp(writer, &self.name, &self.columns, &self.rows, &self.objective)
    }
}
