//! Compilation of a mechanism model into column-resolved rows.
//!
//! Symbol operands are replaced by the cells of their value expression,
//! recursively, until only variable cells remain. Each symbol is flattened
//! once per compile.

use super::error::CompileError;
use super::{Column, ObjectiveRow, Row};
use crate::model::{MechanismModel, ModelError};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;
use tetra_expr::{
    Cell, MonomialKey, Operand, Polynomial, SymbolId, VariableId, merge_cells, split_constant,
};

/// Everything both intermediate model shapes are made of.
pub(crate) struct Compiled {
    pub(crate) name: String,
    pub(crate) columns: Vec<Column>,
    pub(crate) rows: Vec<Row>,
    pub(crate) objective: ObjectiveRow,
}

struct Compiler<'a> {
    model: &'a MechanismModel,
    columns: HashMap<VariableId, usize>,
    symbols: HashMap<SymbolId, Rc<[Cell]>>,
}

impl<'a> Compiler<'a> {
    fn new(model: &'a MechanismModel) -> Self {
        Self {
            model,
            columns: model.tokens().column_map(),
            symbols: HashMap::new(),
        }
    }

    fn operand_cells(&mut self, operand: Operand) -> Result<Rc<[Cell]>, CompileError> {
        match operand {
            Operand::Variable(id) => {
                let column = self
                    .columns
                    .get(&id)
                    .copied()
                    .ok_or(ModelError::UnregisteredVariable(id))?;
                Ok(Rc::from(vec![Cell::linear(column, 1.0)]))
            }
            Operand::Symbol(id) => {
                if let Some(cells) = self.symbols.get(&id) {
                    return Ok(Rc::clone(cells));
                }
                let model = self.model;
                let symbol = model.symbol(id)?;
                let registration = model
                    .symbol_state(id)?
                    .registration()
                    .ok_or(ModelError::InvalidSymbolId(id))?;
                let cells: Rc<[Cell]> =
                    Rc::from(self.flatten(&registration.expression, symbol.name())?);
                self.symbols.insert(id, Rc::clone(&cells));
                Ok(cells)
            }
        }
    }

    /// Merged cells of `polynomial`, constant included.
    fn flatten(
        &mut self,
        polynomial: &Polynomial,
        context: &str,
    ) -> Result<Vec<Cell>, CompileError> {
        let mut cells = vec![Cell::constant(polynomial.constant())];
        for monomial in polynomial.monomials() {
            match monomial.key {
                MonomialKey::Linear(operand) => {
                    let inner = self.operand_cells(operand)?;
                    cells.extend(inner.iter().map(|cell| cell.scaled(monomial.coefficient)));
                }
                MonomialKey::Quadratic(a, b) => {
                    let left = self.operand_cells(a)?;
                    let right = self.operand_cells(b)?;
                    for l in left.iter() {
                        for r in right.iter() {
                            let product =
                                l.product(r).ok_or_else(|| CompileError::DegreeOverflow {
                                    context: context.to_string(),
                                })?;
                            cells.push(product.scaled(monomial.coefficient));
                        }
                    }
                }
            }
        }
        Ok(merge_cells(cells))
    }
}

fn reject_quadratic(cells: &[Cell], row: &str) -> Result<(), CompileError> {
    if cells.iter().any(|cell| cell.key.degree() > 1) {
        return Err(CompileError::QuadraticCell {
            row: row.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn compile(model: &MechanismModel, linear_only: bool) -> Result<Compiled, CompileError> {
    let started = Instant::now();
    model.check_ranges()?;
    if model.tokens().is_empty() {
        return Err(CompileError::EmptyModel);
    }
    let (sense, objective) = model.objective().combined().ok_or(CompileError::NoObjective)?;

    let mut columns = Vec::with_capacity(model.tokens().len());
    for token in model.tokens().tokens() {
        let variable = model.variable(token.variable())?;
        tracing::trace!(
            component = "compile",
            operation = "add_column",
            status = "success",
            column = columns.len(),
            variable = variable.name(),
            "Resolved column"
        );
        columns.push(Column {
            name: variable.name().to_string(),
            kind: variable.kind(),
            lower: variable.lower(),
            upper: variable.upper(),
            initial: token.result(),
        });
    }

    let mut compiler = Compiler::new(model);
    let mut rows = Vec::with_capacity(model.num_constraints());
    for constraint in model.constraints() {
        let merged = compiler.flatten(&constraint.lhs, &constraint.name)?;
        let (cells, constant) = split_constant(&merged);
        if linear_only {
            reject_quadratic(&cells, &constraint.name)?;
        }
        rows.push(Row {
            name: constraint.name.clone(),
            cells,
            sign: constraint.sign,
            rhs: constraint.rhs - constant,
        });
    }

    let merged = compiler.flatten(&objective, "objective")?;
    let (cells, constant) = split_constant(&merged);
    if linear_only {
        reject_quadratic(&cells, "objective")?;
    }

    tracing::debug!(
        component = "compile",
        operation = "compile",
        status = "success",
        model = model.name(),
        linear_only,
        columns = columns.len(),
        rows = rows.len(),
        symbols = compiler.symbols.len(),
        duration_ms = started.elapsed().as_secs_f64() * 1000.0,
        "Compiled intermediate model"
    );

    Ok(Compiled {
        name: model.name().to_string(),
        columns,
        rows,
        objective: ObjectiveRow {
            sense,
            cells,
            constant,
        },
    })
}
