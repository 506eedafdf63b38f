//! Accessors, range checks and the operand domain of the model.

use crate::symbol::{Symbol, SymbolState};
use crate::token::TokenList;
use crate::types::{Constraint, Objective, Variable};
use tetra_expr::{Operand, OperandDomain, SymbolId, ValueRange, VariableId};

use super::error::ModelError;
use super::{IndexAllocator, MechanismModel};

impl MechanismModel {
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_symbols(&self) -> usize {
        self.symbols.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn variable(&self, id: VariableId) -> Result<&Variable, ModelError> {
        self.variables
            .get(id.index())
            .ok_or(ModelError::InvalidVariableId(id))
    }

    /// Mutable access, e.g. to tighten the range through `ValueRange` sugar.
    pub fn variable_mut(&mut self, id: VariableId) -> Result<&mut Variable, ModelError> {
        self.variables
            .get_mut(id.index())
            .ok_or(ModelError::InvalidVariableId(id))
    }

    pub fn variable_by_name(&self, name: &str) -> Option<VariableId> {
        self.variable_names.get(name).copied()
    }

    pub fn variables(&self) -> impl Iterator<Item = (VariableId, &Variable)> {
        self.variables
            .iter()
            .enumerate()
            .map(|(index, variable)| (VariableId::new(index as u32), variable))
    }

    pub fn symbol(&self, id: SymbolId) -> Result<&Symbol, ModelError> {
        self.symbols
            .get(id.index())
            .map(|entry| &entry.symbol)
            .ok_or(ModelError::InvalidSymbolId(id))
    }

    pub fn symbol_by_name(&self, name: &str) -> Option<SymbolId> {
        self.symbol_names.get(name).copied()
    }

    pub fn symbol_state(&self, id: SymbolId) -> Result<&SymbolState, ModelError> {
        self.symbols
            .get(id.index())
            .map(|entry| &entry.state)
            .ok_or(ModelError::InvalidSymbolId(id))
    }

    /// Propagated range of a registered symbol; full while unregistered.
    pub fn symbol_range(&self, id: SymbolId) -> Result<ValueRange<f64>, ModelError> {
        Ok(self
            .symbol_state(id)?
            .registration()
            .map_or_else(ValueRange::full, |registration| registration.range))
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn tokens(&self) -> &TokenList {
        &self.tokens
    }

    pub fn indexes(&self) -> &IndexAllocator {
        &self.indexes
    }

    pub fn indexes_mut(&mut self) -> &mut IndexAllocator {
        &mut self.indexes
    }

    /// Fail on the first active variable whose range is empty.
    pub fn check_ranges(&self) -> Result<(), ModelError> {
        for token in self.tokens.tokens() {
            let variable = self.variable(token.variable())?;
            if variable.range().is_empty() {
                tracing::debug!(
                    component = "model",
                    operation = "check_ranges",
                    status = "error",
                    variable = variable.name(),
                    "Variable range is empty"
                );
                return Err(ModelError::EmptyRange {
                    variable: variable.name().to_string(),
                });
            }
        }
        Ok(())
    }
}

impl OperandDomain for MechanismModel {
    fn operand_range(&self, operand: Operand) -> ValueRange<f64> {
        match operand {
            Operand::Variable(id) => self
                .variables
                .get(id.index())
                .map_or_else(ValueRange::full, |variable| *variable.range()),
            Operand::Symbol(id) => self
                .symbol_range(id)
                .unwrap_or_else(|_| ValueRange::full()),
        }
    }

    fn operand_is_integral(&self, operand: Operand) -> bool {
        match operand {
            Operand::Variable(id) => self
                .variables
                .get(id.index())
                .is_some_and(|variable| variable.kind().is_integral()),
            Operand::Symbol(id) => self
                .symbols
                .get(id.index())
                .and_then(|entry| entry.state.registration())
                .is_some_and(|registration| registration.discrete),
        }
    }
}
