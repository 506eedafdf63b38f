//! Builder methods for adding variables, symbols, constraints and objectives.

use crate::symbol::{CacheState, Symbol, SymbolState};
use crate::token::TokenPolicy;
use crate::types::{Constraint, Sense, SubObjective, Variable};
use std::time::Instant;
use tetra_expr::{Inequality, Operand, Polynomial, Sign, SymbolId, VariableId};

use super::error::ModelError;
use super::{MechanismModel, SymbolEntry};

impl MechanismModel {
    /// Add a variable and register its token.
    pub fn add_variable(&mut self, variable: Variable) -> Result<VariableId, ModelError> {
        if self.variable_names.contains_key(variable.name()) {
            return Err(ModelError::DuplicateVariable {
                name: variable.name().to_string(),
            });
        }
        let id = VariableId::new(self.variables.len() as u32);
        self.variable_names.insert(variable.name().to_string(), id);
        tracing::trace!(
            component = "model",
            operation = "add_variable",
            status = "success",
            variable = id.inner(),
            kind = variable.kind().as_str(),
            "Added variable"
        );
        self.variables.push(variable);
        self.tokens.add(id);
        Ok(id)
    }

    /// Add a symbol and register it.
    ///
    /// Adding a symbol equal to an existing one returns the existing id. A
    /// different symbol under a taken name fails with `DuplicateSymbol`. On
    /// failure the model is left as it was.
    pub fn add_symbol(&mut self, symbol: Symbol) -> Result<SymbolId, ModelError> {
        let checkpoint = self.checkpoint();
        let id = self.declare_symbol(symbol)?;
        if let Err(error) = self.register_symbol(id) {
            self.rollback(checkpoint);
            return Err(error);
        }
        Ok(id)
    }

    /// Record a symbol without lowering it.
    pub fn declare_symbol(&mut self, symbol: Symbol) -> Result<SymbolId, ModelError> {
        if let Some(existing) = self.symbol_names.get(symbol.name()).copied() {
            let entry = &self.symbols[existing.index()];
            if entry.symbol.same_definition(&symbol) {
                return Ok(existing);
            }
            return Err(ModelError::DuplicateSymbol {
                name: symbol.name().to_string(),
            });
        }
        for input in symbol.inputs() {
            input.validate()?;
            for operand in input.operands() {
                self.ensure_operand_exists(operand)?;
            }
        }
        let id = SymbolId::new(self.symbols.len() as u32);
        self.symbol_names.insert(symbol.name().to_string(), id);
        self.symbols.push(SymbolEntry {
            symbol,
            state: SymbolState::Unregistered,
            cache: CacheState::Stale,
        });
        Ok(id)
    }

    /// Lower a declared symbol. Registering twice is a no-op.
    pub fn register_symbol(&mut self, id: SymbolId) -> Result<(), ModelError> {
        let entry = self
            .symbols
            .get(id.index())
            .ok_or(ModelError::InvalidSymbolId(id))?;
        if entry.state.is_registered() {
            return Ok(());
        }
        let symbol = entry.symbol.clone();
        let started = Instant::now();
        let checkpoint = self.checkpoint();
        for input in symbol.inputs() {
            if let Err(error) = self.ensure_operands(input) {
                self.rollback(checkpoint);
                return Err(error);
            }
        }
        match self.lower_symbol(id, &symbol) {
            Ok(registration) => {
                tracing::debug!(
                    component = "symbol",
                    operation = "register",
                    status = "success",
                    symbol = symbol.name(),
                    auxiliaries = registration.auxiliaries.len(),
                    constraints = registration.constraints.len(),
                    duration_ms = started.elapsed().as_secs_f64() * 1000.0,
                    "Registered symbol"
                );
                self.symbols[id.index()].state = SymbolState::Registered(Box::new(registration));
                Ok(())
            }
            Err(error) => {
                tracing::debug!(
                    component = "symbol",
                    operation = "register",
                    status = "error",
                    symbol = symbol.name(),
                    error_code = error.code(),
                    "Symbol registration failed"
                );
                self.rollback(checkpoint);
                Err(error)
            }
        }
    }

    /// Add `inequality` as a named row; returns the row position.
    pub fn add_constraint(
        &mut self,
        inequality: Inequality,
        name: impl Into<String>,
    ) -> Result<usize, ModelError> {
        let (lhs, sign, rhs) = inequality.into_parts();
        self.add_constraint_parts(lhs, sign, rhs, name)
    }

    pub fn add_constraint_parts(
        &mut self,
        lhs: Polynomial,
        sign: Sign,
        rhs: f64,
        name: impl Into<String>,
    ) -> Result<usize, ModelError> {
        lhs.validate()?;
        if !rhs.is_finite() {
            return Err(tetra_expr::PolynomialError::NonFiniteCoefficient.into());
        }
        self.ensure_operands(&lhs)?;
        let mut name = name.into();
        if name.is_empty() {
            name = format!("constraint_{}", self.indexes.next("constraint"));
        }
        Ok(self.push_constraint(lhs, sign, rhs, name))
    }

    /// Append a row whose operands are already known to be registered.
    pub(crate) fn push_constraint(
        &mut self,
        lhs: Polynomial,
        sign: Sign,
        rhs: f64,
        name: String,
    ) -> usize {
        let constant = lhs.constant();
        let index = self.constraints.len();
        tracing::trace!(
            component = "model",
            operation = "add_constraint",
            status = "success",
            row = index,
            sign = sign.as_str(),
            monomials = lhs.monomials().len(),
            "Added constraint"
        );
        self.constraints.push(Constraint {
            name,
            lhs: lhs.without_constant(),
            sign,
            rhs: rhs - constant,
        });
        index
    }

    /// Add a minimized sub-objective. The first call fixes the model sense.
    pub fn minimize(
        &mut self,
        polynomial: impl Into<Polynomial>,
        name: impl Into<String>,
    ) -> Result<(), ModelError> {
        self.add_sub_objective(Sense::Minimize, polynomial.into(), name.into())
    }

    /// Add a maximized sub-objective. The first call fixes the model sense.
    pub fn maximize(
        &mut self,
        polynomial: impl Into<Polynomial>,
        name: impl Into<String>,
    ) -> Result<(), ModelError> {
        self.add_sub_objective(Sense::Maximize, polynomial.into(), name.into())
    }

    fn add_sub_objective(
        &mut self,
        sense: Sense,
        polynomial: Polynomial,
        name: String,
    ) -> Result<(), ModelError> {
        polynomial.validate()?;
        self.ensure_operands(&polynomial)?;
        let model_sense = *self.objective.sense.get_or_insert(sense);
        tracing::debug!(
            component = "model",
            operation = "add_objective",
            status = "success",
            sense = sense.as_str(),
            model_sense = model_sense.as_str(),
            monomials = polynomial.monomials().len(),
            "Added sub-objective"
        );
        self.objective.parts.push(SubObjective {
            name,
            sense,
            polynomial,
        });
        Ok(())
    }

    /// Drop the token of a variable. Its column disappears from compiled models.
    pub fn remove_variable_token(&mut self, id: VariableId) -> Result<bool, ModelError> {
        self.ensure_operand_exists(Operand::Variable(id))?;
        Ok(self.tokens.remove(id))
    }

    pub(crate) fn ensure_operand_exists(&self, operand: Operand) -> Result<(), ModelError> {
        match operand {
            Operand::Variable(id) if id.index() >= self.variables.len() => {
                Err(ModelError::InvalidVariableId(id))
            }
            Operand::Symbol(id) if id.index() >= self.symbols.len() => {
                Err(ModelError::InvalidSymbolId(id))
            }
            _ => Ok(()),
        }
    }

    /// Make every operand usable: tokens per the token policy, symbols registered.
    pub(crate) fn ensure_operands(&mut self, polynomial: &Polynomial) -> Result<(), ModelError> {
        for operand in polynomial.operands() {
            self.ensure_operand_exists(operand)?;
            match operand {
                Operand::Variable(id) => {
                    if !self.tokens.contains(id) {
                        match self.options().token_policy {
                            TokenPolicy::AutoAdd => {
                                self.tokens.add(id);
                            }
                            TokenPolicy::Manual => {
                                return Err(ModelError::UnregisteredVariable(id));
                            }
                        }
                    }
                }
                Operand::Symbol(id) => self.register_symbol(id)?,
            }
        }
        Ok(())
    }
}
