//! Token registry: stable slots and compacted solver columns.
//!
//! Each registered variable owns one slot. Removing a variable invalidates its
//! slot without reusing it, so the solver column of a token is its rank among
//! the still-active slots.

use crate::model::ModelError;
use std::collections::HashMap;
use tetra_expr::VariableId;

/// How references to unregistered variables are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TokenPolicy {
    /// Register the variable on first reference.
    #[default]
    AutoAdd,
    /// Reject the reference with `ModelError::UnregisteredVariable`.
    Manual,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    variable: VariableId,
    slot: usize,
    result: Option<f64>,
    changed_at: u64,
}

impl Token {
    pub fn variable(&self) -> VariableId {
        self.variable
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn result(&self) -> Option<f64> {
        self.result
    }

    /// Revision at which `result` last changed.
    pub fn changed_at(&self) -> u64 {
        self.changed_at
    }
}

#[derive(Debug, Clone, Default)]
pub struct TokenList {
    slots: Vec<Option<Token>>,
    by_variable: HashMap<VariableId, usize>,
    active: usize,
    revision: u64,
}

impl TokenList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `variable`; returns the existing slot if already active.
    pub fn add(&mut self, variable: VariableId) -> usize {
        if let Some(slot) = self.by_variable.get(&variable) {
            return *slot;
        }
        let slot = self.slots.len();
        self.slots.push(Some(Token {
            variable,
            slot,
            result: None,
            changed_at: self.revision,
        }));
        self.by_variable.insert(variable, slot);
        self.active += 1;
        tracing::trace!(
            component = "token",
            operation = "add",
            status = "success",
            variable = variable.inner(),
            slot,
            "Registered token"
        );
        slot
    }

    /// Invalidate the token of `variable`. Its slot is never reused.
    pub fn remove(&mut self, variable: VariableId) -> bool {
        let Some(slot) = self.by_variable.remove(&variable) else {
            return false;
        };
        self.slots[slot] = None;
        self.active -= 1;
        self.revision += 1;
        true
    }

    /// Drop every slot handed out at or after `slot_count`.
    ///
    /// Variables registered since then become unregistered again; slots
    /// invalidated earlier stay invalidated.
    pub(crate) fn truncate(&mut self, slot_count: usize) {
        if slot_count >= self.slots.len() {
            return;
        }
        for token in self.slots.drain(slot_count..).flatten() {
            self.by_variable.remove(&token.variable);
            self.active -= 1;
        }
        self.revision += 1;
    }

    pub fn contains(&self, variable: VariableId) -> bool {
        self.by_variable.contains_key(&variable)
    }

    pub fn token(&self, variable: VariableId) -> Option<&Token> {
        let slot = *self.by_variable.get(&variable)?;
        self.slots[slot].as_ref()
    }

    pub fn result(&self, variable: VariableId) -> Option<f64> {
        self.token(variable).and_then(Token::result)
    }

    /// Number of active tokens, i.e. the solver column count.
    pub fn len(&self) -> usize {
        self.active
    }

    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    /// Slots ever handed out, including invalidated ones.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Active tokens in column order.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.slots.iter().flatten()
    }

    /// Slot to solver column; `None` for invalidated slots.
    pub fn solver_indexes(&self) -> Vec<Option<usize>> {
        let mut next = 0;
        self.slots
            .iter()
            .map(|slot| {
                slot.as_ref().map(|_| {
                    let column = next;
                    next += 1;
                    column
                })
            })
            .collect()
    }

    /// Solver column of every active variable.
    pub fn column_map(&self) -> HashMap<VariableId, usize> {
        self.tokens()
            .enumerate()
            .map(|(column, token)| (token.variable, column))
            .collect()
    }

    /// Install a solution indexed by solver column.
    pub fn set_results(&mut self, values: &[f64]) -> Result<(), ModelError> {
        if values.len() != self.active {
            return Err(ModelError::SolutionLength {
                expected: self.active,
                actual: values.len(),
            });
        }
        self.revision += 1;
        let revision = self.revision;
        for (token, value) in self.slots.iter_mut().flatten().zip(values) {
            token.result = Some(*value);
            token.changed_at = revision;
        }
        Ok(())
    }

    pub fn set_result(&mut self, variable: VariableId, value: f64) -> bool {
        let Some(slot) = self.by_variable.get(&variable).copied() else {
            return false;
        };
        self.revision += 1;
        if let Some(token) = self.slots[slot].as_mut() {
            token.result = Some(value);
            token.changed_at = self.revision;
        }
        true
    }

    pub fn clear_results(&mut self) {
        self.revision += 1;
        let revision = self.revision;
        for token in self.slots.iter_mut().flatten() {
            token.result = None;
            token.changed_at = revision;
        }
    }

    /// Results in column order, if every token has one.
    pub fn results(&self) -> Option<Vec<f64>> {
        self.tokens().map(Token::result).collect()
    }
}
