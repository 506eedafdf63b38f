//! Solutions, the symbol value cache, warm starts and solution checks.

use crate::symbol::CacheState;
use std::time::Instant;
use tetra_expr::{Operand, Polynomial, SymbolId, VariableId};

use super::MechanismModel;
use super::error::ModelError;

/// Outcome of [`MechanismModel::check_solution`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SolutionCheck {
    /// Names of constraints the solution breaks.
    pub violated_constraints: Vec<String>,
    /// Names of variables outside their range or off their integrality.
    pub out_of_range: Vec<String>,
}

impl SolutionCheck {
    pub fn is_feasible(&self) -> bool {
        self.violated_constraints.is_empty() && self.out_of_range.is_empty()
    }
}

fn evaluate_with(
    polynomial: &Polynomial,
    variable: &dyn Fn(VariableId) -> Option<f64>,
    symbols: &[Option<f64>],
) -> Option<f64> {
    polynomial.value(
        &|operand: Operand| match operand {
            Operand::Variable(id) => variable(id),
            Operand::Symbol(id) => symbols.get(id.index()).copied().flatten(),
        },
        false,
    )
}

impl MechanismModel {
    // ── Solutions ───────────────────────────────────────────

    /// Install a solution indexed by solver column.
    pub fn set_solution(&mut self, values: &[f64]) -> Result<(), ModelError> {
        self.tokens.set_results(values)?;
        self.flush(false);
        Ok(())
    }

    /// Set the result of one variable; `false` if it has no token.
    pub fn set_variable_result(&mut self, id: VariableId, value: f64) -> bool {
        let changed = self.tokens.set_result(id, value);
        self.flush(false);
        changed
    }

    pub fn clear_solution(&mut self) {
        self.tokens.clear_results();
        self.flush(true);
    }

    pub fn variable_value(&self, id: VariableId) -> Option<f64> {
        self.tokens.result(id)
    }

    // ── Symbol cache ────────────────────────────────────────

    /// Mark cached symbol values stale.
    ///
    /// Without `force`, only symbols with a variable whose result changed
    /// after the cached revision are invalidated.
    pub fn flush(&mut self, force: bool) {
        for index in 0..self.symbols.len() {
            let entry = &self.symbols[index];
            let CacheState::Valid { revision, .. } = entry.cache else {
                continue;
            };
            let stale = force
                || entry.state.registration().is_none_or(|registration| {
                    registration.variables.iter().any(|variable| {
                        self.tokens
                            .token(*variable)
                            .is_none_or(|token| token.changed_at() > revision)
                    })
                });
            if stale {
                self.symbols[index].cache = CacheState::Stale;
            }
        }
    }

    /// Value of a symbol under the installed results, recomputed when stale.
    ///
    /// `None` while any variable it reads has no result.
    pub fn symbol_value(&mut self, id: SymbolId) -> Result<Option<f64>, ModelError> {
        self.symbol_state(id)?;
        let revision = self.tokens.revision();
        for index in 0..=id.index() {
            if matches!(self.symbols[index].cache, CacheState::Valid { .. }) {
                continue;
            }
            let known: Vec<Option<f64>> = self.symbols[..index]
                .iter()
                .map(|entry| match entry.cache {
                    CacheState::Valid { value, .. } => value,
                    CacheState::Stale => None,
                })
                .collect();
            let value = self.symbols[index]
                .state
                .registration()
                .and_then(|registration| {
                    evaluate_with(
                        &registration.expression,
                        &|variable| self.tokens.result(variable),
                        &known,
                    )
                });
            self.symbols[index].cache = CacheState::Valid { value, revision };
        }
        Ok(match self.symbols[id.index()].cache {
            CacheState::Valid { value, .. } => value,
            CacheState::Stale => None,
        })
    }

    /// Value of a symbol under `solution`, bypassing the cache.
    pub fn calculate_value(
        &self,
        id: SymbolId,
        solution: &[f64],
    ) -> Result<Option<f64>, ModelError> {
        self.symbol_state(id)?;
        let lookup = self.solution_lookup(solution)?;
        let values = self.symbol_values_from(&lookup, id.index() + 1);
        Ok(values[id.index()])
    }

    /// Combined objective under the installed results.
    pub fn objective_value(&self) -> Option<f64> {
        let (_, polynomial) = self.objective.combined()?;
        let variable = |id: VariableId| self.tokens.result(id);
        let symbols = self.symbol_values_from(&variable, self.symbols.len());
        evaluate_with(&polynomial, &variable, &symbols)
    }

    fn solution_lookup<'a>(
        &self,
        solution: &'a [f64],
    ) -> Result<impl Fn(VariableId) -> Option<f64> + 'a, ModelError> {
        if solution.len() != self.tokens.len() {
            return Err(ModelError::SolutionLength {
                expected: self.tokens.len(),
                actual: solution.len(),
            });
        }
        let columns = self.tokens.column_map();
        Ok(move |id: VariableId| columns.get(&id).map(|column| solution[*column]))
    }

    /// Values of the first `upto` symbols, in id order.
    fn symbol_values_from(
        &self,
        variable: &dyn Fn(VariableId) -> Option<f64>,
        upto: usize,
    ) -> Vec<Option<f64>> {
        let mut values = Vec::with_capacity(upto);
        for entry in &self.symbols[..upto] {
            let value = entry
                .state
                .registration()
                .and_then(|registration| {
                    evaluate_with(&registration.expression, variable, &values)
                });
            values.push(value);
        }
        values
    }

    // ── Warm start and checks ───────────────────────────────

    /// Seed auxiliary results from the results of function inputs.
    ///
    /// Auxiliaries that already carry a result are left alone. Returns the
    /// number of seeded variables.
    pub fn prepare_warm_start(&mut self) -> usize {
        let started = Instant::now();
        let mut symbol_values: Vec<Option<f64>> = Vec::with_capacity(self.symbols.len());
        let mut seeded = 0;
        for index in 0..self.symbols.len() {
            let seeds = self.symbols[index]
                .state
                .registration()
                .map(|registration| registration.seeds.clone())
                .unwrap_or_default();
            for (auxiliary, seed) in seeds {
                if self.tokens.result(auxiliary).is_some() {
                    continue;
                }
                let value = seed.evaluate(&|polynomial| {
                    evaluate_with(
                        polynomial,
                        &|variable| self.tokens.result(variable),
                        &symbol_values,
                    )
                });
                if let Some(value) = value {
                    if self.tokens.set_result(auxiliary, value) {
                        seeded += 1;
                    }
                }
            }
            let value = self.symbols[index]
                .state
                .registration()
                .and_then(|registration| {
                    evaluate_with(
                        &registration.expression,
                        &|variable| self.tokens.result(variable),
                        &symbol_values,
                    )
                });
            symbol_values.push(value);
        }
        self.flush(false);
        tracing::debug!(
            component = "model",
            operation = "warm_start",
            status = "success",
            seeded,
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Prepared warm start"
        );
        seeded
    }

    /// List constraints and variables that `solution` violates.
    pub fn check_solution(
        &self,
        solution: &[f64],
        tolerance: f64,
    ) -> Result<SolutionCheck, ModelError> {
        let lookup = self.solution_lookup(solution)?;
        let symbols = self.symbol_values_from(&lookup, self.symbols.len());
        let mut check = SolutionCheck::default();

        for constraint in &self.constraints {
            let satisfied = evaluate_with(&constraint.lhs, &lookup, &symbols)
                .is_some_and(|lhs| constraint.sign.holds(lhs, constraint.rhs, tolerance));
            if !satisfied {
                check.violated_constraints.push(constraint.name.clone());
            }
        }

        for token in self.tokens.tokens() {
            let variable = &self.variables[token.variable().index()];
            let Some(value) = lookup(token.variable()) else {
                continue;
            };
            let inside = value >= variable.lower() - tolerance
                && value <= variable.upper() + tolerance;
            let integral =
                !variable.kind().is_integral() || (value - value.round()).abs() <= tolerance;
            if !inside || !integral {
                check.out_of_range.push(variable.name().to_string());
            }
        }

        tracing::debug!(
            component = "model",
            operation = "check_solution",
            status = if check.is_feasible() { "success" } else { "warn" },
            violated = check.violated_constraints.len(),
            out_of_range = check.out_of_range.len(),
            "Checked solution"
        );
        Ok(check)
    }
}
