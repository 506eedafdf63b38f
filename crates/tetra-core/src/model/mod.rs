//! Mechanism model: the mutable accumulator of one problem instance.
//!
//! # Module Organization
//!
//! - [`error`]: Model error types
//! - [`builder`]: Adding variables, symbols, constraints and objectives
//! - [`storage`]: Accessors, range checks and the operand domain
//! - [`lowering`]: Registration of derived functions
//! - [`piecewise`]: Piecewise-linear lowering
//! - [`evaluation`]: Solutions, the symbol cache, warm starts and checks
//! - [`groups`]: Constraint groups and shadow prices
//! - [`allocator`]: Per-model index counters

mod allocator;
mod builder;
mod error;
mod evaluation;
mod groups;
mod lowering;
mod piecewise;
mod storage;

use crate::symbol::{CacheState, Symbol, SymbolState};
use crate::token::{TokenList, TokenPolicy};
use crate::types::{Constraint, Objective, Variable};
use std::collections::HashMap;
use tetra_expr::{SymbolId, VariableId};

pub use allocator::IndexAllocator;
pub use error::ModelError;
pub use evaluation::SolutionCheck;
pub use groups::ConstraintGroup;
pub use piecewise::{interpolate_1d, interpolate_2d};

/// Tolerance used for strict inequalities on continuous expressions.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelOptions {
    pub token_policy: TokenPolicy,
    pub tolerance: f64,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            token_policy: TokenPolicy::AutoAdd,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl ModelOptions {
    pub fn with_token_policy(mut self, token_policy: TokenPolicy) -> Self {
        self.token_policy = token_policy;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SymbolEntry {
    pub(crate) symbol: Symbol,
    pub(crate) state: SymbolState,
    pub(crate) cache: CacheState,
}

/// Owns every variable, symbol, constraint and the objective of a problem.
///
/// Construction is single-writer. Symbols are registered as they are added,
/// so the model is always closed: every auxiliary variable and constraint a
/// derived function needs is already present.
#[derive(Debug, Clone)]
pub struct MechanismModel {
    name: String,
    options: ModelOptions,
    pub(crate) variables: Vec<Variable>,
    pub(crate) variable_names: HashMap<String, VariableId>,
    pub(crate) tokens: TokenList,
    pub(crate) symbols: Vec<SymbolEntry>,
    pub(crate) symbol_names: HashMap<String, SymbolId>,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) objective: Objective,
    pub(crate) indexes: IndexAllocator,
}

/// Sizes to truncate back to when a registration fails.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Checkpoint {
    variables: usize,
    constraints: usize,
    symbols: usize,
    token_slots: usize,
}

impl MechanismModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_options(name, ModelOptions::default())
    }

    pub fn with_options(name: impl Into<String>, options: ModelOptions) -> Self {
        Self {
            name: name.into(),
            options,
            variables: Vec::new(),
            variable_names: HashMap::new(),
            tokens: TokenList::new(),
            symbols: Vec::new(),
            symbol_names: HashMap::new(),
            constraints: Vec::new(),
            objective: Objective::new(),
            indexes: IndexAllocator::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            variables: self.variables.len(),
            constraints: self.constraints.len(),
            symbols: self.symbols.len(),
            token_slots: self.tokens.slot_count(),
        }
    }

    pub(crate) fn rollback(&mut self, checkpoint: Checkpoint) {
        self.tokens.truncate(checkpoint.token_slots);
        for variable in &self.variables[checkpoint.variables..] {
            self.variable_names.remove(variable.name());
        }
        self.variables.truncate(checkpoint.variables);
        self.constraints.truncate(checkpoint.constraints);
        for entry in self.symbols.drain(checkpoint.symbols..) {
            self.symbol_names.remove(entry.symbol.name());
        }
        for entry in &mut self.symbols {
            let truncated = entry.state.registration().is_some_and(|registration| {
                registration
                    .auxiliaries
                    .iter()
                    .any(|id| id.index() >= checkpoint.variables)
                    || registration
                        .constraints
                        .iter()
                        .any(|row| *row >= checkpoint.constraints)
            });
            if truncated {
                entry.state = SymbolState::Unregistered;
                entry.cache = CacheState::Stale;
            }
        }
        tracing::debug!(
            component = "model",
            operation = "rollback",
            status = "success",
            variables = checkpoint.variables,
            constraints = checkpoint.constraints,
            symbols = checkpoint.symbols,
            token_slots = checkpoint.token_slots,
            "Rolled back partial registration"
        );
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::symbol::SlackDirection;
    use crate::types::{Sense, VariableType};
    use tetra_expr::{Operand, Polynomial, Sign};

    mod evaluation;
    mod functions;
    mod groups;
    mod support;

    #[test]
    fn new_model_is_empty() {
        let model = MechanismModel::new("empty");
        assert_eq!(model.num_variables(), 0);
        assert_eq!(model.num_constraints(), 0);
        assert_eq!(model.num_symbols(), 0);
        assert_eq!(model.name(), "empty");
    }

    #[test]
    fn add_variable_registers_token() {
        let mut model = MechanismModel::new("m");
        let x = model.add_variable(Variable::continuous("x")).unwrap();
        assert_eq!(model.variable(x).unwrap().name(), "x");
        assert!(model.tokens().contains(x));
        assert_eq!(model.variable_by_name("x"), Some(x));
    }

    #[test]
    fn duplicate_variable_name_is_rejected() {
        let mut model = MechanismModel::new("m");
        model.add_variable(Variable::binary("x")).unwrap();
        let result = model.add_variable(Variable::integer("x"));
        assert_eq!(
            result,
            Err(ModelError::DuplicateVariable {
                name: "x".to_string()
            })
        );
    }

    #[test]
    fn same_symbol_twice_is_a_no_op() {
        let mut model = MechanismModel::new("m");
        let x = model.add_variable(Variable::binary("x")).unwrap();
        let y = model.add_variable(Variable::binary("y")).unwrap();
        let first = model.add_symbol(Symbol::expression("s", x + y)).unwrap();
        let again = model.add_symbol(Symbol::expression("s", x + y)).unwrap();
        assert_eq!(first, again);
        assert_eq!(model.num_symbols(), 1);
    }

    #[test]
    fn distinct_symbols_under_one_name_fail() {
        let mut model = MechanismModel::new("m");
        let x = model.add_variable(Variable::binary("x")).unwrap();
        let y = model.add_variable(Variable::binary("y")).unwrap();
        model.add_symbol(Symbol::expression("s", x + y)).unwrap();
        let result = model.add_symbol(Symbol::expression("s", x - y));
        assert_eq!(
            result,
            Err(ModelError::DuplicateSymbol {
                name: "s".to_string()
            })
        );
        assert_eq!(model.num_symbols(), 1);
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let mut model = MechanismModel::new("m");
        let ghost = tetra_expr::SymbolId::new(9);
        let result = model.add_constraint(Polynomial::from(ghost).le_scalar(1.0), "c");
        assert_eq!(result, Err(ModelError::InvalidSymbolId(ghost)));
        let missing = VariableId::new(3);
        assert_eq!(
            model.minimize(missing, "obj"),
            Err(ModelError::InvalidVariableId(missing))
        );
    }

    #[test]
    fn manual_policy_rejects_removed_tokens() {
        let options = ModelOptions::default().with_token_policy(TokenPolicy::Manual);
        let mut model = MechanismModel::with_options("m", options);
        let x = model.add_variable(Variable::continuous("x")).unwrap();
        assert!(model.remove_variable_token(x).unwrap());
        let result = model.add_constraint(Polynomial::from(x).ge_scalar(0.0), "c");
        assert_eq!(result, Err(ModelError::UnregisteredVariable(x)));
    }

    #[test]
    fn auto_add_policy_re_registers_tokens() {
        let mut model = MechanismModel::new("m");
        let x = model.add_variable(Variable::continuous("x")).unwrap();
        model.remove_variable_token(x).unwrap();
        assert!(!model.tokens().contains(x));
        model
            .add_constraint(Polynomial::from(x).ge_scalar(0.0), "c")
            .unwrap();
        assert!(model.tokens().contains(x));
    }

    #[test]
    fn first_objective_fixes_sense() {
        let mut model = MechanismModel::new("m");
        let x = model.add_variable(Variable::continuous("x")).unwrap();
        let y = model.add_variable(Variable::continuous("y")).unwrap();
        model.maximize(x, "profit").unwrap();
        model.minimize(y * 2.0, "cost").unwrap();
        assert_eq!(model.objective().sense, Some(Sense::Maximize));
        assert_eq!(model.objective().parts.len(), 2);
        let (_, total) = model.objective().combined().unwrap();
        assert_eq!(
            total.value(
                &|operand: Operand| operand.as_variable().map(|_| 1.0),
                false
            ),
            Some(-1.0)
        );
    }

    #[test]
    fn constraint_keeps_declaration_order_and_moves_constants() {
        let mut model = MechanismModel::new("m");
        let x = model.add_variable(Variable::continuous("x")).unwrap();
        let first = model
            .add_constraint_parts(x + 2.0, Sign::LessEqual, 5.0, "first")
            .unwrap();
        let second = model
            .add_constraint(Polynomial::from(x).ge_scalar(1.0), "second")
            .unwrap();
        assert_eq!((first, second), (0, 1));
        assert_eq!(model.constraints()[0].rhs, 3.0);
        assert_eq!(model.constraints()[1].name, "second");
    }

    #[test]
    fn non_finite_polynomials_are_rejected() {
        let mut model = MechanismModel::new("m");
        let x = model.add_variable(Variable::continuous("x")).unwrap();
        let result =
            model.add_constraint_parts(Polynomial::from(x) / 0.0, Sign::LessEqual, 1.0, "c");
        assert!(matches!(result, Err(ModelError::Polynomial(_))));
    }

    #[test]
    fn check_ranges_reports_first_empty_range() {
        let mut model = MechanismModel::new("m");
        let x = model.add_variable(Variable::binary("x")).unwrap();
        assert!(model.check_ranges().is_ok());
        assert!(!model.variable_mut(x).unwrap().range_mut().geq(2.0));
        assert_eq!(
            model.check_ranges(),
            Err(ModelError::EmptyRange {
                variable: "x".to_string()
            })
        );
    }

    #[test]
    fn failed_registration_leaves_model_unchanged() {
        let mut model = MechanismModel::new("m");
        let x = model.add_variable(Variable::continuous("x")).unwrap();
        let before = (model.num_variables(), model.num_constraints());
        let result = model.add_symbol(Symbol::abs("a", x));
        assert!(matches!(
            result,
            Err(ModelError::UnboundedExpression { .. })
        ));
        assert_eq!((model.num_variables(), model.num_constraints()), before);
        assert_eq!(model.num_symbols(), 0);
        assert!(model.symbol_by_name("a").is_none());
    }

    #[test]
    fn failed_registration_restores_removed_tokens() {
        let mut model = MechanismModel::new("m");
        let x = model.add_variable(Variable::continuous("x")).unwrap();
        let y = model.add_variable(Variable::binary("y")).unwrap();
        assert!(model.remove_variable_token(x).unwrap());
        let slots = model.tokens().slot_count();

        let result = model.add_symbol(Symbol::abs("a", x + y));
        assert!(matches!(
            result,
            Err(ModelError::UnboundedExpression { .. })
        ));
        assert!(!model.tokens().contains(x));
        assert!(model.tokens().contains(y));
        assert_eq!(model.tokens().slot_count(), slots);
        assert_eq!(model.tokens().len(), 1);
    }

    #[test]
    fn slack_symbol_types_follow_discreteness() {
        let mut model = MechanismModel::new("m");
        let x = model
            .add_variable(Variable::new("x", VariableType::Integer).with_bounds(-3.0, 8.0))
            .unwrap();
        let slack = model
            .add_symbol(Symbol::slack("dev", x, 2.0, SlackDirection::Both))
            .unwrap();
        let registration = model.symbol_state(slack).unwrap().registration().unwrap();
        assert_eq!(registration.auxiliaries.len(), 2);
        let kinds: Vec<_> = registration
            .auxiliaries
            .iter()
            .map(|id| model.variable(*id).unwrap().kind())
            .collect();
        assert_eq!(kinds, vec![VariableType::UInteger, VariableType::UInteger]);
        let uppers: Vec<_> = registration
            .auxiliaries
            .iter()
            .map(|id| model.variable(*id).unwrap().upper())
            .collect();
        assert_eq!(uppers, vec![5.0, 6.0]);
        assert!(registration.discrete);
    }
}
