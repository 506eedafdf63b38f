use super::*;
use crate::symbol::Registration;

pub(super) fn integer(
    model: &mut MechanismModel,
    name: &str,
    lower: f64,
    upper: f64,
) -> VariableId {
    model
        .add_variable(Variable::integer(name).with_bounds(lower, upper))
        .unwrap()
}

pub(super) fn continuous(
    model: &mut MechanismModel,
    name: &str,
    lower: f64,
    upper: f64,
) -> VariableId {
    model
        .add_variable(Variable::continuous(name).with_bounds(lower, upper))
        .unwrap()
}

/// Install `inputs`, seed every auxiliary and return the full column vector.
pub(super) fn seeded_solution(
    model: &mut MechanismModel,
    inputs: &[(VariableId, f64)],
) -> Vec<f64> {
    model.clear_solution();
    for (id, value) in inputs {
        assert!(model.set_variable_result(*id, *value));
    }
    model.prepare_warm_start();
    model.tokens().results().expect("every column seeded")
}

pub(super) fn assert_feasible(model: &MechanismModel, solution: &[f64]) {
    let check = model.check_solution(solution, 1e-9).unwrap();
    assert!(check.is_feasible(), "{check:?}");
}

/// Seed from `inputs`, check feasibility and return the symbol value.
pub(super) fn seeded_value(
    model: &mut MechanismModel,
    symbol: SymbolId,
    inputs: &[(VariableId, f64)],
) -> f64 {
    let solution = seeded_solution(model, inputs);
    assert_feasible(model, &solution);
    model.set_solution(&solution).unwrap();
    model.symbol_value(symbol).unwrap().unwrap()
}

pub(super) fn registration(model: &MechanismModel, symbol: SymbolId) -> &Registration {
    model.symbol_state(symbol).unwrap().registration().unwrap()
}
