use super::support::{integer, seeded_solution};
use super::*;

#[test]
fn test_set_solution_checks_length() {
    let mut model = MechanismModel::new("m");
    integer(&mut model, "x", 0.0, 5.0);
    assert_eq!(
        model.set_solution(&[1.0, 2.0]),
        Err(ModelError::SolutionLength {
            expected: 1,
            actual: 2
        })
    );
}

#[test]
fn test_symbol_cache_refreshes_after_new_results() {
    let mut model = MechanismModel::new("m");
    let x = integer(&mut model, "x", 0.0, 5.0);
    let y = integer(&mut model, "y", 0.0, 5.0);
    let total = model.add_symbol(Symbol::expression("total", x + y)).unwrap();
    assert_eq!(model.symbol_value(total).unwrap(), None);
    model.set_solution(&[1.0, 2.0]).unwrap();
    assert_eq!(model.symbol_value(total).unwrap(), Some(3.0));
    model.set_solution(&[2.0, 2.0]).unwrap();
    assert_eq!(model.symbol_value(total).unwrap(), Some(4.0));
}

#[test]
fn test_flush_keeps_unrelated_symbols_valid() {
    let mut model = MechanismModel::new("m");
    let x = integer(&mut model, "x", 0.0, 5.0);
    let y = integer(&mut model, "y", 0.0, 5.0);
    let sx = model.add_symbol(Symbol::expression("sx", x * 2.0)).unwrap();
    let sy = model.add_symbol(Symbol::expression("sy", y * 3.0)).unwrap();
    model.set_solution(&[1.0, 1.0]).unwrap();
    model.symbol_value(sy).unwrap();
    assert!(matches!(
        model.symbols[sx.index()].cache,
        CacheState::Valid { .. }
    ));

    model.set_variable_result(y, 4.0);
    assert!(matches!(
        model.symbols[sx.index()].cache,
        CacheState::Valid { .. }
    ));
    assert_eq!(model.symbols[sy.index()].cache, CacheState::Stale);
    assert_eq!(model.symbol_value(sy).unwrap(), Some(12.0));

    model.flush(true);
    assert_eq!(model.symbols[sx.index()].cache, CacheState::Stale);
}

#[test]
fn test_clear_solution_forgets_values() {
    let mut model = MechanismModel::new("m");
    let x = integer(&mut model, "x", 0.0, 5.0);
    let s = model.add_symbol(Symbol::expression("s", x + 1.0)).unwrap();
    model.set_solution(&[2.0]).unwrap();
    assert_eq!(model.symbol_value(s).unwrap(), Some(3.0));
    model.clear_solution();
    assert_eq!(model.symbol_value(s).unwrap(), None);
    assert_eq!(model.variable_value(x), None);
}

#[test]
fn test_calculate_value_bypasses_cache() {
    let mut model = MechanismModel::new("m");
    let x = integer(&mut model, "x", 0.0, 5.0);
    let y = integer(&mut model, "y", 0.0, 5.0);
    let total = model.add_symbol(Symbol::expression("total", x + y)).unwrap();
    let doubled = model
        .add_symbol(Symbol::expression("doubled", Polynomial::from(total) * 2.0))
        .unwrap();
    model.set_solution(&[1.0, 1.0]).unwrap();
    assert_eq!(model.symbol_value(doubled).unwrap(), Some(4.0));
    assert_eq!(model.calculate_value(doubled, &[3.0, 2.0]).unwrap(), Some(10.0));
    assert_eq!(model.symbol_value(doubled).unwrap(), Some(4.0));
    assert!(model.calculate_value(doubled, &[1.0]).is_err());
}

#[test]
fn test_objective_value_combines_sub_objectives() {
    let mut model = MechanismModel::new("m");
    let x = integer(&mut model, "x", 0.0, 5.0);
    let y = integer(&mut model, "y", 0.0, 5.0);
    model.minimize(x * 3.0 + 1.0, "cost").unwrap();
    model.maximize(y, "bonus").unwrap();
    assert_eq!(model.objective_value(), None);
    model.set_solution(&[2.0, 4.0]).unwrap();
    assert_eq!(model.objective_value(), Some(3.0));
}

#[test]
fn test_check_solution_reports_rows_and_ranges() {
    let mut model = MechanismModel::new("m");
    let x = integer(&mut model, "x", 0.0, 2.0);
    let y = integer(&mut model, "y", 0.0, 5.0);
    model
        .add_constraint((x + y).le_scalar(3.0), "cap")
        .unwrap();
    model
        .add_constraint(Polynomial::from(y).ge_scalar(1.0), "floor")
        .unwrap();

    let check = model.check_solution(&[1.0, 2.0], 1e-9).unwrap();
    assert!(check.is_feasible());

    let check = model.check_solution(&[2.5, 1.0], 1e-9).unwrap();
    assert_eq!(check.violated_constraints, vec!["cap".to_string()]);
    assert_eq!(check.out_of_range, vec!["x".to_string()]);
}

#[test]
fn test_warm_start_keeps_existing_results() {
    let mut model = MechanismModel::new("m");
    let x = integer(&mut model, "x", -3.0, 4.0);
    let magnitude = model.add_symbol(Symbol::abs("mag", x)).unwrap();
    let pos = model.variable_by_name("mag_pos").unwrap();
    model.set_variable_result(pos, 7.0);
    model.set_variable_result(x, -2.0);
    assert_eq!(model.prepare_warm_start(), 2);
    assert_eq!(model.variable_value(pos), Some(7.0));
    assert_eq!(model.variable_value(model.variable_by_name("mag_neg").unwrap()), Some(2.0));
    assert_eq!(model.symbol_value(magnitude).unwrap(), Some(9.0));
}

#[test]
fn test_warm_start_waits_for_inputs() {
    let mut model = MechanismModel::new("m");
    let x = integer(&mut model, "x", 0.0, 5.0);
    model
        .add_symbol(Symbol::if_then("small", Polynomial::from(x).le_scalar(2.0)))
        .unwrap();
    assert_eq!(model.prepare_warm_start(), 0);
    let solution = seeded_solution(&mut model, &[(x, 1.0)]);
    assert_eq!(solution, vec![1.0, 1.0]);
}
