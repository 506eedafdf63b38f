#![allow(clippy::float_cmp)]

use std::sync::Arc;
use std::time::{Duration, Instant};
use tetra_core::{
    IntermediateModel, LinearTriadModel, MechanismModel, Polynomial, QuadraticTetradModel, Symbol,
    SymbolId, Variable, VariableId,
};
use tetra_highs::{HighsAdapter, highs_solver};
use tetra_solver::{
    AdapterSolver, CancelRequest, SerialCombinatorialSolver, Solver, SolverConfig, SolverError,
    SolverOutput, SolvingStatus, StatusCallback,
};

const COSTS: [[f64; 4]; 4] = [
    [920.0, 480.0, 650.0, 340.0],
    [870.0, 510.0, 700.0, 350.0],
    [880.0, 500.0, 720.0, 400.0],
    [930.0, 490.0, 680.0, 410.0],
];

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn solve(model: &MechanismModel) -> Result<SolverOutput, SolverError> {
    init_tracing();
    let compiled: IntermediateModel = LinearTriadModel::compile(model).unwrap().into();
    highs_solver().solve(&compiled, &SolverConfig::new().with_thread_count(1), None)
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {expected}, got {actual}"
    );
}

/// Solve, install the solution and read back one symbol.
fn solved_symbol(model: &mut MechanismModel, symbol: SymbolId) -> (f64, f64) {
    let output = solve(model).unwrap();
    model.set_solution(&output.solution).unwrap();
    let value = model.symbol_value(symbol).unwrap().unwrap();
    (output.objective, value)
}

// ── AND ──

fn and_model() -> (MechanismModel, VariableId, VariableId) {
    let mut model = MechanismModel::new("and");
    let x = model
        .add_variable(Variable::integer("x").with_bounds(0.0, 1.0))
        .unwrap();
    let y = model
        .add_variable(Variable::integer("y").with_bounds(0.0, 2.0))
        .unwrap();
    let both = model
        .add_symbol(Symbol::and("both", vec![x.into(), y.into()]))
        .unwrap();
    model
        .add_constraint(Polynomial::from(both).eq_scalar(1.0), "both_hold")
        .unwrap();
    (model, x, y)
}

#[test]
fn test_and_maximum() {
    let (mut model, x, y) = and_model();
    model.maximize(x + y, "total").unwrap();
    let output = solve(&model).unwrap();
    assert_close(output.objective, 3.0);
    model.set_solution(&output.solution).unwrap();
    assert_close(model.variable_value(x).unwrap(), 1.0);
    assert_close(model.variable_value(y).unwrap(), 2.0);
}

#[test]
fn test_and_minimum() {
    let (mut model, x, y) = and_model();
    model.minimize(x + y, "total").unwrap();
    let output = solve(&model).unwrap();
    assert_close(output.objective, 2.0);
    let check = model.check_solution(&output.solution, 1e-6).unwrap();
    assert!(check.is_feasible(), "{check:?}");
}

// ── Binarize ──

fn binarize_model(fixed: Option<f64>) -> (MechanismModel, SymbolId) {
    let mut model = MechanismModel::new("binarize");
    let x = model
        .add_variable(Variable::continuous("x").with_bounds(0.0, 2.0))
        .unwrap();
    let bin = model.add_symbol(Symbol::binarize("bin", x)).unwrap();
    if let Some(value) = fixed {
        model
            .add_constraint(Polynomial::from(x).eq_scalar(value), "fix_x")
            .unwrap();
    }
    (model, bin)
}

#[test]
fn test_binarize_range() {
    let (mut model, bin) = binarize_model(None);
    model.minimize(bin, "bin").unwrap();
    let (objective, value) = solved_symbol(&mut model, bin);
    assert_close(objective, 0.0);
    assert_close(value, 0.0);

    let (mut model, bin) = binarize_model(None);
    model.maximize(bin, "bin").unwrap();
    let (objective, value) = solved_symbol(&mut model, bin);
    assert_close(objective, 1.0);
    assert_close(value, 1.0);
}

#[test]
fn test_binarize_fixed_input() {
    let (mut model, bin) = binarize_model(Some(0.0));
    model.maximize(bin, "bin").unwrap();
    assert_close(solved_symbol(&mut model, bin).0, 0.0);

    let (mut model, bin) = binarize_model(Some(0.3));
    model.maximize(bin, "bin").unwrap();
    assert_close(solved_symbol(&mut model, bin).0, 1.0);
}

// ── Assignment ──

#[test]
fn test_assignment() {
    let mut model = MechanismModel::new("assignment");
    let mut assign = Vec::new();
    for _ in 0..COSTS.len() {
        let company = model.indexes_mut().next("company");
        let mut row = Vec::new();
        for product in 0..COSTS[company].len() {
            let id = model
                .add_variable(Variable::binary(format!("assign_{company}_{product}")))
                .unwrap();
            row.push(id);
        }
        assign.push(row);
    }
    assert_eq!(model.indexes().peek("company"), 4);

    for (company, row) in assign.iter().enumerate() {
        let total: Polynomial = row.iter().map(|&id| Polynomial::from(id)).sum();
        model
            .add_constraint(total.le_scalar(1.0), format!("company:{company}"))
            .unwrap();
    }
    for product in 0..COSTS[0].len() {
        let total: Polynomial = assign.iter().map(|row| Polynomial::from(row[product])).sum();
        model
            .add_constraint(total.eq_scalar(1.0), format!("product:{product}"))
            .unwrap();
    }
    let cost: Polynomial = assign
        .iter()
        .enumerate()
        .flat_map(|(company, row)| {
            row.iter()
                .enumerate()
                .map(move |(product, &id)| Polynomial::from(id) * COSTS[company][product])
        })
        .sum();
    model.minimize(cost, "cost").unwrap();

    let output = solve(&model).unwrap();
    assert_close(output.objective, 2370.0);
    model.set_solution(&output.solution).unwrap();
    let mut pairs = Vec::new();
    for (company, row) in assign.iter().enumerate() {
        for (product, &id) in row.iter().enumerate() {
            if model.variable_value(id).unwrap() > 0.5 {
                pairs.push((company, product));
            }
        }
    }
    assert_eq!(pairs, vec![(0, 2), (1, 3), (2, 0), (3, 1)]);
    assert_eq!(model.constraint_groups(":").len(), 2);
}

// ── LP duals ──

#[test]
fn test_lp_duals_map_to_groups() {
    let mut model = MechanismModel::new("duals");
    let x = model.add_variable(Variable::ucontinuous("x")).unwrap();
    let y = model.add_variable(Variable::ucontinuous("y")).unwrap();
    model
        .add_constraint((x + y).ge_scalar(5.0), "demand:total")
        .unwrap();
    model
        .add_constraint(Polynomial::from(x).le_scalar(10.0), "cap:x")
        .unwrap();
    model.minimize(x * 2.0 + y * 3.0, "cost").unwrap();

    let output = solve(&model).unwrap();
    assert_close(output.objective, 10.0);
    assert_eq!(output.gap, 0.0);
    let duals = output.row_duals.expect("LP solves report duals");
    let group = model.constraint_group("demand");
    let prices = model.shadow_prices(&group, &duals).unwrap();
    assert_eq!(prices.len(), 1);
    assert_eq!(prices[0].0, "demand:total");
    assert_close(prices[0].1.abs(), 2.0);
}

#[test]
fn test_mip_has_no_duals() {
    let (mut model, x, y) = and_model();
    model.maximize(x + y, "total").unwrap();
    let output = solve(&model).unwrap();
    assert!(output.row_duals.is_none());
    assert!(output.best_bound >= 3.0 - 1e-6);
    assert!(output.best_bound <= 3.0 * (1.0 + 1e-3));
}

// ── Objective constant and derived functions ──

#[test]
fn test_objective_constant_and_abs() {
    let mut model = MechanismModel::new("abs");
    let x = model
        .add_variable(Variable::continuous("x").with_bounds(-3.0, 2.0))
        .unwrap();
    let magnitude = model.add_symbol(Symbol::abs("magnitude", x)).unwrap();
    model.maximize(Polynomial::from(magnitude) + 10.0, "spread").unwrap();

    let output = solve(&model).unwrap();
    assert_close(output.objective, 13.0);
    model.set_solution(&output.solution).unwrap();
    assert_close(model.variable_value(x).unwrap(), -3.0);
    assert_close(model.objective_value().unwrap(), 13.0);
}

#[test]
fn test_exact_max() {
    let mut model = MechanismModel::new("max");
    let x = model
        .add_variable(Variable::continuous("x").with_bounds(0.0, 4.0))
        .unwrap();
    let y = model
        .add_variable(Variable::continuous("y").with_bounds(1.0, 3.0))
        .unwrap();
    let top = model
        .add_symbol(Symbol::exact_max("top", vec![x.into(), y.into()]))
        .unwrap();
    model.minimize(top, "top").unwrap();
    let (objective, value) = solved_symbol(&mut model, top);
    assert_close(objective, 1.0);
    assert_close(value, 1.0);
}

// ── Failures ──

#[test]
fn test_infeasible_is_definitive() {
    let mut model = MechanismModel::new("infeasible");
    let x = model
        .add_variable(Variable::continuous("x").with_bounds(0.0, 1.0))
        .unwrap();
    model
        .add_constraint(Polynomial::from(x).ge_scalar(2.0), "impossible")
        .unwrap();
    model.minimize(x, "x").unwrap();
    let err = solve(&model).unwrap_err();
    assert!(err.is_definitive(), "{err}");
}

#[test]
fn test_quadratic_model_unsupported() {
    init_tracing();
    let mut model = MechanismModel::new("quadratic");
    let x = model
        .add_variable(Variable::continuous("x").with_bounds(0.0, 1.0))
        .unwrap();
    model
        .minimize(Polynomial::quadratic_term(x, x, 1.0), "square")
        .unwrap();
    let compiled: IntermediateModel = QuadraticTetradModel::compile(&model).unwrap().into();
    let err = highs_solver()
        .solve(&compiled, &SolverConfig::new(), None)
        .unwrap_err();
    assert_eq!(err.code(), "SOLVER_UNSUPPORTED_MODEL");
    assert!(!err.is_definitive());
}

#[test]
fn test_serial_chain_with_highs() {
    let (mut model, x, y) = and_model();
    model.maximize(x + y, "total").unwrap();
    let compiled: IntermediateModel = LinearTriadModel::compile(&model).unwrap().into();

    let serial = SerialCombinatorialSolver::new()
        .with_solver(AdapterSolver::new("highs-sequential", || {
            HighsAdapter::new().with_parallel_dump(false).with_chunk_count(2)
        }))
        .with_solver(highs_solver());
    let output = serial
        .solve(&compiled, &SolverConfig::new().with_thread_count(1), None)
        .unwrap();
    assert_close(output.objective, 3.0);
}

#[test]
fn test_callback_cancel_terminates() {
    let (mut model, x, y) = and_model();
    model.maximize(x + y, "total").unwrap();
    let compiled: IntermediateModel = LinearTriadModel::compile(&model).unwrap().into();

    let cancel: StatusCallback = Arc::new(|status: &SolvingStatus| {
        assert_eq!(status.solver_name, "highs");
        Err(CancelRequest::new("stop"))
    });
    let err = highs_solver()
        .solve(&compiled, &SolverConfig::new(), Some(cancel))
        .unwrap_err();
    assert_eq!(err.code(), "SOLVER_ENGINE_TERMINATED");
}

// ── Early stop on a running engine ──

/// Market split: equal-halves partition of weights over several rows, with
/// slack priced in the objective. The LP bound stays at zero for a long time,
/// so branch and bound grinds without improving.
fn market_split_model(rows: usize, items: usize) -> IntermediateModel {
    let mut model = MechanismModel::new("market_split");
    let picks: Vec<VariableId> = (0..items)
        .map(|item| {
            model
                .add_variable(Variable::binary(format!("pick_{item}")))
                .unwrap()
        })
        .collect();
    let mut seed: u64 = 0x5eed;
    let mut slack = Vec::new();
    for row in 0..rows {
        let weights: Vec<f64> = (0..items)
            .map(|_| {
                seed = seed
                    .wrapping_mul(6_364_136_223_846_793_005)
                    .wrapping_add(1_442_695_040_888_963_407);
                ((seed >> 33) % 100) as f64
            })
            .collect();
        let target = (weights.iter().sum::<f64>() / 2.0).floor();
        let over = model
            .add_variable(Variable::continuous(format!("over_{row}")).with_bounds(0.0, 1e4))
            .unwrap();
        let under = model
            .add_variable(Variable::continuous(format!("under_{row}")).with_bounds(0.0, 1e4))
            .unwrap();
        let total: Polynomial = picks
            .iter()
            .zip(&weights)
            .map(|(&id, &weight)| Polynomial::from(id) * weight)
            .sum();
        model
            .add_constraint(
                (total - over + under).eq_scalar(target),
                format!("split:{row}"),
            )
            .unwrap();
        slack.push(over);
        slack.push(under);
    }
    let deviation: Polynomial = slack.iter().map(|&id| Polynomial::from(id)).sum();
    model.minimize(deviation, "deviation").unwrap();
    LinearTriadModel::compile(&model).unwrap().into()
}

#[test]
fn test_stalled_search_stops_before_time_limit() {
    init_tracing();
    let compiled = market_split_model(4, 30);
    let time_limit = Duration::from_secs(120);
    let config = SolverConfig::new()
        .with_thread_count(1)
        .with_time_limit(time_limit)
        .with_no_improvement_time_limit(Duration::from_secs(1));

    let started = Instant::now();
    let err = highs_solver().solve(&compiled, &config, None).unwrap_err();
    let elapsed = started.elapsed();
    assert_eq!(err.code(), "SOLVER_ENGINE_TERMINATED", "{err}");
    assert!(
        elapsed < time_limit / 4,
        "engine ran {elapsed:?} despite stalling"
    );
}

#[test]
fn test_callback_cancel_interrupts_running_engine() {
    init_tracing();
    let compiled = market_split_model(4, 30);
    let time_limit = Duration::from_secs(120);
    let config = SolverConfig::new()
        .with_thread_count(1)
        .with_time_limit(time_limit);

    let cancel: StatusCallback = Arc::new(|status: &SolvingStatus| {
        if status.elapsed >= Duration::from_millis(200) {
            Err(CancelRequest::new("enough"))
        } else {
            Ok(())
        }
    });
    let started = Instant::now();
    let err = highs_solver()
        .solve(&compiled, &config, Some(cancel))
        .unwrap_err();
    let elapsed = started.elapsed();
    assert_eq!(err.code(), "SOLVER_ENGINE_TERMINATED");
    assert!(err.to_string().contains("enough"), "{err}");
    assert!(
        elapsed < time_limit / 4,
        "cancel took {elapsed:?} to reach the engine"
    );
}

#[test]
fn test_warm_start_columns_are_accepted() {
    let (mut model, x, y) = and_model();
    model.maximize(x + y, "total").unwrap();
    model.set_variable_result(x, 1.0);
    model.set_variable_result(y, 1.0);
    assert!(model.prepare_warm_start() > 0);

    let compiled = LinearTriadModel::compile(&model).unwrap();
    assert!(compiled.columns.iter().any(|column| column.initial.is_some()));
    let output = highs_solver()
        .solve(&compiled.into(), &SolverConfig::new(), None)
        .unwrap();
    assert_close(output.objective, 3.0);
}
