#![allow(clippy::float_cmp)]

use tetra_core::{
    Cell, CellKey, CompileError, LinearTriadModel, MechanismModel, Polynomial, QuadraticTetradModel,
    Sense, Sign, Symbol, Variable, VariableType,
};

fn knapsack() -> MechanismModel {
    let mut model = MechanismModel::new("knapsack");
    let x = model
        .add_variable(Variable::integer("x").with_bounds(0.0, 4.0))
        .unwrap();
    let y = model
        .add_variable(Variable::continuous("y").with_bounds(1.0, 6.0))
        .unwrap();
    let total = model.add_symbol(Symbol::expression("total", x + y)).unwrap();
    model
        .add_constraint(
            (Polynomial::from(total) * 2.0 + 1.0).le_scalar(9.0),
            "cap",
        )
        .unwrap();
    model
        .add_constraint(Polynomial::from(x).ge_expr(&Polynomial::from(y)), "order")
        .unwrap();
    model.maximize(x * 3.0 + y, "value").unwrap();
    model
}

fn linear_cells(cells: &[Cell]) -> Vec<(usize, f64)> {
    cells
        .iter()
        .map(|cell| match cell.key {
            CellKey::Linear(column) => (column, cell.coefficient),
            other => panic!("unexpected cell {other:?}"),
        })
        .collect()
}

#[test]
fn rows_follow_declaration_order_with_symbols_flattened() {
    let model = knapsack();
    let triad = LinearTriadModel::compile(&model).unwrap();
    assert_eq!(triad.num_columns(), 2);
    assert_eq!(triad.num_rows(), 2);
    assert_eq!(triad.rows[0].name, "cap");
    assert_eq!(linear_cells(&triad.rows[0].cells), vec![(0, 2.0), (1, 2.0)]);
    assert_eq!(triad.rows[0].rhs, 8.0);
    assert_eq!(triad.rows[1].sign, Sign::GreaterEqual);
    assert_eq!(linear_cells(&triad.rows[1].cells), vec![(0, 1.0), (1, -1.0)]);
    assert_eq!(triad.objective.sense, Sense::Maximize);
    assert_eq!(triad.columns[1].lower, 1.0);
    assert_eq!(triad.columns[0].kind, VariableType::Integer);
}

#[test]
fn missing_objective_and_empty_models_fail() {
    let empty = MechanismModel::new("empty");
    assert_eq!(
        LinearTriadModel::compile(&empty),
        Err(CompileError::EmptyModel)
    );
    let mut model = MechanismModel::new("m");
    model.add_variable(Variable::binary("b")).unwrap();
    assert_eq!(
        LinearTriadModel::compile(&model),
        Err(CompileError::NoObjective)
    );
}

#[test]
fn empty_ranges_stop_compilation() {
    let mut model = knapsack();
    let x = model.variable_by_name("x").unwrap();
    model.variable_mut(x).unwrap().range_mut().leq(-1.0);
    let error = LinearTriadModel::compile(&model).unwrap_err();
    assert_eq!(error.code(), "VARIABLE_EMPTY_RANGE");
}

#[test]
fn quadratic_cells_need_the_tetrad_model() {
    let mut model = MechanismModel::new("q");
    let x = model
        .add_variable(Variable::continuous("x").with_bounds(0.0, 2.0))
        .unwrap();
    let y = model
        .add_variable(Variable::continuous("y").with_bounds(0.0, 2.0))
        .unwrap();
    let total = model.add_symbol(Symbol::expression("total", x + y)).unwrap();
    let square = Polynomial::from(total)
        .try_mul(&Polynomial::from(total))
        .unwrap();
    model.minimize(square, "spread").unwrap();

    assert_eq!(
        LinearTriadModel::compile(&model),
        Err(CompileError::QuadraticCell {
            row: "objective".to_string()
        })
    );
    let tetrad = QuadraticTetradModel::compile(&model).unwrap();
    assert!(tetrad.is_quadratic());
    let keys: Vec<_> = tetrad.objective.cells.iter().map(|cell| cell.key).collect();
    assert_eq!(
        keys,
        vec![
            CellKey::Quadratic(0, 0),
            CellKey::Quadratic(0, 1),
            CellKey::Quadratic(1, 1)
        ]
    );
    assert_eq!(tetrad.objective_value(&[1.0, 2.0]), 9.0);
    assert!(tetrad.to_linear().is_err());
}

#[test]
fn symbol_products_above_degree_two_fail() {
    let mut model = MechanismModel::new("q");
    let x = model
        .add_variable(Variable::continuous("x").with_bounds(0.0, 2.0))
        .unwrap();
    let square = model
        .add_symbol(Symbol::expression(
            "square",
            Polynomial::from(x).try_mul(&Polynomial::from(x)).unwrap(),
        ))
        .unwrap();
    model
        .minimize(Polynomial::from(square).try_mul(&Polynomial::from(x)).unwrap(), "cube")
        .unwrap();
    assert!(matches!(
        QuadraticTetradModel::compile(&model),
        Err(CompileError::DegreeOverflow { .. })
    ));
}

#[test]
fn removed_tokens_compact_the_column_space() {
    let mut model = MechanismModel::new("m");
    let a = model.add_variable(Variable::binary("a")).unwrap();
    let b = model.add_variable(Variable::binary("b")).unwrap();
    let c = model.add_variable(Variable::binary("c")).unwrap();
    model.remove_variable_token(b).unwrap();
    model.minimize(a + c, "obj").unwrap();
    let triad = LinearTriadModel::compile(&model).unwrap();
    let names: Vec<_> = triad.columns.iter().map(|column| column.name.as_str()).collect();
    assert_eq!(names, vec!["a", "c"]);
    assert_eq!(linear_cells(&triad.objective.cells), vec![(0, 1.0), (1, 1.0)]);
}

#[test]
fn token_results_become_initial_values() {
    let mut model = knapsack();
    model.set_solution(&[2.0, 1.5]).unwrap();
    let triad = LinearTriadModel::compile(&model).unwrap();
    assert_eq!(triad.columns[0].initial, Some(2.0));
    assert_eq!(triad.columns[1].initial, Some(1.5));
}

#[test]
fn kind_queries_and_relaxation() {
    let mut model = MechanismModel::new("m");
    let b = model.add_variable(Variable::binary("b")).unwrap();
    let n = model.add_variable(Variable::uinteger("n")).unwrap();
    model.minimize(b + n, "obj").unwrap();
    let triad = LinearTriadModel::compile(&model).unwrap();
    assert!(triad.contains_binary());
    assert!(triad.contains_integer());
    assert!(triad.contains_not_binary_integer());

    let relaxed = triad.linear_relax();
    assert!(!relaxed.contains_integer());
    assert_eq!(relaxed.columns[0].kind, VariableType::Percentage);
    assert_eq!(relaxed.columns[1].kind, VariableType::UContinuous);
}

#[test]
fn normalize_moves_non_zero_bounds_into_rows() {
    let triad = LinearTriadModel::compile(&knapsack()).unwrap();
    let normalized = triad.normalize();
    let extra: Vec<_> = normalized.rows[2..]
        .iter()
        .map(|row| (row.name.as_str(), row.sign, row.rhs))
        .collect();
    assert_eq!(
        extra,
        vec![
            ("x_ub", Sign::LessEqual, 4.0),
            ("y_lb", Sign::GreaterEqual, 1.0),
            ("y_ub", Sign::LessEqual, 6.0),
        ]
    );
    assert_eq!(normalized.columns[0].lower, 0.0);
    assert_eq!(normalized.columns[0].upper, f64::INFINITY);
    assert_eq!(normalized.columns[1].lower, f64::NEG_INFINITY);
}

#[test]
fn dual_transposes_rows_and_reverses_sense() {
    // min 2a + 3b  s.t.  a + b >= 4,  a - b <= 1,  a, b >= 0
    let mut model = MechanismModel::new("lp");
    let a = model.add_variable(Variable::ucontinuous("a")).unwrap();
    let b = model.add_variable(Variable::ucontinuous("b")).unwrap();
    model.add_constraint((a + b).ge_scalar(4.0), "demand").unwrap();
    model.add_constraint((a - b).le_scalar(1.0), "balance").unwrap();
    model.minimize(a * 2.0 + b * 3.0, "cost").unwrap();

    let dual = LinearTriadModel::compile(&model).unwrap().dual();
    assert_eq!(dual.name, "lp-dual");
    assert_eq!(dual.objective.sense, Sense::Maximize);
    assert_eq!(linear_cells(&dual.objective.cells), vec![(0, 4.0), (1, 1.0)]);
    assert_eq!(dual.columns[0].name, "demand_dual");
    assert_eq!((dual.columns[0].lower, dual.columns[0].upper), (0.0, f64::INFINITY));
    assert_eq!(
        (dual.columns[1].lower, dual.columns[1].upper),
        (f64::NEG_INFINITY, 0.0)
    );
    assert_eq!(dual.rows.len(), 2);
    assert_eq!(dual.rows[0].name, "a");
    assert_eq!(dual.rows[0].sign, Sign::LessEqual);
    assert_eq!(linear_cells(&dual.rows[0].cells), vec![(0, 1.0), (1, 1.0)]);
    assert_eq!(dual.rows[1].rhs, 3.0);
    assert_eq!(linear_cells(&dual.rows[1].cells), vec![(0, 1.0), (1, -1.0)]);

    // Primal optimum a = 2.5, b = 1.5 (cost 9.5); dual y = (2.5, -0.5).
    let primal = LinearTriadModel::compile(&model).unwrap();
    assert_eq!(primal.objective_value(&[2.5, 1.5]), 9.5);
    assert!(primal.violated_rows(&[2.5, 1.5], 1e-9).is_empty());
    assert_eq!(dual.objective_value(&[2.5, -0.5]), 9.5);
    assert!(dual.violated_rows(&[2.5, -0.5], 1e-9).is_empty());
}

#[test]
fn lp_export_has_every_section() {
    let mut model = MechanismModel::new("export");
    let x = model
        .add_variable(Variable::integer("x").with_bounds(0.0, 4.0))
        .unwrap();
    let b = model.add_variable(Variable::binary("b")).unwrap();
    let y = model.add_variable(Variable::continuous("y")).unwrap();
    model
        .add_constraint((x + b * 2.0 - y).le_scalar(3.0), "cap")
        .unwrap();
    model.minimize(x - b + 1.5, "cost").unwrap();

    let mut buffer = Vec::new();
    LinearTriadModel::compile(&model)
        .unwrap()
        .export_lp(&mut buffer)
        .unwrap();
    let text = String::from_utf8(buffer).unwrap();
    let expected = "\
\\ Problem: export
Minimize
 obj: x - b + 1.5
Subject To
 cap: x + 2 b - y <= 3
Bounds
 0 <= x <= 4
 y free
Generals
 x
Binaries
 b
End
";
    assert_eq!(text, expected);
}

#[test]
fn quadratic_lp_export_uses_bracket_syntax() {
    let mut model = MechanismModel::new("qp");
    let x = model.add_variable(Variable::ucontinuous("x")).unwrap();
    let y = model.add_variable(Variable::ucontinuous("y")).unwrap();
    let xy = Polynomial::from(x).try_mul(&Polynomial::from(y)).unwrap();
    let xx = Polynomial::from(x).try_mul(&Polynomial::from(x)).unwrap();
    model
        .add_constraint_parts(xy * 3.0, Sign::LessEqual, 4.0, "bilinear")
        .unwrap();
    model.minimize(xx + y, "cost").unwrap();

    let mut buffer = Vec::new();
    QuadraticTetradModel::compile(&model)
        .unwrap()
        .export_lp(&mut buffer)
        .unwrap();
    let text = String::from_utf8(buffer).unwrap();
    assert!(text.contains(" obj: y + [ 2 x ^ 2 ] / 2\n"), "{text}");
    assert!(text.contains(" bilinear: [ 3 x * y ] <= 4\n"), "{text}");
}
