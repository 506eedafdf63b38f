//! Generated benchmark models and their staged execution.
//!
//! Every case runs the same pipeline and records one measurement per stage:
//! `variables`, `symbols`, `constraints`, `compile`, optionally `solve`, and
//! a closing `total` spanning all of them.

use clap::ValueEnum;
use std::error::Error;
use std::time::Instant;
use tetra_core::{
    IntermediateModel, LinearTriadModel, MechanismModel, Polynomial, Symbol, Variable, VariableId,
};
use tetra_highs::highs_solver;
use tetra_solver::{Solver, SolverConfig};
use tetra_tools::{MeasurementRecorder, StageMeasurement, capture_rss_bytes, rss_delta};
use tracing::debug;

/// Variables summed by each `model-build` cover row.
const COVER_WINDOW: usize = 4;
const MECHANISM_UPPER: f64 = 10.0;
const MECHANISM_CAP: f64 = 8.0;

#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub(crate) enum Scenario {
    /// Continuous covering LP, sized by variable count
    ModelBuild,
    /// Integer chain with abs and max derived functions
    Mechanism,
    /// Square binary assignment, sized by companies
    Assignment,
}

impl Scenario {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Scenario::ModelBuild => "model-build",
            Scenario::Mechanism => "mechanism",
            Scenario::Assignment => "assignment",
        }
    }

    pub(crate) fn default_cases(self) -> &'static [usize] {
        match self {
            Scenario::ModelBuild => &[100, 1_000, 10_000, 100_000],
            Scenario::Mechanism => &[10, 100, 1_000],
            Scenario::Assignment => &[10, 50, 100],
        }
    }

    fn case_prefix(self) -> &'static str {
        match self {
            Scenario::ModelBuild | Scenario::Mechanism => "vars",
            Scenario::Assignment => "companies",
        }
    }

    pub(crate) fn case(self, size: usize, constraints: Option<usize>) -> CaseConfig {
        CaseConfig {
            name: format!("{}_{size}", self.case_prefix()),
            size,
            constraints,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CaseConfig {
    pub name: String,
    pub size: usize,
    /// Explicit cover-row count for `model-build`
    pub constraints: Option<usize>,
}

#[derive(Debug, Clone)]
pub(crate) struct CaseOptions<'a> {
    pub constraint_ratio: f64,
    pub solver_config: Option<&'a SolverConfig>,
    pub collect_lp: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SolveOutcome {
    pub status: String,
    pub objective: Option<f64>,
}

#[derive(Debug, Clone)]
pub(crate) struct CaseExecution {
    pub variables: usize,
    pub constraints: usize,
    pub columns: usize,
    pub rows: usize,
    pub stage_measurements: Vec<StageMeasurement>,
    pub outcome: Option<SolveOutcome>,
    pub lp: Option<Vec<u8>>,
}

pub(crate) fn execute_case(
    scenario: Scenario,
    case: &CaseConfig,
    options: &CaseOptions<'_>,
) -> Result<CaseExecution, Box<dyn Error>> {
    let mut model = MechanismModel::new(format!("{}_{}", scenario.as_str(), case.name));
    let mut recorder = MeasurementRecorder::new();

    let total_started = Instant::now();
    let total_rss_before = capture_rss_bytes("bench_total");

    match scenario {
        Scenario::ModelBuild => {
            let rows = cover_row_count(case, options.constraint_ratio);
            build_cover(&mut model, &mut recorder, case.size, rows)?;
        }
        Scenario::Mechanism => build_mechanism(&mut model, &mut recorder, case.size.max(2))?,
        Scenario::Assignment => build_assignment(&mut model, &mut recorder, case.size.max(1))?,
    }

    let stage = recorder.begin_stage("compile");
    let compiled = LinearTriadModel::compile(&model)?;
    recorder.end_stage(stage);

    let columns = compiled.num_columns();
    let rows = compiled.num_rows();
    let lp = if options.collect_lp {
        let mut buffer = Vec::new();
        compiled.export_lp(&mut buffer)?;
        Some(buffer)
    } else {
        None
    };

    let outcome = match options.solver_config {
        Some(config) => {
            let intermediate: IntermediateModel = compiled.into();
            let stage = recorder.begin_stage("solve");
            let result = highs_solver().solve(&intermediate, config, None);
            recorder.end_stage(stage);
            Some(match result {
                Ok(output) => SolveOutcome {
                    status: output.status.as_str().to_string(),
                    objective: Some(output.objective),
                },
                Err(err) => SolveOutcome {
                    status: err.code().to_string(),
                    objective: None,
                },
            })
        }
        None => None,
    };

    let total_duration = total_started.elapsed();
    let total_rss_after = capture_rss_bytes("bench_total");
    recorder.push(StageMeasurement {
        stage: "total".to_string(),
        duration: total_duration,
        rss_before_bytes: total_rss_before,
        rss_after_bytes: total_rss_after,
        rss_delta_bytes: rss_delta(total_rss_before, total_rss_after),
    });

    debug!(
        component = "bench",
        operation = "execute_case",
        status = "success",
        scenario = scenario.as_str(),
        case = case.name.as_str(),
        variables = model.num_variables(),
        symbols = model.num_symbols(),
        columns,
        rows,
        duration_ms = total_duration.as_secs_f64() * 1000.0,
        "Case executed"
    );

    Ok(CaseExecution {
        variables: model.num_variables(),
        constraints: model.num_constraints(),
        columns,
        rows,
        stage_measurements: recorder.into_stages(),
        outcome,
        lp,
    })
}

fn cover_row_count(case: &CaseConfig, constraint_ratio: f64) -> usize {
    case.constraints
        .unwrap_or_else(|| (case.size as f64 * constraint_ratio).round() as usize)
        .max(1)
}

// ── model-build ──

fn build_cover(
    model: &mut MechanismModel,
    recorder: &mut MeasurementRecorder,
    size: usize,
    rows: usize,
) -> Result<(), Box<dyn Error>> {
    let stage = recorder.begin_stage("variables");
    let mut x = Vec::with_capacity(size);
    for index in 0..size {
        let variable = Variable::ucontinuous(format!("x_{index}")).with_bounds(0.0, 1_000.0);
        x.push(model.add_variable(variable)?);
    }
    recorder.end_stage(stage);

    let stage = recorder.begin_stage("symbols");
    recorder.end_stage(stage);

    let stage = recorder.begin_stage("constraints");
    if !x.is_empty() {
        let window = COVER_WINDOW.min(x.len());
        for row in 0..rows {
            let start = row * (COVER_WINDOW - 1);
            let cover: Polynomial = (0..window)
                .map(|offset| Polynomial::from(x[(start + offset) % x.len()]))
                .sum();
            model.add_constraint(cover.ge_scalar(1.0), format!("cover:{row}"))?;
        }
    }
    let cost: Polynomial = x
        .iter()
        .enumerate()
        .map(|(index, &id)| Polynomial::from(id) * (1 + index % 7) as f64)
        .sum();
    model.minimize(cost, "cost")?;
    recorder.end_stage(stage);
    Ok(())
}

// ── mechanism ──

fn build_mechanism(
    model: &mut MechanismModel,
    recorder: &mut MeasurementRecorder,
    size: usize,
) -> Result<(), Box<dyn Error>> {
    let stage = recorder.begin_stage("variables");
    let mut x: Vec<VariableId> = Vec::with_capacity(size);
    for index in 0..size {
        let variable = Variable::integer(format!("x_{index}")).with_bounds(0.0, MECHANISM_UPPER);
        x.push(model.add_variable(variable)?);
    }
    recorder.end_stage(stage);

    let stage = recorder.begin_stage("symbols");
    let mut gaps = Vec::with_capacity(size - 1);
    let mut peaks = Vec::with_capacity(size / 2);
    for (index, pair) in x.windows(2).enumerate() {
        let gap = Symbol::abs(format!("gap_{index}"), pair[0] - pair[1]);
        gaps.push(model.add_symbol(gap)?);
        if index % 2 == 0 {
            peaks.push(model.add_symbol(Symbol::max(
                format!("peak_{index}"),
                vec![pair[0].into(), pair[1].into()],
            ))?);
        }
    }
    recorder.end_stage(stage);

    let stage = recorder.begin_stage("constraints");
    let total: Polynomial = x.iter().map(|&id| Polynomial::from(id)).sum();
    let level = size as f64 * MECHANISM_UPPER / 2.0;
    model.add_constraint(total.ge_scalar(level), "level")?;
    for (index, &peak) in peaks.iter().enumerate() {
        let cap = Polynomial::from(peak).le_scalar(MECHANISM_CAP);
        model.add_constraint(cap, format!("cap:{index}"))?;
    }
    let spread: Polynomial = gaps.iter().map(|&id| Polynomial::from(id)).sum();
    model.minimize(spread, "spread")?;
    recorder.end_stage(stage);
    Ok(())
}

// ── assignment ──

pub(crate) fn assignment_cost(company: usize, product: usize) -> f64 {
    ((company * 7 + product * 13) % 97 + 1) as f64
}

fn build_assignment(
    model: &mut MechanismModel,
    recorder: &mut MeasurementRecorder,
    size: usize,
) -> Result<(), Box<dyn Error>> {
    let stage = recorder.begin_stage("variables");
    let mut assign = Vec::with_capacity(size);
    for _ in 0..size {
        let company = model.indexes_mut().next("company");
        let mut row = Vec::with_capacity(size);
        for product in 0..size {
            let variable = Variable::binary(format!("assign_{company}_{product}"));
            row.push(model.add_variable(variable)?);
        }
        assign.push(row);
    }
    recorder.end_stage(stage);

    let stage = recorder.begin_stage("symbols");
    recorder.end_stage(stage);

    let stage = recorder.begin_stage("constraints");
    for (company, row) in assign.iter().enumerate() {
        let total: Polynomial = row.iter().map(|&id| Polynomial::from(id)).sum();
        model.add_constraint(total.le_scalar(1.0), format!("company:{company}"))?;
    }
    for product in 0..size {
        let total: Polynomial = assign.iter().map(|row| Polynomial::from(row[product])).sum();
        model.add_constraint(total.eq_scalar(1.0), format!("product:{product}"))?;
    }
    let cost: Polynomial = assign
        .iter()
        .enumerate()
        .flat_map(|(company, row)| {
            row.iter()
                .enumerate()
                .map(move |(product, &id)| {
                    Polynomial::from(id) * assignment_cost(company, product)
                })
        })
        .sum();
    model.minimize(cost, "cost")?;
    recorder.end_stage(stage);
    Ok(())
}
