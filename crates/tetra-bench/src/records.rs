//! JSONL benchmark artifacts and per-case summaries.

use crate::scenario::{CaseExecution, Scenario};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fs::{File, create_dir_all};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

pub(crate) const SCHEMA_VERSION: u32 = 2;

/// One line of a benchmark artifact: a single stage of a single repetition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct BenchRecord {
    pub schema_version: u32,
    pub run_id: String,
    pub scenario: String,
    pub case_name: String,
    pub repetition: u32,
    pub variables: usize,
    pub constraints: usize,
    #[serde(default)]
    pub columns: usize,
    #[serde(default)]
    pub rows: usize,
    pub stage: String,
    pub duration_ms: f64,
    pub rss_before_bytes: Option<u64>,
    pub rss_after_bytes: Option<u64>,
    pub rss_delta_bytes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solve_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<f64>,
}

/// Stages that build the mechanism model, folded into one `build` column.
const BUILD_STAGES: [&str; 3] = ["variables", "symbols", "constraints"];

/// One case of an artifact: mean stage times across repetitions plus the
/// outcome of its last solve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct CaseSummary {
    pub scenario: String,
    pub case_name: String,
    pub repetitions: usize,
    pub columns: usize,
    pub rows: usize,
    pub build_ms: f64,
    pub compile_ms: f64,
    pub solve_ms: Option<f64>,
    pub total_ms: f64,
    pub peak_rss_bytes: Option<u64>,
    pub solve_status: Option<String>,
    pub objective: Option<f64>,
}

/// Flatten one executed case into per-stage records.
///
/// Solve status and objective are attached to the `solve` and `total` rows.
pub(crate) fn case_records(
    run_id: &str,
    scenario: Scenario,
    case_name: &str,
    repetition: u32,
    execution: &CaseExecution,
) -> Vec<BenchRecord> {
    execution
        .stage_measurements
        .iter()
        .map(|measurement| {
            let outcome = execution
                .outcome
                .as_ref()
                .filter(|_| matches!(measurement.stage.as_str(), "solve" | "total"));
            BenchRecord {
                schema_version: SCHEMA_VERSION,
                run_id: run_id.to_string(),
                scenario: scenario.as_str().to_string(),
                case_name: case_name.to_string(),
                repetition,
                variables: execution.variables,
                constraints: execution.constraints,
                columns: execution.columns,
                rows: execution.rows,
                stage: measurement.stage.clone(),
                duration_ms: measurement.duration_ms(),
                rss_before_bytes: measurement.rss_before_bytes,
                rss_after_bytes: measurement.rss_after_bytes,
                rss_delta_bytes: measurement.rss_delta_bytes,
                solve_status: outcome.map(|outcome| outcome.status.clone()),
                objective: outcome.and_then(|outcome| outcome.objective),
            }
        })
        .collect()
}

// ── Summaries ──

/// Digest records into one summary per case, in artifact order.
pub(crate) fn summarize_cases(records: &[BenchRecord]) -> Vec<CaseSummary> {
    let mut order: Vec<(&str, &str)> = Vec::new();
    let mut cases: BTreeMap<(&str, &str), Vec<&BenchRecord>> = BTreeMap::new();
    for record in records {
        let key = (record.scenario.as_str(), record.case_name.as_str());
        let entry = cases.entry(key).or_default();
        if entry.is_empty() {
            order.push(key);
        }
        entry.push(record);
    }
    order
        .into_iter()
        .filter_map(|key| cases.get(&key).map(|records| summarize_case(key, records)))
        .collect()
}

fn summarize_case((scenario, case_name): (&str, &str), records: &[&BenchRecord]) -> CaseSummary {
    let repetitions = records
        .iter()
        .map(|record| record.repetition)
        .collect::<BTreeSet<_>>()
        .len();
    // Summed per repetition, then averaged over repetitions.
    let mean_ms = |stages: &[&str]| -> Option<f64> {
        let matching: Vec<f64> = records
            .iter()
            .filter(|record| stages.contains(&record.stage.as_str()))
            .map(|record| record.duration_ms)
            .collect();
        (!matching.is_empty()).then(|| matching.iter().sum::<f64>() / repetitions.max(1) as f64)
    };
    let last_solve = records.iter().rev().find(|record| record.stage == "solve");
    let shape = records.last();
    CaseSummary {
        scenario: scenario.to_string(),
        case_name: case_name.to_string(),
        repetitions,
        columns: shape.map_or(0, |record| record.columns),
        rows: shape.map_or(0, |record| record.rows),
        build_ms: mean_ms(&BUILD_STAGES).unwrap_or(0.0),
        compile_ms: mean_ms(&["compile"]).unwrap_or(0.0),
        solve_ms: mean_ms(&["solve"]),
        total_ms: mean_ms(&["total"]).unwrap_or(0.0),
        peak_rss_bytes: records.iter().filter_map(|record| record.rss_after_bytes).max(),
        solve_status: last_solve.and_then(|record| record.solve_status.clone()),
        objective: last_solve.and_then(|record| record.objective),
    }
}

pub(crate) fn print_case_table(cases: &[CaseSummary]) {
    println!(
        "{:<12} {:<14} {:>4} {:>8} {:>8} {:>10} {:>10} {:>10} {:>10} {:>9} {:<12} {:>14}",
        "scenario",
        "case",
        "reps",
        "columns",
        "rows",
        "build_ms",
        "compile_ms",
        "solve_ms",
        "total_ms",
        "peak_mb",
        "status",
        "objective"
    );
    for case in cases {
        println!(
            "{:<12} {:<14} {:>4} {:>8} {:>8} {:>10.3} {:>10.3} {:>10} {:>10.3} {:>9} {:<12} {:>14}",
            case.scenario,
            case.case_name,
            case.repetitions,
            case.columns,
            case.rows,
            case.build_ms,
            case.compile_ms,
            dash_or(case.solve_ms, |ms| format!("{ms:.3}")),
            case.total_ms,
            dash_or(case.peak_rss_bytes, |bytes| format!(
                "{:.1}",
                bytes as f64 / (1024.0 * 1024.0)
            )),
            case.solve_status.as_deref().unwrap_or("-"),
            dash_or(case.objective, |value| format!("{value:.6}")),
        );
    }
}

fn dash_or<T>(value: Option<T>, render: impl FnOnce(T) -> String) -> String {
    value.map_or_else(|| "-".to_string(), render)
}

// ── JSONL ──

pub(crate) fn write_records_jsonl(
    path: &Path,
    records: &[BenchRecord],
) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

pub(crate) fn load_records_jsonl(path: &Path) -> Result<Vec<BenchRecord>, Box<dyn Error>> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str::<BenchRecord>(&line)
            .map_err(|err| format!("{}:{}: {err}", path.display(), index + 1))?;
        records.push(record);
    }
    Ok(records)
}
