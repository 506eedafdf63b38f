mod records;
mod scenario;

use clap::{Parser, Subcommand, ValueEnum};
use records::{
    BenchRecord, case_records, load_records_jsonl, print_case_table, summarize_cases,
    write_records_jsonl,
};
use scenario::{CaseConfig, CaseOptions, Scenario, execute_case};
use std::error::Error;
use std::fs::{self, create_dir_all};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tetra_solver::SolverConfig;
use tetra_tools::{LogOptions, init_logging};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Tetra benchmark runner and reporting interface"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build, compile and optionally solve generated models; save JSONL artifacts
    Run(RunArgs),
    /// Summarize a benchmark artifact per case
    Report(ReportArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Benchmark scenarios to execute
    #[arg(
        long = "scenario",
        value_enum,
        value_delimiter = ',',
        default_value = "model-build"
    )]
    scenarios: Vec<Scenario>,

    /// Comma-separated case sizes (variables, or companies for assignment)
    #[arg(long, value_delimiter = ',')]
    cases: Option<Vec<usize>>,

    /// Run a single case of this size
    #[arg(long)]
    variables: Option<usize>,

    /// Override the number of model-build cover rows for --variables
    #[arg(long, requires = "variables")]
    constraints: Option<usize>,

    /// Cover rows per variable when explicit constraints are not provided
    #[arg(long, default_value_t = 0.01)]
    constraint_ratio: f64,

    /// Number of repetitions per case
    #[arg(long, default_value_t = 1)]
    repetitions: u32,

    /// Solve each compiled model with HiGHS
    #[arg(long)]
    solve: bool,

    /// JSON solver configuration (implies --solve)
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSONL output artifact path
    #[arg(long)]
    output: Option<PathBuf>,

    /// Output format for stdout
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Directory to write compiled models in LP format
    #[arg(long)]
    write_lp: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ReportArgs {
    /// Input JSONL benchmark artifact
    #[arg(long)]
    input: PathBuf,

    /// Output format for stdout
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Ndjson,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    init_logging(&LogOptions::from_env()?)?;
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run_command(args),
        Command::Report(args) => report_command(args),
    }
}

fn run_command(args: RunArgs) -> Result<(), Box<dyn Error>> {
    if args.repetitions == 0 {
        return Err(boxed_input_error("repetitions must be greater than zero"));
    }
    if args.constraint_ratio <= 0.0 {
        return Err(boxed_input_error(
            "constraint-ratio must be greater than zero",
        ));
    }

    let solver_config = match (&args.config, args.solve) {
        (Some(path), _) => Some(load_solver_config(path)?),
        (None, true) => Some(SolverConfig::default()),
        (None, false) => None,
    };
    let options = CaseOptions {
        constraint_ratio: args.constraint_ratio,
        solver_config: solver_config.as_ref(),
        collect_lp: args.write_lp.is_some(),
    };

    let run_id = build_run_id()?;
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("artifacts/bench/{run_id}.jsonl")));

    let mut records = Vec::new();
    for &scenario in &args.scenarios {
        for case in resolve_cases(scenario, &args) {
            for repetition in 1..=args.repetitions {
                let execution = execute_case(scenario, &case, &options)?;
                if let (Some(base_dir), Some(lp)) = (&args.write_lp, &execution.lp) {
                    let dir = base_dir
                        .join(scenario.as_str())
                        .join(&case.name)
                        .join(format!("rep_{repetition}"));
                    write_lp(&dir, lp)?;
                }
                records.extend(case_records(
                    &run_id,
                    scenario,
                    &case.name,
                    repetition,
                    &execution,
                ));
            }
        }
    }

    write_records_jsonl(&output_path, &records)?;
    render_output(args.format, &records)?;
    println!("artifact: {}", output_path.display());
    debug!(
        component = "bench",
        operation = "run",
        status = "complete",
        run_id = run_id.as_str(),
        records = records.len(),
        "Benchmark run finished"
    );

    Ok(())
}

fn report_command(args: ReportArgs) -> Result<(), Box<dyn Error>> {
    let records = load_records_jsonl(&args.input)?;
    render_output(args.format, &records)?;
    Ok(())
}

fn resolve_cases(scenario: Scenario, args: &RunArgs) -> Vec<CaseConfig> {
    if let Some(size) = args.variables {
        return vec![scenario.case(size, args.constraints)];
    }
    args.cases
        .clone()
        .unwrap_or_else(|| scenario.default_cases().to_vec())
        .into_iter()
        .map(|size| scenario.case(size, None))
        .collect()
}

fn load_solver_config(path: &Path) -> Result<SolverConfig, Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    let config = serde_json::from_str::<SolverConfig>(&text)
        .map_err(|err| format!("invalid solver config {}: {err}", path.display()))?;
    Ok(config)
}

fn render_output(format: OutputFormat, records: &[BenchRecord]) -> Result<(), Box<dyn Error>> {
    match format {
        OutputFormat::Table => print_case_table(&summarize_cases(records)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(records)?),
        OutputFormat::Ndjson => {
            for record in records {
                println!("{}", serde_json::to_string(record)?);
            }
        }
    }
    Ok(())
}

fn write_lp(dir: &Path, lp: &[u8]) -> std::io::Result<()> {
    create_dir_all(dir)?;
    fs::write(dir.join("model.lp"), lp)
}

fn build_run_id() -> Result<String, Box<dyn Error>> {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|err| std::io::Error::other(err.to_string()))?
        .as_millis();
    Ok(format!("bench_{millis}"))
}

fn boxed_input_error(message: &str) -> Box<dyn Error> {
    Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        message.to_string(),
    ))
}
