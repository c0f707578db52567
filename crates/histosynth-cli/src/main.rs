mod registry;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use histosynth_core::{Error as CoreError, PipelineConfig, build_stage_graph_report};
use histosynth_eval::{EvalError, IntegrityValidator, ValidateOptions, ValidationReport};
use histosynth_generate::output::{write_full_view, write_synthesized};
use histosynth_generate::{
    GenerationEngine, GenerationError, fixtures, load_history, merge_full_view,
};
use registry::{RunContext, RunPaths, init_run_logging, start_run, write_generation_report};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("config error: {0}")]
    Config(#[from] CoreError),
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("validation error: {0}")]
    Eval(#[from] EvalError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("validation failed with {violations} violation(s); see {report}")]
    ValidationFailed { violations: usize, report: PathBuf },
}

#[derive(Parser, Debug)]
#[command(name = "histosynth", version, about = "Histosynth CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Synthesize future years on top of a history and validate them.
    Generate(GenerateArgs),
    /// Print the JSON schema of the pipeline config.
    ConfigSchema(ConfigSchemaArgs),
    /// Print the stage dependency graph and execution order.
    Stages,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Directory with `<table>.csv` history files.
    #[arg(long, value_name = "DIR", required_unless_present = "fixture")]
    history: Option<PathBuf>,
    /// Use the built-in sample history instead of CSV files.
    #[arg(long, default_value_t = false, conflicts_with = "history")]
    fixture: bool,
    /// Pipeline config (TOML).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// First generated year.
    #[arg(long)]
    start_year: Option<i32>,
    /// Number of generated years.
    #[arg(long)]
    num_years: Option<u32>,
    /// Seed for every random stream.
    #[arg(long)]
    seed: Option<u64>,
    /// Output directory for runs.
    #[arg(long, default_value = "runs")]
    run_dir: PathBuf,
    /// Violations listed in report.md.
    #[arg(long, default_value_t = 20)]
    max_examples: usize,
}

#[derive(Args, Debug)]
struct ConfigSchemaArgs {
    /// Write the schema to a file instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::ConfigSchema(args) => run_config_schema(args),
        Command::Stages => run_stages(),
    }
}

fn run_generate(args: GenerateArgs) -> Result<(), CliError> {
    let GenerateArgs {
        history,
        fixture,
        config,
        start_year,
        num_years,
        seed,
        run_dir,
        max_examples,
    } = args;

    let mut pipeline = match &config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(start_year) = start_year {
        pipeline.start_year = start_year;
    }
    if let Some(num_years) = num_years {
        pipeline.num_years = num_years;
    }
    if let Some(seed) = seed {
        pipeline.seed = seed;
    }
    pipeline.validate()?;

    let history_source = match (&history, fixture) {
        (Some(dir), false) => dir.display().to_string(),
        (None, true) => "fixture".to_string(),
        _ => {
            return Err(CliError::InvalidConfig(
                "use either --history or --fixture".to_string(),
            ));
        }
    };

    let run_id = Uuid::new_v4().to_string();
    let run_ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        run_dir,
        history: history_source,
        strict: true,
        config: pipeline.clone(),
    };

    let run_paths = start_run(&run_ctx)?;
    let _log_guard = init_run_logging(&run_paths.logs_path, &run_id)?;

    tracing::info!(
        event = "run_started",
        run_id = %run_id,
        seed = pipeline.seed,
        start_year = pipeline.start_year,
        num_years = pipeline.num_years
    );
    let timer = Instant::now();

    let history = match &history {
        Some(dir) => load_history(dir)?,
        None => fixtures::sample_history(),
    };
    tracing::info!(
        event = "history_loaded",
        orders = history.orders.len(),
        customers = history.customers.len()
    );

    let mut result = match GenerationEngine::new(pipeline.clone()).run(&history) {
        Ok(result) => result,
        Err(err) => {
            tracing::error!(event = "run_finished", status = "failed", error = %err);
            return Err(err.into());
        }
    };

    let validator = IntegrityValidator::new(
        pipeline,
        ValidateOptions {
            strict: true,
            max_examples,
        },
    );
    let report = match validator.validate(&history, &result, Some(run_id.clone())) {
        Ok(report) => report,
        Err(EvalError::Violations(report)) => {
            let violations = report.violations.len();
            let paths = validator.write_report(&report, &run_paths.root)?;
            write_generation_report(&run_paths, &result.report)?;
            tracing::error!(event = "run_finished", status = "failed", violations);
            return Err(CliError::ValidationFailed {
                violations,
                report: paths.report_path,
            });
        }
        Err(err) => return Err(err.into()),
    };
    validator.write_report(&report, &run_paths.root)?;

    write_tables(&run_paths, &history, &mut result)?;
    write_generation_report(&run_paths, &result.report)?;
    log_summary(&report);

    let duration_ms = timer.elapsed().as_millis();
    tracing::info!(event = "run_finished", status = "success", duration_ms = duration_ms);
    println!("{}", run_paths.root.display());

    Ok(())
}

fn write_tables(
    paths: &RunPaths,
    history: &histosynth_core::History,
    result: &mut histosynth_generate::GenerationResult,
) -> Result<(), CliError> {
    let mut files = write_synthesized(&paths.new_dir, &result.tables)?;
    tracing::info!(event = "tables_written", path = %paths.new_dir.display(), files = files.len());

    let view = merge_full_view(history, &result.profile, &result.tables);
    let full = write_full_view(&paths.full_dir, &view)?;
    tracing::info!(event = "full_view_written", path = %paths.full_dir.display(), files = full.len());

    files.extend(full);
    result.report.files = files;
    Ok(())
}

fn log_summary(report: &ValidationReport) {
    for year in &report.years {
        tracing::info!(
            event = "year_summary",
            year = year.year,
            orders = year.orders,
            order_growth = year.order_growth,
            customer_growth = year.customer_growth
        );
    }
}

fn run_config_schema(args: ConfigSchemaArgs) -> Result<(), CliError> {
    let schema = schemars::schema_for!(PipelineConfig);
    let json = serde_json::to_string_pretty(&schema)?;
    match args.out {
        Some(path) => std::fs::write(&path, json).map_err(|err| {
            CliError::InvalidConfig(format!("cannot write {}: {err}", path.display()))
        }),
        None => {
            println!("{json}");
            Ok(())
        }
    }
}

fn run_stages() -> Result<(), CliError> {
    let report = build_stage_graph_report();
    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.topo_order.is_none() {
        return Err(CliError::InvalidConfig(
            "stage dependencies contain a cycle".to_string(),
        ));
    }
    Ok(())
}
