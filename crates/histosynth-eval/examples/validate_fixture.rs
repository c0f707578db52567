use std::env;
use std::path::PathBuf;

use histosynth_core::PipelineConfig;
use histosynth_eval::{IntegrityValidator, ValidateOptions};
use histosynth_generate::GenerationEngine;
use histosynth_generate::fixtures::sample_history;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let out_dir = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| env::temp_dir().join("histosynth_validation"));
    let num_years = args
        .next()
        .map(|value| value.parse::<u32>())
        .transpose()?
        .unwrap_or(4);

    let config = PipelineConfig::new(2022, num_years);
    let history = sample_history();
    let result = GenerationEngine::new(config.clone()).run(&history)?;

    let validator = IntegrityValidator::new(
        config,
        ValidateOptions {
            strict: false,
            ..ValidateOptions::default()
        },
    );
    let report = validator.validate(&history, &result, None)?;
    let paths = validator.write_report(&report, &out_dir)?;

    println!("validation: {}", paths.validation_path.display());
    println!("report: {}", paths.report_path.display());
    println!(
        "violations: {}, warnings: {}",
        report.violations.len(),
        report.warnings.len()
    );
    Ok(())
}
