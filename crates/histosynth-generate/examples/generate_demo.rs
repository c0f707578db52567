use std::path::PathBuf;

use histosynth_core::PipelineConfig;
use histosynth_generate::fixtures::sample_history;
use histosynth_generate::output::write_synthesized;
use histosynth_generate::{GenerationEngine, merge_full_view, output::write_full_view};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("histosynth_demo"));

    let history = sample_history();
    let result = GenerationEngine::new(PipelineConfig::new(2022, 4)).run(&history)?;
    let files = write_synthesized(&out_dir.join("new"), &result.tables)?;
    let view = merge_full_view(&history, &result.profile, &result.tables);
    write_full_view(&out_dir.join("full"), &view)?;

    for summary in &result.report.years {
        println!(
            "{}: {} orders, {} new customers, {} sessions",
            summary.year, summary.orders, summary.new_customers, summary.sessions
        );
    }
    for file in files {
        println!("{} rows={} sha256={}", file.path, file.rows, file.sha256);
    }
    Ok(())
}
