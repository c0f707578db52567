use std::fs;

use histosynth_core::{History, PipelineConfig};
use histosynth_eval::checks::codes;
use histosynth_eval::{EvalError, IntegrityValidator, ValidateOptions, ValidationReport};
use histosynth_generate::fixtures::sample_history;
use histosynth_generate::{GenerationEngine, GenerationResult};

fn generate(config: &PipelineConfig) -> (History, GenerationResult) {
    let history = sample_history();
    let result = GenerationEngine::new(config.clone())
        .run(&history)
        .expect("generation succeeds");
    (history, result)
}

#[test]
fn four_year_run_passes_validation() {
    let config = PipelineConfig::new(2022, 4);
    let (history, result) = generate(&config);
    let validator = IntegrityValidator::new(config, ValidateOptions::default());

    let report = validator
        .validate(&history, &result, Some("run_test".to_string()))
        .expect("valid run");
    assert!(report.is_valid());
    assert_eq!(report.years.len(), 4);
    assert!(report.checks.values().all(|stats| stats.violations == 0));
    for code in [
        codes::SKILL_REVIEW_TENURE,
        codes::SKILL_RATING_RANGE,
        codes::DUPLICATE_RETURN,
    ] {
        assert!(report.checks[code].checked > 0, "{code} never ran");
    }
}

#[test]
fn strict_mode_returns_the_report_with_violations() {
    let config = PipelineConfig::new(2022, 1);
    let (history, mut result) = generate(&config);
    let orphan = result.tables.orders[0].order_id;
    result.tables.line_items.retain(|line| line.order_id != orphan);
    let remaining: std::collections::HashSet<u64> = result
        .tables
        .line_items
        .iter()
        .map(|line| line.line_item_id)
        .collect();
    result
        .tables
        .line_item_returns
        .retain(|line_return| remaining.contains(&line_return.line_item_id));

    let validator = IntegrityValidator::new(config, ValidateOptions::default());
    match validator.validate(&history, &result, None) {
        Err(EvalError::Violations(report)) => {
            assert_eq!(report.violation_count(codes::ORDER_WITHOUT_ITEMS), 1);
            assert_eq!(
                report.violations[0].key.as_deref(),
                Some(orphan.to_string().as_str())
            );
        }
        other => panic!("expected violations, got {other:?}"),
    }
}

#[test]
fn report_files_are_written() {
    let config = PipelineConfig::new(2022, 2);
    let (history, result) = generate(&config);
    let validator = IntegrityValidator::new(
        config,
        ValidateOptions {
            strict: false,
            max_examples: 5,
        },
    );
    let report = validator.validate(&history, &result, None).expect("report");

    let out_dir = std::env::temp_dir().join(format!("histosynth_eval_{}", std::process::id()));
    let paths = validator.write_report(&report, &out_dir).expect("write");

    let json = fs::read_to_string(&paths.validation_path).expect("read json");
    let parsed: ValidationReport = serde_json::from_str(&json).expect("parse json");
    assert_eq!(parsed.violations.len(), report.violations.len());
    let markdown = fs::read_to_string(&paths.report_path).expect("read markdown");
    assert!(markdown.starts_with("# Histosynth Validation Report"));
    assert!(markdown.contains("- status: passed"));
}
