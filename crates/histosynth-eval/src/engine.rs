use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::info;

use histosynth_core::{History, PipelineConfig, names};
use histosynth_generate::GenerationResult;

use crate::checks::{CheckInput, run_hard_checks};
use crate::errors::EvalError;
use crate::metrics::{METRICS_VERSION, TableMetrics, ValidationReport};
use crate::model::ValidateOptions;
use crate::report::render_report;
use crate::trends::evaluate_trends;

/// Files written by [`IntegrityValidator::write_report`].
#[derive(Debug, Clone)]
pub struct ValidationPaths {
    pub validation_path: PathBuf,
    pub report_path: PathBuf,
}

/// Validates synthesized tables against history and the run config.
#[derive(Debug, Clone)]
pub struct IntegrityValidator {
    config: PipelineConfig,
    options: ValidateOptions,
}

impl IntegrityValidator {
    pub fn new(config: PipelineConfig, options: ValidateOptions) -> Self {
        Self { config, options }
    }

    pub fn options(&self) -> &ValidateOptions {
        &self.options
    }

    /// Run hard and soft checks. In strict mode any hard failure is returned
    /// as [`EvalError::Violations`] carrying the full report.
    pub fn validate(
        &self,
        history: &History,
        result: &GenerationResult,
        run_id: Option<String>,
    ) -> Result<ValidationReport, EvalError> {
        let start = Instant::now();
        let input = CheckInput {
            config: &self.config,
            history,
            result,
        };

        let log = run_hard_checks(&input);
        let (years, warnings) = evaluate_trends(&input);

        let tables = &result.tables;
        let table_metrics = [
            (names::LOCATIONS, tables.locations.len()),
            (names::CUSTOMERS, tables.customers.len()),
            (names::EMPLOYEES, tables.employees.len()),
            (names::EMPLOYMENT_PERIODS, tables.employment_periods.len()),
            (names::ORDERS, tables.orders.len()),
            (names::LINE_ITEMS, tables.line_items.len()),
            (names::INVENTORY, tables.inventory.len()),
            (names::REVIEWS, tables.reviews.len()),
            (names::WEB_STATS, tables.web_stats.len()),
            (names::SKILL_REVIEWS, tables.skill_reviews.len()),
            (names::TERMINATION_REASONS, tables.termination_reasons.len()),
            (names::LINE_ITEM_RETURNS, tables.line_item_returns.len()),
        ]
        .into_iter()
        .map(|(table, rows)| TableMetrics {
            table: table.to_string(),
            rows: rows as u64,
        })
        .collect();

        let report = ValidationReport {
            metrics_version: METRICS_VERSION.to_string(),
            run_id,
            seed: self.config.seed,
            start_year: self.config.start_year,
            num_years: self.config.num_years,
            tables: table_metrics,
            checks: log.checks,
            violations: log.violations,
            warnings,
            years,
            validate_ms: start.elapsed().as_millis(),
        };

        info!(
            checks = report.checks.values().map(|stats| stats.checked).sum::<u64>(),
            violations = report.violations.len(),
            warnings = report.warnings.len(),
            validate_ms = report.validate_ms as u64,
            "validation completed"
        );

        if self.options.strict && !report.is_valid() {
            return Err(EvalError::Violations(Box::new(report)));
        }
        Ok(report)
    }

    /// Write `validation.json` and `report.md` into `out_dir`.
    pub fn write_report(
        &self,
        report: &ValidationReport,
        out_dir: &Path,
    ) -> Result<ValidationPaths, EvalError> {
        std::fs::create_dir_all(out_dir)?;
        let validation_path = out_dir.join("validation.json");
        std::fs::write(&validation_path, serde_json::to_vec_pretty(report)?)?;

        let report_path = out_dir.join("report.md");
        let markdown = render_report(report, self.options.max_examples);
        std::fs::write(&report_path, markdown.as_bytes())?;

        Ok(ValidationPaths {
            validation_path,
            report_path,
        })
    }
}
