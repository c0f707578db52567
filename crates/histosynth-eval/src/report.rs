use crate::checks::codes;
use crate::metrics::ValidationReport;

/// Render a deterministic markdown report (`report.md`).
pub fn render_report(report: &ValidationReport, max_examples: usize) -> String {
    let mut lines = Vec::new();

    lines.push("# Histosynth Validation Report".to_string());
    lines.push(String::new());
    lines.push("## Run summary".to_string());
    if let Some(run_id) = &report.run_id {
        lines.push(format!("- run_id: {run_id}"));
    }
    lines.push(format!("- seed: {}", report.seed));
    lines.push(format!(
        "- years: {}..={}",
        report.start_year,
        report.start_year + report.num_years as i32 - 1
    ));
    let status = if report.is_valid() { "passed" } else { "failed" };
    lines.push(format!("- status: {status}"));
    lines.push(String::new());

    lines.push("## Rows generated".to_string());
    lines.push("| table | rows |".to_string());
    lines.push("| --- | --- |".to_string());
    for table in &report.tables {
        lines.push(format!("| {} | {} |", table.table, table.rows));
    }
    lines.push(String::new());

    lines.push("## Integrity checks".to_string());
    lines.push("| check | checked | violations |".to_string());
    lines.push("| --- | --- | --- |".to_string());
    for (code, stats) in &report.checks {
        lines.push(format!("| {} | {} | {} |", code, stats.checked, stats.violations));
    }
    lines.push(String::new());

    lines.push("## Yearly trends".to_string());
    lines.push("| year | orders | order growth | customer growth | session growth | locations opened |".to_string());
    lines.push("| --- | --- | --- | --- | --- | --- |".to_string());
    for year in &report.years {
        let sessions = year
            .session_growth
            .map(|value| format!("{:.1}%", value * 100.0))
            .unwrap_or_else(|| "-".to_string());
        lines.push(format!(
            "| {} | {} | {:.1}% | {:.1}% | {} | {} |",
            year.year,
            year.orders,
            year.order_growth * 100.0,
            year.customer_growth * 100.0,
            sessions,
            year.locations_opened
        ));
    }
    lines.push(String::new());

    if !report.warnings.is_empty() {
        lines.push("## Warnings".to_string());
        for warning in &report.warnings {
            let hint = warning
                .hint
                .as_ref()
                .map(|hint| format!(" (hint: {hint})"))
                .unwrap_or_default();
            lines.push(format!("- {}: {}{}", warning.path, warning.message, hint));
        }
        lines.push(String::new());
    }

    if !report.violations.is_empty() {
        lines.push("## Top violations".to_string());
        for violation in report.violations.iter().take(max_examples) {
            let key = violation
                .key
                .as_ref()
                .map(|key| format!(" [{key}]"))
                .unwrap_or_default();
            lines.push(format!(
                "- {} {}{}: {}",
                violation.code, violation.path, key, violation.message
            ));
        }
        if report.violations.len() > max_examples {
            lines.push(format!(
                "- ... {} more",
                report.violations.len() - max_examples
            ));
        }
        lines.push(String::new());
    }

    lines.push("## Recommendations".to_string());
    lines.extend(recommendations(report));
    lines.join("\n")
}

fn recommendations(report: &ValidationReport) -> Vec<String> {
    let mut lines = Vec::new();
    if report.violation_count(codes::FOREIGN_KEY) > 0 {
        lines.push("- check the history lookups (items, discounts) for missing ids.".to_string());
    }
    if report.violation_count(codes::ORDER_STAFFING) > 0 {
        lines.push("- raise employees.hires_min or lower employees.termination_rate.".to_string());
    }
    if report.violation_count(codes::REVIEW_TIMING) > 0 {
        lines.push("- review offsets must stay within reviews.min/max_offset_days.".to_string());
    }
    if report.violation_count(codes::SKILL_RATING_RANGE) > 0 {
        lines.push(
            "- keep skill_reviews means plus training_boost within min/max_rating.".to_string(),
        );
    }
    if !report.warnings.is_empty() {
        lines.push("- compare growth bands in the config with the warned years.".to_string());
    }
    if report.is_valid() && report.warnings.is_empty() {
        lines.push("- no violations detected; compare reports across seeds for drift.".to_string());
    }
    lines
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::metrics::{CheckStats, METRICS_VERSION, TableMetrics};
    use crate::model::Violation;

    fn report() -> ValidationReport {
        let mut checks = BTreeMap::new();
        checks.insert(
            codes::FOREIGN_KEY.to_string(),
            CheckStats {
                checked: 10,
                violations: 1,
            },
        );
        ValidationReport {
            metrics_version: METRICS_VERSION.to_string(),
            run_id: Some("run_1".to_string()),
            seed: 1234,
            start_year: 2022,
            num_years: 4,
            tables: vec![TableMetrics {
                table: "orders".to_string(),
                rows: 10,
            }],
            checks,
            violations: vec![Violation {
                code: codes::FOREIGN_KEY.to_string(),
                path: "orders".to_string(),
                message: "references missing customers '9'".to_string(),
                key: Some("501".to_string()),
            }],
            warnings: Vec::new(),
            years: Vec::new(),
            validate_ms: 0,
        }
    }

    #[test]
    fn failed_report_lists_violations() {
        let markdown = render_report(&report(), 5);
        assert!(markdown.contains("- years: 2022..=2025"));
        assert!(markdown.contains("- status: failed"));
        assert!(markdown.contains("| foreign_key | 10 | 1 |"));
        assert!(markdown.contains("- foreign_key orders [501]: references missing customers '9'"));
    }

    #[test]
    fn examples_are_capped() {
        let mut report = report();
        let violation = report.violations[0].clone();
        report.violations = vec![violation; 3];
        let markdown = render_report(&report, 1);
        assert!(markdown.contains("- ... 2 more"));
    }
}
