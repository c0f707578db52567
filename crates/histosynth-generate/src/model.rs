use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use histosynth_core::{LocationId, Stage};

/// Issue codes recorded in the generation report.
pub mod codes {
    /// Output cannot match the extrapolated distribution exactly.
    pub const DISTRIBUTION_FIDELITY: &str = "distribution_fidelity";
    /// An inventory adjustment absorbed a deficit that would end below zero.
    pub const NEGATIVE_QUANTITY_CORRECTION: &str = "negative_quantity_correction";
    /// Generated years do not directly follow the historical ones.
    pub const HISTORY_GAP: &str = "history_gap";
    /// The discount lookup is empty, so no discounts are applied.
    pub const EMPTY_DISCOUNT_LOOKUP: &str = "empty_discount_lookup";
    /// A review target exceeded the orders available in its year.
    pub const REVIEW_TARGET_CLAMPED: &str = "review_target_clamped";
}

/// Summary of one executed stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: Stage,
    pub rows_generated: u64,
    pub duration_ms: u64,
}

/// Structured, non-fatal generation issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationIssue {
    pub level: String,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl GenerationIssue {
    pub fn warning(code: &str, message: impl Into<String>) -> Self {
        Self {
            level: "warning".to_string(),
            code: code.to_string(),
            message: message.into(),
            table: None,
            key: None,
        }
    }

    pub fn with_table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// Customers acquired in one generated year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerCohort {
    pub year: i32,
    /// Sampled growth rate applied to the previous active count.
    pub growth_rate: f64,
    pub new_customers: u64,
    pub active_customers: u64,
    pub first_id: Option<u64>,
    pub last_id: Option<u64>,
    /// Trailing part of the cohort homed at the location opened this year.
    #[serde(default)]
    pub new_store_customers: u64,
    /// Leading part of the new-store cohort whose first order falls in the
    /// opening window.
    #[serde(default)]
    pub new_store_early: u64,
}

impl CustomerCohort {
    pub fn contains(&self, customer_id: u64) -> bool {
        match (self.first_id, self.last_id) {
            (Some(first), Some(last)) => customer_id >= first && customer_id <= last,
            _ => false,
        }
    }
}

/// Per-year headline numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YearSummary {
    pub year: i32,
    pub location_opened: Option<LocationId>,
    pub new_customers: u64,
    pub active_customers: u64,
    pub employees_hired: u64,
    pub employees_terminated: u64,
    pub orders: u64,
    pub line_items: u64,
    pub reviews: u64,
    pub sessions: u64,
    pub skill_reviews: u64,
    pub line_item_returns: u64,
}

/// Fingerprint of a written CSV file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFingerprint {
    pub table: String,
    pub path: String,
    pub rows: u64,
    pub bytes: u64,
    pub sha256: String,
}

/// Report for a synthesis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub seed: u64,
    pub start_year: i32,
    pub num_years: u32,
    pub stages: Vec<StageReport>,
    pub years: Vec<YearSummary>,
    pub cohorts: Vec<CustomerCohort>,
    pub corrections: u64,
    pub warnings_by_code: BTreeMap<String, u64>,
    pub warnings: Vec<GenerationIssue>,
    #[serde(default)]
    pub files: Vec<FileFingerprint>,
    pub duration_ms: u64,
}

impl GenerationReport {
    pub fn new(seed: u64, start_year: i32, num_years: u32) -> Self {
        Self {
            seed,
            start_year,
            num_years,
            stages: Vec::new(),
            years: Vec::new(),
            cohorts: Vec::new(),
            corrections: 0,
            warnings_by_code: BTreeMap::new(),
            warnings: Vec::new(),
            files: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn record_warning(&mut self, issue: GenerationIssue) {
        if issue.code == codes::NEGATIVE_QUANTITY_CORRECTION {
            self.corrections += 1;
        }
        *self.warnings_by_code.entry(issue.code.clone()).or_insert(0) += 1;
        self.warnings.push(issue);
    }

    pub fn warning_count(&self, code: &str) -> u64 {
        self.warnings_by_code.get(code).copied().unwrap_or(0)
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|report| report.stage == stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrections_are_counted_by_code() {
        let mut report = GenerationReport::new(1, 2022, 1);
        report.record_warning(
            GenerationIssue::warning(codes::NEGATIVE_QUANTITY_CORRECTION, "clamped")
                .with_table("inventory")
                .with_key("L01/3/2022-01-01"),
        );
        report.record_warning(GenerationIssue::warning(codes::DISTRIBUTION_FIDELITY, "short"));
        assert_eq!(report.corrections, 1);
        assert_eq!(report.warning_count(codes::DISTRIBUTION_FIDELITY), 1);
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn cohort_contains_only_its_id_range() {
        let cohort = CustomerCohort {
            year: 2022,
            growth_rate: 0.06,
            new_customers: 3,
            active_customers: 53,
            first_id: Some(10),
            last_id: Some(12),
            new_store_customers: 0,
            new_store_early: 0,
        };
        assert!(cohort.contains(11));
        assert!(!cohort.contains(13));
    }
}
