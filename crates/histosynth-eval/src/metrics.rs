use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{Violation, WarningItem};

/// Version of the validation report contract.
pub const METRICS_VERSION: &str = "0.1";

/// Machine-readable outcome of a validation (`validation.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub metrics_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub seed: u64,
    pub start_year: i32,
    pub num_years: u32,
    pub tables: Vec<TableMetrics>,
    /// Hard check counters by check code.
    pub checks: BTreeMap<String, CheckStats>,
    pub violations: Vec<Violation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<WarningItem>,
    pub years: Vec<YearTrend>,
    pub validate_ms: u128,
}

impl ValidationReport {
    /// No hard check failed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violation_count(&self, code: &str) -> u64 {
        self.checks.get(code).map(|stats| stats.violations).unwrap_or(0)
    }
}

/// Rows produced per synthesized table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetrics {
    pub table: String,
    pub rows: u64,
}

/// Generic check counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckStats {
    pub checked: u64,
    pub violations: u64,
}

/// Year-over-year ratios compared by the soft checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearTrend {
    pub year: i32,
    pub orders: u64,
    pub order_growth: f64,
    pub customer_growth: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_growth: Option<f64>,
    pub locations_opened: u64,
}
