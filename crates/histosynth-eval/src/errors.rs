use thiserror::Error;

use crate::metrics::ValidationReport;

/// Errors emitted by the integrity validator.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("validation failed with {} violation(s)", .0.violations.len())]
    Violations(Box<ValidationReport>),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
