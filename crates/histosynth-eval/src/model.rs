use serde::{Deserialize, Serialize};

/// Options for integrity validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateOptions {
    /// Return [`EvalError::Violations`](crate::EvalError::Violations) when a
    /// hard check fails.
    pub strict: bool,
    /// Limit the number of violations listed in the markdown report.
    pub max_examples: usize,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            strict: true,
            max_examples: 20,
        }
    }
}

/// A failed hard check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub code: String,
    /// Table the offending row belongs to.
    pub path: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// A soft check outside its tolerance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningItem {
    pub code: String,
    pub path: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}
