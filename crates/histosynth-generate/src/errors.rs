use thiserror::Error;

/// Errors emitted by the synthesis pipeline.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("invalid history: {0}")]
    InvalidHistory(String),
    #[error("referential integrity violation in {table} ({key}): {reason}")]
    ReferentialIntegrity {
        table: String,
        key: String,
        reason: String,
    },
    #[error("stage order violation: {0}")]
    StageOrder(String),
    #[error("sampling error: {0}")]
    Sampling(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl GenerationError {
    pub fn integrity(
        table: impl Into<String>,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ReferentialIntegrity {
            table: table.into(),
            key: key.into(),
            reason: reason.into(),
        }
    }
}

impl From<histosynth_core::Error> for GenerationError {
    fn from(err: histosynth_core::Error) -> Self {
        match err {
            histosynth_core::Error::Configuration(message) => Self::Configuration(message),
            histosynth_core::Error::InvalidHistory(message) => Self::InvalidHistory(message),
        }
    }
}
