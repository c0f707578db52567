use thiserror::Error;

/// Core error type shared across histosynth crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid year range, parameter band or seed; fatal before any generation.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Historical tables cannot seed the pipeline.
    #[error("invalid history: {0}")]
    InvalidHistory(String),
}

/// Convenience alias for results returned by histosynth crates.
pub type Result<T> = std::result::Result<T, Error>;
