//! Integrity validation for synthesized tables.

pub mod checks;
pub mod engine;
pub mod errors;
pub mod metrics;
pub mod model;
pub mod report;
pub mod trends;

pub use engine::{IntegrityValidator, ValidationPaths};
pub use errors::EvalError;
pub use metrics::{CheckStats, METRICS_VERSION, TableMetrics, ValidationReport, YearTrend};
pub use model::{ValidateOptions, Violation, WarningItem};
pub use report::render_report;
