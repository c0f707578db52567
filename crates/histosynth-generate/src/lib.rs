//! Dependency-ordered synthesis of future business years.
//!
//! The engine profiles a [`History`](histosynth_core::History), then runs one
//! synthesizer per stage (locations, customers, employees, orders, line items,
//! inventory, reviews, web stats, skill reviews, termination reasons, line-item
//! returns) in topological order. Every stage draws from
//! its own seeded stream, so a seed and a config reproduce identical tables.

pub mod calendar;
pub mod engine;
pub mod errors;
pub mod fixtures;
pub mod history;
pub mod input;
pub mod merge;
pub mod model;
pub mod output;
pub mod planner;
pub mod random;
pub mod roster;
pub mod sampling;
pub mod synth;

pub use engine::{GenerationEngine, GenerationResult};
pub use errors::GenerationError;
pub use history::HistoryProfile;
pub use input::load_history;
pub use merge::{FullView, merge_full_view};
pub use model::{
    CustomerCohort, FileFingerprint, GenerationIssue, GenerationReport, StageReport, YearSummary,
    codes,
};
pub use random::SeedSource;
pub use roster::{EmployeeRoster, Tenure};
