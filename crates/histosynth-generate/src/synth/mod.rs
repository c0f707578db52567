//! One synthesizer per pipeline stage.
//!
//! Each synthesizer borrows the outputs of its upstream stages and owns only
//! the rows it produces.

pub mod customers;
pub mod employees;
pub mod inventory;
pub mod line_item_returns;
pub mod line_items;
pub mod locations;
pub mod orders;
pub mod reviews;
pub mod skill_reviews;
pub mod termination_reasons;
pub mod web_stats;

pub use customers::{CustomerOutput, CustomerSynthesizer};
pub use employees::{EmployeeOutput, EmployeeSynthesizer};
pub use inventory::{InventoryOutput, InventorySynthesizer};
pub use line_item_returns::{LineItemReturnOutput, LineItemReturnSynthesizer};
pub use line_items::{LineItemOutput, LineItemSynthesizer};
pub use locations::{LocationPlan, LocationSynthesizer};
pub use orders::{OrderOutput, OrderSynthesizer};
pub use reviews::{ReviewOutput, ReviewSynthesizer};
pub use skill_reviews::{SkillReviewOutput, SkillReviewSynthesizer};
pub use termination_reasons::{TerminationReasonOutput, TerminationReasonSynthesizer};
pub use web_stats::{WebStatsOutput, WebStatsSynthesizer};
