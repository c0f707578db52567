//! Core contracts for histosynth.
//!
//! This crate defines the table records, the stage dependency graph, and the
//! run configuration shared by the generator, the validator, and the CLI.

pub mod config;
pub mod entities;
pub mod error;
pub mod graph;
pub mod ids;
pub mod tables;

pub use config::{
    BusinessHours, CustomerParams, DEFAULT_SEED, EmployeeParams, HolidayWindow, InventoryParams,
    LabelWeight, LineItemParams, NewStoreParams, OrderParams, PipelineConfig, RateBand,
    ReturnParams, ReviewParams, SkillReviewParams, TerminationParams, ValidationParams,
    WebStatsParams, YearCount,
};
pub use entities::{
    Customer, Discount, Employee, EmploymentPeriod, InventoryRecord, Item, LineItem,
    LineItemReturn, Location, Order, Review, SkillReview, TerminationReason, WebStat,
    first_of_month,
};
pub use error::{Error, Result};
pub use graph::{
    Stage, StageGraphReport, StageGraphSummary, build_graph_report, build_stage_graph_report,
    stage_order,
};
pub use ids::LocationId;
pub use tables::{History, SynthesizedTables, names};

/// Contract version written into run artifacts.
pub const ARTIFACT_VERSION: &str = "0.1";
