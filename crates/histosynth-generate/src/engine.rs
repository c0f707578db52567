use std::collections::BTreeMap;
use std::time::Instant;

use chrono::Datelike;
use tracing::{info, warn};

use histosynth_core::{History, PipelineConfig, Stage, SynthesizedTables};

use crate::errors::GenerationError;
use crate::history::HistoryProfile;
use crate::model::{GenerationIssue, GenerationReport, StageReport, YearSummary};
use crate::planner::plan_run;
use crate::random::SeedSource;
use crate::synth::{
    CustomerOutput, CustomerSynthesizer, EmployeeOutput, EmployeeSynthesizer, InventoryOutput,
    InventorySynthesizer, LineItemOutput, LineItemReturnOutput, LineItemReturnSynthesizer,
    LineItemSynthesizer, LocationPlan, LocationSynthesizer, OrderOutput, OrderSynthesizer,
    ReviewOutput, ReviewSynthesizer, SkillReviewOutput, SkillReviewSynthesizer,
    TerminationReasonOutput, TerminationReasonSynthesizer, WebStatsOutput, WebStatsSynthesizer,
};

/// Result of a synthesis run.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub tables: SynthesizedTables,
    pub report: GenerationReport,
    pub profile: HistoryProfile,
}

/// Entry point for extending a history with synthesized years.
#[derive(Debug, Clone)]
pub struct GenerationEngine {
    config: PipelineConfig,
}

/// Materialized stage outputs; a slot is filled once its stage has run.
#[derive(Debug, Default)]
struct StageOutputs {
    locations: Option<LocationPlan>,
    customers: Option<CustomerOutput>,
    employees: Option<EmployeeOutput>,
    orders: Option<OrderOutput>,
    line_items: Option<LineItemOutput>,
    inventory: Option<InventoryOutput>,
    reviews: Option<ReviewOutput>,
    web_stats: Option<WebStatsOutput>,
    skill_reviews: Option<SkillReviewOutput>,
    termination_reasons: Option<TerminationReasonOutput>,
    line_item_returns: Option<LineItemReturnOutput>,
}

impl StageOutputs {
    fn is_done(&self, stage: Stage) -> bool {
        match stage {
            Stage::Locations => self.locations.is_some(),
            Stage::Customers => self.customers.is_some(),
            Stage::Employees => self.employees.is_some(),
            Stage::Orders => self.orders.is_some(),
            Stage::LineItems => self.line_items.is_some(),
            Stage::Inventory => self.inventory.is_some(),
            Stage::Reviews => self.reviews.is_some(),
            Stage::WebStats => self.web_stats.is_some(),
            Stage::SkillReviews => self.skill_reviews.is_some(),
            Stage::TerminationReasons => self.termination_reasons.is_some(),
            Stage::LineItemReturns => self.line_item_returns.is_some(),
        }
    }

    fn ensure_ready(&self, stage: Stage) -> Result<(), GenerationError> {
        if let Some(missing) = stage
            .dependencies()
            .iter()
            .find(|dependency| !self.is_done(**dependency))
        {
            return Err(GenerationError::StageOrder(format!(
                "stage '{stage}' requires '{missing}' to be materialized first"
            )));
        }
        Ok(())
    }
}

fn require<'o, T>(slot: &'o Option<T>, upstream: Stage) -> Result<&'o T, GenerationError> {
    slot.as_ref().ok_or_else(|| {
        GenerationError::StageOrder(format!("stage '{upstream}' has not produced output"))
    })
}

impl GenerationEngine {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage in dependency order.
    pub fn run(&self, history: &History) -> Result<GenerationResult, GenerationError> {
        let order: Vec<Stage> = histosynth_core::stage_order()?;
        self.run_stages(history, &order)
    }

    /// Run stages in the given order; a stage whose upstream tables are not
    /// materialized yet fails with [`GenerationError::StageOrder`].
    pub fn run_stages(
        &self,
        history: &History,
        order: &[Stage],
    ) -> Result<GenerationResult, GenerationError> {
        let start = Instant::now();
        let profile = HistoryProfile::analyze(history)?;
        let plan = plan_run(&self.config, &profile)?;
        let seeds = SeedSource::new(self.config.seed);
        let mut report = GenerationReport::new(
            self.config.seed,
            self.config.start_year,
            self.config.num_years,
        );
        record_issues(&mut report, plan.issues);

        info!(
            seed = self.config.seed,
            start_year = self.config.start_year,
            num_years = self.config.num_years,
            last_history_year = profile.last_year,
            "generation started"
        );

        let mut outputs = StageOutputs::default();
        for stage in order {
            let stage_start = Instant::now();
            outputs.ensure_ready(*stage)?;
            let rows = self.run_stage(*stage, history, &profile, &plan.years, &seeds, &mut outputs, &mut report)?;
            let duration_ms = stage_start.elapsed().as_millis() as u64;
            report.stages.push(StageReport {
                stage: *stage,
                rows_generated: rows,
                duration_ms,
            });
            info!(stage = %stage, rows_generated = rows, duration_ms, "stage completed");
        }

        let tables = into_tables(&outputs)?;
        report.cohorts = require(&outputs.customers, Stage::Customers)?.cohorts.clone();
        report.years = year_summaries(&plan.years, &outputs)?;
        report.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            stages = report.stages.len(),
            orders = tables.orders.len(),
            warnings = report.warnings.len(),
            corrections = report.corrections,
            duration_ms = report.duration_ms,
            "generation completed"
        );

        Ok(GenerationResult {
            tables,
            report,
            profile,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn run_stage(
        &self,
        stage: Stage,
        history: &History,
        profile: &HistoryProfile,
        years: &[i32],
        seeds: &SeedSource,
        outputs: &mut StageOutputs,
        report: &mut GenerationReport,
    ) -> Result<u64, GenerationError> {
        let config = &self.config;
        let rows = match stage {
            Stage::Locations => {
                let plan = LocationSynthesizer::new(profile, years).run()?;
                let rows = plan.opened().len();
                outputs.locations = Some(plan);
                rows
            }
            Stage::Customers => {
                let locations = require(&outputs.locations, Stage::Locations)?;
                let output =
                    CustomerSynthesizer::new(profile, &config.customers, locations, years)
                        .run(seeds)?;
                let rows = output.customers.len();
                outputs.customers = Some(output);
                rows
            }
            Stage::Employees => {
                let locations = require(&outputs.locations, Stage::Locations)?;
                let output = EmployeeSynthesizer::new(
                    history,
                    profile,
                    &config.employees,
                    locations,
                    years,
                )
                .run(seeds)?;
                let rows = output.employees.len();
                outputs.employees = Some(output);
                rows
            }
            Stage::Orders => {
                let output = OrderSynthesizer::new(
                    profile,
                    &config.orders,
                    years,
                    require(&outputs.locations, Stage::Locations)?,
                    require(&outputs.customers, Stage::Customers)?,
                    require(&outputs.employees, Stage::Employees)?,
                )
                .run(seeds)?;
                record_issues(report, output.issues.clone());
                let rows = output.orders.len();
                outputs.orders = Some(output);
                rows
            }
            Stage::LineItems => {
                let orders = require(&outputs.orders, Stage::Orders)?;
                let output = LineItemSynthesizer::new(
                    profile,
                    &config.line_items,
                    &history.items,
                    &history.discounts,
                )?
                .run(&orders.orders, seeds)?;
                record_issues(report, output.issues.clone());
                let rows = output.line_items.len();
                outputs.line_items = Some(output);
                rows
            }
            Stage::Inventory => {
                let orders = require(&outputs.orders, Stage::Orders)?;
                let line_items = require(&outputs.line_items, Stage::LineItems)?;
                let locations = require(&outputs.locations, Stage::Locations)?;
                let output = InventorySynthesizer::new(
                    profile,
                    &config.inventory,
                    locations,
                    &history.items,
                    years,
                )
                .run(&orders.orders, &line_items.line_items, seeds)?;
                record_issues(report, output.issues.clone());
                let rows = output.records.len();
                outputs.inventory = Some(output);
                rows
            }
            Stage::Reviews => {
                let orders = require(&outputs.orders, Stage::Orders)?;
                let output = ReviewSynthesizer::new(profile, &config.reviews, years)
                    .run(&orders.orders, seeds)?;
                record_issues(report, output.issues.clone());
                let rows = output.reviews.len();
                outputs.reviews = Some(output);
                rows
            }
            Stage::WebStats => {
                let orders = require(&outputs.orders, Stage::Orders)?;
                let output = WebStatsSynthesizer::new(profile, &config.web_stats, years)
                    .run(&orders.orders, seeds)?;
                let rows = output.web_stats.len();
                outputs.web_stats = Some(output);
                rows
            }
            Stage::SkillReviews => {
                let employees = require(&outputs.employees, Stage::Employees)?;
                let output = SkillReviewSynthesizer::new(history, &config.skill_reviews, years)
                    .run(employees, seeds)?;
                let rows = output.reviews.len();
                outputs.skill_reviews = Some(output);
                rows
            }
            Stage::TerminationReasons => {
                let employees = require(&outputs.employees, Stage::Employees)?;
                let output = TerminationReasonSynthesizer::new(
                    history,
                    profile,
                    &config.terminations,
                    years,
                )
                .run(employees, seeds)?;
                let rows = output.reasons.len();
                outputs.termination_reasons = Some(output);
                rows
            }
            Stage::LineItemReturns => {
                let orders = require(&outputs.orders, Stage::Orders)?;
                let line_items = require(&outputs.line_items, Stage::LineItems)?;
                let output = LineItemReturnSynthesizer::new(profile, &config.returns, years)
                    .run(&orders.orders, &line_items.line_items, seeds)?;
                let rows = output.returns.len();
                outputs.line_item_returns = Some(output);
                rows
            }
        };
        Ok(rows as u64)
    }
}

fn record_issues(report: &mut GenerationReport, issues: Vec<GenerationIssue>) {
    for issue in issues {
        warn!(
            code = %issue.code,
            table = issue.table.as_deref().unwrap_or(""),
            key = issue.key.as_deref().unwrap_or(""),
            "{}",
            issue.message
        );
        report.record_warning(issue);
    }
}

fn into_tables(outputs: &StageOutputs) -> Result<SynthesizedTables, GenerationError> {
    let employees = require(&outputs.employees, Stage::Employees)?;
    Ok(SynthesizedTables {
        locations: require(&outputs.locations, Stage::Locations)?.opened().to_vec(),
        customers: require(&outputs.customers, Stage::Customers)?.customers.clone(),
        employees: employees.employees.clone(),
        employment_periods: employees.periods.clone(),
        orders: require(&outputs.orders, Stage::Orders)?.orders.clone(),
        line_items: require(&outputs.line_items, Stage::LineItems)?.line_items.clone(),
        inventory: require(&outputs.inventory, Stage::Inventory)?.records.clone(),
        reviews: require(&outputs.reviews, Stage::Reviews)?.reviews.clone(),
        web_stats: require(&outputs.web_stats, Stage::WebStats)?.web_stats.clone(),
        skill_reviews: require(&outputs.skill_reviews, Stage::SkillReviews)?
            .reviews
            .clone(),
        termination_reasons: require(&outputs.termination_reasons, Stage::TerminationReasons)?
            .reasons
            .clone(),
        line_item_returns: require(&outputs.line_item_returns, Stage::LineItemReturns)?
            .returns
            .clone(),
    })
}

fn year_summaries(
    years: &[i32],
    outputs: &StageOutputs,
) -> Result<Vec<YearSummary>, GenerationError> {
    let locations = require(&outputs.locations, Stage::Locations)?;
    let customers = require(&outputs.customers, Stage::Customers)?;
    let employees = require(&outputs.employees, Stage::Employees)?;
    let orders = require(&outputs.orders, Stage::Orders)?;
    let line_items = require(&outputs.line_items, Stage::LineItems)?;
    let reviews = require(&outputs.reviews, Stage::Reviews)?;
    let web_stats = require(&outputs.web_stats, Stage::WebStats)?;
    let skill_reviews = require(&outputs.skill_reviews, Stage::SkillReviews)?;
    let line_item_returns = require(&outputs.line_item_returns, Stage::LineItemReturns)?;

    let order_years: BTreeMap<u64, i32> = orders
        .orders
        .iter()
        .map(|order| (order.order_id, order.date.year()))
        .collect();
    let count_by_year = |ids: &mut dyn Iterator<Item = u64>| {
        let mut counts: BTreeMap<i32, u64> = BTreeMap::new();
        for order_id in ids {
            if let Some(year) = order_years.get(&order_id) {
                *counts.entry(*year).or_insert(0) += 1;
            }
        }
        counts
    };
    let line_counts = count_by_year(&mut line_items.line_items.iter().map(|l| l.order_id));
    let review_counts = count_by_year(&mut reviews.reviews.iter().map(|r| r.order_id));
    let line_orders: BTreeMap<u64, u64> = line_items
        .line_items
        .iter()
        .map(|line| (line.line_item_id, line.order_id))
        .collect();
    let return_counts = count_by_year(
        &mut line_item_returns
            .returns
            .iter()
            .filter_map(|r| line_orders.get(&r.line_item_id).copied()),
    );
    let order_counts = orders.yearly_counts();

    Ok(years
        .iter()
        .map(|&year| {
            let cohort = customers.cohort(year);
            YearSummary {
                year,
                location_opened: locations.opened_in(year).map(|l| l.id.clone()),
                new_customers: cohort.map(|c| c.new_customers).unwrap_or(0),
                active_customers: cohort.map(|c| c.active_customers).unwrap_or(0),
                employees_hired: employees.hires_by_year.get(&year).copied().unwrap_or(0),
                employees_terminated: employees
                    .terminations_by_year
                    .get(&year)
                    .copied()
                    .unwrap_or(0),
                orders: order_counts.get(&year).copied().unwrap_or(0),
                line_items: line_counts.get(&year).copied().unwrap_or(0),
                reviews: review_counts.get(&year).copied().unwrap_or(0),
                sessions: web_stats.yearly_sessions.get(&year).copied().unwrap_or(0),
                skill_reviews: skill_reviews
                    .reviews_by_year
                    .get(&year)
                    .copied()
                    .unwrap_or(0),
                line_item_returns: return_counts.get(&year).copied().unwrap_or(0),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_history;

    #[test]
    fn runs_every_stage_once_in_dependency_order() {
        let engine = GenerationEngine::new(PipelineConfig::new(2022, 2));
        let result = engine.run(&sample_history()).expect("run");
        let stages: Vec<Stage> = result.report.stages.iter().map(|s| s.stage).collect();
        assert_eq!(stages, histosynth_core::stage_order().unwrap());
        assert_eq!(result.report.years.len(), 2);
        assert_eq!(result.tables.locations.len(), 2);
    }

    #[test]
    fn stage_before_its_inputs_is_refused() {
        let engine = GenerationEngine::new(PipelineConfig::new(2022, 1));
        let err = engine
            .run_stages(&sample_history(), &[Stage::Locations, Stage::Orders])
            .unwrap_err();
        assert!(matches!(err, GenerationError::StageOrder(_)));
    }

    #[test]
    fn invalid_config_fails_before_generation() {
        let engine = GenerationEngine::new(PipelineConfig::new(2022, 0));
        let err = engine.run(&sample_history()).unwrap_err();
        assert!(matches!(err, GenerationError::Configuration(_)));
    }
}
