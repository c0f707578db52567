use std::path::Path;

use chrono::{Datelike, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Seed used when none is configured.
pub const DEFAULT_SEED: u64 = 1234;

/// Full configuration of a synthesis run.
///
/// Every group has documented defaults so a TOML file only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PipelineConfig {
    /// First year to generate (inclusive).
    pub start_year: i32,
    /// Number of consecutive years to generate.
    pub num_years: u32,
    /// Seed for every random stream of the run.
    pub seed: u64,
    pub customers: CustomerParams,
    pub employees: EmployeeParams,
    pub orders: OrderParams,
    pub line_items: LineItemParams,
    pub inventory: InventoryParams,
    pub reviews: ReviewParams,
    pub web_stats: WebStatsParams,
    pub skill_reviews: SkillReviewParams,
    pub terminations: TerminationParams,
    pub returns: ReturnParams,
    pub validation: ValidationParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            start_year: 2022,
            num_years: 4,
            seed: DEFAULT_SEED,
            customers: CustomerParams::default(),
            employees: EmployeeParams::default(),
            orders: OrderParams::default(),
            line_items: LineItemParams::default(),
            inventory: InventoryParams::default(),
            reviews: ReviewParams::default(),
            web_stats: WebStatsParams::default(),
            skill_reviews: SkillReviewParams::default(),
            terminations: TerminationParams::default(),
            returns: ReturnParams::default(),
            validation: ValidationParams::default(),
        }
    }
}

impl PipelineConfig {
    pub fn new(start_year: i32, num_years: u32) -> Self {
        Self {
            start_year,
            num_years,
            ..Self::default()
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|err| Error::Configuration(format!("invalid config toml: {err}")))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|err| {
            Error::Configuration(format!("cannot read config '{}': {err}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn end_year(&self) -> i32 {
        self.start_year + self.num_years as i32 - 1
    }

    /// Generated years in ascending order.
    pub fn years(&self) -> Vec<i32> {
        (self.start_year..=self.end_year()).collect()
    }

    /// Reject configurations that cannot drive a run.
    pub fn validate(&self) -> Result<()> {
        if self.num_years < 1 {
            return Err(config_error("num_years must be at least 1"));
        }
        if self.num_years > 50 {
            return Err(config_error("num_years must not exceed 50"));
        }
        if !(1900..=2999).contains(&self.start_year) {
            return Err(config_error("start_year must be between 1900 and 2999"));
        }

        self.customers.validate()?;
        self.employees.validate()?;
        self.orders.validate()?;
        self.line_items.validate()?;
        self.inventory.validate()?;
        self.reviews.validate()?;
        self.web_stats.validate()?;
        self.skill_reviews.validate()?;
        self.terminations.validate()?;
        self.returns.validate()?;
        self.validation.validate()?;
        Ok(())
    }
}

/// Closed range a rate is sampled from once per year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RateBand {
    pub min: f64,
    pub max: f64,
}

impl RateBand {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    fn validate(&self, name: &str) -> Result<()> {
        if !(self.min.is_finite() && self.max.is_finite()) {
            return Err(config_error(format!("{name}: band bounds must be finite")));
        }
        if self.min < 0.0 || self.max > 1.0 || self.min > self.max {
            return Err(config_error(format!(
                "{name}: band must satisfy 0 <= min <= max <= 1 (got {}..{})",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Explicit per-year count anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct YearCount {
    pub year: i32,
    pub count: u64,
}

/// A categorical value and its sampling weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LabelWeight {
    pub label: String,
    pub weight: f64,
}

impl LabelWeight {
    pub fn new(label: &str, weight: f64) -> Self {
        Self {
            label: label.to_string(),
            weight,
        }
    }
}

fn label_weights(entries: &[(&str, f64)]) -> Vec<LabelWeight> {
    entries
        .iter()
        .map(|(label, weight)| LabelWeight::new(label, *weight))
        .collect()
}

fn validate_label_weights(name: &str, entries: &[LabelWeight]) -> Result<()> {
    if entries.is_empty() {
        return Err(config_error(format!("{name} must list at least one label")));
    }
    if entries
        .iter()
        .any(|entry| !(entry.weight.is_finite() && entry.weight >= 0.0))
    {
        return Err(config_error(format!("{name}: weights must be finite and non-negative")));
    }
    if entries.iter().map(|entry| entry.weight).sum::<f64>() <= 0.0 {
        return Err(config_error(format!("{name}: weights must not all be zero")));
    }
    Ok(())
}

/// Customer population growth and attribute probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CustomerParams {
    /// Yearly new-customer rate relative to the previous year's active customers.
    pub growth: RateBand,
    pub loyalty_rate: f64,
    /// P(email opt-in | loyalty member).
    pub email_rate_loyal: f64,
    /// P(email opt-in | not a loyalty member).
    pub email_rate_other: f64,
    pub min_age: u32,
    pub max_age: u32,
    /// Cohort homed at a location in its opening year.
    pub new_store: NewStoreParams,
}

impl Default for CustomerParams {
    fn default() -> Self {
        Self {
            growth: RateBand::new(0.05, 0.08),
            loyalty_rate: 0.35,
            email_rate_loyal: 0.70,
            email_rate_other: 0.30,
            min_age: 18,
            max_age: 70,
            new_store: NewStoreParams::default(),
        }
    }
}

impl CustomerParams {
    fn validate(&self) -> Result<()> {
        self.growth.validate("customers.growth")?;
        probability("customers.loyalty_rate", self.loyalty_rate)?;
        probability("customers.email_rate_loyal", self.email_rate_loyal)?;
        probability("customers.email_rate_other", self.email_rate_other)?;
        if self.min_age >= self.max_age {
            return Err(config_error("customers: min_age must be below max_age"));
        }
        self.new_store.validate()
    }
}

/// Grand-opening customers of a location opened during a generated year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct NewStoreParams {
    /// Share of the opening year's new customers homed at the new location.
    pub share: f64,
    /// Share of that cohort whose first order falls in the opening window.
    pub early_share: f64,
    /// Opening window length in months, starting in January.
    pub opening_months: u32,
    pub loyalty_rate: f64,
    pub email_rate_loyal: f64,
    pub email_rate_other: f64,
    /// Acquisition channel mix of the cohort.
    pub sources: Vec<LabelWeight>,
}

impl Default for NewStoreParams {
    fn default() -> Self {
        Self {
            share: 0.20,
            early_share: 0.70,
            opening_months: 3,
            loyalty_rate: 0.50,
            email_rate_loyal: 0.80,
            email_rate_other: 0.40,
            sources: label_weights(&[
                ("Newspaper", 0.05),
                ("Social", 0.20),
                ("Referral", 0.10),
                ("WalkIn", 0.35),
                ("Online", 0.10),
                ("Advertisement", 0.20),
            ]),
        }
    }
}

impl NewStoreParams {
    fn validate(&self) -> Result<()> {
        probability("customers.new_store.share", self.share)?;
        probability("customers.new_store.early_share", self.early_share)?;
        probability("customers.new_store.loyalty_rate", self.loyalty_rate)?;
        probability("customers.new_store.email_rate_loyal", self.email_rate_loyal)?;
        probability("customers.new_store.email_rate_other", self.email_rate_other)?;
        if !(1..12).contains(&self.opening_months) {
            return Err(config_error(
                "customers.new_store.opening_months must be between 1 and 11",
            ));
        }
        validate_label_weights("customers.new_store.sources", &self.sources)
    }
}

/// Hiring and termination behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EmployeeParams {
    pub hires_min: u32,
    pub hires_max: u32,
    pub hires_per_new_location: u32,
    /// Probability that an active employee is terminated within a year.
    pub termination_rate: f64,
    pub training_rate: f64,
    pub min_age: u32,
    pub max_age: u32,
    /// Regular hires start within this many days after January 1.
    pub start_window_days: u32,
}

impl Default for EmployeeParams {
    fn default() -> Self {
        Self {
            hires_min: 1,
            hires_max: 3,
            hires_per_new_location: 1,
            termination_rate: 0.02,
            training_rate: 0.5,
            min_age: 20,
            max_age: 50,
            start_window_days: 3,
        }
    }
}

impl EmployeeParams {
    fn validate(&self) -> Result<()> {
        if self.hires_min > self.hires_max {
            return Err(config_error("employees: hires_min must not exceed hires_max"));
        }
        probability("employees.termination_rate", self.termination_rate)?;
        probability("employees.training_rate", self.training_rate)?;
        if self.min_age >= self.max_age {
            return Err(config_error("employees: min_age must be below max_age"));
        }
        if self.start_window_days > 27 {
            return Err(config_error("employees: start_window_days must stay within January"));
        }
        Ok(())
    }
}

/// Opening and closing hour for order timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BusinessHours {
    pub open_hour: u32,
    pub close_hour: u32,
}

impl BusinessHours {
    pub fn contains(&self, time: chrono::NaiveTime) -> bool {
        use chrono::Timelike;
        let seconds = time.num_seconds_from_midnight();
        seconds >= self.open_hour * 3600 && seconds < self.close_hour * 3600
    }
}

/// Date window whose days get an extra sampling weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HolidayWindow {
    pub name: String,
    pub start_month: u32,
    pub start_day: u32,
    pub end_month: u32,
    pub end_day: u32,
    pub factor: f64,
}

impl HolidayWindow {
    pub fn new(name: &str, start: (u32, u32), end: (u32, u32), factor: f64) -> Self {
        Self {
            name: name.to_string(),
            start_month: start.0,
            start_day: start.1,
            end_month: end.0,
            end_day: end.1,
            factor,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        let key = (date.month(), date.day());
        key >= (self.start_month, self.start_day) && key <= (self.end_month, self.end_day)
    }

    fn validate(&self) -> Result<()> {
        let valid_month = |month: u32| (1..=12).contains(&month);
        let valid_day = |day: u32| (1..=31).contains(&day);
        if !(valid_month(self.start_month)
            && valid_month(self.end_month)
            && valid_day(self.start_day)
            && valid_day(self.end_day))
        {
            return Err(config_error(format!(
                "orders.holiday_windows.{}: invalid month/day",
                self.name
            )));
        }
        if (self.start_month, self.start_day) > (self.end_month, self.end_day) {
            return Err(config_error(format!(
                "orders.holiday_windows.{}: window must not wrap the year",
                self.name
            )));
        }
        if !(self.factor.is_finite() && self.factor > 0.0) {
            return Err(config_error(format!(
                "orders.holiday_windows.{}: factor must be positive",
                self.name
            )));
        }
        Ok(())
    }
}

/// Order volume, timing and assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct OrderParams {
    /// Yearly order growth relative to the previous year.
    pub growth: RateBand,
    /// Minimum repeat orders per year after the first, as a share of active customers.
    pub repeat_rate: f64,
    /// Weight multiplier per year since a customer's last order.
    pub recency_decay: f64,
    /// Multiplier on a new location's January share in its opening year.
    pub opening_spike: f64,
    pub business_hours: BusinessHours,
    /// Attempts to find an active employee before failing an order.
    pub max_attempts: u32,
    /// Historical orders needed before the monthly curve is taken from history.
    pub min_history_orders_for_curve: u64,
    pub holiday_windows: Vec<HolidayWindow>,
}

impl Default for OrderParams {
    fn default() -> Self {
        Self {
            growth: RateBand::new(0.05, 0.06),
            repeat_rate: 0.005,
            recency_decay: 0.5,
            opening_spike: 2.5,
            business_hours: BusinessHours {
                open_hour: 9,
                close_hour: 19,
            },
            max_attempts: 10,
            min_history_orders_for_curve: 120,
            holiday_windows: vec![
                HolidayWindow::new("memorial_day", (5, 24), (5, 31), 1.2),
                HolidayWindow::new("independence_day", (7, 1), (7, 7), 1.2),
                HolidayWindow::new("black_friday", (11, 23), (11, 30), 1.5),
                HolidayWindow::new("holiday_season", (12, 10), (12, 24), 1.4),
            ],
        }
    }
}

impl OrderParams {
    fn validate(&self) -> Result<()> {
        self.growth.validate("orders.growth")?;
        probability("orders.repeat_rate", self.repeat_rate)?;
        if !(self.recency_decay > 0.0 && self.recency_decay <= 1.0) {
            return Err(config_error("orders.recency_decay must be in (0, 1]"));
        }
        if !(self.opening_spike.is_finite() && self.opening_spike >= 1.0) {
            return Err(config_error("orders.opening_spike must be >= 1"));
        }
        let hours = self.business_hours;
        if hours.open_hour >= hours.close_hour || hours.close_hour > 24 {
            return Err(config_error(
                "orders.business_hours: open_hour must precede close_hour within the day",
            ));
        }
        if self.max_attempts < 1 {
            return Err(config_error("orders.max_attempts must be at least 1"));
        }
        for window in &self.holiday_windows {
            window.validate()?;
        }
        Ok(())
    }
}

/// Basket composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LineItemParams {
    pub min_items: u32,
    pub max_items: u32,
    /// Probability that a line item has quantity above one.
    pub multi_quantity_rate: f64,
    pub max_quantity: u32,
    /// Share of orders whose line items carry a discount.
    pub discount_rate: f64,
}

impl Default for LineItemParams {
    fn default() -> Self {
        Self {
            min_items: 1,
            max_items: 4,
            multi_quantity_rate: 0.02,
            max_quantity: 4,
            discount_rate: 0.25,
        }
    }
}

impl LineItemParams {
    fn validate(&self) -> Result<()> {
        if self.min_items < 1 || self.min_items > self.max_items {
            return Err(config_error("line_items: require 1 <= min_items <= max_items"));
        }
        probability("line_items.multi_quantity_rate", self.multi_quantity_rate)?;
        probability("line_items.discount_rate", self.discount_rate)?;
        if self.max_quantity < 2 {
            return Err(config_error("line_items.max_quantity must be at least 2"));
        }
        Ok(())
    }
}

/// Stock policy for monthly snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct InventoryParams {
    /// Reorder when beginning stock is below this share of the item threshold.
    pub reorder_fraction: f64,
    pub adjustment_rate: f64,
    pub default_threshold_min: i64,
    pub default_threshold_max: i64,
}

impl Default for InventoryParams {
    fn default() -> Self {
        Self {
            reorder_fraction: 0.2,
            adjustment_rate: 0.15,
            default_threshold_min: 30,
            default_threshold_max: 100,
        }
    }
}

impl InventoryParams {
    fn validate(&self) -> Result<()> {
        probability("inventory.reorder_fraction", self.reorder_fraction)?;
        probability("inventory.adjustment_rate", self.adjustment_rate)?;
        if self.default_threshold_min < 1 || self.default_threshold_min >= self.default_threshold_max
        {
            return Err(config_error(
                "inventory: require 1 <= default_threshold_min < default_threshold_max",
            ));
        }
        Ok(())
    }
}

/// Review volume and shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ReviewParams {
    /// Explicit yearly review counts; take precedence over extrapolation.
    pub targets: Vec<YearCount>,
    /// Yearly increase applied when no explicit target exists.
    pub yearly_step: u64,
    pub min_offset_days: u32,
    pub max_offset_days: u32,
}

impl Default for ReviewParams {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            yearly_step: 50,
            min_offset_days: 3,
            max_offset_days: 21,
        }
    }
}

impl ReviewParams {
    pub fn target_for(&self, year: i32) -> Option<u64> {
        self.targets
            .iter()
            .find(|target| target.year == year)
            .map(|target| target.count)
    }

    fn validate(&self) -> Result<()> {
        if self.min_offset_days < 1 || self.min_offset_days > self.max_offset_days {
            return Err(config_error(
                "reviews: require 1 <= min_offset_days <= max_offset_days",
            ));
        }
        Ok(())
    }
}

/// Web traffic calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct WebStatsParams {
    /// Explicit yearly session totals; take precedence over growth.
    pub session_anchors: Vec<YearCount>,
    /// Session growth per unit of order growth; above one means super-linear.
    pub session_elasticity: f64,
    /// Sessions per order when history has no web data.
    pub sessions_per_order: f64,
    pub base_conversion: f64,
    pub conversion_drift: f64,
    pub conversion_noise: f64,
    pub base_mobile_share: f64,
    pub mobile_shift: f64,
    pub mobile_cap: f64,
    pub tablet_share: f64,
}

impl Default for WebStatsParams {
    fn default() -> Self {
        Self {
            session_anchors: Vec::new(),
            session_elasticity: 3.5,
            sessions_per_order: 10.0,
            base_conversion: 52.0,
            conversion_drift: 1.0,
            conversion_noise: 3.0,
            base_mobile_share: 0.57,
            mobile_shift: 0.03,
            mobile_cap: 0.75,
            tablet_share: 0.10,
        }
    }
}

impl WebStatsParams {
    pub fn anchor_for(&self, year: i32) -> Option<u64> {
        self.session_anchors
            .iter()
            .find(|anchor| anchor.year == year)
            .map(|anchor| anchor.count)
    }

    fn validate(&self) -> Result<()> {
        if !(self.session_elasticity.is_finite() && self.session_elasticity >= 1.0) {
            return Err(config_error("web_stats.session_elasticity must be >= 1"));
        }
        if !(self.sessions_per_order.is_finite() && self.sessions_per_order > 0.0) {
            return Err(config_error("web_stats.sessions_per_order must be positive"));
        }
        if !(0.0..=100.0).contains(&self.base_conversion) {
            return Err(config_error("web_stats.base_conversion must be a percentage"));
        }
        if self.conversion_noise < 0.0 {
            return Err(config_error("web_stats.conversion_noise must not be negative"));
        }
        probability("web_stats.base_mobile_share", self.base_mobile_share)?;
        probability("web_stats.mobile_shift", self.mobile_shift)?;
        probability("web_stats.mobile_cap", self.mobile_cap)?;
        probability("web_stats.tablet_share", self.tablet_share)?;
        if self.mobile_cap + self.tablet_share >= 1.0 || self.tablet_share <= 0.0 {
            return Err(config_error(
                "web_stats: mobile_cap + tablet_share must leave room for desktop traffic",
            ));
        }
        Ok(())
    }
}

/// Semi-annual skill reviews of active employees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SkillReviewParams {
    pub salesmanship_mean: f64,
    pub product_knowledge_mean: f64,
    pub team_player_mean: f64,
    pub innovator_mean: f64,
    pub satisfaction_mean: f64,
    /// Half-width of the uniform jitter around each mean.
    pub spread: f64,
    /// Mean increase, sampled per rating, when the matching training is set.
    pub training_boost: RateBand,
    pub min_rating: f64,
    pub max_rating: f64,
    /// Inclusive day range of the January review.
    pub january_days: (u32, u32),
    /// Inclusive day range of the July review.
    pub july_days: (u32, u32),
}

impl Default for SkillReviewParams {
    fn default() -> Self {
        Self {
            salesmanship_mean: 3.4,
            product_knowledge_mean: 3.6,
            team_player_mean: 3.7,
            innovator_mean: 3.5,
            satisfaction_mean: 3.3,
            spread: 1.2,
            training_boost: RateBand::new(0.5, 0.8),
            min_rating: 2.0,
            max_rating: 5.0,
            january_days: (9, 16),
            july_days: (1, 8),
        }
    }
}

impl SkillReviewParams {
    fn validate(&self) -> Result<()> {
        self.training_boost.validate("skill_reviews.training_boost")?;
        let means = [
            self.salesmanship_mean,
            self.product_knowledge_mean,
            self.team_player_mean,
            self.innovator_mean,
            self.satisfaction_mean,
        ];
        if !(1.0 <= self.min_rating && self.min_rating <= self.max_rating && self.max_rating <= 5.0)
        {
            return Err(config_error(
                "skill_reviews: require 1 <= min_rating <= max_rating <= 5",
            ));
        }
        if means.iter().any(|mean| !(1.0..=5.0).contains(mean)) {
            return Err(config_error("skill_reviews: means must be within [1, 5]"));
        }
        if !(self.spread.is_finite() && self.spread >= 0.0) {
            return Err(config_error("skill_reviews.spread must not be negative"));
        }
        for (name, (first, last)) in [
            ("january_days", self.january_days),
            ("july_days", self.july_days),
        ] {
            if first < 1 || first > last || last > 28 {
                return Err(config_error(format!(
                    "skill_reviews.{name}: require 1 <= first <= last <= 28"
                )));
            }
        }
        Ok(())
    }
}

/// Reasons attached to terminations in generated years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TerminationParams {
    /// Used when history records no termination reasons.
    pub reasons: Vec<LabelWeight>,
}

impl Default for TerminationParams {
    fn default() -> Self {
        Self {
            reasons: label_weights(&[
                ("Another Job", 0.50),
                ("Moved", 0.25),
                ("Terminated", 0.25),
            ]),
        }
    }
}

impl TerminationParams {
    fn validate(&self) -> Result<()> {
        validate_label_weights("terminations.reasons", &self.reasons)
    }
}

/// Line-item returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ReturnParams {
    /// Share of a year's new line items that are returned.
    pub rate: RateBand,
    /// Used when history records no returns.
    pub reasons: Vec<LabelWeight>,
}

impl Default for ReturnParams {
    fn default() -> Self {
        Self {
            rate: RateBand::new(0.045, 0.05),
            reasons: label_weights(&[("R1", 0.34), ("R2", 0.34), ("R3", 0.32)]),
        }
    }
}

impl ReturnParams {
    fn validate(&self) -> Result<()> {
        self.rate.validate("returns.rate")?;
        validate_label_weights("returns.reasons", &self.reasons)
    }
}

/// Tolerances for soft fidelity checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ValidationParams {
    /// Relative slack around the extrapolated yearly order trend.
    pub order_trend_tolerance: f64,
    /// Absolute slack around the customer growth band.
    pub customer_growth_tolerance: f64,
}

impl Default for ValidationParams {
    fn default() -> Self {
        Self {
            order_trend_tolerance: 0.10,
            customer_growth_tolerance: 0.01,
        }
    }
}

impl ValidationParams {
    fn validate(&self) -> Result<()> {
        if self.order_trend_tolerance < 0.0 || self.customer_growth_tolerance < 0.0 {
            return Err(config_error("validation tolerances must not be negative"));
        }
        Ok(())
    }
}

fn probability(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(config_error(format!("{name} must be within [0, 1] (got {value})")))
    }
}

fn config_error(message: impl Into<String>) -> Error {
    Error::Configuration(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        PipelineConfig::default().validate().expect("defaults validate");
    }

    #[test]
    fn years_cover_the_requested_range() {
        let config = PipelineConfig::new(2022, 4);
        assert_eq!(config.years(), vec![2022, 2023, 2024, 2025]);
        assert_eq!(config.end_year(), 2025);
    }

    #[test]
    fn zero_years_is_a_configuration_error() {
        let config = PipelineConfig::new(2022, 0);
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn inverted_growth_band_is_rejected() {
        let mut config = PipelineConfig::default();
        config.customers.growth = RateBand::new(0.08, 0.05);
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn zero_weight_label_mix_is_rejected() {
        let mut config = PipelineConfig::default();
        config.returns.reasons = vec![LabelWeight::new("R1", 0.0)];
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        let mut config = PipelineConfig::default();
        config.customers.new_store.sources.clear();
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn review_window_outside_month_is_rejected() {
        let mut config = PipelineConfig::default();
        config.skill_reviews.july_days = (8, 1);
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn holiday_window_matches_inclusive_bounds() {
        let window = HolidayWindow::new("black_friday", (11, 23), (11, 30), 1.5);
        let inside = NaiveDate::from_ymd_opt(2023, 11, 30).unwrap();
        let outside = NaiveDate::from_ymd_opt(2023, 12, 1).unwrap();
        assert!(window.contains(inside));
        assert!(!window.contains(outside));
    }
}
