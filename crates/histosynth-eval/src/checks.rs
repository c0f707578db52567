//! Hard integrity checks. Any failure fails the run.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt::Display;

use chrono::{Datelike, NaiveDate};

use histosynth_core::{
    EmploymentPeriod, History, LocationId, PipelineConfig, SynthesizedTables, first_of_month, names,
};
use histosynth_generate::{EmployeeRoster, GenerationResult, HistoryProfile};

use crate::metrics::CheckStats;
use crate::model::Violation;

/// Check codes used in `ValidationReport::checks`.
pub mod codes {
    pub const FOREIGN_KEY: &str = "foreign_key";
    pub const NEGATIVE_QUANTITY: &str = "negative_quantity";
    pub const ORDER_WITHOUT_ITEMS: &str = "order_without_items";
    pub const REVIEW_TIMING: &str = "review_timing";
    pub const DUPLICATE_REVIEW: &str = "duplicate_review";
    pub const ORDER_STAFFING: &str = "order_staffing";
    pub const BUSINESS_HOURS: &str = "business_hours";
    pub const ID_SEQUENCE: &str = "id_sequence";
    pub const PERIOD_NOT_ABSORBING: &str = "period_not_absorbing";
    pub const INVENTORY_BEFORE_OPENING: &str = "inventory_before_opening";
    pub const SKILL_REVIEW_TENURE: &str = "skill_review_tenure";
    pub const SKILL_RATING_RANGE: &str = "skill_rating_range";
    pub const TERMINATION_MISMATCH: &str = "termination_mismatch";
    pub const DUPLICATE_RETURN: &str = "duplicate_return";
}

/// Everything a check may look at.
#[derive(Debug, Clone, Copy)]
pub struct CheckInput<'a> {
    pub config: &'a PipelineConfig,
    pub history: &'a History,
    pub result: &'a GenerationResult,
}

impl<'a> CheckInput<'a> {
    fn tables(&self) -> &'a SynthesizedTables {
        &self.result.tables
    }

    fn profile(&self) -> &'a HistoryProfile {
        &self.result.profile
    }
}

/// Counters and failures collected by the hard checks.
#[derive(Debug, Clone, Default)]
pub struct CheckLog {
    pub checks: BTreeMap<String, CheckStats>,
    pub violations: Vec<Violation>,
}

impl CheckLog {
    fn record(
        &mut self,
        passed: bool,
        code: &str,
        path: &str,
        key: impl Display,
        message: impl FnOnce() -> String,
    ) {
        let stats = self.checks.entry(code.to_string()).or_default();
        stats.checked += 1;
        if !passed {
            stats.violations += 1;
            self.violations.push(Violation {
                code: code.to_string(),
                path: path.to_string(),
                message: message(),
                key: Some(key.to_string()),
            });
        }
    }
}

/// Run every hard check over the synthesized tables.
pub fn run_hard_checks(input: &CheckInput<'_>) -> CheckLog {
    let mut log = CheckLog::default();
    check_foreign_keys(input, &mut log);
    check_inventory_quantities(input, &mut log);
    check_orders_have_items(input, &mut log);
    check_reviews(input, &mut log);
    check_order_staffing(input, &mut log);
    check_business_hours(input, &mut log);
    check_id_sequences(input, &mut log);
    check_absorbing_periods(input, &mut log);
    check_inventory_after_opening(input, &mut log);
    check_skill_reviews(input, &mut log);
    check_termination_reasons(input, &mut log);
    check_line_item_returns(input, &mut log);
    log.violations.sort_by(|a, b| {
        (a.code.as_str(), a.path.as_str(), a.key.as_deref())
            .cmp(&(b.code.as_str(), b.path.as_str(), b.key.as_deref()))
    });
    log
}

fn check_foreign_keys(input: &CheckInput<'_>, log: &mut CheckLog) {
    let history = input.history;
    let tables = input.tables();
    let profile = input.profile();

    let locations: BTreeSet<&LocationId> = profile
        .locations
        .iter()
        .chain(&tables.locations)
        .map(|location| &location.id)
        .collect();
    let customers: HashSet<u64> = history
        .customers
        .iter()
        .chain(&tables.customers)
        .map(|customer| customer.id)
        .chain(profile.customer_last_order_year.keys().copied())
        .collect();
    let employees: HashSet<u64> = history
        .employees
        .iter()
        .chain(&tables.employees)
        .map(|employee| employee.id)
        .chain(history.employment_periods.iter().map(|period| period.employee_id))
        .collect();
    let orders: HashSet<u64> = history
        .orders
        .iter()
        .chain(&tables.orders)
        .map(|order| order.order_id)
        .collect();
    let line_items: HashSet<u64> = history
        .line_items
        .iter()
        .chain(&tables.line_items)
        .map(|line| line.line_item_id)
        .collect();
    let items: HashSet<u32> = history.items.iter().map(|item| item.item_id).collect();
    let discounts: HashSet<&str> = history
        .discounts
        .iter()
        .map(|discount| discount.discount_id.as_str())
        .collect();

    let mut fk = |passed: bool, path: &str, key: String, target: &str, value: String| {
        log.record(passed, codes::FOREIGN_KEY, path, key, || {
            format!("references missing {target} '{value}'")
        });
    };

    for customer in &tables.customers {
        fk(
            locations.contains(&customer.location_id),
            names::CUSTOMERS,
            customer.id.to_string(),
            names::LOCATIONS,
            customer.location_id.to_string(),
        );
    }
    for employee in &tables.employees {
        fk(
            locations.contains(&employee.location_id),
            names::EMPLOYEES,
            employee.id.to_string(),
            names::LOCATIONS,
            employee.location_id.to_string(),
        );
    }
    for period in &tables.employment_periods {
        fk(
            employees.contains(&period.employee_id),
            names::EMPLOYMENT_PERIODS,
            format!("{}/{}", period.employee_id, period.year),
            names::EMPLOYEES,
            period.employee_id.to_string(),
        );
    }
    for order in &tables.orders {
        let key = order.order_id.to_string();
        fk(
            customers.contains(&order.customer_id),
            names::ORDERS,
            key.clone(),
            names::CUSTOMERS,
            order.customer_id.to_string(),
        );
        fk(
            employees.contains(&order.employee_id),
            names::ORDERS,
            key.clone(),
            names::EMPLOYEES,
            order.employee_id.to_string(),
        );
        fk(
            locations.contains(&order.location_id),
            names::ORDERS,
            key,
            names::LOCATIONS,
            order.location_id.to_string(),
        );
    }
    for line in &tables.line_items {
        let key = line.line_item_id.to_string();
        fk(
            orders.contains(&line.order_id),
            names::LINE_ITEMS,
            key.clone(),
            names::ORDERS,
            line.order_id.to_string(),
        );
        fk(
            items.contains(&line.item_id),
            names::LINE_ITEMS,
            key.clone(),
            names::ITEMS,
            line.item_id.to_string(),
        );
        if let Some(discount_id) = &line.discount_id {
            fk(
                discounts.contains(discount_id.as_str()),
                names::LINE_ITEMS,
                key,
                names::DISCOUNTS,
                discount_id.clone(),
            );
        }
    }
    for record in &tables.inventory {
        let key = format!("{}/{}/{}", record.location_id, record.item_id, record.month);
        fk(
            locations.contains(&record.location_id),
            names::INVENTORY,
            key.clone(),
            names::LOCATIONS,
            record.location_id.to_string(),
        );
        fk(
            items.contains(&record.item_id),
            names::INVENTORY,
            key,
            names::ITEMS,
            record.item_id.to_string(),
        );
    }
    for review in &tables.reviews {
        fk(
            orders.contains(&review.order_id),
            names::REVIEWS,
            review.review_id.to_string(),
            names::ORDERS,
            review.order_id.to_string(),
        );
    }
    for review in &tables.skill_reviews {
        fk(
            employees.contains(&review.employee_id),
            names::SKILL_REVIEWS,
            format!("{}/{}", review.employee_id, review.date),
            names::EMPLOYEES,
            review.employee_id.to_string(),
        );
    }
    for reason in &tables.termination_reasons {
        fk(
            employees.contains(&reason.employee_id),
            names::TERMINATION_REASONS,
            reason.employee_id.to_string(),
            names::EMPLOYEES,
            reason.employee_id.to_string(),
        );
    }
    for line_return in &tables.line_item_returns {
        fk(
            line_items.contains(&line_return.line_item_id),
            names::LINE_ITEM_RETURNS,
            line_return.line_item_id.to_string(),
            names::LINE_ITEMS,
            line_return.line_item_id.to_string(),
        );
    }
}

fn check_inventory_quantities(input: &CheckInput<'_>, log: &mut CheckLog) {
    for record in &input.tables().inventory {
        let ending = record.ending_on_hand();
        let passed = record.beginning_on_hand >= 0
            && record.purchased_qty >= 0
            && record.sold_qty >= 0
            && ending >= 0;
        log.record(
            passed,
            codes::NEGATIVE_QUANTITY,
            names::INVENTORY,
            format!("{}/{}/{}", record.location_id, record.item_id, record.month),
            || {
                format!(
                    "negative quantity: beginning {}, purchased {}, sold {}, ending {ending}",
                    record.beginning_on_hand, record.purchased_qty, record.sold_qty
                )
            },
        );
    }
}

fn check_orders_have_items(input: &CheckInput<'_>, log: &mut CheckLog) {
    let tables = input.tables();
    let with_items: HashSet<u64> = tables.line_items.iter().map(|line| line.order_id).collect();
    for order in &tables.orders {
        log.record(
            with_items.contains(&order.order_id),
            codes::ORDER_WITHOUT_ITEMS,
            names::ORDERS,
            order.order_id,
            || "order has no line items".to_string(),
        );
    }
}

fn check_reviews(input: &CheckInput<'_>, log: &mut CheckLog) {
    let tables = input.tables();
    let params = &input.config.reviews;
    let order_dates: HashMap<u64, NaiveDate> = input
        .history
        .orders
        .iter()
        .chain(&tables.orders)
        .map(|order| (order.order_id, order.date))
        .collect();

    let mut per_order: HashMap<u64, u64> = HashMap::new();
    for review in &input.history.reviews {
        *per_order.entry(review.order_id).or_insert(0) += 1;
    }

    for review in &tables.reviews {
        let count = per_order.entry(review.order_id).or_insert(0);
        *count += 1;
        let duplicated = *count > 1;
        log.record(
            !duplicated,
            codes::DUPLICATE_REVIEW,
            names::REVIEWS,
            review.review_id,
            || format!("order {} already has a review", review.order_id),
        );

        let Some(order_date) = order_dates.get(&review.order_id) else {
            continue;
        };
        let offset = (review.date - *order_date).num_days();
        let passed = offset > 0
            && offset >= i64::from(params.min_offset_days)
            && offset <= i64::from(params.max_offset_days);
        log.record(passed, codes::REVIEW_TIMING, names::REVIEWS, review.review_id, || {
            format!(
                "review {offset} day(s) after order {}, expected {}..={}",
                review.order_id, params.min_offset_days, params.max_offset_days
            )
        });
    }
}

/// Tenures of historical and generated employees after every termination.
fn combined_roster(input: &CheckInput<'_>) -> EmployeeRoster {
    let history = input.history;
    let tables = input.tables();
    EmployeeRoster::from_records(
        history.employees.iter().chain(&tables.employees),
        history
            .employment_periods
            .iter()
            .chain(&tables.employment_periods),
    )
}

fn check_order_staffing(input: &CheckInput<'_>, log: &mut CheckLog) {
    let tables = input.tables();
    let roster = combined_roster(input);

    for order in &tables.orders {
        let tenure = roster.tenure(order.employee_id);
        let passed = tenure.is_some_and(|tenure| {
            tenure.is_active(order.date) && tenure.location_id == order.location_id
        });
        log.record(passed, codes::ORDER_STAFFING, names::ORDERS, order.order_id, || {
            format!(
                "employee {} is not active at {} on {}",
                order.employee_id, order.location_id, order.date
            )
        });
    }
}

fn check_business_hours(input: &CheckInput<'_>, log: &mut CheckLog) {
    let hours = input.config.orders.business_hours;
    for order in &input.tables().orders {
        log.record(
            hours.contains(order.time),
            codes::BUSINESS_HOURS,
            names::ORDERS,
            order.order_id,
            || {
                format!(
                    "order time {} outside {}:00-{}:00",
                    order.time, hours.open_hour, hours.close_hour
                )
            },
        );
    }
}

fn check_id_sequences(input: &CheckInput<'_>, log: &mut CheckLog) {
    let tables = input.tables();
    let profile = input.profile();
    let sequences: [(&str, u64, Vec<u64>); 5] = [
        (
            names::CUSTOMERS,
            profile.max_customer_id,
            tables.customers.iter().map(|row| row.id).collect(),
        ),
        (
            names::EMPLOYEES,
            profile.max_employee_id,
            tables.employees.iter().map(|row| row.id).collect(),
        ),
        (
            names::ORDERS,
            profile.max_order_id,
            tables.orders.iter().map(|row| row.order_id).collect(),
        ),
        (
            names::LINE_ITEMS,
            profile.max_line_item_id,
            tables.line_items.iter().map(|row| row.line_item_id).collect(),
        ),
        (
            names::REVIEWS,
            profile.max_review_id,
            tables.reviews.iter().map(|row| row.review_id).collect(),
        ),
    ];

    for (table, historical_max, ids) in sequences {
        let mut previous = historical_max;
        for id in ids {
            log.record(id > previous, codes::ID_SEQUENCE, table, id, || {
                format!("id {id} does not follow {previous}")
            });
            previous = previous.max(id);
        }
    }
}

fn check_absorbing_periods(input: &CheckInput<'_>, log: &mut CheckLog) {
    let tables = input.tables();
    let generated: BTreeSet<u64> = tables
        .employment_periods
        .iter()
        .map(|period| period.employee_id)
        .collect();

    let mut by_employee: BTreeMap<u64, Vec<&EmploymentPeriod>> = BTreeMap::new();
    for period in input
        .history
        .employment_periods
        .iter()
        .chain(&tables.employment_periods)
    {
        if generated.contains(&period.employee_id) {
            by_employee.entry(period.employee_id).or_default().push(period);
        }
    }

    for (employee_id, mut periods) in by_employee {
        periods.sort_by_key(|period| period.year);
        let terminated_at = periods.iter().position(|period| !period.active);
        let after_termination = terminated_at.is_some_and(|idx| idx + 1 < periods.len());
        let misplaced_date = periods.iter().any(|period| {
            period.active == period.terminated_on.is_some()
                || period
                    .terminated_on
                    .is_some_and(|date| date.year() != period.year)
        });
        log.record(
            !after_termination && !misplaced_date,
            codes::PERIOD_NOT_ABSORBING,
            names::EMPLOYMENT_PERIODS,
            employee_id,
            || "employment status changes after termination".to_string(),
        );
    }
}

fn check_inventory_after_opening(input: &CheckInput<'_>, log: &mut CheckLog) {
    let tables = input.tables();
    let opened: HashMap<&LocationId, NaiveDate> = tables
        .locations
        .iter()
        .map(|location| (&location.id, first_of_month(location.opened_on)))
        .collect();
    for record in &tables.inventory {
        let Some(opening_month) = opened.get(&record.location_id) else {
            continue;
        };
        log.record(
            record.month >= *opening_month,
            codes::INVENTORY_BEFORE_OPENING,
            names::INVENTORY,
            format!("{}/{}/{}", record.location_id, record.item_id, record.month),
            || format!("stock recorded before {} opened", record.location_id),
        );
    }
}

fn check_skill_reviews(input: &CheckInput<'_>, log: &mut CheckLog) {
    let params = &input.config.skill_reviews;
    let roster = combined_roster(input);
    for review in &input.tables().skill_reviews {
        let key = format!("{}/{}", review.employee_id, review.date);
        let active = roster
            .tenure(review.employee_id)
            .is_some_and(|tenure| tenure.is_active(review.date));
        log.record(
            active,
            codes::SKILL_REVIEW_TENURE,
            names::SKILL_REVIEWS,
            &key,
            || format!("employee {} is not active on {}", review.employee_id, review.date),
        );
        let in_range = review
            .ratings()
            .iter()
            .all(|rating| (params.min_rating..=params.max_rating).contains(rating));
        log.record(in_range, codes::SKILL_RATING_RANGE, names::SKILL_REVIEWS, &key, || {
            format!(
                "ratings {:?} outside {}..={}",
                review.ratings(),
                params.min_rating,
                params.max_rating
            )
        });
    }
}

fn check_termination_reasons(input: &CheckInput<'_>, log: &mut CheckLog) {
    let roster = combined_roster(input);
    let mut seen: HashSet<u64> = input
        .history
        .termination_reasons
        .iter()
        .map(|reason| reason.employee_id)
        .collect();
    for reason in &input.tables().termination_reasons {
        let matches = roster
            .tenure(reason.employee_id)
            .is_some_and(|tenure| tenure.end == Some(reason.terminated_on));
        let first = seen.insert(reason.employee_id);
        log.record(
            matches && first,
            codes::TERMINATION_MISMATCH,
            names::TERMINATION_REASONS,
            reason.employee_id,
            || {
                format!(
                    "reason for a termination on {} that is not recorded once",
                    reason.terminated_on
                )
            },
        );
    }
}

fn check_line_item_returns(input: &CheckInput<'_>, log: &mut CheckLog) {
    let mut seen: HashSet<u64> = input
        .history
        .line_item_returns
        .iter()
        .map(|line_return| line_return.line_item_id)
        .collect();
    for line_return in &input.tables().line_item_returns {
        log.record(
            seen.insert(line_return.line_item_id),
            codes::DUPLICATE_RETURN,
            names::LINE_ITEM_RETURNS,
            line_return.line_item_id,
            || "line item returned more than once".to_string(),
        );
    }
}
