//! One-pass analysis of the historical tables.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};

use histosynth_core::{History, Location, LocationId};

use crate::errors::GenerationError;

/// Historical web traffic averages used as the synthesis baseline.
#[derive(Debug, Clone, PartialEq)]
pub struct WebBaseline {
    pub pages_per_session: f64,
    pub avg_time_on_page_secs: f64,
    pub conversion_rate: f64,
    pub bounce_rate: f64,
    pub mobile_share: f64,
    pub tablet_share: f64,
}

impl Default for WebBaseline {
    fn default() -> Self {
        Self {
            pages_per_session: 2.4,
            avg_time_on_page_secs: 52.0,
            conversion_rate: 52.0,
            bounce_rate: 41.0,
            mobile_share: 0.57,
            tablet_share: 0.10,
        }
    }
}

/// Statistics derived once from history and shared by every stage.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryProfile {
    pub first_year: i32,
    pub last_year: i32,
    pub max_customer_id: u64,
    pub max_employee_id: u64,
    pub max_order_id: u64,
    pub max_line_item_id: u64,
    pub max_review_id: u64,
    pub yearly_orders: BTreeMap<i32, u64>,
    /// Distinct customers ordering per year.
    pub active_customers: BTreeMap<i32, u64>,
    pub monthly_orders: [u64; 12],
    /// Orders per location in the last historical year.
    pub location_orders: BTreeMap<LocationId, u64>,
    /// Inferred location registry, ordered by id.
    pub locations: Vec<Location>,
    /// Line items per catalog item.
    pub item_popularity: BTreeMap<u32, u64>,
    pub discount_usage: BTreeMap<String, u64>,
    pub source_counts: BTreeMap<String, u64>,
    pub gender_counts: BTreeMap<String, u64>,
    pub rating_counts: BTreeMap<u8, u64>,
    pub platform_counts: BTreeMap<String, u64>,
    pub yearly_reviews: BTreeMap<i32, u64>,
    pub yearly_sessions: BTreeMap<i32, u64>,
    pub web_baseline: Option<WebBaseline>,
    pub customer_last_order_year: BTreeMap<u64, i32>,
    pub customer_home: BTreeMap<u64, LocationId>,
    /// Ending stock of the latest record per (location, item).
    pub inventory_ending: BTreeMap<(LocationId, u32), i64>,
    /// Highest stocking level (beginning + purchased) seen per item.
    pub item_thresholds: BTreeMap<u32, i64>,
    pub termination_reason_counts: BTreeMap<String, u64>,
    pub return_reason_counts: BTreeMap<String, u64>,
}

impl HistoryProfile {
    pub fn analyze(history: &History) -> Result<Self, GenerationError> {
        if history.orders.is_empty() {
            return Err(GenerationError::InvalidHistory(
                "history has no orders".to_string(),
            ));
        }
        if history.items.is_empty() {
            return Err(GenerationError::InvalidHistory(
                "item lookup is empty".to_string(),
            ));
        }

        let mut yearly_orders: BTreeMap<i32, u64> = BTreeMap::new();
        let mut yearly_customers: BTreeMap<i32, BTreeSet<u64>> = BTreeMap::new();
        let mut monthly_orders = [0_u64; 12];
        let mut customer_last_order_year: BTreeMap<u64, i32> = BTreeMap::new();
        let mut order_years: BTreeMap<u64, i32> = BTreeMap::new();
        for order in &history.orders {
            let year = order.date.year();
            order_years.insert(order.order_id, year);
            *yearly_orders.entry(year).or_insert(0) += 1;
            yearly_customers
                .entry(year)
                .or_default()
                .insert(order.customer_id);
            monthly_orders[order.date.month0() as usize] += 1;
            let last = customer_last_order_year
                .entry(order.customer_id)
                .or_insert(year);
            *last = (*last).max(year);
        }

        let first_year = yearly_orders.keys().next().copied().unwrap_or_default();
        let last_year = yearly_orders.keys().next_back().copied().unwrap_or_default();
        let active_customers = yearly_customers
            .into_iter()
            .map(|(year, customers)| (year, customers.len() as u64))
            .collect();

        let mut location_orders: BTreeMap<LocationId, u64> = BTreeMap::new();
        for order in history.orders.iter().filter(|o| o.date.year() == last_year) {
            *location_orders.entry(order.location_id.clone()).or_insert(0) += 1;
        }

        let locations = infer_locations(history);

        let mut item_popularity: BTreeMap<u32, u64> = BTreeMap::new();
        let mut discount_usage: BTreeMap<String, u64> = BTreeMap::new();
        for line in &history.line_items {
            *item_popularity.entry(line.item_id).or_insert(0) += 1;
            if let Some(discount) = &line.discount_id {
                *discount_usage.entry(discount.clone()).or_insert(0) += 1;
            }
        }

        let mut source_counts: BTreeMap<String, u64> = BTreeMap::new();
        let mut gender_counts: BTreeMap<String, u64> = BTreeMap::new();
        let mut customer_home = BTreeMap::new();
        for customer in &history.customers {
            *source_counts.entry(customer.source.clone()).or_insert(0) += 1;
            *gender_counts.entry(customer.gender.clone()).or_insert(0) += 1;
            customer_home.insert(customer.id, customer.location_id.clone());
        }

        let mut rating_counts: BTreeMap<u8, u64> = BTreeMap::new();
        let mut platform_counts: BTreeMap<String, u64> = BTreeMap::new();
        let mut yearly_reviews: BTreeMap<i32, u64> = BTreeMap::new();
        for review in &history.reviews {
            *rating_counts.entry(review.rating).or_insert(0) += 1;
            *platform_counts.entry(review.platform.clone()).or_insert(0) += 1;
            let year = order_years
                .get(&review.order_id)
                .copied()
                .unwrap_or_else(|| review.date.year());
            *yearly_reviews.entry(year).or_insert(0) += 1;
        }

        let mut yearly_sessions: BTreeMap<i32, u64> = BTreeMap::new();
        for stat in &history.web_stats {
            *yearly_sessions.entry(stat.month.year()).or_insert(0) += stat.sessions;
        }

        let mut inventory_latest: BTreeMap<(LocationId, u32), (NaiveDate, i64)> = BTreeMap::new();
        let mut item_thresholds: BTreeMap<u32, i64> = BTreeMap::new();
        for record in &history.inventory {
            let key = (record.location_id.clone(), record.item_id);
            let ending = record.ending_on_hand();
            match inventory_latest.get(&key) {
                Some((month, _)) if *month >= record.month => {}
                _ => {
                    inventory_latest.insert(key, (record.month, ending));
                }
            }
            let level = record.beginning_on_hand + record.purchased_qty;
            let threshold = item_thresholds.entry(record.item_id).or_insert(level);
            *threshold = (*threshold).max(level);
        }
        item_thresholds.retain(|_, level| *level > 0);
        let inventory_ending = inventory_latest
            .into_iter()
            .map(|(key, (_, ending))| (key, ending))
            .collect();

        let mut termination_reason_counts: BTreeMap<String, u64> = BTreeMap::new();
        for reason in &history.termination_reasons {
            *termination_reason_counts.entry(reason.reason.clone()).or_insert(0) += 1;
        }
        let mut return_reason_counts: BTreeMap<String, u64> = BTreeMap::new();
        for line_return in &history.line_item_returns {
            *return_reason_counts
                .entry(line_return.return_id.clone())
                .or_insert(0) += 1;
        }

        Ok(Self {
            first_year,
            last_year,
            max_customer_id: max_customer_id(history),
            max_employee_id: max_employee_id(history),
            max_order_id: history.orders.iter().map(|o| o.order_id).max().unwrap_or(0),
            max_line_item_id: history
                .line_items
                .iter()
                .map(|l| l.line_item_id)
                .max()
                .unwrap_or(0),
            max_review_id: history.reviews.iter().map(|r| r.review_id).max().unwrap_or(0),
            yearly_orders,
            active_customers,
            monthly_orders,
            location_orders,
            locations,
            item_popularity,
            discount_usage,
            source_counts,
            gender_counts,
            rating_counts,
            platform_counts,
            yearly_reviews,
            yearly_sessions,
            web_baseline: web_baseline(history),
            customer_last_order_year,
            customer_home,
            inventory_ending,
            item_thresholds,
            termination_reason_counts,
            return_reason_counts,
        })
    }

    pub fn last_year_orders(&self) -> u64 {
        self.yearly_orders.get(&self.last_year).copied().unwrap_or(0)
    }

    /// Active customers of the last historical year, falling back to the
    /// customer table size when no order references a customer.
    pub fn last_year_active_customers(&self) -> u64 {
        match self.active_customers.get(&self.last_year).copied() {
            Some(active) if active > 0 => active,
            _ => (self.customer_home.len() as u64).max(1),
        }
    }

    pub fn last_year_reviews(&self) -> u64 {
        self.yearly_reviews.get(&self.last_year).copied().unwrap_or(0)
    }

    pub fn last_year_sessions(&self) -> Option<u64> {
        self.yearly_sessions.get(&self.last_year).copied()
    }

    pub fn location_ids(&self) -> impl Iterator<Item = &LocationId> {
        self.locations.iter().map(|location| &location.id)
    }
}

/// Highest customer id referenced anywhere in history, including ids that
/// only appear on orders.
fn max_customer_id(history: &History) -> u64 {
    history
        .customers
        .iter()
        .map(|customer| customer.id)
        .chain(history.orders.iter().map(|order| order.customer_id))
        .max()
        .unwrap_or(0)
}

fn max_employee_id(history: &History) -> u64 {
    history
        .employees
        .iter()
        .map(|employee| employee.id)
        .chain(history.employment_periods.iter().map(|period| period.employee_id))
        .chain(history.orders.iter().map(|order| order.employee_id))
        .max()
        .unwrap_or(0)
}

/// Locations referenced by orders, inventory or employees, opened on January 1
/// of their first active year.
fn infer_locations(history: &History) -> Vec<Location> {
    let mut first_year: BTreeMap<LocationId, i32> = BTreeMap::new();
    let mut observe = |id: &LocationId, year: i32| {
        let entry = first_year.entry(id.clone()).or_insert(year);
        *entry = (*entry).min(year);
    };
    for order in &history.orders {
        observe(&order.location_id, order.date.year());
    }
    for record in &history.inventory {
        observe(&record.location_id, record.month.year());
    }
    for employee in &history.employees {
        observe(&employee.location_id, employee.start_date.year());
    }

    first_year
        .into_iter()
        .filter_map(|(id, year)| {
            NaiveDate::from_ymd_opt(year, 1, 1).map(|opened_on| Location { id, opened_on })
        })
        .collect()
}

fn web_baseline(history: &History) -> Option<WebBaseline> {
    let stats = &history.web_stats;
    if stats.is_empty() {
        return None;
    }
    let count = stats.len() as f64;
    let sessions: u64 = stats.iter().map(|s| s.sessions).sum();
    let page_views: u64 = stats.iter().map(|s| s.page_views).sum();
    let mean = |value: fn(&histosynth_core::WebStat) -> f64| stats.iter().map(value).sum::<f64>() / count;

    let defaults = WebBaseline::default();
    Some(WebBaseline {
        pages_per_session: if sessions > 0 {
            page_views as f64 / sessions as f64
        } else {
            defaults.pages_per_session
        },
        avg_time_on_page_secs: mean(|s| s.avg_time_on_page_secs),
        conversion_rate: mean(|s| s.conversion_rate),
        bounce_rate: mean(|s| s.bounce_rate),
        mobile_share: mean(|s| s.mobile_share),
        tablet_share: mean(|s| s.tablet_share),
    })
}
