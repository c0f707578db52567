use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate, NaiveTime};
use rand::Rng;
use rand::seq::IndexedRandom;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use histosynth_core::tables::names;
use histosynth_core::{LocationId, Order, OrderParams, Stage};

use crate::calendar::{SeasonalCurve, YearCalendar, sample_time, year_start};
use crate::errors::GenerationError;
use crate::history::HistoryProfile;
use crate::model::{GenerationIssue, codes};
use crate::random::SeedSource;
use crate::sampling::Categorical;
use crate::synth::customers::CustomerOutput;
use crate::synth::employees::EmployeeOutput;
use crate::synth::locations::LocationPlan;

/// Generated orders plus per-year bookkeeping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderOutput {
    pub orders: Vec<Order>,
    /// Trend target per year, before opening spikes.
    pub targets: BTreeMap<i32, u64>,
    /// Extra January orders at the location opened that year.
    pub spike_orders: BTreeMap<i32, u64>,
    pub issues: Vec<GenerationIssue>,
}

impl OrderOutput {
    pub fn in_year(&self, year: i32) -> impl Iterator<Item = &Order> {
        self.orders.iter().filter(move |order| order.date.year() == year)
    }

    pub fn yearly_counts(&self) -> BTreeMap<i32, u64> {
        let mut counts = BTreeMap::new();
        for order in &self.orders {
            *counts.entry(order.date.year()).or_insert(0) += 1;
        }
        counts
    }

    pub fn monthly_counts(&self, year: i32) -> [u64; 12] {
        let mut counts = [0_u64; 12];
        for order in self.in_year(year) {
            counts[order.date.month0() as usize] += 1;
        }
        counts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OrderKind {
    First,
    /// First order of a grand-opening customer; `early` ones fall in the
    /// opening window, the rest after it.
    NewStore { early: bool },
    Repeat,
    Opening,
}

#[derive(Debug, Clone)]
struct Draft {
    date: NaiveDate,
    time: NaiveTime,
    seq: usize,
    customer_id: u64,
    employee_id: u64,
    location_id: LocationId,
}

/// Generates orders year by year from the growth trend, new customers,
/// repeat buyers and location openings.
#[derive(Debug, Clone)]
pub struct OrderSynthesizer<'a> {
    profile: &'a HistoryProfile,
    params: &'a OrderParams,
    start_year: i32,
    years: &'a [i32],
    locations: &'a LocationPlan,
    customers: &'a CustomerOutput,
    employees: &'a EmployeeOutput,
}

impl<'a> OrderSynthesizer<'a> {
    pub fn new(
        profile: &'a HistoryProfile,
        params: &'a OrderParams,
        years: &'a [i32],
        locations: &'a LocationPlan,
        customers: &'a CustomerOutput,
        employees: &'a EmployeeOutput,
    ) -> Self {
        Self {
            profile,
            params,
            start_year: years.first().copied().unwrap_or(profile.last_year + 1),
            years,
            locations,
            customers,
            employees,
        }
    }

    pub fn run(&self, seeds: &SeedSource) -> Result<OrderOutput, GenerationError> {
        let curve = SeasonalCurve::from_monthly_counts(
            &self.profile.monthly_orders,
            self.params.min_history_orders_for_curve,
        );
        let mut homes: BTreeMap<u64, LocationId> = self.profile.customer_home.clone();
        let mut last_order = self.profile.customer_last_order_year.clone();
        let mut known: BTreeSet<u64> = homes.keys().chain(last_order.keys()).copied().collect();

        let mut output = OrderOutput::default();
        let mut previous_target = self.profile.last_year_orders();
        let mut next_id = self.profile.max_order_id + 1;

        for &year in self.years {
            let mut rng = seeds.year_rng(Stage::Orders, year);
            let calendar = YearCalendar::new(&curve, year, &self.params.holiday_windows)?;

            let growth = rng.random_range(self.params.growth.min..=self.params.growth.max);
            let target = (previous_target as f64 * (1.0 + growth)).round() as u64;
            previous_target = target;

            let new_customers = self.customers.acquired_in(year);
            let new_count = new_customers.len() as u64;
            let active_before = self
                .customers
                .cohort(year)
                .map(|cohort| cohort.active_customers - cohort.new_customers)
                .unwrap_or_else(|| self.profile.last_year_active_customers());
            let repeat_floor = if year > self.start_year {
                (self.params.repeat_rate * active_before as f64).floor() as u64
            } else {
                0
            };
            let repeats = target.saturating_sub(new_count).max(repeat_floor);
            if target < new_count {
                output.issues.push(
                    GenerationIssue::warning(
                        codes::DISTRIBUTION_FIDELITY,
                        format!(
                            "{year}: order target {target} is below the {new_count} first orders of new customers"
                        ),
                    )
                    .with_table(names::ORDERS)
                    .with_key(year.to_string()),
                );
            }

            let pool = self.repeat_pool(&known, &last_order, year)?;
            let needs_pool = repeats > 0 || self.locations.opened_in(year).is_some();
            if needs_pool && pool.is_none() {
                return Err(GenerationError::Sampling(format!(
                    "{year}: no existing customers available for repeat orders"
                )));
            }

            let store_from = new_customers.len() - self.customers.new_store_cohort(year).len();
            let store_early = self
                .customers
                .cohort(year)
                .map_or(0, |cohort| cohort.new_store_early as usize);

            let mut drafts: Vec<Draft> = Vec::new();
            for (idx, customer) in new_customers.iter().enumerate() {
                let kind = if idx >= store_from {
                    OrderKind::NewStore {
                        early: idx - store_from < store_early,
                    }
                } else {
                    OrderKind::First
                };
                let draft = self.place(
                    &mut rng,
                    &calendar,
                    kind,
                    customer.id,
                    Some(&customer.location_id),
                    drafts.len(),
                )?;
                drafts.push(draft);
            }

            if let Some(pool) = &pool {
                for _ in 0..repeats {
                    let customer_id = *pool.sample(&mut rng);
                    let home = homes.get(&customer_id);
                    let draft = self.place(
                        &mut rng,
                        &calendar,
                        OrderKind::Repeat,
                        customer_id,
                        home,
                        drafts.len(),
                    )?;
                    drafts.push(draft);
                }

                if let Some(opened) = self.locations.opened_in(year) {
                    let share = self.locations.normalized_share(&opened.id, year_start(year)?);
                    let extra = (target as f64
                        * calendar.month_share(1)
                        * share
                        * (self.params.opening_spike - 1.0))
                        .round() as u64;
                    for _ in 0..extra {
                        let customer_id = *pool.sample(&mut rng);
                        let draft = self.place(
                            &mut rng,
                            &calendar,
                            OrderKind::Opening,
                            customer_id,
                            Some(&opened.id),
                            drafts.len(),
                        )?;
                        drafts.push(draft);
                    }
                    output.spike_orders.insert(year, extra);
                    debug!(year, location = %opened.id, extra, "opening spike");
                }
            }

            drafts.sort_by(|left, right| {
                (left.date, left.time, left.seq).cmp(&(right.date, right.time, right.seq))
            });
            for draft in &drafts {
                last_order.insert(draft.customer_id, year);
            }
            for customer in new_customers {
                known.insert(customer.id);
                homes.insert(customer.id, customer.location_id.clone());
            }

            debug!(year, target, first = new_count, orders = drafts.len(), "orders planned");
            output.targets.insert(year, target);
            for draft in drafts {
                output.orders.push(Order {
                    order_id: next_id,
                    customer_id: draft.customer_id,
                    employee_id: draft.employee_id,
                    location_id: draft.location_id,
                    date: draft.date,
                    time: draft.time,
                });
                next_id += 1;
            }
        }

        Ok(output)
    }

    /// Customers acquired before `year`, weighted by how recently they ordered.
    fn repeat_pool(
        &self,
        known: &BTreeSet<u64>,
        last_order: &BTreeMap<u64, i32>,
        year: i32,
    ) -> Result<Option<Categorical<u64>>, GenerationError> {
        if known.is_empty() {
            return Ok(None);
        }
        let weights = known.iter().map(|customer_id| {
            let last = last_order
                .get(customer_id)
                .copied()
                .unwrap_or(self.profile.first_year);
            let idle = (year - 1 - last).max(0);
            (*customer_id, self.params.recency_decay.powi(idle))
        });
        Categorical::new(weights).map(Some)
    }

    /// Date, location, employee and time for one order, resampling the date
    /// when nobody works at the location that day.
    fn place(
        &self,
        rng: &mut ChaCha8Rng,
        calendar: &YearCalendar,
        kind: OrderKind,
        customer_id: u64,
        preferred: Option<&LocationId>,
        seq: usize,
    ) -> Result<Draft, GenerationError> {
        for _ in 0..self.params.max_attempts {
            let window = self.customers.opening_months;
            let date = match kind {
                OrderKind::Opening => calendar.sample_date_in_month(rng, 1),
                OrderKind::NewStore { early: true } => {
                    calendar.sample_date_between_months(rng, 1, window)
                }
                OrderKind::NewStore { early: false } => {
                    calendar.sample_date_between_months(rng, window + 1, 12)
                }
                OrderKind::First | OrderKind::Repeat => calendar.sample_date(rng),
            };
            let location_id = match preferred {
                Some(location) if self.locations.is_open(location, date) => location.clone(),
                _ => {
                    let weights = Categorical::new(self.locations.share_weights(date))?;
                    weights.sample(rng).clone()
                }
            };
            let candidates = self.employees.roster.active_at(&location_id, date);
            if let Some(employee_id) = candidates.choose(rng) {
                return Ok(Draft {
                    date,
                    time: sample_time(rng, self.params.business_hours),
                    seq,
                    customer_id,
                    employee_id: *employee_id,
                    location_id,
                });
            }
        }

        Err(GenerationError::integrity(
            names::ORDERS,
            format!("{}#{seq}", calendar.year()),
            format!(
                "no active employee found for customer {customer_id} after {} attempts",
                self.params.max_attempts
            ),
        ))
    }
}
