//! History plus new rows, as one set of tables.

use std::collections::HashSet;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use histosynth_core::{
    Customer, Discount, Employee, EmploymentPeriod, History, InventoryRecord, Item, LineItem,
    LineItemReturn, Location, Order, Review, SkillReview, SynthesizedTables, TerminationReason,
    WebStat,
};

use crate::history::HistoryProfile;

/// Merged view of history and synthesized rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FullView {
    pub locations: Vec<Location>,
    pub customers: Vec<Customer>,
    pub employees: Vec<Employee>,
    pub employment_periods: Vec<EmploymentPeriod>,
    pub orders: Vec<Order>,
    pub line_items: Vec<LineItem>,
    pub inventory: Vec<InventoryRecord>,
    pub discounts: Vec<Discount>,
    pub items: Vec<Item>,
    pub reviews: Vec<Review>,
    pub web_stats: Vec<WebStat>,
    pub skill_reviews: Vec<SkillReview>,
    pub termination_reasons: Vec<TerminationReason>,
    pub line_item_returns: Vec<LineItemReturn>,
}

/// Append new rows after history. On a key collision the first occurrence
/// (the historical row) wins.
pub fn merge_full_view(
    history: &History,
    profile: &HistoryProfile,
    tables: &SynthesizedTables,
) -> FullView {
    FullView {
        locations: merge_by_key(&profile.locations, &tables.locations, |l| l.id.clone()),
        customers: merge_by_key(&history.customers, &tables.customers, |c| c.id),
        employees: merge_by_key(&history.employees, &tables.employees, |e| e.id),
        employment_periods: merge_by_key(
            &history.employment_periods,
            &tables.employment_periods,
            |p| (p.employee_id, p.year),
        ),
        orders: merge_by_key(&history.orders, &tables.orders, |o| o.order_id),
        line_items: merge_by_key(&history.line_items, &tables.line_items, |l| l.line_item_id),
        inventory: merge_by_key(&history.inventory, &tables.inventory, |r| {
            (r.month, r.location_id.clone(), r.item_id)
        }),
        discounts: history.discounts.clone(),
        items: history.items.clone(),
        reviews: merge_by_key(&history.reviews, &tables.reviews, |r| r.review_id),
        web_stats: merge_by_key(&history.web_stats, &tables.web_stats, |w| w.month),
        skill_reviews: merge_by_key(&history.skill_reviews, &tables.skill_reviews, |r| {
            (r.employee_id, r.date)
        }),
        termination_reasons: merge_by_key(
            &history.termination_reasons,
            &tables.termination_reasons,
            |r| r.employee_id,
        ),
        line_item_returns: merge_by_key(
            &history.line_item_returns,
            &tables.line_item_returns,
            |r| r.line_item_id,
        ),
    }
}

fn merge_by_key<T, K, F>(first: &[T], second: &[T], key: F) -> Vec<T>
where
    T: Clone,
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::with_capacity(first.len() + second.len());
    first
        .iter()
        .chain(second)
        .filter(|row| seen.insert(key(row)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_history;
    use chrono::{NaiveDate, NaiveTime};
    use histosynth_core::LocationId;

    #[test]
    fn historical_row_wins_on_collision() {
        let history = sample_history();
        let profile = HistoryProfile::analyze(&history).expect("profile");
        let mut clash = history.orders[0].clone();
        clash.customer_id = 999_999;
        let fresh = Order {
            order_id: profile.max_order_id + 1,
            customer_id: 1,
            employee_id: 1,
            location_id: LocationId::new("L01"),
            date: NaiveDate::from_ymd_opt(2022, 3, 1).unwrap(),
            time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        };
        let tables = SynthesizedTables {
            orders: vec![clash, fresh.clone()],
            ..SynthesizedTables::default()
        };

        let view = merge_full_view(&history, &profile, &tables);
        assert_eq!(view.orders.len(), history.orders.len() + 1);
        assert_eq!(view.orders[0], history.orders[0]);
        assert_eq!(view.orders.last(), Some(&fresh));
        assert_eq!(view.locations.len(), profile.locations.len());
        assert_eq!(view.items, history.items);
    }
}
