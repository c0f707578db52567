use std::collections::BTreeSet;

use rand::Rng;
use tracing::debug;

use histosynth_core::tables::names;
use histosynth_core::{Discount, Item, LineItem, LineItemParams, Order, Stage};

use crate::errors::GenerationError;
use crate::history::HistoryProfile;
use crate::model::{GenerationIssue, codes};
use crate::random::SeedSource;
use crate::sampling::{Categorical, sample_distinct_weighted};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineItemOutput {
    pub line_items: Vec<LineItem>,
    pub issues: Vec<GenerationIssue>,
}

/// Fills each order with distinct catalog items.
///
/// Construction checks that every discount id the synthesizer may draw exists
/// in the discount lookup.
#[derive(Debug, Clone)]
pub struct LineItemSynthesizer<'a> {
    params: &'a LineItemParams,
    first_id: u64,
    item_ids: Vec<u32>,
    item_weights: Vec<f64>,
    discounts: Option<Categorical<String>>,
    issues: Vec<GenerationIssue>,
}

impl<'a> LineItemSynthesizer<'a> {
    pub fn new(
        profile: &HistoryProfile,
        params: &'a LineItemParams,
        items: &[Item],
        discounts: &[Discount],
    ) -> Result<Self, GenerationError> {
        let mut issues = Vec::new();

        let item_ids: Vec<u32> = items.iter().map(|item| item.item_id).collect();
        let known_items: BTreeSet<u32> = item_ids.iter().copied().collect();
        let unknown_items = profile
            .item_popularity
            .keys()
            .filter(|item_id| !known_items.contains(item_id))
            .count();
        if unknown_items > 0 {
            issues.push(
                GenerationIssue::warning(
                    codes::DISTRIBUTION_FIDELITY,
                    format!("{unknown_items} historical item ids are missing from the item lookup and are never drawn"),
                )
                .with_table(names::ITEMS),
            );
        }
        let mut item_weights: Vec<f64> = item_ids
            .iter()
            .map(|item_id| profile.item_popularity.get(item_id).copied().unwrap_or(0) as f64)
            .collect();
        if item_weights.iter().all(|weight| *weight <= 0.0) {
            item_weights = vec![1.0; item_ids.len()];
        }

        let discounts = discount_distribution(profile, discounts, &mut issues)?;

        Ok(Self {
            params,
            first_id: profile.max_line_item_id + 1,
            item_ids,
            item_weights,
            discounts,
            issues,
        })
    }

    pub fn run(
        &self,
        orders: &[Order],
        seeds: &SeedSource,
    ) -> Result<LineItemOutput, GenerationError> {
        if self.item_ids.is_empty() {
            return Err(GenerationError::InvalidHistory(
                "item lookup is empty".to_string(),
            ));
        }

        let mut rng = seeds.rng(Stage::LineItems, "orders");
        let mut line_items = Vec::with_capacity(orders.len() * 2);
        let mut next_id = self.first_id;

        for order in orders {
            let count = rng.random_range(self.params.min_items..=self.params.max_items) as usize;
            let picked = sample_distinct_weighted(&mut rng, &self.item_weights, count)?;
            if picked.is_empty() {
                return Err(GenerationError::Sampling(format!(
                    "order {} received no line items",
                    order.order_id
                )));
            }
            let discounted = match &self.discounts {
                Some(_) => rng.random_bool(self.params.discount_rate),
                None => false,
            };

            for idx in picked {
                let quantity = if rng.random_bool(self.params.multi_quantity_rate) {
                    rng.random_range(2..=self.params.max_quantity)
                } else {
                    1
                };
                let discount_id = match (&self.discounts, discounted) {
                    (Some(discounts), true) => Some(discounts.sample(&mut rng).clone()),
                    _ => None,
                };
                line_items.push(LineItem {
                    line_item_id: next_id,
                    order_id: order.order_id,
                    item_id: self.item_ids[idx],
                    quantity,
                    discount_id,
                });
                next_id += 1;
            }
        }

        debug!(orders = orders.len(), line_items = line_items.len(), "line items generated");
        Ok(LineItemOutput {
            line_items,
            issues: self.issues.clone(),
        })
    }
}

/// Discounts drawn by historical usage, or uniformly over the lookup when
/// history never used one. `None` when the lookup is empty.
fn discount_distribution(
    profile: &HistoryProfile,
    lookup: &[Discount],
    issues: &mut Vec<GenerationIssue>,
) -> Result<Option<Categorical<String>>, GenerationError> {
    if lookup.is_empty() {
        issues.push(
            GenerationIssue::warning(
                codes::EMPTY_DISCOUNT_LOOKUP,
                "discount lookup is empty; generated line items carry no discounts",
            )
            .with_table(names::DISCOUNTS),
        );
        return Ok(None);
    }

    let known: BTreeSet<&str> = lookup.iter().map(|d| d.discount_id.as_str()).collect();
    let used: Vec<(String, f64)> = profile
        .discount_usage
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(id, count)| (id.clone(), *count as f64))
        .collect();

    for (discount_id, _) in &used {
        if !known.contains(discount_id.as_str()) {
            return Err(GenerationError::integrity(
                names::LINE_ITEMS,
                discount_id.clone(),
                "discount id is used by history but missing from the discount lookup",
            ));
        }
    }

    let entries = if used.is_empty() {
        lookup
            .iter()
            .map(|d| (d.discount_id.clone(), 1.0))
            .collect()
    } else {
        used
    };
    Categorical::new(entries).map(Some)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{NaiveDate, NaiveTime};
    use histosynth_core::LocationId;

    use super::*;
    use crate::fixtures::sample_history;

    fn orders(count: u64) -> Vec<Order> {
        (1..=count)
            .map(|idx| Order {
                order_id: 1000 + idx,
                customer_id: 1,
                employee_id: 1,
                location_id: LocationId::from("L01"),
                date: NaiveDate::from_ymd_opt(2022, 3, 1).unwrap(),
                time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            })
            .collect()
    }

    #[test]
    fn every_order_gets_distinct_items() {
        let history = sample_history();
        let profile = HistoryProfile::analyze(&history).expect("profile");
        let params = LineItemParams::default();
        let synth =
            LineItemSynthesizer::new(&profile, &params, &history.items, &history.discounts)
                .expect("synth");
        let output = synth.run(&orders(200), &SeedSource::new(1)).expect("run");

        let mut per_order: BTreeMap<u64, Vec<u32>> = BTreeMap::new();
        for line in &output.line_items {
            per_order.entry(line.order_id).or_default().push(line.item_id);
            assert!((1..=4).contains(&line.quantity));
            assert!(line.line_item_id > profile.max_line_item_id);
        }
        assert_eq!(per_order.len(), 200);
        for items in per_order.values() {
            let distinct: BTreeSet<u32> = items.iter().copied().collect();
            assert_eq!(distinct.len(), items.len());
            assert!((1..=4).contains(&items.len()));
        }
    }

    #[test]
    fn discounted_orders_discount_every_line() {
        let history = sample_history();
        let profile = HistoryProfile::analyze(&history).expect("profile");
        let params = LineItemParams::default();
        let synth =
            LineItemSynthesizer::new(&profile, &params, &history.items, &history.discounts)
                .expect("synth");
        let output = synth.run(&orders(400), &SeedSource::new(2)).expect("run");

        let mut flags: BTreeMap<u64, BTreeSet<bool>> = BTreeMap::new();
        for line in &output.line_items {
            flags
                .entry(line.order_id)
                .or_default()
                .insert(line.discount_id.is_some());
        }
        assert!(flags.values().all(|set| set.len() == 1));
        let discounted = flags.values().filter(|set| set.contains(&true)).count();
        assert!((60..=140).contains(&discounted), "discounted {discounted}");
    }

    #[test]
    fn corrupted_discount_lookup_is_an_integrity_error() {
        let mut history = sample_history();
        let profile = HistoryProfile::analyze(&history).expect("profile");
        history.discounts[1].discount_id = "D9".to_string();
        let params = LineItemParams::default();
        let err = LineItemSynthesizer::new(&profile, &params, &history.items, &history.discounts)
            .unwrap_err();
        match err {
            GenerationError::ReferentialIntegrity { table, key, .. } => {
                assert_eq!(table, names::LINE_ITEMS);
                assert_eq!(key, "D2");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn empty_discount_lookup_disables_discounts() {
        let history = sample_history();
        let profile = HistoryProfile::analyze(&history).expect("profile");
        let params = LineItemParams::default();
        let synth = LineItemSynthesizer::new(&profile, &params, &history.items, &[]).expect("synth");
        let output = synth.run(&orders(50), &SeedSource::new(3)).expect("run");
        assert!(output.line_items.iter().all(|line| line.discount_id.is_none()));
        assert_eq!(output.issues[0].code, codes::EMPTY_DISCOUNT_LOOKUP);
    }
}
