use std::collections::BTreeMap;

use chrono::Datelike;
use rand::Rng;
use tracing::debug;

use histosynth_core::{LineItem, LineItemReturn, Order, ReturnParams, Stage};

use crate::errors::GenerationError;
use crate::history::HistoryProfile;
use crate::random::SeedSource;
use crate::sampling::label_mix;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineItemReturnOutput {
    pub returns: Vec<LineItemReturn>,
    /// Sampled return rate per year.
    pub rates: BTreeMap<i32, f64>,
}

/// Marks a yearly share of the new line items as returned.
#[derive(Debug, Clone)]
pub struct LineItemReturnSynthesizer<'a> {
    profile: &'a HistoryProfile,
    params: &'a ReturnParams,
    years: &'a [i32],
}

impl<'a> LineItemReturnSynthesizer<'a> {
    pub fn new(profile: &'a HistoryProfile, params: &'a ReturnParams, years: &'a [i32]) -> Self {
        Self {
            profile,
            params,
            years,
        }
    }

    pub fn run(
        &self,
        orders: &[Order],
        line_items: &[LineItem],
        seeds: &SeedSource,
    ) -> Result<LineItemReturnOutput, GenerationError> {
        let reasons = label_mix(&self.profile.return_reason_counts, &self.params.reasons)?;
        let order_years: BTreeMap<u64, i32> = orders
            .iter()
            .map(|order| (order.order_id, order.date.year()))
            .collect();

        let mut output = LineItemReturnOutput::default();
        for &year in self.years {
            let mut rng = seeds.year_rng(Stage::LineItemReturns, year);
            let pool: Vec<&LineItem> = line_items
                .iter()
                .filter(|line| order_years.get(&line.order_id) == Some(&year))
                .collect();
            let rate = rng.random_range(self.params.rate.min..=self.params.rate.max);
            let count = (pool.len() as f64 * rate).floor() as usize;

            let mut picked = rand::seq::index::sample(&mut rng, pool.len(), count).into_vec();
            picked.sort_unstable();
            for idx in picked {
                output.returns.push(LineItemReturn {
                    line_item_id: pool[idx].line_item_id,
                    return_id: reasons.sample(&mut rng).clone(),
                });
            }
            output.rates.insert(year, rate);
            debug!(year, rate, returns = count, "line item returns");
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::{NaiveDate, NaiveTime};
    use histosynth_core::LocationId;

    use super::*;
    use crate::fixtures::sample_history;

    fn orders_and_lines(year: i32, count: u64) -> (Vec<Order>, Vec<LineItem>) {
        let orders: Vec<Order> = (1..=count)
            .map(|idx| Order {
                order_id: 9000 + idx,
                customer_id: 1,
                employee_id: 1,
                location_id: LocationId::from("L01"),
                date: NaiveDate::from_ymd_opt(year, 1 + (idx % 12) as u32, 3).unwrap(),
                time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            })
            .collect();
        let lines = orders
            .iter()
            .enumerate()
            .map(|(idx, order)| LineItem {
                line_item_id: 20_000 + idx as u64,
                order_id: order.order_id,
                item_id: 1,
                quantity: 1,
                discount_id: None,
            })
            .collect();
        (orders, lines)
    }

    #[test]
    fn returns_cover_the_sampled_share_without_duplicates() {
        let mut history = sample_history();
        history.line_item_returns.clear();
        let profile = HistoryProfile::analyze(&history).expect("profile");
        let params = ReturnParams::default();
        let years = [2022];
        let (orders, lines) = orders_and_lines(2022, 2000);
        let output = LineItemReturnSynthesizer::new(&profile, &params, &years)
            .run(&orders, &lines, &SeedSource::new(5))
            .expect("returns");

        let rate = output.rates[&2022];
        assert!(params.rate.contains(rate));
        assert_eq!(output.returns.len(), (2000.0 * rate).floor() as usize);
        let known: BTreeSet<u64> = lines.iter().map(|line| line.line_item_id).collect();
        let mut seen = BTreeSet::new();
        for line_return in &output.returns {
            assert!(known.contains(&line_return.line_item_id));
            assert!(seen.insert(line_return.line_item_id), "returned twice");
            assert!(["R1", "R2", "R3"].contains(&line_return.return_id.as_str()));
        }
    }

    #[test]
    fn lines_of_other_years_are_never_returned() {
        let profile = HistoryProfile::analyze(&sample_history()).expect("profile");
        let params = ReturnParams::default();
        let (orders, lines) = orders_and_lines(2023, 500);
        let output = LineItemReturnSynthesizer::new(&profile, &params, &[2022])
            .run(&orders, &lines, &SeedSource::new(5))
            .expect("returns");
        assert!(output.returns.is_empty());
    }
}
