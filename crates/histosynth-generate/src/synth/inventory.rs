use std::collections::BTreeMap;

use chrono::NaiveDate;
use rand::Rng;
use tracing::{debug, warn};

use histosynth_core::tables::names;
use histosynth_core::{
    InventoryParams, InventoryRecord, Item, LineItem, LocationId, Order, Stage, first_of_month,
};

use crate::calendar::month_start;
use crate::errors::GenerationError;
use crate::history::HistoryProfile;
use crate::model::{GenerationIssue, codes};
use crate::random::SeedSource;
use crate::sampling::Categorical;
use crate::synth::locations::LocationPlan;

/// Stock adjustment deltas (shrink, damage, corrections) and their weights.
const ADJUSTMENTS: [(i64, f64); 8] = [
    (-5, 0.10),
    (-4, 0.15),
    (-3, 0.20),
    (-2, 0.25),
    (-1, 0.15),
    (0, 0.05),
    (1, 0.05),
    (2, 0.05),
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventoryOutput {
    pub records: Vec<InventoryRecord>,
    /// Negative-ending corrections; one issue per clamped snapshot.
    pub issues: Vec<GenerationIssue>,
}

/// Monthly stock snapshots per open location and catalog item.
#[derive(Debug, Clone)]
pub struct InventorySynthesizer<'a> {
    profile: &'a HistoryProfile,
    params: &'a InventoryParams,
    locations: &'a LocationPlan,
    items: &'a [Item],
    years: &'a [i32],
}

impl<'a> InventorySynthesizer<'a> {
    pub fn new(
        profile: &'a HistoryProfile,
        params: &'a InventoryParams,
        locations: &'a LocationPlan,
        items: &'a [Item],
        years: &'a [i32],
    ) -> Self {
        Self {
            profile,
            params,
            locations,
            items,
            years,
        }
    }

    pub fn run(
        &self,
        orders: &[Order],
        line_items: &[LineItem],
        seeds: &SeedSource,
    ) -> Result<InventoryOutput, GenerationError> {
        let sales = monthly_sales(orders, line_items);
        let thresholds = self.thresholds(seeds);
        let adjustments = Categorical::new(ADJUSTMENTS)?;

        let mut stock: BTreeMap<(LocationId, u32), i64> = BTreeMap::new();
        let mut output = InventoryOutput::default();

        for &year in self.years {
            let mut rng = seeds.year_rng(Stage::Inventory, year);
            for month in 1..=12 {
                let month_first = month_start(year, month)?;
                for location in self.locations.open_on(month_first) {
                    for item in self.items {
                        let key = (location.id.clone(), item.item_id);
                        let threshold = thresholds.get(&item.item_id).copied().unwrap_or(0);
                        let beginning_on_hand = match stock.get(&key) {
                            Some(level) => *level,
                            None => self
                                .profile
                                .inventory_ending
                                .get(&key)
                                .map(|level| (*level).max(0))
                                .unwrap_or(threshold),
                        };

                        let reorder_level = self.params.reorder_fraction * threshold as f64;
                        let purchased_qty = if (beginning_on_hand as f64) < reorder_level {
                            threshold - beginning_on_hand
                        } else {
                            0
                        };
                        let mut adjustments_qty = if rng.random_bool(self.params.adjustment_rate) {
                            *adjustments.sample(&mut rng)
                        } else {
                            0
                        };
                        let sold_qty = sales
                            .get(&(month_first, location.id.clone(), item.item_id))
                            .copied()
                            .unwrap_or(0);

                        let ending = beginning_on_hand + purchased_qty - sold_qty + adjustments_qty;
                        if ending < 0 {
                            adjustments_qty -= ending;
                            warn!(
                                location = %location.id,
                                item_id = item.item_id,
                                month = %month_first,
                                deficit = -ending,
                                "inventory ending clamped at zero"
                            );
                            output.issues.push(
                                GenerationIssue::warning(
                                    codes::NEGATIVE_QUANTITY_CORRECTION,
                                    format!(
                                        "ending stock {ending} absorbed into adjustment ({adjustments_qty})"
                                    ),
                                )
                                .with_table(names::INVENTORY)
                                .with_key(format!("{}/{}/{}", location.id, item.item_id, month_first)),
                            );
                        }

                        let record = InventoryRecord {
                            month: month_first,
                            location_id: location.id.clone(),
                            item_id: item.item_id,
                            beginning_on_hand,
                            purchased_qty,
                            sold_qty,
                            adjustments_qty,
                        };
                        stock.insert(key, record.ending_on_hand());
                        output.records.push(record);
                    }
                }
            }
            debug!(year, records = output.records.len(), "inventory year");
        }

        Ok(output)
    }

    /// Historical peak stocking level per item, else a random level.
    fn thresholds(&self, seeds: &SeedSource) -> BTreeMap<u32, i64> {
        let mut rng = seeds.rng(Stage::Inventory, "thresholds");
        self.items
            .iter()
            .map(|item| {
                let threshold = match self.profile.item_thresholds.get(&item.item_id) {
                    Some(level) => *level,
                    None => rng.random_range(
                        self.params.default_threshold_min..self.params.default_threshold_max,
                    ),
                };
                (item.item_id, threshold)
            })
            .collect()
    }
}

/// Units sold per (month, location, item).
fn monthly_sales(
    orders: &[Order],
    line_items: &[LineItem],
) -> BTreeMap<(NaiveDate, LocationId, u32), i64> {
    let placed: BTreeMap<u64, (NaiveDate, &LocationId)> = orders
        .iter()
        .map(|order| (order.order_id, (first_of_month(order.date), &order.location_id)))
        .collect();
    let mut sales = BTreeMap::new();
    for line in line_items {
        if let Some((month, location)) = placed.get(&line.order_id) {
            *sales
                .entry((*month, (*location).clone(), line.item_id))
                .or_insert(0) += line.quantity as i64;
        }
    }
    sales
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::*;
    use crate::fixtures::sample_history;
    use crate::synth::locations::LocationSynthesizer;

    fn setup(years: &[i32]) -> (HistoryProfile, LocationPlan, Vec<Item>) {
        let history = sample_history();
        let profile = HistoryProfile::analyze(&history).expect("profile");
        let locations = LocationSynthesizer::new(&profile, years).run().expect("locations");
        (profile, locations, history.items)
    }

    #[test]
    fn snapshots_cover_open_locations_and_stay_non_negative() {
        let years = [2022, 2023];
        let (profile, locations, items) = setup(&years);
        let params = InventoryParams::default();
        let output = InventorySynthesizer::new(&profile, &params, &locations, &items, &years)
            .run(&[], &[], &SeedSource::new(5))
            .expect("inventory");

        // 2022: 4 locations, 2023: 5 locations, 12 items, 12 months.
        assert_eq!(output.records.len(), (4 + 5) * 12 * 12);
        for record in &output.records {
            assert!(record.beginning_on_hand >= 0);
            assert!(record.purchased_qty >= 0);
            assert!(record.sold_qty >= 0);
            assert!(record.ending_on_hand() >= 0);
        }
    }

    #[test]
    fn snapshots_chain_month_to_month() {
        let years = [2022];
        let (profile, locations, items) = setup(&years);
        let params = InventoryParams::default();
        let output = InventorySynthesizer::new(&profile, &params, &locations, &items, &years)
            .run(&[], &[], &SeedSource::new(5))
            .expect("inventory");

        let series: Vec<&InventoryRecord> = output
            .records
            .iter()
            .filter(|r| r.location_id.as_str() == "L01" && r.item_id == 1)
            .collect();
        assert_eq!(series.len(), 12);
        let last_historical = profile.inventory_ending[&(LocationId::from("L01"), 1)];
        assert_eq!(series[0].beginning_on_hand, last_historical.max(0));
        for pair in series.windows(2) {
            assert_eq!(pair[1].beginning_on_hand, pair[0].ending_on_hand());
        }
    }

    #[test]
    fn oversold_month_is_corrected() {
        let years = [2022];
        let (profile, locations, items) = setup(&years);
        let params = InventoryParams {
            adjustment_rate: 0.0,
            ..InventoryParams::default()
        };
        let order = Order {
            order_id: 9000,
            customer_id: 1,
            employee_id: 1,
            location_id: LocationId::from("L02"),
            date: NaiveDate::from_ymd_opt(2022, 5, 10).unwrap(),
            time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        };
        let line = LineItem {
            line_item_id: 1,
            order_id: 9000,
            item_id: 3,
            quantity: 10_000,
            discount_id: None,
        };
        let output = InventorySynthesizer::new(&profile, &params, &locations, &items, &years)
            .run(&[order], &[line], &SeedSource::new(5))
            .expect("inventory");

        let may = NaiveDate::from_ymd_opt(2022, 5, 1).unwrap();
        let record = output
            .records
            .iter()
            .find(|r| r.month == may && r.location_id.as_str() == "L02" && r.item_id == 3)
            .expect("record");
        assert_eq!(record.sold_qty, 10_000);
        assert_eq!(record.ending_on_hand(), 0);
        assert!(record.adjustments_qty > 0);
        assert_eq!(output.issues.len(), 1);
        assert_eq!(output.issues[0].code, codes::NEGATIVE_QUANTITY_CORRECTION);
    }
}
