use std::collections::BTreeMap;

use chrono::{Datelike, Duration};
use rand::Rng;
use tracing::debug;

use histosynth_core::tables::names;
use histosynth_core::{Order, Review, ReviewParams, Stage};

use crate::errors::GenerationError;
use crate::history::HistoryProfile;
use crate::model::{GenerationIssue, codes};
use crate::random::SeedSource;
use crate::sampling::Categorical;

pub const DEFAULT_RATINGS: [(u8, f64); 5] =
    [(6, 0.10), (7, 0.15), (8, 0.25), (9, 0.30), (10, 0.20)];

pub const DEFAULT_PLATFORMS: [(&str, f64); 3] =
    [("Facebook", 0.35), ("Yelp", 0.34), ("Google", 0.31)];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewOutput {
    pub reviews: Vec<Review>,
    /// Requested review count per year, before clamping to available orders.
    pub targets: BTreeMap<i32, u64>,
    pub issues: Vec<GenerationIssue>,
}

/// Samples a yearly target of orders, without replacement, into reviews.
#[derive(Debug, Clone)]
pub struct ReviewSynthesizer<'a> {
    profile: &'a HistoryProfile,
    params: &'a ReviewParams,
    years: &'a [i32],
}

impl<'a> ReviewSynthesizer<'a> {
    pub fn new(profile: &'a HistoryProfile, params: &'a ReviewParams, years: &'a [i32]) -> Self {
        Self {
            profile,
            params,
            years,
        }
    }

    pub fn run(&self, orders: &[Order], seeds: &SeedSource) -> Result<ReviewOutput, GenerationError> {
        let ratings = Categorical::from_counts_or(
            self.profile
                .rating_counts
                .iter()
                .map(|(rating, count)| (*rating, *count)),
            DEFAULT_RATINGS,
        )?;
        let platforms = Categorical::from_counts_or(
            self.profile
                .platform_counts
                .iter()
                .map(|(platform, count)| (platform.clone(), *count)),
            DEFAULT_PLATFORMS.map(|(platform, weight)| (platform.to_string(), weight)),
        )?;

        let mut output = ReviewOutput::default();
        let mut previous = self.profile.last_year_reviews();
        let mut next_id = self.profile.max_review_id + 1;

        for &year in self.years {
            let mut rng = seeds.year_rng(Stage::Reviews, year);
            let target = self
                .params
                .target_for(year)
                .unwrap_or(previous + self.params.yearly_step);
            previous = target;
            output.targets.insert(year, target);

            let pool: Vec<&Order> = orders
                .iter()
                .filter(|order| order.date.year() == year)
                .collect();
            let count = if target as usize > pool.len() {
                output.issues.push(
                    GenerationIssue::warning(
                        codes::REVIEW_TARGET_CLAMPED,
                        format!(
                            "{year}: review target {target} exceeds the {} orders of the year",
                            pool.len()
                        ),
                    )
                    .with_table(names::REVIEWS)
                    .with_key(year.to_string()),
                );
                pool.len()
            } else {
                target as usize
            };

            let mut picked = rand::seq::index::sample(&mut rng, pool.len(), count).into_vec();
            picked.sort_unstable();
            for idx in picked {
                let order = pool[idx];
                let offset = rng.random_range(self.params.min_offset_days..=self.params.max_offset_days);
                output.reviews.push(Review {
                    review_id: next_id,
                    order_id: order.order_id,
                    date: order.date + Duration::days(offset as i64),
                    rating: *ratings.sample(&mut rng),
                    platform: platforms.sample(&mut rng).clone(),
                });
                next_id += 1;
            }
            debug!(year, target, reviews = count, "reviews sampled");
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::{NaiveDate, NaiveTime};
    use histosynth_core::{LocationId, YearCount};

    use super::*;
    use crate::fixtures::sample_history;

    fn orders(year: i32, count: u64) -> Vec<Order> {
        (1..=count)
            .map(|idx| Order {
                order_id: 5000 + idx,
                customer_id: 1,
                employee_id: 1,
                location_id: LocationId::from("L01"),
                date: NaiveDate::from_ymd_opt(year, 1 + (idx % 12) as u32, 10).unwrap(),
                time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            })
            .collect()
    }

    #[test]
    fn reviews_follow_target_and_offsets() {
        let profile = HistoryProfile::analyze(&sample_history()).expect("profile");
        let params = ReviewParams::default();
        let years = [2022];
        let orders = orders(2022, 600);
        let output = ReviewSynthesizer::new(&profile, &params, &years)
            .run(&orders, &SeedSource::new(8))
            .expect("reviews");

        let expected = profile.last_year_reviews() + params.yearly_step;
        assert_eq!(output.reviews.len() as u64, expected);

        let by_id: BTreeMap<u64, &Order> = orders.iter().map(|o| (o.order_id, o)).collect();
        let mut seen = BTreeSet::new();
        for review in &output.reviews {
            assert!(seen.insert(review.order_id), "duplicate review");
            let order = by_id[&review.order_id];
            let offset = (review.date - order.date).num_days();
            assert!((3..=21).contains(&offset));
            assert!((1..=10).contains(&review.rating));
            assert!(review.review_id > profile.max_review_id);
        }
    }

    #[test]
    fn explicit_target_wins_and_is_clamped_to_pool() {
        let profile = HistoryProfile::analyze(&sample_history()).expect("profile");
        let params = ReviewParams {
            targets: vec![YearCount {
                year: 2022,
                count: 80,
            }],
            ..ReviewParams::default()
        };
        let years = [2022];
        let output = ReviewSynthesizer::new(&profile, &params, &years)
            .run(&orders(2022, 50), &SeedSource::new(8))
            .expect("reviews");
        assert_eq!(output.targets[&2022], 80);
        assert_eq!(output.reviews.len(), 50);
        assert_eq!(output.issues[0].code, codes::REVIEW_TARGET_CLAMPED);
    }
}
