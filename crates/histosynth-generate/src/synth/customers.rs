use chrono::NaiveDate;
use fake::Fake;
use fake::faker::name::en::{FirstName, LastName};
use rand::Rng;
use tracing::debug;

use histosynth_core::{Customer, CustomerParams, Stage};

use crate::calendar::year_start;
use crate::errors::GenerationError;
use crate::history::HistoryProfile;
use crate::model::CustomerCohort;
use crate::random::{SeedSource, uniform_date};
use crate::sampling::Categorical;
use crate::synth::locations::LocationPlan;

/// Acquisition channels used when history records none.
pub const DEFAULT_SOURCES: [(&str, f64); 6] = [
    ("Newspaper", 0.10),
    ("Social", 0.25),
    ("Referral", 0.15),
    ("WalkIn", 0.30),
    ("Online", 0.15),
    ("Advertisement", 0.05),
];

pub const DEFAULT_GENDERS: [(&str, f64); 3] = [("M", 0.48), ("F", 0.50), ("X", 0.02)];

/// New customers plus one cohort per generated year.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerOutput {
    pub customers: Vec<Customer>,
    pub cohorts: Vec<CustomerCohort>,
    /// Length of the opening window, in months from January.
    pub opening_months: u32,
}

impl CustomerOutput {
    pub fn cohort(&self, year: i32) -> Option<&CustomerCohort> {
        self.cohorts.iter().find(|cohort| cohort.year == year)
    }

    /// Customers first acquired in `year`, in id order.
    pub fn acquired_in(&self, year: i32) -> &[Customer] {
        let Some(cohort) = self.cohort(year) else {
            return &[];
        };
        let start = self
            .customers
            .partition_point(|customer| cohort.first_id.is_none_or(|first| customer.id < first));
        let end = start + cohort.new_customers as usize;
        &self.customers[start..end.min(self.customers.len())]
    }

    /// Customers of `year` homed at the location opened that year.
    pub fn new_store_cohort(&self, year: i32) -> &[Customer] {
        let acquired = self.acquired_in(year);
        let size = self
            .cohort(year)
            .map_or(0, |cohort| cohort.new_store_customers as usize)
            .min(acquired.len());
        &acquired[acquired.len() - size..]
    }
}

/// Attribute probabilities of one acquisition channel.
struct Segment<'s> {
    loyalty_rate: f64,
    email_rate_loyal: f64,
    email_rate_other: f64,
    sources: &'s Categorical<String>,
}

/// Grows the customer population year over year.
///
/// In a year that opens a location, a configured share of the new customers
/// forms a grand-opening cohort homed at it, with its own loyalty, email and
/// channel mix. Those customers take the last ids of the year.
#[derive(Debug, Clone)]
pub struct CustomerSynthesizer<'a> {
    profile: &'a HistoryProfile,
    params: &'a CustomerParams,
    locations: &'a LocationPlan,
    years: &'a [i32],
}

impl<'a> CustomerSynthesizer<'a> {
    pub fn new(
        profile: &'a HistoryProfile,
        params: &'a CustomerParams,
        locations: &'a LocationPlan,
        years: &'a [i32],
    ) -> Self {
        Self {
            profile,
            params,
            locations,
            years,
        }
    }

    pub fn run(&self, seeds: &SeedSource) -> Result<CustomerOutput, GenerationError> {
        let sources = categorical_or(&self.profile.source_counts, &DEFAULT_SOURCES)?;
        let genders = categorical_or(&self.profile.gender_counts, &DEFAULT_GENDERS)?;
        let store = &self.params.new_store;
        let store_sources = Categorical::new(
            store
                .sources
                .iter()
                .map(|entry| (entry.label.clone(), entry.weight)),
        )?;
        let regular_segment = Segment {
            loyalty_rate: self.params.loyalty_rate,
            email_rate_loyal: self.params.email_rate_loyal,
            email_rate_other: self.params.email_rate_other,
            sources: &sources,
        };
        let store_segment = Segment {
            loyalty_rate: store.loyalty_rate,
            email_rate_loyal: store.email_rate_loyal,
            email_rate_other: store.email_rate_other,
            sources: &store_sources,
        };

        let mut output = CustomerOutput {
            opening_months: store.opening_months,
            ..CustomerOutput::default()
        };
        let mut active = self.profile.last_year_active_customers();
        let mut next_id = self.profile.max_customer_id + 1;

        for &year in self.years {
            let mut rng = seeds.year_rng(Stage::Customers, year);
            let growth_rate = rng.random_range(self.params.growth.min..=self.params.growth.max);
            let new_customers = (active as f64 * growth_rate).round() as u64;

            let opened = self.locations.opened_in(year);
            let store_count = if opened.is_some() {
                ((new_customers as f64 * store.share).round() as u64).min(new_customers)
            } else {
                0
            };
            let early_count = (store_count as f64 * store.early_share).floor() as u64;

            let jan_first = year_start(year)?;
            let homes = Categorical::new(
                self.locations
                    .share_weights(jan_first)
                    .into_iter()
                    .filter(|(id, _)| store_count == 0 || opened.is_none_or(|l| &l.id != id)),
            )?;
            let oldest = birth_bound(year, self.params.max_age)?;
            let youngest = birth_bound(year, self.params.min_age)?;

            let first_id = (new_customers > 0).then_some(next_id);
            for idx in 0..new_customers {
                let (segment, home) = match opened {
                    Some(location) if idx >= new_customers - store_count => {
                        (&store_segment, location.id.clone())
                    }
                    _ => (&regular_segment, homes.sample(&mut rng).clone()),
                };
                let loyalty_member = rng.random_bool(segment.loyalty_rate);
                let email_rate = if loyalty_member {
                    segment.email_rate_loyal
                } else {
                    segment.email_rate_other
                };
                let customer = Customer {
                    id: next_id,
                    first_name: FirstName().fake_with_rng(&mut rng),
                    last_name: LastName().fake_with_rng(&mut rng),
                    gender: genders.sample(&mut rng).clone(),
                    dob: uniform_date(&mut rng, oldest, youngest),
                    loyalty_member,
                    email_list: rng.random_bool(email_rate),
                    source: segment.sources.sample(&mut rng).clone(),
                    location_id: home,
                };
                output.customers.push(customer);
                next_id += 1;
            }

            active += new_customers;
            output.cohorts.push(CustomerCohort {
                year,
                growth_rate,
                new_customers,
                active_customers: active,
                first_id,
                last_id: first_id.map(|_| next_id - 1),
                new_store_customers: store_count,
                new_store_early: early_count,
            });
            debug!(
                year,
                new_customers,
                new_store = store_count,
                active,
                growth_rate,
                "customer cohort"
            );
        }

        Ok(output)
    }
}

fn categorical_or(
    counts: &std::collections::BTreeMap<String, u64>,
    defaults: &[(&str, f64)],
) -> Result<Categorical<String>, GenerationError> {
    Categorical::from_counts_or(
        counts.iter().map(|(value, count)| (value.clone(), *count)),
        defaults.iter().map(|(value, weight)| (value.to_string(), *weight)),
    )
}

/// January 1 of the year someone turning `age` in `year` was born.
fn birth_bound(year: i32, age: u32) -> Result<NaiveDate, GenerationError> {
    year_start(year - age as i32)
}

#[cfg(test)]
mod tests {
    use chrono::Datelike;

    use histosynth_core::LocationId;

    use super::*;
    use crate::fixtures::sample_history;
    use crate::synth::locations::LocationSynthesizer;

    fn age_on(dob: NaiveDate, date: NaiveDate) -> i32 {
        let mut age = date.year() - dob.year();
        if (date.month(), date.day()) < (dob.month(), dob.day()) {
            age -= 1;
        }
        age
    }

    fn run(years: &[i32]) -> (HistoryProfile, CustomerOutput) {
        let profile = HistoryProfile::analyze(&sample_history()).expect("profile");
        let locations = LocationSynthesizer::new(&profile, years).run().expect("locations");
        let params = CustomerParams::default();
        let output = CustomerSynthesizer::new(&profile, &params, &locations, years)
            .run(&SeedSource::new(1234))
            .expect("customers");
        (profile, output)
    }

    #[test]
    fn ids_continue_above_history() {
        let (profile, output) = run(&[2022, 2023]);
        let mut previous = profile.max_customer_id;
        for customer in &output.customers {
            assert!(customer.id > previous);
            previous = customer.id;
        }
    }

    #[test]
    fn growth_follows_sampled_band() {
        let (profile, output) = run(&[2022, 2023, 2024]);
        let mut previous = profile.last_year_active_customers();
        for cohort in &output.cohorts {
            assert!((0.05..=0.08).contains(&cohort.growth_rate));
            assert_eq!(
                cohort.new_customers,
                (previous as f64 * cohort.growth_rate).round() as u64
            );
            assert_eq!(cohort.active_customers, previous + cohort.new_customers);
            assert_eq!(output.acquired_in(cohort.year).len() as u64, cohort.new_customers);
            previous = cohort.active_customers;
        }
    }

    #[test]
    fn ages_stay_within_bounds_during_acquisition_year() {
        let (_, output) = run(&[2022]);
        let jan = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        for customer in &output.customers {
            let age = age_on(customer.dob, jan);
            assert!((18..=70).contains(&age), "age {age}");
        }
    }

    #[test]
    fn opening_year_homes_a_grand_opening_cohort_at_the_new_location() {
        let (_, output) = run(&[2022, 2023]);
        let new_location = LocationId::from("L04");
        let cohort = output.cohort(2022).expect("cohort");
        let expected = (cohort.new_customers as f64 * 0.2).round() as u64;
        assert!(expected > 0);
        assert_eq!(cohort.new_store_customers, expected);
        assert_eq!(cohort.new_store_early, (expected as f64 * 0.7).floor() as u64);

        let store = output.new_store_cohort(2022);
        assert_eq!(store.len() as u64, expected);
        assert!(store.iter().all(|customer| customer.location_id == new_location));
        let regular = &output.acquired_in(2022)[..(cohort.new_customers - expected) as usize];
        assert!(regular.iter().all(|customer| customer.location_id != new_location));
        assert_eq!(store.last().map(|c| c.id), cohort.last_id);
    }

    #[test]
    fn grand_opening_sources_follow_their_own_mix() {
        let profile = HistoryProfile::analyze(&sample_history()).expect("profile");
        let years = [2022];
        let locations = LocationSynthesizer::new(&profile, &years).run().expect("locations");
        let mut params = CustomerParams::default();
        params.new_store.share = 1.0;
        params.new_store.loyalty_rate = 1.0;
        params.new_store.email_rate_loyal = 1.0;
        params.new_store.sources = vec![histosynth_core::LabelWeight::new("Grand Opening", 1.0)];
        let output = CustomerSynthesizer::new(&profile, &params, &locations, &years)
            .run(&SeedSource::new(1234))
            .expect("customers");

        assert!(!output.customers.is_empty());
        for customer in &output.customers {
            assert_eq!(customer.source, "Grand Opening");
            assert!(customer.loyalty_member && customer.email_list);
        }
    }

    #[test]
    fn zero_share_keeps_every_customer_in_the_regular_mix() {
        let profile = HistoryProfile::analyze(&sample_history()).expect("profile");
        let years = [2022];
        let locations = LocationSynthesizer::new(&profile, &years).run().expect("locations");
        let mut params = CustomerParams::default();
        params.new_store.share = 0.0;
        let output = CustomerSynthesizer::new(&profile, &params, &locations, &years)
            .run(&SeedSource::new(1234))
            .expect("customers");

        assert!(output.new_store_cohort(2022).is_empty());
        assert!(output.new_store_cohort(2023).is_empty());
        let cohort = output.cohort(2022).expect("cohort");
        assert_eq!((cohort.new_store_customers, cohort.new_store_early), (0, 0));
    }

    #[test]
    fn homes_are_open_locations() {
        let (_, output) = run(&[2022]);
        for customer in &output.customers {
            let number = customer.location_id.number().expect("numbered id");
            assert!((1..=4).contains(&number));
        }
    }
}
