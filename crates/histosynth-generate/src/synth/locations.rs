use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::debug;

use histosynth_core::{Location, LocationId};

use crate::calendar::year_start;
use crate::errors::GenerationError;
use crate::history::HistoryProfile;

/// Existing and newly opened locations with their base order shares.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationPlan {
    existing: Vec<Location>,
    opened: Vec<Location>,
    shares: BTreeMap<LocationId, f64>,
}

impl LocationPlan {
    pub fn existing(&self) -> &[Location] {
        &self.existing
    }

    /// Locations opened by the pipeline, in opening order.
    pub fn opened(&self) -> &[Location] {
        &self.opened
    }

    pub fn all(&self) -> impl Iterator<Item = &Location> {
        self.existing.iter().chain(self.opened.iter())
    }

    pub fn get(&self, id: &LocationId) -> Option<&Location> {
        self.all().find(|location| &location.id == id)
    }

    pub fn opened_in(&self, year: i32) -> Option<&Location> {
        self.opened
            .iter()
            .find(|location| location.opening_year() == year)
    }

    pub fn is_open(&self, id: &LocationId, date: NaiveDate) -> bool {
        self.get(id).is_some_and(|location| location.is_open_on(date))
    }

    pub fn open_on(&self, date: NaiveDate) -> Vec<&Location> {
        self.all()
            .filter(|location| location.is_open_on(date))
            .collect()
    }

    /// Unnormalized base share of `id`.
    pub fn share(&self, id: &LocationId) -> f64 {
        self.shares.get(id).copied().unwrap_or(0.0)
    }

    /// `(location, share)` for every location open on `date`.
    pub fn share_weights(&self, date: NaiveDate) -> Vec<(LocationId, f64)> {
        self.open_on(date)
            .into_iter()
            .map(|location| (location.id.clone(), self.share(&location.id)))
            .collect()
    }

    /// Share of `id` among the locations open on `date`.
    pub fn normalized_share(&self, id: &LocationId, date: NaiveDate) -> f64 {
        let total: f64 = self
            .share_weights(date)
            .iter()
            .map(|(_, share)| share)
            .sum();
        if total <= 0.0 {
            0.0
        } else {
            self.share(id) / total
        }
    }
}

/// Opens one location per generated year on January 1.
#[derive(Debug, Clone)]
pub struct LocationSynthesizer<'a> {
    profile: &'a HistoryProfile,
    years: &'a [i32],
}

impl<'a> LocationSynthesizer<'a> {
    pub fn new(profile: &'a HistoryProfile, years: &'a [i32]) -> Self {
        Self { profile, years }
    }

    pub fn run(&self) -> Result<LocationPlan, GenerationError> {
        let existing = self.profile.locations.clone();
        if existing.is_empty() {
            return Err(GenerationError::InvalidHistory(
                "no location is referenced by history".to_string(),
            ));
        }
        let mut shares = base_shares(self.profile);

        let mut opened: Vec<Location> = Vec::with_capacity(self.years.len());
        for year in self.years {
            let id = LocationId::next_after(existing.iter().chain(opened.iter()).map(|l| &l.id));
            let share = shares.values().sum::<f64>() / shares.len() as f64;
            debug!(location = %id, year, share, "opening location");
            shares.insert(id.clone(), share);
            opened.push(Location {
                id,
                opened_on: year_start(*year)?,
            });
        }

        Ok(LocationPlan {
            existing,
            opened,
            shares,
        })
    }
}

/// Last-year order share per location; locations without orders get the mean.
fn base_shares(profile: &HistoryProfile) -> BTreeMap<LocationId, f64> {
    let total: u64 = profile.location_orders.values().sum();
    let observed: Vec<f64> = profile
        .location_orders
        .values()
        .filter(|count| **count > 0)
        .map(|count| *count as f64 / total.max(1) as f64)
        .collect();
    let fallback = if observed.is_empty() {
        1.0
    } else {
        observed.iter().sum::<f64>() / observed.len() as f64
    };

    profile
        .locations
        .iter()
        .map(|location| {
            let share = match profile.location_orders.get(&location.id) {
                Some(count) if *count > 0 => *count as f64 / total as f64,
                _ => fallback,
            };
            (location.id.clone(), share)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_history;

    #[test]
    fn opens_one_location_per_year() {
        let profile = HistoryProfile::analyze(&sample_history()).expect("profile");
        let years = [2022, 2023, 2024, 2025];
        let plan = LocationSynthesizer::new(&profile, &years).run().expect("plan");

        let ids: Vec<&str> = plan.opened().iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["L04", "L05", "L06", "L07"]);
        for (location, year) in plan.opened().iter().zip(years) {
            assert_eq!(location.opened_on, NaiveDate::from_ymd_opt(year, 1, 1).unwrap());
        }
        assert_eq!(plan.opened_in(2023).map(|l| l.id.as_str()), Some("L05"));
    }

    #[test]
    fn new_location_share_is_mean_of_existing() {
        let profile = HistoryProfile::analyze(&sample_history()).expect("profile");
        let plan = LocationSynthesizer::new(&profile, &[2022]).run().expect("plan");
        let existing_mean = plan
            .existing()
            .iter()
            .map(|l| plan.share(&l.id))
            .sum::<f64>()
            / 3.0;
        assert!((plan.share(&LocationId::from("L04")) - existing_mean).abs() < 1e-9);

        let jan = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        assert_eq!(plan.share_weights(jan).len(), 4);
        assert!((plan.normalized_share(&LocationId::from("L04"), jan) - 0.25).abs() < 1e-9);
        let dec_2021 = NaiveDate::from_ymd_opt(2021, 12, 31).unwrap();
        assert!(!plan.is_open(&LocationId::from("L04"), dec_2021));
    }
}
