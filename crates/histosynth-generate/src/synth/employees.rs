use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use fake::Fake;
use fake::faker::name::en::{FirstName, LastName};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use histosynth_core::{Employee, EmployeeParams, EmploymentPeriod, History, LocationId, Stage};

use crate::calendar::{year_end, year_start};
use crate::errors::GenerationError;
use crate::history::HistoryProfile;
use crate::random::{SeedSource, uniform_date};
use crate::roster::{EmployeeRoster, Tenure};
use crate::sampling::Categorical;
use crate::synth::customers::DEFAULT_GENDERS;
use crate::synth::locations::LocationPlan;

/// New employees, per-year employment statuses and the combined roster.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployeeOutput {
    pub employees: Vec<Employee>,
    pub periods: Vec<EmploymentPeriod>,
    /// Historical and generated tenures after every termination was applied.
    pub roster: EmployeeRoster,
    pub hires_by_year: BTreeMap<i32, u64>,
    pub terminations_by_year: BTreeMap<i32, u64>,
}

/// Hires, terminates and replaces staff so every open location stays covered.
#[derive(Debug, Clone)]
pub struct EmployeeSynthesizer<'a> {
    history: &'a History,
    profile: &'a HistoryProfile,
    params: &'a EmployeeParams,
    locations: &'a LocationPlan,
    years: &'a [i32],
}

struct Hiring<'p> {
    params: &'p EmployeeParams,
    genders: Categorical<String>,
    next_id: u64,
    hired: Vec<Employee>,
}

impl Hiring<'_> {
    fn hire(
        &mut self,
        rng: &mut ChaCha8Rng,
        roster: &mut EmployeeRoster,
        location: &LocationId,
        start: NaiveDate,
    ) -> Result<(), GenerationError> {
        let year = start.year();
        let oldest = year_start(year - self.params.max_age as i32)?;
        let youngest = year_start(year - self.params.min_age as i32)?;
        let employee = Employee {
            id: self.next_id,
            first_name: FirstName().fake_with_rng(rng),
            last_name: LastName().fake_with_rng(rng),
            gender: self.genders.sample(rng).clone(),
            dob: uniform_date(rng, oldest, youngest),
            location_id: location.clone(),
            start_date: start,
            termination_date: None,
            skills_training: rng.random_bool(self.params.training_rate),
            salesmanship_training: rng.random_bool(self.params.training_rate),
            product_training: rng.random_bool(self.params.training_rate),
        };
        roster.insert(Tenure {
            employee_id: employee.id,
            location_id: employee.location_id.clone(),
            start,
            end: None,
        });
        debug!(employee_id = employee.id, location = %location, %start, "hired employee");
        self.hired.push(employee);
        self.next_id += 1;
        Ok(())
    }
}

impl<'a> EmployeeSynthesizer<'a> {
    pub fn new(
        history: &'a History,
        profile: &'a HistoryProfile,
        params: &'a EmployeeParams,
        locations: &'a LocationPlan,
        years: &'a [i32],
    ) -> Self {
        Self {
            history,
            profile,
            params,
            locations,
            years,
        }
    }

    pub fn run(&self, seeds: &SeedSource) -> Result<EmployeeOutput, GenerationError> {
        let mut roster =
            EmployeeRoster::from_records(&self.history.employees, &self.history.employment_periods);
        let mut gender_counts: BTreeMap<String, u64> = BTreeMap::new();
        for employee in &self.history.employees {
            *gender_counts.entry(employee.gender.clone()).or_insert(0) += 1;
        }
        let genders = Categorical::from_counts_or(
            gender_counts,
            DEFAULT_GENDERS.iter().map(|(value, weight)| (value.to_string(), *weight)),
        )?;
        let mut hiring = Hiring {
            params: self.params,
            genders,
            next_id: self.profile.max_employee_id + 1,
            hired: Vec::new(),
        };
        let mut hires_by_year = BTreeMap::new();
        let mut terminations_by_year = BTreeMap::new();

        for &year in self.years {
            let mut rng = seeds.year_rng(Stage::Employees, year);
            let jan_first = year_start(year)?;
            let dec_last = year_end(year)?;
            let hired_before = hiring.hired.len();

            let regular = rng.random_range(self.params.hires_min..=self.params.hires_max);
            let weights = Categorical::new(self.locations.share_weights(jan_first))?;
            for _ in 0..regular {
                let location = weights.sample(&mut rng).clone();
                let offset = rng.random_range(0..=self.params.start_window_days as i64);
                hiring.hire(&mut rng, &mut roster, &location, jan_first + Duration::days(offset))?;
            }

            if let Some(opened) = self.locations.opened_in(year) {
                for _ in 0..self.params.hires_per_new_location {
                    hiring.hire(&mut rng, &mut roster, &opened.id, jan_first)?;
                }
            }

            for location in self.locations.open_on(jan_first) {
                if roster.active_at(&location.id, jan_first).is_empty() {
                    hiring.hire(&mut rng, &mut roster, &location.id, jan_first)?;
                }
            }

            let carried: Vec<u64> = roster
                .tenures()
                .filter(|tenure| tenure.start < jan_first && tenure.is_active(jan_first))
                .map(|tenure| tenure.employee_id)
                .collect();
            let mut terminated = 0_u64;
            for employee_id in carried {
                if rng.random_bool(self.params.termination_rate) {
                    let date = uniform_date(&mut rng, jan_first + Duration::days(1), dec_last);
                    roster.terminate(employee_id, date);
                    terminated += 1;
                }
            }

            let mut departures: Vec<(NaiveDate, u64, LocationId)> = roster
                .tenures()
                .filter_map(|tenure| {
                    let end = tenure.end?;
                    (end > jan_first && end <= dec_last).then(|| {
                        (end, tenure.employee_id, tenure.location_id.clone())
                    })
                })
                .collect();
            departures.sort();
            for (date, employee_id, location) in departures {
                if !self.locations.is_open(&location, date) {
                    continue;
                }
                if !roster.is_covered(&location, date, dec_last, Some(employee_id)) {
                    hiring.hire(&mut rng, &mut roster, &location, date)?;
                }
            }

            let hired = (hiring.hired.len() - hired_before) as u64;
            debug!(year, hired, terminated, "staffing year");
            hires_by_year.insert(year, hired);
            terminations_by_year.insert(year, terminated);
        }

        let periods = self.periods(&roster)?;
        let employees = hiring
            .hired
            .into_iter()
            .map(|mut employee| {
                employee.termination_date = roster.tenure(employee.id).and_then(|t| t.end);
                employee
            })
            .collect();

        Ok(EmployeeOutput {
            employees,
            periods,
            roster,
            hires_by_year,
            terminations_by_year,
        })
    }

    /// One status row per employee and generated year, from the first year the
    /// employee works until the year of termination.
    fn periods(&self, roster: &EmployeeRoster) -> Result<Vec<EmploymentPeriod>, GenerationError> {
        let mut periods = Vec::new();
        for tenure in roster.tenures() {
            for &year in self.years {
                let jan_first = year_start(year)?;
                let dec_last = year_end(year)?;
                if tenure.start > dec_last {
                    continue;
                }
                if tenure.end.is_some_and(|end| end <= jan_first) {
                    break;
                }
                let terminated_on = tenure.end.filter(|end| *end <= dec_last);
                periods.push(EmploymentPeriod {
                    employee_id: tenure.employee_id,
                    year,
                    active: terminated_on.is_none(),
                    terminated_on,
                });
            }
        }
        Ok(periods)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::fixtures::sample_history;
    use crate::synth::locations::LocationSynthesizer;

    fn run(history: &History, years: &[i32], params: &EmployeeParams) -> EmployeeOutput {
        let profile = HistoryProfile::analyze(history).expect("profile");
        let locations = LocationSynthesizer::new(&profile, years).run().expect("locations");
        EmployeeSynthesizer::new(history, &profile, params, &locations, years)
            .run(&SeedSource::new(1234))
            .expect("employees")
    }

    #[test]
    fn every_open_location_is_staffed_every_day() {
        let history = sample_history();
        let years = [2022, 2023, 2024, 2025];
        let params = EmployeeParams {
            termination_rate: 0.3,
            ..EmployeeParams::default()
        };
        let output = run(&history, &years, &params);

        for year in years {
            let mut day = year_start(year).unwrap();
            let last = year_end(year).unwrap();
            let open: Vec<LocationId> = (1..=3 + (year - 2021) as u32)
                .map(LocationId::from_number)
                .collect();
            while day <= last {
                for location in &open {
                    assert!(
                        !output.roster.active_at(location, day).is_empty(),
                        "{location} uncovered on {day}"
                    );
                }
                day += Duration::days(1);
            }
        }
    }

    #[test]
    fn hires_at_least_one_employee_per_year() {
        let history = sample_history();
        let output = run(&history, &[2022, 2023], &EmployeeParams::default());
        for year in [2022, 2023] {
            assert!(output.hires_by_year[&year] >= 1);
        }
        let opened: BTreeSet<&str> = output
            .employees
            .iter()
            .filter(|e| e.start_date == year_start(2022).unwrap())
            .map(|e| e.location_id.as_str())
            .collect();
        assert!(opened.contains("L04"));
    }

    #[test]
    fn periods_are_absorbing() {
        let history = sample_history();
        let params = EmployeeParams {
            termination_rate: 0.5,
            ..EmployeeParams::default()
        };
        let output = run(&history, &[2022, 2023, 2024], &params);

        let mut by_employee: BTreeMap<u64, Vec<&EmploymentPeriod>> = BTreeMap::new();
        for period in &output.periods {
            by_employee.entry(period.employee_id).or_default().push(period);
        }
        assert!(output.periods.iter().any(|p| !p.active));
        for periods in by_employee.values() {
            let inactive = periods.iter().position(|p| !p.active);
            if let Some(idx) = inactive {
                assert_eq!(idx, periods.len() - 1, "no rows after termination");
                assert!(periods[idx].terminated_on.is_some());
            }
        }
    }

    #[test]
    fn new_rows_carry_their_termination_date() {
        let history = sample_history();
        let params = EmployeeParams {
            termination_rate: 0.9,
            ..EmployeeParams::default()
        };
        let output = run(&history, &[2022, 2023, 2024], &params);
        for employee in &output.employees {
            let tenure = output.roster.tenure(employee.id).expect("tenure");
            assert_eq!(employee.termination_date, tenure.end);
            assert!(employee.id > 8);
        }
    }
}
