use std::collections::BTreeMap;

use chrono::NaiveDate;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use histosynth_core::{Employee, History, SkillReview, SkillReviewParams, Stage};

use crate::errors::GenerationError;
use crate::random::SeedSource;
use crate::synth::employees::EmployeeOutput;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkillReviewOutput {
    pub reviews: Vec<SkillReview>,
    pub reviews_by_year: BTreeMap<i32, u64>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Training {
    skills: bool,
    salesmanship: bool,
    product: bool,
}

impl From<&Employee> for Training {
    fn from(employee: &Employee) -> Self {
        Self {
            skills: employee.skills_training,
            salesmanship: employee.salesmanship_training,
            product: employee.product_training,
        }
    }
}

/// Reviews every employee in January and July of each generated year.
///
/// An employee is reviewed once they started before the review month and
/// are still active on the review date.
#[derive(Debug, Clone)]
pub struct SkillReviewSynthesizer<'a> {
    history: &'a History,
    params: &'a SkillReviewParams,
    years: &'a [i32],
}

impl<'a> SkillReviewSynthesizer<'a> {
    pub fn new(history: &'a History, params: &'a SkillReviewParams, years: &'a [i32]) -> Self {
        Self {
            history,
            params,
            years,
        }
    }

    pub fn run(
        &self,
        employees: &EmployeeOutput,
        seeds: &SeedSource,
    ) -> Result<SkillReviewOutput, GenerationError> {
        let training: BTreeMap<u64, Training> = self
            .history
            .employees
            .iter()
            .chain(&employees.employees)
            .map(|employee| (employee.id, Training::from(employee)))
            .collect();

        let mut output = SkillReviewOutput::default();
        for &year in self.years {
            let mut rng = seeds.year_rng(Stage::SkillReviews, year);
            let mut rows = Vec::new();
            for (month, days) in [(1, self.params.january_days), (7, self.params.july_days)] {
                let month_start = review_date(year, month, 1)?;
                for tenure in employees.roster.tenures() {
                    if tenure.start >= month_start {
                        continue;
                    }
                    let date = review_date(year, month, rng.random_range(days.0..=days.1))?;
                    if !tenure.is_active(date) {
                        continue;
                    }
                    let flags = training
                        .get(&tenure.employee_id)
                        .copied()
                        .unwrap_or_default();
                    rows.push(self.review(&mut rng, tenure.employee_id, date, flags));
                }
            }
            rows.sort_by_key(|review| (review.date, review.employee_id));
            debug!(year, reviews = rows.len(), "skill reviews");
            output.reviews_by_year.insert(year, rows.len() as u64);
            output.reviews.extend(rows);
        }
        Ok(output)
    }

    fn review(
        &self,
        rng: &mut ChaCha8Rng,
        employee_id: u64,
        date: NaiveDate,
        flags: Training,
    ) -> SkillReview {
        let params = self.params;
        SkillReview {
            employee_id,
            date,
            salesmanship: self.rating(rng, params.salesmanship_mean, flags.salesmanship),
            product_knowledge: self.rating(rng, params.product_knowledge_mean, flags.product),
            team_player: self.rating(rng, params.team_player_mean, flags.skills),
            innovator: self.rating(rng, params.innovator_mean, flags.skills),
            satisfaction: self.rating(rng, params.satisfaction_mean, flags.skills),
        }
    }

    /// One rating, clipped to the configured range and rounded to one decimal.
    fn rating(&self, rng: &mut ChaCha8Rng, mean: f64, trained: bool) -> f64 {
        let params = self.params;
        let boost = if trained {
            rng.random_range(params.training_boost.min..=params.training_boost.max)
        } else {
            0.0
        };
        let value = mean + boost + rng.random_range(-params.spread..=params.spread);
        (value.clamp(params.min_rating, params.max_rating) * 10.0).round() / 10.0
    }
}

fn review_date(year: i32, month: u32, day: u32) -> Result<NaiveDate, GenerationError> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        GenerationError::Sampling(format!("invalid review date {year}-{month:02}-{day:02}"))
    })
}

#[cfg(test)]
mod tests {
    use chrono::Datelike;
    use histosynth_core::EmployeeParams;

    use super::*;
    use crate::fixtures::sample_history;
    use crate::history::HistoryProfile;
    use crate::synth::employees::EmployeeSynthesizer;
    use crate::synth::locations::LocationSynthesizer;

    fn upstream(history: &History, years: &[i32], params: &EmployeeParams) -> EmployeeOutput {
        let profile = HistoryProfile::analyze(history).expect("profile");
        let locations = LocationSynthesizer::new(&profile, years).run().expect("locations");
        EmployeeSynthesizer::new(history, &profile, params, &locations, years)
            .run(&SeedSource::new(1234))
            .expect("employees")
    }

    #[test]
    fn reviews_fall_in_january_and_july_while_active() {
        let history = sample_history();
        let years = [2022, 2023];
        let employee_params = EmployeeParams {
            termination_rate: 0.4,
            ..EmployeeParams::default()
        };
        let employees = upstream(&history, &years, &employee_params);
        let params = SkillReviewParams::default();
        let output = SkillReviewSynthesizer::new(&history, &params, &years)
            .run(&employees, &SeedSource::new(1234))
            .expect("skill reviews");

        assert!(!output.reviews.is_empty());
        for review in &output.reviews {
            let day = review.date.day();
            match review.date.month() {
                1 => assert!((9..=16).contains(&day), "january day {day}"),
                7 => assert!((1..=8).contains(&day), "july day {day}"),
                month => panic!("review in month {month}"),
            }
            let tenure = employees.roster.tenure(review.employee_id).expect("tenure");
            assert!(tenure.is_active(review.date));
            assert!(tenure.start < review.date);
            for rating in review.ratings() {
                assert!((2.0..=5.0).contains(&rating), "rating {rating}");
                assert_eq!((rating * 10.0).round() / 10.0, rating);
            }
        }
    }

    #[test]
    fn january_hires_wait_for_the_july_review() {
        let history = sample_history();
        let years = [2022];
        let employees = upstream(&history, &years, &EmployeeParams::default());
        let params = SkillReviewParams::default();
        let output = SkillReviewSynthesizer::new(&history, &params, &years)
            .run(&employees, &SeedSource::new(1234))
            .expect("skill reviews");

        for hire in &employees.employees {
            let months: Vec<u32> = output
                .reviews
                .iter()
                .filter(|review| review.employee_id == hire.id)
                .map(|review| review.date.month())
                .collect();
            assert!(!months.contains(&1), "employee {} reviewed in january", hire.id);
        }
    }

    #[test]
    fn training_raises_the_matching_ratings() {
        let history = sample_history();
        let years = [2022, 2023, 2024];
        let employees = upstream(&history, &years, &EmployeeParams::default());
        let params = SkillReviewParams {
            spread: 0.0,
            ..SkillReviewParams::default()
        };
        let output = SkillReviewSynthesizer::new(&history, &params, &years)
            .run(&employees, &SeedSource::new(99))
            .expect("skill reviews");

        let trained: BTreeMap<u64, bool> = history
            .employees
            .iter()
            .chain(&employees.employees)
            .map(|employee| (employee.id, employee.product_training))
            .collect();
        for review in &output.reviews {
            if trained.get(&review.employee_id).copied().unwrap_or(false) {
                assert!(review.product_knowledge >= 4.1, "{}", review.product_knowledge);
            } else {
                assert_eq!(review.product_knowledge, 3.6);
            }
        }
    }
}
