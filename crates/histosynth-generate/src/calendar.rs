use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;

use histosynth_core::{BusinessHours, HolidayWindow};

use crate::errors::GenerationError;

/// Monthly order weights used when history is too thin to trust; peaks in summer.
const DEFAULT_MONTH_WEIGHTS: [f64; 12] = [
    0.060, 0.060, 0.075, 0.085, 0.095, 0.110, 0.115, 0.105, 0.085, 0.075, 0.065, 0.070,
];

/// Relative order volume per calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalCurve {
    month_weights: [f64; 12],
}

impl SeasonalCurve {
    pub fn default_curve() -> Self {
        Self {
            month_weights: DEFAULT_MONTH_WEIGHTS,
        }
    }

    /// Curve from observed monthly order counts, or the default when fewer
    /// than `min_orders` orders back it or some month has no orders.
    pub fn from_monthly_counts(counts: &[u64; 12], min_orders: u64) -> Self {
        let total: u64 = counts.iter().sum();
        if total == 0 || total < min_orders || counts.contains(&0) {
            return Self::default_curve();
        }
        let mut month_weights = [0.0; 12];
        for (weight, count) in month_weights.iter_mut().zip(counts) {
            *weight = *count as f64 / total as f64;
        }
        Self { month_weights }
    }

    pub fn month_weight(&self, month: u32) -> f64 {
        self.month_weights[(month as usize).saturating_sub(1).min(11)]
    }
}

/// Sampling weights over the days of one year.
#[derive(Debug, Clone)]
pub struct YearCalendar {
    year: i32,
    days: Vec<NaiveDate>,
    weights: Vec<f64>,
    index: WeightedIndex<f64>,
    months: Vec<(usize, WeightedIndex<f64>)>,
}

impl YearCalendar {
    /// Day weight = month weight / days in month, times every matching holiday factor.
    pub fn new(
        curve: &SeasonalCurve,
        year: i32,
        holidays: &[HolidayWindow],
    ) -> Result<Self, GenerationError> {
        let days = days_in_year(year)?;
        let weights: Vec<f64> = days
            .iter()
            .map(|day| {
                let base = curve.month_weight(day.month()) / days_in_month(year, day.month()) as f64;
                holidays
                    .iter()
                    .filter(|window| window.contains(*day))
                    .fold(base, |weight, window| weight * window.factor)
            })
            .collect();
        let index = weighted(&weights)?;

        let mut months = Vec::with_capacity(12);
        let mut offset = 0;
        for month in 1..=12 {
            let len = days_in_month(year, month) as usize;
            months.push((offset, weighted(&weights[offset..offset + len])?));
            offset += len;
        }

        Ok(Self {
            year,
            days,
            weights,
            index,
            months,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn sample_date<R: Rng + ?Sized>(&self, rng: &mut R) -> NaiveDate {
        self.days[self.index.sample(rng)]
    }

    pub fn sample_date_in_month<R: Rng + ?Sized>(&self, rng: &mut R, month: u32) -> NaiveDate {
        let (offset, index) = &self.months[(month as usize).saturating_sub(1).min(11)];
        self.days[offset + index.sample(rng)]
    }

    /// Date within months `first..=last`, months weighted by their share of the
    /// year. Falls back to the whole year when the range holds no weight.
    pub fn sample_date_between_months<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        first: u32,
        last: u32,
    ) -> NaiveDate {
        let months: Vec<u32> = (first.max(1)..=last.min(12)).collect();
        let shares: Vec<f64> = months.iter().map(|month| self.month_share(*month)).collect();
        match WeightedIndex::new(&shares) {
            Ok(index) => {
                let month = months[index.sample(rng)];
                self.sample_date_in_month(rng, month)
            }
            Err(_) => self.sample_date(rng),
        }
    }

    /// Share of the year's sampling weight that falls in `month`.
    pub fn month_share(&self, month: u32) -> f64 {
        let total: f64 = self.weights.iter().sum();
        if total <= 0.0 {
            return 0.0;
        }
        let month_total: f64 = self
            .days
            .iter()
            .zip(&self.weights)
            .filter(|(day, _)| day.month() == month)
            .map(|(_, weight)| *weight)
            .sum();
        month_total / total
    }
}

/// Uniform time of day within business hours, at second resolution.
pub fn sample_time<R: Rng + ?Sized>(rng: &mut R, hours: BusinessHours) -> NaiveTime {
    let start = hours.open_hour * 3600;
    let end = hours.close_hour * 3600;
    let seconds = rng.random_range(start..end);
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0).unwrap_or(NaiveTime::MIN)
}

pub fn year_start(year: i32) -> Result<NaiveDate, GenerationError> {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| GenerationError::Configuration(format!("year {year} is out of range")))
}

pub fn year_end(year: i32) -> Result<NaiveDate, GenerationError> {
    NaiveDate::from_ymd_opt(year, 12, 31)
        .ok_or_else(|| GenerationError::Configuration(format!("year {year} is out of range")))
}

pub fn month_start(year: i32, month: u32) -> Result<NaiveDate, GenerationError> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        GenerationError::Configuration(format!("month {year}-{month:02} is out of range"))
    })
}

pub fn days_in_year(year: i32) -> Result<Vec<NaiveDate>, GenerationError> {
    let start = year_start(year)?;
    let end = year_end(year)?;
    let span = (end - start).num_days();
    Ok((0..=span).map(|offset| start + Duration::days(offset)).collect())
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    match (NaiveDate::from_ymd_opt(year, month, 1), next) {
        (Some(first), Some(next)) => (next - first).num_days() as u32,
        _ => 30,
    }
}

fn weighted(weights: &[f64]) -> Result<WeightedIndex<f64>, GenerationError> {
    WeightedIndex::new(weights)
        .map_err(|err| GenerationError::Sampling(format!("invalid calendar weights: {err}")))
}
