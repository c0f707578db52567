use std::collections::BTreeMap;

use chrono::Datelike;
use rand::Rng;
use tracing::debug;

use histosynth_core::{Order, Stage, WebStat, WebStatsParams};

use crate::calendar::month_start;
use crate::errors::GenerationError;
use crate::history::{HistoryProfile, WebBaseline};
use crate::random::SeedSource;
use crate::sampling::apportion;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebStatsOutput {
    pub web_stats: Vec<WebStat>,
    pub yearly_sessions: BTreeMap<i32, u64>,
}

/// Monthly web traffic calibrated to generated order volume.
#[derive(Debug, Clone)]
pub struct WebStatsSynthesizer<'a> {
    profile: &'a HistoryProfile,
    params: &'a WebStatsParams,
    years: &'a [i32],
}

impl<'a> WebStatsSynthesizer<'a> {
    pub fn new(profile: &'a HistoryProfile, params: &'a WebStatsParams, years: &'a [i32]) -> Self {
        Self {
            profile,
            params,
            years,
        }
    }

    pub fn run(&self, orders: &[Order], seeds: &SeedSource) -> Result<WebStatsOutput, GenerationError> {
        let baseline = self.baseline();
        let mut monthly_orders: BTreeMap<i32, [u64; 12]> = BTreeMap::new();
        for order in orders {
            monthly_orders.entry(order.date.year()).or_insert([0; 12])[order.date.month0() as usize] += 1;
        }

        let mut previous_orders = self.profile.last_year_orders();
        let mut previous_sessions = self.profile.last_year_sessions().unwrap_or_else(|| {
            (previous_orders as f64 * self.params.sessions_per_order).round() as u64
        });
        let mut output = WebStatsOutput::default();

        for &year in self.years {
            let mut rng = seeds.year_rng(Stage::WebStats, year);
            let months = monthly_orders.get(&year).copied().unwrap_or([0; 12]);
            let year_orders: u64 = months.iter().sum();
            let order_growth = if previous_orders > 0 {
                year_orders as f64 / previous_orders as f64 - 1.0
            } else {
                0.0
            };
            let sessions = match self.params.anchor_for(year) {
                Some(anchor) => anchor,
                None => (previous_sessions as f64
                    * (1.0 + self.params.session_elasticity * order_growth))
                    .max(0.0)
                    .round() as u64,
            };
            previous_orders = year_orders;
            previous_sessions = sessions;
            output.yearly_sessions.insert(year, sessions);

            let elapsed = (year - self.profile.last_year) as f64;
            let mobile_share = (baseline.mobile_share + self.params.mobile_shift * elapsed)
                .clamp(0.0, self.params.mobile_cap);
            let tablet_share = self.params.tablet_share;
            let desktop_share = 1.0 - mobile_share - tablet_share;

            let weights: Vec<f64> = months.iter().map(|count| *count as f64).collect();
            for (idx, month_sessions) in apportion(sessions, &weights).into_iter().enumerate() {
                let noise = self.params.conversion_noise;
                let conversion_rate = (baseline.conversion_rate
                    + self.params.conversion_drift * elapsed
                    + rng.random_range(-noise..=noise))
                .clamp(0.0, 100.0);
                let page_views = (month_sessions as f64
                    * baseline.pages_per_session
                    * rng.random_range(0.9..=1.1))
                .round() as u64;
                output.web_stats.push(WebStat {
                    month: month_start(year, idx as u32 + 1)?,
                    sessions: month_sessions,
                    page_views,
                    avg_time_on_page_secs: baseline.avg_time_on_page_secs
                        * rng.random_range(0.9..=1.1),
                    conversion_rate,
                    bounce_rate: (baseline.bounce_rate * rng.random_range(0.9..=1.1))
                        .clamp(0.0, 100.0),
                    mobile_share,
                    desktop_share,
                    tablet_share,
                });
            }
            debug!(year, sessions, order_growth, "web traffic year");
        }

        Ok(output)
    }

    fn baseline(&self) -> WebBaseline {
        match &self.profile.web_baseline {
            Some(baseline) => baseline.clone(),
            None => WebBaseline {
                conversion_rate: self.params.base_conversion,
                mobile_share: self.params.base_mobile_share,
                tablet_share: self.params.tablet_share,
                ..WebBaseline::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};
    use histosynth_core::{LocationId, YearCount};

    use super::*;
    use crate::fixtures::sample_history;

    fn orders(per_year: &[(i32, u64)]) -> Vec<Order> {
        let mut rows = Vec::new();
        for (year, count) in per_year {
            for idx in 0..*count {
                rows.push(Order {
                    order_id: rows.len() as u64 + 1,
                    customer_id: 1,
                    employee_id: 1,
                    location_id: LocationId::from("L01"),
                    date: NaiveDate::from_ymd_opt(*year, 1 + (idx % 12) as u32, 5).unwrap(),
                    time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                });
            }
        }
        rows
    }

    #[test]
    fn sessions_grow_faster_than_orders() {
        let profile = HistoryProfile::analyze(&sample_history()).expect("profile");
        let params = WebStatsParams::default();
        let years = [2022, 2023];
        let output = WebStatsSynthesizer::new(&profile, &params, &years)
            .run(&orders(&[(2022, 504), (2023, 534)]), &SeedSource::new(4))
            .expect("web");

        assert_eq!(output.web_stats.len(), 24);
        let base = profile.last_year_sessions().expect("history sessions") as f64;
        let first = output.yearly_sessions[&2022] as f64;
        let second = output.yearly_sessions[&2023] as f64;
        assert!(first / base - 1.0 > 504.0 / 480.0 - 1.0);
        assert!(second / first - 1.0 > 534.0 / 504.0 - 1.0);

        let monthly_total: u64 = output
            .web_stats
            .iter()
            .filter(|stat| stat.month.year() == 2022)
            .map(|stat| stat.sessions)
            .sum();
        assert_eq!(monthly_total, output.yearly_sessions[&2022]);
    }

    #[test]
    fn device_shares_stay_split_and_capped() {
        let profile = HistoryProfile::analyze(&sample_history()).expect("profile");
        let params = WebStatsParams::default();
        let years: Vec<i32> = (2022..2032).collect();
        let output = WebStatsSynthesizer::new(&profile, &params, &years)
            .run(&orders(&[(2022, 120)]), &SeedSource::new(4))
            .expect("web");

        for stat in &output.web_stats {
            assert!(stat.mobile_share <= params.mobile_cap + 1e-9);
            assert!(stat.desktop_share > 0.0);
            assert!((stat.mobile_share + stat.desktop_share + stat.tablet_share - 1.0).abs() < 1e-9);
            assert!((0.0..=100.0).contains(&stat.conversion_rate));
            assert!((0.0..=100.0).contains(&stat.bounce_rate));
        }
    }

    #[test]
    fn anchors_override_growth() {
        let profile = HistoryProfile::analyze(&sample_history()).expect("profile");
        let params = WebStatsParams {
            session_anchors: vec![YearCount {
                year: 2022,
                count: 12_345,
            }],
            ..WebStatsParams::default()
        };
        let output = WebStatsSynthesizer::new(&profile, &params, &[2022])
            .run(&orders(&[(2022, 100)]), &SeedSource::new(4))
            .expect("web");
        assert_eq!(output.yearly_sessions[&2022], 12_345);
    }
}
