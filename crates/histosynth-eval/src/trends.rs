//! Soft checks: trend comparisons that only warn.

use std::collections::BTreeMap;

use chrono::Datelike;
use tracing::warn;

use histosynth_core::names;

use crate::checks::CheckInput;
use crate::metrics::YearTrend;
use crate::model::WarningItem;

pub mod codes {
    pub const ORDER_TREND: &str = "order_trend";
    pub const CUSTOMER_GROWTH: &str = "customer_growth";
    pub const SESSION_GROWTH: &str = "session_growth";
    pub const LOCATION_CADENCE: &str = "location_cadence";
}

/// Compare each generated year with the one before it.
pub fn evaluate_trends(input: &CheckInput<'_>) -> (Vec<YearTrend>, Vec<WarningItem>) {
    let config = input.config;
    let tables = &input.result.tables;
    let profile = &input.result.profile;
    let tolerance = &config.validation;

    let mut orders: BTreeMap<i32, u64> = BTreeMap::new();
    for order in &tables.orders {
        *orders.entry(order.date.year()).or_insert(0) += 1;
    }
    let mut sessions: BTreeMap<i32, u64> = BTreeMap::new();
    for stat in &tables.web_stats {
        *sessions.entry(stat.month.year()).or_insert(0) += stat.sessions;
    }
    let mut opened: BTreeMap<i32, u64> = BTreeMap::new();
    for location in &tables.locations {
        *opened.entry(location.opened_on.year()).or_insert(0) += 1;
    }

    let mut trends = Vec::new();
    let mut warnings = Vec::new();
    let mut previous_orders = profile.last_year_orders();
    let mut previous_customers = profile.last_year_active_customers();
    let mut previous_sessions = profile.last_year_sessions();

    for year in config.years() {
        let year_orders = orders.get(&year).copied().unwrap_or(0);
        let order_growth = growth(year_orders, previous_orders);
        let band = config.orders.growth;
        if order_growth < band.min - tolerance.order_trend_tolerance
            || order_growth > band.max + tolerance.order_trend_tolerance
        {
            warnings.push(warning(
                codes::ORDER_TREND,
                names::ORDERS,
                format!(
                    "{year}: order growth {:.3} outside {:.3}..={:.3} (+/- {:.3})",
                    order_growth, band.min, band.max, tolerance.order_trend_tolerance
                ),
                None,
            ));
        }

        let active = input
            .result
            .report
            .cohorts
            .iter()
            .find(|cohort| cohort.year == year)
            .map(|cohort| cohort.active_customers)
            .unwrap_or(previous_customers);
        let customer_growth = growth(active, previous_customers);
        let band = config.customers.growth;
        if customer_growth < band.min - tolerance.customer_growth_tolerance
            || customer_growth > band.max + tolerance.customer_growth_tolerance
        {
            warnings.push(warning(
                codes::CUSTOMER_GROWTH,
                names::CUSTOMERS,
                format!(
                    "{year}: customer growth {:.3} outside {:.3}..={:.3} (+/- {:.3})",
                    customer_growth, band.min, band.max, tolerance.customer_growth_tolerance
                ),
                None,
            ));
        }

        let year_sessions = sessions.get(&year).copied();
        let session_growth = match (year_sessions, previous_sessions) {
            (Some(current), Some(previous)) => Some(growth(current, previous)),
            _ => None,
        };
        let lagging = session_growth.filter(|sessions| order_growth > 0.0 && *sessions <= order_growth);
        if let Some(lagging) = lagging {
            warnings.push(warning(
                codes::SESSION_GROWTH,
                names::WEB_STATS,
                format!(
                    "{year}: session growth {lagging:.3} does not outpace order growth {order_growth:.3}"
                ),
                Some("raise web_stats.session_elasticity".to_string()),
            ));
        }

        let locations_opened = opened.get(&year).copied().unwrap_or(0);
        if locations_opened != 1 {
            warnings.push(warning(
                codes::LOCATION_CADENCE,
                names::LOCATIONS,
                format!("{year}: {locations_opened} location(s) opened, expected exactly one"),
                None,
            ));
        }

        trends.push(YearTrend {
            year,
            orders: year_orders,
            order_growth,
            customer_growth,
            session_growth,
            locations_opened,
        });
        previous_orders = year_orders;
        previous_customers = active;
        previous_sessions = year_sessions.or(previous_sessions);
    }

    for item in &warnings {
        warn!(code = %item.code, path = %item.path, "{}", item.message);
    }
    (trends, warnings)
}

fn growth(current: u64, previous: u64) -> f64 {
    if previous == 0 {
        return 0.0;
    }
    current as f64 / previous as f64 - 1.0
}

fn warning(code: &str, path: &str, message: String, hint: Option<String>) -> WarningItem {
    WarningItem {
        code: code.to_string(),
        path: path.to_string(),
        message,
        hint,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use histosynth_core::{History, PipelineConfig};
    use histosynth_generate::fixtures::sample_history;
    use histosynth_generate::{GenerationEngine, GenerationResult};

    fn generated(num_years: u32) -> (PipelineConfig, History, GenerationResult) {
        let config = PipelineConfig::new(2022, num_years);
        let history = sample_history();
        let result = GenerationEngine::new(config.clone())
            .run(&history)
            .expect("generation");
        (config, history, result)
    }

    #[test]
    fn generated_years_follow_their_trends() {
        let (config, history, result) = generated(3);
        let input = CheckInput {
            config: &config,
            history: &history,
            result: &result,
        };
        let (trends, warnings) = evaluate_trends(&input);
        assert_eq!(trends.len(), 3);
        assert!(warnings.is_empty(), "{warnings:#?}");
        assert!(trends.iter().all(|trend| trend.locations_opened == 1));
        assert!(trends.iter().all(|trend| trend.session_growth.is_some()));
    }

    #[test]
    fn missing_location_opening_warns() {
        let (config, history, mut result) = generated(2);
        result.tables.locations.pop();
        let input = CheckInput {
            config: &config,
            history: &history,
            result: &result,
        };
        let (_, warnings) = evaluate_trends(&input);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, codes::LOCATION_CADENCE);
    }

    #[test]
    fn flat_sessions_warn() {
        let (config, history, mut result) = generated(1);
        let baseline = result.profile.last_year_sessions().expect("history sessions");
        let months = result.tables.web_stats.len() as u64;
        for stat in &mut result.tables.web_stats {
            stat.sessions = baseline / months;
        }
        let input = CheckInput {
            config: &config,
            history: &history,
            result: &result,
        };
        let (_, warnings) = evaluate_trends(&input);
        assert!(warnings.iter().any(|w| w.code == codes::SESSION_GROWTH));
    }
}
