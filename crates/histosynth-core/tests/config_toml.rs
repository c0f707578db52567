use histosynth_core::{Error, PipelineConfig, YearCount};
use schemars::schema_for;

#[test]
fn partial_toml_keeps_defaults_for_missing_keys() {
    let config = PipelineConfig::from_toml_str(
        r#"
start_year = 2024
num_years = 2

[orders]
opening_spike = 3.0

[[reviews.targets]]
year = 2024
count = 300
"#,
    )
    .expect("parse config");

    assert_eq!(config.start_year, 2024);
    assert_eq!(config.num_years, 2);
    assert_eq!(config.seed, 1234);
    assert_eq!(config.orders.opening_spike, 3.0);
    assert_eq!(config.orders.max_attempts, 10);
    assert_eq!(config.orders.holiday_windows.len(), 4);
    assert_eq!(
        config.reviews.targets,
        vec![YearCount {
            year: 2024,
            count: 300
        }]
    );
    assert_eq!(config.reviews.target_for(2024), Some(300));
    assert_eq!(config.reviews.target_for(2025), None);
    config.validate().expect("valid config");
}

#[test]
fn malformed_toml_is_a_configuration_error() {
    let err = PipelineConfig::from_toml_str("num_years = \"four\"").unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn desktop_share_must_remain_positive() {
    let mut config = PipelineConfig::default();
    config.web_stats.mobile_cap = 0.9;
    config.web_stats.tablet_share = 0.1;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("desktop"));
}

#[test]
fn config_round_trips_through_json() {
    let config = PipelineConfig::new(2030, 3);
    let json = serde_json::to_string(&config).expect("serialize config");
    let parsed: PipelineConfig = serde_json::from_str(&json).expect("parse config");
    assert_eq!(parsed, config);
}

#[test]
fn json_schema_lists_parameter_groups() {
    let schema = serde_json::to_value(schema_for!(PipelineConfig)).expect("schema json");
    let properties = schema["properties"].as_object().expect("properties");
    for key in [
        "start_year",
        "num_years",
        "seed",
        "orders",
        "web_stats",
        "skill_reviews",
        "terminations",
        "returns",
    ] {
        assert!(properties.contains_key(key), "missing {key}");
    }
}

#[test]
fn nested_new_store_and_return_mix_parse_from_toml() {
    let config = PipelineConfig::from_toml_str(
        r#"
[customers.new_store]
share = 0.3
opening_months = 2

[[returns.reasons]]
label = "R1"
weight = 1.0

[skill_reviews]
july_days = [2, 8]
"#,
    )
    .expect("parse config");

    assert_eq!(config.customers.new_store.share, 0.3);
    assert_eq!(config.customers.new_store.opening_months, 2);
    assert_eq!(config.customers.new_store.early_share, 0.7);
    assert_eq!(config.customers.new_store.sources.len(), 6);
    assert_eq!(config.returns.reasons.len(), 1);
    assert_eq!(config.returns.rate.min, 0.045);
    assert_eq!(config.skill_reviews.july_days, (2, 8));
    assert_eq!(config.terminations.reasons.len(), 3);
    config.validate().expect("valid config");
}
