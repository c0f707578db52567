use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Datelike;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use histosynth_core::{LocationId, PipelineConfig};
use histosynth_generate::fixtures::sample_history;
use histosynth_generate::output::write_synthesized;
use histosynth_generate::{GenerationEngine, GenerationError, GenerationResult, HistoryProfile};

fn temp_out_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("histosynth_{label}_{}", Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn run(config: PipelineConfig) -> GenerationResult {
    GenerationEngine::new(config)
        .run(&sample_history())
        .expect("generation succeeds")
}

fn hash_file(path: &Path) -> String {
    let bytes = fs::read(path).expect("read file");
    hex::encode(Sha256::digest(&bytes))
}

fn hash_dir(dir: &Path) -> BTreeMap<String, String> {
    let mut hashes = BTreeMap::new();
    for entry in fs::read_dir(dir).expect("read dir") {
        let path = entry.expect("dir entry").path();
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        hashes.insert(name, hash_file(&path));
    }
    hashes
}

#[test]
fn four_year_scenario_opens_one_location_per_year() {
    let result = run(PipelineConfig::new(2022, 4));

    let years: Vec<i32> = result.report.years.iter().map(|summary| summary.year).collect();
    assert_eq!(years, vec![2022, 2023, 2024, 2025]);

    let opened: Vec<(String, i32)> = result
        .tables
        .locations
        .iter()
        .map(|location| (location.id.to_string(), location.opened_on.year()))
        .collect();
    assert_eq!(
        opened,
        vec![
            ("L04".to_string(), 2022),
            ("L05".to_string(), 2023),
            ("L06".to_string(), 2024),
            ("L07".to_string(), 2025),
        ]
    );

    for summary in &result.report.years {
        assert!(summary.employees_hired >= 1, "{} hired nobody", summary.year);
        assert!(summary.orders > 0);
        assert!(summary.line_items >= summary.orders);
    }
}

#[test]
fn customer_growth_stays_in_band() {
    let result = run(PipelineConfig::new(2022, 4));
    let mut previous = result.profile.last_year_active_customers() as f64;
    for cohort in &result.report.cohorts {
        let ratio = cohort.active_customers as f64 / previous;
        assert!(
            (1.045..=1.085).contains(&ratio),
            "{}: growth ratio {ratio}",
            cohort.year
        );
        previous = cohort.active_customers as f64;
    }
}

#[test]
fn generated_ids_continue_above_history() {
    let history = sample_history();
    let profile = HistoryProfile::analyze(&history).expect("profile");
    let result = run(PipelineConfig::new(2022, 2));

    let customer_ids: Vec<u64> = result.tables.customers.iter().map(|c| c.id).collect();
    assert!(customer_ids[0] > profile.max_customer_id);
    assert!(customer_ids.windows(2).all(|pair| pair[0] < pair[1]));

    let order_ids: Vec<u64> = result.tables.orders.iter().map(|o| o.order_id).collect();
    assert!(order_ids[0] > profile.max_order_id);
    assert!(order_ids.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn same_seed_writes_identical_files() {
    let first_dir = temp_out_dir("determinism_a");
    let second_dir = temp_out_dir("determinism_b");

    let first = run(PipelineConfig::new(2022, 2));
    let second = run(PipelineConfig::new(2022, 2));
    let first_files = write_synthesized(&first_dir, &first.tables).expect("write first");
    write_synthesized(&second_dir, &second.tables).expect("write second");

    assert_eq!(hash_dir(&first_dir), hash_dir(&second_dir));
    for file in &first_files {
        assert_eq!(file.sha256, hash_file(Path::new(&file.path)));
    }
}

#[test]
fn different_seed_changes_the_output() {
    let mut config = PipelineConfig::new(2022, 1);
    let first = run(config.clone());
    config.seed += 1;
    let second = run(config);
    assert_ne!(first.tables.orders, second.tables.orders);
}

#[test]
fn opening_location_spikes_in_january() {
    let result = run(PipelineConfig::new(2022, 1));
    let new_location = LocationId::from("L04");
    let mut monthly = [0_u64; 12];
    for order in result
        .tables
        .orders
        .iter()
        .filter(|order| order.location_id == new_location)
    {
        monthly[order.date.month0() as usize] += 1;
    }
    assert!(monthly[0] > monthly[1], "january {:?}", monthly);
}

#[test]
fn corrupted_discount_lookup_is_a_referential_integrity_error() {
    let mut history = sample_history();
    for discount in &mut history.discounts {
        if discount.discount_id == "D2" {
            discount.discount_id = "D9".to_string();
        }
    }

    let err = GenerationEngine::new(PipelineConfig::new(2022, 1))
        .run(&history)
        .unwrap_err();
    match err {
        GenerationError::ReferentialIntegrity { table, key, .. } => {
            assert_eq!(table, "line_items");
            assert_eq!(key, "D2");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn customer_ids_seen_only_on_orders_are_never_reused() {
    let mut history = sample_history();
    let highest_customer = history.customers.iter().map(|c| c.id).max().unwrap_or(0);
    let orphan_id = highest_customer + 1;
    let mut order = history
        .orders
        .last()
        .cloned()
        .expect("fixture has orders");
    order.order_id += 1;
    order.customer_id = orphan_id;
    history.orders.push(order);

    let result = GenerationEngine::new(PipelineConfig::new(2022, 1))
        .run(&history)
        .expect("generation succeeds");

    assert_eq!(result.profile.max_customer_id, orphan_id);
    assert!(!result.tables.customers.is_empty());
    for customer in &result.tables.customers {
        assert!(
            customer.id > orphan_id,
            "customer id {} collides with history",
            customer.id
        );
    }
}
