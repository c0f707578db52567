use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::debug;

use histosynth_core::History;
use histosynth_core::names;

use crate::errors::GenerationError;

/// Load a history from `<dir>/<table>.csv` files.
///
/// `orders`, `line_items` and `items` are required; every other table may be
/// absent and loads as empty.
pub fn load_history(dir: &Path) -> Result<History, GenerationError> {
    if !dir.is_dir() {
        return Err(GenerationError::InvalidHistory(format!(
            "history directory '{}' does not exist",
            dir.display()
        )));
    }

    let history = History {
        customers: read_optional(dir, names::CUSTOMERS)?,
        employees: read_optional(dir, names::EMPLOYEES)?,
        employment_periods: read_optional(dir, names::EMPLOYMENT_PERIODS)?,
        orders: read_required(dir, names::ORDERS)?,
        line_items: read_required(dir, names::LINE_ITEMS)?,
        inventory: read_optional(dir, names::INVENTORY)?,
        discounts: read_optional(dir, names::DISCOUNTS)?,
        items: read_required(dir, names::ITEMS)?,
        reviews: read_optional(dir, names::REVIEWS)?,
        web_stats: read_optional(dir, names::WEB_STATS)?,
        skill_reviews: read_optional(dir, names::SKILL_REVIEWS)?,
        termination_reasons: read_optional(dir, names::TERMINATION_REASONS)?,
        line_item_returns: read_optional(dir, names::LINE_ITEM_RETURNS)?,
    };

    debug!(
        dir = %dir.display(),
        customers = history.customers.len(),
        orders = history.orders.len(),
        line_items = history.line_items.len(),
        "history loaded"
    );
    Ok(history)
}

fn read_required<T: DeserializeOwned>(dir: &Path, table: &str) -> Result<Vec<T>, GenerationError> {
    let path = dir.join(format!("{table}.csv"));
    if !path.is_file() {
        return Err(GenerationError::InvalidHistory(format!(
            "required table '{table}' is missing ({})",
            path.display()
        )));
    }
    read_rows(&path)
}

fn read_optional<T: DeserializeOwned>(dir: &Path, table: &str) -> Result<Vec<T>, GenerationError> {
    let path = dir.join(format!("{table}.csv"));
    if !path.is_file() {
        return Ok(Vec::new());
    }
    read_rows(&path)
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, GenerationError> {
    let reader = BufReader::new(File::open(path)?);
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(::csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record?);
    }
    Ok(rows)
}
