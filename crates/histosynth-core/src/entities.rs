use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::ids::LocationId;

/// A customer of the business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    /// Append-only identifier; never reassigned.
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub dob: NaiveDate,
    pub loyalty_member: bool,
    pub email_list: bool,
    /// Acquisition channel (e.g. `WalkIn`, `Social`).
    pub source: String,
    /// Home location.
    pub location_id: LocationId,
}

/// A store location. Only new locations are materialized as rows; existing
/// ones are inferred from history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub opened_on: NaiveDate,
}

impl Location {
    pub fn is_open_on(&self, date: NaiveDate) -> bool {
        self.opened_on <= date
    }

    pub fn opening_year(&self) -> i32 {
        self.opened_on.year()
    }
}

/// An employee and their tenure at a single location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub dob: NaiveDate,
    pub location_id: LocationId,
    pub start_date: NaiveDate,
    /// First day the employee is no longer active.
    pub termination_date: Option<NaiveDate>,
    pub skills_training: bool,
    pub salesmanship_training: bool,
    pub product_training: bool,
}

/// Employment status of one employee for one reporting period (a year).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmploymentPeriod {
    pub employee_id: u64,
    pub year: i32,
    /// Still employed at the end of the period.
    pub active: bool,
    /// Set on the period in which the termination happened.
    pub terminated_on: Option<NaiveDate>,
}

/// Semi-annual performance review of one employee. Ratings are on a 1-5
/// scale with one decimal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillReview {
    pub employee_id: u64,
    pub date: NaiveDate,
    pub salesmanship: f64,
    pub product_knowledge: f64,
    pub team_player: f64,
    pub innovator: f64,
    pub satisfaction: f64,
}

impl SkillReview {
    pub fn ratings(&self) -> [f64; 5] {
        [
            self.salesmanship,
            self.product_knowledge,
            self.team_player,
            self.innovator,
            self.satisfaction,
        ]
    }
}

/// Why an employee left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationReason {
    pub employee_id: u64,
    pub terminated_on: NaiveDate,
    /// e.g. `Another Job`, `Moved`, `Terminated`.
    pub reason: String,
}

/// A customer order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: u64,
    pub customer_id: u64,
    pub employee_id: u64,
    pub location_id: LocationId,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

/// A purchased item within an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub line_item_id: u64,
    pub order_id: u64,
    pub item_id: u32,
    pub quantity: u32,
    pub discount_id: Option<String>,
}

/// A returned line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemReturn {
    pub line_item_id: u64,
    /// Return reason code (`R1`, `R2`, `R3`).
    pub return_id: String,
}

/// Catalog item lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub item_id: u32,
    pub name: String,
}

/// Discount lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    pub discount_id: String,
    pub description: String,
}

/// Monthly stock snapshot for one item at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    /// First day of the month.
    pub month: NaiveDate,
    pub location_id: LocationId,
    pub item_id: u32,
    pub beginning_on_hand: i64,
    pub purchased_qty: i64,
    pub sold_qty: i64,
    pub adjustments_qty: i64,
}

impl InventoryRecord {
    pub fn ending_on_hand(&self) -> i64 {
        self.beginning_on_hand + self.purchased_qty - self.sold_qty + self.adjustments_qty
    }
}

/// A customer review of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub review_id: u64,
    pub order_id: u64,
    pub date: NaiveDate,
    pub rating: u8,
    pub platform: String,
}

/// Aggregate web traffic for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebStat {
    /// First day of the month.
    pub month: NaiveDate,
    pub sessions: u64,
    pub page_views: u64,
    pub avg_time_on_page_secs: f64,
    /// Percentage in `[0, 100]`.
    pub conversion_rate: f64,
    /// Percentage in `[0, 100]`.
    pub bounce_rate: f64,
    pub mobile_share: f64,
    pub desktop_share: f64,
    pub tablet_share: f64,
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}
