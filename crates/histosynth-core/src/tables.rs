use serde::{Deserialize, Serialize};

use crate::entities::{
    Customer, Discount, Employee, EmploymentPeriod, InventoryRecord, Item, LineItem,
    LineItemReturn, Location, Order, Review, SkillReview, TerminationReason, WebStat,
};

/// Historical tables loaded by an external collaborator. Immutable inputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    pub customers: Vec<Customer>,
    pub employees: Vec<Employee>,
    pub employment_periods: Vec<EmploymentPeriod>,
    pub orders: Vec<Order>,
    pub line_items: Vec<LineItem>,
    pub inventory: Vec<InventoryRecord>,
    pub discounts: Vec<Discount>,
    pub items: Vec<Item>,
    pub reviews: Vec<Review>,
    pub web_stats: Vec<WebStat>,
    #[serde(default)]
    pub skill_reviews: Vec<SkillReview>,
    #[serde(default)]
    pub termination_reasons: Vec<TerminationReason>,
    #[serde(default)]
    pub line_item_returns: Vec<LineItemReturn>,
}

/// Newly generated rows, one table per entity, never merged with history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedTables {
    pub locations: Vec<Location>,
    pub customers: Vec<Customer>,
    pub employees: Vec<Employee>,
    pub employment_periods: Vec<EmploymentPeriod>,
    pub orders: Vec<Order>,
    pub line_items: Vec<LineItem>,
    pub inventory: Vec<InventoryRecord>,
    pub reviews: Vec<Review>,
    pub web_stats: Vec<WebStat>,
    pub skill_reviews: Vec<SkillReview>,
    pub termination_reasons: Vec<TerminationReason>,
    pub line_item_returns: Vec<LineItemReturn>,
}

/// Table names used for files, reports and issue paths.
pub mod names {
    pub const LOCATIONS: &str = "locations";
    pub const CUSTOMERS: &str = "customers";
    pub const EMPLOYEES: &str = "employees";
    pub const EMPLOYMENT_PERIODS: &str = "employment_periods";
    pub const ORDERS: &str = "orders";
    pub const LINE_ITEMS: &str = "line_items";
    pub const INVENTORY: &str = "inventory";
    pub const DISCOUNTS: &str = "discounts";
    pub const ITEMS: &str = "items";
    pub const REVIEWS: &str = "reviews";
    pub const WEB_STATS: &str = "web_stats";
    pub const SKILL_REVIEWS: &str = "skill_reviews";
    pub const TERMINATION_REASONS: &str = "termination_reasons";
    pub const LINE_ITEM_RETURNS: &str = "line_item_returns";
}
