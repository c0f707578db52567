//! Small deterministic history used by tests, demos and documentation.
//!
//! Three locations (`L01`, `L02` opened 2019, `L03` opened 2020), three years
//! of orders (150, 250 and 480), a twelve-item catalog and three discounts.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use histosynth_core::{
    Customer, Discount, Employee, EmploymentPeriod, History, InventoryRecord, Item, LineItem,
    LineItemReturn, LocationId, Order, Review, SkillReview, TerminationReason, WebStat,
};

use crate::random::uniform_date;

const FIXTURE_SEED: u64 = 2021;

const ITEM_NAMES: [&str; 12] = [
    "Road Bike",
    "Mountain Bike",
    "Hybrid Bike",
    "Kids Bike",
    "Helmet",
    "Bike Lock",
    "Water Bottle",
    "Repair Kit",
    "Bike Lights",
    "Cycling Gloves",
    "Saddle Bag",
    "Tune-Up Service",
];

const FIRST_NAMES: [&str; 10] = [
    "Avery", "Blake", "Casey", "Dana", "Elliot", "Frankie", "Gale", "Harper", "Indy", "Jordan",
];

const LAST_NAMES: [&str; 8] = [
    "Nguyen", "Okafor", "Patel", "Quinn", "Rossi", "Silva", "Tanaka", "Weber",
];

/// Build the fixture history. Identical on every call.
pub fn sample_history() -> History {
    let mut rng = ChaCha8Rng::seed_from_u64(FIXTURE_SEED);

    let items = ITEM_NAMES
        .iter()
        .enumerate()
        .map(|(idx, name)| Item {
            item_id: idx as u32 + 1,
            name: (*name).to_string(),
        })
        .collect();
    let discounts = vec![
        discount("D1", "Spring promotion"),
        discount("D2", "Loyalty 10%"),
        discount("D3", "Clearance"),
    ];

    let employees = employees();
    let employment_periods = employment_periods(&employees);
    let customers = customers(&mut rng);
    let orders = orders(&mut rng, &customers, &employees);
    let line_items = line_items(&mut rng, &orders);
    let inventory = inventory(&mut rng);
    let reviews = reviews(&mut rng, &orders);
    let web_stats = web_stats(&mut rng, &orders);
    let skill_reviews = skill_reviews(&mut rng, &employees);
    let termination_reasons = termination_reasons(&employees);
    let line_item_returns = line_item_returns(&mut rng, &line_items);

    History {
        customers,
        employees,
        employment_periods,
        orders,
        line_items,
        inventory,
        discounts,
        items,
        reviews,
        web_stats,
        skill_reviews,
        termination_reasons,
        line_item_returns,
    }
}

fn discount(id: &str, description: &str) -> Discount {
    Discount {
        discount_id: id.to_string(),
        description: description.to_string(),
    }
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn employees() -> Vec<Employee> {
    let rows: [(u64, &str, NaiveDate, Option<NaiveDate>); 8] = [
        (1, "L01", date(2019, 1, 1), None),
        (2, "L01", date(2019, 1, 1), None),
        (3, "L01", date(2019, 1, 1), Some(date(2020, 6, 15))),
        (4, "L02", date(2019, 1, 1), None),
        (5, "L02", date(2019, 1, 1), None),
        (6, "L03", date(2020, 1, 1), None),
        (7, "L03", date(2020, 1, 1), None),
        (8, "L01", date(2021, 3, 1), None),
    ];
    rows.into_iter()
        .map(|(id, location, start_date, termination_date)| Employee {
            id,
            first_name: FIRST_NAMES[id as usize % FIRST_NAMES.len()].to_string(),
            last_name: LAST_NAMES[id as usize % LAST_NAMES.len()].to_string(),
            gender: if id % 2 == 0 { "F" } else { "M" }.to_string(),
            dob: date(1985 + id as i32, 3, 10),
            location_id: LocationId::from(location),
            start_date,
            termination_date,
            skills_training: id % 2 == 0,
            salesmanship_training: id % 3 == 0,
            product_training: true,
        })
        .collect()
}

fn employment_periods(employees: &[Employee]) -> Vec<EmploymentPeriod> {
    let mut periods = Vec::new();
    for employee in employees {
        for year in 2019..=2021 {
            if employee.start_date.year() > year {
                continue;
            }
            if employee
                .termination_date
                .is_some_and(|end| end.year() < year)
            {
                break;
            }
            let terminated_on = employee.termination_date.filter(|end| end.year() == year);
            periods.push(EmploymentPeriod {
                employee_id: employee.id,
                year,
                active: terminated_on.is_none(),
                terminated_on,
            });
        }
    }
    periods
}

fn skill_reviews(rng: &mut ChaCha8Rng, employees: &[Employee]) -> Vec<SkillReview> {
    let mut rows = Vec::new();
    for year in 2019..=2021 {
        for (month, day) in [(1, 12), (7, 5)] {
            let review_date = date(year, month, day);
            for employee in employees {
                let active = employee.start_date < date(year, month, 1)
                    && employee.termination_date.is_none_or(|end| review_date < end);
                if !active {
                    continue;
                }
                let mut rating = |mean: f64| {
                    let value: f64 = mean + rng.random_range(-1.0..=1.0);
                    (value.clamp(2.0, 5.0) * 10.0).round() / 10.0
                };
                rows.push(SkillReview {
                    employee_id: employee.id,
                    date: review_date,
                    salesmanship: rating(3.4),
                    product_knowledge: rating(3.6),
                    team_player: rating(3.7),
                    innovator: rating(3.5),
                    satisfaction: rating(3.3),
                });
            }
        }
    }
    rows
}

fn termination_reasons(employees: &[Employee]) -> Vec<TerminationReason> {
    employees
        .iter()
        .filter_map(|employee| {
            employee.termination_date.map(|terminated_on| TerminationReason {
                employee_id: employee.id,
                terminated_on,
                reason: "Moved".to_string(),
            })
        })
        .collect()
}

fn line_item_returns(rng: &mut ChaCha8Rng, line_items: &[LineItem]) -> Vec<LineItemReturn> {
    let codes = ["R1", "R2", "R3"];
    let mut rows = Vec::new();
    for line in line_items {
        if rng.random_bool(0.05) {
            rows.push(LineItemReturn {
                line_item_id: line.line_item_id,
                return_id: codes[rng.random_range(0..codes.len())].to_string(),
            });
        }
    }
    rows
}

fn customers(rng: &mut ChaCha8Rng) -> Vec<Customer> {
    let sources = ["Newspaper", "Social", "Referral", "WalkIn", "Online", "Advertisement"];
    let source_weights = WeightedIndex::new([10, 25, 15, 30, 15, 5]).ok();
    let genders = ["M", "F", "X"];
    let gender_weights = WeightedIndex::new([48, 50, 2]).ok();

    (1..=300_u64)
        .map(|id| {
            let location = if id <= 150 {
                if id % 2 == 1 { "L01" } else { "L02" }
            } else {
                ["L01", "L02", "L03"][(id % 3) as usize]
            };
            let loyalty_member = rng.random_bool(0.35);
            let email_list = rng.random_bool(if loyalty_member { 0.7 } else { 0.3 });
            let source = source_weights
                .as_ref()
                .map(|dist| sources[dist.sample(rng)])
                .unwrap_or("WalkIn");
            let gender = gender_weights
                .as_ref()
                .map(|dist| genders[dist.sample(rng)])
                .unwrap_or("F");
            Customer {
                id,
                first_name: FIRST_NAMES[(id as usize * 7) % FIRST_NAMES.len()].to_string(),
                last_name: LAST_NAMES[(id as usize * 3) % LAST_NAMES.len()].to_string(),
                gender: gender.to_string(),
                dob: uniform_date(rng, date(1955, 1, 1), date(2001, 1, 1)),
                loyalty_member,
                email_list,
                source: source.to_string(),
                location_id: LocationId::from(location),
            }
        })
        .collect()
}

fn orders(rng: &mut ChaCha8Rng, customers: &[Customer], employees: &[Employee]) -> Vec<Order> {
    let mut drafts: Vec<(NaiveDate, NaiveTime, u64, u64, LocationId)> = Vec::new();
    for (year, count, customer_cap) in [(2019, 150, 150_u64), (2020, 250, 220), (2021, 480, 300)] {
        for _ in 0..count {
            let customer_id = rng.random_range(1..=customer_cap);
            let location = customers[customer_id as usize - 1].location_id.clone();
            let day = uniform_date(rng, date(year, 1, 1), date(year, 12, 31));
            let seconds = rng.random_range(9 * 3600..19 * 3600);
            let time =
                NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0).unwrap_or(NaiveTime::MIN);
            let employee_id = employees
                .iter()
                .find(|employee| {
                    employee.location_id == location
                        && employee.start_date <= day
                        && employee.termination_date.is_none_or(|end| day < end)
                })
                .map(|employee| employee.id)
                .unwrap_or(1);
            drafts.push((day, time, customer_id, employee_id, location));
        }
    }
    drafts.sort_by(|left, right| (left.0, left.1, left.2).cmp(&(right.0, right.1, right.2)));

    drafts
        .into_iter()
        .enumerate()
        .map(|(idx, (date, time, customer_id, employee_id, location_id))| Order {
            order_id: idx as u64 + 1,
            customer_id,
            employee_id,
            location_id,
            date,
            time,
        })
        .collect()
}

fn line_items(rng: &mut ChaCha8Rng, orders: &[Order]) -> Vec<LineItem> {
    let item_weights: Vec<u32> = (1..=12).map(|id| 13 - id).collect();
    let discount_ids = ["D1", "D2", "D3"];
    let discount_weights = WeightedIndex::new([5, 3, 2]).ok();

    let mut rows = Vec::new();
    for order in orders {
        let count = rng.random_range(1..=3);
        let picked = rand::seq::index::sample_weighted(
            rng,
            item_weights.len(),
            |idx| item_weights[idx] as f64,
            count,
        )
        .map(|indices| indices.into_vec())
        .unwrap_or_else(|_| vec![0]);
        let discount = if rng.random_bool(0.25) {
            discount_weights
                .as_ref()
                .map(|dist| discount_ids[dist.sample(rng)].to_string())
        } else {
            None
        };
        for idx in picked {
            rows.push(LineItem {
                line_item_id: rows.len() as u64 + 1,
                order_id: order.order_id,
                item_id: idx as u32 + 1,
                quantity: if rng.random_bool(0.05) { 2 } else { 1 },
                discount_id: discount.clone(),
            });
        }
    }
    rows
}

fn inventory(rng: &mut ChaCha8Rng) -> Vec<InventoryRecord> {
    let mut rows = Vec::new();
    for location in ["L01", "L02", "L03"] {
        for item_id in 1..=12_u32 {
            let mut beginning = 40_i64;
            for month in 1..=12 {
                let purchased_qty = if beginning < 15 { 60 - beginning } else { 0 };
                let sold_qty = rng.random_range(0..=6_i64).min(beginning + purchased_qty);
                let record = InventoryRecord {
                    month: date(2021, month, 1),
                    location_id: LocationId::from(location),
                    item_id,
                    beginning_on_hand: beginning,
                    purchased_qty,
                    sold_qty,
                    adjustments_qty: 0,
                };
                beginning = record.ending_on_hand();
                rows.push(record);
            }
        }
    }
    rows
}

fn reviews(rng: &mut ChaCha8Rng, orders: &[Order]) -> Vec<Review> {
    let ratings = WeightedIndex::new([10, 15, 25, 30, 20]).ok();
    let platforms = ["Facebook", "Yelp", "Google"];
    let platform_weights = WeightedIndex::new([35, 34, 31]).ok();

    let mut rows = Vec::new();
    for (year, target) in [(2019, 30), (2020, 60), (2021, 100)] {
        let pool: Vec<&Order> = orders.iter().filter(|o| o.date.year() == year).collect();
        let mut picked = rand::seq::index::sample(rng, pool.len(), target.min(pool.len())).into_vec();
        picked.sort_unstable();
        for idx in picked {
            let order = pool[idx];
            let rating = ratings
                .as_ref()
                .map(|dist| 6 + dist.sample(rng) as u8)
                .unwrap_or(9);
            let platform = platform_weights
                .as_ref()
                .map(|dist| platforms[dist.sample(rng)])
                .unwrap_or("Google");
            rows.push(Review {
                review_id: rows.len() as u64 + 1,
                order_id: order.order_id,
                date: order.date + Duration::days(rng.random_range(3..=21)),
                rating,
                platform: platform.to_string(),
            });
        }
    }
    rows
}

fn web_stats(rng: &mut ChaCha8Rng, orders: &[Order]) -> Vec<WebStat> {
    let mut rows = Vec::new();
    for year in [2020, 2021] {
        for month in 1..=12 {
            let monthly_orders = orders
                .iter()
                .filter(|o| o.date.year() == year && o.date.month() == month)
                .count() as u64;
            let sessions = monthly_orders * 10 + rng.random_range(0..50);
            let mobile_share = if year == 2020 { 0.55 } else { 0.58 };
            rows.push(WebStat {
                month: date(year, month, 1),
                sessions,
                page_views: (sessions as f64 * rng.random_range(2.2..2.6)).round() as u64,
                avg_time_on_page_secs: rng.random_range(45.0..60.0),
                conversion_rate: rng.random_range(48.0..54.0),
                bounce_rate: rng.random_range(38.0..44.0),
                mobile_share,
                desktop_share: 1.0 - mobile_share - 0.1,
                tablet_share: 0.1,
            });
        }
    }
    rows
}
