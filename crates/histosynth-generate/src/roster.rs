use std::collections::BTreeMap;

use chrono::NaiveDate;

use histosynth_core::{Employee, EmploymentPeriod, LocationId};

/// One employee's tenure: active on `start <= date < end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenure {
    pub employee_id: u64,
    pub location_id: LocationId,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

impl Tenure {
    pub fn is_active(&self, date: NaiveDate) -> bool {
        self.start <= date && self.end.is_none_or(|end| date < end)
    }

    /// Active for every day of `[from, to]`.
    pub fn covers(&self, from: NaiveDate, to: NaiveDate) -> bool {
        self.start <= from && self.end.is_none_or(|end| end > to)
    }
}

/// Employment lookup over historical and generated employees.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployeeRoster {
    tenures: BTreeMap<u64, Tenure>,
}

impl EmployeeRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from employee rows; a termination recorded in `periods` ends the
    /// tenure when it is earlier than the row's own termination date.
    pub fn from_records<'a>(
        employees: impl IntoIterator<Item = &'a Employee>,
        periods: impl IntoIterator<Item = &'a EmploymentPeriod>,
    ) -> Self {
        let mut roster = Self::new();
        for employee in employees {
            roster.insert(Tenure {
                employee_id: employee.id,
                location_id: employee.location_id.clone(),
                start: employee.start_date,
                end: employee.termination_date,
            });
        }
        for period in periods {
            if let Some(date) = period.terminated_on {
                roster.terminate(period.employee_id, date);
            }
        }
        roster
    }

    /// Add a tenure; an existing entry for the same employee is kept.
    pub fn insert(&mut self, tenure: Tenure) {
        self.tenures.entry(tenure.employee_id).or_insert(tenure);
    }

    /// End a tenure on `date` unless it already ends earlier.
    pub fn terminate(&mut self, employee_id: u64, date: NaiveDate) {
        if let Some(tenure) = self.tenures.get_mut(&employee_id) {
            tenure.end = Some(tenure.end.map_or(date, |end| end.min(date)));
        }
    }

    pub fn tenure(&self, employee_id: u64) -> Option<&Tenure> {
        self.tenures.get(&employee_id)
    }

    pub fn tenures(&self) -> impl Iterator<Item = &Tenure> {
        self.tenures.values()
    }

    pub fn is_active(&self, employee_id: u64, date: NaiveDate) -> bool {
        self.tenure(employee_id)
            .is_some_and(|tenure| tenure.is_active(date))
    }

    /// Employees active at `location` on `date`, ordered by id.
    pub fn active_at(&self, location: &LocationId, date: NaiveDate) -> Vec<u64> {
        self.tenures
            .values()
            .filter(|tenure| &tenure.location_id == location && tenure.is_active(date))
            .map(|tenure| tenure.employee_id)
            .collect()
    }

    /// Whether someone other than `excluding` works at `location` for all of `[from, to]`.
    pub fn is_covered(
        &self,
        location: &LocationId,
        from: NaiveDate,
        to: NaiveDate,
        excluding: Option<u64>,
    ) -> bool {
        self.tenures.values().any(|tenure| {
            Some(tenure.employee_id) != excluding
                && &tenure.location_id == location
                && tenure.covers(from, to)
        })
    }

    pub fn len(&self) -> usize {
        self.tenures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, month, day).unwrap()
    }

    fn tenure(id: u64, location: &str, start: NaiveDate, end: Option<NaiveDate>) -> Tenure {
        Tenure {
            employee_id: id,
            location_id: LocationId::from(location),
            start,
            end,
        }
    }

    #[test]
    fn termination_date_is_first_inactive_day() {
        let mut roster = EmployeeRoster::new();
        roster.insert(tenure(1, "L01", day(1, 1), Some(day(3, 1))));
        assert!(roster.is_active(1, day(2, 28)));
        assert!(!roster.is_active(1, day(3, 1)));
        assert!(!roster.is_active(2, day(2, 1)));
    }

    #[test]
    fn earliest_termination_wins() {
        let mut roster = EmployeeRoster::new();
        roster.insert(tenure(1, "L01", day(1, 1), Some(day(6, 1))));
        roster.terminate(1, day(9, 1));
        roster.terminate(1, day(4, 1));
        assert_eq!(roster.tenure(1).and_then(|t| t.end), Some(day(4, 1)));
    }

    #[test]
    fn active_at_filters_by_location() {
        let mut roster = EmployeeRoster::new();
        roster.insert(tenure(2, "L01", day(1, 1), None));
        roster.insert(tenure(1, "L01", day(1, 1), None));
        roster.insert(tenure(3, "L02", day(1, 1), None));
        assert_eq!(roster.active_at(&LocationId::from("L01"), day(5, 5)), vec![1, 2]);
        assert!(roster.is_covered(&LocationId::from("L02"), day(1, 1), day(12, 31), None));
        assert!(!roster.is_covered(&LocationId::from("L02"), day(1, 1), day(12, 31), Some(3)));
    }
}
