use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthRef {
    pub year: i32,
    pub month: u32,
}

impl MonthRef {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn previous(self) -> Self {
        self.first_day()
            .checked_sub_months(Months::new(1))
            .map(Self::containing)
            .unwrap_or(self)
    }

    pub fn next(self) -> Self {
        self.first_day()
            .checked_add_months(Months::new(1))
            .map(Self::containing)
            .unwrap_or(self)
    }

    pub fn label(self) -> String {
        self.first_day().format("%B %Y").to_string()
    }

    pub fn days(self) -> impl Iterator<Item = NaiveDate> {
        let first = self.first_day();
        first
            .iter_days()
            .take_while(move |day| day.month() == first.month())
    }
}

/// Calendar cells for a month, weeks starting on Sunday. Leading `None`
/// cells pad the first week up to the month's first weekday.
pub fn month_grid(month: MonthRef) -> Vec<Option<NaiveDate>> {
    let lead = month.first_day().weekday().num_days_from_sunday() as usize;
    let mut cells: Vec<Option<NaiveDate>> = vec![None; lead];
    cells.extend(month.days().map(Some));
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_pads_to_first_weekday() {
        // 2024-01-01 was a Monday
        let grid = month_grid(MonthRef::new(2024, 1).unwrap());
        assert_eq!(grid.len(), 1 + 31);
        assert_eq!(grid[0], None);
        assert_eq!(grid[1], NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(grid.last().copied().flatten(), NaiveDate::from_ymd_opt(2024, 1, 31));
    }

    #[test]
    fn leap_february_has_29_days() {
        let month = MonthRef::new(2024, 2).unwrap();
        assert_eq!(month.days().count(), 29);
        assert_eq!(MonthRef::new(2023, 2).unwrap().days().count(), 28);
    }

    #[test]
    fn navigation_wraps_years() {
        let jan = MonthRef::new(2024, 1).unwrap();
        assert_eq!(jan.previous(), MonthRef { year: 2023, month: 12 });
        assert_eq!(MonthRef::new(2024, 12).unwrap().next(), MonthRef { year: 2025, month: 1 });
        assert_eq!(jan.label(), "January 2024");
        assert!(MonthRef::new(2024, 13).is_none());
    }
}
