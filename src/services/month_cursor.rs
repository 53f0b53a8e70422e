//! Calendar arithmetic at month granularity.
//!
//! Months are compared as `(year, month)` tuples, never by subtracting
//! dates, so month lengths and DST never shift a boundary.

use chrono::{Datelike, NaiveDate};

/// First day of `date`'s month.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

/// First day of the month after `date`'s month. Saturates at the last
/// representable month.
pub fn next_month(date: NaiveDate) -> NaiveDate {
    add_months(date, 1)
}

/// True if `a`'s (year, month) is at or before `b`'s.
pub fn month_less_or_equal(a: NaiveDate, b: NaiveDate) -> bool {
    month_key(a) <= month_key(b)
}

/// True if `a`'s (year, month) is strictly before `b`'s.
pub fn month_less_than(a: NaiveDate, b: NaiveDate) -> bool {
    month_key(a) < month_key(b)
}

/// Month start shifted by `delta` calendar months (negative goes back).
pub fn add_months(date: NaiveDate, delta: i32) -> NaiveDate {
    let index = date.year() * 12 + date.month0() as i32 + delta;
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_else(|| month_start(date))
}

/// The earlier of two dates at month granularity, normalized to month start.
pub fn earlier_month(a: NaiveDate, b: NaiveDate) -> NaiveDate {
    if month_less_or_equal(a, b) {
        month_start(a)
    } else {
        month_start(b)
    }
}

/// The later of two dates at month granularity, normalized to month start.
pub fn later_month(a: NaiveDate, b: NaiveDate) -> NaiveDate {
    if month_less_or_equal(a, b) {
        month_start(b)
    } else {
        month_start(a)
    }
}

/// Every month start from `start`'s month through `end`'s month inclusive.
/// Empty when `start` is after `end`.
pub fn months_inclusive(start: NaiveDate, end: NaiveDate) -> MonthRange {
    MonthRange {
        cursor: Some(month_start(start)),
        end: month_start(end),
    }
}

#[derive(Debug, Clone)]
pub struct MonthRange {
    cursor: Option<NaiveDate>,
    end: NaiveDate,
}

impl Iterator for MonthRange {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.cursor?;
        if !month_less_or_equal(current, self.end) {
            self.cursor = None;
            return None;
        }
        let advanced = next_month(current);
        self.cursor = (advanced > current).then_some(advanced);
        Some(current)
    }
}

fn month_key(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{
        add_months, earlier_month, later_month, month_less_or_equal, month_less_than, month_start,
        months_inclusive, next_month,
    };

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn normalizes_to_first_of_month() {
        assert_eq!(month_start(date(2026, 2, 28)), date(2026, 2, 1));
        assert_eq!(month_start(date(2026, 1, 1)), date(2026, 1, 1));
    }

    #[test]
    fn next_month_rolls_year_boundary() {
        assert_eq!(next_month(date(2025, 12, 31)), date(2026, 1, 1));
        assert_eq!(next_month(date(2026, 1, 31)), date(2026, 2, 1));
    }

    #[test]
    fn compares_year_before_month() {
        assert!(month_less_or_equal(date(2025, 12, 31), date(2026, 1, 1)));
        assert!(!month_less_or_equal(date(2026, 1, 1), date(2025, 12, 1)));
        assert!(month_less_or_equal(date(2026, 3, 31), date(2026, 3, 1)));
        assert!(!month_less_than(date(2026, 3, 31), date(2026, 3, 1)));
        assert!(month_less_than(date(2026, 2, 28), date(2026, 3, 1)));
    }

    #[test]
    fn adds_and_subtracts_months() {
        assert_eq!(add_months(date(2026, 10, 16), 12), date(2027, 10, 1));
        assert_eq!(add_months(date(2026, 10, 16), -12), date(2025, 10, 1));
        assert_eq!(add_months(date(2026, 1, 31), -1), date(2025, 12, 1));
        assert_eq!(add_months(date(2026, 3, 1), -27), date(2023, 12, 1));
    }

    #[test]
    fn picks_earlier_and_later_months() {
        assert_eq!(earlier_month(date(2026, 5, 20), date(2026, 4, 2)), date(2026, 4, 1));
        assert_eq!(later_month(date(2026, 5, 20), date(2026, 4, 2)), date(2026, 5, 1));
    }

    #[test]
    fn iterates_months_inclusively() {
        let months = months_inclusive(date(2025, 11, 15), date(2026, 2, 3)).collect::<Vec<_>>();
        assert_eq!(
            months,
            vec![
                date(2025, 11, 1),
                date(2025, 12, 1),
                date(2026, 1, 1),
                date(2026, 2, 1)
            ]
        );
        assert_eq!(months_inclusive(date(2026, 3, 1), date(2026, 2, 1)).count(), 0);
        assert_eq!(months_inclusive(date(2026, 3, 9), date(2026, 3, 1)).count(), 1);
    }
}
