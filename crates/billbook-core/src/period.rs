//! # Period Resolution
//!
//! Converts a display-calendar `(month, year)` pair into the closed
//! interval of storage-calendar instants that covers the whole month.
//!
//! The display calendar may run ahead of the storage calendar by a fixed
//! number of years. Thai users type Buddhist-era years (2567 = 2024), so
//! the default offset is [`BUDDHIST_ERA_OFFSET`]. Resolution is tolerant:
//! a year that is already plausible as a Gregorian year is left as-is.
//!
//! ## Interval Shape
//!
//! `start` is midnight on day one. `end` is the last microsecond of the
//! last day, which is the finest precision Postgres timestamps keep. A
//! record dated anywhere inside the month satisfies
//! `start <= ts && ts <= end`; nothing from a neighbouring month does.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Years between the Buddhist era and the Gregorian calendar.
pub const BUDDHIST_ERA_OFFSET: i32 = 543;

/// Smallest storage year a display year is expected to map onto.
///
/// A display year `y` is converted only when `y - offset` is at least this
/// value; smaller years are taken to be storage years already.
pub const MIN_STORAGE_YEAR: i32 = 1900;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Fixed year offset between the caller's calendar and the storage calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YearCalendar {
    offset: i32,
}

impl YearCalendar {
    /// Display years are storage years.
    pub const GREGORIAN: Self = Self { offset: 0 };

    /// Display years are Buddhist-era years.
    pub const BUDDHIST: Self = Self {
        offset: BUDDHIST_ERA_OFFSET,
    };

    /// Calendar with an arbitrary non-negative offset.
    pub fn with_offset(offset: i32) -> Self {
        Self {
            offset: offset.max(0),
        }
    }

    /// The configured offset in years.
    pub fn offset(&self) -> i32 {
        self.offset
    }

    /// Map a display year onto the storage calendar.
    pub fn to_storage_year(&self, display_year: i32) -> i32 {
        if self.offset > 0 && display_year - self.offset >= MIN_STORAGE_YEAR {
            display_year - self.offset
        } else {
            display_year
        }
    }
}

impl Default for YearCalendar {
    fn default() -> Self {
        Self::BUDDHIST
    }
}

/// One calendar month expressed in both calendars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportPeriod {
    month: u32,
    display_year: i32,
    storage_year: i32,
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl ExportPeriod {
    /// Resolve `(month, display_year)` into a storage-calendar interval.
    ///
    /// Callers validate `month` first (see [`ExportRequest`](crate::ExportRequest));
    /// the error path only exists so an out-of-range value cannot panic.
    pub fn resolve(month: u32, display_year: i32, calendar: YearCalendar) -> Result<Self, CoreError> {
        let storage_year = calendar.to_storage_year(display_year);

        let first = NaiveDate::from_ymd_opt(storage_year, month, 1).ok_or_else(|| {
            CoreError::validation("month", format!("{storage_year}-{month} is not a calendar month"))
        })?;
        let (next_year, next_month) = if month == 12 {
            (storage_year + 1, 1)
        } else {
            (storage_year, month + 1)
        };
        let next_first = NaiveDate::from_ymd_opt(next_year, next_month, 1).ok_or_else(|| {
            CoreError::validation("year", format!("{next_year} is outside the supported range"))
        })?;

        let start = first.and_time(NaiveTime::MIN);
        let end = next_first.and_time(NaiveTime::MIN) - Duration::microseconds(1);

        Ok(Self {
            month,
            display_year,
            storage_year,
            start,
            end,
        })
    }

    /// Month number, 1–12.
    pub fn month(&self) -> u32 {
        self.month
    }

    /// Year as the caller supplied it.
    pub fn display_year(&self) -> i32 {
        self.display_year
    }

    /// Year in the storage calendar.
    pub fn storage_year(&self) -> i32 {
        self.storage_year
    }

    /// First instant of the month (inclusive).
    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// Last instant of the month (inclusive).
    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    /// First day of the month.
    pub fn start_date(&self) -> NaiveDate {
        self.start.date()
    }

    /// Last day of the month.
    pub fn end_date(&self) -> NaiveDate {
        self.end.date()
    }

    /// Number of days in the month.
    pub fn days(&self) -> u32 {
        self.end.day()
    }

    /// Whether `date` falls inside the month.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date() && date <= self.end_date()
    }

    /// Whether `ts` falls inside the closed interval.
    pub fn contains_instant(&self, ts: NaiveDateTime) -> bool {
        ts >= self.start && ts <= self.end
    }

    /// Machine-friendly label in the display calendar, e.g. `2567-03`.
    pub fn label(&self) -> String {
        format!("{}-{:02}", self.display_year, self.month)
    }

    /// Human-readable label, e.g. `March 2567`.
    pub fn display_label(&self) -> String {
        let name = MONTH_NAMES
            .get(self.month.saturating_sub(1) as usize)
            .copied()
            .unwrap_or("Month");
        format!("{name} {}", self.display_year)
    }

    /// Archive stem shared by the root folder and the download name:
    /// `{company_code}_{year}-{MM}`.
    pub fn archive_stem(&self, company_code: &str) -> String {
        format!("{company_code}_{}", self.label())
    }
}

impl std::fmt::Display for ExportPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_buddhist_year_is_converted() {
        let p = ExportPeriod::resolve(3, 2567, YearCalendar::BUDDHIST).unwrap();
        assert_eq!(p.storage_year(), 2024);
        assert_eq!(p.display_year(), 2567);
        assert_eq!(p.start_date(), date(2024, 3, 1));
        assert_eq!(p.end_date(), date(2024, 3, 31));
    }

    #[test]
    fn test_gregorian_year_passes_through_buddhist_calendar() {
        let p = ExportPeriod::resolve(3, 2024, YearCalendar::BUDDHIST).unwrap();
        assert_eq!(p.storage_year(), 2024);
        assert_eq!(p.label(), "2024-03");
    }

    #[test]
    fn test_december_rolls_over() {
        let p = ExportPeriod::resolve(12, 2566, YearCalendar::BUDDHIST).unwrap();
        assert_eq!(p.start_date(), date(2023, 12, 1));
        assert_eq!(p.end_date(), date(2023, 12, 31));
        assert!(!p.contains(date(2024, 1, 1)));
        assert_eq!(
            p.end(),
            date(2023, 12, 31).and_hms_micro_opt(23, 59, 59, 999_999).unwrap()
        );
    }

    #[test]
    fn test_leap_february() {
        let p = ExportPeriod::resolve(2, 2024, YearCalendar::GREGORIAN).unwrap();
        assert_eq!(p.days(), 29);
        let p = ExportPeriod::resolve(2, 2023, YearCalendar::GREGORIAN).unwrap();
        assert_eq!(p.days(), 28);
    }

    #[test]
    fn test_end_is_inclusive_last_instant() {
        let p = ExportPeriod::resolve(4, 2024, YearCalendar::GREGORIAN).unwrap();
        let last = date(2024, 4, 30).and_hms_micro_opt(23, 59, 59, 999_999).unwrap();
        let next = date(2024, 5, 1).and_hms_opt(0, 0, 0).unwrap();
        assert!(p.contains_instant(last));
        assert!(!p.contains_instant(next));
    }

    #[test]
    fn test_invalid_month_is_an_error_not_a_panic() {
        assert!(ExportPeriod::resolve(13, 2024, YearCalendar::GREGORIAN).is_err());
        assert!(ExportPeriod::resolve(0, 2024, YearCalendar::GREGORIAN).is_err());
    }

    #[test]
    fn test_labels() {
        let p = ExportPeriod::resolve(3, 2567, YearCalendar::BUDDHIST).unwrap();
        assert_eq!(p.label(), "2567-03");
        assert_eq!(p.display_label(), "March 2567");
        assert_eq!(p.archive_stem("ACME"), "ACME_2567-03");
        assert_eq!(p.to_string(), "2567-03");
    }

    #[test]
    fn test_negative_offset_is_clamped() {
        assert_eq!(YearCalendar::with_offset(-5).offset(), 0);
    }

    proptest! {
        #[test]
        fn interval_covers_exactly_the_month(month in 1u32..=12, year in 1950i32..2200, buddhist in any::<bool>()) {
            let (calendar, display) = if buddhist {
                (YearCalendar::BUDDHIST, year + BUDDHIST_ERA_OFFSET)
            } else {
                (YearCalendar::GREGORIAN, year)
            };
            let p = ExportPeriod::resolve(month, display, calendar).unwrap();
            prop_assert_eq!(p.storage_year(), year);

            let first = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
            let mut day = first;
            while day.month() == month {
                prop_assert!(p.contains(day));
                prop_assert!(p.contains_instant(day.and_hms_opt(12, 0, 0).unwrap()));
                day = day.succ_opt().unwrap();
            }
            // `day` is now the first day of the following month.
            prop_assert!(!p.contains(day));
            prop_assert!(!p.contains_instant(day.and_time(NaiveTime::MIN)));
            let before = first.pred_opt().unwrap();
            prop_assert!(!p.contains(before));
            prop_assert!(!p.contains_instant(before.and_hms_opt(23, 59, 59).unwrap()));
        }
    }
}
