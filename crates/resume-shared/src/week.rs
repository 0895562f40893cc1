//! Monday-anchored week arithmetic.
//!
//! Every weekly aggregate is keyed by the Monday of the week its reports
//! fall in. Weeks run Monday through Sunday inclusive.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::DATE_FORMAT;

/// The week containing a date falls outside the calendar chrono can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("date {0} has no representable week")]
pub struct DateOutOfRange(pub NaiveDate);

/// Parse a strict `YYYY-MM-DD` date: four-digit year, two-digit month and day.
///
/// chrono's `%Y` alone also accepts signed and longer years.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let bytes = raw.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> Result<NaiveDate, DateOutOfRange> {
    let offset = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(offset))
        .ok_or(DateOutOfRange(date))
}

/// Sunday of the week containing `date`.
pub fn week_end(date: NaiveDate) -> Result<NaiveDate, DateOutOfRange> {
    week_start(date)?
        .checked_add_days(Days::new(6))
        .ok_or(DateOutOfRange(date))
}

/// Inclusive `[start, end]` span of one Monday-anchored week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeekRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekRange {
    pub fn containing(date: NaiveDate) -> Result<Self, DateOutOfRange> {
        Ok(Self {
            start: week_start(date)?,
            end: week_end(date)?,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Weekday};

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn start(s: &str) -> NaiveDate {
        week_start(d(s)).unwrap()
    }

    fn end(s: &str) -> NaiveDate {
        week_end(d(s)).unwrap()
    }

    #[test]
    fn wednesday_maps_to_previous_monday() {
        assert_eq!(start("2024-03-06"), d("2024-03-04"));
        assert_eq!(end("2024-03-06"), d("2024-03-10"));
    }

    #[test]
    fn monday_and_sunday_are_their_own_bounds() {
        assert_eq!(start("2024-03-04"), d("2024-03-04"));
        assert_eq!(start("2024-03-10"), d("2024-03-04"));
        assert_eq!(end("2024-03-10"), d("2024-03-10"));
    }

    #[test]
    fn week_crosses_year_boundary() {
        // 2025-01-01 is a Wednesday.
        assert_eq!(start("2025-01-01"), d("2024-12-30"));
        assert_eq!(end("2025-01-01"), d("2025-01-05"));
    }

    #[test]
    fn start_is_monday_and_idempotent_over_a_year() {
        let mut date = d("2024-01-01");
        while date < d("2025-01-01") {
            let monday = week_start(date).unwrap();
            assert_eq!(monday.weekday(), Weekday::Mon);
            assert_eq!(week_start(monday).unwrap(), monday);
            assert_eq!(week_end(date).unwrap() - monday, Duration::days(6));
            assert!(WeekRange::containing(date).unwrap().contains(date));
            date += Duration::days(1);
        }
    }

    #[test]
    fn range_excludes_neighbouring_weeks() {
        let week = WeekRange::containing(d("2024-03-06")).unwrap();
        assert!(!week.contains(d("2024-03-03")));
        assert!(!week.contains(d("2024-03-11")));
    }

    #[test]
    fn last_representable_week_is_an_error_not_a_panic() {
        assert_eq!(week_end(NaiveDate::MAX), Err(DateOutOfRange(NaiveDate::MAX)));
        assert!(WeekRange::containing(NaiveDate::MAX).is_err());
    }

    #[test]
    fn parse_date_requires_four_digit_years() {
        assert_eq!(parse_date("2024-03-06"), NaiveDate::from_ymd_opt(2024, 3, 6));
        for raw in [
            "+262142-12-31",
            "+26214-1-1",
            "2024-3-6",
            "2024/03/06",
            "06-03-2024",
            "2024-13-01",
            "2024-02-30",
            " 2024-03-06",
            "",
        ] {
            assert_eq!(parse_date(raw), None, "{raw:?}");
        }
    }
}
