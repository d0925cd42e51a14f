//! Enrollment date normalization
//!
//! Source files carry dates in whatever shape the exporting system produced:
//! ISO dates, US `M/D/YYYY`, JavaScript `Date.toString()` output, written month
//! names, and a handful of placeholder values meaning "no date".
//!
//! [`DateNormalizer::normalize`] maps a raw field to one of three outcomes:
//!
//! - `Ok(Some(date))`: a calendar-valid date inside the configured year range
//! - `Ok(None)`: a sentinel such as `0000-00-00`, i.e. explicitly no date
//! - `Err(DateParseError)`: nothing matched
//!
//! Calendar-aware forms are tried first, then the fixed numeric formats.
//! The first candidate that is calendar-valid and passes the year check wins.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use thiserror::Error;

/// Literal values that mean "no enrollment date"
pub const SENTINEL_DATES: [&str; 5] = ["", "0000-00-00", "00/00/0000", "99/99/9999", "9999-99-99"];

/// Lower bound of the default year check
pub const DEFAULT_MIN_YEAR: i32 = 1900;

/// Upper bound of the default year check
pub const DEFAULT_MAX_YEAR: i32 = 2100;

type Attempt = fn(&str) -> Option<NaiveDate>;

/// Tried first, in order
const CALENDAR_FORMS: &[Attempt] = &[
    rfc3339,
    rfc2822,
    js_date_string,
    naive_date_time,
    date_with_clock_time,
    written_month,
    slashed_year_first,
];

/// Tried after every calendar form has failed
const FIXED_FORMATS: &[Attempt] = &[month_day_year, year_month_day];

/// No candidate interpretation produced an acceptable date
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized date {input:?}")]
pub struct DateParseError {
    pub input: String,
}

/// What the parser does with a date that is neither a sentinel nor parseable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnparseableDate {
    /// Reject the whole record with `DateParseError`
    #[default]
    Reject,
    /// Accept the record with a null enrollment date
    StoreNull,
}

impl std::str::FromStr for UnparseableDate {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reject" => Ok(UnparseableDate::Reject),
            "null" | "store_null" => Ok(UnparseableDate::StoreNull),
            _ => Err(anyhow::anyhow!(
                "Invalid unparseable date policy: {} (expected 'reject' or 'null')",
                s
            )),
        }
    }
}

/// Best-effort date parser with an optional year bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateNormalizer {
    year_range: Option<RangeInclusive<i32>>,
}

impl DateNormalizer {
    /// Normalizer with the default 1900..=2100 year check
    pub fn new() -> Self {
        Self {
            year_range: Some(DEFAULT_MIN_YEAR..=DEFAULT_MAX_YEAR),
        }
    }

    /// Normalizer that only accepts years inside `range`
    pub fn with_year_range(range: RangeInclusive<i32>) -> Self {
        Self {
            year_range: Some(range),
        }
    }

    /// Normalizer that accepts any calendar-valid date
    pub fn without_year_check() -> Self {
        Self { year_range: None }
    }

    pub fn year_range(&self) -> Option<&RangeInclusive<i32>> {
        self.year_range.as_ref()
    }

    /// Normalize one raw date field. Never panics.
    pub fn normalize(&self, raw: &str) -> Result<Option<NaiveDate>, DateParseError> {
        let trimmed = raw.trim();
        if SENTINEL_DATES.contains(&trimmed) {
            return Ok(None);
        }

        CALENDAR_FORMS
            .iter()
            .chain(FIXED_FORMATS)
            .filter_map(|attempt| attempt(trimmed))
            .find(|date| self.accepts(date))
            .map(Some)
            .ok_or_else(|| DateParseError {
                input: trimmed.to_string(),
            })
    }

    fn accepts(&self, date: &NaiveDate) -> bool {
        use chrono::Datelike;

        self.year_range
            .as_ref()
            .map_or(true, |range| range.contains(&date.year()))
    }
}

impl Default for DateNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// `2023-01-01T10:00:00Z`, `2023-01-01T10:00:00-03:00`
fn rfc3339(s: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// `Fri, 25 May 2018 00:00:00 +0000`
fn rfc2822(s: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc2822(s).ok().map(|dt| dt.date_naive())
}

/// `Fri May 25 2018 00:00:00 GMT+0000 (Coordinated Universal Time)` and
/// the date-only `Fri May 25 2018`
fn js_date_string(s: &str) -> Option<NaiveDate> {
    let without_zone_name = match s.find(" (") {
        Some(idx) if s.ends_with(')') => &s[..idx],
        _ => s,
    };

    DateTime::parse_from_str(without_zone_name, "%a %b %d %Y %H:%M:%S GMT%z")
        .map(|dt| dt.date_naive())
        .or_else(|_| NaiveDate::parse_from_str(without_zone_name, "%a %b %d %Y"))
        .ok()
}

/// ISO date-time without an offset
fn naive_date_time(s: &str) -> Option<NaiveDate> {
    [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    .map(|dt| dt.date())
}

/// Written-month, slashed and US locale dates followed by a clock time:
/// `May 25, 2018 10:00:00`, `2018/05/25 10:00`, `5/25/2018, 10:00:00 AM`
fn date_with_clock_time(s: &str) -> Option<NaiveDate> {
    [
        "%B %d, %Y %H:%M:%S",
        "%B %d, %Y %H:%M",
        "%B %d %Y %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y/%m/%d %H:%M",
        "%m/%d/%Y, %I:%M:%S %p",
        "%m/%d/%Y %I:%M:%S %p",
        "%m/%d/%Y %H:%M:%S",
    ]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    .map(|dt| dt.date())
}

/// `May 25, 2018`, `May 25 2018`, `25 May 2018`; full or abbreviated month names
fn written_month(s: &str) -> Option<NaiveDate> {
    ["%B %d, %Y", "%B %d %Y", "%d %B %Y", "%d %B, %Y", "%a, %B %d, %Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// `2018/05/25`
fn slashed_year_first(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y/%m/%d").ok()
}

/// `05/25/2018` or `5/25/2018`
fn month_day_year(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%m/%d/%Y").ok()
}

/// `2018-05-25`
fn year_month_day(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_sentinels_mean_no_date() {
        let normalizer = DateNormalizer::new();
        for sentinel in SENTINEL_DATES {
            assert_eq!(normalizer.normalize(sentinel), Ok(None), "sentinel {:?}", sentinel);
        }
        assert_eq!(normalizer.normalize("   "), Ok(None));
        assert_eq!(normalizer.normalize(" 99/99/9999 "), Ok(None));
    }

    #[test]
    fn test_iso_date() {
        let normalizer = DateNormalizer::new();
        assert_eq!(normalizer.normalize("2023-01-01"), Ok(Some(ymd(2023, 1, 1))));
    }

    #[test]
    fn test_us_numeric_date() {
        let normalizer = DateNormalizer::new();
        assert_eq!(normalizer.normalize("04/15/2021"), Ok(Some(ymd(2021, 4, 15))));
        assert_eq!(normalizer.normalize("4/5/2021"), Ok(Some(ymd(2021, 4, 5))));
    }

    #[test]
    fn test_calendar_aware_forms() {
        let normalizer = DateNormalizer::new();
        let expected = Ok(Some(ymd(2018, 5, 25)));

        assert_eq!(normalizer.normalize("2018-05-25T13:45:00Z"), expected);
        assert_eq!(normalizer.normalize("2018-05-25T23:59:59-03:00"), expected);
        assert_eq!(normalizer.normalize("2018-05-25 08:00:00"), expected);
        assert_eq!(normalizer.normalize("Fri, 25 May 2018 00:00:00 +0000"), expected);
        assert_eq!(
            normalizer.normalize("Fri May 25 2018 00:00:00 GMT+0000 (Coordinated Universal Time)"),
            expected
        );
        assert_eq!(normalizer.normalize("Fri May 25 2018"), expected);
        assert_eq!(normalizer.normalize("May 25, 2018"), expected);
        assert_eq!(normalizer.normalize("may 25 2018"), expected);
        assert_eq!(normalizer.normalize("25 May 2018"), expected);
        assert_eq!(normalizer.normalize("Sep 25, 2018"), Ok(Some(ymd(2018, 9, 25))));
        assert_eq!(normalizer.normalize("2018/05/25"), expected);
    }

    #[test]
    fn test_dates_with_clock_time() {
        let normalizer = DateNormalizer::new();
        let expected = Ok(Some(ymd(2023, 1, 2)));

        assert_eq!(normalizer.normalize("January 2, 2023 10:00:00"), expected);
        assert_eq!(normalizer.normalize("Jan 2, 2023 22:15"), expected);
        assert_eq!(normalizer.normalize("2023/01/02 10:00:00"), expected);
        assert_eq!(normalizer.normalize("1/2/2023, 10:00:00 AM"), expected);
        assert_eq!(normalizer.normalize("01/02/2023 11:59:59 PM"), expected);
        assert!(normalizer.normalize("1/2/2023, 13:00:00 PM").is_err());
    }

    #[test]
    fn test_calendar_invalid_dates_fail() {
        let normalizer = DateNormalizer::new();
        assert!(normalizer.normalize("02/30/2020").is_err());
        assert!(normalizer.normalize("2021-02-29").is_err());
        assert!(normalizer.normalize("13/01/2020").is_err());
    }

    #[test]
    fn test_garbage_fails_without_panicking() {
        let normalizer = DateNormalizer::new();
        for input in ["not a date", "2023-01-01xyz", "//", "9999999999999999999-01-01", "ñ"] {
            let err = normalizer.normalize(input).unwrap_err();
            assert_eq!(err.input, input);
        }
    }

    #[test]
    fn test_year_range_is_enforced_by_default() {
        let normalizer = DateNormalizer::new();
        assert!(normalizer.normalize("1899-12-31").is_err());
        assert!(normalizer.normalize("2101-01-01").is_err());
        assert_eq!(normalizer.normalize("1900-01-01"), Ok(Some(ymd(1900, 1, 1))));
        assert_eq!(normalizer.normalize("2100-12-31"), Ok(Some(ymd(2100, 12, 31))));
    }

    #[test]
    fn test_year_check_can_be_disabled() {
        let normalizer = DateNormalizer::without_year_check();
        assert_eq!(normalizer.normalize("1850-06-01"), Ok(Some(ymd(1850, 6, 1))));
        assert_eq!(normalizer.year_range(), None);
    }

    #[test]
    fn test_custom_year_range() {
        let normalizer = DateNormalizer::with_year_range(2000..=2010);
        assert!(normalizer.normalize("1999-01-01").is_err());
        assert_eq!(normalizer.normalize("2005-03-04"), Ok(Some(ymd(2005, 3, 4))));
    }

    #[test]
    fn test_unparseable_policy_from_str() {
        assert_eq!("reject".parse::<UnparseableDate>().unwrap(), UnparseableDate::Reject);
        assert_eq!("NULL".parse::<UnparseableDate>().unwrap(), UnparseableDate::StoreNull);
        assert_eq!(
            "store_null".parse::<UnparseableDate>().unwrap(),
            UnparseableDate::StoreNull
        );
        assert!("drop".parse::<UnparseableDate>().is_err());
    }
}
