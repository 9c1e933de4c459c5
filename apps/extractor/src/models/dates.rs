//! Date normalization for model-supplied date strings.
//!
//! Relative phrases are resolved against the processing date with fixed-length units:
//! a week is 7 days and a month is 30 days.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use regex::Regex;

static RELATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+)\+?\s*(day|week|month)s?\s+ago\b").expect("valid relative-date regex")
});

static ORDINAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(st|nd|rd|th)\b").expect("valid ordinal regex")
});

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %B, %Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Normalizes a free-form date to a calendar date, or `None` when it cannot be understood.
///
/// "ongoing"-style values and anything unparseable resolve to `None`; this never fails.
pub fn normalize_date(raw: &str, today: NaiveDate) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    let lower = value.to_lowercase();
    if lower.contains("ongoing") {
        return None;
    }
    if lower == "today" || lower == "just posted" {
        return Some(today);
    }
    if lower == "yesterday" {
        return today.checked_sub_signed(Duration::days(1));
    }

    if let Some(caps) = RELATIVE_RE.captures(value) {
        let n: i64 = caps[1].parse().ok()?;
        let days = match caps[2].to_lowercase().as_str() {
            "day" => n,
            "week" => n.checked_mul(7)?,
            _ => n.checked_mul(30)?,
        };
        return today.checked_sub_signed(Duration::try_days(days)?);
    }

    parse_absolute(value)
}

fn parse_absolute(value: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt.date());
        }
    }

    let cleaned = ORDINAL_RE.replace_all(value, "$1");
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&cleaned, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 20).unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_relative_days() {
        assert_eq!(normalize_date("3 days ago", today()), ymd(2024, 3, 17));
        assert_eq!(normalize_date("1 day ago", today()), ymd(2024, 3, 19));
    }

    #[test]
    fn test_relative_weeks_are_seven_days() {
        assert_eq!(normalize_date("2 weeks ago", today()), ymd(2024, 3, 6));
    }

    #[test]
    fn test_relative_months_are_thirty_days() {
        // 30 days before 2024-03-20, not 2024-02-20
        assert_eq!(normalize_date("1 month ago", today()), ymd(2024, 2, 19));
    }

    #[test]
    fn test_relative_with_prefix_and_plus() {
        assert_eq!(normalize_date("Posted 30+ days ago", today()), ymd(2024, 2, 19));
    }

    #[test]
    fn test_out_of_range_relative_is_none() {
        assert_eq!(normalize_date("1000000000000000 days ago", today()), None);
        assert_eq!(normalize_date("999999999999999999 months ago", today()), None);
        assert_eq!(normalize_date("99999999999999999999 weeks ago", today()), None);
        assert_eq!(normalize_date("500000000 days ago", today()), None);
    }

    #[test]
    fn test_ongoing_is_none() {
        assert_eq!(normalize_date("ongoing", today()), None);
        assert_eq!(normalize_date("Ongoing recruitment", today()), None);
    }

    #[test]
    fn test_iso_round_trips() {
        let d = normalize_date("2024-01-15", today()).unwrap();
        assert_eq!(d.format("%Y-%m-%d").to_string(), "2024-01-15");
    }

    #[test]
    fn test_absolute_formats() {
        assert_eq!(normalize_date("January 15, 2024", today()), ymd(2024, 1, 15));
        assert_eq!(normalize_date("Jan 15 2024", today()), ymd(2024, 1, 15));
        assert_eq!(normalize_date("15th January 2024", today()), ymd(2024, 1, 15));
        assert_eq!(normalize_date("01/15/2024", today()), ymd(2024, 1, 15));
        assert_eq!(normalize_date("2024-01-15T09:30:00Z", today()), ymd(2024, 1, 15));
        assert_eq!(normalize_date("2024-01-15T09:30:00", today()), ymd(2024, 1, 15));
    }

    #[test]
    fn test_today_and_yesterday() {
        assert_eq!(normalize_date("Today", today()), Some(today()));
        assert_eq!(normalize_date("yesterday", today()), ymd(2024, 3, 19));
    }

    #[test]
    fn test_garbage_is_none() {
        assert_eq!(normalize_date("", today()), None);
        assert_eq!(normalize_date("as soon as possible", today()), None);
        assert_eq!(normalize_date("2024-13-45", today()), None);
    }
}
