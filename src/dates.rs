//! Date normalization for Thai news listings.
//!
//! Isranews prints dates like `15 มกราคม 2567 เวลา 09:30` or `3 ก.พ. 2568`:
//! Thai month names (full or abbreviated) and Buddhist-era years. Everything
//! is normalized to a [`NaiveDateTime`] in the Gregorian calendar.
//!
//! Thai numerals (`๑๕ มกราคม ๒๕๖๗`) are read like ASCII digits.
//!
//! An unparsable date is `None`. Callers treat that as "unknown", never as
//! now or the epoch.

use crate::error::ConfigError;
use chrono::{NaiveDate, NaiveDateTime};
use std::borrow::Cow;
use once_cell::sync::Lazy;
use regex::Regex;

/// Years above this are Buddhist-era.
const BUDDHIST_YEAR_THRESHOLD: i32 = 2400;
/// Buddhist year minus this is the Gregorian year.
const BUDDHIST_YEAR_OFFSET: i32 = 543;

/// Canonical rendering used in every export.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static THAI_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]{1,2})\s+([ก-๙.]+)\s+([0-9]{4})(?:\s*เวลา\s*([0-9]{1,2}):([0-9]{2}))?")
        .expect("static Thai date pattern")
});

/// Full and abbreviated Thai month names.
const THAI_MONTHS: [(&str, u32); 24] = [
    ("มกราคม", 1),
    ("กุมภาพันธ์", 2),
    ("มีนาคม", 3),
    ("เมษายน", 4),
    ("พฤษภาคม", 5),
    ("มิถุนายน", 6),
    ("กรกฎาคม", 7),
    ("สิงหาคม", 8),
    ("กันยายน", 9),
    ("ตุลาคม", 10),
    ("พฤศจิกายน", 11),
    ("ธันวาคม", 12),
    ("ม.ค.", 1),
    ("ก.พ.", 2),
    ("มี.ค.", 3),
    ("เม.ย.", 4),
    ("พ.ค.", 5),
    ("มิ.ย.", 6),
    ("ก.ค.", 7),
    ("ส.ค.", 8),
    ("ก.ย.", 9),
    ("ต.ค.", 10),
    ("พ.ย.", 11),
    ("ธ.ค.", 12),
];

/// Value of a Thai numeral (U+0E50..=U+0E59).
fn thai_digit(c: char) -> Option<u32> {
    match c {
        '\u{0E50}'..='\u{0E59}' => Some(c as u32 - 0x0E50),
        _ => None,
    }
}

/// `text` with Thai numerals replaced by ASCII digits.
///
/// # Returns
///
/// The input unchanged (borrowed) when it holds no Thai numerals.
fn ascii_digits(text: &str) -> Cow<'_, str> {
    if !text.chars().any(|c| thai_digit(c).is_some()) {
        return Cow::Borrowed(text);
    }
    text.chars()
        .map(|c| thai_digit(c).and_then(|d| char::from_digit(d, 10)).unwrap_or(c))
        .collect::<String>()
        .into()
}

fn thai_month(name: &str) -> Option<u32> {
    THAI_MONTHS
        .iter()
        .find(|(month, _)| *month == name)
        .map(|(_, number)| *number)
}

fn to_gregorian(year: i32) -> i32 {
    if year > BUDDHIST_YEAR_THRESHOLD {
        year - BUDDHIST_YEAR_OFFSET
    } else {
        year
    }
}

/// Parse `D <thai month> YYYY[ เวลา HH:MM]` found anywhere in `text`.
///
/// Digits may be ASCII or Thai numerals, mixed freely.
pub fn parse_thai_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = ascii_digits(text);
    let caps = THAI_DATE.captures(&text)?;
    let day: u32 = caps.get(1)?.as_str().parse().ok()?;
    let month = thai_month(caps.get(2)?.as_str())?;
    let year: i32 = caps.get(3)?.as_str().parse().ok()?;

    let (hour, minute) = match (caps.get(4), caps.get(5)) {
        (Some(h), Some(m)) => (h.as_str().parse().ok()?, m.as_str().parse().ok()?),
        _ => (0, 0),
    };

    NaiveDate::from_ymd_opt(to_gregorian(year), month, day)?.and_hms_opt(hour, minute, 0)
}

/// Parse any supported date: the Thai pattern first, then strict ISO `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = ascii_digits(raw.trim());
    if trimmed.is_empty() {
        return None;
    }
    if let Some(dt) = parse_thai_datetime(&trimmed) {
        return Some(dt);
    }
    NaiveDate::parse_from_str(&trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

pub fn format_timestamp(dt: &NaiveDateTime) -> String {
    dt.format(TIMESTAMP_FORMAT).to_string()
}

/// Canonical timestamp string for a raw date, empty when unknown.
pub fn normalize(raw: &str) -> String {
    parse_date(raw)
        .map(|dt| format_timestamp(&dt))
        .unwrap_or_default()
}

/// Parse the user's listing filter date.
///
/// Accepts `YYYY-MM-DD` with either calendar (`2567-01-15` is read as
/// `2024-01-15`) and the Thai listing pattern. Blank input means no filter.
pub fn parse_filter_date(input: &str) -> Result<Option<NaiveDateTime>, ConfigError> {
    let trimmed = input.trim();
    let digits = ascii_digits(trimmed);
    if trimmed.is_empty() {
        return Ok(None);
    }

    let parts: Vec<&str> = digits.split('-').collect();
    if let [year, month, day] = parts.as_slice() {
        if let Ok(year) = year.parse::<i32>() {
            let iso = format!("{}-{}-{}", to_gregorian(year), month, day);
            if let Ok(date) = NaiveDate::parse_from_str(&iso, "%Y-%m-%d") {
                return Ok(date.and_hms_opt(0, 0, 0));
            }
        }
    }

    parse_thai_datetime(&digits)
        .map(Some)
        .ok_or_else(|| ConfigError::InvalidDate(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn ymd_hms(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_full_month_name_buddhist_year() {
        assert_eq!(parse_date("15 มกราคม 2567"), Some(ymd_hms(2024, 1, 15, 0, 0)));
        assert_eq!(normalize("15 มกราคม 2567"), "2024-01-15 00:00:00");
    }

    #[test]
    fn test_abbreviated_month_with_time() {
        assert_eq!(
            parse_date("3 ก.พ. 2568 เวลา 14:05"),
            Some(ymd_hms(2025, 2, 3, 14, 5))
        );
    }

    #[test]
    fn test_pattern_found_inside_surrounding_text() {
        let raw = "วันพุธที่ 6 มีนาคม 2567 เวลา 9:30 น.";
        assert_eq!(parse_date(raw), Some(ymd_hms(2024, 3, 6, 9, 30)));
    }

    #[test]
    fn test_every_month_name_resolves() {
        for (name, number) in THAI_MONTHS {
            let dt = parse_date(&format!("1 {name} 2566")).unwrap();
            assert_eq!(dt.month(), number, "{name}");
        }
    }

    #[test]
    fn test_buddhist_years_lose_543() {
        for year in [2401, 2500, 2543, 2567, 2600] {
            let dt = parse_date(&format!("10 ธันวาคม {year}")).unwrap();
            assert_eq!(dt.year(), year - 543);
        }
    }

    #[test]
    fn test_gregorian_year_kept() {
        let dt = parse_date("10 ธันวาคม 2024").unwrap();
        assert_eq!(dt.year(), 2024);
    }

    #[test]
    fn test_iso_date() {
        assert_eq!(parse_date("2024-01-15"), Some(ymd_hms(2024, 1, 15, 0, 0)));
        assert_eq!(parse_date("  2024-01-15  ").unwrap().hour(), 0);
    }

    #[test]
    fn test_thai_numerals() {
        assert_eq!(parse_date("๑๕ มกราคม ๒๕๖๗"), Some(ymd_hms(2024, 1, 15, 0, 0)));
        assert_eq!(
            parse_date("๓ ก.พ. ๒๕๖๘ เวลา ๑๔:๐๕"),
            Some(ymd_hms(2025, 2, 3, 14, 5))
        );
        assert_eq!(normalize("๒๐๒๔-๐๑-๑๕"), "2024-01-15 00:00:00");
        assert_eq!(ascii_digits("ปี ๒๕๖๗ (2567)"), "ปี 2567 (2567)");
        assert!(matches!(ascii_digits("15 มกราคม"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_filter_date_thai_numerals() {
        assert_eq!(
            parse_filter_date("๒๕๖๗-๐๑-๑๕").unwrap(),
            Some(ymd_hms(2024, 1, 15, 0, 0))
        );
    }

    #[test]
    fn test_unparsable_is_none() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("15 January 2567"), None);
        assert_eq!(parse_date("31 กุมภาพันธ์ 2567"), None);
        assert_eq!(parse_date("15/01/2024"), None);
        assert_eq!(normalize("not a date"), "");
    }

    #[test]
    fn test_invalid_time_is_none() {
        assert_eq!(parse_date("1 มกราคม 2567 เวลา 25:00"), None);
    }

    #[test]
    fn test_filter_date_accepts_both_calendars() {
        let expected = Some(ymd_hms(2024, 1, 15, 0, 0));
        assert_eq!(parse_filter_date("2024-01-15").unwrap(), expected);
        assert_eq!(parse_filter_date("2567-01-15").unwrap(), expected);
        assert_eq!(parse_filter_date("15 ม.ค. 2567").unwrap(), expected);
    }

    #[test]
    fn test_filter_date_blank_and_invalid() {
        assert_eq!(parse_filter_date("   ").unwrap(), None);
        assert!(matches!(
            parse_filter_date("2024-13-40"),
            Err(ConfigError::InvalidDate(_))
        ));
        assert!(parse_filter_date("soon").is_err());
    }
}
