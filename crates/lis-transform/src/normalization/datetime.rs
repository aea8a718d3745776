//! Sample date/time parsing.
//!
//! LIS exports write collection times in many local conventions. Values are
//! normalized to `YYYY-MM-DD HH:MM:SS`; date-only inputs get midnight.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Output format of normalized date/time values.
pub const NORMALIZED_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parses a date/time string in one of the supported layouts.
///
/// Full date/time layouts are tried before date-only ones. Returns `None`
/// for blank or unrecognized input.
///
/// # Examples
///
/// ```
/// use lis_transform::normalization::datetime::parse_datetime;
///
/// let dt = parse_datetime("2024年3月5日").unwrap();
/// assert_eq!(dt.to_string(), "2024-03-05 00:00:00");
/// assert!(parse_datetime("yesterday").is_none());
/// ```
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    try_parse_datetime(trimmed)
        .or_else(|| try_parse_date(trimmed).map(|date| date.and_time(NaiveTime::MIN)))
}

/// Parses and reformats a value, `None` when it cannot be parsed.
pub fn normalize_datetime(value: &str) -> Option<String> {
    parse_datetime(value).map(|dt| dt.format(NORMALIZED_DATETIME_FORMAT).to_string())
}

fn try_parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
    ];

    formats
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

fn try_parse_date(value: &str) -> Option<NaiveDate> {
    let formats = [
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%Y.%m.%d",
        "%Y%m%d",
        "%Y年%m月%d日",
    ];

    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}
