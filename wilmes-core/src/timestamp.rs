//! Timestamp normalization
//!
//! The portal prints dates for humans: `5.3.2021 12:34`, `2021-03-05 12:34`,
//! `Yesterday`, a yearless `5.3.` in listings, or a bare `10:15` meaning
//! today. [`parse_timestamp`] turns all of them into an offset-carrying
//! instant.
//!
//! ```
//! use chrono::NaiveDate;
//! use wilmes_core::timestamp::parse_timestamp_on;
//!
//! let today = NaiveDate::from_ymd_opt(2021, 3, 10).unwrap();
//! let ts = parse_timestamp_on("5.3.2021 12:34", &chrono_tz::Europe::Helsinki, today).unwrap();
//! assert_eq!(ts.to_rfc3339(), "2021-03-05T12:34:00+02:00");
//! ```

use crate::error::{Error, Result};
use crate::types::Timestamp;
use chrono::{
    DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
};
use regex::Regex;
use std::sync::LazyLock;

/// `D.M.` or `DD.MM.` with nothing after the trailing dot.
static YEARLESS_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((0?[1-9])|[1-2][0-9]|3[01])\.((0?[1-9])|(1[0-2]))\.$")
        .expect("invalid regex: yearless date")
});

const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

const AWARE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

const ISO_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const DAY_FIRST_DATETIME_FORMATS: &[&str] = &[
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d.%m.%Y %H.%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const MONTH_FIRST_DATETIME_FORMATS: &[&str] = &["%m/%d/%Y %H:%M:%S", "%m/%d/%Y %H:%M"];

const DAY_FIRST_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y"];

const MONTH_FIRST_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// A bare clock time means that time today.
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M", "%H.%M"];

/// Parse a portal timestamp, resolving relative words against the local date.
///
/// Strings without an offset are localized into `zone`; strings with one
/// keep it.
pub fn parse_timestamp<Tz: TimeZone>(raw: &str, zone: &Tz) -> Result<Timestamp> {
    parse_timestamp_on(raw, zone, Local::now().date_naive())
}

/// Same as [`parse_timestamp`] with an explicit "today".
pub fn parse_timestamp_on<Tz: TimeZone>(
    raw: &str,
    zone: &Tz,
    today: NaiveDate,
) -> Result<Timestamp> {
    let cleaned = normalize_spaces(raw);

    let adjusted = if let Some(days_back) = relative_day_offset(&cleaned) {
        (today - Duration::days(days_back))
            .format("%Y-%m-%d")
            .to_string()
    } else if YEARLESS_DATE.is_match(&cleaned) {
        format!("{}{}", cleaned, today.year())
    } else {
        strip_weekday(&cleaned).to_string()
    };

    if let Some(aware) = parse_aware(&adjusted) {
        return Ok(aware);
    }

    let day_first = adjusted.matches('.').count() >= 2;
    let naive = parse_naive(&adjusted, day_first, today)
        .ok_or_else(|| Error::Parse(format!("unrecognized timestamp: {:?}", raw)))?;

    localize(naive, zone)
        .ok_or_else(|| Error::Parse(format!("timestamp {:?} does not exist in zone", raw)))
}

/// Days back from today for the relative words the portal uses.
///
/// `"Yesterday"` → `Some(1)`, `"today"` → `Some(0)`, `"5.3."` → `None`.
fn relative_day_offset(s: &str) -> Option<i64> {
    match s.to_lowercase().as_str() {
        "today" => Some(0),
        "yesterday" => Some(1),
        _ => None,
    }
}

/// Drop a leading weekday name: `"Tuesday 2.3.2021"` → `"2.3.2021"`.
fn strip_weekday(s: &str) -> &str {
    let Some((first, rest)) = s.split_once(' ') else {
        return s;
    };
    let word = first.trim_end_matches(',').to_lowercase();
    if WEEKDAYS.contains(&word.as_str()) {
        rest.trim_start()
    } else {
        s
    }
}

fn normalize_spaces(raw: &str) -> String {
    raw.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_aware(s: &str) -> Option<Timestamp> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts);
    }
    AWARE_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
}

fn parse_naive(s: &str, day_first: bool, today: NaiveDate) -> Option<NaiveDateTime> {
    let (datetime_formats, date_formats) = if day_first {
        (DAY_FIRST_DATETIME_FORMATS, DAY_FIRST_DATE_FORMATS)
    } else {
        (MONTH_FIRST_DATETIME_FORMATS, MONTH_FIRST_DATE_FORMATS)
    };

    ISO_DATETIME_FORMATS
        .iter()
        .chain(datetime_formats)
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            date_formats
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .or_else(|| {
            TIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
                .map(|time| today.and_time(time))
        })
}

/// Ambiguous local times (DST fall-back) take the earlier instant.
fn localize<Tz: TimeZone>(naive: NaiveDateTime, zone: &Tz) -> Option<Timestamp> {
    zone.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.fixed_offset())
}
