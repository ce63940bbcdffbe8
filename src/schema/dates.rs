//! Date normalization for heterogeneous cell values.
//!
//! Tracking sheets mix ISO strings, US and European slash dates, raw
//! serial numbers, and placeholder text in the same column. Everything
//! funnels through [`normalize`], which either yields a calendar date
//! or `None`. Unparseable input is "no due date", never an error.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::sheet::CellValue;

/// Serial values at or above this are not treated as dates.
pub const SERIAL_LIMIT: f64 = 60_000.0;

/// Rows without a resolvable date sort after every dated row.
pub const SORT_SENTINEL: NaiveDate = NaiveDate::MAX;

/// Placeholder texts that mean "no date yet".
const NO_DATE_MARKERS: [&str; 5] = ["tbd", "n/a", "na", "n.a.", "-"];

/// Explicit formats, tried in order. `%m/%d` is tried before `%d/%m`,
/// so ambiguous slash dates resolve US-style.
const EXPLICIT_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y"];

/// General fallback formats for values the explicit list misses.
const FALLBACK_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];
const FALLBACK_DATE_FORMATS: [&str; 4] = ["%Y/%m/%d", "%d-%b-%Y", "%b %d, %Y", "%B %d, %Y"];

/// Convert a spreadsheet serial number to a calendar date.
///
/// The 1899-12-30 epoch absorbs the spreadsheet 1900 leap-year quirk,
/// so serials from real files land on the calendar date the user sees.
/// Time-of-day fractions are dropped.
pub fn from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial <= 0.0 || serial >= SERIAL_LIMIT {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}

/// Serial number for a date, inverse of [`from_serial`].
pub fn to_serial(date: NaiveDate) -> Option<f64> {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    Some((date - epoch).num_days() as f64)
}

/// Parse an ISO datetime or date string.
pub fn parse_iso_datetime(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    for fmt in FALLBACK_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()
}

/// Normalize any cell to an optional calendar date.
pub fn normalize(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::Empty | CellValue::Bool(_) => None,
        CellValue::Date(d) => Some(*d),
        CellValue::Number(n) => from_serial(*n),
        CellValue::Text(s) => normalize_text(s),
    }
}

/// Normalize date-ish text. Policy, first match wins: placeholder
/// markers, numeric serials under the limit, explicit formats, then
/// general fallback parsing.
pub fn normalize_text(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    if NO_DATE_MARKERS
        .iter()
        .any(|m| trimmed.eq_ignore_ascii_case(m))
    {
        return None;
    }
    if let Ok(n) = trimmed.parse::<f64>() {
        return from_serial(n);
    }
    for fmt in EXPLICIT_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(d);
        }
    }
    for fmt in FALLBACK_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in FALLBACK_DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(d);
        }
    }
    None
}

/// Signed days from `today` to `due`. Negative means overdue.
pub fn days_until(due: NaiveDate, today: NaiveDate) -> i64 {
    (due - today).num_days()
}
