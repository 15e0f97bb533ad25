//! Conversion between spreadsheet date serials and calendar timestamps.
//!
//! The 1900 system counts from 1899-12-30, which is exact from serial 61
//! (1900-03-01) on. The 1904 system counts from 1904-01-01.

use chrono::{Duration, NaiveDate, NaiveDateTime};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

fn epoch(date_1904: bool) -> NaiveDateTime {
    let (y, m, d) = if date_1904 { (1904, 1, 1) } else { (1899, 12, 30) };
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Convert a date serial to a timestamp, rounded to the millisecond.
///
/// Returns `None` for negative or non-finite serials.
pub fn serial_to_datetime(serial: f64, date_1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let millis = (serial * MILLIS_PER_DAY).round() as i64;
    epoch(date_1904).checked_add_signed(Duration::milliseconds(millis))
}

/// Convert a timestamp to a date serial.
pub fn datetime_to_serial(value: NaiveDateTime, date_1904: bool) -> f64 {
    let delta = value.signed_duration_since(epoch(date_1904));
    delta.num_milliseconds() as f64 / MILLIS_PER_DAY
}
