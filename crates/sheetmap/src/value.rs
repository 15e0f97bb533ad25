//! Decoded cell content
//!
//! [`Value`] is what a raw cell means once its number format and the
//! workbook date system have been taken into account. Numbers are exact
//! decimals rounded to [`DECIMAL_PRECISION`] fractional digits so that
//! binary float noise never reaches a record.

use std::fmt;

use chrono::NaiveDateTime;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use sheetmap_core::{datetime_to_serial, serial_to_datetime, CellValue, Style};

/// Fractional digits kept by every numeric decode
pub const DECIMAL_PRECISION: u32 = 12;

/// A decoded cell value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Exact decimal number
    Number(Decimal),
    /// Non-empty text
    Text(String),
    /// Boolean
    Boolean(bool),
    /// Timestamp decoded from a date-formatted serial
    DateTime(NaiveDateTime),
    /// Blank, error, or a formula without a cached result
    #[default]
    Empty,
}

/// Round half away from zero to [`DECIMAL_PRECISION`] digits
pub fn round_decimal(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PRECISION, RoundingStrategy::MidpointAwayFromZero)
}

impl Value {
    /// Number from a float, rounded. `None` when the float has no decimal
    /// representation (non-finite or beyond the decimal range).
    pub fn from_f64(n: f64) -> Option<Value> {
        Decimal::from_f64(n).map(|d| Value::Number(round_decimal(d)))
    }

    /// Check if the value is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Type name used in mismatch errors
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Boolean(_) => "boolean",
            Value::DateTime(_) => "datetime",
            Value::Empty => "empty",
        }
    }

    /// The decimal, if this is a number
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Number(d) => Some(*d),
            _ => None,
        }
    }

    /// The text, if this is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Raw cell content for this value. Timestamps become date serials.
    pub fn to_cell_value(&self, date_1904: bool) -> CellValue {
        match self {
            Value::Number(d) => d
                .to_f64()
                .map(CellValue::Number)
                .unwrap_or_else(|| CellValue::String(d.to_string())),
            Value::Text(s) => CellValue::String(s.clone()),
            Value::Boolean(b) => CellValue::Boolean(*b),
            Value::DateTime(dt) => CellValue::Number(datetime_to_serial(*dt, date_1904)),
            Value::Empty => CellValue::Empty,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(d) => write!(f, "{}", d.normalize()),
            Value::Text(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Value::Empty => Ok(()),
        }
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Number(d)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Decimal::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(Decimal::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

/// Decode a raw cell.
///
/// A number formatted as a date becomes [`Value::DateTime`]. Formulas decode
/// from their cached result. Errors, blank cells and empty strings are
/// [`Value::Empty`].
pub fn decode_cell(raw: &CellValue, style: Option<&Style>, date_1904: bool) -> Value {
    let is_date = style.map_or(false, |s| s.number_format.is_date_format());
    match raw {
        CellValue::Formula {
            cached_value: Some(cached),
            ..
        } => match cached.as_ref() {
            CellValue::Formula { .. } => Value::Empty,
            inner => decode_cell(inner, style, date_1904),
        },
        CellValue::Number(n) => decode_number(*n, is_date, date_1904),
        CellValue::String(s) if s.is_empty() => Value::Empty,
        CellValue::String(s) => Value::Text(s.clone()),
        CellValue::Boolean(b) => Value::Boolean(*b),
        CellValue::Formula { .. } | CellValue::Error(_) | CellValue::Empty => Value::Empty,
    }
}

fn decode_number(n: f64, is_date: bool, date_1904: bool) -> Value {
    if is_date {
        if let Some(dt) = serial_to_datetime(n, date_1904) {
            return Value::DateTime(dt);
        }
    }
    // beyond the decimal range: keep what the sheet shows
    Value::from_f64(n).unwrap_or_else(|| Value::Text(n.to_string()))
}
