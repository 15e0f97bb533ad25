//! Field types and value coercion
//!
//! Every record field declares a [`FieldType`]. Reads coerce a decoded
//! [`Value`] into that type; writes turn a [`FieldValue`] back into a raw
//! cell.

use std::fmt;

use chrono::NaiveDateTime;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sheetmap_core::{datetime_to_serial, CellValue};

use crate::error::{Error, Result};
use crate::value::{round_decimal, Value};

/// Declared type of a record field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Decimal,
    Text,
    Boolean,
    DateTime,
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Byte => "byte",
            FieldType::Short => "short",
            FieldType::Int => "int",
            FieldType::Long => "long",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::Decimal => "decimal",
            FieldType::Text => "text",
            FieldType::Boolean => "boolean",
            FieldType::DateTime => "datetime",
        }
    }

    /// Byte, short, int or long
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            FieldType::Byte | FieldType::Short | FieldType::Int | FieldType::Long
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A native field value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    Text(String),
    Boolean(bool),
    DateTime(NaiveDateTime),
    #[default]
    Null,
}

impl FieldValue {
    /// The type this value belongs to; `None` for `Null`
    pub fn field_type(&self) -> Option<FieldType> {
        Some(match self {
            FieldValue::Byte(_) => FieldType::Byte,
            FieldValue::Short(_) => FieldType::Short,
            FieldValue::Int(_) => FieldType::Int,
            FieldValue::Long(_) => FieldType::Long,
            FieldValue::Float(_) => FieldType::Float,
            FieldValue::Double(_) => FieldType::Double,
            FieldValue::Decimal(_) => FieldType::Decimal,
            FieldValue::Text(_) => FieldType::Text,
            FieldValue::Boolean(_) => FieldType::Boolean,
            FieldValue::DateTime(_) => FieldType::DateTime,
            FieldValue::Null => return None,
        })
    }

    /// Type name used in mismatch errors
    pub fn type_name(&self) -> &'static str {
        self.field_type().map_or("null", |t| t.name())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Raw cell content written for this value.
    ///
    /// Integers and floats become numbers, timestamps become date serials.
    /// Decimals are written as text so that no digit is lost.
    pub fn to_cell_value(&self, date_1904: bool) -> CellValue {
        match self {
            FieldValue::Byte(n) => CellValue::Number(f64::from(*n)),
            FieldValue::Short(n) => CellValue::Number(f64::from(*n)),
            FieldValue::Int(n) => CellValue::Number(f64::from(*n)),
            FieldValue::Long(n) => CellValue::Number(*n as f64),
            FieldValue::Float(n) => CellValue::Number(f64::from(*n)),
            FieldValue::Double(n) => CellValue::Number(*n),
            FieldValue::Decimal(d) => CellValue::String(d.to_string()),
            FieldValue::Text(s) => CellValue::String(s.clone()),
            FieldValue::Boolean(b) => CellValue::Boolean(*b),
            FieldValue::DateTime(dt) => CellValue::Number(datetime_to_serial(*dt, date_1904)),
            FieldValue::Null => CellValue::Empty,
        }
    }
}

/// Coerce a decoded value into the declared type of `field`.
///
/// Integer targets truncate toward zero and reject values outside their
/// range. Float targets widen. Text is accepted for a decimal target when it
/// parses as one.
pub fn coerce(value: Value, field: &str, expected: FieldType) -> Result<FieldValue> {
    let actual = value.type_name();
    let mismatch = || Error::TypeMismatch {
        field: field.to_string(),
        expected,
        actual,
    };

    let coerced = match (value, expected) {
        (Value::Empty, _) => Some(FieldValue::Null),
        (Value::Number(d), t) if t.is_integer() => {
            let whole = d.trunc().to_i64().ok_or_else(mismatch)?;
            match t {
                FieldType::Byte => i8::try_from(whole).ok().map(FieldValue::Byte),
                FieldType::Short => i16::try_from(whole).ok().map(FieldValue::Short),
                FieldType::Int => i32::try_from(whole).ok().map(FieldValue::Int),
                _ => Some(FieldValue::Long(whole)),
            }
        }
        (Value::Number(d), FieldType::Float) => d.to_f32().map(FieldValue::Float),
        (Value::Number(d), FieldType::Double) => d.to_f64().map(FieldValue::Double),
        (Value::Number(d), FieldType::Decimal) => Some(FieldValue::Decimal(d)),
        (Value::Text(s), FieldType::Decimal) => s
            .trim()
            .parse::<Decimal>()
            .ok()
            .map(|d| FieldValue::Decimal(round_decimal(d))),
        (Value::Text(s), FieldType::Text) => Some(FieldValue::Text(s)),
        (Value::Boolean(b), FieldType::Boolean) => Some(FieldValue::Boolean(b)),
        (Value::DateTime(dt), FieldType::DateTime) => Some(FieldValue::DateTime(dt)),
        _ => None,
    };
    coerced.ok_or_else(mismatch)
}

/// A Rust type that can live in a record field
pub trait FieldKind: Sized {
    /// Declared type of fields holding `Self`
    const FIELD_TYPE: FieldType;

    /// Extract from a field value of the matching variant
    fn from_field(value: FieldValue) -> Option<Self>;

    /// Wrap as a field value
    fn to_field(&self) -> FieldValue;
}

macro_rules! field_kind {
    ($ty:ty, $variant:ident, $field_type:expr) => {
        impl FieldKind for $ty {
            const FIELD_TYPE: FieldType = $field_type;

            fn from_field(value: FieldValue) -> Option<Self> {
                match value {
                    FieldValue::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn to_field(&self) -> FieldValue {
                FieldValue::$variant(self.clone())
            }
        }
    };
}

field_kind!(i8, Byte, FieldType::Byte);
field_kind!(i16, Short, FieldType::Short);
field_kind!(i32, Int, FieldType::Int);
field_kind!(i64, Long, FieldType::Long);
field_kind!(f32, Float, FieldType::Float);
field_kind!(f64, Double, FieldType::Double);
field_kind!(Decimal, Decimal, FieldType::Decimal);
field_kind!(String, Text, FieldType::Text);
field_kind!(bool, Boolean, FieldType::Boolean);
field_kind!(NaiveDateTime, DateTime, FieldType::DateTime);

impl<T: FieldKind> FieldKind for Option<T> {
    const FIELD_TYPE: FieldType = T::FIELD_TYPE;

    fn from_field(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Null => Some(None),
            other => T::from_field(other).map(Some),
        }
    }

    fn to_field(&self) -> FieldValue {
        self.as_ref().map_or(FieldValue::Null, T::to_field)
    }
}
