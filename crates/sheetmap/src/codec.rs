//! One record to one row, and back
//!
//! Typed records go through their [`FieldTable`]; untyped
//! [`MapRecord`]s are keyed by header label. Both honour per-field
//! converters before falling back to the default decoding and coercion.

use std::collections::BTreeMap;

use sheetmap_core::{CellValue, Style, Worksheet};

use crate::converter::{CellRef, CellSlot, Converters};
use crate::error::Result;
use crate::field::{coerce, FieldValue};
use crate::schema::{ColumnFieldMap, ColumnSpec};
use crate::table::FieldTable;
use crate::value::Value;

/// An untyped record: header label (or column letters) to value
pub type MapRecord = BTreeMap<String, Value>;

/// Number-format styles of data cells
#[derive(Debug, Clone, PartialEq)]
pub struct DataStyles {
    columns: BTreeMap<u16, Style>,
    date: Style,
}

impl DataStyles {
    /// Column styles from the spec formats of the mapped fields, and the
    /// fallback style for timestamps
    pub fn new(specs: &[ColumnSpec], map: &ColumnFieldMap, date_format: &str) -> Self {
        let columns = map
            .iter()
            .filter_map(|(col, field)| {
                specs
                    .iter()
                    .find(|spec| spec.field_name() == field)
                    .and_then(ColumnSpec::format)
                    .map(|format| (col, Style::new().number_format(format)))
            })
            .collect();
        Self {
            columns,
            date: Style::new().number_format(date_format),
        }
    }

    pub fn column(&self, col: u16) -> Option<&Style> {
        self.columns.get(&col)
    }

    /// Style for a data cell; timestamps without a column format get the
    /// date style
    pub fn for_cell(&self, col: u16, is_datetime: bool) -> Option<&Style> {
        match self.columns.get(&col) {
            Some(style) => Some(style),
            None if is_datetime => Some(&self.date),
            None => None,
        }
    }
}

fn raw_cell(sheet: &Worksheet, row: u32, col: u16, date_1904: bool) -> CellRef<'_> {
    const EMPTY: &CellValue = &CellValue::Empty;
    CellRef {
        raw: sheet.cell_at(row, col).map_or(EMPTY, |cell| &cell.value),
        style: sheet.cell_style_at(row, col),
        date_1904,
    }
}

fn put_cell(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: CellValue,
    style: Option<&Style>,
) -> Result<()> {
    if value.is_empty() && style.is_none() {
        return Ok(());
    }
    if !value.is_empty() {
        sheet.set_cell_value_at(row, col, value)?;
    }
    if let Some(style) = style {
        sheet.set_cell_style_at(row, col, style)?;
    }
    Ok(())
}

/// Typed row codec for records of type `R`
pub struct RowCodec<'a, R> {
    table: &'a FieldTable<R>,
    converters: &'a Converters<R>,
    date_1904: bool,
}

impl<'a, R> RowCodec<'a, R> {
    pub fn new(table: &'a FieldTable<R>, converters: &'a Converters<R>, date_1904: bool) -> Self {
        Self {
            table,
            converters,
            date_1904,
        }
    }

    /// Build a record from the mapped cells of `row`.
    ///
    /// Empty cells leave the field at its default. A field without an
    /// accessor is a structural error; a value of the wrong type is a type
    /// mismatch.
    pub fn decode(&self, sheet: &Worksheet, row: u32, map: &ColumnFieldMap) -> Result<R>
    where
        R: Default,
    {
        let mut record = R::default();
        for (col, field) in map.iter() {
            let accessor = self.table.accessor(field)?;
            let cell = raw_cell(sheet, row, col, self.date_1904);

            if let Some(convert) = self.converters.read(field) {
                convert(&cell, &mut record)?;
                continue;
            }
            let value = cell.decode();
            if value.is_empty() {
                continue;
            }
            accessor.set(&mut record, coerce(value, field, accessor.field_type())?)?;
        }
        Ok(record)
    }

    /// Write the mapped fields of `record` into `row`
    pub fn encode(
        &self,
        sheet: &mut Worksheet,
        row: u32,
        map: &ColumnFieldMap,
        record: &R,
        styles: &DataStyles,
    ) -> Result<()> {
        for (col, field) in map.iter() {
            let accessor = self.table.accessor(field)?;

            if let Some(convert) = self.converters.write(field) {
                let mut slot = CellSlot::new(self.date_1904);
                convert(&mut slot, record)?;
                let (value, style) = slot.into_parts();
                let style = style.as_ref().or_else(|| styles.column(col));
                put_cell(sheet, row, col, value, style)?;
                continue;
            }

            let value = accessor.get(record);
            if value.is_null() {
                continue;
            }
            let is_datetime = matches!(value, FieldValue::DateTime(_));
            put_cell(
                sheet,
                row,
                col,
                value.to_cell_value(self.date_1904),
                styles.for_cell(col, is_datetime),
            )?;
        }
        Ok(())
    }
}

/// Row codec for untyped [`MapRecord`]s
pub struct MapCodec<'a> {
    converters: &'a Converters<MapRecord>,
    date_1904: bool,
}

impl<'a> MapCodec<'a> {
    pub fn new(converters: &'a Converters<MapRecord>, date_1904: bool) -> Self {
        Self {
            converters,
            date_1904,
        }
    }

    /// Every mapped key of `row`; blank cells give [`Value::Empty`]
    pub fn decode_map_row(
        &self,
        sheet: &Worksheet,
        row: u32,
        keys: &ColumnFieldMap,
    ) -> Result<MapRecord> {
        let mut record = MapRecord::new();
        for (col, key) in keys.iter() {
            let cell = raw_cell(sheet, row, col, self.date_1904);
            match self.converters.read(key) {
                Some(convert) => convert(&cell, &mut record)?,
                None => {
                    record.insert(key.to_string(), cell.decode());
                }
            }
        }
        Ok(record)
    }

    /// Write `record` into `row`.
    ///
    /// Keys missing from `map` are appended as new trailing columns; the
    /// added `(column, key)` pairs are returned so the caller can label
    /// them.
    pub fn encode_map_row(
        &self,
        sheet: &mut Worksheet,
        row: u32,
        map: &mut ColumnFieldMap,
        record: &MapRecord,
        styles: &DataStyles,
    ) -> Result<Vec<(u16, String)>> {
        let mut added = Vec::new();
        for key in record.keys() {
            if map.column_of(key).is_none() {
                let col = map.next_column();
                map.insert(col, key.as_str());
                added.push((col, key.clone()));
            }
        }
        self.encode_mapped_row(sheet, row, map, record, styles)?;
        Ok(added)
    }

    /// Write the keys of `record` that `map` places; other keys are ignored
    pub fn encode_mapped_row(
        &self,
        sheet: &mut Worksheet,
        row: u32,
        map: &ColumnFieldMap,
        record: &MapRecord,
        styles: &DataStyles,
    ) -> Result<()> {
        for (col, key) in map.iter() {
            if let Some(convert) = self.converters.write(key) {
                let mut slot = CellSlot::new(self.date_1904);
                convert(&mut slot, record)?;
                let (value, style) = slot.into_parts();
                let style = style.as_ref().or_else(|| styles.column(col));
                put_cell(sheet, row, col, value, style)?;
                continue;
            }
            let Some(value) = record.get(key) else {
                continue;
            };
            if value.is_empty() {
                continue;
            }
            put_cell(
                sheet,
                row,
                col,
                value.to_cell_value(self.date_1904),
                styles.for_cell(col, matches!(value, Value::DateTime(_))),
            )?;
        }
        Ok(())
    }
}

/// Decode a whole row range with a typed codec
pub(crate) fn decode_rows<R: Default>(
    codec: &RowCodec<'_, R>,
    sheet: &Worksheet,
    rows: std::ops::RangeInclusive<u32>,
    map: &ColumnFieldMap,
) -> Result<Vec<R>> {
    rows.map(|row| codec.decode(sheet, row, map)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ErrorKind};
    use crate::field::FieldType;
    use chrono::{NaiveDate, NaiveDateTime};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    #[derive(Debug, Default, PartialEq)]
    struct Person {
        id: i32,
        name: String,
        age: Option<i64>,
        joined: Option<NaiveDateTime>,
    }

    fn table() -> FieldTable<Person> {
        FieldTable::builder()
            .field("id", |p: &Person| p.id, |p, v| p.id = v)
            .column(0, ["ID"])
            .field("name", |p: &Person| p.name.clone(), |p, v| p.name = v)
            .column(1, ["Basic", "Name"])
            .field("age", |p: &Person| p.age, |p, v| p.age = v)
            .column(2, ["Basic", "Age"])
            .format("0")
            .field("joined", |p: &Person| p.joined, |p, v| p.joined = v)
            .column(3, ["Joined"])
            .build()
    }

    fn joined() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 4, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_encode_then_decode() {
        let table = table();
        let converters = Converters::new();
        let codec = RowCodec::new(&table, &converters, false);
        let specs = crate::schema::SchemaProvider::column_specs(&table);
        let map = ColumnFieldMap::from_specs(&specs);
        let styles = DataStyles::new(&specs, &map, "yyyy-mm-dd hh:mm:ss");

        let person = Person {
            id: 7,
            name: "Ada".into(),
            age: None,
            joined: Some(joined()),
        };
        let mut sheet = Worksheet::new("S");
        codec.encode(&mut sheet, 2, &map, &person, &styles).unwrap();

        assert_eq!(sheet.get_value_at(2, 0), CellValue::Number(7.0));
        assert_eq!(sheet.get_value_at(2, 2), CellValue::Empty);
        assert!(sheet
            .cell_style_at(2, 3)
            .unwrap()
            .number_format
            .is_date_format());

        assert_eq!(codec.decode(&sheet, 2, &map).unwrap(), person);
    }

    #[test]
    fn test_decode_type_mismatch() {
        let table = table();
        let converters = Converters::new();
        let codec = RowCodec::new(&table, &converters, false);
        let map = ColumnFieldMap::from_pairs([(0, "id"), (1, "name")]);

        let mut sheet = Worksheet::new("S");
        sheet.set_cell_value_at(0, 0, 25.000000000000).unwrap();
        sheet.set_cell_value_at(0, 1, 25.000000000000).unwrap();

        match codec.decode(&sheet, 0, &map).unwrap_err() {
            Error::TypeMismatch {
                field,
                expected,
                actual,
            } => {
                assert_eq!(field, "name");
                assert_eq!(expected, FieldType::Text);
                assert_eq!(actual, "number");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_unknown_field_is_structural() {
        let table = table();
        let converters = Converters::new();
        let codec = RowCodec::new(&table, &converters, false);
        let map = ColumnFieldMap::from_pairs([(0, "salary")]);
        let sheet = Worksheet::new("S");

        let err = codec.decode(&sheet, 0, &map).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
    }

    #[test]
    fn test_converters_take_over() {
        let table = table();
        let mut converters = Converters::<Person>::new();
        converters.register_read("name", |cell, p: &mut Person| {
            p.name = cell.decode().to_string().to_uppercase();
            Ok(())
        });
        converters.register_write("id", |slot, p: &Person| {
            slot.set_raw(format!("#{}", p.id));
            slot.set_style(Style::new().italic(true));
            Ok(())
        });
        let codec = RowCodec::new(&table, &converters, false);
        let map = ColumnFieldMap::from_pairs([(0, "id"), (1, "name")]);
        let styles = DataStyles::new(&[], &map, "yyyy-mm-dd");

        let mut sheet = Worksheet::new("S");
        let person = Person {
            id: 3,
            name: "grace".into(),
            ..Person::default()
        };
        codec.encode(&mut sheet, 0, &map, &person, &styles).unwrap();
        assert_eq!(sheet.get_value_at(0, 0), CellValue::string("#3"));
        assert_eq!(sheet.cell_style_at(0, 0), Some(&Style::new().italic(true)));

        let decoded = codec
            .decode(&sheet, 0, &ColumnFieldMap::from_pairs([(1, "name")]))
            .unwrap();
        assert_eq!(decoded.name, "GRACE");
    }

    #[test]
    fn test_map_rows() {
        let converters = Converters::new();
        let codec = MapCodec::new(&converters, false);
        let mut map = ColumnFieldMap::from_pairs([(0, "sku")]);
        let styles = DataStyles::new(&[], &map, "yyyy-mm-dd");

        let record: MapRecord = [
            ("sku".to_string(), Value::from("A-1")),
            ("price".to_string(), Value::from(Decimal::new(1999, 2))),
        ]
        .into_iter()
        .collect();

        let mut sheet = Worksheet::new("S");
        let added = codec
            .encode_map_row(&mut sheet, 1, &mut map, &record, &styles)
            .unwrap();
        assert_eq!(added, vec![(1, "price".to_string())]);
        assert_eq!(map.get(1), Some("price"));

        let keys = ColumnFieldMap::from_pairs([(0, "sku"), (1, "price"), (2, "note")]);
        let decoded = codec.decode_map_row(&sheet, 1, &keys).unwrap();
        assert_eq!(decoded["sku"], Value::from("A-1"));
        assert_eq!(decoded["price"], Value::from(Decimal::new(1999, 2)));
        assert_eq!(decoded["note"], Value::Empty);
    }
}
