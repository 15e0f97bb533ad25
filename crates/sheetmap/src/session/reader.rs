//! Bulk reads from a workbook

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use sheetmap_core::{CellAddress, Workbook, Worksheet};
use sheetmap_xlsx::XlsxReader;

use super::resource::SessionResources;
use super::{check_extension, check_row_limit, ColumnOverride, OpState, SheetRef};
use crate::codec::{decode_rows, MapCodec, MapRecord, RowCodec};
use crate::config::SessionConfig;
use crate::converter::CellRef;
use crate::error::{Error, Result};
use crate::schema::{ColumnFieldMap, ColumnSpec, SchemaProvider};
use crate::table::Record;
use crate::template::{effective_label, match_template};

/// Reads records out of one workbook.
///
/// ```rust,no_run
/// # use sheetmap::{Record, TableReader};
/// # fn demo<Person: Record>() -> sheetmap::Result<()> {
/// let mut reader = TableReader::open("people.xlsx")?;
/// let people: Vec<Person> = reader.read()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TableReader {
    resources: SessionResources,
    config: SessionConfig,
    op: OpState,
}

impl TableReader {
    /// Open an `.xlsx` file. The file stays open until the session is
    /// released.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        check_extension(path)?;
        let file = File::open(path)
            .map_err(|e| Error::resource(format!("opening {}", path.display()), e))?;
        let workbook = XlsxReader::read(BufReader::new(&file))?;
        tracing::info!(path = %path.display(), sheets = workbook.sheet_count(), "opened workbook");
        Ok(Self::with_resources(
            SessionResources::new(workbook).with_stream(file),
        ))
    }

    /// Read an `.xlsx` workbook from any seekable source
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let workbook = XlsxReader::read(reader)?;
        Ok(Self::from_workbook(workbook))
    }

    /// Read from an in-memory workbook
    pub fn from_workbook(workbook: Workbook) -> Self {
        Self::with_resources(SessionResources::new(workbook))
    }

    fn with_resources(resources: SessionResources) -> Self {
        Self {
            resources,
            config: SessionConfig::default(),
            op: OpState::default(),
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The workbook, until the session is released
    pub fn workbook(&self) -> Result<&Workbook> {
        self.resources.workbook()
    }

    pub fn is_released(&self) -> bool {
        self.resources.is_released()
    }

    /// Decode `field` of `R` with `converter` during the next read
    pub fn register_read_converter<R, F>(&mut self, field: &str, converter: F) -> &mut Self
    where
        R: 'static,
        F: Fn(&CellRef<'_>, &mut R) -> Result<()> + 'static,
    {
        self.op.converters.register_read::<R, F>(field, converter);
        self
    }

    /// Use `map` instead of the schema columns during the next read
    pub fn with_column_map(&mut self, map: ColumnFieldMap) -> &mut Self {
        self.op.column_override = Some(ColumnOverride::Map(map));
        self
    }

    /// Use `specs` instead of the record's own during the next read
    pub fn with_column_specs(&mut self, specs: Vec<ColumnSpec>) -> &mut Self {
        self.op.column_override = Some(ColumnOverride::Specs(specs));
        self
    }

    /// Read the first sheet, starting below its matched header
    pub fn read<R: Record>(&mut self) -> Result<Vec<R>> {
        self.read_sheet(SheetRef::First)
    }

    /// Read a sheet, starting below its matched header
    pub fn read_sheet<R: Record>(&mut self, sheet: impl Into<SheetRef>) -> Result<Vec<R>> {
        let sheet = sheet.into();
        self.run(|workbook, op, config| {
            read_records::<R>(workbook, op, config, &sheet, None).map(|(_, records)| records)
        })
    }

    /// Read a sheet from an explicit first data row
    pub fn read_from<R: Record>(
        &mut self,
        sheet: impl Into<SheetRef>,
        start_row: u32,
    ) -> Result<Vec<R>> {
        let sheet = sheet.into();
        self.run(|workbook, op, config| {
            read_records::<R>(workbook, op, config, &sheet, Some(start_row))
                .map(|(_, records)| records)
        })
    }

    /// Read and validate every record.
    ///
    /// `validator` sees each row index with its record. When it rejects any
    /// row the whole result is dropped and an empty `Vec` is returned.
    /// Decoding errors are still returned as errors.
    pub fn read_checked<R, F>(
        &mut self,
        sheet: impl Into<SheetRef>,
        start_row: Option<u32>,
        mut validator: F,
    ) -> Result<Vec<R>>
    where
        R: Record,
        F: FnMut(u32, &R) -> bool,
    {
        let sheet = sheet.into();
        self.run(|workbook, op, config| {
            let (start, records) = read_records::<R>(workbook, op, config, &sheet, start_row)?;
            let rejected: Vec<u32> = (start..)
                .zip(&records)
                .filter(|(row, record)| !validator(*row, record))
                .map(|(row, _)| row)
                .collect();
            if rejected.is_empty() {
                Ok(records)
            } else {
                tracing::warn!(?rejected, "validation failed, discarding all rows");
                Ok(Vec::new())
            }
        })
    }

    /// Read rows as untyped maps keyed by header label.
    ///
    /// The labels come from the row just above `start_row`; with
    /// `start_row` 0 the keys are column letters.
    pub fn read_maps(
        &mut self,
        sheet: impl Into<SheetRef>,
        start_row: u32,
    ) -> Result<Vec<MapRecord>> {
        let sheet = sheet.into();
        self.run(|workbook, op, config| {
            let worksheet = resolve_sheet(workbook, &sheet)?;
            let keys = match &op.column_override {
                Some(ColumnOverride::Map(map)) => map.clone(),
                Some(ColumnOverride::Specs(specs)) => ColumnFieldMap::from_specs(specs),
                None => header_keys(worksheet, start_row),
            };
            let last = data_end(worksheet, start_row)?;
            check_row_limit(start_row, (last - start_row + 1) as usize, config.max_rows)?;

            let converters = op.converters.take::<MapRecord>();
            let codec = MapCodec::new(&converters, workbook.settings().date_1904);
            let records = (start_row..=last)
                .map(|row| codec.decode_map_row(worksheet, row, &keys))
                .collect::<Result<Vec<_>>>()?;
            tracing::info!(
                sheet = worksheet.name(),
                rows = records.len(),
                columns = keys.len(),
                "read map records"
            );
            Ok(records)
        })
    }

    /// Release the workbook and the source file
    pub fn close(&mut self) -> Result<()> {
        self.resources.release()
    }

    /// Run one sheet operation with the pending registrations, then release
    /// when configured to
    fn run<T, F>(&mut self, op: F) -> Result<T>
    where
        F: FnOnce(&Workbook, &mut OpState, &SessionConfig) -> Result<T>,
    {
        let mut state = std::mem::take(&mut self.op);
        let result = self
            .resources
            .workbook()
            .and_then(|workbook| op(workbook, &mut state, &self.config));
        drop(state);

        if !self.config.auto_release {
            return result;
        }
        match (result, self.resources.release()) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), released) => {
                if let Err(release_err) = released {
                    tracing::warn!(error = %release_err, "release after failed read also failed");
                }
                Err(err)
            }
        }
    }
}

fn resolve_sheet<'a>(workbook: &'a Workbook, sheet: &SheetRef) -> Result<&'a Worksheet> {
    let index = sheet.resolve(workbook)?;
    workbook
        .worksheet(index)
        .ok_or_else(|| Error::validation(format!("sheet not found: {}", sheet)))
}

/// Last data row, which must not lie above `start_row`
fn data_end(sheet: &Worksheet, start_row: u32) -> Result<u32> {
    match sheet.last_row() {
        Some(last) if last >= start_row => Ok(last),
        _ => Err(Error::validation("not enough rows")),
    }
}

/// Keys of a map read: labels of the row above `start_row`, or column
/// letters for every used column when there is no such row
fn header_keys(sheet: &Worksheet, start_row: u32) -> ColumnFieldMap {
    match start_row.checked_sub(1) {
        Some(header_row) => {
            let last_col = sheet.last_col_in_row(header_row).unwrap_or(0);
            let mut keys = ColumnFieldMap::new();
            for col in 0..=last_col {
                if let Some(label) = effective_label(sheet, header_row, col) {
                    keys.insert(col, label);
                }
            }
            keys
        }
        None => {
            let last_col = sheet.iter_cells().map(|(_, col, _)| col).max();
            ColumnFieldMap::from_pairs(
                last_col
                    .into_iter()
                    .flat_map(|last| 0..=last)
                    .map(|col| (col, CellAddress::column_to_letters(col))),
            )
        }
    }
}

fn read_records<R: Record>(
    workbook: &Workbook,
    op: &mut OpState,
    config: &SessionConfig,
    sheet: &SheetRef,
    start_row: Option<u32>,
) -> Result<(u32, Vec<R>)> {
    let worksheet = resolve_sheet(workbook, sheet)?;
    let table = R::field_table();
    let specs = op.specs(table.column_specs());

    let (start, map) = match (start_row, op.column_map()) {
        (Some(start), Some(map)) => (start, map.clone()),
        (Some(start), None) => (start, ColumnFieldMap::from_specs(&specs)),
        (None, explicit) => {
            let matched = match_template(worksheet, &specs)?;
            let map = explicit.cloned().unwrap_or(matched.map);
            (matched.header_last_row + 1, map)
        }
    };
    tracing::debug!(sheet = worksheet.name(), start, columns = map.len(), "reading records");

    let last = data_end(worksheet, start)?;
    check_row_limit(start, (last - start + 1) as usize, config.max_rows)?;

    let converters = op.converters.take::<R>();
    let codec = RowCodec::new(table, &converters, workbook.settings().date_1904);
    let records = decode_rows(&codec, worksheet, start..=last, &map)?;
    tracing::info!(sheet = worksheet.name(), rows = records.len(), "read records");
    Ok((start, records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::table::FieldTable;
    use crate::value::Value;
    use once_cell::sync::Lazy;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Default, PartialEq)]
    struct Person {
        id: i32,
        name: String,
    }

    static PERSON: Lazy<FieldTable<Person>> = Lazy::new(|| {
        FieldTable::builder()
            .field("id", |p: &Person| p.id, |p, v| p.id = v)
            .column(0, ["ID"])
            .field("name", |p: &Person| p.name.clone(), |p, v| p.name = v)
            .column(1, ["Name"])
            .build()
    });

    impl Record for Person {
        fn field_table() -> &'static FieldTable<Self> {
            &PERSON
        }
    }

    fn workbook() -> Workbook {
        let mut workbook = Workbook::new();
        let sheet = workbook.worksheet_mut(0).unwrap();
        sheet.set_cell_value_at(0, 0, "ID").unwrap();
        sheet.set_cell_value_at(0, 1, "Name").unwrap();
        sheet.set_cell_value_at(1, 0, 1.0).unwrap();
        sheet.set_cell_value_at(1, 1, "Ada").unwrap();
        sheet.set_cell_value_at(2, 0, 2.0).unwrap();
        sheet.set_cell_value_at(2, 1, "Grace").unwrap();
        workbook
    }

    fn person(id: i32, name: &str) -> Person {
        Person {
            id,
            name: name.into(),
        }
    }

    #[test]
    fn test_read_below_matched_header() {
        let mut reader = TableReader::from_workbook(workbook());
        let people: Vec<Person> = reader.read().unwrap();
        assert_eq!(people, vec![person(1, "Ada"), person(2, "Grace")]);
        assert!(reader.is_released());
        assert_eq!(
            reader.read::<Person>().unwrap_err().to_string(),
            "validation error: session already released"
        );
    }

    #[test]
    fn test_read_from_explicit_row() {
        let config = SessionConfig::new().with_auto_release(false);
        let mut reader = TableReader::from_workbook(workbook()).with_config(config);

        let people: Vec<Person> = reader.read_from(0usize, 2).unwrap();
        assert_eq!(people, vec![person(2, "Grace")]);

        let err = reader.read_from::<Person>(SheetRef::First, 3).unwrap_err();
        assert_eq!(err.to_string(), "validation error: not enough rows");
        reader.close().unwrap();
        assert!(reader.workbook().is_err());
    }

    #[test]
    fn test_max_rows_guard() {
        let config = SessionConfig::new()
            .with_auto_release(false)
            .with_max_rows(2);
        let mut reader = TableReader::from_workbook(workbook()).with_config(config);
        assert_eq!(reader.read::<Person>().unwrap().len(), 2);

        let config = SessionConfig::new()
            .with_auto_release(false)
            .with_max_rows(1);
        let mut reader = TableReader::from_workbook(workbook()).with_config(config);
        assert_eq!(
            reader.read::<Person>().unwrap_err().kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn test_converter_applies_once() {
        let config = SessionConfig::new().with_auto_release(false);
        let mut reader = TableReader::from_workbook(workbook()).with_config(config);

        reader.register_read_converter::<Person, _>("name", |cell, p| {
            p.name = format!("<{}>", cell.decode());
            Ok(())
        });
        let first: Vec<Person> = reader.read().unwrap();
        let second: Vec<Person> = reader.read().unwrap();
        assert_eq!(first[0].name, "<Ada>");
        assert_eq!(second[0].name, "Ada");
    }

    #[test]
    fn test_column_override_applies_once() {
        let config = SessionConfig::new().with_auto_release(false);
        let mut reader = TableReader::from_workbook(workbook()).with_config(config);

        reader.with_column_map(ColumnFieldMap::from_pairs([(1, "name")]));
        let only_names: Vec<Person> = reader.read_from(SheetRef::First, 1).unwrap();
        assert_eq!(only_names[0], person(0, "Ada"));

        let full: Vec<Person> = reader.read_from(SheetRef::First, 1).unwrap();
        assert_eq!(full[0], person(1, "Ada"));
    }

    #[test]
    fn test_read_checked() {
        let config = SessionConfig::new().with_auto_release(false);
        let mut reader = TableReader::from_workbook(workbook()).with_config(config);

        let all: Vec<Person> = reader
            .read_checked(SheetRef::First, None, |_, p: &Person| p.id > 0)
            .unwrap();
        assert_eq!(all.len(), 2);

        let mut seen = Vec::new();
        let none: Vec<Person> = reader
            .read_checked(SheetRef::First, None, |row, p: &Person| {
                seen.push(row);
                p.id != 1
            })
            .unwrap();
        assert!(none.is_empty());
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn test_read_maps() {
        let config = SessionConfig::new().with_auto_release(false);
        let mut reader = TableReader::from_workbook(workbook()).with_config(config);

        let rows = reader.read_maps(SheetRef::First, 1).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["Name"], Value::from("Grace"));
        assert_eq!(rows[1]["ID"], Value::from(2));

        let raw = reader.read_maps(SheetRef::First, 0).unwrap();
        assert_eq!(raw.len(), 3);
        assert_eq!(raw[0]["A"], Value::from("ID"));
        assert_eq!(raw[2]["B"], Value::from("Grace"));
    }

    #[test]
    fn test_read_maps_with_column_override() {
        let config = SessionConfig::new().with_auto_release(false);
        let mut reader = TableReader::from_workbook(workbook()).with_config(config);

        reader.with_column_map(ColumnFieldMap::from_pairs([(1, "who")]));
        let rows = reader.read_maps(SheetRef::First, 1).unwrap();
        assert_eq!(rows[0].len(), 1);
        assert_eq!(rows[0]["who"], Value::from("Ada"));

        reader.with_column_specs(vec![ColumnSpec::new(0, "key", ["ID"])]);
        let rows = reader.read_maps(SheetRef::First, 1).unwrap();
        assert_eq!(rows[1]["key"], Value::from(2));

        // overrides last one operation only
        let rows = reader.read_maps(SheetRef::First, 1).unwrap();
        assert_eq!(rows[0]["Name"], Value::from("Ada"));
    }

    #[test]
    fn test_missing_sheet() {
        let mut reader = TableReader::from_workbook(workbook());
        let err = reader.read_sheet::<Person>("Other").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
