//! Bulk writes into a new workbook or a copy of a template

use std::fs::File;
use std::io::{self, BufReader, Seek, Write};
use std::path::Path;

use sheetmap_core::{Style, Workbook, Worksheet};
use sheetmap_xlsx::{XlsxReader, XlsxWriter};

use super::resource::SessionResources;
use super::{check_extension, check_row_limit, commit_staged, ColumnOverride, OpState, SheetRef};
use crate::codec::{DataStyles, MapCodec, MapRecord, RowCodec};
use crate::config::SessionConfig;
use crate::converter::CellSlot;
use crate::error::{Error, Result};
use crate::header::HeaderLayout;
use crate::schema::{exported, ColumnFieldMap, ColumnSpec, Schema, SchemaProvider};
use crate::table::Record;
use crate::template::match_template;

/// Where a write lands
#[derive(Debug, Clone)]
enum Target {
    /// An existing sheet
    Existing(SheetRef),
    /// A sheet that must not exist yet
    New(String),
}

/// Writes records into a workbook and saves it.
///
/// ```rust,no_run
/// # use sheetmap::{Record, TableWriter};
/// # fn demo<Person: Record>(people: &[Person]) -> sheetmap::Result<()> {
/// let mut writer = TableWriter::new();
/// writer.write(people)?;
/// writer.save("people.xlsx")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TableWriter {
    resources: SessionResources,
    config: SessionConfig,
    op: OpState,
}

impl Default for TableWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl TableWriter {
    /// Write into a new workbook with a single empty sheet
    pub fn new() -> Self {
        Self::from_workbook(Workbook::new())
    }

    /// Write into an existing in-memory workbook
    pub fn from_workbook(workbook: Workbook) -> Self {
        Self {
            resources: SessionResources::new(workbook),
            config: SessionConfig::default(),
            op: OpState::default(),
        }
    }

    /// Write into a private copy of the `.xlsx` template at `path`.
    ///
    /// The template itself is never modified; the copy is deleted on
    /// release.
    pub fn from_template<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        check_extension(path)?;

        let mut temp = tempfile::Builder::new()
            .prefix(".sheetmap-")
            .suffix(".xlsx")
            .tempfile()
            .map_err(|e| Error::resource("creating template copy", e))?;
        let mut source = File::open(path)
            .map_err(|e| Error::resource(format!("opening template {}", path.display()), e))?;
        io::copy(&mut source, temp.as_file_mut())
            .map_err(|e| Error::resource(format!("copying template {}", path.display()), e))?;

        let stream = temp
            .reopen()
            .map_err(|e| Error::resource("reopening template copy", e))?;
        let workbook = XlsxReader::read(BufReader::new(&stream))?;
        tracing::info!(
            template = %path.display(),
            copy = %temp.path().display(),
            "opened template copy"
        );

        Ok(Self {
            resources: SessionResources::new(workbook)
                .with_stream(stream)
                .with_temp(temp),
            config: SessionConfig::default(),
            op: OpState::default(),
        })
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn workbook(&self) -> Result<&Workbook> {
        self.resources.workbook()
    }

    pub fn workbook_mut(&mut self) -> Result<&mut Workbook> {
        self.resources.workbook_mut()
    }

    pub fn is_released(&self) -> bool {
        self.resources.is_released()
    }

    /// Location of the private template copy, until release
    pub fn template_copy(&self) -> Option<&Path> {
        self.resources.temp_path()
    }

    /// Encode `field` of `R` with `converter` during the next write
    pub fn register_write_converter<R, F>(&mut self, field: &str, converter: F) -> &mut Self
    where
        R: 'static,
        F: Fn(&mut CellSlot, &R) -> Result<()> + 'static,
    {
        self.op.converters.register_write::<R, F>(field, converter);
        self
    }

    /// Use `map` instead of the schema columns during the next write
    pub fn with_column_map(&mut self, map: ColumnFieldMap) -> &mut Self {
        self.op.column_override = Some(ColumnOverride::Map(map));
        self
    }

    /// Use `specs` instead of the record's own during the next write
    pub fn with_column_specs(&mut self, specs: Vec<ColumnSpec>) -> &mut Self {
        self.op.column_override = Some(ColumnOverride::Specs(specs));
        self
    }

    /// Header and records on the first sheet, data right below the header
    pub fn write<R: Record>(&mut self, records: &[R]) -> Result<()> {
        self.write_records(Target::Existing(SheetRef::First), records, None)
    }

    /// Header and records on the first sheet, data from `start_row`
    pub fn write_at<R: Record>(&mut self, records: &[R], start_row: u32) -> Result<()> {
        self.write_records(Target::Existing(SheetRef::First), records, Some(start_row))
    }

    /// Header and records on a new sheet called `name`
    pub fn write_to_sheet<R: Record>(&mut self, name: &str, records: &[R]) -> Result<()> {
        self.write_records(Target::New(name.to_string()), records, None)
    }

    /// Header and records on a new sheet called `name`, data from
    /// `start_row`
    pub fn write_to_sheet_at<R: Record>(
        &mut self,
        name: &str,
        records: &[R],
        start_row: u32,
    ) -> Result<()> {
        self.write_records(Target::New(name.to_string()), records, Some(start_row))
    }

    /// Records below the header block already present on `sheet`.
    ///
    /// Columns come from matching the header against the record's specs,
    /// or from an explicit column map, which then needs `start_row`.
    pub fn write_template<R: Record>(
        &mut self,
        sheet: impl Into<SheetRef>,
        records: &[R],
        start_row: Option<u32>,
    ) -> Result<()> {
        let sheet = sheet.into();
        self.run(|workbook, op, config| {
            check_records(records.len(), config)?;
            let specs = op.specs(R::field_table().column_specs());
            let index = sheet.resolve(workbook)?;
            let (start, map) = template_columns(workbook, index, op, &specs, start_row)?;
            check_row_limit(start, records.len(), config.max_rows)?;

            let converters = op.converters.take::<R>();
            let codec = RowCodec::new(R::field_table(), &converters, date_1904(workbook));
            let styles = DataStyles::new(&specs, &map, &config.date_format);
            let mut staging = Worksheet::new("staging");
            for (row, record) in (start..).zip(records) {
                codec.encode(&mut staging, row, &map, record, &styles)?;
            }
            commit(workbook, &Target::Existing(sheet.clone()), &staging)?;
            tracing::info!(sheet = %sheet, start, rows = records.len(), "wrote records into template");
            Ok(())
        })
    }

    /// Untyped records on the first sheet.
    ///
    /// The header is the key set of the widest record, in key order, on
    /// row 0. Keys first seen in a later record get a new trailing column.
    pub fn write_maps(&mut self, records: &[MapRecord], start_row: u32) -> Result<()> {
        self.run(|workbook, op, config| {
            check_records(records.len(), config)?;
            if config.write_header && start_row == 0 {
                return Err(Error::validation(
                    "start row 0 would overwrite the header row",
                ));
            }
            check_row_limit(start_row, records.len(), config.max_rows)?;

            let mut map = widest_keys(records);
            let converters = op.converters.take::<MapRecord>();
            let codec = MapCodec::new(&converters, date_1904(workbook));
            let styles = DataStyles::new(&[], &map, &config.date_format);

            let mut staging = Worksheet::new("staging");
            let mut labels: Vec<(u16, String)> = map
                .iter()
                .map(|(col, key)| (col, key.to_string()))
                .collect();
            for (row, record) in (start_row..).zip(records) {
                let added = codec.encode_map_row(&mut staging, row, &mut map, record, &styles)?;
                labels.extend(added);
            }
            if config.write_header {
                write_header_labels(&mut staging, &labels, &config.header_style)?;
            }
            commit(workbook, &Target::Existing(SheetRef::First), &staging)?;
            tracing::info!(rows = records.len(), columns = map.len(), "wrote map records");
            Ok(())
        })
    }

    /// Untyped records keyed by field name, under a header generated from
    /// `schema`. Keys outside the schema are ignored. With `sheet_name` the
    /// data goes to a new sheet, otherwise to the first one.
    pub fn write_schema_maps(
        &mut self,
        schema: &Schema,
        records: &[MapRecord],
        sheet_name: Option<&str>,
    ) -> Result<()> {
        let target = match sheet_name {
            Some(name) => Target::New(name.to_string()),
            None => Target::Existing(SheetRef::First),
        };
        self.run(|workbook, op, config| {
            check_records(records.len(), config)?;
            let specs = op.specs(schema.column_specs());
            let map = op
                .column_map()
                .cloned()
                .unwrap_or_else(|| ColumnFieldMap::from_specs(&specs));
            let (staging, start) = {
                let converters = op.converters.take::<MapRecord>();
                let codec = MapCodec::new(&converters, date_1904(workbook));
                stage(config, &specs, &map, records.len(), None, |sheet, row, i, styles| {
                    codec.encode_mapped_row(sheet, row, &map, &records[i], styles)
                })?
            };
            commit(workbook, &target, &staging)?;
            tracing::info!(start, rows = records.len(), "wrote schema map records");
            Ok(())
        })
    }

    /// Untyped records keyed by field name, below the header block on
    /// `sheet` matched against `schema`
    pub fn write_template_maps(
        &mut self,
        schema: &Schema,
        sheet: impl Into<SheetRef>,
        records: &[MapRecord],
        start_row: Option<u32>,
    ) -> Result<()> {
        let sheet = sheet.into();
        self.run(|workbook, op, config| {
            check_records(records.len(), config)?;
            let specs = op.specs(schema.column_specs());
            let index = sheet.resolve(workbook)?;
            let (start, map) = template_columns(workbook, index, op, &specs, start_row)?;
            check_row_limit(start, records.len(), config.max_rows)?;

            let converters = op.converters.take::<MapRecord>();
            let codec = MapCodec::new(&converters, date_1904(workbook));
            let styles = DataStyles::new(&specs, &map, &config.date_format);
            let mut staging = Worksheet::new("staging");
            for (row, record) in (start..).zip(records) {
                codec.encode_mapped_row(&mut staging, row, &map, record, &styles)?;
            }
            commit(workbook, &Target::Existing(sheet.clone()), &staging)?;
            tracing::info!(sheet = %sheet, start, rows = records.len(), "wrote map records into template");
            Ok(())
        })
    }

    /// Save as `.xlsx`, then release when configured to
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        check_extension(path)?;
        let result = self
            .resources
            .workbook()
            .and_then(|workbook| XlsxWriter::write_file(workbook, path).map_err(Error::from));
        if result.is_ok() {
            tracing::info!(path = %path.display(), "saved workbook");
        }
        self.finish(result)
    }

    /// Write `.xlsx` bytes to `writer`, then release when configured to
    pub fn write_to<W: Write + Seek>(&mut self, writer: W) -> Result<()> {
        let result = self
            .resources
            .workbook()
            .and_then(|workbook| XlsxWriter::write(workbook, writer).map_err(Error::from));
        self.finish(result)
    }

    /// Release the workbook, the template stream and the template copy
    pub fn close(&mut self) -> Result<()> {
        self.resources.release()
    }

    fn finish(&mut self, result: Result<()>) -> Result<()> {
        if !self.config.auto_release {
            return result;
        }
        let released = self.resources.release();
        match result {
            Ok(()) => released,
            Err(err) => {
                if let Err(release_err) = released {
                    tracing::warn!(error = %release_err, "release after failed save also failed");
                }
                Err(err)
            }
        }
    }

    /// Run one sheet operation with the pending registrations
    fn run<T, F>(&mut self, op: F) -> Result<T>
    where
        F: FnOnce(&mut Workbook, &mut OpState, &SessionConfig) -> Result<T>,
    {
        let mut state = std::mem::take(&mut self.op);
        let config = &self.config;
        self.resources
            .workbook_mut()
            .and_then(|workbook| op(workbook, &mut state, config))
    }

    fn write_records<R: Record>(
        &mut self,
        target: Target,
        records: &[R],
        start_row: Option<u32>,
    ) -> Result<()> {
        self.run(|workbook, op, config| {
            check_records(records.len(), config)?;
            let specs = op.specs(R::field_table().column_specs());
            let map = op
                .column_map()
                .cloned()
                .unwrap_or_else(|| ColumnFieldMap::from_specs(&specs));
            let converters = op.converters.take::<R>();
            let codec = RowCodec::new(R::field_table(), &converters, date_1904(workbook));
            let (staging, start) =
                stage(config, &specs, &map, records.len(), start_row, |sheet, row, i, styles| {
                    codec.encode(sheet, row, &map, &records[i], styles)
                })?;
            commit(workbook, &target, &staging)?;
            tracing::info!(sheet = ?target, start, rows = records.len(), "wrote records");
            Ok(())
        })
    }
}

fn date_1904(workbook: &Workbook) -> bool {
    workbook.settings().date_1904
}

fn check_records(count: usize, config: &SessionConfig) -> Result<()> {
    if count == 0 {
        return Err(Error::validation("no data to write"));
    }
    if count > config.max_rows {
        return Err(Error::validation(format!(
            "{} rows exceed the limit of {}",
            count, config.max_rows
        )));
    }
    Ok(())
}

/// Specs to lay the header out from: each mapped column under the labels
/// of its field's spec, or under the field name when no spec knows it
fn header_specs(map: &ColumnFieldMap, specs: &[ColumnSpec]) -> Vec<ColumnSpec> {
    map.iter()
        .map(|(col, field)| {
            let labels = exported(specs)
                .find(|(_, spec)| spec.field_name() == field)
                .map_or_else(|| vec![field.to_string()], |(_, spec)| spec.labels().to_vec());
            ColumnSpec::new(i32::from(col), field, labels)
        })
        .collect()
}

/// Encode the generated header and `count` rows into a staging sheet.
/// Returns the sheet and the first data row.
fn stage<F>(
    config: &SessionConfig,
    specs: &[ColumnSpec],
    map: &ColumnFieldMap,
    count: usize,
    start_row: Option<u32>,
    mut encode: F,
) -> Result<(Worksheet, u32)>
where
    F: FnMut(&mut Worksheet, u32, usize, &DataStyles) -> Result<()>,
{
    let layout = if config.write_header && !map.is_empty() {
        Some(HeaderLayout::build(&header_specs(map, specs))?)
    } else {
        None
    };
    let header_rows = layout.as_ref().map_or(0, HeaderLayout::row_count);
    let start = start_row.unwrap_or(header_rows);
    if start < header_rows {
        return Err(Error::validation(format!(
            "start row {} overlaps the {}-row header",
            start, header_rows
        )));
    }
    check_row_limit(start, count, config.max_rows)?;

    let mut staging = Worksheet::new("staging");
    if let Some(layout) = &layout {
        layout.render(&mut staging, 0, &config.header_style)?;
    }
    let styles = DataStyles::new(specs, map, &config.date_format);
    for (i, row) in (start..).take(count).enumerate() {
        encode(&mut staging, row, i, &styles)?;
    }
    Ok((staging, start))
}

/// First data row and columns of a template sheet
fn template_columns(
    workbook: &Workbook,
    index: usize,
    op: &OpState,
    specs: &[ColumnSpec],
    start_row: Option<u32>,
) -> Result<(u32, ColumnFieldMap)> {
    let sheet = workbook
        .worksheet(index)
        .ok_or_else(|| Error::validation(format!("sheet not found: #{}", index)))?;
    match (op.column_map(), start_row) {
        (Some(map), Some(start)) => Ok((start, map.clone())),
        (Some(_), None) => Err(Error::validation(
            "a template write with an explicit column map needs a start row",
        )),
        (None, start) => {
            let matched = match_template(sheet, specs)?;
            Ok((start.unwrap_or(matched.header_last_row + 1), matched.map))
        }
    }
}

/// Header cells for map writes, one row, each label in its column
fn write_header_labels(
    sheet: &mut Worksheet,
    labels: &[(u16, String)],
    style: &Style,
) -> Result<()> {
    for (col, label) in labels {
        sheet.set_cell_value_at(0, *col, label.as_str())?;
        sheet.set_cell_style_at(0, *col, style)?;
    }
    Ok(())
}

/// Column map over the keys of the widest record, in key order
fn widest_keys(records: &[MapRecord]) -> ColumnFieldMap {
    let widest = records
        .iter()
        .fold(None::<&MapRecord>, |best, record| match best {
            Some(best) if best.len() >= record.len() => Some(best),
            _ => Some(record),
        });
    let keys: Vec<&str> = widest
        .map(|record| record.keys().map(String::as_str).collect())
        .unwrap_or_default();
    ColumnFieldMap::from_names(&keys)
}

/// Copy staged cells onto the target sheet, creating it when new
fn commit(workbook: &mut Workbook, target: &Target, staging: &Worksheet) -> Result<()> {
    let index = match target {
        Target::Existing(sheet) => sheet.resolve(workbook)?,
        Target::New(name) => {
            if name.is_empty() {
                return Err(Error::validation("sheet name must not be empty"));
            }
            if workbook.sheet_index(name).is_some() {
                return Err(Error::validation(format!("sheet already exists: {}", name)));
            }
            workbook.add_worksheet_with_name(name)?
        }
    };
    let sheet = workbook
        .worksheet_mut(index)
        .ok_or_else(|| Error::validation(format!("sheet not found: #{}", index)))?;
    commit_staged(sheet, staging)
}
