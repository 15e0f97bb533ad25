//! Bulk read and write sessions
//!
//! [`TableReader`] and [`TableWriter`] own a workbook for the duration of a
//! session. Converter registrations and column overrides apply to the next
//! sheet operation only; every operation starts by taking them out of the
//! session, so they are gone afterwards whether it succeeded or not.

mod reader;
mod resource;
mod writer;

pub use reader::TableReader;
pub use writer::TableWriter;

use std::path::Path;

use sheetmap_core::{Workbook, Worksheet, MAX_ROWS};

use crate::converter::ConverterRegistry;
use crate::error::{Error, Result};
use crate::schema::{ColumnFieldMap, ColumnSpec};

/// Which sheet an operation targets
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SheetRef {
    /// The first sheet of the workbook
    #[default]
    First,
    /// Zero-based position
    Index(usize),
    /// Sheet name
    Name(String),
}

impl SheetRef {
    /// Position of the sheet in `workbook`
    pub fn resolve(&self, workbook: &Workbook) -> Result<usize> {
        let index = match self {
            SheetRef::First => Some(0).filter(|_| !workbook.is_empty()),
            SheetRef::Index(i) => Some(*i).filter(|i| *i < workbook.sheet_count()),
            SheetRef::Name(name) if name.is_empty() => {
                return Err(Error::validation("sheet name must not be empty"))
            }
            SheetRef::Name(name) => workbook.sheet_index(name),
        };
        index.ok_or_else(|| Error::validation(format!("sheet not found: {}", self)))
    }
}

impl std::fmt::Display for SheetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetRef::First => f.write_str("first sheet"),
            SheetRef::Index(i) => write!(f, "sheet #{}", i),
            SheetRef::Name(name) => write!(f, "'{}'", name),
        }
    }
}

impl From<usize> for SheetRef {
    fn from(index: usize) -> Self {
        SheetRef::Index(index)
    }
}

impl From<&str> for SheetRef {
    fn from(name: &str) -> Self {
        SheetRef::Name(name.to_string())
    }
}

impl From<String> for SheetRef {
    fn from(name: String) -> Self {
        SheetRef::Name(name)
    }
}

/// Column mapping supplied by the caller instead of the schema
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ColumnOverride {
    Map(ColumnFieldMap),
    Specs(Vec<ColumnSpec>),
}

/// Per-operation registrations
#[derive(Debug, Default)]
pub(crate) struct OpState {
    pub(crate) converters: ConverterRegistry,
    pub(crate) column_override: Option<ColumnOverride>,
}

impl OpState {
    /// Specs from the override, or `fallback`
    pub(crate) fn specs(&self, fallback: Vec<ColumnSpec>) -> Vec<ColumnSpec> {
        match &self.column_override {
            Some(ColumnOverride::Specs(specs)) => specs.clone(),
            _ => fallback,
        }
    }

    /// The explicit column map, when one was given
    pub(crate) fn column_map(&self) -> Option<&ColumnFieldMap> {
        match &self.column_override {
            Some(ColumnOverride::Map(map)) => Some(map),
            _ => None,
        }
    }
}

/// Accept `.xlsx` and `.xlsm`; the legacy binary `.xls` is refused
pub(crate) fn check_extension(path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match extension.as_deref() {
        Some("xlsx") | Some("xlsm") => Ok(()),
        Some("xls") => Err(Error::validation(format!(
            "legacy .xls workbooks are not supported: {}",
            path.display()
        ))),
        _ => Err(Error::validation(format!(
            "unsupported file format: {}",
            path.display()
        ))),
    }
}

/// Fail when an operation would touch more than `max_rows` records, or run
/// past the last sheet row
pub(crate) fn check_row_limit(start_row: u32, count: usize, max_rows: usize) -> Result<()> {
    if count > max_rows {
        return Err(Error::validation(format!(
            "{} rows exceed the limit of {}",
            count, max_rows
        )));
    }
    let last = u64::from(start_row) + count as u64;
    if last > u64::from(MAX_ROWS) {
        return Err(Error::validation(format!(
            "rows {}..{} run past the sheet limit of {}",
            start_row, last, MAX_ROWS
        )));
    }
    Ok(())
}

/// Copy a fully encoded staging sheet onto `target`.
///
/// All merges are checked before the first cell is touched, so a conflict
/// leaves `target` unchanged. Merges already present on `target` are kept.
pub(crate) fn commit_staged(target: &mut Worksheet, staging: &Worksheet) -> Result<()> {
    let new_merges: Vec<_> = staging
        .merged_regions()
        .iter()
        .filter(|range| !target.merged_regions().contains(range))
        .copied()
        .collect();
    for range in &new_merges {
        if let Some(existing) = target
            .merged_regions()
            .iter()
            .find(|existing| existing.overlaps(range))
        {
            return Err(Error::structural(format!(
                "header region {} overlaps existing merge {}",
                range, existing
            )));
        }
    }

    for (row, col, cell) in staging.iter_cells() {
        target.set_cell_value_at(row, col, cell.value.clone())?;
        if cell.style_index == 0 {
            continue;
        }
        if let Some(style) = staging.style_by_index(cell.style_index) {
            target.set_cell_style_at(row, col, style)?;
        }
    }
    for range in &new_merges {
        target.merge_cells(range)?;
    }
    Ok(())
}
