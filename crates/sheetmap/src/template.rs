//! Column mapping recovered from an existing header block
//!
//! A template sheet already carries a header. Its leaf row is the first row
//! whose labels cover every deepest label of the schema; the columns of that
//! row then tell which field lives where.

use std::collections::HashSet;

use sheetmap_core::Worksheet;

use crate::error::{Error, Result};
use crate::schema::{check_unique_deepest_labels, exported, ColumnFieldMap, ColumnSpec};

/// Result of matching a schema against a header block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateMatch {
    /// Last (leaf) row of the header block
    pub header_last_row: u32,
    /// Columns of the leaf row mapped to field names
    pub map: ColumnFieldMap,
}

impl TemplateMatch {
    /// First data row below the header
    pub fn data_start_row(&self) -> u32 {
        self.header_last_row + 1
    }
}

/// Text a header cell shows. Inside a merged region that is the anchor's
/// text.
pub fn effective_label(sheet: &Worksheet, row: u32, col: u16) -> Option<String> {
    let (row, col) = match sheet.merged_region_at(row, col) {
        Some(region) => (region.start.row, region.start.col),
        None => (row, col),
    };
    sheet.cell_at(row, col).and_then(|cell| cell.value.label_text())
}

/// Last column worth scanning in `row`, counting merges that reach into it
fn row_extent(sheet: &Worksheet, row: u32) -> Option<u16> {
    let merged = sheet
        .merged_regions()
        .iter()
        .filter(|r| (r.start.row..=r.end.row).contains(&row))
        .map(|r| r.end.col)
        .max();
    sheet.last_col_in_row(row).max(merged)
}

fn deepest_labels(specs: &[ColumnSpec]) -> HashSet<&str> {
    exported(specs)
        .filter_map(|(_, spec)| spec.deepest_label())
        .collect()
}

/// Find the leaf row of the header: the first row showing every distinct
/// deepest label of the exported specs
pub fn find_header_last_row(sheet: &Worksheet, specs: &[ColumnSpec]) -> Result<u32> {
    let wanted = deepest_labels(specs);
    if wanted.is_empty() {
        return Err(Error::structural("header not found: no exported columns"));
    }

    let last_row = sheet
        .last_row()
        .into_iter()
        .chain(sheet.merged_regions().iter().map(|r| r.end.row))
        .max();
    let Some(last_row) = last_row else {
        return Err(Error::structural("header not found"));
    };

    for row in 0..=last_row {
        let Some(extent) = row_extent(sheet, row) else {
            continue;
        };
        let found: HashSet<String> = (0..=extent)
            .filter_map(|col| effective_label(sheet, row, col))
            .filter(|label| wanted.contains(label.as_str()))
            .collect();
        tracing::trace!(row, matched = found.len(), wanted = wanted.len(), "header scan");
        if found.len() == wanted.len() {
            return Ok(row);
        }
    }
    Err(Error::structural("header not found"))
}

/// Map the columns of `header_last_row` to fields by deepest label.
///
/// Unknown labels are ignored. Every column under a merged leaf label maps
/// to that label's field.
pub fn build_column_field_map(
    sheet: &Worksheet,
    header_last_row: u32,
    specs: &[ColumnSpec],
) -> ColumnFieldMap {
    let mut map = ColumnFieldMap::new();
    let Some(extent) = row_extent(sheet, header_last_row) else {
        return map;
    };

    for col in 0..=extent {
        let Some(label) = effective_label(sheet, header_last_row, col) else {
            continue;
        };
        if let Some((_, spec)) =
            exported(specs).find(|(_, spec)| spec.deepest_label() == Some(label.as_str()))
        {
            map.insert(col, spec.field_name());
        }
    }
    map
}

/// Locate the header block and recover its column map
pub fn match_template(sheet: &Worksheet, specs: &[ColumnSpec]) -> Result<TemplateMatch> {
    check_unique_deepest_labels(specs)?;
    let header_last_row = find_header_last_row(sheet, specs)?;
    let map = build_column_field_map(sheet, header_last_row, specs);
    tracing::debug!(
        sheet = sheet.name(),
        header_last_row,
        columns = map.len(),
        "matched template header"
    );
    Ok(TemplateMatch {
        header_last_row,
        map,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::header::{header_style, HeaderLayout};
    use pretty_assertions::assert_eq;
    use sheetmap_core::{CellRange, CellValue};

    fn people() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::new(0, "id", ["ID"]),
            ColumnSpec::new(1, "name", ["Basic", "Name"]),
            ColumnSpec::new(2, "age", ["Basic", "Age"]),
        ]
    }

    #[test]
    fn test_matches_generated_header() {
        let specs = people();
        let mut sheet = Worksheet::new("People");
        HeaderLayout::build(&specs)
            .unwrap()
            .render(&mut sheet, 0, &header_style())
            .unwrap();

        let found = match_template(&sheet, &specs).unwrap();
        assert_eq!(found.header_last_row, 1);
        assert_eq!(found.data_start_row(), 2);
        assert_eq!(found.map, ColumnFieldMap::from_specs(&specs));
    }

    #[test]
    fn test_matches_shuffled_columns_below_title() {
        let mut sheet = Worksheet::new("Report");
        sheet.set_cell_value_at(0, 0, "Quarterly report").unwrap();
        sheet.set_cell_value_at(2, 0, "Age").unwrap();
        sheet.set_cell_value_at(2, 1, "Remarks").unwrap();
        sheet.set_cell_value_at(2, 2, "Name").unwrap();
        sheet.set_cell_value_at(2, 4, "ID").unwrap();

        let found = match_template(&sheet, &people()).unwrap();
        assert_eq!(found.header_last_row, 2);
        assert_eq!(
            found.map,
            ColumnFieldMap::from_pairs([(0, "age"), (2, "name"), (4, "id")])
        );
    }

    #[test]
    fn test_effective_label_through_merge() {
        let mut sheet = Worksheet::new("S");
        sheet.set_cell_value_at(0, 0, "Basic").unwrap();
        sheet.set_cell_value_at(0, 3, CellValue::Number(2024.0)).unwrap();
        sheet
            .merge_cells(&CellRange::from_indices(0, 0, 1, 1))
            .unwrap();

        assert_eq!(effective_label(&sheet, 1, 1).as_deref(), Some("Basic"));
        assert_eq!(effective_label(&sheet, 0, 3).as_deref(), Some("2024"));
        assert_eq!(effective_label(&sheet, 0, 2), None);
    }

    #[test]
    fn test_merged_leaf_maps_every_column() {
        let mut sheet = Worksheet::new("S");
        sheet.set_cell_value_at(0, 0, "ID").unwrap();
        sheet.set_cell_value_at(0, 1, "Name").unwrap();
        sheet.set_cell_value_at(0, 3, "Age").unwrap();
        sheet
            .merge_cells(&CellRange::from_indices(0, 1, 0, 2))
            .unwrap();

        let map = build_column_field_map(&sheet, 0, &people());
        assert_eq!(
            map,
            ColumnFieldMap::from_pairs([(0, "id"), (1, "name"), (2, "name"), (3, "age")])
        );
        assert_eq!(map.get(2), Some("name"));
    }

    #[test]
    fn test_merged_leaf_at_row_end() {
        let mut sheet = Worksheet::new("S");
        sheet.set_cell_value_at(0, 0, "ID").unwrap();
        sheet.set_cell_value_at(0, 1, "Name").unwrap();
        sheet
            .merge_cells(&CellRange::from_indices(0, 1, 0, 2))
            .unwrap();

        let map = build_column_field_map(&sheet, 0, &people());
        assert_eq!(map.get(1), Some("name"));
        assert_eq!(map.get(2), Some("name"));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_missing_label_is_not_found() {
        let mut sheet = Worksheet::new("S");
        sheet.set_cell_value_at(0, 0, "ID").unwrap();
        sheet.set_cell_value_at(0, 1, "Name").unwrap();

        let err = match_template(&sheet, &people()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
        assert!(err.to_string().contains("header not found"));

        let empty = Worksheet::new("Empty");
        assert!(find_header_last_row(&empty, &people()).is_err());
    }

    #[test]
    fn test_duplicate_deepest_labels_rejected() {
        let specs = vec![
            ColumnSpec::new(0, "home", ["Home", "Phone"]),
            ColumnSpec::new(1, "work", ["Work", "Phone"]),
        ];
        let sheet = Worksheet::new("S");
        let err = match_template(&sheet, &specs).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
        assert!(err.to_string().contains("ambiguous duplicate label 'Phone'"));
    }
}
