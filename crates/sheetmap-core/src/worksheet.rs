//! A single sheet: named sparse cells plus merged regions

use crate::cell::{CellData, CellRange, CellStorage, CellValue};
use crate::error::{Error, Result};
use crate::style::Style;
use crate::{MAX_COLS, MAX_ROWS};

/// One sheet of a [`crate::Workbook`]. Rows and columns are zero-based.
#[derive(Debug)]
pub struct Worksheet {
    name: String,
    cells: CellStorage,
}

impl Worksheet {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            cells: CellStorage::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Only the workbook renames, so it can check for clashes
    pub(crate) fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    pub fn cell_at(&self, row: u32, col: u16) -> Option<&CellData> {
        self.cells.get(row, col)
    }

    /// Missing cells read as `Empty`
    pub fn get_value_at(&self, row: u32, col: u16) -> CellValue {
        self.cell_at(row, col)
            .map(|cell| cell.value.clone())
            .unwrap_or_default()
    }

    pub fn style_by_index(&self, style_index: u32) -> Option<&Style> {
        self.cells.style_pool().get(style_index)
    }

    /// `None` for unstyled and missing cells
    pub fn cell_style_at(&self, row: u32, col: u16) -> Option<&Style> {
        match self.cell_at(row, col)?.style_index {
            0 => None,
            index => self.style_by_index(index),
        }
    }

    /// Set the value and keep whatever style the cell has
    pub fn set_cell_value_at<V: Into<CellValue>>(
        &mut self,
        row: u32,
        col: u16,
        value: V,
    ) -> Result<()> {
        check_position(row, col)?;
        self.cells.set_value(row, col, value.into());
        Ok(())
    }

    /// Set the style and keep whatever value the cell has
    pub fn set_cell_style_at(&mut self, row: u32, col: u16, style: &Style) -> Result<()> {
        check_position(row, col)?;
        let index = self.cells.style_pool_mut().get_or_insert(style.clone());
        self.cells.set_style(row, col, index);
        Ok(())
    }

    pub fn last_row(&self) -> Option<u32> {
        self.cells.last_row()
    }

    pub fn last_col_in_row(&self, row: u32) -> Option<u16> {
        self.cells.last_col_in_row(row)
    }

    pub fn merged_regions(&self) -> &[CellRange] {
        self.cells.merged_regions()
    }

    /// Fails with [`Error::MergeOverlap`] when `range` shares a cell with
    /// an existing merge
    pub fn merge_cells(&mut self, range: &CellRange) -> Result<()> {
        check_position(range.end.row, range.end.col)?;
        let clash = self.merged_regions().iter().find(|m| m.overlaps(range));
        if let Some(existing) = clash {
            return Err(Error::MergeOverlap {
                range: range.to_string(),
                existing: existing.to_string(),
            });
        }
        self.cells.add_merged_region(*range);
        Ok(())
    }

    pub fn merged_region_at(&self, row: u32, col: u16) -> Option<&CellRange> {
        self.cells.merged_region_at(row, col)
    }

    pub fn cell_count(&self) -> usize {
        self.cells.cell_count()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Stored cells, row by row
    pub fn iter_cells(&self) -> impl Iterator<Item = (u32, u16, &CellData)> {
        self.cells.iter()
    }
}

fn check_position(row: u32, col: u16) -> Result<()> {
    if row >= MAX_ROWS {
        Err(Error::RowOutOfRange {
            row,
            last: MAX_ROWS - 1,
        })
    } else if col >= MAX_COLS {
        Err(Error::ColumnOutOfRange {
            col,
            last: MAX_COLS - 1,
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{Color, Fill};

    #[test]
    fn test_values_and_styles() {
        let mut ws = Worksheet::new("Data");
        ws.set_cell_value_at(1, 1, 25).unwrap();
        ws.set_cell_style_at(1, 1, &Style::new().fill_color(Color::LIGHT_GRAY))
            .unwrap();

        assert_eq!(ws.get_value_at(1, 1), CellValue::Number(25.0));
        assert_eq!(
            ws.cell_style_at(1, 1).map(|s| s.fill.clone()),
            Some(Fill::solid(Color::LIGHT_GRAY))
        );
        assert!(ws.cell_style_at(0, 0).is_none());
        assert_eq!(ws.get_value_at(9, 9), CellValue::Empty);
        assert_eq!(ws.cell_count(), 1);
    }

    #[test]
    fn test_position_validation() {
        let mut ws = Worksheet::new("Data");
        assert!(matches!(
            ws.set_cell_value_at(MAX_ROWS, 0, 1),
            Err(Error::RowOutOfRange { .. })
        ));
        assert!(matches!(
            ws.set_cell_value_at(0, MAX_COLS, 1),
            Err(Error::ColumnOutOfRange { .. })
        ));
        assert!(ws.is_empty());
    }

    #[test]
    fn test_merge_conflicts() {
        let mut ws = Worksheet::new("Data");
        ws.merge_cells(&CellRange::parse("A1:A2").unwrap()).unwrap();
        ws.merge_cells(&CellRange::parse("B1:C1").unwrap()).unwrap();

        let err = ws.merge_cells(&CellRange::parse("C1:D1").unwrap());
        assert!(matches!(err, Err(Error::MergeOverlap { .. })));

        assert_eq!(
            ws.merged_region_at(1, 0).map(|r| r.to_string()),
            Some("A1:A2".to_string())
        );
        assert!(ws.merged_region_at(1, 1).is_none());
        assert_eq!(ws.merged_regions().len(), 2);
    }

    #[test]
    fn test_last_row_and_col() {
        let mut ws = Worksheet::new("Data");
        assert_eq!(ws.last_row(), None);

        ws.set_cell_value_at(0, 2, "Age").unwrap();
        ws.set_cell_value_at(4, 0, "x").unwrap();

        assert_eq!(ws.last_row(), Some(4));
        assert_eq!(ws.last_col_in_row(0), Some(2));
        assert_eq!(
            ws.iter_cells().map(|(r, c, _)| (r, c)).collect::<Vec<_>>(),
            vec![(0, 2), (4, 0)]
        );
    }
}
