//! Sparse, row-major cell storage.
//!
//! A sheet keeps only cells that carry a value or a non-default style.
//! Rows and columns live in nested `BTreeMap`s, so walking the storage
//! visits cells in the order they are written to `sheetData`.

use std::collections::BTreeMap;

use super::{CellAddress, CellRange, CellValue};
use crate::style::StylePool;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellData {
    pub value: CellValue,
    /// Slot in the sheet's [`StylePool`]; 0 is the default style
    pub style_index: u32,
}

impl CellData {
    /// Nothing worth storing
    pub fn is_empty(&self) -> bool {
        self.value.is_empty() && self.style_index == 0
    }
}

type Row = BTreeMap<u16, CellData>;

/// Cells, styles and merges of one worksheet
#[derive(Debug, Default)]
pub struct CellStorage {
    rows: BTreeMap<u32, Row>,
    style_pool: StylePool,
    merged_regions: Vec<CellRange>,
}

impl CellStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, row: u32, col: u16) -> Option<&CellData> {
        self.rows.get(&row)?.get(&col)
    }

    /// Store `data`; empty data deletes the cell instead
    pub fn set(&mut self, row: u32, col: u16, data: CellData) {
        if data.is_empty() {
            self.remove(row, col);
        } else {
            self.rows.entry(row).or_default().insert(col, data);
        }
    }

    /// Replace the value, keep the style
    pub fn set_value(&mut self, row: u32, col: u16, value: CellValue) {
        let style_index = self.get(row, col).map_or(0, |cell| cell.style_index);
        self.set(row, col, CellData { value, style_index });
    }

    /// Replace the style, keep the value
    pub fn set_style(&mut self, row: u32, col: u16, style_index: u32) {
        let value = self
            .get(row, col)
            .map(|cell| cell.value.clone())
            .unwrap_or_default();
        self.set(row, col, CellData { value, style_index });
    }

    pub fn remove(&mut self, row: u32, col: u16) -> Option<CellData> {
        let cells = self.rows.get_mut(&row)?;
        let removed = cells.remove(&col);
        if cells.is_empty() {
            self.rows.remove(&row);
        }
        removed
    }

    pub fn cell_count(&self) -> usize {
        self.rows.values().map(Row::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last_row(&self) -> Option<u32> {
        self.rows.keys().next_back().copied()
    }

    pub fn last_col_in_row(&self, row: u32) -> Option<u16> {
        self.rows.get(&row)?.keys().next_back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, u16, &CellData)> {
        self.rows
            .iter()
            .flat_map(|(&row, cells)| cells.iter().map(move |(&col, data)| (row, col, data)))
    }

    pub fn merged_regions(&self) -> &[CellRange] {
        &self.merged_regions
    }

    /// Callers check overlaps first
    pub fn add_merged_region(&mut self, range: CellRange) {
        self.merged_regions.push(range);
    }

    pub fn merged_region_at(&self, row: u32, col: u16) -> Option<&CellRange> {
        let addr = CellAddress::new(row, col);
        self.merged_regions.iter().find(|range| range.contains(&addr))
    }

    pub fn style_pool(&self) -> &StylePool {
        &self.style_pool
    }

    pub fn style_pool_mut(&mut self) -> &mut StylePool {
        &mut self.style_pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(n: f64) -> CellData {
        CellData {
            value: CellValue::Number(n),
            style_index: 0,
        }
    }

    #[test]
    fn test_set_and_get() {
        let mut storage = CellStorage::new();
        storage.set(0, 0, number(42.0));
        assert_eq!(storage.get(0, 0).and_then(|c| c.value.as_number()), Some(42.0));
        assert!(storage.get(1, 1).is_none());
    }

    #[test]
    fn test_empty_cells_are_dropped() {
        let mut storage = CellStorage::new();
        storage.set(0, 0, number(42.0));
        assert_eq!(storage.cell_count(), 1);

        storage.set_value(0, 0, CellValue::Empty);
        assert_eq!(storage.cell_count(), 0);
        assert!(storage.is_empty());
    }

    #[test]
    fn test_style_only_cell_is_kept() {
        let mut storage = CellStorage::new();
        storage.set_style(2, 3, 1);
        assert_eq!(storage.get(2, 3).unwrap().style_index, 1);

        storage.set_value(2, 3, CellValue::Boolean(true));
        assert_eq!(
            storage.get(2, 3),
            Some(&CellData {
                value: CellValue::Boolean(true),
                style_index: 1
            })
        );
    }

    #[test]
    fn test_last_positions() {
        let mut storage = CellStorage::new();
        assert_eq!(storage.last_row(), None);

        storage.set(5, 3, number(1.0));
        storage.set(10, 7, number(2.0));
        storage.set(2, 1, number(3.0));

        assert_eq!(storage.last_row(), Some(10));
        assert_eq!(storage.last_col_in_row(5), Some(3));
        assert_eq!(storage.last_col_in_row(6), None);
        let rows: Vec<u32> = storage.iter().map(|(row, _, _)| row).collect();
        assert_eq!(rows, vec![2, 5, 10]);
    }

    #[test]
    fn test_merged_region_lookup() {
        let mut storage = CellStorage::new();
        storage.add_merged_region(CellRange::from_indices(0, 1, 0, 2));

        assert_eq!(
            storage.merged_region_at(0, 2),
            Some(&CellRange::from_indices(0, 1, 0, 2))
        );
        assert!(storage.merged_region_at(1, 1).is_none());
        assert_eq!(storage.merged_regions().len(), 1);
    }
}
