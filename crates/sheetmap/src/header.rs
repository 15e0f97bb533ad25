//! Header block layout
//!
//! Turns column specs into a possibly multi-row header. Each exported spec
//! contributes one label per header row; equal labels on touching cells are
//! merged into rectangular regions, and every region is anchored at its
//! top-left cell.

use std::collections::{BTreeMap, BTreeSet};

use sheetmap_core::{
    BorderLineStyle, BorderStyle, CellAddress, CellRange, Color, HorizontalAlignment, Style,
    VerticalAlignment, Worksheet,
};

use crate::error::Result;
use crate::schema::{check_unique_columns, exported, ColumnSpec};

/// A rectangle of header cells showing one label
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MergeRegion {
    pub top_left: CellAddress,
    pub bottom_right: CellAddress,
    pub label: String,
}

impl MergeRegion {
    /// A one-cell region is a plain placement, not a merge
    pub fn is_single_cell(&self) -> bool {
        self.top_left == self.bottom_right
    }

    /// The region as a sheet range, shifted down by `row_offset`
    pub fn to_range(&self, row_offset: u32) -> CellRange {
        CellRange::from_indices(
            self.top_left.row + row_offset,
            self.top_left.col,
            self.bottom_right.row + row_offset,
            self.bottom_right.col,
        )
    }

    pub fn contains(&self, addr: &CellAddress) -> bool {
        (self.top_left.row..=self.bottom_right.row).contains(&addr.row)
            && (self.top_left.col..=self.bottom_right.col).contains(&addr.col)
    }
}

/// Header positions grouped by label, labels in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelCells {
    entries: Vec<(String, BTreeSet<CellAddress>)>,
}

impl LabelCells {
    fn add(&mut self, label: &str, addr: CellAddress) {
        match self.entries.iter_mut().find(|(l, _)| l == label) {
            Some((_, cells)) => {
                cells.insert(addr);
            }
            None => self
                .entries
                .push((label.to_string(), BTreeSet::from([addr]))),
        }
    }

    /// Positions recorded under `label`
    pub fn cells(&self, label: &str) -> Option<&BTreeSet<CellAddress>> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, cells)| cells)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<CellAddress>)> {
        self.entries.iter().map(|(l, cells)| (l.as_str(), cells))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Number of header rows: the longest label path among exported specs.
/// With nothing exported there is one implicit row; exported specs without
/// labels give zero.
pub fn header_row_count(specs: &[ColumnSpec]) -> u32 {
    exported(specs)
        .map(|(_, spec)| spec.labels().len())
        .max()
        .map_or(1, |n| u32::try_from(n).unwrap_or(u32::MAX))
}

/// Record every header position under the label it shows
pub fn build_label_cells(specs: &[ColumnSpec]) -> LabelCells {
    let rows = header_row_count(specs);
    let mut cells = LabelCells::default();
    for (col, spec) in exported(specs) {
        for row in 0..rows {
            if let Some(label) = spec.label_at(row as usize) {
                cells.add(label, CellAddress::new(row, col));
            }
        }
    }
    cells
}

/// Partition each label's positions into non-overlapping rectangles.
///
/// Positions first split into bands of consecutive rows, then each band into
/// runs of adjacent columns. A run whose bounding box is fully covered is
/// one region. Otherwise the run is cut into per-column vertical strips and
/// neighbouring strips with the same row span are joined. Output is sorted
/// by top row, then left column.
pub fn resolve_regions(cells: &LabelCells) -> Vec<MergeRegion> {
    let mut regions = Vec::new();
    for (label, positions) in cells.iter() {
        for band in row_bands(positions) {
            for run in column_runs(&band) {
                push_run_regions(label, &run, &mut regions);
            }
        }
    }
    regions.sort_by_key(|r| (r.top_left.row, r.top_left.col));
    regions
}

/// Split into groups of consecutive rows
fn row_bands(positions: &BTreeSet<CellAddress>) -> Vec<Vec<CellAddress>> {
    let mut bands: Vec<Vec<CellAddress>> = Vec::new();
    let mut last_row: Option<u32> = None;
    // row-major iteration keeps rows ascending
    for addr in positions {
        let joins = last_row.map_or(false, |last| addr.row <= last + 1);
        match bands.last_mut() {
            Some(band) if joins => band.push(*addr),
            _ => bands.push(vec![*addr]),
        }
        last_row = Some(addr.row);
    }
    bands
}

/// Split a band into groups of equal-or-adjacent columns
fn column_runs(band: &[CellAddress]) -> Vec<Vec<CellAddress>> {
    let mut sorted = band.to_vec();
    sorted.sort_by_key(|a| (a.col, a.row));

    let mut runs: Vec<Vec<CellAddress>> = Vec::new();
    let mut last_col: Option<u16> = None;
    for addr in sorted {
        let joins = last_col.map_or(false, |last| addr.col == last || addr.col == last + 1);
        match runs.last_mut() {
            Some(run) if joins => run.push(addr),
            _ => runs.push(vec![addr]),
        }
        last_col = Some(addr.col);
    }
    runs
}

fn push_run_regions(label: &str, run: &[CellAddress], regions: &mut Vec<MergeRegion>) {
    let region = |top: u32, left: u16, bottom: u32, right: u16| MergeRegion {
        top_left: CellAddress::new(top, left),
        bottom_right: CellAddress::new(bottom, right),
        label: label.to_string(),
    };

    let (Some(top), Some(bottom), Some(left), Some(right)) = (
        run.iter().map(|a| a.row).min(),
        run.iter().map(|a| a.row).max(),
        run.iter().map(|a| a.col).min(),
        run.iter().map(|a| a.col).max(),
    ) else {
        return;
    };

    let area = u64::from(bottom - top + 1) * u64::from(right - left + 1);
    if area == run.len() as u64 {
        regions.push(region(top, left, bottom, right));
        return;
    }

    // vertical strips per column, keyed by column
    let mut strips: BTreeMap<u16, Vec<(u32, u32)>> = BTreeMap::new();
    for addr in run {
        let col_strips = strips.entry(addr.col).or_default();
        match col_strips.last_mut() {
            Some((_, end)) if addr.row == *end + 1 => *end = addr.row,
            _ => col_strips.push((addr.row, addr.row)),
        }
    }

    // join strips with an identical span in the column to the left
    let mut open: Vec<(u32, u32, u16, u16)> = Vec::new();
    for (col, col_strips) in strips {
        for (start, end) in col_strips {
            match open
                .iter_mut()
                .find(|(s, e, _, right)| *s == start && *e == end && *right + 1 == col)
            {
                Some(rect) => rect.3 = col,
                None => open.push((start, end, col, col)),
            }
        }
    }
    regions.extend(
        open.into_iter()
            .map(|(top, bottom, left, right)| region(top, left, bottom, right)),
    );
}

/// The default header look: centered bold 12pt text on a grey fill with
/// thin black borders
pub fn header_style() -> Style {
    Style::new()
        .bold(true)
        .font_size(12.0)
        .fill_color(Color::LIGHT_GRAY)
        .border(BorderStyle::all(BorderLineStyle::Thin, Color::BLACK))
        .horizontal_alignment(HorizontalAlignment::Center)
        .vertical_alignment(VerticalAlignment::Center)
}

/// A computed header block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLayout {
    row_count: u32,
    regions: Vec<MergeRegion>,
}

impl HeaderLayout {
    /// Lay out the exported specs. Two specs may not share a column.
    pub fn build(specs: &[ColumnSpec]) -> Result<Self> {
        check_unique_columns(specs)?;
        let row_count = header_row_count(specs);
        let regions = resolve_regions(&build_label_cells(specs));
        tracing::debug!(
            rows = row_count,
            regions = regions.len(),
            "computed header layout"
        );
        Ok(Self { row_count, regions })
    }

    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    pub fn regions(&self) -> &[MergeRegion] {
        &self.regions
    }

    /// Label text at each region's anchor
    pub fn placements(&self) -> impl Iterator<Item = (CellAddress, &str)> {
        self.regions
            .iter()
            .map(|r| (r.top_left, r.label.as_str()))
    }

    /// Write the block onto `sheet` starting at `first_row`.
    ///
    /// Every header cell gets `style`, labels go to the anchors, and
    /// multi-cell regions are merged.
    pub fn render(&self, sheet: &mut Worksheet, first_row: u32, style: &Style) -> Result<()> {
        for region in &self.regions {
            let range = region.to_range(first_row);
            for addr in range.cells() {
                sheet.set_cell_style_at(addr.row, addr.col, style)?;
            }
            sheet.set_cell_value_at(range.start.row, range.start.col, region.label.as_str())?;
            if !region.is_single_cell() {
                sheet.merge_cells(&range)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use sheetmap_core::CellValue;

    fn people() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::new(0, "id", ["ID"]),
            ColumnSpec::new(1, "name", ["Basic", "Name"]),
            ColumnSpec::new(2, "age", ["Basic", "Age"]),
        ]
    }

    fn spans(layout: &HeaderLayout) -> Vec<(String, String)> {
        layout
            .regions()
            .iter()
            .map(|r| (r.label.clone(), r.to_range(0).to_string()))
            .collect()
    }

    #[test]
    fn test_two_level_header() {
        let layout = HeaderLayout::build(&people()).unwrap();

        assert_eq!(layout.row_count(), 2);
        assert_eq!(
            spans(&layout),
            vec![
                ("ID".to_string(), "A1:A2".to_string()),
                ("Basic".to_string(), "B1:C1".to_string()),
                ("Name".to_string(), "B2".to_string()),
                ("Age".to_string(), "C2".to_string()),
            ]
        );
        let anchors: Vec<_> = layout.placements().map(|(a, l)| (a.to_a1_string(), l)).collect();
        assert_eq!(anchors[1], ("B1".to_string(), "Basic"));
    }

    #[test]
    fn test_empty_and_hidden_specs() {
        assert_eq!(header_row_count(&[]), 1);

        let specs = vec![
            ColumnSpec::new(0, "id", ["ID"]),
            ColumnSpec::new(-1, "secret", ["A", "B", "C"]),
        ];
        assert_eq!(header_row_count(&specs), 1);
        let layout = HeaderLayout::build(&specs).unwrap();
        assert_eq!(layout.regions().len(), 1);
    }

    #[test]
    fn test_unlabelled_specs_have_no_header_rows() {
        let specs = vec![ColumnSpec::new(0, "a", Vec::<String>::new())];
        assert_eq!(header_row_count(&specs), 0);

        let layout = HeaderLayout::build(&specs).unwrap();
        assert_eq!(layout.row_count(), 0);
        assert!(layout.regions().is_empty());
    }

    #[test]
    fn test_same_label_apart_is_not_merged() {
        let specs = vec![
            ColumnSpec::new(0, "a", ["Total"]),
            ColumnSpec::new(1, "b", ["Other"]),
            ColumnSpec::new(2, "c", ["Total"]),
        ];
        let layout = HeaderLayout::build(&specs).unwrap();
        assert_eq!(
            spans(&layout),
            vec![
                ("Total".to_string(), "A1".to_string()),
                ("Other".to_string(), "B1".to_string()),
                ("Total".to_string(), "C1".to_string()),
            ]
        );
    }

    #[test]
    fn test_ragged_label_splits_into_rectangles() {
        // "X" covers A1, A2 and B1: not a rectangle
        let specs = vec![
            ColumnSpec::new(0, "a", ["X"]),
            ColumnSpec::new(1, "b", ["X", "Y"]),
        ];
        let layout = HeaderLayout::build(&specs).unwrap();
        assert_eq!(
            spans(&layout),
            vec![
                ("X".to_string(), "A1:A2".to_string()),
                ("X".to_string(), "B1".to_string()),
                ("Y".to_string(), "B2".to_string()),
            ]
        );
    }

    #[test]
    fn test_shared_column_rejected() {
        let specs = vec![
            ColumnSpec::new(0, "a", ["A"]),
            ColumnSpec::new(0, "b", ["B"]),
        ];
        assert!(HeaderLayout::build(&specs).is_err());
    }

    #[test]
    fn test_render() {
        let mut sheet = Worksheet::new("People");
        let layout = HeaderLayout::build(&people()).unwrap();
        layout.render(&mut sheet, 0, &header_style()).unwrap();

        assert_eq!(sheet.get_value_at(0, 0), CellValue::string("ID"));
        assert_eq!(sheet.get_value_at(1, 0), CellValue::Empty);
        assert_eq!(sheet.get_value_at(0, 1), CellValue::string("Basic"));
        assert_eq!(sheet.get_value_at(1, 2), CellValue::string("Age"));
        let merges: Vec<String> = sheet.merged_regions().iter().map(|r| r.to_string()).collect();
        assert_eq!(merges, vec!["A1:A2", "B1:C1"]);
        assert_eq!(sheet.cell_style_at(1, 0), Some(&header_style()));
        assert_eq!(sheet.cell_style_at(0, 2), Some(&header_style()));
    }

    fn arb_specs() -> impl Strategy<Value = Vec<ColumnSpec>> {
        // small label alphabet so that equal neighbours are common
        prop::collection::vec(
            prop::collection::vec(prop::sample::select(vec!["A", "B", "C"]), 1..4),
            1..8,
        )
        .prop_map(|paths| {
            paths
                .into_iter()
                .enumerate()
                .map(|(i, labels)| ColumnSpec::new(i as i32, format!("f{}", i), labels))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_row_count_is_longest_path(specs in arb_specs()) {
            let longest = specs.iter().map(|s| s.labels().len()).max().unwrap_or(1);
            prop_assert_eq!(header_row_count(&specs) as usize, longest);
        }

        #[test]
        fn prop_regions_tile_the_header(specs in arb_specs()) {
            let layout = HeaderLayout::build(&specs).unwrap();
            let rows = layout.row_count();

            // every header cell is covered by exactly one region showing
            // the label of that cell
            for (col, spec) in specs.iter().enumerate() {
                for row in 0..rows {
                    let addr = CellAddress::new(row, col as u16);
                    let covering: Vec<_> = layout
                        .regions()
                        .iter()
                        .filter(|r| r.contains(&addr))
                        .collect();
                    prop_assert_eq!(covering.len(), 1);
                    prop_assert_eq!(Some(covering[0].label.as_str()), spec.label_at(row as usize));
                }
            }
        }

        #[test]
        fn prop_rectangle_yields_one_region(
            width in 1u16..6,
            height in 1usize..4,
            offset in 0u16..4,
        ) {
            let specs: Vec<ColumnSpec> = (0..width)
                .map(|i| {
                    ColumnSpec::new(
                        i32::from(offset + i),
                        format!("f{}", i),
                        vec!["Block"; height],
                    )
                })
                .collect();
            let layout = HeaderLayout::build(&specs).unwrap();
            prop_assert_eq!(layout.regions().len(), 1);
            let region = &layout.regions()[0];
            prop_assert_eq!(region.top_left, CellAddress::new(0, offset));
            prop_assert_eq!(
                region.bottom_right,
                CellAddress::new(height as u32 - 1, offset + width - 1)
            );
        }

        #[test]
        fn prop_gap_splits_regions(gap in 2u16..10) {
            let specs = vec![
                ColumnSpec::new(0, "a", ["Same"]),
                ColumnSpec::new(i32::from(gap), "b", ["Same"]),
            ];
            let layout = HeaderLayout::build(&specs).unwrap();
            prop_assert_eq!(layout.regions().len(), 2);
            prop_assert!(layout.regions().iter().all(MergeRegion::is_single_cell));
        }
    }
}
