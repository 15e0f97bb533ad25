//! In-memory workbook model used by sheetmap.
//!
//! Sheets hold sparse cells ([`CellValue`] plus an interned [`Style`]) and
//! merged regions. Positions are zero-based; [`CellAddress`] converts to
//! and from A1 references. Reading and writing files lives in
//! `sheetmap-xlsx`.
//!
//! ```rust
//! use sheetmap_core::{CellRange, CellValue, Workbook};
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//!
//! sheet.set_cell_value_at(0, 0, "Basic").unwrap();
//! sheet.merge_cells(&CellRange::from_indices(0, 0, 0, 1)).unwrap();
//! sheet.set_cell_value_at(1, 0, CellValue::Number(25.0)).unwrap();
//!
//! assert_eq!(sheet.merged_region_at(0, 1).unwrap().to_string(), "A1:B1");
//! ```

pub mod cell;
pub mod error;
pub mod style;
pub mod workbook;
pub mod worksheet;

pub use cell::{
    datetime_to_serial, serial_to_datetime, CellAddress, CellData, CellError, CellRange,
    CellValue,
};
pub use error::{Error, Result};
pub use workbook::{Workbook, WorkbookSettings};
pub use worksheet::Worksheet;

pub use style::{
    Alignment, BorderEdge, BorderLineStyle, BorderStyle, Color, Fill, Font,
    HorizontalAlignment, NumberFormat, Style, StylePool, VerticalAlignment,
};

/// Rows per sheet in the xlsx format
pub const MAX_ROWS: u32 = 1 << 20;

/// Columns per sheet, `A` through `XFD`
pub const MAX_COLS: u16 = 1 << 14;

/// Longest sheet name a spreadsheet application accepts
pub const MAX_SHEET_NAME_LEN: usize = 31;
