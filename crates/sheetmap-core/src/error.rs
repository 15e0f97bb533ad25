//! Workbook model errors

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A1 reference that does not parse
    #[error("bad cell reference: {0}")]
    InvalidAddress(String),

    #[error("row {row} is past the last row {last}")]
    RowOutOfRange { row: u32, last: u32 },

    #[error("column {col} is past the last column {last}")]
    ColumnOutOfRange { col: u16, last: u16 },

    #[error("no sheet at index {index} ({count} sheets)")]
    NoSuchSheet { index: usize, count: usize },

    /// Empty, too long, or containing a reserved character
    #[error("bad sheet name: {0}")]
    InvalidSheetName(String),

    /// Names compare case-insensitively
    #[error("a sheet named '{0}' already exists")]
    DuplicateSheetName(String),

    #[error("merge {range} overlaps existing merge {existing}")]
    MergeOverlap { range: String, existing: String },
}
