//! Cell-related types
//!
//! - [`CellValue`] - the raw value stored in a cell
//! - [`CellAddress`] - a zero-based (row, col) position, ordered row-major
//! - [`CellRange`] - an inclusive rectangle of cells
//! - [`CellData`] - value plus style index, as held by [`CellStorage`]

mod address;
mod date;
mod storage;
mod value;

pub use address::{CellAddress, CellRange};
pub use date::{datetime_to_serial, serial_to_datetime};
pub use storage::{CellData, CellStorage};
pub use value::{CellError, CellValue};
