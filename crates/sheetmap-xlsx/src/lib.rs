//! # sheetmap-xlsx
//!
//! XLSX (Office Open XML) reader and writer for the sheetmap workbook model.
//!
//! Only the parts of the format the mapping engine relies on are covered:
//! cell values (shared and inline strings, numbers, booleans, errors,
//! formulas with cached results), merged regions, the 1904 date flag, and
//! cell styles (number formats, fonts, solid fills, borders, alignment).

pub mod error;
pub mod reader;
pub mod writer;

mod styles;

pub use error::{XlsxError, XlsxResult};
pub use reader::XlsxReader;
pub use writer::XlsxWriter;
