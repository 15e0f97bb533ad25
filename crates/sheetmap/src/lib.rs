//! # sheetmap
//!
//! Schema-driven mapping between spreadsheet rows and typed records.
//!
//! A schema is a list of [`ColumnSpec`]s: each names a field, the column it
//! lives in, and the path of header labels above it. From a schema sheetmap
//! can
//!
//! - lay out a multi-row header block with merged cells ([`HeaderLayout`])
//! - recover the column of every field from an existing header
//!   ([`match_template`])
//! - convert rows to records and back with fixed coercion and rounding
//!   rules ([`RowCodec`], [`Value`], [`FieldType`])
//! - run bulk reads and writes over `.xlsx` files ([`TableReader`],
//!   [`TableWriter`])
//!
//! ## Example
//!
//! ```rust
//! use sheetmap::prelude::*;
//! use once_cell::sync::Lazy;
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Person {
//!     id: i32,
//!     name: String,
//!     age: i32,
//! }
//!
//! static PERSON: Lazy<FieldTable<Person>> = Lazy::new(|| {
//!     FieldTable::builder()
//!         .field("id", |p: &Person| p.id, |p, v| p.id = v)
//!         .column(0, ["ID"])
//!         .field("name", |p: &Person| p.name.clone(), |p, v| p.name = v)
//!         .column(1, ["Basic", "Name"])
//!         .field("age", |p: &Person| p.age, |p, v| p.age = v)
//!         .column(2, ["Basic", "Age"])
//!         .build()
//! });
//!
//! impl Record for Person {
//!     fn field_table() -> &'static FieldTable<Self> {
//!         &PERSON
//!     }
//! }
//!
//! let people = vec![Person { id: 1, name: "Ada".into(), age: 36 }];
//!
//! let mut writer = TableWriter::new();
//! writer.write(&people).unwrap();
//! let mut bytes = std::io::Cursor::new(Vec::new());
//! writer.write_to(&mut bytes).unwrap();
//!
//! bytes.set_position(0);
//! let mut reader = TableReader::from_reader(bytes).unwrap();
//! let back: Vec<Person> = reader.read().unwrap();
//! assert_eq!(back, people);
//! ```

pub mod codec;
pub mod config;
pub mod converter;
pub mod error;
pub mod field;
pub mod header;
pub mod prelude;
pub mod schema;
pub mod session;
pub mod table;
pub mod template;
pub mod value;

pub use codec::{DataStyles, MapCodec, MapRecord, RowCodec};
pub use config::{SessionConfig, DEFAULT_DATE_FORMAT, DEFAULT_MAX_ROWS};
pub use converter::{CellRef, CellSlot, ConverterRegistry, Converters};
pub use error::{Error, ErrorKind, Result};
pub use field::{coerce, FieldKind, FieldType, FieldValue};
pub use header::{header_row_count, header_style, HeaderLayout, MergeRegion};
pub use schema::{column_spec_list, ColumnFieldMap, ColumnSpec, Schema, SchemaProvider};
pub use session::{SheetRef, TableReader, TableWriter};
pub use table::{FieldAccessor, FieldTable, FieldTableBuilder, Record};
pub use template::{effective_label, match_template, TemplateMatch};
pub use value::{decode_cell, Value, DECIMAL_PRECISION};

// Re-export the workbook model
pub use sheetmap_core::{CellAddress, CellRange, CellValue, Style, Workbook, Worksheet};
pub use sheetmap_xlsx::{XlsxError, XlsxReader, XlsxWriter};

use std::path::Path;

/// Extension trait for Workbook to add file I/O
pub trait WorkbookExt {
    /// Open a workbook from an `.xlsx` file
    fn open<P: AsRef<Path>>(path: P) -> Result<Workbook>;

    /// Save the workbook to an `.xlsx` file
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()>;
}

impl WorkbookExt for Workbook {
    fn open<P: AsRef<Path>>(path: P) -> Result<Workbook> {
        let path = path.as_ref();
        session::check_extension(path)?;
        Ok(XlsxReader::read_file(path)?)
    }

    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        session::check_extension(path)?;
        Ok(XlsxWriter::write_file(self, path)?)
    }
}
