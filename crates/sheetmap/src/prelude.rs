//! Prelude module - common imports for sheetmap users
//!
//! ```rust
//! use sheetmap::prelude::*;
//! ```

pub use crate::{
    // Schema types
    ColumnFieldMap,
    ColumnSpec,
    // Conversion
    CellRef,
    CellSlot,
    FieldKind,
    FieldTable,
    FieldType,
    FieldValue,
    MapRecord,
    Record,
    Schema,
    SchemaProvider,
    Value,

    // Layout and matching
    HeaderLayout,
    MergeRegion,
    TemplateMatch,

    // Sessions
    SessionConfig,
    SheetRef,
    TableReader,
    TableWriter,

    // Error types
    Error,
    ErrorKind,
    Result,

    // Workbook model
    Workbook,
    WorkbookExt,
    Worksheet,
};
