//! Session configuration

use sheetmap_core::Style;

use crate::header::header_style;

/// Default cap on the number of records per read or write
pub const DEFAULT_MAX_ROWS: usize = 100_000;

/// Default number format of timestamp cells
pub const DEFAULT_DATE_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Settings shared by [`TableReader`](crate::TableReader) and
/// [`TableWriter`](crate::TableWriter)
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Most records a single read or write may handle
    pub max_rows: usize,
    /// Release the workbook and files as soon as an operation completes
    pub auto_release: bool,
    /// Style of generated header cells
    pub header_style: Style,
    /// Whether writes emit a header block above the data
    pub write_header: bool,
    /// Number format for timestamp cells without a column format
    pub date_format: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
            auto_release: true,
            header_style: header_style(),
            write_header: true,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn with_auto_release(mut self, auto_release: bool) -> Self {
        self.auto_release = auto_release;
        self
    }

    pub fn with_header_style(mut self, style: Style) -> Self {
        self.header_style = style;
        self
    }

    pub fn with_write_header(mut self, write_header: bool) -> Self {
        self.write_header = write_header;
        self
    }

    pub fn with_date_format<S: Into<String>>(mut self, format: S) -> Self {
        self.date_format = format.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_builders() {
        let config = SessionConfig::default();
        assert_eq!(config.max_rows, 100_000);
        assert!(config.auto_release);
        assert!(config.write_header);
        assert_eq!(config.date_format, "yyyy-mm-dd hh:mm:ss");

        let config = SessionConfig::new()
            .with_max_rows(10)
            .with_auto_release(false)
            .with_write_header(false)
            .with_date_format("dd/mm/yyyy");
        assert_eq!(config.max_rows, 10);
        assert!(!config.auto_release);
        assert!(!config.write_header);
        assert_eq!(config.date_format, "dd/mm/yyyy");
    }
}
