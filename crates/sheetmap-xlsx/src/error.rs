//! Package-level failures of the XLSX codec

use thiserror::Error;

pub type XlsxResult<T> = std::result::Result<T, XlsxError>;

#[derive(Debug, Error)]
pub enum XlsxError {
    #[error("xlsx i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("xlsx container: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("xlsx markup: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The package does not look like SpreadsheetML at all
    #[error("not an xlsx workbook: {0}")]
    InvalidFormat(String),

    /// A part the relationships point at is absent
    #[error("xlsx part {0} is missing")]
    MissingPart(String),

    /// Well-formed XML carrying a value that cannot be used
    #[error("{part}: {message}")]
    Parse { part: String, message: String },

    #[error(transparent)]
    Core(#[from] sheetmap_core::Error),
}
