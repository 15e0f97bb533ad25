//! Error types for the mapping engine

use thiserror::Error;

use crate::field::FieldType;

/// Result type alias for mapping operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while laying out, matching, reading or writing tables
#[derive(Error, Debug)]
pub enum Error {
    /// Bad arguments, raised before anything is mutated
    #[error("validation error: {0}")]
    Validation(String),

    /// Header or accessor structure does not fit the schema
    #[error("structural error: {0}")]
    Structural(String),

    /// Decoded cell value does not fit the field's declared type
    #[error("type mismatch for field '{field}': expected {expected}, found {actual}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        actual: &'static str,
    },

    /// I/O failure opening, saving or releasing files and streams
    #[error("{context}: {source}")]
    Resource {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error from the workbook model
    #[error(transparent)]
    Engine(#[from] sheetmap_core::Error),
}

/// Coarse classification of [`Error`] for programmatic matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Structural,
    TypeMismatch,
    Resource,
    Engine,
}

impl Error {
    /// Create a validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Error::Validation(msg.into())
    }

    /// Create a structural error
    pub fn structural<S: Into<String>>(msg: S) -> Self {
        Error::Structural(msg.into())
    }

    /// Wrap an I/O-level failure with what was being attempted
    pub fn resource<S, E>(context: S, source: E) -> Self
    where
        S: Into<String>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::Resource {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Which class of error this is
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Structural(_) => ErrorKind::Structural,
            Error::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Error::Resource { .. } => ErrorKind::Resource,
            Error::Engine(_) => ErrorKind::Engine,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::resource("i/o failure", err)
    }
}

impl From<sheetmap_xlsx::XlsxError> for Error {
    fn from(err: sheetmap_xlsx::XlsxError) -> Self {
        match err {
            sheetmap_xlsx::XlsxError::Core(core) => Error::Engine(core),
            other => Error::resource("xlsx codec", other),
        }
    }
}
