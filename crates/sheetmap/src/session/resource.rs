//! Ordered, run-once release of everything a session holds

use std::fs::File;
use std::path::Path;

use sheetmap_core::Workbook;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Workbook, source stream and template copy of one session
#[derive(Debug)]
pub(crate) struct SessionResources {
    workbook: Option<Workbook>,
    stream: Option<File>,
    temp: Option<NamedTempFile>,
    released: bool,
}

impl SessionResources {
    pub(crate) fn new(workbook: Workbook) -> Self {
        Self {
            workbook: Some(workbook),
            stream: None,
            temp: None,
            released: false,
        }
    }

    /// Keep the file the workbook was read from open until release
    pub(crate) fn with_stream(mut self, stream: File) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Own a temporary copy; it is deleted on release
    pub(crate) fn with_temp(mut self, temp: NamedTempFile) -> Self {
        self.temp = Some(temp);
        self
    }

    /// Path of the temporary copy, while it exists
    pub(crate) fn temp_path(&self) -> Option<&Path> {
        self.temp.as_ref().map(NamedTempFile::path)
    }

    pub(crate) fn is_released(&self) -> bool {
        self.released
    }

    pub(crate) fn workbook(&self) -> Result<&Workbook> {
        self.workbook.as_ref().ok_or_else(released)
    }

    pub(crate) fn workbook_mut(&mut self) -> Result<&mut Workbook> {
        self.workbook.as_mut().ok_or_else(released)
    }

    /// Drop the workbook, then close the stream, then delete the temp file.
    ///
    /// Runs once; later calls return `Ok`. Every step runs even when an
    /// earlier one failed, and the first failure is returned.
    pub(crate) fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let mut first_error: Option<Error> = None;
        drop(self.workbook.take());

        if let Some(stream) = self.stream.take() {
            // read-only handles have nothing to flush; closing is dropping
            drop(stream);
        }

        if let Some(temp) = self.temp.take() {
            let path = temp.path().to_path_buf();
            if let Err(err) = temp.close() {
                tracing::warn!(path = %path.display(), error = %err, "failed to remove template copy");
                first_error.get_or_insert(Error::resource(
                    format!("removing template copy {}", path.display()),
                    err,
                ));
            }
        }

        tracing::debug!("session resources released");
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl Drop for SessionResources {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            tracing::warn!(error = %err, "release on drop failed");
        }
    }
}

fn released() -> Error {
    Error::validation("session already released")
}
