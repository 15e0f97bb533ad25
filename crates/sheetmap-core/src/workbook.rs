//! The workbook: an ordered list of sheets plus the date system

use crate::error::{Error, Result};
use crate::worksheet::Worksheet;
use crate::MAX_SHEET_NAME_LEN;

/// Characters a sheet name may not contain
const RESERVED_CHARS: [char; 7] = [':', '\\', '/', '?', '*', '[', ']'];

#[derive(Debug)]
pub struct Workbook {
    worksheets: Vec<Worksheet>,
    settings: WorkbookSettings,
}

/// Workbook-wide flags read from and written to `workbook.xml`
#[derive(Debug, Clone, Default)]
pub struct WorkbookSettings {
    /// Serials count from 1904-01-01 instead of 1899-12-30
    pub date_1904: bool,
}

impl Workbook {
    /// One empty sheet named `Sheet1`
    pub fn new() -> Self {
        let mut workbook = Self::empty();
        workbook.worksheets.push(Worksheet::new("Sheet1"));
        workbook
    }

    /// No sheets at all; readers start from here
    pub fn empty() -> Self {
        Self {
            worksheets: Vec::new(),
            settings: WorkbookSettings::default(),
        }
    }

    pub fn sheet_count(&self) -> usize {
        self.worksheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.worksheets.is_empty()
    }

    pub fn worksheet(&self, index: usize) -> Option<&Worksheet> {
        self.worksheets.get(index)
    }

    pub fn worksheet_mut(&mut self, index: usize) -> Option<&mut Worksheet> {
        self.worksheets.get_mut(index)
    }

    /// Exact, case-sensitive name match
    pub fn worksheet_by_name(&self, name: &str) -> Option<&Worksheet> {
        self.sheet_index(name).and_then(|i| self.worksheets.get(i))
    }

    pub fn worksheet_by_name_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        let index = self.sheet_index(name)?;
        self.worksheets.get_mut(index)
    }

    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.worksheets.iter().position(|ws| ws.name() == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.worksheets.iter().map(Worksheet::name).collect()
    }

    pub fn worksheets(&self) -> impl Iterator<Item = &Worksheet> {
        self.worksheets.iter()
    }

    /// Append a sheet named `SheetN`, with the first free `N`
    pub fn add_worksheet(&mut self) -> Result<usize> {
        let name = (self.worksheets.len() + 1..)
            .map(|n| format!("Sheet{}", n))
            .find(|name| !self.name_taken(name, None))
            .unwrap_or_default();
        self.add_worksheet_with_name(&name)
    }

    /// Append a sheet; returns its index
    pub fn add_worksheet_with_name(&mut self, name: &str) -> Result<usize> {
        self.check_sheet_name(name, None)?;
        self.worksheets.push(Worksheet::new(name));
        Ok(self.worksheets.len() - 1)
    }

    pub fn remove_worksheet(&mut self, index: usize) -> Result<Worksheet> {
        self.check_index(index)?;
        Ok(self.worksheets.remove(index))
    }

    pub fn rename_worksheet(&mut self, index: usize, new_name: &str) -> Result<()> {
        self.check_index(index)?;
        self.check_sheet_name(new_name, Some(index))?;
        self.worksheets[index].set_name(new_name);
        Ok(())
    }

    pub fn settings(&self) -> &WorkbookSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut WorkbookSettings {
        &mut self.settings
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.worksheets.len() {
            Ok(())
        } else {
            Err(Error::NoSuchSheet {
                index,
                count: self.worksheets.len(),
            })
        }
    }

    /// Names compare case-insensitively; `except` skips the sheet being
    /// renamed
    fn name_taken(&self, name: &str, except: Option<usize>) -> bool {
        let lower = name.to_lowercase();
        self.worksheets
            .iter()
            .enumerate()
            .any(|(i, ws)| Some(i) != except && ws.name().to_lowercase() == lower)
    }

    fn check_sheet_name(&self, name: &str, except: Option<usize>) -> Result<()> {
        let problem = if name.is_empty() {
            Some("name is empty".to_string())
        } else if name.chars().count() > MAX_SHEET_NAME_LEN {
            Some(format!("'{}' is longer than {} characters", name, MAX_SHEET_NAME_LEN))
        } else {
            name.chars()
                .find(|c| RESERVED_CHARS.contains(c))
                .map(|c| format!("'{}' contains '{}'", name, c))
        };
        if let Some(problem) = problem {
            return Err(Error::InvalidSheetName(problem));
        }
        if self.name_taken(name, except) {
            return Err(Error::DuplicateSheetName(name.to_string()));
        }
        Ok(())
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}
