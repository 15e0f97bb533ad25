//! A1 references: single cells and rectangles

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};

/// Zero-based position. Sorting is row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellAddress {
    pub row: u32,
    /// `A` is 0, `XFD` is 16383
    pub col: u16,
}

impl CellAddress {
    pub fn new(row: u32, col: u16) -> Self {
        Self { row, col }
    }

    /// Reads `B2` style references; `$` anchors are ignored.
    ///
    /// ```
    /// use sheetmap_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("$B$2").unwrap();
    /// assert_eq!((addr.row, addr.col), (1, 1));
    /// ```
    pub fn parse(reference: &str) -> Result<Self> {
        let text: String = reference.trim().chars().filter(|&c| c != '$').collect();
        let digits_at = text
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(text.len());
        let (letters, digits) = text.split_at(digits_at);
        let invalid = |why: &str| Error::InvalidAddress(format!("'{}': {}", reference, why));

        if letters.is_empty() {
            return Err(invalid("missing column letters"));
        }
        if digits.is_empty() {
            return Err(invalid("missing row number"));
        }
        let col = Self::letters_to_column(letters)?;
        let row = match digits.parse::<u32>() {
            Ok(0) | Err(_) => return Err(invalid("row must be a number from 1")),
            Ok(n) => n - 1,
        };
        if row >= MAX_ROWS {
            return Err(Error::RowOutOfRange {
                row,
                last: MAX_ROWS - 1,
            });
        }
        Ok(Self { row, col })
    }

    /// `0 -> A`, `25 -> Z`, `26 -> AA`
    pub fn column_to_letters(col: u16) -> String {
        let mut letters = Vec::new();
        let mut n = u32::from(col) + 1;
        while n > 0 {
            let rem = (n - 1) % 26;
            letters.push(b'A' + rem as u8);
            n = (n - 1) / 26;
        }
        letters.iter().rev().map(|&b| char::from(b)).collect()
    }

    /// Case-insensitive inverse of [`CellAddress::column_to_letters`]
    pub fn letters_to_column(letters: &str) -> Result<u16> {
        let mut n: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(Error::InvalidAddress(format!(
                    "'{}' is not a column letter",
                    c
                )));
            }
            n = n * 26 + u32::from(c.to_ascii_uppercase() as u8 - b'A') + 1;
            if n > u32::from(MAX_COLS) {
                return Err(Error::InvalidAddress(format!(
                    "column '{}' is past XFD",
                    letters
                )));
            }
        }
        n.checked_sub(1)
            .map(|col| col as u16)
            .ok_or_else(|| Error::InvalidAddress("no column letters".into()))
    }

    pub fn to_a1_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::column_to_letters(self.col), self.row + 1)
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Inclusive rectangle; `start` is always the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellRange {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl CellRange {
    /// Any two opposite corners
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        Self {
            start: CellAddress::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellAddress::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    pub fn from_indices(start_row: u32, start_col: u16, end_row: u32, end_col: u16) -> Self {
        Self::new(
            CellAddress::new(start_row, start_col),
            CellAddress::new(end_row, end_col),
        )
    }

    /// `A1:B10`, or a lone `C3`
    pub fn parse(reference: &str) -> Result<Self> {
        let (a, b) = reference
            .trim()
            .split_once(':')
            .unwrap_or((reference, reference));
        Ok(Self::new(CellAddress::parse(a)?, CellAddress::parse(b)?))
    }

    pub fn contains(&self, addr: &CellAddress) -> bool {
        (self.start.row..=self.end.row).contains(&addr.row)
            && (self.start.col..=self.end.col).contains(&addr.col)
    }

    pub fn overlaps(&self, other: &CellRange) -> bool {
        let rows = self.start.row <= other.end.row && other.start.row <= self.end.row;
        let cols = self.start.col <= other.end.col && other.start.col <= self.end.col;
        rows && cols
    }

    pub fn is_single_cell(&self) -> bool {
        self.start == self.end
    }

    /// Every address in the range, row by row
    pub fn cells(&self) -> impl Iterator<Item = CellAddress> {
        let (start, end) = (self.start, self.end);
        (start.row..=end.row)
            .flat_map(move |row| (start.col..=end.col).map(move |col| CellAddress::new(row, col)))
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_cell() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

impl FromStr for CellRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        for (col, letters) in [(0, "A"), (25, "Z"), (26, "AA"), (701, "ZZ"), (16383, "XFD")] {
            assert_eq!(CellAddress::column_to_letters(col), letters);
            assert_eq!(CellAddress::letters_to_column(letters).unwrap(), col);
        }
        assert_eq!(CellAddress::letters_to_column("aa").unwrap(), 26);
        assert!(CellAddress::letters_to_column("XFE").is_err());
        assert!(CellAddress::letters_to_column("").is_err());
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(CellAddress::parse("B2").unwrap(), CellAddress::new(1, 1));
        assert_eq!(CellAddress::parse(" $C$10 ").unwrap(), CellAddress::new(9, 2));
        assert_eq!("XFD1".parse::<CellAddress>().unwrap(), CellAddress::new(0, 16383));

        for bad in ["", "A", "1", "A0", "A-1", "1A"] {
            assert!(CellAddress::parse(bad).is_err(), "{bad}");
        }
        assert!(matches!(
            CellAddress::parse("A1048577"),
            Err(Error::RowOutOfRange { .. })
        ));
    }

    #[test]
    fn test_addresses_sort_row_major() {
        let mut addrs = vec![
            CellAddress::new(1, 0),
            CellAddress::new(0, 2),
            CellAddress::new(0, 1),
        ];
        addrs.sort();
        let a1: Vec<String> = addrs.iter().map(CellAddress::to_a1_string).collect();
        assert_eq!(a1, vec!["B1", "C1", "A2"]);
    }

    #[test]
    fn test_range_parse_and_display() {
        let range = CellRange::parse("B1:C1").unwrap();
        assert_eq!(range.start, CellAddress::new(0, 1));
        assert_eq!(range.end, CellAddress::new(0, 2));
        assert_eq!(range.to_string(), "B1:C1");

        let single: CellRange = "C3".parse().unwrap();
        assert!(single.is_single_cell());
        assert_eq!(single.to_string(), "C3");

        assert_eq!(CellRange::from_indices(3, 3, 1, 1).to_string(), "B2:D4");
        assert_eq!(CellRange::parse("D4:B2").unwrap().to_string(), "B2:D4");
    }

    #[test]
    fn test_range_contains_and_overlaps() {
        let range = CellRange::parse("B2:D4").unwrap();
        assert!(range.contains(&CellAddress::new(2, 2)));
        assert!(range.contains(&CellAddress::new(3, 3)));
        assert!(!range.contains(&CellAddress::new(0, 0)));

        assert!(range.overlaps(&CellRange::parse("D4:E5").unwrap()));
        assert!(!range.overlaps(&CellRange::parse("E1:F9").unwrap()));
        assert!(!range.overlaps(&CellRange::parse("A5:Z5").unwrap()));
    }

    #[test]
    fn test_range_cells() {
        let cells: Vec<String> = CellRange::parse("A1:B2")
            .unwrap()
            .cells()
            .map(|a| a.to_string())
            .collect();
        assert_eq!(cells, vec!["A1", "B1", "A2", "B2"]);
    }
}
