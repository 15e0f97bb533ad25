//! Raw cell content, before any number format is applied

use std::fmt;

/// What a cell holds on disk. Dates are plain `Number` serials here; the
/// cell's number format decides whether they mean a date.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Boolean(bool),
    Number(f64),
    String(String),
    Error(CellError),
    /// A formula and the result the saving application cached for it
    Formula {
        /// Always starts with `=`
        text: String,
        cached_value: Option<Box<CellValue>>,
    },
}

impl CellValue {
    pub fn string<S: Into<String>>(s: S) -> Self {
        CellValue::String(s.into())
    }

    /// Formula without a cached result; `=` is prepended when missing
    pub fn formula<S: Into<String>>(text: S) -> Self {
        let mut text = text.into();
        if !text.starts_with('=') {
            text.insert(0, '=');
        }
        CellValue::Formula {
            text,
            cached_value: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// The value itself, or the innermost cached result of a formula
    fn resolved(&self) -> &CellValue {
        match self {
            CellValue::Formula {
                cached_value: Some(inner),
                ..
            } => inner.resolved(),
            other => other,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self.resolved() {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self.resolved() {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Text of the cell when it is read as a header label.
    ///
    /// Empty cells, errors and formulas without a cached result have none.
    pub fn label_text(&self) -> Option<String> {
        match self.resolved() {
            CellValue::String(s) => Some(s.clone()),
            CellValue::Number(n) => Some(format_number(*n)),
            CellValue::Boolean(b) => Some(bool_text(*b).to_string()),
            _ => None,
        }
    }
}

fn bool_text(b: bool) -> &'static str {
    if b {
        "TRUE"
    } else {
        "FALSE"
    }
}

/// Whole numbers print without `.0`
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        (n as i64).to_string()
    } else {
        n.to_string()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.resolved() {
            CellValue::Empty => Ok(()),
            CellValue::Boolean(b) => f.write_str(bool_text(*b)),
            CellValue::Number(n) => f.write_str(&format_number(*n)),
            CellValue::String(s) => f.write_str(s),
            CellValue::Error(e) => fmt::Display::fmt(e, f),
            CellValue::Formula { text, .. } => f.write_str(text),
        }
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(f64::from(n))
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::string(s)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

/// Error literals a cell can hold (`t="e"` cells)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellError {
    Null,
    Div0,
    Value,
    Ref,
    Name,
    Num,
    Na,
}

const ERROR_LITERALS: [(CellError, &str); 7] = [
    (CellError::Null, "#NULL!"),
    (CellError::Div0, "#DIV/0!"),
    (CellError::Value, "#VALUE!"),
    (CellError::Ref, "#REF!"),
    (CellError::Name, "#NAME?"),
    (CellError::Num, "#NUM!"),
    (CellError::Na, "#N/A"),
];

impl CellError {
    pub fn as_str(&self) -> &'static str {
        ERROR_LITERALS
            .iter()
            .find(|(e, _)| e == self)
            .map_or("#N/A", |(_, lit)| lit)
    }

    /// Case-insensitive
    pub fn parse(s: &str) -> Option<Self> {
        ERROR_LITERALS
            .iter()
            .find(|(_, lit)| lit.eq_ignore_ascii_case(s))
            .map(|(e, _)| *e)
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(CellValue::from(42), CellValue::Number(42.0));
        assert_eq!(CellValue::from(true), CellValue::Boolean(true));
        assert_eq!(CellValue::from("hello").as_string(), Some("hello"));
        assert_eq!(CellValue::from("hello").as_number(), None);
    }

    #[test]
    fn test_formula_prefix_and_cache() {
        assert_eq!(
            CellValue::formula("SUM(A1:A3)"),
            CellValue::Formula {
                text: "=SUM(A1:A3)".into(),
                cached_value: None
            }
        );
        let cached = CellValue::Formula {
            text: "=1+1".into(),
            cached_value: Some(Box::new(CellValue::Number(2.0))),
        };
        assert_eq!(cached.as_number(), Some(2.0));
        assert_eq!(cached.to_string(), "2");
        assert_eq!(CellValue::formula("A1").to_string(), "=A1");
    }

    #[test]
    fn test_label_text() {
        assert_eq!(CellValue::string("Name").label_text().as_deref(), Some("Name"));
        assert_eq!(CellValue::Number(2024.0).label_text().as_deref(), Some("2024"));
        assert_eq!(CellValue::Number(1.5).label_text().as_deref(), Some("1.5"));
        assert_eq!(CellValue::Empty.label_text(), None);
        assert_eq!(CellValue::Error(CellError::Na).label_text(), None);
        assert_eq!(CellValue::formula("B2").label_text(), None);

        let formula = CellValue::Formula {
            text: "=\"A\"&\"ge\"".into(),
            cached_value: Some(Box::new(CellValue::string("Age"))),
        };
        assert_eq!(formula.label_text().as_deref(), Some("Age"));
    }

    #[test]
    fn test_error_literals() {
        assert_eq!(CellError::parse("#DIV/0!"), Some(CellError::Div0));
        assert_eq!(CellError::parse("#n/a"), Some(CellError::Na));
        assert_eq!(CellError::parse("invalid"), None);
        assert_eq!(CellError::Value.to_string(), "#VALUE!");
    }
}
