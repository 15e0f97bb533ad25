//! Number formats and date detection

/// How a numeric cell is displayed. Whether a serial means a date is
/// decided here, by [`NumberFormat::is_date_format`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NumberFormat {
    #[default]
    General,
    /// One of the implicit formats every reader knows by id
    BuiltIn(u32),
    /// A format code declared in the stylesheet
    Custom(String),
}

/// Implicit format ids and their codes
const BUILTIN_CODES: [(u32, &str); 22] = [
    (1, "0"),
    (2, "0.00"),
    (3, "#,##0"),
    (4, "#,##0.00"),
    (9, "0%"),
    (10, "0.00%"),
    (11, "0.00E+00"),
    (12, "# ?/?"),
    (13, "# ??/??"),
    (14, "mm-dd-yy"),
    (15, "d-mmm-yy"),
    (16, "d-mmm"),
    (17, "mmm-yy"),
    (18, "h:mm AM/PM"),
    (19, "h:mm:ss AM/PM"),
    (20, "h:mm"),
    (21, "h:mm:ss"),
    (22, "m/d/yy h:mm"),
    (45, "mm:ss"),
    (46, "[h]:mm:ss"),
    (47, "mmss.0"),
    (49, "@"),
];

impl NumberFormat {
    /// `m/d/yy h:mm`
    pub const ID_DATETIME: u32 = 22;

    pub fn from_string<S: Into<String>>(format: S) -> Self {
        NumberFormat::Custom(format.into())
    }

    /// The format code; unknown built-in ids read as `General`
    pub fn format_string(&self) -> &str {
        match self {
            NumberFormat::General => "General",
            NumberFormat::BuiltIn(id) => BUILTIN_CODES
                .iter()
                .find(|(builtin, _)| builtin == id)
                .map_or("General", |(_, code)| code),
            NumberFormat::Custom(code) => code,
        }
    }

    /// True for date, time and elapsed-time formats
    pub fn is_date_format(&self) -> bool {
        match self {
            NumberFormat::General => false,
            NumberFormat::BuiltIn(id) => matches!(id, 14..=22 | 45..=47),
            NumberFormat::Custom(code) => has_date_tokens(code),
        }
    }
}

/// Looks for `y m d h s` outside quoted literals and bracketed sections.
/// A bracket holding only `h m s` (`[h]`, `[mm]`) is an elapsed time and
/// counts; colors and locales (`[Red]`, `[$-409]`) do not.
fn has_date_tokens(code: &str) -> bool {
    let mut quoted = false;
    let mut bracket: Option<String> = None;
    for c in code.chars().map(|c| c.to_ascii_lowercase()) {
        if quoted {
            quoted = c != '"';
            continue;
        }
        if let Some(inner) = bracket.as_mut() {
            if c != ']' {
                inner.push(c);
                continue;
            }
            if !inner.is_empty() && inner.chars().all(|b| matches!(b, 'h' | 'm' | 's')) {
                return true;
            }
            bracket = None;
            continue;
        }
        match c {
            '"' => quoted = true,
            '[' => bracket = Some(String::new()),
            'y' | 'm' | 'd' | 'h' | 's' => return true,
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_strings() {
        assert_eq!(NumberFormat::General.format_string(), "General");
        assert_eq!(NumberFormat::BuiltIn(14).format_string(), "mm-dd-yy");
        assert_eq!(NumberFormat::BuiltIn(7).format_string(), "General");
        assert_eq!(
            NumberFormat::from_string("yyyy-mm-dd hh:mm:ss").format_string(),
            "yyyy-mm-dd hh:mm:ss"
        );
    }

    #[test]
    fn test_is_date_format() {
        assert!(NumberFormat::BuiltIn(NumberFormat::ID_DATETIME).is_date_format());
        assert!(!NumberFormat::BuiltIn(2).is_date_format());
        assert!(NumberFormat::from_string("yyyy-mm-dd").is_date_format());
        assert!(!NumberFormat::from_string("0.00").is_date_format());
        assert!(!NumberFormat::from_string("0.00%").is_date_format());
        assert!(!NumberFormat::from_string("\"Total\" 0").is_date_format());
        assert!(!NumberFormat::from_string("[Red]0.00").is_date_format());
        assert!(NumberFormat::from_string("[h]:mm").is_date_format());
        assert!(NumberFormat::from_string("[$-409]d-mmm").is_date_format());
        assert!(!NumberFormat::General.is_date_format());
    }
}
