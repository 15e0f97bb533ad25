//! Colors as stylesheets store them

/// Theme and indexed colors stay symbolic, so a template's palette
/// survives a read-write cycle untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Color {
    #[default]
    Auto,
    Rgb { r: u8, g: u8, b: u8 },
    Argb { a: u8, r: u8, g: u8, b: u8 },
    Theme(u8),
    /// Legacy palette entry
    Indexed(u8),
}

impl Color {
    pub const BLACK: Color = Color::Rgb { r: 0, g: 0, b: 0 };
    /// `#C0C0C0`, the default header fill
    pub const LIGHT_GRAY: Color = Color::Rgb {
        r: 0xC0,
        g: 0xC0,
        b: 0xC0,
    };

    /// Six (RGB) or eight (ARGB) hex digits, with or without `#`
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = (0..hex.len())
            .step_by(2)
            .map(|i| hex.get(i..i + 2).and_then(|b| u8::from_str_radix(b, 16).ok()))
            .collect::<Option<Vec<u8>>>()?;
        match bytes[..] {
            [r, g, b] if hex.len() == 6 => Some(Color::Rgb { r, g, b }),
            [a, r, g, b] if hex.len() == 8 => Some(Color::Argb { a, r, g, b }),
            _ => None,
        }
    }

    /// The `rgb` attribute value; `None` for colors without literal
    /// components
    pub fn to_argb_hex(&self) -> Option<String> {
        let (a, r, g, b) = match *self {
            Color::Rgb { r, g, b } => (0xFF, r, g, b),
            Color::Argb { a, r, g, b } => (a, r, g, b),
            Color::Auto | Color::Theme(_) | Color::Indexed(_) => return None,
        };
        Some(format!("{:02X}{:02X}{:02X}{:02X}", a, r, g, b))
    }

    pub fn is_auto(&self) -> bool {
        *self == Color::Auto
    }
}
