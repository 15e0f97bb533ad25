//! Font and background fill

use super::Color;

/// Font of a cell. The default is 11pt Calibri, as new workbooks use.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Font {
    pub name: String,
    /// Points
    pub size: f64,
    pub bold: bool,
    pub italic: bool,
    pub color: Color,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            name: "Calibri".to_string(),
            size: 11.0,
            bold: false,
            italic: false,
            color: Color::Auto,
        }
    }
}

// f64 sizes hash by bit pattern; sizes never hold NaN
impl Eq for Font {}

impl std::hash::Hash for Font {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (&self.name, self.size.to_bits(), self.bold, self.italic).hash(state);
        self.color.hash(state);
    }
}

/// Background of a cell. Only solid pattern fills are modelled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Fill {
    #[default]
    None,
    Solid { color: Color },
}

impl Fill {
    pub fn solid(color: Color) -> Self {
        Fill::Solid { color }
    }
}
