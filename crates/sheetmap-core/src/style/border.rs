//! Cell borders

use super::Color;

/// The four edges of a cell; `None` draws nothing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BorderStyle {
    pub left: Option<BorderEdge>,
    pub right: Option<BorderEdge>,
    pub top: Option<BorderEdge>,
    pub bottom: Option<BorderEdge>,
}

impl BorderStyle {
    /// The same line on every edge
    pub fn all(style: BorderLineStyle, color: Color) -> Self {
        let edge = Some(BorderEdge { style, color });
        Self {
            left: edge,
            right: edge,
            top: edge,
            bottom: edge,
        }
    }

    /// Edges in SpreadsheetML order: left, right, top, bottom
    pub fn edges(&self) -> [Option<BorderEdge>; 4] {
        [self.left, self.right, self.top, self.bottom]
    }

    pub fn is_empty(&self) -> bool {
        self.edges().iter().all(Option::is_none)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BorderEdge {
    pub style: BorderLineStyle,
    pub color: Color,
}

impl BorderEdge {
    pub fn new(style: BorderLineStyle, color: Color) -> Self {
        Self { style, color }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BorderLineStyle {
    #[default]
    None,
    Thin,
    Medium,
    Thick,
    Dashed,
    Dotted,
    Double,
    Hair,
}

impl BorderLineStyle {
    /// `style` attribute value of a border edge element
    pub fn as_str(&self) -> &'static str {
        match self {
            BorderLineStyle::None => "none",
            BorderLineStyle::Thin => "thin",
            BorderLineStyle::Medium => "medium",
            BorderLineStyle::Thick => "thick",
            BorderLineStyle::Dashed => "dashed",
            BorderLineStyle::Dotted => "dotted",
            BorderLineStyle::Double => "double",
            BorderLineStyle::Hair => "hair",
        }
    }

    /// Dash-dot and medium variants collapse onto the nearest modelled
    /// style; anything unknown reads as `Thin`.
    pub fn from_name(name: &str) -> Self {
        if name.starts_with("medium") {
            return BorderLineStyle::Medium;
        }
        match name {
            "none" => BorderLineStyle::None,
            "thick" => BorderLineStyle::Thick,
            "dotted" => BorderLineStyle::Dotted,
            "double" => BorderLineStyle::Double,
            "hair" => BorderLineStyle::Hair,
            n if n.contains("ash") => BorderLineStyle::Dashed,
            _ => BorderLineStyle::Thin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_edges() {
        let border = BorderStyle::all(BorderLineStyle::Thin, Color::BLACK);
        let thin = Some(BorderEdge::new(BorderLineStyle::Thin, Color::BLACK));
        assert_eq!(border.edges(), [thin; 4]);
        assert!(!border.is_empty());
        assert!(BorderStyle::default().is_empty());
    }

    #[test]
    fn test_line_style_names() {
        assert_eq!(BorderLineStyle::from_name("hair"), BorderLineStyle::Hair);
        assert_eq!(BorderLineStyle::from_name("mediumDashDot"), BorderLineStyle::Medium);
        assert_eq!(BorderLineStyle::from_name("slantDashDot"), BorderLineStyle::Dashed);
        assert_eq!(BorderLineStyle::from_name("dashDotDot"), BorderLineStyle::Dashed);
        assert_eq!(BorderLineStyle::from_name("bogus"), BorderLineStyle::Thin);
        assert_eq!(BorderLineStyle::Double.as_str(), "double");
    }
}
