//! Cell styling types
//!
//! - [`Style`] - complete cell style
//! - [`Font`], [`Fill`], [`BorderStyle`], [`Alignment`], [`NumberFormat`] - its parts
//! - [`StylePool`] - per-sheet deduplicating style table

mod alignment;
mod appearance;
mod border;
mod color;
mod number_format;
mod pool;

pub use alignment::{Alignment, HorizontalAlignment, VerticalAlignment};
pub use appearance::{Fill, Font};
pub use border::{BorderEdge, BorderLineStyle, BorderStyle};
pub use color::Color;
pub use number_format::NumberFormat;
pub use pool::StylePool;

/// Everything that decides how one cell looks.
///
/// Built with chained setters; equal styles share one slot in a
/// [`StylePool`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Style {
    pub font: Font,
    pub fill: Fill,
    pub border: BorderStyle,
    pub alignment: Alignment,
    pub number_format: NumberFormat,
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bold(mut self, bold: bool) -> Self {
        self.font.bold = bold;
        self
    }

    pub fn italic(mut self, italic: bool) -> Self {
        self.font.italic = italic;
        self
    }

    /// Font size in points
    pub fn font_size(mut self, size: f64) -> Self {
        self.font.size = size;
        self
    }

    /// Solid background
    pub fn fill_color(mut self, color: Color) -> Self {
        self.fill = Fill::solid(color);
        self
    }

    pub fn border(mut self, border: BorderStyle) -> Self {
        self.border = border;
        self
    }

    /// Format code such as `0.00%` or `yyyy-mm-dd`
    pub fn number_format<S: Into<String>>(mut self, format: S) -> Self {
        self.number_format = NumberFormat::from_string(format.into());
        self
    }

    pub fn horizontal_alignment(mut self, align: HorizontalAlignment) -> Self {
        self.alignment.horizontal = align;
        self
    }

    pub fn vertical_alignment(mut self, align: VerticalAlignment) -> Self {
        self.alignment.vertical = align;
        self
    }
}
