//! Text placement inside a cell

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Alignment {
    pub horizontal: HorizontalAlignment,
    pub vertical: VerticalAlignment,
    pub wrap_text: bool,
}

impl Alignment {
    /// True when nothing differs from the defaults, so no `<alignment>`
    /// element is written
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HorizontalAlignment {
    /// Text left, numbers right
    #[default]
    General,
    Left,
    Center,
    Right,
    Fill,
    Justify,
    CenterContinuous,
    Distributed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VerticalAlignment {
    Top,
    Center,
    #[default]
    Bottom,
    Justify,
    Distributed,
}

const HORIZONTAL_NAMES: [(HorizontalAlignment, &str); 8] = [
    (HorizontalAlignment::General, "general"),
    (HorizontalAlignment::Left, "left"),
    (HorizontalAlignment::Center, "center"),
    (HorizontalAlignment::Right, "right"),
    (HorizontalAlignment::Fill, "fill"),
    (HorizontalAlignment::Justify, "justify"),
    (HorizontalAlignment::CenterContinuous, "centerContinuous"),
    (HorizontalAlignment::Distributed, "distributed"),
];

const VERTICAL_NAMES: [(VerticalAlignment, &str); 5] = [
    (VerticalAlignment::Top, "top"),
    (VerticalAlignment::Center, "center"),
    (VerticalAlignment::Bottom, "bottom"),
    (VerticalAlignment::Justify, "justify"),
    (VerticalAlignment::Distributed, "distributed"),
];

fn name_of<T: PartialEq + Copy>(table: &[(T, &'static str)], value: T) -> &'static str {
    table
        .iter()
        .find(|(v, _)| *v == value)
        .map_or("", |(_, name)| name)
}

fn by_name<T: Copy + Default>(table: &[(T, &str)], name: &str) -> T {
    table
        .iter()
        .find(|(_, n)| *n == name)
        .map_or_else(T::default, |(v, _)| *v)
}

impl HorizontalAlignment {
    /// Attribute value in SpreadsheetML
    pub fn as_str(&self) -> &'static str {
        name_of(&HORIZONTAL_NAMES, *self)
    }

    /// Unknown names fall back to `General`
    pub fn from_name(name: &str) -> Self {
        by_name(&HORIZONTAL_NAMES, name)
    }
}

impl VerticalAlignment {
    pub fn as_str(&self) -> &'static str {
        name_of(&VERTICAL_NAMES, *self)
    }

    /// Unknown names fall back to `Bottom`
    pub fn from_name(name: &str) -> Self {
        by_name(&VERTICAL_NAMES, name)
    }
}
