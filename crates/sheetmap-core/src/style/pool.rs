//! Interned styles shared by the cells of one sheet

use ahash::AHashMap;

use super::Style;

/// Cells store a `u32` into this table instead of a full [`Style`].
/// Slot 0 always holds the default style.
#[derive(Debug)]
pub struct StylePool {
    styles: Vec<Style>,
    slots: AHashMap<Style, u32>,
}

impl StylePool {
    pub fn new() -> Self {
        let mut slots = AHashMap::with_capacity(16);
        slots.insert(Style::default(), 0);
        Self {
            styles: vec![Style::default()],
            slots,
        }
    }

    /// Slot of `style`, interning it on first use
    pub fn get_or_insert(&mut self, style: Style) -> u32 {
        if let Some(&slot) = self.slots.get(&style) {
            return slot;
        }
        let slot = self.styles.len() as u32;
        self.styles.push(style.clone());
        self.slots.insert(style, slot);
        slot
    }

    pub fn get(&self, slot: u32) -> Option<&Style> {
        self.styles.get(slot as usize)
    }

    /// Interned styles, default included
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// Only the default style is present
    pub fn is_empty(&self) -> bool {
        self.styles.len() == 1
    }
}

impl Default for StylePool {
    fn default() -> Self {
        Self::new()
    }
}
