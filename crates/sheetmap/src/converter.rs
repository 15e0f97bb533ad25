//! Per-field converter overrides
//!
//! A read converter takes over decoding of one field: it sees the raw cell
//! and fills the record itself. A write converter takes over encoding: it
//! gets the target cell as a [`CellSlot`] and may set both value and style.
//!
//! Registrations live in a [`ConverterRegistry`] owned by a session, keyed
//! by record type, and are consumed by the next sheet operation.

use std::any::{Any, TypeId};
use std::fmt;

use ahash::AHashMap;
use sheetmap_core::{CellValue, Style};

use crate::error::Result;
use crate::value::{decode_cell, Value};

/// A raw cell as seen by a read converter
#[derive(Debug, Clone, Copy)]
pub struct CellRef<'a> {
    pub raw: &'a CellValue,
    pub style: Option<&'a Style>,
    pub date_1904: bool,
}

impl<'a> CellRef<'a> {
    /// Decode the way the default path would
    pub fn decode(&self) -> Value {
        decode_cell(self.raw, self.style, self.date_1904)
    }
}

/// The target cell of a write converter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellSlot {
    value: CellValue,
    style: Option<Style>,
    date_1904: bool,
}

impl CellSlot {
    pub(crate) fn new(date_1904: bool) -> Self {
        Self {
            date_1904,
            ..Self::default()
        }
    }

    /// Store a decoded value; timestamps become date serials
    pub fn set_value<V: Into<Value>>(&mut self, value: V) {
        self.value = value.into().to_cell_value(self.date_1904);
    }

    /// Store raw cell content as is
    pub fn set_raw<V: Into<CellValue>>(&mut self, value: V) {
        self.value = value.into();
    }

    /// Style for the cell. Replaces any format style of the column.
    pub fn set_style(&mut self, style: Style) {
        self.style = Some(style);
    }

    pub fn value(&self) -> &CellValue {
        &self.value
    }

    pub fn style(&self) -> Option<&Style> {
        self.style.as_ref()
    }

    pub(crate) fn into_parts(self) -> (CellValue, Option<Style>) {
        (self.value, self.style)
    }
}

pub type ReadConverter<R> = Box<dyn Fn(&CellRef<'_>, &mut R) -> Result<()>>;
pub type WriteConverter<R> = Box<dyn Fn(&mut CellSlot, &R) -> Result<()>>;

/// Read and write converters of one record type, by field name
pub struct Converters<R> {
    read: AHashMap<String, ReadConverter<R>>,
    write: AHashMap<String, WriteConverter<R>>,
}

impl<R> Default for Converters<R> {
    fn default() -> Self {
        Self {
            read: AHashMap::new(),
            write: AHashMap::new(),
        }
    }
}

impl<R> Converters<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_read<F>(&mut self, field: &str, converter: F)
    where
        F: Fn(&CellRef<'_>, &mut R) -> Result<()> + 'static,
    {
        self.read.insert(field.to_string(), Box::new(converter));
    }

    pub fn register_write<F>(&mut self, field: &str, converter: F)
    where
        F: Fn(&mut CellSlot, &R) -> Result<()> + 'static,
    {
        self.write.insert(field.to_string(), Box::new(converter));
    }

    pub fn read(&self, field: &str) -> Option<&ReadConverter<R>> {
        self.read.get(field)
    }

    pub fn write(&self, field: &str) -> Option<&WriteConverter<R>> {
        self.write.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.read.is_empty() && self.write.is_empty()
    }

    pub fn len(&self) -> usize {
        self.read.len() + self.write.len()
    }
}

impl<R> fmt::Debug for Converters<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converters")
            .field("read", &self.read.keys().collect::<Vec<_>>())
            .field("write", &self.write.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Converters for any number of record types
#[derive(Default)]
pub struct ConverterRegistry {
    by_type: AHashMap<TypeId, Box<dyn Any>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // entries are keyed by TypeId::of::<R>, so the downcast only fails for
    // a foreign entry, which is then replaced
    fn entry<R: 'static>(&mut self) -> Option<&mut Converters<R>> {
        let slot = self
            .by_type
            .entry(TypeId::of::<R>())
            .or_insert_with(|| Box::new(Converters::<R>::new()));
        if !slot.is::<Converters<R>>() {
            *slot = Box::new(Converters::<R>::new());
        }
        slot.downcast_mut::<Converters<R>>()
    }

    pub fn register_read<R, F>(&mut self, field: &str, converter: F)
    where
        R: 'static,
        F: Fn(&CellRef<'_>, &mut R) -> Result<()> + 'static,
    {
        if let Some(converters) = self.entry::<R>() {
            converters.register_read(field, converter);
        }
    }

    pub fn register_write<R, F>(&mut self, field: &str, converter: F)
    where
        R: 'static,
        F: Fn(&mut CellSlot, &R) -> Result<()> + 'static,
    {
        if let Some(converters) = self.entry::<R>() {
            converters.register_write(field, converter);
        }
    }

    /// Remove and return the converters registered for `R`
    pub fn take<R: 'static>(&mut self) -> Converters<R> {
        self.by_type
            .remove(&TypeId::of::<R>())
            .and_then(|boxed| boxed.downcast::<Converters<R>>().ok())
            .map_or_else(Converters::new, |boxed| *boxed)
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_type.clear();
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("record_types", &self.by_type.len())
            .finish()
    }
}
