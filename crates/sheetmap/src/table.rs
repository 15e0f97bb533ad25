//! Statically bound field accessors
//!
//! A [`FieldTable`] lists a record type's fields by name, each with its
//! declared [`FieldType`], a getter and a setter. It is built once per type,
//! typically in a `once_cell::sync::Lazy`, and handed out by [`Record`].
//!
//! ```rust
//! use once_cell::sync::Lazy;
//! use sheetmap::{FieldTable, Record, SchemaProvider};
//!
//! #[derive(Debug, Default)]
//! struct Person {
//!     id: i32,
//!     name: String,
//! }
//!
//! static PERSON: Lazy<FieldTable<Person>> = Lazy::new(|| {
//!     FieldTable::builder()
//!         .field("id", |p: &Person| p.id, |p, v| p.id = v)
//!         .column(0, ["ID"])
//!         .field("name", |p: &Person| p.name.clone(), |p, v| p.name = v)
//!         .column(1, ["Name"])
//!         .build()
//! });
//!
//! impl Record for Person {
//!     fn field_table() -> &'static FieldTable<Self> {
//!         &PERSON
//!     }
//! }
//!
//! assert_eq!(Person::field_table().column_specs().len(), 2);
//! ```

use ahash::AHashMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::field::{FieldKind, FieldType, FieldValue};
use crate::schema::{ColumnSpec, SchemaProvider};

type Getter<R> = Box<dyn Fn(&R) -> FieldValue + Send + Sync>;
type Setter<R> = Box<dyn Fn(&mut R, FieldValue) -> bool + Send + Sync>;

/// Getter and setter for one named field
pub struct FieldAccessor<R> {
    name: String,
    field_type: FieldType,
    get: Getter<R>,
    set: Setter<R>,
    column: Option<ColumnSpec>,
}

impl<R> FieldAccessor<R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Column metadata, when the field is placed on the sheet
    pub fn column_spec(&self) -> Option<&ColumnSpec> {
        self.column.as_ref()
    }

    /// Read the field from a record
    pub fn get(&self, record: &R) -> FieldValue {
        (self.get)(record)
    }

    /// Store a value; it must be of the field's declared type or `Null`
    pub fn set(&self, record: &mut R, value: FieldValue) -> Result<()> {
        let actual = value.type_name();
        if (self.set)(record, value) {
            Ok(())
        } else {
            Err(Error::TypeMismatch {
                field: self.name.clone(),
                expected: self.field_type,
                actual,
            })
        }
    }
}

impl<R> fmt::Debug for FieldAccessor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldAccessor")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("column", &self.column)
            .finish()
    }
}

/// Name-indexed accessors of a record type
pub struct FieldTable<R> {
    fields: Vec<FieldAccessor<R>>,
    by_name: AHashMap<String, usize>,
}

impl<R> FieldTable<R> {
    pub fn builder() -> FieldTableBuilder<R> {
        FieldTableBuilder { fields: Vec::new() }
    }

    pub fn get(&self, name: &str) -> Option<&FieldAccessor<R>> {
        self.by_name.get(name).and_then(|i| self.fields.get(*i))
    }

    /// Accessor for `name`, or a structural error when the type has no such
    /// field
    pub fn accessor(&self, name: &str) -> Result<&FieldAccessor<R>> {
        self.get(name)
            .ok_or_else(|| Error::structural(format!("no accessor for field '{}'", name)))
    }

    /// Accessors in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &FieldAccessor<R>> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<R> SchemaProvider for FieldTable<R> {
    fn column_specs(&self) -> Vec<ColumnSpec> {
        self.fields
            .iter()
            .filter_map(|f| f.column.clone())
            .collect()
    }
}

impl<R> fmt::Debug for FieldTable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.fields.iter()).finish()
    }
}

/// Builder for [`FieldTable`]
pub struct FieldTableBuilder<R> {
    fields: Vec<FieldAccessor<R>>,
}

impl<R> FieldTableBuilder<R> {
    /// Add a field. A later field with the same name replaces the earlier one.
    pub fn field<T, G, S>(mut self, name: &str, get: G, set: S) -> Self
    where
        T: FieldKind + 'static,
        G: Fn(&R) -> T + Send + Sync + 'static,
        S: Fn(&mut R, T) + Send + Sync + 'static,
    {
        self.fields.retain(|f| f.name != name);
        self.fields.push(FieldAccessor {
            name: name.to_string(),
            field_type: T::FIELD_TYPE,
            get: Box::new(move |record| get(record).to_field()),
            set: Box::new(move |record, value| match T::from_field(value) {
                Some(v) => {
                    set(record, v);
                    true
                }
                None => false,
            }),
            column: None,
        });
        self
    }

    /// Place the most recently added field at `column_index` under
    /// `labels`. Has no effect before the first field.
    pub fn column<I, L>(mut self, column_index: i32, labels: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        if let Some(last) = self.fields.last_mut() {
            last.column = Some(ColumnSpec::new(column_index, last.name.clone(), labels));
        }
        self
    }

    /// Number format for the data cells of the most recently placed field.
    /// Call it after [`column`](Self::column).
    pub fn format<S: Into<String>>(mut self, format: S) -> Self {
        if let Some(last) = self.fields.last_mut() {
            if let Some(column) = last.column.take() {
                last.column = Some(column.with_format(format));
            }
        }
        self
    }

    pub fn build(self) -> FieldTable<R> {
        let by_name = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();
        FieldTable {
            fields: self.fields,
            by_name,
        }
    }
}

/// A record type with a static field table
pub trait Record: Default + 'static {
    fn field_table() -> &'static FieldTable<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Default, PartialEq)]
    struct Item {
        sku: String,
        qty: i32,
        note: Option<String>,
    }

    fn table() -> FieldTable<Item> {
        FieldTable::builder()
            .field("sku", |i: &Item| i.sku.clone(), |i, v| i.sku = v)
            .column(0, ["SKU"])
            .field("qty", |i: &Item| i.qty, |i, v| i.qty = v)
            .column(1, ["Stock", "Qty"])
            .format("0")
            .field("note", |i: &Item| i.note.clone(), |i, v| i.note = v)
            .build()
    }

    #[test]
    fn test_get_and_set() {
        let table = table();
        let mut item = Item::default();

        table
            .accessor("qty")
            .unwrap()
            .set(&mut item, FieldValue::Int(4))
            .unwrap();
        table
            .accessor("note")
            .unwrap()
            .set(&mut item, FieldValue::Null)
            .unwrap();

        assert_eq!(item.qty, 4);
        assert_eq!(table.accessor("qty").unwrap().get(&item), FieldValue::Int(4));
        assert_eq!(table.accessor("note").unwrap().field_type(), FieldType::Text);
    }

    #[test]
    fn test_wrong_variant_is_mismatch() {
        let table = table();
        let mut item = Item::default();
        let err = table
            .accessor("qty")
            .unwrap()
            .set(&mut item, FieldValue::Text("four".into()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_missing_accessor_is_structural() {
        assert_eq!(
            table().accessor("price").unwrap_err().kind(),
            ErrorKind::Structural
        );
    }

    #[test]
    fn test_column_specs() {
        let specs = table().column_specs();
        assert_eq!(
            specs,
            vec![
                ColumnSpec::new(0, "sku", ["SKU"]),
                ColumnSpec::new(1, "qty", ["Stock", "Qty"]).with_format("0"),
            ]
        );
    }
}
