//! Column schemas
//!
//! A [`ColumnSpec`] ties one record field to a sheet column and to the path
//! of header labels above it. A [`ColumnFieldMap`] is the resolved
//! column-to-field mapping that row encoding and decoding walk.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use sheetmap_core::MAX_COLS;

use crate::error::{Error, Result};

/// Mapping metadata for one field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnSpec {
    column_index: i32,
    field_name: String,
    labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    format: Option<String>,
}

impl ColumnSpec {
    /// Create a spec. A negative `column_index` marks the field as not
    /// exported.
    pub fn new<N, I, L>(column_index: i32, field_name: N, labels: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        Self {
            column_index,
            field_name: field_name.into(),
            labels: labels.into_iter().map(Into::into).collect(),
            format: None,
        }
    }

    /// Attach a number format for the data cells of this column
    pub fn with_format<S: Into<String>>(mut self, format: S) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn column_index(&self) -> i32 {
        self.column_index
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    /// Whether the field takes part in layout, matching and maps
    pub fn is_exported(&self) -> bool {
        self.column_index >= 0
    }

    /// Sheet column of an exported spec within the engine's column limit
    pub fn column(&self) -> Option<u16> {
        u16::try_from(self.column_index)
            .ok()
            .filter(|col| *col < MAX_COLS)
    }

    /// Label shown at header row `row`; rows past the path reuse its last
    /// label
    pub fn label_at(&self, row: usize) -> Option<&str> {
        let last = self.labels.len().checked_sub(1)?;
        self.labels.get(row.min(last)).map(String::as_str)
    }

    /// Leaf label, the one closest to the data rows
    pub fn deepest_label(&self) -> Option<&str> {
        self.labels.last().map(String::as_str)
    }

    /// Reject an empty field name, an empty label path, or a column beyond
    /// the engine limit
    pub fn validate(&self) -> Result<()> {
        if self.field_name.trim().is_empty() {
            return Err(Error::validation("column spec has an empty field name"));
        }
        if self.labels.is_empty() {
            return Err(Error::validation(format!(
                "field '{}' has no header labels",
                self.field_name
            )));
        }
        if self.is_exported() && self.column().is_none() {
            return Err(Error::validation(format!(
                "field '{}' uses column {} beyond the limit of {}",
                self.field_name, self.column_index, MAX_COLS
            )));
        }
        Ok(())
    }
}

/// Pair field names with label paths by position, up to the shorter list.
/// Spec `i` goes to column `i`.
pub fn column_spec_list<N, L>(field_names: &[N], label_lists: &[Vec<L>]) -> Vec<ColumnSpec>
where
    N: AsRef<str>,
    L: AsRef<str>,
{
    field_names
        .iter()
        .zip(label_lists)
        .enumerate()
        .map(|(i, (name, labels))| {
            ColumnSpec::new(
                i as i32,
                name.as_ref(),
                labels.iter().map(|l| l.as_ref().to_string()),
            )
        })
        .collect()
}

/// Exported specs with a usable column, in input order
pub(crate) fn exported(specs: &[ColumnSpec]) -> impl Iterator<Item = (u16, &ColumnSpec)> {
    specs
        .iter()
        .filter_map(|spec| spec.column().map(|col| (col, spec)))
}

/// Fail when two exported specs share a deepest label; template matching
/// could not tell them apart
pub fn check_unique_deepest_labels(specs: &[ColumnSpec]) -> Result<()> {
    let mut seen = HashSet::new();
    for (_, spec) in exported(specs) {
        if let Some(label) = spec.deepest_label() {
            if !seen.insert(label) {
                return Err(Error::structural(format!(
                    "ambiguous duplicate label '{}' (field '{}')",
                    label,
                    spec.field_name()
                )));
            }
        }
    }
    Ok(())
}

/// Fail when two exported specs claim the same column
pub fn check_unique_columns(specs: &[ColumnSpec]) -> Result<()> {
    let mut seen = HashSet::new();
    for (col, spec) in exported(specs) {
        if !seen.insert(col) {
            return Err(Error::validation(format!(
                "column {} is claimed twice (field '{}')",
                col,
                spec.field_name()
            )));
        }
    }
    Ok(())
}

/// Ordered `column -> field name` mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnFieldMap {
    columns: BTreeMap<u16, String>,
}

impl ColumnFieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Column `i` maps to name `i`; empty names leave their column unmapped
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let mut map = Self::new();
        for (i, name) in names.iter().enumerate() {
            let name = name.as_ref();
            if let (false, Ok(col)) = (name.is_empty(), u16::try_from(i)) {
                map.insert(col, name);
            }
        }
        map
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (u16, S)>,
        S: Into<String>,
    {
        Self {
            columns: pairs.into_iter().map(|(c, s)| (c, s.into())).collect(),
        }
    }

    /// Columns of the exported specs
    pub fn from_specs(specs: &[ColumnSpec]) -> Self {
        Self::from_pairs(exported(specs).map(|(col, spec)| (col, spec.field_name())))
    }

    pub fn insert<S: Into<String>>(&mut self, column: u16, field: S) -> Option<String> {
        self.columns.insert(column, field.into())
    }

    pub fn get(&self, column: u16) -> Option<&str> {
        self.columns.get(&column).map(String::as_str)
    }

    /// Lowest column mapped to `field`
    pub fn column_of(&self, field: &str) -> Option<u16> {
        self.columns
            .iter()
            .find(|(_, name)| name.as_str() == field)
            .map(|(col, _)| *col)
    }

    /// One past the highest mapped column
    pub fn next_column(&self) -> u16 {
        self.columns
            .keys()
            .next_back()
            .map_or(0, |col| col.saturating_add(1))
    }

    /// Pairs in ascending column order
    pub fn iter(&self) -> impl Iterator<Item = (u16, &str)> {
        self.columns.iter().map(|(col, name)| (*col, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn clear(&mut self) {
        self.columns.clear();
    }
}

/// Anything that can hand out column specs
pub trait SchemaProvider {
    fn column_specs(&self) -> Vec<ColumnSpec>;
}

impl SchemaProvider for [ColumnSpec] {
    fn column_specs(&self) -> Vec<ColumnSpec> {
        self.to_vec()
    }
}

impl SchemaProvider for Vec<ColumnSpec> {
    fn column_specs(&self) -> Vec<ColumnSpec> {
        self.clone()
    }
}

/// A validated set of column specs.
///
/// Every spec is valid, exported specs use distinct columns, and their
/// deepest labels are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Schema {
    specs: Vec<ColumnSpec>,
}

impl Schema {
    pub fn new(specs: Vec<ColumnSpec>) -> Result<Self> {
        for spec in &specs {
            spec.validate()?;
        }
        check_unique_columns(&specs)?;
        check_unique_deepest_labels(&specs)?;
        Ok(Self { specs })
    }

    pub fn from_provider<P: SchemaProvider + ?Sized>(provider: &P) -> Result<Self> {
        Self::new(provider.column_specs())
    }

    /// Parse a JSON array of specs
    pub fn from_json(json: &str) -> Result<Self> {
        let specs: Vec<ColumnSpec> = serde_json::from_str(json)
            .map_err(|e| Error::validation(format!("invalid schema JSON: {}", e)))?;
        Self::new(specs)
    }

    pub fn specs(&self) -> &[ColumnSpec] {
        &self.specs
    }

    /// Spec for a field name
    pub fn spec(&self, field: &str) -> Option<&ColumnSpec> {
        self.specs.iter().find(|s| s.field_name() == field)
    }

    pub fn column_field_map(&self) -> ColumnFieldMap {
        ColumnFieldMap::from_specs(&self.specs)
    }
}

impl SchemaProvider for Schema {
    fn column_specs(&self) -> Vec<ColumnSpec> {
        self.specs.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn people() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::new(0, "id", ["ID"]),
            ColumnSpec::new(1, "name", ["Basic", "Name"]),
            ColumnSpec::new(2, "age", ["Basic", "Age"]),
        ]
    }

    #[test]
    fn test_label_inheritance() {
        let spec = ColumnSpec::new(0, "id", ["ID"]);
        assert_eq!(spec.label_at(0), Some("ID"));
        assert_eq!(spec.label_at(3), Some("ID"));
        assert_eq!(ColumnSpec::new(0, "x", Vec::<String>::new()).label_at(0), None);
    }

    #[test]
    fn test_validate() {
        assert!(ColumnSpec::new(0, "id", ["ID"]).validate().is_ok());
        assert!(ColumnSpec::new(-1, "hidden", ["Hidden"]).validate().is_ok());
        assert_eq!(
            ColumnSpec::new(0, " ", ["ID"]).validate().unwrap_err().kind(),
            ErrorKind::Validation
        );
        assert!(ColumnSpec::new(0, "id", Vec::<String>::new())
            .validate()
            .is_err());
        assert!(ColumnSpec::new(i32::from(MAX_COLS), "far", ["Far"])
            .validate()
            .is_err());
    }

    #[test]
    fn test_column_field_map_constructors() {
        let map = ColumnFieldMap::from_names(&["id", "", "age"]);
        assert_eq!(map.iter().collect::<Vec<_>>(), vec![(0, "id"), (2, "age")]);
        assert_eq!(map.column_of("age"), Some(2));
        assert_eq!(map.next_column(), 3);

        let mut specs = people();
        specs.push(ColumnSpec::new(-1, "secret", ["Secret"]));
        let map = ColumnFieldMap::from_specs(&specs);
        assert_eq!(map.len(), 3);
        assert_eq!(map.column_of("secret"), None);

        let mut map = ColumnFieldMap::from_pairs([(4, "b"), (1, "a")]);
        assert_eq!(map.iter().map(|(c, _)| c).collect::<Vec<_>>(), vec![1, 4]);
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.next_column(), 0);
    }

    #[test]
    fn test_column_spec_list_pairs_by_position() {
        let specs = column_spec_list(
            &["id", "name", "extra"],
            &[vec!["ID"], vec!["Basic", "Name"]],
        );
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[1], ColumnSpec::new(1, "name", ["Basic", "Name"]));
    }

    #[test]
    fn test_schema_rejects_duplicate_deepest_labels() {
        let specs = vec![
            ColumnSpec::new(0, "home", ["Phone", "Number"]),
            ColumnSpec::new(1, "work", ["Office", "Number"]),
        ];
        let err = Schema::new(specs).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
        assert!(err.to_string().contains("ambiguous duplicate label 'Number'"));

        // a hidden spec may repeat a label
        let specs = vec![
            ColumnSpec::new(0, "home", ["Number"]),
            ColumnSpec::new(-1, "work", ["Number"]),
        ];
        assert!(Schema::new(specs).is_ok());
    }

    #[test]
    fn test_schema_rejects_shared_column() {
        let specs = vec![
            ColumnSpec::new(0, "a", ["A"]),
            ColumnSpec::new(0, "b", ["B"]),
        ];
        assert_eq!(Schema::new(specs).unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_schema_from_json() {
        let json = r#"[
            {"column_index": 0, "field_name": "id", "labels": ["ID"]},
            {"column_index": 1, "field_name": "price", "labels": ["Price"], "format": "0.00"}
        ]"#;
        let schema = Schema::from_json(json).unwrap();
        assert_eq!(schema.spec("price").and_then(|s| s.format()), Some("0.00"));
        assert_eq!(schema.column_field_map().get(0), Some("id"));

        assert_eq!(
            Schema::from_json("{").unwrap_err().kind(),
            ErrorKind::Validation
        );
    }
}
