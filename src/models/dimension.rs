//! Dimension definitions and populated dimensions

use serde::{Deserialize, Serialize};

use super::column::Column;
use super::record::NaturalKey;
use super::table::{CellValue, Row, TableDef};

/// Synthetic identifier of a dimension member
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurrogateKey(u32);

impl SurrogateKey {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<SurrogateKey> for i64 {
    fn from(key: SurrogateKey) -> Self {
        i64::from(key.0)
    }
}

impl std::fmt::Display for SurrogateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A dimension derived from observed staging values
///
/// Each entry of `sources` lists one raw attribute per natural-key column.
/// The distinct set is taken over the union of all sources, e.g. a street
/// type dimension fed by both the official and the mailing street type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DimensionDefinition {
    /// Target relation name
    pub name: String,
    /// Surrogate key column
    pub key_column: String,
    /// Natural key columns of the dimension relation
    pub natural_key: Vec<String>,
    /// Raw attribute paths feeding the dimension
    pub sources: Vec<Vec<String>>,
}

impl DimensionDefinition {
    /// Single-column dimension fed by one or more raw attributes
    pub fn single<I, S>(name: &str, column: &str, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.to_string(),
            key_column: format!("{}_id", column),
            natural_key: vec![column.to_string()],
            sources: attributes.into_iter().map(|a| vec![a.into()]).collect(),
        }
    }

    /// Composite-key dimension fed by a single tuple of raw attributes
    pub fn composite(name: &str, key_column: &str, natural_key: &[&str], attributes: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            key_column: key_column.to_string(),
            natural_key: natural_key.iter().map(|s| s.to_string()).collect(),
            sources: vec![attributes.iter().map(|s| s.to_string()).collect()],
        }
    }

    /// Every raw attribute this dimension reads
    pub fn source_attributes(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().flatten().map(String::as_str)
    }

    pub fn table_def(&self) -> TableDef {
        dimension_table(&self.name, &self.key_column, &self.natural_key)
    }
}

/// A seeded row of a reference dimension
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReferenceRow {
    /// Caller-assigned surrogate key
    pub key: SurrogateKey,
    /// Natural key values, one per natural key column
    pub values: Vec<String>,
}

impl ReferenceRow {
    pub fn new(key: u32, values: &[&str]) -> Self {
        Self {
            key: SurrogateKey::new(key),
            values: values.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// A dimension whose members are fixed business reference data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReferenceDimension {
    /// Target relation name
    pub name: String,
    /// Surrogate key column
    pub key_column: String,
    /// Natural key columns
    pub natural_key: Vec<String>,
    /// Seed rows
    #[serde(default)]
    pub rows: Vec<ReferenceRow>,
}

impl ReferenceDimension {
    pub fn table_def(&self) -> TableDef {
        dimension_table(&self.name, &self.key_column, &self.natural_key)
    }
}

fn dimension_table(name: &str, key_column: &str, natural_key: &[String]) -> TableDef {
    let mut columns = vec![Column::integer(key_column).with_primary_key()];
    columns.extend(natural_key.iter().map(Column::text));
    TableDef::new(name, columns)
}

/// A single dimension member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionRow {
    pub key: SurrogateKey,
    pub natural_key: NaturalKey,
}

/// A populated dimension, read-only once built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    /// Relation name
    pub name: String,
    /// Surrogate key column
    pub key_column: String,
    /// Natural key columns
    pub natural_key: Vec<String>,
    /// Members in ascending key order
    pub rows: Vec<DimensionRow>,
}

impl Dimension {
    pub fn table_def(&self) -> TableDef {
        dimension_table(&self.name, &self.key_column, &self.natural_key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Member carrying `key`, if any
    pub fn get(&self, key: SurrogateKey) -> Option<&DimensionRow> {
        self.rows
            .binary_search_by_key(&key, |r| r.key)
            .ok()
            .map(|i| &self.rows[i])
    }

    pub fn contains_key(&self, key: SurrogateKey) -> bool {
        self.get(key).is_some()
    }

    /// Position of a dimension column (key column included) or `None`
    pub fn column_position(&self, column: &str) -> Option<DimensionColumn> {
        if column == self.key_column {
            return Some(DimensionColumn::Key);
        }
        self.natural_key
            .iter()
            .position(|c| c == column)
            .map(DimensionColumn::Natural)
    }

    /// Rows ready for insertion, ordered like `table_def()` columns
    pub fn to_rows(&self) -> Vec<Row> {
        self.rows
            .iter()
            .map(|r| {
                let mut row = Vec::with_capacity(r.natural_key.arity() + 1);
                row.push(CellValue::Integer(r.key.into()));
                row.extend(
                    r.natural_key
                        .components()
                        .iter()
                        .map(|c| CellValue::from_text(c.as_deref())),
                );
                row
            })
            .collect()
    }
}

/// A column of a dimension relation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionColumn {
    /// The surrogate key column
    Key,
    /// Index into the natural key
    Natural(usize),
}
