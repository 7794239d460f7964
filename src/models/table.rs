//! Target relation definitions and row values

use serde::{Deserialize, Serialize};

use super::column::{Column, quote_identifier};

/// Definition of a relation the pipeline writes
///
/// Every stage drops and recreates its tables from one of these, so the
/// column list is the only schema information the stores need.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableDef {
    /// Relation name
    pub name: String,
    /// Ordered columns
    pub columns: Vec<Column>,
}

impl TableDef {
    /// Create a new table definition
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Create a table whose columns are all text (staging relations)
    pub fn all_text<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Column::text).collect(),
        }
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Quoted relation name
    pub fn quoted_name(&self) -> String {
        quote_identifier(&self.name)
    }

    /// `CREATE TABLE` statement (shared by DuckDB and PostgreSQL)
    pub fn create_sql(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(Column::to_sql).collect();
        format!(
            "CREATE TABLE {} (\n    {}\n)",
            self.quoted_name(),
            columns.join(",\n    ")
        )
    }

    /// `DROP TABLE IF EXISTS` statement
    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", self.quoted_name())
    }
}

/// A single cell written to or read from a store
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Integer(i64),
    Text(String),
}

impl CellValue {
    /// Text cell from an optional string, empty strings included as-is
    pub fn from_text(value: Option<&str>) -> Self {
        match value {
            Some(v) => CellValue::Text(v.to_string()),
            None => CellValue::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Text rendering (integers in decimal), `None` for null
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Integer(i) => Some(i.to_string()),
            CellValue::Text(s) => Some(s.clone()),
        }
    }
}

impl From<Option<i64>> for CellValue {
    fn from(value: Option<i64>) -> Self {
        value.map(CellValue::Integer).unwrap_or(CellValue::Null)
    }
}

/// Row of cells, ordered like its table's columns
pub type Row = Vec<CellValue>;
