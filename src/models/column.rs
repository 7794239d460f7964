//! Column model for target relations

use serde::{Deserialize, Serialize};

/// Physical type of a target column
///
/// Staging and carried-through columns are text; surrogate keys and the
/// foreign keys that reference them are integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[default]
    Text,
    Integer,
}

impl ColumnType {
    /// SQL type name understood by both DuckDB and PostgreSQL
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "BIGINT",
        }
    }
}

/// Column of a target relation
///
/// # Example
///
/// ```rust
/// use nar_normalizer::models::{Column, ColumnType};
///
/// let column = Column::integer("street_type_id").with_primary_key();
/// assert_eq!(column.column_type, ColumnType::Integer);
/// assert!(column.primary_key);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Physical type
    #[serde(default)]
    pub column_type: ColumnType,
    /// Whether this column is the relation's primary key (default: false)
    #[serde(default)]
    pub primary_key: bool,
}

impl Column {
    /// Create a nullable text column
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::Text,
            primary_key: false,
        }
    }

    /// Create a nullable integer column
    pub fn integer(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::Integer,
            primary_key: false,
        }
    }

    /// Mark the column as the primary key
    pub fn with_primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Column definition fragment for `CREATE TABLE`
    pub fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", quote_identifier(&self.name), self.column_type.sql_type());
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        sql
    }
}

/// Quote an identifier for DuckDB/PostgreSQL
///
/// Embedded double quotes are doubled; configured names are validated
/// before they get here, so this only guards against header-derived names.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
