//! Fact table layouts and fact rows

use serde::{Deserialize, Serialize};

use super::column::Column;
use super::dimension::SurrogateKey;
use super::table::{CellValue, Row, TableDef};

/// A column of the parent fact table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FactColumn {
    /// Raw attribute copied through unchanged
    Carried {
        /// Target column name
        name: String,
        /// Raw attribute (defaults to `name`)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source: Option<String>,
    },
    /// Surrogate key resolved against a dimension
    Lookup {
        /// Target column name
        name: String,
        /// Dimension (or reference dimension) name
        dimension: String,
        /// Raw attributes forming the lookup tuple
        attributes: Vec<String>,
        /// Dimension columns to match (defaults to the natural key)
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        match_columns: Vec<String>,
    },
}

impl FactColumn {
    pub fn carried(name: &str) -> Self {
        FactColumn::Carried {
            name: name.to_string(),
            source: None,
        }
    }

    pub fn lookup(name: &str, dimension: &str, attributes: &[&str]) -> Self {
        FactColumn::Lookup {
            name: name.to_string(),
            dimension: dimension.to_string(),
            attributes: attributes.iter().map(|s| s.to_string()).collect(),
            match_columns: Vec::new(),
        }
    }

    /// Lookup matching explicit dimension columns instead of the natural key
    pub fn lookup_by(name: &str, dimension: &str, attributes: &[&str], match_columns: &[&str]) -> Self {
        FactColumn::Lookup {
            name: name.to_string(),
            dimension: dimension.to_string(),
            attributes: attributes.iter().map(|s| s.to_string()).collect(),
            match_columns: match_columns.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FactColumn::Carried { name, .. } | FactColumn::Lookup { name, .. } => name,
        }
    }

    /// Raw attributes read by this column
    pub fn source_attributes(&self) -> Vec<&str> {
        match self {
            FactColumn::Carried { name, source } => vec![source.as_deref().unwrap_or(name)],
            FactColumn::Lookup { attributes, .. } => attributes.iter().map(String::as_str).collect(),
        }
    }

    fn to_column(&self) -> Column {
        match self {
            FactColumn::Carried { name, .. } => Column::text(name),
            FactColumn::Lookup { name, .. } => Column::integer(name),
        }
    }
}

/// Layout of the parent (one row per group) fact table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParentLayout {
    /// Relation name
    pub table: String,
    /// Columns after the group id column, in output order
    pub columns: Vec<FactColumn>,
}

impl ParentLayout {
    /// Table definition; the group id column leads and is the primary key
    pub fn table_def(&self, group_id: &str) -> TableDef {
        let mut columns = vec![Column::text(group_id).with_primary_key()];
        columns.extend(self.columns.iter().map(FactColumn::to_column));
        TableDef::new(&self.table, columns)
    }
}

/// Layout of the child (one row per raw record) fact table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChildLayout {
    /// Relation name
    pub table: String,
    /// Carried attributes after the record id and group id columns
    pub columns: Vec<String>,
}

impl ChildLayout {
    /// Table definition: record id, group id back-reference, carried columns
    ///
    /// The record id is not declared a primary key: a duplicated or null id
    /// in the source must still produce one child row per raw record.
    pub fn table_def(&self, record_id: &str, group_id: &str) -> TableDef {
        let mut columns = vec![Column::text(record_id), Column::text(group_id)];
        columns.extend(self.columns.iter().map(Column::text));
        TableDef::new(&self.table, columns)
    }
}

/// A value on a parent fact row
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FactValue {
    /// Carried-through text
    Text(Option<String>),
    /// Resolved surrogate key, `None` when unresolved
    Key(Option<SurrogateKey>),
}

impl FactValue {
    fn to_cell(&self) -> CellValue {
        match self {
            FactValue::Text(v) => CellValue::from_text(v.as_deref()),
            FactValue::Key(k) => CellValue::from(k.map(i64::from)),
        }
    }
}

/// One row per distinct non-null group id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentFact {
    pub group_id: String,
    /// Record id of the representative record
    pub representative: Option<String>,
    /// Values in `ParentLayout::columns` order
    pub values: Vec<FactValue>,
}

impl ParentFact {
    pub fn to_row(&self) -> Row {
        let mut row = Vec::with_capacity(self.values.len() + 1);
        row.push(CellValue::Text(self.group_id.clone()));
        row.extend(self.values.iter().map(FactValue::to_cell));
        row
    }
}

/// One row per raw record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChildFact {
    pub record_id: Option<String>,
    pub group_id: Option<String>,
    /// Carried values in `ChildLayout::columns` order
    pub values: Vec<Option<String>>,
}

impl ChildFact {
    pub fn to_row(&self) -> Row {
        let mut row = Vec::with_capacity(self.values.len() + 2);
        row.push(CellValue::from_text(self.record_id.as_deref()));
        row.push(CellValue::from_text(self.group_id.as_deref()));
        row.extend(self.values.iter().map(|v| CellValue::from_text(v.as_deref())));
        row
    }
}
