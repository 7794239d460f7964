//! In-memory store backend
//!
//! Keeps every relation as a vector of rows behind a mutex. Used by tests
//! and by dry runs where nothing needs to persist.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::{StagingStore, StoreError, StoreResult, TargetStore, check_arity};
use crate::models::{CellValue, RawRecord, RecordLayout, Row, TableDef};

#[derive(Debug, Clone)]
struct MemoryTable {
    def: TableDef,
    rows: Vec<Row>,
    /// Primary key column and the keys seen so far
    primary_key: Option<(usize, HashSet<CellValue>)>,
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<BTreeMap<String, MemoryTable>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, BTreeMap<String, MemoryTable>>> {
        self.tables
            .lock()
            .map_err(|e| StoreError::ConnectionFailed(format!("Lock error: {}", e)))
    }

    /// Rows of a relation, in insertion order
    pub fn rows(&self, table: &str) -> StoreResult<Vec<Row>> {
        let tables = self.lock()?;
        tables
            .get(table)
            .map(|t| t.rows.clone())
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))
    }

    /// Whether a relation exists
    pub fn has_table(&self, table: &str) -> bool {
        self.lock().map(|t| t.contains_key(table)).unwrap_or(false)
    }

    /// Names of every relation, sorted
    pub fn table_names(&self) -> Vec<String> {
        self.lock()
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait(?Send)]
impl StagingStore for MemoryStore {
    async fn column_names(&self, table: &str) -> StoreResult<Vec<String>> {
        let tables = self.lock()?;
        let t = tables
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        Ok(t.def.columns.iter().map(|c| c.name.clone()).collect())
    }

    async fn read_records(&self, table: &str) -> StoreResult<Vec<RawRecord>> {
        let tables = self.lock()?;
        let t = tables
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;

        let layout = Arc::new(RecordLayout::new(t.def.columns.iter().map(|c| c.name.clone())));
        Ok(t.rows
            .iter()
            .map(|row| RawRecord::new(layout.clone(), row.iter().map(|c| c.as_text()).collect()))
            .collect())
    }

    async fn count_records(&self, table: &str) -> StoreResult<u64> {
        self.count_rows(table).await
    }

    async fn count_distinct(&self, table: &str, column: &str) -> StoreResult<u64> {
        let tables = self.lock()?;
        let t = tables
            .get(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        let i = t
            .def
            .columns
            .iter()
            .position(|c| c.name == column)
            .ok_or_else(|| StoreError::QueryFailed(format!("no column {} in {}", column, table)))?;

        let distinct: HashSet<&CellValue> = t
            .rows
            .iter()
            .map(|row| &row[i])
            .filter(|v| !v.is_null())
            .collect();
        Ok(distinct.len() as u64)
    }
}

#[async_trait(?Send)]
impl TargetStore for MemoryStore {
    async fn recreate_table(&self, table: &TableDef) -> StoreResult<()> {
        let mut tables = self.lock()?;
        tables.insert(
            table.name.clone(),
            MemoryTable {
                def: table.clone(),
                rows: Vec::new(),
                primary_key: table
                    .columns
                    .iter()
                    .position(|c| c.primary_key)
                    .map(|i| (i, HashSet::new())),
            },
        );
        Ok(())
    }

    async fn insert_rows(&self, table: &TableDef, rows: &[Row]) -> StoreResult<usize> {
        check_arity(table, rows)?;
        let mut tables = self.lock()?;
        let t = tables
            .get_mut(&table.name)
            .ok_or_else(|| StoreError::TableNotFound(table.name.clone()))?;

        if let Some((pk, keys)) = &mut t.primary_key {
            let pk = *pk;
            let mut batch = HashSet::with_capacity(rows.len());
            for row in rows {
                let key = &row[pk];
                if key.is_null() || keys.contains(key) || !batch.insert(key.clone()) {
                    return Err(StoreError::QueryFailed(format!(
                        "primary key violation on {}.{}: {:?}",
                        table.name, t.def.columns[pk].name, key
                    )));
                }
            }
            keys.extend(batch);
        }

        t.rows.extend(rows.iter().cloned());
        Ok(rows.len())
    }

    async fn count_rows(&self, table: &str) -> StoreResult<u64> {
        let tables = self.lock()?;
        tables
            .get(table)
            .map(|t| t.rows.len() as u64)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Column;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[tokio::test]
    async fn test_recreate_discards_rows() {
        let store = MemoryStore::new();
        let table = TableDef::all_text("nar_raw", ["a"]);
        store.recreate_table(&table).await.unwrap();
        store.insert_rows(&table, &[vec![text("1")]]).await.unwrap();
        assert_eq!(store.count_rows("nar_raw").await.unwrap(), 1);

        store.recreate_table(&table).await.unwrap();
        assert_eq!(store.count_rows("nar_raw").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_read_records() {
        let store = MemoryStore::new();
        let table = TableDef::all_text("nar_raw", ["LOC_GUID", "ADDR_GUID"]);
        store.recreate_table(&table).await.unwrap();
        store
            .insert_rows(&table, &[vec![CellValue::Null, text("a1")]])
            .await
            .unwrap();

        let records = store.read_records("nar_raw").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("ADDR_GUID"), Some("a1"));
        assert_eq!(records[0].get("LOC_GUID"), None);
        assert_eq!(
            store.column_names("nar_raw").await.unwrap(),
            vec!["LOC_GUID", "ADDR_GUID"]
        );
    }

    #[tokio::test]
    async fn test_count_distinct_ignores_nulls() {
        let store = MemoryStore::new();
        let table = TableDef::all_text("nar_raw", ["LOC_GUID"]);
        store.recreate_table(&table).await.unwrap();
        store
            .insert_rows(
                &table,
                &[
                    vec![text("A")],
                    vec![text("A")],
                    vec![text("B")],
                    vec![CellValue::Null],
                ],
            )
            .await
            .unwrap();
        assert_eq!(store.count_distinct("nar_raw", "LOC_GUID").await.unwrap(), 2);
        assert!(store.count_distinct("nar_raw", "NOPE").await.is_err());
    }

    #[tokio::test]
    async fn test_missing_table() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.read_records("nope").await,
            Err(StoreError::TableNotFound(_))
        ));
        assert!(matches!(
            store.count_rows("nope").await,
            Err(StoreError::TableNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_primary_key_violation() {
        let store = MemoryStore::new();
        let table = TableDef::new(
            "street_type",
            vec![Column::integer("id").with_primary_key(), Column::text("v")],
        );
        store.recreate_table(&table).await.unwrap();
        store
            .insert_rows(&table, &[vec![CellValue::Integer(1), text("ST")]])
            .await
            .unwrap();
        let err = store
            .insert_rows(&table, &[vec![CellValue::Integer(1), text("AVE")]])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::QueryFailed(_)));
    }
}
