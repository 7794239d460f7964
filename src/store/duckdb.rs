//! DuckDB store backend
//!
//! Provides an embedded database backend for the staging relation, the
//! dimension tables and the fact tables. Supports both file-based
//! persistence and in-memory mode.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use duckdb::types::{ToSql, ToSqlOutput, Value, ValueRef};

use super::{StagingStore, StoreError, StoreResult, TargetStore, check_arity};
use crate::models::{CellValue, RawRecord, RecordLayout, Row, TableDef, quote_identifier};

impl ToSql for CellValue {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        Ok(match self {
            CellValue::Null => ToSqlOutput::Owned(Value::Null),
            CellValue::Integer(i) => ToSqlOutput::Owned(Value::BigInt(*i)),
            CellValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// DuckDB store
pub struct DuckDbStore {
    /// Path to the database file (None for in-memory)
    db_path: Option<PathBuf>,
    /// DuckDB connection (wrapped in Mutex for thread safety)
    connection: Mutex<duckdb::Connection>,
}

impl DuckDbStore {
    /// Open (or create) a file-based database
    pub fn open(db_path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = db_path.as_ref().to_path_buf();
        let connection = duckdb::Connection::open(&path).map_err(|e| {
            StoreError::ConnectionFailed(format!("Failed to open DuckDB {}: {}", path.display(), e))
        })?;

        Ok(Self {
            db_path: Some(path),
            connection: Mutex::new(connection),
        })
    }

    /// Create an in-memory database
    pub fn in_memory() -> StoreResult<Self> {
        let connection = duckdb::Connection::open_in_memory().map_err(|e| {
            StoreError::ConnectionFailed(format!("Failed to create in-memory DuckDB: {}", e))
        })?;

        Ok(Self {
            db_path: None,
            connection: Mutex::new(connection),
        })
    }

    /// Database file path (None for in-memory)
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    pub fn is_in_memory(&self) -> bool {
        self.db_path.is_none()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, duckdb::Connection>> {
        self.connection
            .lock()
            .map_err(|e| StoreError::ConnectionFailed(format!("Lock error: {}", e)))
    }

    fn table_columns(conn: &duckdb::Connection, table: &str) -> StoreResult<Vec<String>> {
        let mut stmt = conn
            .prepare(
                "SELECT column_name FROM information_schema.columns \
                 WHERE table_name = ? ORDER BY ordinal_position",
            )
            .map_err(|e| StoreError::QueryFailed(format!("Prepare failed: {}", e)))?;

        let names = stmt
            .query_map([table], |row| row.get::<_, String>(0))
            .map_err(|e| StoreError::QueryFailed(format!("Query failed: {}", e)))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::QueryFailed(format!("Row fetch error: {}", e)))?;

        if names.is_empty() {
            return Err(StoreError::TableNotFound(table.to_string()));
        }
        Ok(names)
    }
}

#[async_trait(?Send)]
impl StagingStore for DuckDbStore {
    async fn column_names(&self, table: &str) -> StoreResult<Vec<String>> {
        let conn = self.lock()?;
        Self::table_columns(&conn, table)
    }

    async fn read_records(&self, table: &str) -> StoreResult<Vec<RawRecord>> {
        let conn = self.lock()?;
        let columns = Self::table_columns(&conn, table)?;

        // Cast so integer-typed relations still read back as text
        let select: Vec<String> = columns
            .iter()
            .map(|c| format!("CAST({} AS VARCHAR)", quote_identifier(c)))
            .collect();
        let sql = format!("SELECT {} FROM {}", select.join(", "), quote_identifier(table));

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StoreError::QueryFailed(format!("Prepare failed: {}", e)))?;
        let mut rows = stmt
            .query([])
            .map_err(|e| StoreError::QueryFailed(format!("Query failed: {}", e)))?;

        let layout = Arc::new(RecordLayout::new(columns));
        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|e| StoreError::QueryFailed(format!("Row fetch error: {}", e)))?
        {
            let mut values = Vec::with_capacity(layout.len());
            for i in 0..layout.len() {
                let value: Option<String> = row
                    .get(i)
                    .map_err(|e| StoreError::QueryFailed(format!("Column {} read failed: {}", i, e)))?;
                values.push(value);
            }
            records.push(RawRecord::new(layout.clone(), values));
        }

        Ok(records)
    }

    async fn count_records(&self, table: &str) -> StoreResult<u64> {
        self.count_rows(table).await
    }

    async fn count_distinct(&self, table: &str, column: &str) -> StoreResult<u64> {
        let conn = self.lock()?;
        Self::table_columns(&conn, table)?;

        let sql = format!(
            "SELECT COUNT(DISTINCT {}) FROM {}",
            quote_identifier(column),
            quote_identifier(table)
        );
        let count: i64 = conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|e| StoreError::QueryFailed(format!("Count failed: {}", e)))?;
        Ok(count as u64)
    }
}

#[async_trait(?Send)]
impl TargetStore for DuckDbStore {
    async fn recreate_table(&self, table: &TableDef) -> StoreResult<()> {
        let conn = self.lock()?;
        let sql = format!("{};\n{};", table.drop_sql(), table.create_sql());
        conn.execute_batch(&sql).map_err(|e| {
            StoreError::QueryFailed(format!("Failed to recreate {}: {}", table.name, e))
        })
    }

    async fn insert_rows(&self, table: &TableDef, rows: &[Row]) -> StoreResult<usize> {
        check_arity(table, rows)?;
        if rows.is_empty() {
            return Ok(0);
        }

        let conn = self.lock()?;
        let placeholders = vec!["?"; table.columns.len()].join(", ");
        let columns: Vec<String> = table
            .columns
            .iter()
            .map(|c| quote_identifier(&c.name))
            .collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.quoted_name(),
            columns.join(", "),
            placeholders
        );

        conn.execute_batch("BEGIN TRANSACTION")
            .map_err(|e| StoreError::QueryFailed(format!("Begin failed: {}", e)))?;

        let result = (|| -> StoreResult<usize> {
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| StoreError::QueryFailed(format!("Prepare failed: {}", e)))?;
            for row in rows {
                stmt.execute(duckdb::params_from_iter(row.iter()))
                    .map_err(|e| {
                        StoreError::QueryFailed(format!("Insert into {} failed: {}", table.name, e))
                    })?;
            }
            Ok(rows.len())
        })();

        match result {
            Ok(count) => {
                conn.execute_batch("COMMIT")
                    .map_err(|e| StoreError::QueryFailed(format!("Commit failed: {}", e)))?;
                Ok(count)
            }
            Err(e) => {
                if let Err(rollback) = conn.execute_batch("ROLLBACK") {
                    tracing::warn!("Rollback of {} failed: {}", table.name, rollback);
                }
                Err(e)
            }
        }
    }

    async fn count_rows(&self, table: &str) -> StoreResult<u64> {
        let conn = self.lock()?;
        // Surface a missing relation as TableNotFound rather than a SQL error
        Self::table_columns(&conn, table)?;

        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
        let count: i64 = conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|e| StoreError::QueryFailed(format!("Count failed: {}", e)))?;
        Ok(count as u64)
    }

    fn backend_type(&self) -> &'static str {
        "duckdb"
    }
}
