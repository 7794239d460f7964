//! PostgreSQL store backend
//!
//! Provides a PostgreSQL backend for server deployments. Uses connection
//! pooling via deadpool-postgres; each operation checks a client out of the
//! pool for its own duration.

use std::sync::Arc;

use async_trait::async_trait;
use deadpool_postgres::{Config, Pool, PoolConfig, Runtime};
use tokio_postgres::NoTls;
use tokio_postgres::types::ToSql;

use super::{StagingStore, StoreError, StoreResult, TargetStore, check_arity};
use crate::models::{CellValue, ColumnType, RawRecord, RecordLayout, Row, TableDef, quote_identifier};

/// PostgreSQL caps a statement at 65535 bind parameters
const MAX_PARAMS_PER_STATEMENT: usize = 65_535;

/// PostgreSQL store
pub struct PostgresStore {
    /// Connection string
    connection_string: String,
    /// Connection pool
    pool: Pool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store
    ///
    /// # Arguments
    /// * `connection_string` - PostgreSQL connection string
    /// * `pool_size` - Maximum pooled connections
    pub async fn connect(connection_string: &str, pool_size: usize) -> StoreResult<Self> {
        let mut config = Config::new();
        config.url = Some(connection_string.to_string());
        config.pool = Some(PoolConfig::new(pool_size.max(1)));

        let pool = config
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| StoreError::ConnectionFailed(format!("Failed to create pool: {}", e)))?;

        let store = Self {
            connection_string: connection_string.to_string(),
            pool,
        };

        // Fail fast on bad credentials or an unreachable server
        store.client().await?;
        Ok(store)
    }

    /// Get the connection string (masked for security)
    pub fn connection_string_masked(&self) -> String {
        mask_connection_string(&self.connection_string)
    }

    async fn client(&self) -> StoreResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(|e| {
            StoreError::ConnectionFailed(format!(
                "Failed to connect to PostgreSQL at {}: {}",
                self.connection_string_masked(),
                e
            ))
        })
    }

    async fn table_columns(client: &tokio_postgres::Client, table: &str) -> StoreResult<Vec<String>> {
        let rows = client
            .query(
                "SELECT column_name::text FROM information_schema.columns \
                 WHERE table_schema = current_schema() AND table_name = $1 \
                 ORDER BY ordinal_position",
                &[&table],
            )
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Query failed: {}", e)))?;

        if rows.is_empty() {
            return Err(StoreError::TableNotFound(table.to_string()));
        }
        rows.iter()
            .map(|r| {
                r.try_get::<_, String>(0)
                    .map_err(|e| StoreError::QueryFailed(format!("Row fetch error: {}", e)))
            })
            .collect()
    }
}

/// Mask the password portion of a connection string
pub fn mask_connection_string(connection_string: &str) -> String {
    if let Some(at_pos) = connection_string.find('@')
        && let Some(colon_pos) = connection_string[..at_pos].rfind(':')
        && !connection_string[..colon_pos].ends_with('/')
    {
        let prefix = &connection_string[..colon_pos + 1];
        let suffix = &connection_string[at_pos..];
        return format!("{}****{}", prefix, suffix);
    }
    connection_string.to_string()
}

/// Typed bind parameter; nulls carry their column's type
fn to_param(value: &CellValue, column_type: ColumnType) -> Box<dyn ToSql + Sync> {
    match (column_type, value) {
        (ColumnType::Integer, CellValue::Integer(i)) => Box::new(Some(*i)),
        (ColumnType::Integer, CellValue::Null) => Box::new(None::<i64>),
        (ColumnType::Integer, CellValue::Text(s)) => Box::new(s.parse::<i64>().ok()),
        (ColumnType::Text, other) => Box::new(other.as_text()),
    }
}

#[async_trait(?Send)]
impl StagingStore for PostgresStore {
    async fn column_names(&self, table: &str) -> StoreResult<Vec<String>> {
        let client = self.client().await?;
        Self::table_columns(&client, table).await
    }

    async fn read_records(&self, table: &str) -> StoreResult<Vec<RawRecord>> {
        let client = self.client().await?;
        let columns = Self::table_columns(&client, table).await?;

        let select: Vec<String> = columns
            .iter()
            .map(|c| format!("{}::text", quote_identifier(c)))
            .collect();
        let sql = format!("SELECT {} FROM {}", select.join(", "), quote_identifier(table));

        let rows = client
            .query(sql.as_str(), &[])
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Query failed: {}", e)))?;

        let layout = Arc::new(RecordLayout::new(columns));
        rows.iter()
            .map(|row| {
                let values = (0..layout.len())
                    .map(|i| {
                        row.try_get::<_, Option<String>>(i).map_err(|e| {
                            StoreError::QueryFailed(format!("Column {} read failed: {}", i, e))
                        })
                    })
                    .collect::<StoreResult<Vec<_>>>()?;
                Ok(RawRecord::new(layout.clone(), values))
            })
            .collect()
    }

    async fn count_records(&self, table: &str) -> StoreResult<u64> {
        self.count_rows(table).await
    }

    async fn count_distinct(&self, table: &str, column: &str) -> StoreResult<u64> {
        let client = self.client().await?;
        Self::table_columns(&client, table).await?;

        let sql = format!(
            "SELECT COUNT(DISTINCT {}) FROM {}",
            quote_identifier(column),
            quote_identifier(table)
        );
        let row = client
            .query_one(sql.as_str(), &[])
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Count failed: {}", e)))?;
        let count: i64 = row
            .try_get(0)
            .map_err(|e| StoreError::QueryFailed(format!("Count failed: {}", e)))?;
        Ok(count as u64)
    }
}

#[async_trait(?Send)]
impl TargetStore for PostgresStore {
    async fn recreate_table(&self, table: &TableDef) -> StoreResult<()> {
        let client = self.client().await?;
        let sql = format!("{};\n{};", table.drop_sql(), table.create_sql());
        client.batch_execute(&sql).await.map_err(|e| {
            StoreError::QueryFailed(format!("Failed to recreate {}: {}", table.name, e))
        })
    }

    async fn insert_rows(&self, table: &TableDef, rows: &[Row]) -> StoreResult<usize> {
        check_arity(table, rows)?;
        if rows.is_empty() {
            return Ok(0);
        }

        let mut client = self.client().await?;
        let width = table.columns.len();
        let rows_per_statement = (MAX_PARAMS_PER_STATEMENT / width.max(1)).max(1);
        let columns: Vec<String> = table
            .columns
            .iter()
            .map(|c| quote_identifier(&c.name))
            .collect();

        let tx = client
            .transaction()
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Begin failed: {}", e)))?;

        let mut inserted = 0;
        for chunk in rows.chunks(rows_per_statement) {
            let tuples: Vec<String> = (0..chunk.len())
                .map(|r| {
                    let slots: Vec<String> =
                        (1..=width).map(|c| format!("${}", r * width + c)).collect();
                    format!("({})", slots.join(", "))
                })
                .collect();
            let sql = format!(
                "INSERT INTO {} ({}) VALUES {}",
                table.quoted_name(),
                columns.join(", "),
                tuples.join(", ")
            );

            let params: Vec<Box<dyn ToSql + Sync>> = chunk
                .iter()
                .flat_map(|row| {
                    row.iter()
                        .zip(&table.columns)
                        .map(|(value, column)| to_param(value, column.column_type))
                })
                .collect();
            let param_refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p.as_ref()).collect();

            let count = tx.execute(sql.as_str(), &param_refs).await.map_err(|e| {
                StoreError::QueryFailed(format!("Insert into {} failed: {}", table.name, e))
            })?;
            inserted += count as usize;
            tracing::debug!("Inserted {} rows into {}", count, table.name);
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Commit failed: {}", e)))?;
        Ok(inserted)
    }

    async fn count_rows(&self, table: &str) -> StoreResult<u64> {
        let client = self.client().await?;
        Self::table_columns(&client, table).await?;

        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
        let row = client
            .query_one(sql.as_str(), &[])
            .await
            .map_err(|e| StoreError::QueryFailed(format!("Count failed: {}", e)))?;
        let count: i64 = row
            .try_get(0)
            .map_err(|e| StoreError::QueryFailed(format!("Count failed: {}", e)))?;
        Ok(count as u64)
    }

    fn backend_type(&self) -> &'static str {
        "postgres"
    }
}
