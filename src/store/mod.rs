//! Store backends for the staging and target relations
//!
//! The pipeline talks to its backing datastore through two narrow traits:
//! - [`StagingStore`]: enumerate the raw records of the staging relation
//! - [`TargetStore`]: drop/create relations, bulk-insert rows, count rows
//!
//! Backends:
//! - Memory: always available, used by tests and dry runs
//! - DuckDB: embedded database for native CLI runs
//! - PostgreSQL: for server deployments

use async_trait::async_trait;

use crate::models::{RawRecord, Row, TableDef};

#[cfg(feature = "duckdb-backend")]
pub mod duckdb;
pub mod memory;
#[cfg(feature = "postgres-backend")]
pub mod postgres;

#[cfg(feature = "duckdb-backend")]
pub use self::duckdb::DuckDbStore;
pub use self::memory::MemoryStore;
#[cfg(feature = "postgres-backend")]
pub use self::postgres::PostgresStore;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to connect to the datastore
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Statement execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Relation does not exist
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Rows do not fit the relation
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Backend not compiled in or not configured
    #[error("Unsupported backend: {0}")]
    Unsupported(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Read side: the staging relation holding raw, untyped records
///
/// Enumeration order is unspecified; consumers that need an order sort.
#[async_trait(?Send)]
pub trait StagingStore {
    /// Column names of a relation in declaration order
    async fn column_names(&self, table: &str) -> StoreResult<Vec<String>>;

    /// All records of a relation, every value as text or null
    async fn read_records(&self, table: &str) -> StoreResult<Vec<RawRecord>>;

    /// Number of records in a relation
    async fn count_records(&self, table: &str) -> StoreResult<u64>;

    /// Number of distinct non-null values of one column
    async fn count_distinct(&self, table: &str, column: &str) -> StoreResult<u64>;
}

/// Write side: the relations produced by the pipeline
///
/// Keys are always supplied by the caller; no backend auto-generates them.
#[async_trait(?Send)]
pub trait TargetStore {
    /// Drop the relation if it exists and create it empty
    async fn recreate_table(&self, table: &TableDef) -> StoreResult<()>;

    /// Bulk-insert rows ordered like `table.columns`
    ///
    /// # Returns
    /// Number of rows inserted
    async fn insert_rows(&self, table: &TableDef, rows: &[Row]) -> StoreResult<usize>;

    /// Number of rows in a relation
    async fn count_rows(&self, table: &str) -> StoreResult<u64>;

    /// Backend type name ("memory", "duckdb" or "postgres")
    fn backend_type(&self) -> &'static str;
}

/// A backend serving both sides of the pipeline
pub trait Store: StagingStore + TargetStore {}

impl<T: StagingStore + TargetStore> Store for T {}

/// Check that every row has one cell per column
pub(crate) fn check_arity(table: &TableDef, rows: &[Row]) -> StoreResult<()> {
    let expected = table.columns.len();
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != expected) {
        return Err(StoreError::InvalidInput(format!(
            "row {} for table {} has {} values, expected {}",
            i,
            table.name,
            row.len(),
            expected
        )));
    }
    Ok(())
}
