//! CLI command implementations

pub mod init;
pub mod run;
pub mod validate;

use std::path::PathBuf;

use crate::cli::error::CliError;
use crate::config::{BackendType, PipelineConfig};
use crate::store::{MemoryStore, Store};

/// Options shared by every command that touches a store
#[derive(Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Configuration file; the working directory's file when absent
    pub config: Option<PathBuf>,
    /// Backend override
    pub backend: Option<String>,
    /// DuckDB path or PostgreSQL URL, depending on the backend
    pub database: Option<String>,
}

/// Load the configuration and apply command line overrides on top
pub fn load_config(args: &ConnectionArgs) -> Result<PipelineConfig, CliError> {
    if let Some(path) = &args.config
        && !path.exists()
    {
        return Err(CliError::FileNotFound(path.clone()));
    }

    let mut config = PipelineConfig::load(args.config.as_deref())?;

    if let Some(backend) = &args.backend {
        config.database.backend = backend
            .parse()
            .map_err(|e: String| CliError::InvalidArgument(e))?;
    }

    if let Some(database) = &args.database {
        match config.database.backend {
            BackendType::Postgres => config.postgres.connection_string = Some(database.clone()),
            BackendType::DuckDB => config.database.path = database.clone(),
            BackendType::Memory => {
                return Err(CliError::InvalidArgument(
                    "--database has no meaning for the memory backend".to_string(),
                ));
            }
        }
    }

    config.validate()?;
    Ok(config)
}

/// Open the configured backend
pub async fn open_store(config: &PipelineConfig) -> Result<Box<dyn Store>, CliError> {
    match config.database.backend {
        BackendType::Memory => Ok(Box::new(MemoryStore::new())),
        BackendType::DuckDB => {
            #[cfg(feature = "duckdb-backend")]
            {
                let db_path = config.get_duckdb_path();
                tracing::info!("Opening DuckDB database at {}", db_path.display());
                let store = crate::store::DuckDbStore::open(&db_path)?;
                Ok(Box::new(store))
            }
            #[cfg(not(feature = "duckdb-backend"))]
            {
                Err(CliError::InvalidArgument(
                    "DuckDB backend not enabled. Build with --features duckdb-backend".to_string(),
                ))
            }
        }
        BackendType::Postgres => {
            #[cfg(feature = "postgres-backend")]
            {
                let conn_str = config.get_postgres_connection_string().ok_or_else(|| {
                    CliError::InvalidArgument(
                        "PostgreSQL connection string not configured".to_string(),
                    )
                })?;
                let store =
                    crate::store::PostgresStore::connect(conn_str, config.postgres.pool_size)
                        .await?;
                tracing::info!("Connected to {}", store.connection_string_masked());
                Ok(Box::new(store))
            }
            #[cfg(not(feature = "postgres-backend"))]
            {
                Err(CliError::InvalidArgument(
                    "PostgreSQL backend not enabled. Build with --features postgres-backend"
                        .to_string(),
                ))
            }
        }
    }
}

/// Tokio runtime the commands block on
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::IoError(format!("Failed to create runtime: {}", e)))
}
