//! NAR normalizer - star-schema normalization of a flat address register
//!
//! Provides:
//! - Staging ingestion of raw CSV extracts (via store backends)
//! - Dimension extraction and reference dimension seeding
//! - Surrogate key resolution and parent/child fact building
//! - Row-count reconciliation of the result
//! - Configuration of the target model and connection

pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod staging;
pub mod store;
pub mod validation;

#[cfg(feature = "cli")]
pub mod cli;

// Re-export commonly used types
pub use config::{BackendType, ConfigError, PipelineConfig};
pub use error::{PipelineError, PipelineResult};
pub use pipeline::{Pipeline, PipelineReport};
pub use store::{MemoryStore, StagingStore, Store, StoreError, TargetStore};

#[cfg(feature = "duckdb-backend")]
pub use store::DuckDbStore;
#[cfg(feature = "postgres-backend")]
pub use store::PostgresStore;

// Re-export models
pub use models::{
    CellValue, Dimension, DimensionDefinition, FactColumn, NaturalKey, RawRecord,
    ReferenceDimension, SurrogateKey,
};

pub use normalize::{
    DimensionExtractor, FactBuilder, KeyResolver, ReconciliationReport, ReconciliationStatus,
    ReconciliationValidator, ReferenceLoader, Resolution,
};
