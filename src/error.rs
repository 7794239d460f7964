//! Pipeline error taxonomy

use thiserror::Error;

use crate::config::ConfigError;
use crate::staging::IngestError;
use crate::store::StoreError;
use crate::validation::ValidationError;

/// Errors that abort a normalization run
///
/// An attribute that fails to resolve against its dimension is not an
/// error; it becomes a null foreign key and a counter on the report.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The staging relation could not be read
    #[error("Source unavailable: {0}")]
    SourceUnavailable(#[source] StoreError),

    /// A target relation could not be created or written
    #[error("Target unavailable: {0}")]
    TargetUnavailable(#[source] StoreError),

    /// A configured attribute is missing from the staging relation
    #[error("Schema mismatch: attribute {attribute} not found in {relation}")]
    SchemaMismatch { relation: String, attribute: String },

    /// The model or connection configuration is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Raw files could not be staged
    #[error(transparent)]
    Ingest(#[from] IngestError),
}

impl PipelineError {
    /// Store failure on the read side
    pub fn staging(err: StoreError) -> Self {
        PipelineError::SourceUnavailable(err)
    }

    /// Store failure on the write side
    pub fn target(err: StoreError) -> Self {
        PipelineError::TargetUnavailable(err)
    }
}

impl From<ValidationError> for PipelineError {
    fn from(err: ValidationError) -> Self {
        PipelineError::Config(err.to_string())
    }
}

impl From<ConfigError> for PipelineError {
    fn from(err: ConfigError) -> Self {
        PipelineError::Config(err.to_string())
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
