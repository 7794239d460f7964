//! CLI-specific error types

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::error::PipelineError;
use crate::store::StoreError;

/// CLI-specific error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to write file {0}: {1}")]
    FileWriteError(PathBuf, String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] StoreError),

    #[error("Pipeline error: {0}")]
    PipelineError(#[from] PipelineError),

    #[error("IO error: {0}")]
    IoError(String),
}
