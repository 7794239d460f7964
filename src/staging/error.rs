//! Staging ingestion errors

use std::path::PathBuf;

use thiserror::Error;

use crate::store::StoreError;

/// Errors raised while discovering or loading raw files
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid file pattern: {0}")]
    InvalidPattern(String),

    #[error("No files matching {pattern} in {}", dir.display())]
    NoFiles { dir: PathBuf, pattern: String },

    #[error("CSV parse error in {} at record {record}: {error}", path.display())]
    CsvParse {
        path: PathBuf,
        record: u64,
        error: String,
    },

    #[error("Invalid header in {}: {reason}", path.display())]
    InvalidHeader { path: PathBuf, reason: String },

    /// A later file's header differs from the one the staging table was built from
    #[error("Header of {} does not match {}", path.display(), expected.display())]
    HeaderMismatch { path: PathBuf, expected: PathBuf },

    #[error("Staging write failed: {0}")]
    Store(#[from] StoreError),
}
