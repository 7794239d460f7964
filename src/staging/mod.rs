//! Staging ingestion for raw CSV extracts
//!
//! Loads the flat source files into a single all-text staging relation that
//! the normalization stages then read through [`crate::store::StagingStore`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use nar_normalizer::staging;
//! use nar_normalizer::store::MemoryStore;
//!
//! let store = MemoryStore::new();
//! let files = staging::discover_files("./data".as_ref(), "*.csv")?;
//! let stats = staging::load_files(&store, "nar_raw", &files, 10_000).await?;
//! println!("Staged {} records from {} files", stats.records_ingested, stats.files_processed);
//! ```

mod error;
mod ingest;

pub use error::IngestError;
pub use ingest::{DiscoveredFile, IngestStats, discover_files, infer_staging_table, load_files};
