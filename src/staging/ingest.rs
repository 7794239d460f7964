//! File discovery and CSV loading

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::error::IngestError;
use crate::models::{CellValue, Row, TableDef};
use crate::store::TargetStore;
use crate::validation::sanitize_attribute_name;

/// Statistics from an ingestion run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestStats {
    /// Number of files processed
    pub files_processed: usize,
    /// Number of records ingested
    pub records_ingested: usize,
    /// Total bytes processed
    pub bytes_processed: u64,
    /// Duration of the ingestion
    #[serde(skip)]
    pub duration: Duration,
}

impl IngestStats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Get records per second throughput
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.records_ingested as f64 / secs
        }
    }

    /// Format duration as human-readable string
    pub fn duration_string(&self) -> String {
        let secs = self.duration.as_secs();
        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else {
            format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
        }
    }
}

/// A discovered file to ingest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

impl DiscoveredFile {
    pub fn new(path: PathBuf, size: u64) -> Self {
        Self { path, size }
    }
}

/// Discover files matching a pattern in a local directory
///
/// Only regular files are returned, sorted by path so that repeated runs
/// load files in the same order.
pub fn discover_files(base_path: &Path, pattern: &str) -> Result<Vec<DiscoveredFile>, IngestError> {
    let mut files = Vec::new();

    let full_pattern = if Path::new(pattern).is_absolute() {
        pattern.to_string()
    } else {
        let escaped = glob::Pattern::escape(&base_path.display().to_string());
        format!("{}/{}", escaped, pattern)
    };

    let entries = glob::glob(&full_pattern)
        .map_err(|e| IngestError::InvalidPattern(format!("{}: {}", pattern, e)))?;

    for entry in entries {
        match entry {
            Ok(path) => {
                if path.is_file() {
                    let metadata = fs::metadata(&path)?;
                    files.push(DiscoveredFile::new(path, metadata.len()));
                }
            }
            Err(e) => {
                tracing::warn!("Error accessing path: {}", e);
            }
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(files)
}

fn csv_reader(path: &Path) -> Result<csv::Reader<fs::File>, IngestError> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_error(path, e))
}

fn csv_error(path: &Path, error: csv::Error) -> IngestError {
    let record = error.position().map(|p| p.record()).unwrap_or(0);
    match error.into_kind() {
        csv::ErrorKind::Io(io) => IngestError::Io(io),
        kind => IngestError::CsvParse {
            path: path.to_path_buf(),
            record,
            error: format!("{:?}", kind),
        },
    }
}

/// Sanitized header of a CSV file
fn read_header(path: &Path, reader: &mut csv::Reader<fs::File>) -> Result<Vec<String>, IngestError> {
    let header = reader.byte_headers().map_err(|e| csv_error(path, e))?;

    let columns: Vec<String> = header
        .iter()
        .map(|field| {
            let raw = String::from_utf8_lossy(field);
            sanitize_attribute_name(raw.trim_start_matches('\u{feff}'))
        })
        .collect();

    if columns.is_empty() || (columns.len() == 1 && header.iter().all(|f| f.is_empty())) {
        return Err(IngestError::InvalidHeader {
            path: path.to_path_buf(),
            reason: "header row is empty".to_string(),
        });
    }

    let mut seen = std::collections::HashSet::new();
    if let Some(dup) = columns.iter().find(|c| !seen.insert(c.as_str())) {
        return Err(IngestError::InvalidHeader {
            path: path.to_path_buf(),
            reason: format!("duplicate column after sanitizing: {}", dup),
        });
    }

    Ok(columns)
}

/// Build the staging table definition from a file's header row
///
/// Only the header is read. Every column is text; spaces and other
/// characters that are not valid in an identifier become `_`.
pub fn infer_staging_table(path: &Path, table: &str) -> Result<TableDef, IngestError> {
    let mut reader = csv_reader(path)?;
    let columns = read_header(path, &mut reader)?;
    Ok(TableDef::all_text(table, columns))
}

/// Drop and recreate the staging table, then bulk-load every file into it
///
/// The table layout comes from the first file's header; every other file
/// must carry the same header. Empty fields are stored as null and bytes
/// that are not valid UTF-8 are replaced.
pub async fn load_files<T>(
    target: &T,
    table: &str,
    files: &[DiscoveredFile],
    batch_size: usize,
) -> Result<IngestStats, IngestError>
where
    T: TargetStore + ?Sized,
{
    let start = Instant::now();
    let mut stats = IngestStats::new();

    let Some(first) = files.first() else {
        return Err(IngestError::InvalidPattern("no input files to load".to_string()));
    };

    let table_def = infer_staging_table(&first.path, table)?;
    let expected = table_def.column_names().join(",");
    let width = table_def.columns.len();
    let batch_size = batch_size.max(1);

    tracing::info!("Creating staging table {} with {} columns", table, width);
    target.recreate_table(&table_def).await?;

    for file in files {
        let mut reader = csv_reader(&file.path)?;
        let header = read_header(&file.path, &mut reader)?;
        if header.join(",") != expected {
            return Err(IngestError::HeaderMismatch {
                path: file.path.clone(),
                expected: first.path.clone(),
            });
        }

        tracing::info!("Loading {} into {}", file.path.display(), table);
        let mut batch: Vec<Row> = Vec::with_capacity(batch_size);
        let mut file_records = 0usize;

        for result in reader.byte_records() {
            let record = result.map_err(|e| csv_error(&file.path, e))?;
            if record.len() > width {
                return Err(IngestError::CsvParse {
                    path: file.path.clone(),
                    record: record.position().map(|p| p.record()).unwrap_or(0),
                    error: format!("expected {} fields, found {}", width, record.len()),
                });
            }

            let mut row: Row = record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        CellValue::Null
                    } else {
                        CellValue::Text(String::from_utf8_lossy(field).into_owned())
                    }
                })
                .collect();
            row.resize(width, CellValue::Null);
            batch.push(row);

            if batch.len() >= batch_size {
                file_records += target.insert_rows(&table_def, &batch).await?;
                tracing::debug!("Staged batch of {} records", batch.len());
                batch.clear();
            }
        }

        if !batch.is_empty() {
            file_records += target.insert_rows(&table_def, &batch).await?;
        }

        stats.files_processed += 1;
        stats.records_ingested += file_records;
        stats.bytes_processed += file.size;
        tracing::info!("{} updated with {} records", table, file_records);
    }

    stats.duration = start.elapsed();

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, TargetStore};
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    #[test]
    fn test_ingest_stats() {
        let mut stats = IngestStats::new();
        stats.files_processed = 10;
        stats.records_ingested = 1000;
        stats.duration = Duration::from_secs(10);

        assert_eq!(stats.throughput(), 100.0);
        assert_eq!(stats.duration_string(), "10s");

        stats.duration = Duration::from_secs(90);
        assert_eq!(stats.duration_string(), "1m 30s");

        stats.duration = Duration::from_secs(3661);
        assert_eq!(stats.duration_string(), "1h 1m 1s");
    }

    #[test]
    fn test_discover_files_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "b.csv", b"A\n1\n");
        write_file(dir.path(), "a.csv", b"A\n1\n");
        write_file(dir.path(), "notes.txt", b"ignore");
        fs::create_dir(dir.path().join("dir.csv")).unwrap();

        let files = discover_files(dir.path(), "*.csv").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.csv", "b.csv"]);
        assert_eq!(files[0].size, 4);
    }

    #[test]
    fn test_invalid_pattern() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            discover_files(dir.path(), "[*.csv"),
            Err(IngestError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_infer_staging_table_sanitizes_header() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            dir.path(),
            "nar.csv",
            b"LOC GUID,ADDR_GUID,MAIL_STEET_DIR\nl1,a1,N\n",
        );

        let table = infer_staging_table(&path, "nar_raw").unwrap();
        assert_eq!(table.name, "nar_raw");
        assert_eq!(table.column_names(), vec!["LOC_GUID", "ADDR_GUID", "MAIL_STEET_DIR"]);
    }

    #[test]
    fn test_duplicate_sanitized_header_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "bad.csv", b"A B,A_B\n1,2\n");
        assert!(matches!(
            infer_staging_table(&path, "nar_raw"),
            Err(IngestError::InvalidHeader { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_files_empty_fields_are_null() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "1.csv", b"LOC_GUID,ADDR_GUID,CIVIC_NO\nl1,a1,12\n,a2,\n");
        write_file(dir.path(), "2.csv", b"LOC_GUID,ADDR_GUID,CIVIC_NO\nl2,a3\n");

        let store = MemoryStore::new();
        let files = discover_files(dir.path(), "*.csv").unwrap();
        let stats = load_files(&store, "nar_raw", &files, 1).await.unwrap();

        assert_eq!(stats.files_processed, 2);
        assert_eq!(stats.records_ingested, 3);
        assert_eq!(store.count_rows("nar_raw").await.unwrap(), 3);

        let rows = store.rows("nar_raw").unwrap();
        assert_eq!(rows[1][0], CellValue::Null);
        assert_eq!(rows[1][2], CellValue::Null);
        // Short rows are padded
        assert_eq!(rows[2][2], CellValue::Null);
    }

    #[tokio::test]
    async fn test_load_files_lossy_utf8() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "latin1.csv", b"CSD_ENG_NAME\nL\xe9vis\n");

        let store = MemoryStore::new();
        let files = discover_files(dir.path(), "*.csv").unwrap();
        load_files(&store, "nar_raw", &files, 100).await.unwrap();

        let rows = store.rows("nar_raw").unwrap();
        assert_eq!(rows[0][0], CellValue::Text("L\u{fffd}vis".to_string()));
    }

    #[tokio::test]
    async fn test_load_files_header_mismatch() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "1.csv", b"A,B\n1,2\n");
        write_file(dir.path(), "2.csv", b"A,C\n1,2\n");

        let store = MemoryStore::new();
        let files = discover_files(dir.path(), "*.csv").unwrap();
        let err = load_files(&store, "nar_raw", &files, 100).await.unwrap_err();
        assert!(matches!(err, IngestError::HeaderMismatch { .. }));
    }

    #[tokio::test]
    async fn test_load_files_too_many_fields() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "1.csv", b"A,B\n1,2,3\n");

        let store = MemoryStore::new();
        let files = discover_files(dir.path(), "*.csv").unwrap();
        let err = load_files(&store, "nar_raw", &files, 100).await.unwrap_err();
        assert!(matches!(err, IngestError::CsvParse { .. }));
    }

    #[tokio::test]
    async fn test_load_files_requires_input() {
        let store = MemoryStore::new();
        assert!(load_files(&store, "nar_raw", &[], 100).await.is_err());
    }
}
