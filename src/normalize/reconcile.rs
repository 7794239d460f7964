//! Row-count reconciliation between staging and the fact tables

use serde::{Deserialize, Serialize};

use super::facts::ResolutionStats;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::store::Store;

/// Overall reconciliation outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconciliationStatus {
    Balanced,
    Mismatch,
}

/// Counts before and after the transform
///
/// A mismatch is reported, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub raw_count: u64,
    pub parent_count: u64,
    pub child_count: u64,
    /// Distinct non-null group ids in staging
    pub distinct_group_count: u64,
    /// `raw_count - child_count`
    pub child_delta: i64,
    /// `distinct_group_count - parent_count`
    pub parent_delta: i64,
    pub status: ReconciliationStatus,
    #[serde(skip)]
    pub staging_table: String,
    #[serde(skip)]
    pub parent_table: String,
    #[serde(skip)]
    pub child_table: String,
    /// Lookup outcomes, when the report follows a fact build
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resolution: Vec<ResolutionStats>,
}

impl ReconciliationReport {
    pub fn is_balanced(&self) -> bool {
        self.status == ReconciliationStatus::Balanced
    }

    /// Lookups that had a value but found no dimension member
    pub fn total_unresolved(&self) -> u64 {
        self.resolution.iter().map(|s| s.unresolved).sum()
    }
}

impl std::fmt::Display for ReconciliationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Total number of records from {} table: {}",
            self.staging_table, self.raw_count
        )?;
        writeln!(
            f,
            "Total number of records from {} table: {}",
            self.parent_table, self.parent_count
        )?;
        writeln!(
            f,
            "Total number of records from {} table: {}",
            self.child_table, self.child_count
        )?;
        writeln!(
            f,
            "Distinct {} groups in {} table: {}",
            self.parent_table, self.staging_table, self.distinct_group_count
        )?;

        if self.child_delta == 0 {
            writeln!(f, "Number of records match between raw table and data tables.")?;
        } else {
            writeln!(
                f,
                "Number of records between raw table and data tables are off by {}.",
                self.child_delta
            )?;
        }
        if self.parent_delta != 0 {
            writeln!(
                f,
                "Number of groups between raw table and {} table are off by {}.",
                self.parent_table, self.parent_delta
            )?;
        }

        for stats in &self.resolution {
            if stats.unresolved > 0 {
                writeln!(
                    f,
                    "{}: {} values not found in {}",
                    stats.column, stats.unresolved, stats.dimension
                )?;
            }
        }
        Ok(())
    }
}

/// Compares post-transform counts with pre-transform counts
pub struct ReconciliationValidator<'a, S: Store + ?Sized> {
    store: &'a S,
    config: &'a PipelineConfig,
}

impl<'a, S: Store + ?Sized> ReconciliationValidator<'a, S> {
    pub fn new(store: &'a S, config: &'a PipelineConfig) -> Self {
        Self { store, config }
    }

    /// Count staging records, distinct groups and fact rows
    ///
    /// Only storage failures are errors.
    pub async fn validate(&self) -> PipelineResult<ReconciliationReport> {
        let staging = self.config.staging.table.as_str();
        let model = &self.config.model;

        let raw_count = self
            .store
            .count_records(staging)
            .await
            .map_err(PipelineError::staging)?;
        let distinct_group_count = self
            .store
            .count_distinct(staging, &model.group_id)
            .await
            .map_err(PipelineError::staging)?;
        let parent_count = self
            .store
            .count_rows(&model.parent.table)
            .await
            .map_err(PipelineError::target)?;
        let child_count = self
            .store
            .count_rows(&model.child.table)
            .await
            .map_err(PipelineError::target)?;

        let child_delta = raw_count as i64 - child_count as i64;
        let parent_delta = distinct_group_count as i64 - parent_count as i64;
        let status = if child_delta == 0 && parent_delta == 0 {
            ReconciliationStatus::Balanced
        } else {
            ReconciliationStatus::Mismatch
        };

        if status == ReconciliationStatus::Mismatch {
            tracing::warn!(
                "Reconciliation mismatch: child delta {}, parent delta {}",
                child_delta,
                parent_delta
            );
        } else {
            tracing::info!("Reconciliation balanced: {} records", raw_count);
        }

        Ok(ReconciliationReport {
            raw_count,
            parent_count,
            child_count,
            distinct_group_count,
            child_delta,
            parent_delta,
            status,
            staging_table: staging.to_string(),
            parent_table: model.parent.table.clone(),
            child_table: model.child.table.clone(),
            resolution: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CellValue, TableDef};
    use crate::store::{MemoryStore, StoreError, TargetStore};

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    async fn seed(store: &MemoryStore, config: &PipelineConfig, raw: &[&[Option<&str>]], parents: usize, children: usize) {
        let staging = TableDef::all_text(&config.staging.table, ["ADDR_GUID", "LOC_GUID"]);
        store.recreate_table(&staging).await.unwrap();
        let rows: Vec<_> = raw
            .iter()
            .map(|r| r.iter().map(|v| CellValue::from_text(*v)).collect())
            .collect();
        store.insert_rows(&staging, &rows).await.unwrap();

        let parent = TableDef::all_text(&config.model.parent.table, ["LOC_GUID"]);
        store.recreate_table(&parent).await.unwrap();
        let rows: Vec<_> = (0..parents).map(|i| vec![text(&i.to_string())]).collect();
        store.insert_rows(&parent, &rows).await.unwrap();

        let child = TableDef::all_text(&config.model.child.table, ["ADDR_GUID"]);
        store.recreate_table(&child).await.unwrap();
        let rows: Vec<_> = (0..children).map(|i| vec![text(&i.to_string())]).collect();
        store.insert_rows(&child, &rows).await.unwrap();
    }

    const RAW: &[&[Option<&str>]] = &[
        &[Some("a1"), Some("A")],
        &[Some("a2"), Some("A")],
        &[Some("b1"), Some("B")],
        &[Some("n1"), None],
        &[Some("b2"), Some("B")],
    ];

    #[tokio::test]
    async fn test_balanced() {
        let store = MemoryStore::new();
        let config = PipelineConfig::memory();
        seed(&store, &config, RAW, 2, 5).await;

        let report = ReconciliationValidator::new(&store, &config)
            .validate()
            .await
            .unwrap();
        assert_eq!(report.raw_count, 5);
        assert_eq!(report.distinct_group_count, 2);
        assert!(report.is_balanced());
        assert!(
            report
                .to_string()
                .contains("Number of records match between raw table and data tables.")
        );
    }

    #[tokio::test]
    async fn test_mismatch_is_reported() {
        let store = MemoryStore::new();
        let config = PipelineConfig::memory();
        seed(&store, &config, RAW, 3, 4).await;

        let report = ReconciliationValidator::new(&store, &config)
            .validate()
            .await
            .unwrap();
        assert_eq!(report.status, ReconciliationStatus::Mismatch);
        assert_eq!(report.child_delta, 1);
        assert_eq!(report.parent_delta, -1);
        let text = report.to_string();
        assert!(text.contains("are off by 1."));
        assert!(text.contains("location table are off by -1."));
    }

    #[tokio::test]
    async fn test_missing_fact_table_is_target_error() {
        let store = MemoryStore::new();
        let config = PipelineConfig::memory();
        let staging = TableDef::all_text(&config.staging.table, ["ADDR_GUID", "LOC_GUID"]);
        store.recreate_table(&staging).await.unwrap();

        let err = ReconciliationValidator::new(&store, &config)
            .validate()
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::TargetUnavailable(StoreError::TableNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_staging_is_source_error() {
        let store = MemoryStore::new();
        let config = PipelineConfig::memory();
        let err = ReconciliationValidator::new(&store, &config)
            .validate()
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::SourceUnavailable(_)));
    }
}
