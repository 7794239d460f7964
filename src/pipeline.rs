//! Pipeline orchestration
//!
//! Runs the stages strictly in order against one store:
//! ingest (optional) → schema check → dimension extraction → reference
//! loading → resolver build → fact building → reconciliation.
//!
//! The schema check happens before anything is written, so a missing
//! attribute leaves every target table untouched.

use std::path::Path;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Dimension, RecordLayout};
use crate::normalize::{
    DimensionExtractor, FactBuilder, KeyResolver, ReconciliationReport, ReconciliationValidator,
    ReferenceLoader, check_attributes,
};
use crate::staging::{self, IngestError, IngestStats};
use crate::store::Store;

/// Wall-clock time spent in one stage
#[derive(Debug, Clone, Serialize)]
pub struct StageTiming {
    pub stage: String,
    pub seconds: f64,
}

/// Row count of one dimension table
#[derive(Debug, Clone, Serialize)]
pub struct DimensionSummary {
    pub name: String,
    pub rows: usize,
    /// True for seeded reference dimensions
    pub reference: bool,
}

/// Outcome of a completed run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingest: Option<IngestStats>,
    pub dimensions: Vec<DimensionSummary>,
    pub parent_rows: usize,
    pub child_rows: usize,
    pub reconciliation: ReconciliationReport,
    pub stages: Vec<StageTiming>,
    pub elapsed_seconds: f64,
}

impl PipelineReport {
    pub fn runtime(&self) -> String {
        format_runtime(Duration::from_secs_f64(self.elapsed_seconds))
    }
}

impl std::fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ingest) = &self.ingest {
            writeln!(
                f,
                "Staged {} records from {} files in {}",
                ingest.records_ingested,
                ingest.files_processed,
                ingest.duration_string()
            )?;
        }
        for dim in &self.dimensions {
            writeln!(f, "{} table: {} rows", dim.name, dim.rows)?;
        }
        write!(f, "{}", self.reconciliation)?;
        writeln!(f, "Runtime: {}", self.runtime())
    }
}

/// Format elapsed time as seconds below one minute, minutes above
///
/// ```
/// use std::time::Duration;
/// use nar_normalizer::pipeline::format_runtime;
///
/// assert_eq!(format_runtime(Duration::from_millis(12_340)), "12.34 seconds");
/// assert_eq!(format_runtime(Duration::from_secs(150)), "2.5 minutes");
/// ```
pub fn format_runtime(elapsed: Duration) -> String {
    let seconds = round2(elapsed.as_secs_f64());
    if seconds < 60.0 {
        format!("{} seconds", seconds)
    } else {
        format!("{} minutes", round2(seconds / 60.0))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

struct StageClock {
    stages: Vec<StageTiming>,
    current: Instant,
}

impl StageClock {
    fn new() -> Self {
        Self {
            stages: Vec::new(),
            current: Instant::now(),
        }
    }

    fn lap(&mut self, stage: &str) {
        let seconds = self.current.elapsed().as_secs_f64();
        tracing::info!("Stage {} finished in {}", stage, format_runtime(self.current.elapsed()));
        self.stages.push(StageTiming {
            stage: stage.to_string(),
            seconds,
        });
        self.current = Instant::now();
    }
}

/// Sequences the normalization stages over one store
pub struct Pipeline<'a, S: Store + ?Sized> {
    store: &'a S,
    config: &'a PipelineConfig,
}

impl<'a, S: Store + ?Sized> Pipeline<'a, S> {
    pub fn new(store: &'a S, config: &'a PipelineConfig) -> Self {
        Self { store, config }
    }

    /// Execute a full run
    ///
    /// # Arguments
    /// * `input` - directory of raw CSV files to stage first; `None` reuses
    ///   the existing staging table
    ///
    /// A reconciliation mismatch is part of the returned report, not an error.
    pub async fn run(&self, input: Option<&Path>) -> PipelineResult<PipelineReport> {
        self.config.validate()?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();
        let mut clock = StageClock::new();
        let staging_table = self.config.staging.table.as_str();
        let batch_size = self.config.staging.batch_size;
        let model = &self.config.model;

        tracing::info!(
            "Starting run {} on {} backend",
            run_id,
            self.store.backend_type()
        );

        let ingest = match input {
            Some(dir) => {
                let stats = self.ingest(dir).await?;
                clock.lap("ingest");
                Some(stats)
            }
            None => None,
        };

        let layout = self.check_schema().await?;
        clock.lap("schema check");

        let records = self
            .store
            .read_records(staging_table)
            .await
            .map_err(PipelineError::staging)?;
        tracing::info!(
            "Read {} records with {} attributes from {}",
            records.len(),
            layout.len(),
            staging_table
        );

        let extractor = DimensionExtractor::new(self.store, staging_table, batch_size);
        let mut dimensions: Vec<Dimension> = Vec::new();
        let mut summaries = Vec::new();
        for definition in &model.dimensions {
            let dimension = extractor.extract(definition, &records).await?;
            summaries.push(DimensionSummary {
                name: dimension.name.clone(),
                rows: dimension.len(),
                reference: false,
            });
            dimensions.push(dimension);
        }
        clock.lap("dimension extraction");

        let loader = ReferenceLoader::new(self.store, batch_size);
        for reference in &model.reference_dimensions {
            let dimension = loader.load(reference).await?;
            summaries.push(DimensionSummary {
                name: dimension.name.clone(),
                rows: dimension.len(),
                reference: true,
            });
            dimensions.push(dimension);
        }
        clock.lap("reference loading");

        let resolver = KeyResolver::build(dimensions, &model.parent.columns)?;
        clock.lap("resolver build");

        let builder = FactBuilder::new(model, &resolver)?;
        let output = builder.build(&records);
        let (parent_rows, child_rows) = builder.write(self.store, &output, batch_size).await?;
        clock.lap("fact building");

        let mut reconciliation = ReconciliationValidator::new(self.store, self.config)
            .validate()
            .await?;
        reconciliation.resolution = output.stats;
        clock.lap("reconciliation");

        let elapsed = start.elapsed();
        tracing::info!("Run {} completed in {}", run_id, format_runtime(elapsed));

        Ok(PipelineReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            backend: self.store.backend_type().to_string(),
            ingest,
            dimensions: summaries,
            parent_rows,
            child_rows,
            reconciliation,
            stages: clock.stages,
            elapsed_seconds: elapsed.as_secs_f64(),
        })
    }

    /// Re-run reconciliation against tables left by an earlier run
    pub async fn reconcile(&self) -> PipelineResult<ReconciliationReport> {
        ReconciliationValidator::new(self.store, self.config)
            .validate()
            .await
    }

    async fn ingest(&self, dir: &Path) -> PipelineResult<IngestStats> {
        let pattern = self.config.staging.pattern.as_str();
        let files = staging::discover_files(dir, pattern)?;
        if files.is_empty() {
            return Err(IngestError::NoFiles {
                dir: dir.to_path_buf(),
                pattern: pattern.to_string(),
            }
            .into());
        }

        tracing::info!("Found {} files matching {} in {}", files.len(), pattern, dir.display());
        let stats = staging::load_files(
            self.store,
            &self.config.staging.table,
            &files,
            self.config.staging.batch_size,
        )
        .await
        .map_err(|e| match e {
            IngestError::Store(err) => PipelineError::target(err),
            other => other.into(),
        })?;

        tracing::info!(
            "Staged {} records from {} files ({:.0} records/s)",
            stats.records_ingested,
            stats.files_processed,
            stats.throughput()
        );
        Ok(stats)
    }

    /// Every configured attribute must exist in staging before any write
    async fn check_schema(&self) -> PipelineResult<RecordLayout> {
        let table = self.config.staging.table.as_str();
        let columns = self
            .store
            .column_names(table)
            .await
            .map_err(PipelineError::staging)?;
        let layout = RecordLayout::new(columns);
        check_attributes(table, &layout, self.config.model.required_attributes())?;
        Ok(layout)
    }
}
