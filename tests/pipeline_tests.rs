//! End-to-end pipeline tests over the built-in register model

mod common;

use async_trait::async_trait;
use nar_normalizer::models::{CellValue, RawRecord, Row, TableDef};
use nar_normalizer::store::StoreResult;
use nar_normalizer::{
    MemoryStore, Pipeline, PipelineConfig, PipelineError, ReconciliationStatus, StagingStore,
    StoreError, TargetStore,
};
use tempfile::TempDir;

use common::{HEADER, csv_line, input_dir, write_csv};

fn text(s: &str) -> CellValue {
    CellValue::Text(s.to_string())
}

#[tokio::test]
async fn test_full_run_balances() {
    let dir = input_dir();
    let store = MemoryStore::new();
    let config = PipelineConfig::memory();

    let report = Pipeline::new(&store, &config)
        .run(Some(dir.path()))
        .await
        .unwrap();

    let ingest = report.ingest.as_ref().unwrap();
    assert_eq!(ingest.files_processed, 1);
    assert_eq!(ingest.records_ingested, 5);

    assert_eq!(report.parent_rows, 2);
    assert_eq!(report.child_rows, 5);
    assert_eq!(report.reconciliation.raw_count, 5);
    assert_eq!(report.reconciliation.distinct_group_count, 2);
    assert_eq!(report.reconciliation.status, ReconciliationStatus::Balanced);
    assert_eq!(store.count_rows("address").await.unwrap(), 5);
    assert_eq!(store.count_rows("location").await.unwrap(), 2);

    let stages: Vec<&str> = report.stages.iter().map(|s| s.stage.as_str()).collect();
    assert_eq!(stages.first(), Some(&"ingest"));
    assert_eq!(stages.last(), Some(&"reconciliation"));
}

#[tokio::test]
async fn test_street_type_union_and_representative() {
    let dir = input_dir();
    let store = MemoryStore::new();
    let config = PipelineConfig::memory();
    Pipeline::new(&store, &config)
        .run(Some(dir.path()))
        .await
        .unwrap();

    let street_types = store.rows("street_type").unwrap();
    assert_eq!(
        street_types,
        vec![
            vec![CellValue::Integer(1), text("AVE")],
            vec![CellValue::Integer(2), text("RD")],
            vec![CellValue::Integer(3), text("ST")],
        ]
    );

    let locations = store.rows("location").unwrap();
    let a = &locations[0];
    assert_eq!(a[0], text("A"));
    // a1 sorts before a2, so its values represent group A
    assert_eq!(a[1], text("10"));
    assert_eq!(a[3], text("MAIN"));
    assert_eq!(a[4], CellValue::Integer(3));
    assert_eq!(a[5], CellValue::Null);
    assert_eq!(a[6], CellValue::Integer(35));
    assert_eq!(a[7], CellValue::Integer(1));
    assert_eq!(a[10], CellValue::Integer(1));
    assert_eq!(a[13], CellValue::Integer(35));
}

#[tokio::test]
async fn test_unknown_province_is_null_key() {
    let dir = input_dir();
    let store = MemoryStore::new();
    let config = PipelineConfig::memory();
    let report = Pipeline::new(&store, &config)
        .run(Some(dir.path()))
        .await
        .unwrap();

    let locations = store.rows("location").unwrap();
    let b = &locations[1];
    assert_eq!(b[0], text("B"));
    assert_eq!(b[1], text("3"));
    assert_eq!(b[6], CellValue::Null);
    assert_eq!(b[13], CellValue::Null);

    let prov = report
        .reconciliation
        .resolution
        .iter()
        .find(|s| s.column == "PROV_CODE")
        .unwrap();
    assert_eq!(prov.resolved, 1);
    assert_eq!(prov.unresolved, 1);
    assert!(report.reconciliation.is_balanced());
    assert_eq!(store.rows("prov_code").unwrap().len(), 13);
}

#[tokio::test]
async fn test_children_keep_every_record() {
    let dir = input_dir();
    let store = MemoryStore::new();
    let config = PipelineConfig::memory();
    Pipeline::new(&store, &config)
        .run(Some(dir.path()))
        .await
        .unwrap();

    let addresses = store.rows("address").unwrap();
    let ids: Vec<&CellValue> = addresses.iter().map(|r| &r[0]).collect();
    assert_eq!(
        ids,
        vec![&text("a1"), &text("a2"), &text("b1"), &text("b2"), &text("n1")]
    );
    assert_eq!(addresses[4][1], CellValue::Null);
    assert_eq!(addresses[0][4], text("1"));
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let dir = input_dir();
    let store = MemoryStore::new();
    let config = PipelineConfig::memory();
    let pipeline = Pipeline::new(&store, &config);

    pipeline.run(Some(dir.path())).await.unwrap();
    let first: Vec<_> = config
        .model
        .target_tables()
        .iter()
        .map(|t| store.rows(t).unwrap())
        .collect();

    let report = pipeline.run(None).await.unwrap();
    assert!(report.ingest.is_none());
    let second: Vec<_> = config
        .model
        .target_tables()
        .iter()
        .map(|t| store.rows(t).unwrap())
        .collect();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_files_are_concatenated() {
    let dir = input_dir();
    let extra = vec![csv_line(&[
        ("ADDR_GUID", "c1"),
        ("LOC_GUID", "C"),
        ("OFFICIAL_STREET_TYPE", "CRES"),
    ])];
    write_csv(dir.path(), "nar_part2.csv", HEADER, &extra);

    let store = MemoryStore::new();
    let config = PipelineConfig::memory();
    let report = Pipeline::new(&store, &config)
        .run(Some(dir.path()))
        .await
        .unwrap();

    assert_eq!(report.ingest.as_ref().unwrap().files_processed, 2);
    assert_eq!(report.child_rows, 6);
    assert_eq!(report.parent_rows, 3);
    assert_eq!(store.rows("street_type").unwrap().len(), 4);
}

#[tokio::test]
async fn test_missing_attribute_fails_before_writes() {
    let dir = TempDir::new().unwrap();
    let header: Vec<&str> = HEADER
        .iter()
        .copied()
        .filter(|h| *h != "MAIL_MUN_NAME")
        .collect();
    write_csv(dir.path(), "nar.csv", &header, &["g1,L1".to_string()]);

    let store = MemoryStore::new();
    let config = PipelineConfig::memory();
    let err = Pipeline::new(&store, &config)
        .run(Some(dir.path()))
        .await
        .unwrap_err();

    match err {
        PipelineError::SchemaMismatch {
            relation,
            attribute,
        } => {
            assert_eq!(relation, "nar_raw");
            assert_eq!(attribute, "MAIL_MUN_NAME");
        }
        other => panic!("unexpected error: {}", other),
    }
    // Only the staging table exists
    assert_eq!(store.table_names(), vec!["nar_raw".to_string()]);
}

#[tokio::test]
async fn test_no_input_files() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let config = PipelineConfig::memory();
    let err = Pipeline::new(&store, &config)
        .run(Some(dir.path()))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Ingest(_)));
}

#[tokio::test]
async fn test_missing_staging_table_is_source_error() {
    let store = MemoryStore::new();
    let config = PipelineConfig::memory();
    let err = Pipeline::new(&store, &config).run(None).await.unwrap_err();
    assert!(matches!(err, PipelineError::SourceUnavailable(_)));
}

#[tokio::test]
async fn test_reconcile_after_tampering() {
    let dir = input_dir();
    let store = MemoryStore::new();
    let config = PipelineConfig::memory();
    let pipeline = Pipeline::new(&store, &config);
    pipeline.run(Some(dir.path())).await.unwrap();

    // Replace the child table with a truncated copy
    let rows = store.rows("address").unwrap();
    let table = config
        .model
        .child
        .table_def(&config.model.record_id, &config.model.group_id);
    store.recreate_table(&table).await.unwrap();
    store.insert_rows(&table, &rows[..3]).await.unwrap();

    let report = pipeline.reconcile().await.unwrap();
    assert_eq!(report.status, ReconciliationStatus::Mismatch);
    assert_eq!(report.child_delta, 2);
    assert_eq!(store.count_records("nar_raw").await.unwrap(), 5);
}

/// Memory store whose write side is unreachable
struct UnreachableTarget {
    inner: MemoryStore,
}

#[async_trait(?Send)]
impl StagingStore for UnreachableTarget {
    async fn column_names(&self, table: &str) -> StoreResult<Vec<String>> {
        self.inner.column_names(table).await
    }

    async fn read_records(&self, table: &str) -> StoreResult<Vec<RawRecord>> {
        self.inner.read_records(table).await
    }

    async fn count_records(&self, table: &str) -> StoreResult<u64> {
        self.inner.count_records(table).await
    }

    async fn count_distinct(&self, table: &str, column: &str) -> StoreResult<u64> {
        self.inner.count_distinct(table, column).await
    }
}

#[async_trait(?Send)]
impl TargetStore for UnreachableTarget {
    async fn recreate_table(&self, _table: &TableDef) -> StoreResult<()> {
        Err(StoreError::ConnectionFailed("target down".to_string()))
    }

    async fn insert_rows(&self, table: &TableDef, rows: &[Row]) -> StoreResult<usize> {
        self.inner.insert_rows(table, rows).await
    }

    async fn count_rows(&self, table: &str) -> StoreResult<u64> {
        self.inner.count_rows(table).await
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}

#[tokio::test]
async fn test_staging_write_failure_is_target_error() {
    let dir = input_dir();
    let store = UnreachableTarget {
        inner: MemoryStore::new(),
    };
    let config = PipelineConfig::memory();
    let err = Pipeline::new(&store, &config)
        .run(Some(dir.path()))
        .await
        .unwrap_err();

    match err {
        PipelineError::TargetUnavailable(StoreError::ConnectionFailed(msg)) => {
            assert_eq!(msg, "target down");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_zero_padded_province_code_resolves() {
    let dir = TempDir::new().unwrap();
    let lines = vec![csv_line(&[
        ("ADDR_GUID", "p1"),
        ("LOC_GUID", "P"),
        ("PROV_CODE", "035"),
    ])];
    write_csv(dir.path(), "nar.csv", HEADER, &lines);

    let store = MemoryStore::new();
    let config = PipelineConfig::memory();
    let report = Pipeline::new(&store, &config)
        .run(Some(dir.path()))
        .await
        .unwrap();

    let locations = store.rows("location").unwrap();
    assert_eq!(locations[0][6], CellValue::Integer(35));
    let prov = report
        .reconciliation
        .resolution
        .iter()
        .find(|s| s.column == "PROV_CODE")
        .unwrap();
    assert_eq!(prov.unresolved, 0);
}
