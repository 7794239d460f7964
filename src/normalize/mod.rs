//! Normalization stages
//!
//! Turns the flat staging relation into dimension tables plus a parent and
//! a child fact table:
//!
//! 1. [`extract`]: distinct natural keys per dimension, keyed 1..n
//! 2. [`reference`]: fixed reference dimensions with caller-assigned keys
//! 3. [`resolve`]: in-memory indexes mapping natural keys to surrogate keys
//! 4. [`facts`]: one parent row per group, one child row per raw record
//! 5. [`reconcile`]: row-count reconciliation of the result

pub mod extract;
pub mod facts;
pub mod reconcile;
pub mod reference;
pub mod resolve;

pub use extract::DimensionExtractor;
pub use facts::{FactBuilder, FactOutput, ResolutionStats};
pub use reconcile::{ReconciliationReport, ReconciliationStatus, ReconciliationValidator};
pub use reference::ReferenceLoader;
pub use resolve::{IndexId, KeyResolver, Resolution};

use crate::error::{PipelineError, PipelineResult};
use crate::models::{RecordLayout, Row, TableDef};
use crate::store::TargetStore;

/// Fail with `SchemaMismatch` on the first attribute missing from `layout`
pub fn check_attributes<'a, I>(relation: &str, layout: &RecordLayout, attributes: I) -> PipelineResult<()>
where
    I: IntoIterator<Item = &'a str>,
{
    for attribute in attributes {
        if !layout.contains(attribute) {
            return Err(PipelineError::SchemaMismatch {
                relation: relation.to_string(),
                attribute: attribute.to_string(),
            });
        }
    }
    Ok(())
}

/// Drop and recreate `table`, then insert `rows` in batches
pub(crate) async fn write_table<T>(
    target: &T,
    table: &TableDef,
    rows: &[Row],
    batch_size: usize,
) -> PipelineResult<usize>
where
    T: TargetStore + ?Sized,
{
    target
        .recreate_table(table)
        .await
        .map_err(PipelineError::target)?;

    let mut inserted = 0;
    for batch in rows.chunks(batch_size.max(1)) {
        inserted += target
            .insert_rows(table, batch)
            .await
            .map_err(PipelineError::target)?;
        tracing::debug!("Inserted batch of {} rows into {}", batch.len(), table.name);
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_attributes() {
        let layout = RecordLayout::new(["ADDR_GUID", "LOC_GUID"]);
        assert!(check_attributes("nar_raw", &layout, ["LOC_GUID"]).is_ok());

        match check_attributes("nar_raw", &layout, ["LOC_GUID", "BU_USE"]) {
            Err(PipelineError::SchemaMismatch { relation, attribute }) => {
                assert_eq!(relation, "nar_raw");
                assert_eq!(attribute, "BU_USE");
            }
            other => panic!("expected SchemaMismatch, got {:?}", other),
        }
    }
}
