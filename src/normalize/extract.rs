//! Dimension extraction from observed staging values

use std::collections::BTreeSet;

use super::{check_attributes, write_table};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Dimension, DimensionDefinition, DimensionRow, RawRecord, SurrogateKey};
use crate::store::TargetStore;

/// Derive a dimension from staging records
///
/// The distinct set is taken over the union of every source mapping. Blank
/// tuples are skipped. Keys are assigned 1..n in ascending natural-key
/// order, so the result does not depend on the order records were read in.
pub fn derive_dimension(
    definition: &DimensionDefinition,
    records: &[RawRecord],
) -> PipelineResult<Dimension> {
    let mut distinct = BTreeSet::new();
    for source in &definition.sources {
        for record in records {
            let key = record.natural_key(source);
            if !key.is_blank() {
                distinct.insert(key);
            }
        }
    }

    let rows = distinct
        .into_iter()
        .enumerate()
        .map(|(i, natural_key)| {
            let key = u32::try_from(i + 1).map_err(|_| {
                PipelineError::Config(format!(
                    "dimension {} exceeds the surrogate key range",
                    definition.name
                ))
            })?;
            Ok(DimensionRow {
                key: SurrogateKey::new(key),
                natural_key,
            })
        })
        .collect::<PipelineResult<Vec<_>>>()?;

    Ok(Dimension {
        name: definition.name.clone(),
        key_column: definition.key_column.clone(),
        natural_key: definition.natural_key.clone(),
        rows,
    })
}

/// Builds and writes derived dimensions
pub struct DimensionExtractor<'a, T: TargetStore + ?Sized> {
    target: &'a T,
    relation: &'a str,
    batch_size: usize,
}

impl<'a, T: TargetStore + ?Sized> DimensionExtractor<'a, T> {
    /// # Arguments
    /// * `target` - store receiving the dimension tables
    /// * `relation` - staging relation name, used in error reports
    /// * `batch_size` - rows per insert
    pub fn new(target: &'a T, relation: &'a str, batch_size: usize) -> Self {
        Self {
            target,
            relation,
            batch_size,
        }
    }

    /// Derive one dimension, then drop, recreate and fill its table
    pub async fn extract(
        &self,
        definition: &DimensionDefinition,
        records: &[RawRecord],
    ) -> PipelineResult<Dimension> {
        if let Some(first) = records.first() {
            check_attributes(self.relation, first.layout(), definition.source_attributes())?;
        }

        let dimension = derive_dimension(definition, records)?;
        let inserted = write_table(
            self.target,
            &dimension.table_def(),
            &dimension.to_rows(),
            self.batch_size,
        )
        .await?;

        tracing::info!("{} table created with {} rows", dimension.name, inserted);
        Ok(dimension)
    }
}
