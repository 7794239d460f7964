//! Reference dimensions seeded from fixed business data

use std::collections::HashSet;

use super::write_table;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Dimension, DimensionRow, NaturalKey, ReferenceDimension};
use crate::store::TargetStore;

/// Turn seed rows into a populated dimension, ordered by key
///
/// Duplicate keys, duplicate natural keys and rows of the wrong arity are
/// configuration errors.
pub fn seed_dimension(reference: &ReferenceDimension) -> PipelineResult<Dimension> {
    let mut keys = HashSet::new();
    let mut natural_keys = HashSet::new();
    let mut rows = Vec::with_capacity(reference.rows.len());

    for seed in &reference.rows {
        if seed.values.len() != reference.natural_key.len() {
            return Err(PipelineError::Config(format!(
                "reference {}: row {} has {} values, expected {}",
                reference.name,
                seed.key,
                seed.values.len(),
                reference.natural_key.len()
            )));
        }

        let natural_key = NaturalKey::new(seed.values.iter().map(|v| Some(v.as_str())));
        if !keys.insert(seed.key) {
            return Err(PipelineError::Config(format!(
                "reference {}: duplicate key {}",
                reference.name, seed.key
            )));
        }
        if !natural_keys.insert(natural_key.clone()) {
            return Err(PipelineError::Config(format!(
                "reference {}: duplicate values {}",
                reference.name, natural_key
            )));
        }

        rows.push(DimensionRow {
            key: seed.key,
            natural_key,
        });
    }

    rows.sort_by_key(|r| r.key);

    Ok(Dimension {
        name: reference.name.clone(),
        key_column: reference.key_column.clone(),
        natural_key: reference.natural_key.clone(),
        rows,
    })
}

/// Loads reference dimensions; never reads staging
pub struct ReferenceLoader<'a, T: TargetStore + ?Sized> {
    target: &'a T,
    batch_size: usize,
}

impl<'a, T: TargetStore + ?Sized> ReferenceLoader<'a, T> {
    pub fn new(target: &'a T, batch_size: usize) -> Self {
        Self { target, batch_size }
    }

    /// Drop, recreate and seed one reference table
    pub async fn load(&self, reference: &ReferenceDimension) -> PipelineResult<Dimension> {
        let dimension = seed_dimension(reference)?;
        let inserted = write_table(
            self.target,
            &dimension.table_def(),
            &dimension.to_rows(),
            self.batch_size,
        )
        .await?;

        tracing::info!("{} table seeded with {} rows", dimension.name, inserted);
        Ok(dimension)
    }
}
