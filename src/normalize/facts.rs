//! Parent and child fact construction

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use serde::{Deserialize, Serialize};

use super::resolve::{IndexId, KeyResolver, Resolution};
use super::write_table;
use crate::config::ModelSection;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{ChildFact, FactColumn, FactValue, ParentFact, RawRecord, Row};
use crate::store::TargetStore;

/// Lookup outcomes for one parent column
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionStats {
    /// Parent column name
    pub column: String,
    /// Dimension looked up
    pub dimension: String,
    /// Lookups that found a key
    pub resolved: u64,
    /// Lookups with a value but no matching member
    pub unresolved: u64,
    /// Lookups skipped because every attribute was blank
    pub absent: u64,
}

impl ResolutionStats {
    fn record(&mut self, blank: bool, resolution: Resolution) {
        match (blank, resolution) {
            (true, _) => self.absent += 1,
            (false, Resolution::Resolved(_)) => self.resolved += 1,
            (false, Resolution::Unresolved) => self.unresolved += 1,
        }
    }
}

/// Rows produced by the fact builder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactOutput {
    /// Sorted by group id
    pub parents: Vec<ParentFact>,
    /// Sorted by record id, then group id and values
    pub children: Vec<ChildFact>,
    /// One entry per lookup column, in layout order
    pub stats: Vec<ResolutionStats>,
}

enum ColumnPlan<'m> {
    Carried(&'m str),
    Lookup {
        index: IndexId,
        attributes: &'m [String],
        stats: usize,
    },
}

/// Groups raw records and emits parent and child fact rows
pub struct FactBuilder<'a> {
    model: &'a ModelSection,
    resolver: &'a KeyResolver,
    plan: Vec<ColumnPlan<'a>>,
    lookups: Vec<(&'a str, &'a str)>,
}

impl<'a> FactBuilder<'a> {
    /// Compile the parent layout against the resolver's indexes
    pub fn new(model: &'a ModelSection, resolver: &'a KeyResolver) -> PipelineResult<Self> {
        let mut plan = Vec::with_capacity(model.parent.columns.len());
        let mut lookups = Vec::new();

        for column in &model.parent.columns {
            match column {
                FactColumn::Carried { name, source } => {
                    plan.push(ColumnPlan::Carried(source.as_deref().unwrap_or(name)));
                }
                FactColumn::Lookup {
                    name,
                    dimension,
                    attributes,
                    match_columns,
                } => {
                    let index = resolver.index_id(dimension, match_columns).ok_or_else(|| {
                        PipelineError::Config(format!(
                            "no index on {} for {}.{}",
                            dimension, model.parent.table, name
                        ))
                    })?;
                    plan.push(ColumnPlan::Lookup {
                        index,
                        attributes,
                        stats: lookups.len(),
                    });
                    lookups.push((name.as_str(), dimension.as_str()));
                }
            }
        }

        Ok(Self {
            model,
            resolver,
            plan,
            lookups,
        })
    }

    /// Build every parent and child row
    ///
    /// The representative of a group is its record with the smallest record
    /// id (null first); ties fall back to the full value vector. Records
    /// with a null group id get a child row but no parent.
    pub fn build(&self, records: &[RawRecord]) -> FactOutput {
        let record_id = self.model.record_id.as_str();
        let group_id = self.model.group_id.as_str();

        let mut representatives: BTreeMap<&str, &RawRecord> = BTreeMap::new();
        for record in records {
            let Some(group) = record.get(group_id) else {
                continue;
            };
            match representatives.entry(group) {
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
                Entry::Occupied(mut slot) => {
                    if record.cmp_for_representative(slot.get(), record_id) == Ordering::Less {
                        slot.insert(record);
                    }
                }
            }
        }

        let mut stats: Vec<ResolutionStats> = self
            .lookups
            .iter()
            .map(|(column, dimension)| ResolutionStats {
                column: column.to_string(),
                dimension: dimension.to_string(),
                ..Default::default()
            })
            .collect();

        let parents = representatives
            .into_iter()
            .map(|(group, record)| ParentFact {
                group_id: group.to_string(),
                representative: record.get(record_id).map(str::to_string),
                values: self.parent_values(record, &mut stats),
            })
            .collect();

        let mut children: Vec<ChildFact> = records
            .iter()
            .map(|record| ChildFact {
                record_id: record.get(record_id).map(str::to_string),
                group_id: record.get(group_id).map(str::to_string),
                values: self
                    .model
                    .child
                    .columns
                    .iter()
                    .map(|c| record.get(c).map(str::to_string))
                    .collect(),
            })
            .collect();
        children.sort();

        FactOutput {
            parents,
            children,
            stats,
        }
    }

    fn parent_values(&self, record: &RawRecord, stats: &mut [ResolutionStats]) -> Vec<FactValue> {
        self.plan
            .iter()
            .map(|column| match column {
                ColumnPlan::Carried(attribute) => {
                    FactValue::Text(record.get(attribute).map(str::to_string))
                }
                ColumnPlan::Lookup {
                    index,
                    attributes,
                    stats: slot,
                } => {
                    let key = record.natural_key(attributes);
                    let resolution = self.resolver.resolve_in(*index, &key);
                    stats[*slot].record(key.is_blank(), resolution);
                    FactValue::Key(resolution.key())
                }
            })
            .collect()
    }

    /// Drop, recreate and fill both fact tables
    ///
    /// # Returns
    /// Rows inserted into the parent and child tables
    pub async fn write<T>(
        &self,
        target: &T,
        output: &FactOutput,
        batch_size: usize,
    ) -> PipelineResult<(usize, usize)>
    where
        T: TargetStore + ?Sized,
    {
        let parent_table = self.model.parent.table_def(&self.model.group_id);
        let parent_rows: Vec<Row> = output.parents.iter().map(ParentFact::to_row).collect();
        let parents = write_table(target, &parent_table, &parent_rows, batch_size).await?;
        tracing::info!("{} table updated with {} rows", parent_table.name, parents);

        let child_table = self
            .model
            .child
            .table_def(&self.model.record_id, &self.model.group_id);
        let child_rows: Vec<Row> = output.children.iter().map(ChildFact::to_row).collect();
        let children = write_table(target, &child_table, &child_rows, batch_size).await?;
        tracing::info!("{} table updated with {} rows", child_table.name, children);

        Ok((parents, children))
    }
}
