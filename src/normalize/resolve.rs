//! Natural key to surrogate key resolution
//!
//! Every index a run needs is built up front from the populated dimensions;
//! lookups afterwards are a single hash probe and never touch a store.

use std::borrow::Cow;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::error::{PipelineError, PipelineResult};
use crate::models::{Dimension, DimensionColumn, FactColumn, NaturalKey, SurrogateKey};

/// Outcome of a lookup
///
/// `Unresolved` is an expected result, recorded as a null foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Resolved(SurrogateKey),
    Unresolved,
}

impl Resolution {
    pub fn key(&self) -> Option<SurrogateKey> {
        match self {
            Resolution::Resolved(key) => Some(*key),
            Resolution::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }
}

/// Handle to a built index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexId(usize);

struct LookupIndex {
    dimension: String,
    columns: Vec<String>,
    /// Tuple positions holding the surrogate key column
    key_positions: Vec<usize>,
    entries: HashMap<NaturalKey, SurrogateKey>,
}

impl LookupIndex {
    /// Integer-valued components compare numerically against the key column
    fn canonical<'k>(&self, key: &'k NaturalKey) -> Cow<'k, NaturalKey> {
        if self.key_positions.is_empty() {
            return Cow::Borrowed(key);
        }
        let components: Vec<Option<String>> = key
            .components()
            .iter()
            .enumerate()
            .map(|(i, c)| match c {
                Some(text) if self.key_positions.contains(&i) => Some(
                    text.trim()
                        .parse::<i64>()
                        .map_or_else(|_| text.clone(), |n| n.to_string()),
                ),
                other => other.clone(),
            })
            .collect();
        Cow::Owned(NaturalKey::new(components.iter().map(|c| c.as_deref())))
    }
}

/// Read-only dimensions plus their lookup indexes
#[derive(Default)]
pub struct KeyResolver {
    dimensions: Vec<Dimension>,
    by_name: HashMap<String, usize>,
    indexes: Vec<LookupIndex>,
    index_ids: HashMap<(String, Vec<String>), IndexId>,
}

impl KeyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register dimensions and build an index for every lookup column
    pub fn build<'a, I>(dimensions: Vec<Dimension>, lookups: I) -> PipelineResult<Self>
    where
        I: IntoIterator<Item = &'a FactColumn>,
    {
        let mut resolver = Self::new();
        for dimension in dimensions {
            resolver.add_dimension(dimension)?;
        }
        for column in lookups {
            if let FactColumn::Lookup {
                dimension,
                match_columns,
                ..
            } = column
            {
                resolver.build_index(dimension, match_columns)?;
            }
        }
        Ok(resolver)
    }

    /// Register a dimension and index it on its natural key
    pub fn add_dimension(&mut self, dimension: Dimension) -> PipelineResult<IndexId> {
        if self.by_name.contains_key(&dimension.name) {
            return Err(PipelineError::Config(format!(
                "dimension {} registered twice",
                dimension.name
            )));
        }
        let name = dimension.name.clone();
        let natural = dimension.natural_key.clone();
        self.by_name.insert(name.clone(), self.dimensions.len());
        self.dimensions.push(dimension);
        self.build_index(&name, &natural)
    }

    /// Build (or reuse) the index of `dimension` over `match_columns`
    ///
    /// An empty column list means the natural key. Columns may include the
    /// surrogate key column; raw values compare to it as integers, so "035"
    /// matches key 35. When several members share a match tuple the smallest
    /// key wins.
    pub fn build_index(&mut self, dimension: &str, match_columns: &[String]) -> PipelineResult<IndexId> {
        let dim = self
            .dimension(dimension)
            .ok_or_else(|| PipelineError::Config(format!("unknown dimension {}", dimension)))?;
        let columns: Vec<String> = if match_columns.is_empty() {
            dim.natural_key.clone()
        } else {
            match_columns.to_vec()
        };

        let id_key = (dimension.to_string(), columns.clone());
        if let Some(id) = self.index_ids.get(&id_key) {
            return Ok(*id);
        }

        let positions = columns
            .iter()
            .map(|c| {
                dim.column_position(c).ok_or_else(|| {
                    PipelineError::Config(format!("{} is not a column of {}", c, dimension))
                })
            })
            .collect::<PipelineResult<Vec<_>>>()?;

        let key_positions: Vec<usize> = positions
            .iter()
            .enumerate()
            .filter(|(_, p)| matches!(p, DimensionColumn::Key))
            .map(|(i, _)| i)
            .collect();

        let mut entries = HashMap::with_capacity(dim.len());
        let mut duplicates = 0usize;
        // Rows are in ascending key order, so the first insert is the smallest key
        for row in &dim.rows {
            let key_text = row.key.to_string();
            let tuple = NaturalKey::new(positions.iter().map(|p| match p {
                DimensionColumn::Key => Some(key_text.as_str()),
                DimensionColumn::Natural(i) => row.natural_key.components()[*i].as_deref(),
            }));
            match entries.entry(tuple) {
                Entry::Vacant(slot) => {
                    slot.insert(row.key);
                }
                Entry::Occupied(_) => duplicates += 1,
            }
        }

        if duplicates > 0 {
            tracing::warn!(
                "{} rows of {} share a ({}) value with a lower key and are unreachable by lookup",
                duplicates,
                dimension,
                columns.join(", ")
            );
        }

        let id = IndexId(self.indexes.len());
        tracing::debug!(
            "Indexed {} on ({}) with {} entries",
            dimension,
            columns.join(", "),
            entries.len()
        );
        self.indexes.push(LookupIndex {
            dimension: dimension.to_string(),
            columns,
            key_positions,
            entries,
        });
        self.index_ids.insert(id_key, id);
        Ok(id)
    }

    /// Handle of an already built index
    pub fn index_id(&self, dimension: &str, match_columns: &[String]) -> Option<IndexId> {
        let columns = if match_columns.is_empty() {
            self.dimension(dimension)?.natural_key.clone()
        } else {
            match_columns.to_vec()
        };
        self.index_ids.get(&(dimension.to_string(), columns)).copied()
    }

    /// Resolve a natural key against a dimension's natural key
    ///
    /// Unknown dimensions and blank keys are `Unresolved`.
    pub fn resolve(&self, dimension: &str, key: &NaturalKey) -> Resolution {
        match self.index_id(dimension, &[]) {
            Some(id) => self.resolve_in(id, key),
            None => Resolution::Unresolved,
        }
    }

    /// Resolve a tuple through a built index
    pub fn resolve_in(&self, id: IndexId, key: &NaturalKey) -> Resolution {
        if key.is_blank() {
            return Resolution::Unresolved;
        }
        self.indexes
            .get(id.0)
            .and_then(|index| index.entries.get(index.canonical(key).as_ref()))
            .map_or(Resolution::Unresolved, |k| Resolution::Resolved(*k))
    }

    /// Dimension name and match columns of an index
    pub fn index_description(&self, id: IndexId) -> Option<(&str, &[String])> {
        self.indexes
            .get(id.0)
            .map(|i| (i.dimension.as_str(), i.columns.as_slice()))
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.by_name.get(name).map(|i| &self.dimensions[*i])
    }

    /// Registered dimensions in registration order
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }
}
