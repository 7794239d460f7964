//! Raw staging records and natural keys

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Ordered column names of a staging relation with a name index
///
/// Shared by every record read from the same relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    columns: Vec<String>,
    index: HashMap<String, usize>,
}

impl RecordLayout {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let index = columns
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self { columns, index }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn position(&self, attribute: &str) -> Option<usize> {
        self.index.get(attribute).copied()
    }

    pub fn contains(&self, attribute: &str) -> bool {
        self.index.contains_key(attribute)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// One row of the flat source dataset
///
/// Values are kept exactly as staged: text or null.
#[derive(Debug, Clone)]
pub struct RawRecord {
    layout: Arc<RecordLayout>,
    values: Vec<Option<String>>,
}

impl RawRecord {
    /// Create a record; missing trailing values are padded with null
    pub fn new(layout: Arc<RecordLayout>, mut values: Vec<Option<String>>) -> Self {
        values.resize(layout.len(), None);
        Self { layout, values }
    }

    /// Build a standalone record from `(attribute, value)` pairs
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
    {
        let (names, values): (Vec<&str>, Vec<Option<String>>) = pairs
            .into_iter()
            .map(|(k, v)| (k, v.map(str::to_string)))
            .unzip();
        Self::new(Arc::new(RecordLayout::new(names)), values)
    }

    pub fn layout(&self) -> &Arc<RecordLayout> {
        &self.layout
    }

    /// Value of a named attribute; `None` when null or unknown
    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.layout
            .position(attribute)
            .and_then(|i| self.values[i].as_deref())
    }

    pub fn values(&self) -> &[Option<String>] {
        &self.values
    }

    /// Natural-key tuple assembled from the given attributes
    pub fn natural_key<S: AsRef<str>>(&self, attributes: &[S]) -> NaturalKey {
        NaturalKey::new(attributes.iter().map(|a| self.get(a.as_ref())))
    }

    /// Representative ordering within a group
    ///
    /// Record id ascending (null first), then the full value vector so that
    /// duplicate ids still resolve the same way regardless of storage order.
    pub fn cmp_for_representative(&self, other: &Self, record_id: &str) -> Ordering {
        self.get(record_id)
            .cmp(&other.get(record_id))
            .then_with(|| self.values.cmp(&other.values))
    }
}

/// Ordered tuple of nullable text components
///
/// Empty strings are normalised to null when the key is built. Comparison is
/// exact: case and surrounding whitespace are significant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NaturalKey(Vec<Option<String>>);

impl NaturalKey {
    pub fn new<'a, I>(components: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        Self(
            components
                .into_iter()
                .map(|c| c.filter(|v| !v.is_empty()).map(str::to_string))
                .collect(),
        )
    }

    /// Single-component key
    pub fn single(value: Option<&str>) -> Self {
        Self::new([value])
    }

    /// True when every component is null
    pub fn is_blank(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }

    pub fn components(&self) -> &[Option<String>] {
        &self.0
    }
}

impl std::fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<&str> = self
            .0
            .iter()
            .map(|c| c.as_deref().unwrap_or("NULL"))
            .collect();
        write!(f, "({})", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_get() {
        let record = RawRecord::from_pairs([("ADDR_GUID", Some("a1")), ("LOC_GUID", None)]);
        assert_eq!(record.get("ADDR_GUID"), Some("a1"));
        assert_eq!(record.get("LOC_GUID"), None);
        assert_eq!(record.get("MISSING"), None);
        assert!(record.layout().contains("LOC_GUID"));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let layout = Arc::new(RecordLayout::new(["A", "B", "C"]));
        let record = RawRecord::new(layout, vec![Some("x".to_string())]);
        assert_eq!(record.values().len(), 3);
        assert_eq!(record.get("C"), None);
    }

    #[test]
    fn test_natural_key_normalises_empty() {
        let key = NaturalKey::new([Some(""), None]);
        assert!(key.is_blank());
        assert_eq!(key, NaturalKey::new([None, None]));
    }

    #[test]
    fn test_natural_key_is_case_and_whitespace_sensitive() {
        assert_ne!(NaturalKey::single(Some("Main")), NaturalKey::single(Some("main")));
        assert_ne!(NaturalKey::single(Some("ST")), NaturalKey::single(Some("ST ")));
        assert!(!NaturalKey::single(Some(" ")).is_blank());
    }

    #[test]
    fn test_natural_key_ordering_null_first() {
        let mut keys = vec![
            NaturalKey::new([Some("B"), None]),
            NaturalKey::new([Some("A"), Some("x")]),
            NaturalKey::new([Some("A"), None]),
        ];
        keys.sort();
        assert_eq!(keys[0], NaturalKey::new([Some("A"), None]));
        assert_eq!(keys[2], NaturalKey::new([Some("B"), None]));
    }

    #[test]
    fn test_representative_ordering() {
        let a = RawRecord::from_pairs([("id", Some("002")), ("v", Some("x"))]);
        let b = RawRecord::from_pairs([("id", Some("010")), ("v", Some("a"))]);
        assert_eq!(a.cmp_for_representative(&b, "id"), Ordering::Less);

        let c = RawRecord::from_pairs([("id", Some("002")), ("v", Some("a"))]);
        assert_eq!(a.cmp_for_representative(&c, "id"), Ordering::Greater);
    }

    #[test]
    fn test_display() {
        let key = NaturalKey::new([Some("Ottawa"), None]);
        assert_eq!(key.to_string(), "(Ottawa, NULL)");
    }
}
