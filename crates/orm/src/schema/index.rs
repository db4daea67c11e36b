//! Secondary index declarations and index selection

use serde_json::Value;

use crate::value::Record;

/// Name of the index that spans every record of an entity type
pub const ALL_INDEX: &str = "all";

/// A secondary index: equality on the partition keys, ordering on the sort keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub partition_keys: Vec<String>,
    pub sort_keys: Vec<String>,
}

/// Key conditions derived from a key set for one index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMatch<'a> {
    pub index: &'a IndexSpec,
    pub partition: Vec<(String, Value)>,
    pub sort_prefix: Vec<(String, Value)>,
}

impl IndexSpec {
    pub fn new(name: impl Into<String>, partition_keys: Vec<String>, sort_keys: Vec<String>) -> Self {
        Self {
            name: name.into(),
            partition_keys,
            sort_keys,
        }
    }

    /// Whether this index spans all records (no partition keys)
    pub fn is_all_index(&self) -> bool {
        self.partition_keys.is_empty()
    }

    /// Every attribute this index names
    pub fn attributes(&self) -> impl Iterator<Item = &String> {
        self.partition_keys.iter().chain(self.sort_keys.iter())
    }

    /// Try to serve `keys` with this index.
    ///
    /// All partition keys must be present, and the remaining keys must be
    /// exactly a prefix of the sort keys.
    pub fn match_keys<'a>(&'a self, keys: &Record) -> Option<IndexMatch<'a>> {
        let mut partition = Vec::with_capacity(self.partition_keys.len());
        for name in &self.partition_keys {
            partition.push((name.clone(), keys.get(name)?.clone()));
        }

        let remaining = keys.len() - partition.len();
        if remaining > self.sort_keys.len() {
            return None;
        }

        let mut sort_prefix = Vec::with_capacity(remaining);
        for name in &self.sort_keys[..remaining] {
            sort_prefix.push((name.clone(), keys.get(name)?.clone()));
        }

        Some(IndexMatch {
            index: self,
            partition,
            sort_prefix,
        })
    }
}

/// Pick the best index serving `keys`.
///
/// Indexes with more partition keys win; ties go to the index with fewer
/// sort keys, then to declaration order.
pub fn select_index<'a>(indexes: &'a [IndexSpec], keys: &Record) -> Option<IndexMatch<'a>> {
    indexes
        .iter()
        .filter_map(|index| index.match_keys(keys))
        .fold(None, |best: Option<IndexMatch<'a>>, candidate| match best {
            Some(current)
                if (current.index.partition_keys.len(), usize::MAX - current.index.sort_keys.len())
                    >= (candidate.index.partition_keys.len(), usize::MAX - candidate.index.sort_keys.len()) =>
            {
                Some(current)
            }
            _ => Some(candidate),
        })
}
