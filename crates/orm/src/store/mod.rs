//! Store backends
//!
//! The data-access layer talks to a partitioned key-value store through the
//! [`Store`] trait: point gets by id, index queries, full puts, partial
//! patches and deletes. Records of every entity type live in one logical
//! table, keyed by `(entity, id)`.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::value::Record;

pub mod memory;

pub use memory::MemoryStore;

/// Store operation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Operation timed out")]
    Timeout,

    #[error("Request was throttled")]
    Throttled,

    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Conditional write failed: {0}")]
    ConditionFailed(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Sort direction of an index query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

/// Inclusive range applied to the first sort key not bound by equality
#[derive(Debug, Clone, PartialEq)]
pub struct SortRange {
    pub start: Value,
    pub end: Value,
}

/// Query against one index of one entity type
#[derive(Debug, Clone, PartialEq)]
pub struct IndexQuery {
    /// Entity type being queried
    pub entity: String,
    /// Index name, for diagnostics and backends that name their indexes
    pub index: String,
    /// Equality conditions on the partition key attributes
    pub partition: Vec<(String, Value)>,
    /// Equality conditions on a prefix of the sort key attributes
    pub sort_prefix: Vec<(String, Value)>,
    /// All sort key attributes of the index, in order
    pub sort_keys: Vec<String>,
    /// Optional range on `sort_keys[sort_prefix.len()]`
    pub range: Option<SortRange>,
    pub order: Order,
    pub limit: Option<usize>,
}

impl IndexQuery {
    pub fn new(entity: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            index: index.into(),
            partition: Vec::new(),
            sort_prefix: Vec::new(),
            sort_keys: Vec::new(),
            range: None,
            order: Order::Asc,
            limit: None,
        }
    }

    /// Check whether a record satisfies every key condition of this query
    pub fn matches(&self, record: &Record) -> bool {
        let equal = |(name, value): &(String, Value)| record.get(name) == Some(value);
        if !self.partition.iter().all(equal) || !self.sort_prefix.iter().all(equal) {
            return false;
        }

        match (&self.range, self.sort_keys.get(self.sort_prefix.len())) {
            (Some(range), Some(attribute)) => {
                let Some(value) = record.get(attribute) else {
                    return false;
                };
                crate::value::compare_values(value, &range.start).is_ge()
                    && crate::value::compare_values(value, &range.end).is_le()
            }
            _ => true,
        }
    }
}

/// Condition attached to a put
#[derive(Debug, Clone, PartialEq, Default)]
pub enum WriteCondition {
    /// Unconditional write; overwrites an existing record with the same id
    #[default]
    None,
    /// Only write if no record with this id exists yet
    IfAbsent,
    /// Only write if no record with this id exists yet and no record of the
    /// entity shares these attribute values. Never replaces a stored record.
    UniqueOn(Vec<String>),
}

/// Core store trait that all backends must implement
#[async_trait]
pub trait Store: Send + Sync {
    /// Get a record by entity type and id
    async fn get(&self, entity: &str, id: &str) -> StoreResult<Option<Record>>;

    /// Run an index query
    async fn query(&self, query: &IndexQuery) -> StoreResult<Vec<Record>>;

    /// Write a full record
    async fn put(
        &self,
        entity: &str,
        id: &str,
        record: Record,
        condition: WriteCondition,
    ) -> StoreResult<()>;

    /// Apply a partial update; `Value::Null` removes the attribute.
    /// Fails with [`StoreError::NotFound`] if the record does not exist.
    async fn patch(&self, entity: &str, id: &str, changes: Record) -> StoreResult<()>;

    /// Delete records by id; missing ids are ignored
    async fn delete(&self, entity: &str, ids: &[String]) -> StoreResult<()>;

    /// Get several records at once (optional optimization)
    async fn batch_get(&self, entity: &str, ids: &[String]) -> StoreResult<Vec<Record>> {
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.get(entity, id).await? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::record;
    use serde_json::json;

    fn query() -> IndexQuery {
        let mut query = IndexQuery::new("Suggestion", "byOpportunityId");
        query.partition = vec![("opportunityId".to_string(), json!("o-1"))];
        query.sort_keys = vec!["status".to_string(), "rank".to_string()];
        query
    }

    #[test]
    fn test_matches_partition() {
        let q = query();
        assert!(q.matches(&record([("opportunityId", json!("o-1"))])));
        assert!(!q.matches(&record([("opportunityId", json!("o-2"))])));
        assert!(!q.matches(&record([("status", json!("NEW"))])));
    }

    #[test]
    fn test_matches_prefix_and_range() {
        let mut q = query();
        q.sort_prefix = vec![("status".to_string(), json!("NEW"))];
        q.range = Some(SortRange {
            start: json!(1),
            end: json!(3),
        });

        let hit = record([
            ("opportunityId", json!("o-1")),
            ("status", json!("NEW")),
            ("rank", json!(2)),
        ]);
        let out_of_range = record([
            ("opportunityId", json!("o-1")),
            ("status", json!("NEW")),
            ("rank", json!(4)),
        ]);
        let wrong_status = record([
            ("opportunityId", json!("o-1")),
            ("status", json!("FIXED")),
            ("rank", json!(2)),
        ]);

        assert!(q.matches(&hit));
        assert!(!q.matches(&out_of_range));
        assert!(!q.matches(&wrong_status));
    }
}
