//! In-memory store backend

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use super::{IndexQuery, Order, Store, StoreError, StoreResult, WriteCondition};
use crate::value::{compare_on, Record};

/// Operation counters of a [`MemoryStore`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStoreStats {
    pub gets: u64,
    pub queries: u64,
    pub puts: u64,
    pub patches: u64,
    pub deletes: u64,
}

#[derive(Debug, Default)]
struct Counters {
    gets: AtomicU64,
    queries: AtomicU64,
    puts: AtomicU64,
    patches: AtomicU64,
    deletes: AtomicU64,
}

/// In-memory store keeping one ordered table per entity type.
///
/// Writes to one entity type are serialized by the table's shard lock, so
/// conditional writes are atomic with respect to each other.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: DashMap<String, BTreeMap<String, Record>>,
    counters: Counters,
}

impl MemoryStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records stored for an entity type
    pub fn len(&self, entity: &str) -> usize {
        self.tables.get(entity).map(|table| table.len()).unwrap_or(0)
    }

    /// Check whether an entity type has no records
    pub fn is_empty(&self, entity: &str) -> bool {
        self.len(entity) == 0
    }

    /// Copy of every record stored for an entity type, ordered by id
    pub fn records(&self, entity: &str) -> Vec<Record> {
        self.tables
            .get(entity)
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of the operation counters
    pub fn stats(&self) -> MemoryStoreStats {
        MemoryStoreStats {
            gets: self.counters.gets.load(Ordering::Relaxed),
            queries: self.counters.queries.load(Ordering::Relaxed),
            puts: self.counters.puts.load(Ordering::Relaxed),
            patches: self.counters.patches.load(Ordering::Relaxed),
            deletes: self.counters.deletes.load(Ordering::Relaxed),
        }
    }

    /// Remove every record of every entity type
    pub fn clear(&self) {
        self.tables.clear();
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, entity: &str, id: &str) -> StoreResult<Option<Record>> {
        self.counters.gets.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .tables
            .get(entity)
            .and_then(|table| table.get(id).cloned()))
    }

    async fn query(&self, query: &IndexQuery) -> StoreResult<Vec<Record>> {
        self.counters.queries.fetch_add(1, Ordering::Relaxed);

        let mut hits: Vec<Record> = match self.tables.get(&query.entity) {
            Some(table) => table
                .values()
                .filter(|record| query.matches(record))
                .cloned()
                .collect(),
            None => return Ok(Vec::new()),
        };

        hits.sort_by(|a, b| compare_on(a, b, &query.sort_keys));
        if query.order == Order::Desc {
            hits.reverse();
        }
        if let Some(limit) = query.limit {
            hits.truncate(limit);
        }

        Ok(hits)
    }

    async fn put(
        &self,
        entity: &str,
        id: &str,
        record: Record,
        condition: WriteCondition,
    ) -> StoreResult<()> {
        self.counters.puts.fetch_add(1, Ordering::Relaxed);

        let mut table = self.tables.entry(entity.to_string()).or_default();

        match &condition {
            WriteCondition::None => {}
            WriteCondition::IfAbsent => {
                if table.contains_key(id) {
                    return Err(StoreError::ConditionFailed(format!(
                        "{}({}) already exists",
                        entity, id
                    )));
                }
            }
            WriteCondition::UniqueOn(attributes) => {
                if table.contains_key(id) {
                    return Err(StoreError::ConditionFailed(format!(
                        "{}({}) already exists",
                        entity, id
                    )));
                }
                let clash = table.values().any(|existing| {
                    attributes
                        .iter()
                        .all(|name| existing.get(name) == record.get(name))
                });
                if clash {
                    return Err(StoreError::ConditionFailed(format!(
                        "{} already has a record with the same {}",
                        entity,
                        attributes.join(", ")
                    )));
                }
            }
        }

        table.insert(id.to_string(), record);
        Ok(())
    }

    async fn patch(&self, entity: &str, id: &str, changes: Record) -> StoreResult<()> {
        self.counters.patches.fetch_add(1, Ordering::Relaxed);

        let mut table = self.tables.entry(entity.to_string()).or_default();
        let existing = table
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("{}({})", entity, id)))?;

        for (name, value) in changes {
            if value == Value::Null {
                existing.remove(&name);
            } else {
                existing.insert(name, value);
            }
        }

        Ok(())
    }

    async fn delete(&self, entity: &str, ids: &[String]) -> StoreResult<()> {
        self.counters.deletes.fetch_add(1, Ordering::Relaxed);

        if let Some(mut table) = self.tables.get_mut(entity) {
            for id in ids {
                table.remove(id);
            }
        }
        Ok(())
    }
}
