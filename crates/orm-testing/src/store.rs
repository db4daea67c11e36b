//! Fault-injecting store wrapper

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use siteops_orm::{IndexQuery, MemoryStore, Record, Store, StoreError, StoreResult, WriteCondition};

/// Store operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Get,
    Query,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "get",
            Self::Query => "query",
            Self::Put => "put",
            Self::Patch => "patch",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// One recorded store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub operation: Operation,
    pub entity: String,
    /// Ids the call addressed; empty for queries
    pub ids: Vec<String>,
}

#[derive(Debug, Clone)]
struct Fault {
    operation: Operation,
    entity: Option<String>,
    id: Option<String>,
    error: StoreError,
    /// Remaining failures; `None` fails forever
    remaining: Option<usize>,
}

impl Fault {
    fn matches(&self, operation: Operation, entity: &str, ids: &[String]) -> bool {
        self.operation == operation
            && self.remaining != Some(0)
            && self.entity.as_deref().map_or(true, |e| e == entity)
            && self.id.as_ref().map_or(true, |id| ids.contains(id))
    }
}

/// Store wrapper that records calls and fails on demand.
///
/// Faults match on operation and optionally entity type and record id.
/// A matching call fails without reaching the wrapped store.
pub struct FaultyStore {
    inner: Arc<dyn Store>,
    faults: Mutex<Vec<Fault>>,
    calls: Mutex<Vec<Call>>,
    read_delay: Mutex<Option<Duration>>,
}

impl FaultyStore {
    pub fn new(inner: Arc<dyn Store>) -> Self {
        Self {
            inner,
            faults: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            read_delay: Mutex::new(None),
        }
    }

    /// Wrap a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Fail every `operation` call
    pub fn fail(&self, operation: Operation, error: StoreError) {
        self.push_fault(operation, None, None, error, None);
    }

    /// Fail `operation` calls on one entity type
    pub fn fail_entity(&self, operation: Operation, entity: &str, error: StoreError) {
        self.push_fault(operation, Some(entity), None, error, None);
    }

    /// Fail `operation` calls addressing one record
    pub fn fail_record(&self, operation: Operation, entity: &str, id: &str, error: StoreError) {
        self.push_fault(operation, Some(entity), Some(id), error, None);
    }

    /// Fail the next `times` matching `operation` calls on an entity type
    pub fn fail_times(&self, operation: Operation, entity: &str, times: usize, error: StoreError) {
        self.push_fault(operation, Some(entity), None, error, Some(times));
    }

    pub fn clear_faults(&self) {
        self.faults.lock().clear();
    }

    /// Sleep after every get and query, so concurrent readers act on stale data
    pub fn set_read_delay(&self, delay: Option<Duration>) {
        *self.read_delay.lock() = delay;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, operation: Operation) -> usize {
        self.calls.lock().iter().filter(|call| call.operation == operation).count()
    }

    pub fn count_for(&self, operation: Operation, entity: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.operation == operation && call.entity == entity)
            .count()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }

    fn push_fault(
        &self,
        operation: Operation,
        entity: Option<&str>,
        id: Option<&str>,
        error: StoreError,
        remaining: Option<usize>,
    ) {
        self.faults.lock().push(Fault {
            operation,
            entity: entity.map(str::to_string),
            id: id.map(str::to_string),
            error,
            remaining,
        });
    }

    /// Record the call and return the injected failure, if any
    fn intercept(&self, operation: Operation, entity: &str, ids: &[String]) -> StoreResult<()> {
        self.calls.lock().push(Call {
            operation,
            entity: entity.to_string(),
            ids: ids.to_vec(),
        });

        let mut faults = self.faults.lock();
        if let Some(fault) = faults.iter_mut().find(|fault| fault.matches(operation, entity, ids)) {
            if let Some(remaining) = fault.remaining.as_mut() {
                *remaining -= 1;
            }
            tracing::debug!(operation = %operation, entity = %entity, "injecting store failure");
            return Err(fault.error.clone());
        }
        Ok(())
    }

    async fn delay_read(&self) {
        let delay = *self.read_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl Store for FaultyStore {
    async fn get(&self, entity: &str, id: &str) -> StoreResult<Option<Record>> {
        self.intercept(Operation::Get, entity, &[id.to_string()])?;
        let record = self.inner.get(entity, id).await;
        self.delay_read().await;
        record
    }

    async fn query(&self, query: &IndexQuery) -> StoreResult<Vec<Record>> {
        self.intercept(Operation::Query, &query.entity, &[])?;
        let records = self.inner.query(query).await;
        self.delay_read().await;
        records
    }

    async fn put(&self, entity: &str, id: &str, record: Record, condition: WriteCondition) -> StoreResult<()> {
        self.intercept(Operation::Put, entity, &[id.to_string()])?;
        self.inner.put(entity, id, record, condition).await
    }

    async fn patch(&self, entity: &str, id: &str, changes: Record) -> StoreResult<()> {
        self.intercept(Operation::Patch, entity, &[id.to_string()])?;
        self.inner.patch(entity, id, changes).await
    }

    async fn delete(&self, entity: &str, ids: &[String]) -> StoreResult<()> {
        self.intercept(Operation::Delete, entity, ids)?;
        self.inner.delete(entity, ids).await
    }
}
