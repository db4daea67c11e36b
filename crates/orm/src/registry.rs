//! Entity Registry - lazily built, name-addressed collections
//!
//! Entity schemas refer to each other by name only. A model that needs the
//! collection of a related entity asks the registry for it by that name, so
//! entity modules never depend on each other directly even though their
//! references are mutually recursive.

use std::sync::{Arc, Weak};

use dashmap::DashMap;

use crate::collection::Collection;
use crate::config::DataAccessConfig;
use crate::error::{DataAccessError, DataAccessResult, SchemaError};
use crate::schema::{Schema, SchemaCatalog};
use crate::store::Store;

pub(crate) struct RegistryInner {
    store: Arc<dyn Store>,
    catalog: SchemaCatalog,
    config: DataAccessConfig,
    /// Entity name -> memoized collection
    collections: DashMap<String, Collection>,
}

/// Scoped map from entity name to its [`Collection`].
///
/// Create one per logical scope (process, request, test). Cloning is cheap
/// and shares the memoized collections.
#[derive(Clone)]
pub struct EntityRegistry {
    inner: Arc<RegistryInner>,
}

impl EntityRegistry {
    /// Create a registry with the default configuration
    pub fn new(store: Arc<dyn Store>, catalog: SchemaCatalog) -> Self {
        Self::with_config(store, catalog, DataAccessConfig::default())
    }

    /// Create a registry with an explicit configuration
    pub fn with_config(store: Arc<dyn Store>, catalog: SchemaCatalog, config: DataAccessConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                store,
                catalog,
                config,
                collections: DashMap::new(),
            }),
        }
    }

    /// Get the collection of an entity type, constructing it on first access
    pub fn collection(&self, entity: &str) -> DataAccessResult<Collection> {
        if let Some(collection) = self.inner.collections.get(entity) {
            return Ok(collection.clone());
        }

        let schema = self
            .inner
            .catalog
            .get(entity)
            .cloned()
            .ok_or_else(|| DataAccessError::UnknownEntity(entity.to_string()))?;

        if self.inner.config.strict_references {
            let issues = self.inner.catalog.reference_issues(entity);
            if let Some(issue) = issues.first() {
                return Err(SchemaError::Invalid {
                    entity: entity.to_string(),
                    message: format!("reference '{}': {}", issue.reference, issue.message),
                }
                .into());
            }
        }

        let collection = self
            .inner
            .collections
            .entry(entity.to_string())
            .or_insert_with(|| {
                tracing::debug!(entity = %entity, "initializing collection");
                Collection::new(
                    schema,
                    Arc::clone(&self.inner.store),
                    Arc::downgrade(&self.inner),
                    self.inner.config.clone(),
                )
            })
            .clone();

        Ok(collection)
    }

    /// Schema of an entity type, without constructing its collection
    pub fn schema(&self, entity: &str) -> Option<Arc<Schema>> {
        self.inner.catalog.get(entity).cloned()
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.inner.catalog
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.inner.store
    }

    pub fn config(&self) -> &DataAccessConfig {
        &self.inner.config
    }

    /// Names of the collections constructed so far, sorted
    pub fn loaded_collections(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .collections
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub(crate) fn from_weak(weak: &Weak<RegistryInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }
}

impl std::fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("entities", &self.inner.catalog.entity_names().collect::<Vec<_>>())
            .field("loaded", &self.loaded_collections())
            .finish()
    }
}
