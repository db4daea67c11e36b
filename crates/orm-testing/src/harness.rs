//! Registry over an in-memory, fault-injecting store

use std::sync::Arc;

use siteops_orm::{entities, Collection, DataAccessConfig, EntityRegistry, MemoryStore, Store};

use crate::store::FaultyStore;
use crate::TestResult;

/// Everything a data-access test usually needs
pub struct TestHarness {
    pub registry: EntityRegistry,
    /// Store the registry writes through
    pub store: Arc<FaultyStore>,
    /// Backing records, bypassing fault injection
    pub memory: Arc<MemoryStore>,
}

impl TestHarness {
    /// Registry over every entity with the default configuration
    pub fn new() -> Self {
        Self::with_config(DataAccessConfig::default())
    }

    pub fn with_config(config: DataAccessConfig) -> Self {
        let memory = Arc::new(MemoryStore::new());
        let store = Arc::new(FaultyStore::new(memory.clone() as Arc<dyn Store>));
        // The entity catalog is static and covered by its own tests
        let registry = entities::registry_with_config(store.clone(), config)
            .unwrap_or_else(|err| panic!("entity catalog must build: {err}"));
        Self { registry, store, memory }
    }

    /// Registry over a custom catalog
    pub fn with_catalog(catalog: siteops_orm::SchemaCatalog) -> Self {
        let memory = Arc::new(MemoryStore::new());
        let store = Arc::new(FaultyStore::new(memory.clone() as Arc<dyn Store>));
        let registry = EntityRegistry::new(store.clone(), catalog);
        Self { registry, store, memory }
    }

    pub fn collection(&self, entity: &str) -> TestResult<Collection> {
        Ok(self.registry.collection(entity)?)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
