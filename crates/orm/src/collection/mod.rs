//! Collections - entity-type scoped access to the store
//!
//! A [`Collection`] is the single access point for one entity type: it
//! creates records (assigning ids, timestamps and defaults, and validating
//! every attribute), fetches them by id or secondary index, and wraps each
//! record in a [`Model`].
//!
//! - `query`: index selection and query options
//! - `versioning`: append-only versioned entities

pub mod query;
pub mod versioning;

use std::sync::{Arc, Weak};

use futures::future::join_all;
use once_cell::sync::OnceCell;
use serde_json::Value;
use uuid::Uuid;

use crate::config::DataAccessConfig;
use crate::error::{DataAccessError, DataAccessResult, ValidationError};
use crate::model::Model;
use crate::registry::{EntityRegistry, RegistryInner};
use crate::schema::validators::is_uuid;
use crate::schema::{Schema, CREATED_AT, RECORD_EXPIRES_AT, UPDATED_AT};
use crate::store::{Store, WriteCondition};
use crate::value::{now_iso, Record};

pub use query::QueryOptions;
pub use versioning::encode_version;

/// Item of a [`Collection::create_many`] call that was not created
#[derive(Debug)]
pub struct CreateFailure {
    /// Position of the item in the input
    pub index: usize,
    pub error: DataAccessError,
}

/// Outcome of [`Collection::create_many`]
#[derive(Debug, Default)]
pub struct CreateManyResult {
    pub created: Vec<Model>,
    pub failed: Vec<CreateFailure>,
}

impl CreateManyResult {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

struct CollectionInner {
    schema: Arc<Schema>,
    store: Arc<dyn Store>,
    registry: Weak<RegistryInner>,
    config: DataAccessConfig,
    references_checked: OnceCell<()>,
}

/// Entity-type scoped access to the store.
///
/// Obtained from [`EntityRegistry::collection`]; cloning is cheap.
#[derive(Clone)]
pub struct Collection {
    inner: Arc<CollectionInner>,
}

impl Collection {
    pub(crate) fn new(
        schema: Arc<Schema>,
        store: Arc<dyn Store>,
        registry: Weak<RegistryInner>,
        config: DataAccessConfig,
    ) -> Self {
        Self {
            inner: Arc::new(CollectionInner {
                schema,
                store,
                registry,
                config,
                references_checked: OnceCell::new(),
            }),
        }
    }

    pub fn entity_name(&self) -> &str {
        self.inner.schema.entity_name()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.inner.schema
    }

    pub fn config(&self) -> &DataAccessConfig {
        &self.inner.config
    }

    pub(crate) fn store(&self) -> &Arc<dyn Store> {
        &self.inner.store
    }

    /// The registry this collection was created by
    pub fn registry(&self) -> DataAccessResult<EntityRegistry> {
        EntityRegistry::from_weak(&self.inner.registry)
            .ok_or_else(|| DataAccessError::RegistryDropped(self.entity_name().to_string()))
    }

    /// Whether both handles point at the same collection
    pub fn ptr_eq(&self, other: &Collection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Fail with `InvalidQuery` unless this collection serves `entity`
    pub fn ensure_entity(&self, entity: &str) -> DataAccessResult<()> {
        if self.entity_name() == entity {
            Ok(())
        } else {
            Err(DataAccessError::invalid_query(
                self.entity_name(),
                format!("operation belongs to the {entity} collection"),
            ))
        }
    }

    /// Validate `data`, assign system attributes and persist a new record
    pub async fn create(&self, data: Record) -> DataAccessResult<Model> {
        let record = self.prepare_new_record(data)?;
        self.persist_new(record).await
    }

    /// Create several records.
    ///
    /// Every item is validated before anything is written. Items that fail
    /// validation or persistence are reported individually and do not stop
    /// the others.
    pub async fn create_many(&self, items: Vec<Record>) -> CreateManyResult {
        let mut result = CreateManyResult::default();
        let mut prepared = Vec::with_capacity(items.len());

        for (index, data) in items.into_iter().enumerate() {
            match self.prepare_new_record(data) {
                Ok(record) => prepared.push((index, record)),
                Err(error) => result.failed.push(CreateFailure { index, error }),
            }
        }

        let outcomes: Vec<(usize, DataAccessResult<Model>)> = if self.schema().is_versioned() {
            // Versions are assigned in input order
            let mut outcomes = Vec::with_capacity(prepared.len());
            for (index, record) in prepared {
                outcomes.push((index, self.persist_new(record).await));
            }
            outcomes
        } else {
            join_all(
                prepared
                    .into_iter()
                    .map(|(index, record)| async move { (index, self.persist_new(record).await) }),
            )
            .await
        };

        for (index, outcome) in outcomes {
            match outcome {
                Ok(model) => result.created.push(model),
                Err(error) => result.failed.push(CreateFailure { index, error }),
            }
        }
        result.failed.sort_by_key(|failure| failure.index);

        if !result.failed.is_empty() {
            tracing::warn!(
                entity = %self.entity_name(),
                created = result.created.len(),
                failed = result.failed.len(),
                "create_many finished with failures"
            );
        }
        result
    }

    /// Get a record by id
    pub async fn find_by_id(&self, id: &str) -> DataAccessResult<Option<Model>> {
        let record = self
            .inner
            .store
            .get(self.entity_name(), id)
            .await
            .map_err(|e| self.store_failure(id, "get", e))?;
        Ok(record.map(|record| self.instantiate(record)))
    }

    pub async fn exists_by_id(&self, id: &str) -> DataAccessResult<bool> {
        Ok(self.find_by_id(id).await?.is_some())
    }

    /// Get several records by id; missing ids are skipped
    pub async fn batch_get_by_ids(&self, ids: &[String]) -> DataAccessResult<Vec<Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let records = self
            .inner
            .store
            .batch_get(self.entity_name(), ids)
            .await
            .map_err(|e| self.store_failure(&ids.join(","), "batch get", e))?;
        Ok(records.into_iter().map(|record| self.instantiate(record)).collect())
    }

    /// First record matching `keys` on the best covering index
    pub async fn find_by_index_keys(&self, keys: &Record) -> DataAccessResult<Option<Model>> {
        if keys.len() == 1 {
            if let Some(id) = keys.get(self.schema().id_name()).and_then(Value::as_str) {
                return self.find_by_id(id).await;
            }
        }
        self.find_by_all(keys, QueryOptions::new()).await
    }

    /// First record matching `keys`, honoring order and range options
    pub async fn find_by_all(&self, keys: &Record, options: QueryOptions) -> DataAccessResult<Option<Model>> {
        let models = self.all_by_index_keys(keys, options.limit(1)).await?;
        Ok(models.into_iter().next())
    }

    /// Every record matching `keys` on the best covering index
    pub async fn all_by_index_keys(&self, keys: &Record, options: QueryOptions) -> DataAccessResult<Vec<Model>> {
        let query = query::plan(self.schema(), keys, &options, self.config())?;
        tracing::trace!(entity = %self.entity_name(), index = %query.index, "index query");

        let records = self
            .inner
            .store
            .query(&query)
            .await
            .map_err(|e| self.store_failure(&query.index, "query", e))?;
        Ok(records.into_iter().map(|record| self.instantiate(record)).collect())
    }

    /// Every record of this entity type, through its `all` index
    pub async fn all(&self, options: QueryOptions) -> DataAccessResult<Vec<Model>> {
        self.all_by_index_keys(&Record::new(), options).await
    }

    /// Delete records by id without touching their dependents
    pub async fn remove_by_ids(&self, ids: &[String]) -> DataAccessResult<()> {
        if !self.schema().allows_remove() {
            return Err(DataAccessError::not_allowed(self.entity_name(), "remove"));
        }
        if ids.is_empty() {
            return Ok(());
        }
        self.inner
            .store
            .delete(self.entity_name(), ids)
            .await
            .map_err(|e| self.store_failure(&ids.join(","), "remove", e))?;
        tracing::debug!(entity = %self.entity_name(), count = ids.len(), "removed records");
        Ok(())
    }

    /// Wrap a persisted record in a model
    pub(crate) fn instantiate(&self, record: Record) -> Model {
        self.inner
            .references_checked
            .get_or_init(|| self.warn_reference_issues());
        Model::new(self.clone(), record)
    }

    fn warn_reference_issues(&self) {
        let Ok(registry) = self.registry() else {
            return;
        };
        for issue in registry.catalog().reference_issues(self.entity_name()) {
            tracing::warn!(
                entity = %issue.entity,
                reference = %issue.reference,
                target = %issue.target,
                "{}",
                issue.message
            );
        }
    }

    /// Log and wrap a store failure
    pub(crate) fn store_failure(&self, id: &str, operation: &str, source: crate::store::StoreError) -> DataAccessError {
        tracing::error!(
            entity = %self.entity_name(),
            id = %id,
            operation = %operation,
            error = %source,
            "store operation failed"
        );
        DataAccessError::persistence(self.entity_name(), id, operation, source)
    }

    async fn persist_new(&self, record: Record) -> DataAccessResult<Model> {
        if self.schema().is_versioned() {
            return self.create_version(record).await;
        }

        let id = self.record_id(&record);
        self.inner
            .store
            .put(self.entity_name(), &id, record.clone(), WriteCondition::IfAbsent)
            .await
            .map_err(|e| self.store_failure(&id, "create", e))?;
        tracing::debug!(entity = %self.entity_name(), id = %id, "created");
        Ok(self.instantiate(record))
    }

    pub(crate) fn record_id(&self, record: &Record) -> String {
        record
            .get(self.schema().id_name())
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// Run the creation pipeline without writing anything
    fn prepare_new_record(&self, mut data: Record) -> DataAccessResult<Record> {
        let schema = self.schema();
        let entity = schema.entity_name();
        let id_name = schema.id_name();

        for name in data.keys() {
            if !schema.has_attribute(name) {
                return Err(ValidationError::new(entity, name, "is not a declared attribute").into());
            }
            if name != id_name && schema.is_read_only(name) {
                return Err(ValidationError::new(entity, name, "is read-only").into());
            }
        }

        let id = match data.get(id_name) {
            Some(Value::Null) | None => Uuid::new_v4().to_string(),
            Some(value) if is_uuid(value) => value.as_str().unwrap_or_default().to_string(),
            Some(_) => return Err(ValidationError::new(entity, id_name, "must be a UUID").into()),
        };
        data.insert(id_name.to_string(), Value::String(id));

        let now = now_iso();
        data.insert(CREATED_AT.to_string(), Value::String(now.clone()));
        data.insert(UPDATED_AT.to_string(), Value::String(now));

        if let Some(ttl) = schema.options().record_expiry {
            let expires_at = chrono::Utc::now() + ttl;
            data.insert(RECORD_EXPIRES_AT.to_string(), Value::from(expires_at.timestamp()));
        }

        for (name, spec) in schema.attributes() {
            let unset = data.get(name).map_or(true, Value::is_null);
            if unset {
                if let Some(default) = &spec.default {
                    data.insert(name.to_string(), default.produce());
                }
            }
        }
        data.retain(|_, value| !value.is_null());

        let versioning = schema.versioning();
        for (name, spec) in schema.attributes() {
            let stamped_later = versioning
                .map(|v| v.attribute == name || v.string_attribute == name)
                .unwrap_or(false);
            if stamped_later {
                continue;
            }
            spec.check(data.get(name).unwrap_or(&Value::Null))
                .map_err(|message| ValidationError::new(entity, name, message))?;
        }

        Ok(data)
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("entity", &self.entity_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeSpec, ReferenceOptions, ReferenceType, SchemaCatalog};
    use crate::store::{MemoryStore, Order};
    use crate::value::record;
    use serde_json::json;

    fn registry_with_store() -> (EntityRegistry, Arc<MemoryStore>) {
        let site = Schema::builder("Site")
            .add_attribute("baseURL", AttributeSpec::string().required())
            .add_attribute("deliveryType", AttributeSpec::enumeration(["aem_cs", "other"]).default_value("other"))
            .add_attribute("config", AttributeSpec::map().default_with(|| json!({})))
            .add_all_index(&["baseURL"])
            .add_index(&["deliveryType"], &["updatedAt"])
            .build()
            .unwrap();
        let page = Schema::builder("Page")
            .add_attribute("url", AttributeSpec::string())
            .add_attribute("traffic", AttributeSpec::number())
            .add_reference(
                ReferenceType::BelongsTo,
                "Site",
                vec!["traffic".to_string()],
                ReferenceOptions::new().required(true),
            )
            .allow_remove(false)
            .build()
            .unwrap();
        let catalog: SchemaCatalog = vec![site, page].into_iter().collect();
        let store = Arc::new(MemoryStore::new());
        (EntityRegistry::new(store.clone(), catalog), store)
    }

    #[tokio::test]
    async fn test_create_assigns_system_attributes_and_defaults() {
        let (registry, store) = registry_with_store();
        let sites = registry.collection("Site").unwrap();

        let site = sites
            .create(record([("baseURL", json!("https://example.com"))]))
            .await
            .unwrap();

        assert!(is_uuid(&json!(site.id())));
        assert_eq!(site.get("deliveryType"), Some(&json!("other")));
        assert_eq!(site.get("config"), Some(&json!({})));
        assert_eq!(site.get(CREATED_AT), site.get(UPDATED_AT));
        assert_eq!(store.len("Site"), 1);
    }

    #[tokio::test]
    async fn test_create_honors_supplied_id_once() {
        let (registry, _) = registry_with_store();
        let sites = registry.collection("Site").unwrap();
        let id = Uuid::new_v4().to_string();

        let site = sites
            .create(record([("siteId", json!(id)), ("baseURL", json!("https://a.com"))]))
            .await
            .unwrap();
        assert_eq!(site.id(), id);

        let again = sites
            .create(record([("siteId", json!(id)), ("baseURL", json!("https://b.com"))]))
            .await;
        assert!(matches!(again, Err(DataAccessError::Persistence { .. })));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_data() {
        let (registry, store) = registry_with_store();
        let sites = registry.collection("Site").unwrap();

        let missing = sites.create(Record::new()).await.unwrap_err();
        assert_eq!(missing.as_validation().unwrap().attribute, "baseURL");

        let unknown = sites
            .create(record([("baseURL", json!("https://a.com")), ("color", json!("red"))]))
            .await
            .unwrap_err();
        assert_eq!(unknown.as_validation().unwrap().attribute, "color");

        let read_only = sites
            .create(record([("baseURL", json!("https://a.com")), ("createdAt", json!("x"))]))
            .await
            .unwrap_err();
        assert_eq!(read_only.as_validation().unwrap().message, "is read-only");

        let bad_enum = sites
            .create(record([("baseURL", json!("https://a.com")), ("deliveryType", json!("ftp"))]))
            .await
            .unwrap_err();
        assert_eq!(bad_enum.as_validation().unwrap().attribute, "deliveryType");

        assert!(store.is_empty("Site"));
    }

    #[tokio::test]
    async fn test_index_queries() {
        let (registry, _) = registry_with_store();
        let sites = registry.collection("Site").unwrap();
        let pages = registry.collection("Page").unwrap();

        let site = sites
            .create(record([("baseURL", json!("https://example.com"))]))
            .await
            .unwrap();
        for (url, traffic) in [("/a", 10), ("/b", 30), ("/c", 20)] {
            pages
                .create(record([
                    ("siteId", json!(site.id())),
                    ("url", json!(url)),
                    ("traffic", json!(traffic)),
                ]))
                .await
                .unwrap();
        }

        let keys = record([("siteId", json!(site.id()))]);
        let ascending = pages.all_by_index_keys(&keys, QueryOptions::new()).await.unwrap();
        let urls: Vec<_> = ascending.iter().map(|p| p.get("url").cloned().unwrap()).collect();
        assert_eq!(urls, vec![json!("/a"), json!("/c"), json!("/b")]);

        let top = pages
            .find_by_all(&keys, QueryOptions::new().order(Order::Desc))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(top.get("url"), Some(&json!("/b")));

        let ranged = pages
            .all_by_index_keys(&keys, QueryOptions::new().between(15, 30))
            .await
            .unwrap();
        assert_eq!(ranged.len(), 2);

        let by_id = pages
            .find_by_index_keys(&record([("pageId", json!(top.id()))]))
            .await
            .unwrap();
        assert_eq!(by_id.unwrap().id(), top.id());

        let found = sites
            .find_by_index_keys(&record([("baseURL", json!("https://example.com"))]))
            .await
            .unwrap();
        assert_eq!(found.unwrap().id(), site.id());
    }

    #[tokio::test]
    async fn test_uncovered_keys_are_rejected() {
        let (registry, _) = registry_with_store();
        let pages = registry.collection("Page").unwrap();
        let err = pages
            .all_by_index_keys(&record([("url", json!("/a"))]), QueryOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DataAccessError::InvalidQuery { .. }));
        assert!(matches!(pages.all(QueryOptions::new()).await, Err(DataAccessError::InvalidQuery { .. })));
    }

    #[tokio::test]
    async fn test_create_many_reports_failures_per_item() {
        let (registry, store) = registry_with_store();
        let sites = registry.collection("Site").unwrap();

        let result = sites
            .create_many(vec![
                record([("baseURL", json!("https://a.com"))]),
                Record::new(),
                record([("baseURL", json!("https://c.com"))]),
            ])
            .await;

        assert_eq!(result.created.len(), 2);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.failed[0].index, 1);
        assert!(!result.is_complete());
        assert_eq!(store.len("Site"), 2);
    }

    #[tokio::test]
    async fn test_batch_get_and_remove_by_ids() {
        let (registry, store) = registry_with_store();
        let sites = registry.collection("Site").unwrap();
        let pages = registry.collection("Page").unwrap();

        let a = sites.create(record([("baseURL", json!("https://a.com"))])).await.unwrap();
        let b = sites.create(record([("baseURL", json!("https://b.com"))])).await.unwrap();
        let ids = vec![a.id().to_string(), b.id().to_string(), Uuid::new_v4().to_string()];

        assert_eq!(sites.batch_get_by_ids(&ids).await.unwrap().len(), 2);
        sites.remove_by_ids(&ids[..1]).await.unwrap();
        assert!(!sites.exists_by_id(a.id()).await.unwrap());
        assert!(sites.exists_by_id(b.id()).await.unwrap());

        let err = pages.remove_by_ids(&ids).await.unwrap_err();
        assert!(err.is_not_allowed());
        assert_eq!(store.stats().deletes, 1);
    }

    #[test]
    fn test_ensure_entity() {
        let (registry, _) = registry_with_store();
        let sites = registry.collection("Site").unwrap();
        assert!(sites.ensure_entity("Site").is_ok());
        assert!(sites.ensure_entity("Page").is_err());
    }
}
