//! Relationship traversal
//!
//! belongs_to references are resolved by id. has_one and has_many are
//! resolved through the reciprocal belongs_to on the target entity, by
//! querying the target's foreign key index with this model's id.

use serde_json::Value;

use super::Model;
use crate::collection::QueryOptions;
use crate::error::{DataAccessError, DataAccessResult};
use crate::schema::{Reference, ReferenceType};
use crate::value::record;

/// Result of resolving a reference by accessor name
#[derive(Debug, Clone)]
pub enum Related {
    One(Option<Model>),
    Many(Vec<Model>),
}

impl Related {
    pub fn into_one(self) -> Option<Model> {
        match self {
            Self::One(model) => model,
            Self::Many(models) => models.into_iter().next(),
        }
    }

    pub fn into_many(self) -> Vec<Model> {
        match self {
            Self::One(model) => model.into_iter().collect(),
            Self::Many(models) => models,
        }
    }
}

/// Default resolution of a reference through the owner's registry
pub(crate) async fn resolve_by_index(owner: &Model, reference: &Reference) -> DataAccessResult<Vec<Model>> {
    let registry = owner.collection().registry()?;
    let target = registry.collection(reference.target())?;

    if reference.kind() == ReferenceType::BelongsTo {
        let Some(id) = owner.get(&reference.foreign_key()).and_then(Value::as_str) else {
            return Ok(Vec::new());
        };
        return Ok(target.find_by_id(id).await?.into_iter().collect());
    }

    let Some(reciprocal) = owner.schema().find_reciprocal(reference, target.schema()) else {
        tracing::warn!(
            entity = %owner.entity_name(),
            target = %reference.target(),
            reference = %reference.kind(),
            "reciprocal reference not found, nothing to resolve"
        );
        return Ok(Vec::new());
    };

    let foreign_key = reciprocal.foreign_key();
    let index = match target.schema().index_for_foreign_key(&foreign_key) {
        Some(index) if !index.sort_keys.is_empty() => index,
        _ => {
            tracing::debug!(
                entity = %owner.entity_name(),
                target = %reference.target(),
                foreign_key = %foreign_key,
                "target has no sorted index on foreign key, skipping"
            );
            return Ok(Vec::new());
        }
    };

    let keys = record([(foreign_key.clone(), Value::String(owner.id().to_string()))]);
    let mut options = QueryOptions::new().using_index(index.name.clone());
    options = match reference.kind() {
        ReferenceType::HasOne => options.limit(1),
        _ => options.fetch_all(),
    };
    target.all_by_index_keys(&keys, options).await
}

impl Model {
    /// Resolve a reference by its accessor name (`site`, `suggestions`)
    pub async fn related(&self, accessor: &str) -> DataAccessResult<Related> {
        let reference = self.schema().reference_by_accessor(accessor).ok_or_else(|| {
            DataAccessError::invalid_query(self.entity_name(), format!("no reference named '{accessor}'"))
        })?;
        self.ensure_not_removed()?;

        let models = reference.resolver().resolve(self, reference).await?;
        Ok(match reference.kind() {
            ReferenceType::HasMany => Related::Many(models),
            ReferenceType::BelongsTo | ReferenceType::HasOne => Related::One(models.into_iter().next()),
        })
    }

    /// The parent this model belongs to
    pub async fn belongs_to(&self, target: &str) -> DataAccessResult<Option<Model>> {
        let reference = self.reference(ReferenceType::BelongsTo, target)?;
        Ok(reference.resolver().resolve(self, reference).await?.into_iter().next())
    }

    /// The single dependent of `target` type
    pub async fn has_one(&self, target: &str) -> DataAccessResult<Option<Model>> {
        let reference = self.reference(ReferenceType::HasOne, target)?;
        Ok(reference.resolver().resolve(self, reference).await?.into_iter().next())
    }

    /// Every dependent of `target` type
    pub async fn has_many(&self, target: &str) -> DataAccessResult<Vec<Model>> {
        let reference = self.reference(ReferenceType::HasMany, target)?;
        reference.resolver().resolve(self, reference).await
    }

    fn reference(&self, kind: ReferenceType, target: &str) -> DataAccessResult<&Reference> {
        self.ensure_not_removed()?;
        self.schema().reference_to(kind, target).ok_or_else(|| {
            DataAccessError::invalid_query(
                self.entity_name(),
                format!("no {kind} reference to '{target}'"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::registry::EntityRegistry;
    use crate::schema::{AttributeSpec, ReferenceOptions, ReferenceResolver, Schema, SchemaCatalog};
    use crate::store::MemoryStore;

    fn catalog() -> SchemaCatalog {
        let site = Schema::builder("Site")
            .add_attribute("baseURL", AttributeSpec::string())
            .add_reference(ReferenceType::HasMany, "Audit", vec![], ReferenceOptions::new())
            .add_reference(ReferenceType::HasOne, "Profile", vec![], ReferenceOptions::new())
            .build()
            .unwrap();
        let audit = Schema::builder("Audit")
            .add_attribute("score", AttributeSpec::number())
            .add_reference(
                ReferenceType::BelongsTo,
                "Site",
                vec!["score".to_string()],
                ReferenceOptions::new().required(true),
            )
            .build()
            .unwrap();
        // Profile has no belongs_to back to Site
        let profile = Schema::builder("Profile")
            .add_attribute("bio", AttributeSpec::string())
            .build()
            .unwrap();
        vec![site, audit, profile].into_iter().collect()
    }

    #[tokio::test]
    async fn test_has_many_and_belongs_to() {
        let registry = EntityRegistry::new(Arc::new(MemoryStore::new()), catalog());
        let site = registry
            .collection("Site")
            .unwrap()
            .create(record([("baseURL", json!("https://a.com"))]))
            .await
            .unwrap();
        let audits = registry.collection("Audit").unwrap();
        for score in [3, 1, 2] {
            audits
                .create(record([("siteId", json!(site.id())), ("score", json!(score))]))
                .await
                .unwrap();
        }

        let many = site.has_many("Audit").await.unwrap();
        let scores: Vec<_> = many.iter().map(|a| a.get("score").cloned().unwrap()).collect();
        assert_eq!(scores, vec![json!(1), json!(2), json!(3)]);

        let parent = many[0].belongs_to("Site").await.unwrap().unwrap();
        assert_eq!(parent.id(), site.id());

        let via_accessor = site.related("audits").await.unwrap().into_many();
        assert_eq!(via_accessor.len(), 3);
        assert!(matches!(many[0].related("site").await.unwrap(), Related::One(Some(_))));
    }

    #[tokio::test]
    async fn test_missing_reciprocal_resolves_to_nothing() {
        let registry = EntityRegistry::new(Arc::new(MemoryStore::new()), catalog());
        let site = registry
            .collection("Site")
            .unwrap()
            .create(record([("baseURL", json!("https://a.com"))]))
            .await
            .unwrap();

        assert!(site.has_one("Profile").await.unwrap().is_none());
        assert!(site.has_many("Profile").await.is_err());
        assert!(site.related("nothing").await.is_err());
    }

    struct FixedResolver;

    #[async_trait]
    impl ReferenceResolver for FixedResolver {
        async fn resolve(&self, owner: &Model, _reference: &Reference) -> DataAccessResult<Vec<Model>> {
            Ok(vec![owner.clone()])
        }
    }

    #[tokio::test]
    async fn test_custom_resolver_replaces_index_lookup() {
        let node = Schema::builder("Node")
            .add_attribute("label", AttributeSpec::string())
            .add_reference(
                ReferenceType::HasOne,
                "Mirror",
                vec![],
                ReferenceOptions::new().with_resolver(Arc::new(FixedResolver)),
            )
            .build()
            .unwrap();
        let catalog: SchemaCatalog = vec![node].into_iter().collect();
        let registry = EntityRegistry::new(Arc::new(MemoryStore::new()), catalog);

        let node = registry
            .collection("Node")
            .unwrap()
            .create(record([("label", json!("a"))]))
            .await
            .unwrap();
        let mirror = node.has_one("Mirror").await.unwrap().unwrap();
        assert_eq!(mirror.id(), node.id());
    }
}
