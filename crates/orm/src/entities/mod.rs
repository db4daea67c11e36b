//! Entity catalog
//!
//! Schemas of the domain entity types, typed attribute handles, enum value
//! types and entity-specific helpers. [`catalog`] assembles every schema;
//! [`registry`] wires the catalog to a store.
//!
//! Helpers are extension traits on [`Collection`](crate::Collection) and
//! [`Model`](crate::Model); bring them into scope with
//! `use siteops_orm::entities::prelude::*`.

use std::sync::Arc;

use crate::config::DataAccessConfig;
use crate::error::SchemaError;
use crate::registry::EntityRegistry;
use crate::schema::SchemaCatalog;
use crate::store::Store;

/// Declare a string-valued enum attribute type.
///
/// Generates the enum with serde renames, `as_str`, `VALUES` (for
/// `AttributeSpec::enumeration`) and `Display`.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            pub const VALUES: &'static [&'static str] = &[$($value),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $value,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub mod api_key;
pub mod audit;
pub mod configuration;
pub mod entitlement;
pub mod key_event;
pub mod opportunity;
pub mod organization;
pub mod site;
pub mod site_enrollment;
pub mod site_top_page;
pub mod suggestion;

/// Extension traits of every entity
pub mod prelude {
    pub use super::api_key::ApiKeyCollectionExt;
    pub use super::audit::AuditCollectionExt;
    pub use super::opportunity::{OpportunityCollectionExt, OpportunityExt};
    pub use super::organization::OrganizationCollectionExt;
    pub use super::site::SiteCollectionExt;
    pub use super::site_top_page::SiteTopPageCollectionExt;
    pub use super::suggestion::SuggestionCollectionExt;
}

/// Every entity schema
pub fn catalog() -> Result<SchemaCatalog, SchemaError> {
    SchemaCatalog::new()
        .with(organization::schema()?)?
        .with(site::schema()?)?
        .with(audit::schema()?)?
        .with(opportunity::schema()?)?
        .with(suggestion::schema()?)?
        .with(configuration::schema()?)?
        .with(entitlement::schema()?)?
        .with(site_enrollment::schema()?)?
        .with(api_key::schema()?)?
        .with(key_event::schema()?)?
        .with(site_top_page::schema()?)
}

/// Registry over every entity, with the default configuration
pub fn registry(store: Arc<dyn Store>) -> Result<EntityRegistry, SchemaError> {
    registry_with_config(store, DataAccessConfig::default())
}

pub fn registry_with_config(store: Arc<dyn Store>, config: DataAccessConfig) -> Result<EntityRegistry, SchemaError> {
    Ok(EntityRegistry::with_config(store, catalog()?, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_builds() {
        let catalog = catalog().unwrap();
        assert_eq!(catalog.len(), 11);
        assert!(catalog.contains("SiteTopPage"));
    }

    #[test]
    fn test_catalog_references_are_consistent() {
        let catalog = catalog().unwrap();
        assert_eq!(catalog.all_reference_issues(), Vec::new());
    }

    #[test]
    fn test_strict_registry_accepts_catalog() {
        let config = DataAccessConfig {
            strict_references: true,
            ..DataAccessConfig::default()
        };
        let registry = registry_with_config(Arc::new(crate::store::MemoryStore::new()), config).unwrap();
        for entity in catalog().unwrap().entity_names() {
            assert!(registry.collection(entity).is_ok(), "{entity}");
        }
    }
}
