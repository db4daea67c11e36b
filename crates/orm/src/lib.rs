//! # siteops-orm: Schema-driven data access for siteops
//!
//! Entities are declared as [`Schema`]s: attributes, secondary indexes,
//! references to other entities and entity options. An [`EntityRegistry`]
//! serves one [`Collection`] per entity type over a shared [`Store`], and
//! collections hand out [`Model`]s that validate writes, save only what
//! changed, traverse relationships and remove their dependents.
//!
//! ```ignore
//! use std::sync::Arc;
//! use siteops_orm::entities::prelude::*;
//! use siteops_orm::{entities, record, MemoryStore};
//!
//! let registry = entities::registry(Arc::new(MemoryStore::new()))?;
//! let sites = registry.collection("Site")?;
//! let site = sites.create(record([("baseURL", "https://www.example.com")])).await?;
//! let opportunities = site.has_many("Opportunity").await?;
//! ```

pub mod collection;
pub mod config;
pub mod entities;
pub mod error;
pub mod model;
pub mod registry;
pub mod schema;
pub mod store;
pub mod value;

pub use collection::{encode_version, Collection, CreateFailure, CreateManyResult, QueryOptions};
pub use config::{ConfigError, DataAccessConfig};
pub use error::{DataAccessError, DataAccessResult, SchemaError, ValidationError};
pub use model::{Attribute, Model, ModelState, Related};
pub use registry::EntityRegistry;
pub use schema::{
    AttributeSpec, AttributeType, IndexSpec, Reference, ReferenceOptions, ReferenceResolver, ReferenceType, Schema,
    SchemaBuilder, SchemaCatalog,
};
pub use store::{IndexQuery, MemoryStore, Order, SortRange, Store, StoreError, StoreResult, WriteCondition};
pub use value::{record, Record};
