//! Relationship declarations between entity types

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use super::naming::{camel, id_name, pluralize};
use crate::error::{DataAccessResult, SchemaError};
use crate::model::Model;

/// Kind of relationship edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceType {
    /// Many-to-one: this entity stores the target's id
    BelongsTo,
    /// One-to-one: the target stores this entity's id
    HasOne,
    /// One-to-many: the targets store this entity's id
    HasMany,
}

impl ReferenceType {
    /// Returns true if the target side stores the foreign key
    pub fn is_owner_side(self) -> bool {
        matches!(self, Self::HasOne | Self::HasMany)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BelongsTo => "belongs_to",
            Self::HasOne => "has_one",
            Self::HasMany => "has_many",
        }
    }
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "belongs_to" | "belongsTo" | "belongs-to" => Ok(Self::BelongsTo),
            "has_one" | "hasOne" | "has-one" => Ok(Self::HasOne),
            "has_many" | "hasMany" | "has-many" => Ok(Self::HasMany),
            other => Err(SchemaError::UnknownReferenceType(other.to_string())),
        }
    }
}

/// Resolves the models on the far side of a reference.
///
/// Every [`Reference`] carries one; the default resolves through the
/// registry by id and secondary index.
#[async_trait]
pub trait ReferenceResolver: Send + Sync {
    async fn resolve(&self, owner: &Model, reference: &Reference) -> DataAccessResult<Vec<Model>>;
}

/// Resolver used when none is supplied
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexResolver;

#[async_trait]
impl ReferenceResolver for IndexResolver {
    async fn resolve(&self, owner: &Model, reference: &Reference) -> DataAccessResult<Vec<Model>> {
        crate::model::relations::resolve_by_index(owner, reference).await
    }
}

/// Options of a reference
#[derive(Clone, Default)]
pub struct ReferenceOptions {
    /// belongs_to: the foreign key must be set
    pub required: bool,
    /// has_one/has_many: removing the owner removes the dependents
    pub remove_dependents: bool,
    /// Custom resolver replacing [`IndexResolver`]
    pub resolver: Option<Arc<dyn ReferenceResolver>>,
}

impl ReferenceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn remove_dependents(mut self, remove: bool) -> Self {
        self.remove_dependents = remove;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ReferenceResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }
}

impl fmt::Debug for ReferenceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceOptions")
            .field("required", &self.required)
            .field("remove_dependents", &self.remove_dependents)
            .field("resolver", &self.resolver.as_ref().map(|_| ".."))
            .finish()
    }
}

/// One relationship edge from the declaring entity to `target`
#[derive(Clone)]
pub struct Reference {
    kind: ReferenceType,
    target: String,
    sort_keys: Vec<String>,
    required: bool,
    remove_dependents: bool,
    resolver: Arc<dyn ReferenceResolver>,
}

impl Reference {
    pub fn new(
        kind: ReferenceType,
        target: impl Into<String>,
        sort_keys: Vec<String>,
        options: ReferenceOptions,
    ) -> Self {
        Self {
            kind,
            target: target.into(),
            sort_keys,
            required: options.required,
            remove_dependents: options.remove_dependents,
            resolver: options.resolver.unwrap_or_else(|| Arc::new(IndexResolver)),
        }
    }

    pub fn kind(&self) -> ReferenceType {
        self.kind
    }

    /// Target entity name
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn sort_keys(&self) -> &[String] {
        &self.sort_keys
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_remove_dependents(&self) -> bool {
        self.remove_dependents
    }

    pub fn resolver(&self) -> &Arc<dyn ReferenceResolver> {
        &self.resolver
    }

    /// Accessor name on the declaring model: `opportunity`, `suggestions`
    pub fn accessor_name(&self) -> String {
        match self.kind {
            ReferenceType::HasMany => camel(&pluralize(&self.target)),
            ReferenceType::BelongsTo | ReferenceType::HasOne => camel(&self.target),
        }
    }

    /// Foreign key attribute a belongs_to reference adds: `opportunityId`
    pub fn foreign_key(&self) -> String {
        id_name(&self.target)
    }

    /// Whether `other`, declared on the target entity, points back at `source`
    pub fn is_reciprocal_of(&self, other: &Reference, source: &str) -> bool {
        if other.target != source {
            return false;
        }
        match (self.kind, other.kind) {
            (ReferenceType::BelongsTo, ReferenceType::HasOne | ReferenceType::HasMany) => true,
            (ReferenceType::HasOne | ReferenceType::HasMany, ReferenceType::BelongsTo) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reference")
            .field("kind", &self.kind)
            .field("target", &self.target)
            .field("sort_keys", &self.sort_keys)
            .field("required", &self.required)
            .field("remove_dependents", &self.remove_dependents)
            .finish()
    }
}
