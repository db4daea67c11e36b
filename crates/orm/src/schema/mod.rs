//! Schema System - Declarative description of one entity type
//!
//! A [`Schema`] lists the attributes, secondary indexes, references and
//! entity-level options of one entity type. Schemas are assembled with a
//! [`SchemaBuilder`], validated once by [`SchemaBuilder::build`], and shared
//! read-only (`Arc<Schema>`) by the collection and every model of that type.
//!
//! - `attribute`: attribute types, defaults and validators
//! - `index`: secondary indexes and index selection
//! - `reference`: relationship edges and their resolvers
//! - `builder`: the builder and its build-time checks
//! - `catalog`: the set of schemas a registry serves
//! - `naming`: id, accessor and index naming conventions
//! - `validators`: reusable attribute validators

pub mod attribute;
pub mod builder;
pub mod catalog;
pub mod index;
pub mod naming;
pub mod reference;
pub mod validators;

use std::collections::HashMap;

pub use attribute::{AttributeDefault, AttributeSpec, AttributeType, Validator};
pub use builder::SchemaBuilder;
pub use catalog::SchemaCatalog;
pub use index::{select_index, IndexMatch, IndexSpec, ALL_INDEX};
pub use reference::{IndexResolver, Reference, ReferenceOptions, ReferenceResolver, ReferenceType};

/// Creation timestamp attribute
pub const CREATED_AT: &str = "createdAt";
/// Last update timestamp attribute
pub const UPDATED_AT: &str = "updatedAt";
/// Expiry attribute (epoch seconds) of entities with record expiry
pub const RECORD_EXPIRES_AT: &str = "recordExpiresAt";

/// Append-only versioning of an entity type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersioningOptions {
    /// Integer version attribute
    pub attribute: String,
    /// Zero-padded string form of the version, used as the index sort key
    pub string_attribute: String,
}

/// Entity-level options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaOptions {
    pub allow_remove: bool,
    pub versioning: Option<VersioningOptions>,
    pub record_expiry: Option<chrono::Duration>,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            allow_remove: true,
            versioning: None,
            record_expiry: None,
        }
    }
}

/// Immutable description of one entity type
#[derive(Debug, Clone)]
pub struct Schema {
    pub(crate) entity_name: String,
    pub(crate) id_name: String,
    pub(crate) attributes: Vec<(String, AttributeSpec)>,
    pub(crate) attribute_index: HashMap<String, usize>,
    pub(crate) indexes: Vec<IndexSpec>,
    pub(crate) references: Vec<Reference>,
    pub(crate) options: SchemaOptions,
}

impl Schema {
    /// Start declaring a schema for `entity_name`
    pub fn builder(entity_name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(entity_name)
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    /// Name of the id attribute, e.g. `opportunityId`
    pub fn id_name(&self) -> &str {
        &self.id_name
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attribute_index
            .get(name)
            .map(|&position| &self.attributes[position].1)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute_index.contains_key(name)
    }

    /// Attributes in declaration order
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttributeSpec)> {
        self.attributes.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    pub fn indexes(&self) -> &[IndexSpec] {
        &self.indexes
    }

    pub fn index(&self, name: &str) -> Option<&IndexSpec> {
        self.indexes.iter().find(|index| index.name == name)
    }

    /// The index spanning all records, if declared
    pub fn all_index(&self) -> Option<&IndexSpec> {
        self.indexes.iter().find(|index| index.is_all_index())
    }

    /// Index partitioned on exactly this foreign key
    pub fn index_for_foreign_key(&self, foreign_key: &str) -> Option<&IndexSpec> {
        self.indexes
            .iter()
            .find(|index| index.partition_keys.len() == 1 && index.partition_keys[0] == foreign_key)
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    pub fn references_of(&self, kind: ReferenceType) -> impl Iterator<Item = &Reference> {
        self.references.iter().filter(move |reference| reference.kind() == kind)
    }

    pub fn reference_to(&self, kind: ReferenceType, target: &str) -> Option<&Reference> {
        self.references
            .iter()
            .find(|reference| reference.kind() == kind && reference.target() == target)
    }

    pub fn reference_by_accessor(&self, accessor: &str) -> Option<&Reference> {
        self.references
            .iter()
            .find(|reference| reference.accessor_name() == accessor)
    }

    /// References whose dependents are removed with the owner
    pub fn dependent_references(&self) -> impl Iterator<Item = &Reference> {
        self.references
            .iter()
            .filter(|reference| reference.kind().is_owner_side() && reference.is_remove_dependents())
    }

    /// Find the reference on `target` pointing back at this entity
    pub fn find_reciprocal<'a>(&self, reference: &Reference, target: &'a Schema) -> Option<&'a Reference> {
        target
            .references
            .iter()
            .find(|candidate| reference.is_reciprocal_of(candidate, &self.entity_name))
    }

    pub fn options(&self) -> &SchemaOptions {
        &self.options
    }

    pub fn allows_remove(&self) -> bool {
        self.options.allow_remove
    }

    pub fn versioning(&self) -> Option<&VersioningOptions> {
        self.options.versioning.as_ref()
    }

    pub fn is_versioned(&self) -> bool {
        self.options.versioning.is_some()
    }

    /// Attributes callers may never write
    pub fn is_read_only(&self, name: &str) -> bool {
        self.attribute(name).map(|spec| spec.read_only).unwrap_or(false)
    }
}
