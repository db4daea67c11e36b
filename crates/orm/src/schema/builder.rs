//! Schema builder
//!
//! Declarations are collected as they are made and checked together in
//! [`SchemaBuilder::build`], so a schema is either fully valid or not built
//! at all.

use std::collections::{HashMap, HashSet};

use super::attribute::{AttributeSpec, AttributeType};
use super::index::{IndexSpec, ALL_INDEX};
use super::naming::{id_name, index_name};
use super::reference::{Reference, ReferenceOptions, ReferenceType};
use super::validators::{is_iso_date, is_uuid};
use super::{Schema, SchemaOptions, VersioningOptions, CREATED_AT, RECORD_EXPIRES_AT, UPDATED_AT};
use crate::error::SchemaError;

/// Sort keys of a belongs_to index when none are declared
const DEFAULT_REFERENCE_SORT_KEYS: &[&str] = &[UPDATED_AT];

/// Index serving versioned lookups
pub const VERSION_INDEX: &str = "byVersion";

/// Fluent builder for [`Schema`]
#[derive(Debug)]
pub struct SchemaBuilder {
    entity_name: String,
    attributes: Vec<(String, AttributeSpec)>,
    indexes: Vec<IndexSpec>,
    references: Vec<(Reference, bool)>,
    options: SchemaOptions,
    errors: Vec<SchemaError>,
}

impl SchemaBuilder {
    pub fn new(entity_name: impl Into<String>) -> Self {
        Self {
            entity_name: entity_name.into(),
            attributes: Vec::new(),
            indexes: Vec::new(),
            references: Vec::new(),
            options: SchemaOptions::default(),
            errors: Vec::new(),
        }
    }

    /// Declare an attribute
    pub fn add_attribute(mut self, name: impl Into<String>, spec: AttributeSpec) -> Self {
        self.attributes.push((name.into(), spec));
        self
    }

    /// Declare a relationship to another entity type.
    ///
    /// A belongs_to reference also adds the `<target>Id` attribute and an
    /// index partitioned on it, sorted by `sort_keys` (or `updatedAt`).
    pub fn add_reference(
        mut self,
        kind: ReferenceType,
        target: impl Into<String>,
        sort_keys: Vec<String>,
        options: ReferenceOptions,
    ) -> Self {
        self.references
            .push((Reference::new(kind, target, sort_keys, options), true));
        self
    }

    /// Same as [`add_reference`](Self::add_reference) with the kind given as text
    pub fn add_reference_str(
        mut self,
        kind: &str,
        target: impl Into<String>,
        sort_keys: Vec<String>,
        options: ReferenceOptions,
    ) -> Self {
        match kind.parse::<ReferenceType>() {
            Ok(kind) => self.add_reference(kind, target, sort_keys, options),
            Err(err) => {
                self.errors.push(err);
                self
            }
        }
    }

    /// belongs_to reference whose foreign key is not indexed.
    ///
    /// The target can still be traversed from this side, but the target
    /// cannot list its dependents through this reference.
    pub fn add_unindexed_reference(mut self, target: impl Into<String>, options: ReferenceOptions) -> Self {
        self.references.push((
            Reference::new(ReferenceType::BelongsTo, target, Vec::new(), options),
            false,
        ));
        self
    }

    /// Declare a secondary index named after its partition keys
    pub fn add_index(self, partition_keys: &[&str], sort_keys: &[&str]) -> Self {
        let partition_keys: Vec<String> = partition_keys.iter().map(|k| k.to_string()).collect();
        let name = index_name(&partition_keys);
        self.add_named_index(name, partition_keys, sort_keys.iter().map(|k| k.to_string()).collect())
    }

    /// Declare a secondary index with an explicit name
    pub fn add_named_index(
        mut self,
        name: impl Into<String>,
        partition_keys: Vec<String>,
        sort_keys: Vec<String>,
    ) -> Self {
        self.indexes.push(IndexSpec::new(name, partition_keys, sort_keys));
        self
    }

    /// Declare the index spanning every record, sorted by `sort_keys`
    pub fn add_all_index(self, sort_keys: &[&str]) -> Self {
        let sort_keys = sort_keys.iter().map(|k| k.to_string()).collect();
        self.add_named_index(ALL_INDEX, Vec::new(), sort_keys)
    }

    pub fn allow_remove(mut self, allow: bool) -> Self {
        self.options.allow_remove = allow;
        self
    }

    /// Make the entity append-only and versioned on `version`/`versionString`
    pub fn with_versioning(mut self) -> Self {
        self.options.versioning = Some(VersioningOptions {
            attribute: "version".to_string(),
            string_attribute: "versionString".to_string(),
        });
        self
    }

    /// Stamp `recordExpiresAt` at creation, `ttl` after `createdAt`
    pub fn with_record_expiry(mut self, ttl: chrono::Duration) -> Self {
        self.options.record_expiry = Some(ttl);
        self
    }

    /// Validate every declaration and freeze the schema
    pub fn build(self) -> Result<Schema, SchemaError> {
        let Self {
            entity_name,
            attributes: declared,
            indexes: declared_indexes,
            references: declared_references,
            options,
            errors,
        } = self;

        if let Some(err) = errors.into_iter().next() {
            return Err(err);
        }

        if entity_name.trim().is_empty() {
            return Err(SchemaError::Invalid {
                entity: entity_name,
                message: "entity name must not be empty".to_string(),
            });
        }

        let id_attribute = id_name(&entity_name);
        let mut attributes: Vec<(String, AttributeSpec)> = vec![
            (
                id_attribute.clone(),
                AttributeSpec::string().required().read_only().validate(is_uuid),
            ),
            (
                CREATED_AT.to_string(),
                AttributeSpec::string().read_only().validate(is_iso_date),
            ),
            (
                UPDATED_AT.to_string(),
                AttributeSpec::string().read_only().validate(is_iso_date),
            ),
        ];
        if options.record_expiry.is_some() {
            attributes.push((RECORD_EXPIRES_AT.to_string(), AttributeSpec::integer().read_only()));
        }
        if let Some(versioning) = &options.versioning {
            attributes.push((versioning.attribute.clone(), AttributeSpec::integer().read_only()));
            attributes.push((versioning.string_attribute.clone(), AttributeSpec::string().read_only()));
        }
        let reserved: HashSet<String> = attributes.iter().map(|(name, _)| name.clone()).collect();

        let mut seen = HashSet::new();
        for (name, spec) in declared {
            if reserved.contains(&name) {
                return Err(SchemaError::ReservedAttribute {
                    entity: entity_name,
                    attribute: name,
                });
            }
            if !seen.insert(name.clone()) {
                return Err(SchemaError::DuplicateAttribute {
                    entity: entity_name,
                    attribute: name,
                });
            }
            if let AttributeType::Enum(values) = &spec.attribute_type {
                if values.is_empty() {
                    return Err(SchemaError::EmptyEnum {
                        entity: entity_name,
                        attribute: name,
                    });
                }
            }
            attributes.push((name, spec));
        }

        let mut indexes = Vec::new();
        let mut references = Vec::with_capacity(declared_references.len());
        let mut reference_keys = HashSet::new();
        for (reference, indexed) in declared_references {
            if reference.target().trim().is_empty() {
                return Err(SchemaError::Invalid {
                    entity: entity_name,
                    message: format!("{} reference without a target", reference.kind()),
                });
            }
            if !reference_keys.insert((reference.kind(), reference.target().to_string())) {
                return Err(SchemaError::DuplicateReference {
                    entity: entity_name,
                    kind: reference.kind().to_string(),
                    target: reference.target().to_string(),
                });
            }

            if reference.kind() == ReferenceType::BelongsTo {
                let foreign_key = reference.foreign_key();
                if attributes.iter().any(|(name, _)| *name == foreign_key) {
                    return Err(SchemaError::DuplicateAttribute {
                        entity: entity_name,
                        attribute: foreign_key,
                    });
                }
                let mut spec = AttributeSpec::string().validate(is_uuid);
                if reference.is_required() {
                    spec = spec.required();
                }
                attributes.push((foreign_key.clone(), spec));

                if indexed {
                    let sort_keys = if reference.sort_keys().is_empty() {
                        DEFAULT_REFERENCE_SORT_KEYS.iter().map(|k| k.to_string()).collect()
                    } else {
                        reference.sort_keys().to_vec()
                    };
                    let partition_keys = vec![foreign_key];
                    indexes.push(IndexSpec::new(index_name(&partition_keys), partition_keys, sort_keys));
                }
            }

            references.push(reference);
        }

        indexes.extend(declared_indexes);
        if let Some(versioning) = &options.versioning {
            indexes.push(IndexSpec::new(
                VERSION_INDEX,
                Vec::new(),
                vec![versioning.string_attribute.clone()],
            ));
        }

        let attribute_index: HashMap<String, usize> = attributes
            .iter()
            .enumerate()
            .map(|(position, (name, _))| (name.clone(), position))
            .collect();

        let mut index_names = HashSet::new();
        for index in &indexes {
            if !index_names.insert(index.name.clone()) {
                return Err(SchemaError::DuplicateIndex {
                    entity: entity_name,
                    index: index.name.clone(),
                });
            }
            if let Some(unknown) = index.attributes().find(|name| !attribute_index.contains_key(*name)) {
                return Err(SchemaError::UnknownIndexAttribute {
                    entity: entity_name.clone(),
                    index: index.name.clone(),
                    attribute: unknown.clone(),
                });
            }
        }

        Ok(Schema {
            entity_name,
            id_name: id_attribute,
            attributes,
            attribute_index,
            indexes,
            references,
            options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_attribute_fails() {
        let err = Schema::builder("Site")
            .add_attribute("baseURL", AttributeSpec::string())
            .add_attribute("baseURL", AttributeSpec::string())
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateAttribute {
                entity: "Site".to_string(),
                attribute: "baseURL".to_string(),
            }
        );
    }

    #[test]
    fn test_reserved_attribute_fails() {
        let err = Schema::builder("Site")
            .add_attribute("createdAt", AttributeSpec::string())
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::ReservedAttribute { .. }));
    }

    #[test]
    fn test_empty_enum_fails() {
        let err = Schema::builder("Suggestion")
            .add_attribute("status", AttributeSpec::enumeration(Vec::<String>::new()))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::EmptyEnum { .. }));
    }

    #[test]
    fn test_unknown_reference_type_fails() {
        let err = Schema::builder("Site")
            .add_reference_str("has_few", "Audit", vec![], ReferenceOptions::new())
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::UnknownReferenceType("has_few".to_string()));
    }

    #[test]
    fn test_duplicate_reference_fails() {
        let err = Schema::builder("Site")
            .add_reference(ReferenceType::HasMany, "Audit", vec![], ReferenceOptions::new())
            .add_reference(ReferenceType::HasMany, "Audit", vec![], ReferenceOptions::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateReference { .. }));
    }

    #[test]
    fn test_index_on_unknown_attribute_fails() {
        let err = Schema::builder("Site")
            .add_index(&["deliveryType"], &[])
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownIndexAttribute { .. }));
    }

    #[test]
    fn test_belongs_to_default_sort_keys() {
        let schema = Schema::builder("Audit")
            .add_reference(ReferenceType::BelongsTo, "Site", vec![], ReferenceOptions::new())
            .build()
            .unwrap();
        let index = schema.index("bySiteId").unwrap();
        assert_eq!(index.sort_keys, vec![UPDATED_AT.to_string()]);
        assert!(!schema.attribute("siteId").unwrap().required);
    }

    #[test]
    fn test_unindexed_reference_has_no_index() {
        let schema = Schema::builder("Audit")
            .add_unindexed_reference("Site", ReferenceOptions::new())
            .build()
            .unwrap();
        assert!(schema.has_attribute("siteId"));
        assert!(schema.index_for_foreign_key("siteId").is_none());
    }

    #[test]
    fn test_versioning_adds_attributes_and_index() {
        let schema = Schema::builder("Configuration")
            .with_versioning()
            .allow_remove(false)
            .build()
            .unwrap();
        assert!(schema.is_versioned());
        assert!(schema.is_read_only("version"));
        assert!(schema.is_read_only("versionString"));
        assert_eq!(
            schema.index(VERSION_INDEX).unwrap().sort_keys,
            vec!["versionString".to_string()]
        );
        assert!(!schema.allows_remove());
    }

    #[test]
    fn test_record_expiry_adds_attribute() {
        let schema = Schema::builder("Audit")
            .with_record_expiry(chrono::Duration::days(30))
            .build()
            .unwrap();
        assert!(schema.has_attribute(RECORD_EXPIRES_AT));
    }
}
