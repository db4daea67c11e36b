//! Schema catalog - the set of entity types a registry can serve

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{ReferenceType, Schema};
use crate::error::SchemaError;

/// Problem found while cross-checking references between schemas
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceIssue {
    pub entity: String,
    pub reference: String,
    pub target: String,
    pub message: String,
}

/// Immutable-after-assembly map of entity name to schema
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    schemas: BTreeMap<String, Arc<Schema>>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a schema; entity names must be unique
    pub fn register(&mut self, schema: Schema) -> Result<(), SchemaError> {
        let name = schema.entity_name().to_string();
        if self.schemas.contains_key(&name) {
            return Err(SchemaError::Invalid {
                entity: name,
                message: "entity is registered more than once".to_string(),
            });
        }
        self.schemas.insert(name, Arc::new(schema));
        Ok(())
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, schema: Schema) -> Result<Self, SchemaError> {
        self.register(schema)?;
        Ok(self)
    }

    pub fn get(&self, entity: &str) -> Option<&Arc<Schema>> {
        self.schemas.get(entity)
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.schemas.contains_key(entity)
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Reference problems of one entity: unknown targets and missing reciprocals
    pub fn reference_issues(&self, entity: &str) -> Vec<ReferenceIssue> {
        let Some(schema) = self.schemas.get(entity) else {
            return Vec::new();
        };

        let mut issues = Vec::new();
        for reference in schema.references() {
            let issue = |message: String| ReferenceIssue {
                entity: entity.to_string(),
                reference: reference.accessor_name(),
                target: reference.target().to_string(),
                message,
            };

            let Some(target) = self.schemas.get(reference.target()) else {
                issues.push(issue(format!("target entity '{}' is not registered", reference.target())));
                continue;
            };

            if reference.kind() == ReferenceType::BelongsTo {
                continue;
            }

            match schema.find_reciprocal(reference, target) {
                None => issues.push(issue(format!(
                    "'{}' declares no belongs_to reference back to '{}'",
                    reference.target(),
                    entity
                ))),
                Some(reciprocal) => {
                    if target.index_for_foreign_key(&reciprocal.foreign_key()).is_none() {
                        issues.push(issue(format!(
                            "'{}' does not index '{}'",
                            reference.target(),
                            reciprocal.foreign_key()
                        )));
                    }
                }
            }
        }
        issues
    }

    /// Reference problems across every registered entity
    pub fn all_reference_issues(&self) -> Vec<ReferenceIssue> {
        self.schemas
            .keys()
            .flat_map(|entity| self.reference_issues(entity))
            .collect()
    }
}

impl FromIterator<Schema> for SchemaCatalog {
    /// Later schemas with an already registered name are ignored
    fn from_iter<I: IntoIterator<Item = Schema>>(iter: I) -> Self {
        let mut catalog = SchemaCatalog::new();
        for schema in iter {
            let _ = catalog.register(schema);
        }
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeSpec, ReferenceOptions};

    fn schema(name: &str, references: &[(ReferenceType, &str)]) -> Schema {
        references
            .iter()
            .fold(
                Schema::builder(name).add_attribute("name", AttributeSpec::string()),
                |builder, (kind, target)| builder.add_reference(*kind, *target, vec![], ReferenceOptions::new()),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut catalog = SchemaCatalog::new();
        catalog.register(schema("Site", &[])).unwrap();
        assert!(catalog.register(schema("Site", &[])).is_err());
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_consistent_references_have_no_issues() {
        let catalog: SchemaCatalog = vec![
            schema("Opportunity", &[(ReferenceType::HasMany, "Suggestion")]),
            schema("Suggestion", &[(ReferenceType::BelongsTo, "Opportunity")]),
        ]
        .into_iter()
        .collect();
        assert!(catalog.all_reference_issues().is_empty());
    }

    #[test]
    fn test_missing_reciprocal_and_target_reported() {
        let catalog: SchemaCatalog = vec![
            schema(
                "Opportunity",
                &[(ReferenceType::HasMany, "Suggestion"), (ReferenceType::HasOne, "Ghost")],
            ),
            schema("Suggestion", &[]),
        ]
        .into_iter()
        .collect();

        let issues = catalog.reference_issues("Opportunity");
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].reference, "suggestions");
        assert!(issues[1].message.contains("not registered"));
    }
}
