//! Opportunity - an improvement found for a site, with suggestions to fix it

use async_trait::async_trait;
use serde_json::Value;

use crate::collection::{Collection, CreateManyResult, QueryOptions};
use crate::error::{DataAccessResult, SchemaError};
use crate::model::{Attribute, Model};
use crate::schema::validators::is_valid_url;
use crate::schema::{AttributeSpec, ReferenceOptions, ReferenceType, Schema};
use crate::value::{record, Record};

pub const ENTITY: &str = "Opportunity";

string_enum! {
    /// Where an opportunity came from
    Origin {
        Ai => "AI",
        Automation => "AUTOMATION",
        EssOps => "ESS_OPS",
    }
}

string_enum! {
    OpportunityStatus {
        New => "NEW",
        InProgress => "IN_PROGRESS",
        Ignored => "IGNORED",
        Resolved => "RESOLVED",
    }
}

pub const TITLE: Attribute<String> = Attribute::new("title");
pub const TYPE: Attribute<String> = Attribute::new("type");
pub const ORIGIN: Attribute<Origin> = Attribute::new("origin");
pub const STATUS: Attribute<OpportunityStatus> = Attribute::new("status");
pub const DATA: Attribute<Value> = Attribute::new("data");
pub const GUIDANCE: Attribute<Value> = Attribute::new("guidance");
pub const TAGS: Attribute<Vec<String>> = Attribute::new("tags");
pub const RUNBOOK: Attribute<String> = Attribute::new("runbook");
pub const SITE_ID: Attribute<String> = Attribute::new("siteId");
pub const AUDIT_ID: Attribute<String> = Attribute::new("auditId");

pub fn schema() -> Result<Schema, SchemaError> {
    Schema::builder(ENTITY)
        .add_attribute("title", AttributeSpec::string().required())
        .add_attribute("description", AttributeSpec::string())
        .add_attribute("type", AttributeSpec::string().required())
        .add_attribute(
            "origin",
            AttributeSpec::enumeration(Origin::VALUES.iter().copied()).required(),
        )
        .add_attribute(
            "status",
            AttributeSpec::enumeration(OpportunityStatus::VALUES.iter().copied())
                .required()
                .default_value(OpportunityStatus::New.as_str()),
        )
        .add_attribute("data", AttributeSpec::map())
        .add_attribute("guidance", AttributeSpec::map())
        .add_attribute("tags", AttributeSpec::set())
        .add_attribute("runbook", AttributeSpec::string().validate(is_valid_url))
        .add_attribute("auditId", AttributeSpec::string())
        .add_reference(
            ReferenceType::BelongsTo,
            "Site",
            vec!["status".to_string(), "updatedAt".to_string()],
            ReferenceOptions::new().required(true),
        )
        .add_reference(
            ReferenceType::HasMany,
            "Suggestion",
            vec![],
            ReferenceOptions::new().remove_dependents(true),
        )
        .build()
}

#[async_trait]
pub trait OpportunityCollectionExt {
    /// Opportunities of a site in one status, least recently updated first
    async fn all_by_site_id_and_status(
        &self,
        site_id: &str,
        status: OpportunityStatus,
    ) -> DataAccessResult<Vec<Model>>;
}

#[async_trait]
impl OpportunityCollectionExt for Collection {
    async fn all_by_site_id_and_status(
        &self,
        site_id: &str,
        status: OpportunityStatus,
    ) -> DataAccessResult<Vec<Model>> {
        self.ensure_entity(ENTITY)?;
        let keys = record([(SITE_ID.name(), site_id), (STATUS.name(), status.as_str())]);
        self.all_by_index_keys(&keys, QueryOptions::new()).await
    }
}

#[async_trait]
pub trait OpportunityExt {
    /// Create suggestions belonging to this opportunity
    async fn add_suggestions(&self, suggestions: Vec<Record>) -> DataAccessResult<CreateManyResult>;
}

#[async_trait]
impl OpportunityExt for Model {
    async fn add_suggestions(&self, suggestions: Vec<Record>) -> DataAccessResult<CreateManyResult> {
        self.ensure_entity(ENTITY)?;
        let collection = self.collection().registry()?.collection(super::suggestion::ENTITY)?;

        let items = suggestions
            .into_iter()
            .map(|mut item| {
                item.insert(
                    super::suggestion::OPPORTUNITY_ID.name().to_string(),
                    Value::String(self.id().to_string()),
                );
                item
            })
            .collect();
        Ok(collection.create_many(items).await)
    }
}
