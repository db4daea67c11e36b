//! Suggestion - one proposed fix for an opportunity

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;

use crate::collection::{Collection, QueryOptions};
use crate::error::{DataAccessResult, SchemaError};
use crate::model::{Attribute, Model};
use crate::schema::{AttributeSpec, ReferenceOptions, ReferenceType, Schema};
use crate::value::record;

pub const ENTITY: &str = "Suggestion";

string_enum! {
    SuggestionType {
        CodeChange => "CODE_CHANGE",
        Content => "CONTENT",
        RedirectUpdate => "REDIRECT_UPDATE",
        MetadataUpdate => "METADATA_UPDATE",
    }
}

string_enum! {
    SuggestionStatus {
        New => "NEW",
        Approved => "APPROVED",
        Skipped => "SKIPPED",
        Fixed => "FIXED",
        Error => "ERROR",
    }
}

pub const TYPE: Attribute<SuggestionType> = Attribute::new("type");
pub const STATUS: Attribute<SuggestionStatus> = Attribute::new("status");
pub const RANK: Attribute<f64> = Attribute::new("rank");
pub const DATA: Attribute<Value> = Attribute::new("data");
pub const KPI_DELTAS: Attribute<Value> = Attribute::new("kpiDeltas");
pub const OPPORTUNITY_ID: Attribute<String> = Attribute::new("opportunityId");

pub fn schema() -> Result<Schema, SchemaError> {
    Schema::builder(ENTITY)
        .add_attribute(
            "type",
            AttributeSpec::enumeration(SuggestionType::VALUES.iter().copied()).required(),
        )
        .add_attribute(
            "status",
            AttributeSpec::enumeration(SuggestionStatus::VALUES.iter().copied())
                .required()
                .default_value(SuggestionStatus::New.as_str()),
        )
        .add_attribute("rank", AttributeSpec::number().required())
        .add_attribute("data", AttributeSpec::map().required())
        .add_attribute("kpiDeltas", AttributeSpec::map())
        .add_reference(
            ReferenceType::BelongsTo,
            "Opportunity",
            vec!["status".to_string(), "rank".to_string()],
            ReferenceOptions::new().required(true),
        )
        .build()
}

#[async_trait]
pub trait SuggestionCollectionExt {
    /// Suggestions of an opportunity in one status, by rank
    async fn all_by_opportunity_id_and_status(
        &self,
        opportunity_id: &str,
        status: SuggestionStatus,
    ) -> DataAccessResult<Vec<Model>>;

    /// Set the status of every suggestion and save them concurrently.
    ///
    /// All models are updated in memory first; a validation failure leaves
    /// the store untouched. Returns the first save failure, if any.
    async fn bulk_update_status(&self, suggestions: &mut [Model], status: SuggestionStatus) -> DataAccessResult<()>;
}

#[async_trait]
impl SuggestionCollectionExt for Collection {
    async fn all_by_opportunity_id_and_status(
        &self,
        opportunity_id: &str,
        status: SuggestionStatus,
    ) -> DataAccessResult<Vec<Model>> {
        self.ensure_entity(ENTITY)?;
        let keys = record([(OPPORTUNITY_ID.name(), opportunity_id), (STATUS.name(), status.as_str())]);
        self.all_by_index_keys(&keys, QueryOptions::new()).await
    }

    async fn bulk_update_status(&self, suggestions: &mut [Model], status: SuggestionStatus) -> DataAccessResult<()> {
        self.ensure_entity(ENTITY)?;
        for suggestion in suggestions.iter_mut() {
            suggestion.ensure_entity(ENTITY)?;
            suggestion.write(&STATUS, status)?;
        }

        let results = join_all(suggestions.iter_mut().map(|suggestion| suggestion.save())).await;
        match results.into_iter().find_map(Result::err) {
            Some(first) => Err(first),
            None => Ok(()),
        }
    }
}
