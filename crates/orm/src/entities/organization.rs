//! Organization - the tenant owning sites, entitlements and API keys

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::collection::Collection;
use crate::error::{DataAccessResult, SchemaError};
use crate::model::{Attribute, Model};
use crate::schema::validators::{is_ims_org_id, is_non_empty_object};
use crate::schema::{AttributeSpec, ReferenceOptions, ReferenceType, Schema};
use crate::value::record;

pub const ENTITY: &str = "Organization";

/// Organization that has no IMS org of its own
pub const DEFAULT_IMS_ORG_ID: &str = "default";

pub const NAME: Attribute<String> = Attribute::new("name");
pub const IMS_ORG_ID: Attribute<String> = Attribute::new("imsOrgId");
pub const CONFIG: Attribute<Value> = Attribute::new("config");

pub fn schema() -> Result<Schema, SchemaError> {
    Schema::builder(ENTITY)
        .add_attribute("name", AttributeSpec::string().required())
        .add_attribute(
            "imsOrgId",
            AttributeSpec::string()
                .default_value(DEFAULT_IMS_ORG_ID)
                .validate(|value| value.as_str() == Some(DEFAULT_IMS_ORG_ID) || is_ims_org_id(value)),
        )
        .add_attribute(
            "config",
            AttributeSpec::map()
                .required()
                .default_with(|| json!({ "slack": {}, "handlers": {} }))
                .validate(is_non_empty_object),
        )
        .add_attribute("fulfillableItems", AttributeSpec::any())
        .add_reference(ReferenceType::HasMany, "Site", vec![], ReferenceOptions::new())
        .add_reference(
            ReferenceType::HasMany,
            "Entitlement",
            vec![],
            ReferenceOptions::new().remove_dependents(true),
        )
        .add_reference(
            ReferenceType::HasMany,
            "ApiKey",
            vec![],
            ReferenceOptions::new().remove_dependents(true),
        )
        .add_index(&["imsOrgId"], &["updatedAt"])
        .build()
}

#[async_trait]
pub trait OrganizationCollectionExt {
    /// Organization linked to an IMS org
    async fn find_by_ims_org_id(&self, ims_org_id: &str) -> DataAccessResult<Option<Model>>;
}

#[async_trait]
impl OrganizationCollectionExt for Collection {
    async fn find_by_ims_org_id(&self, ims_org_id: &str) -> DataAccessResult<Option<Model>> {
        self.ensure_entity(ENTITY)?;
        self.find_by_index_keys(&record([(IMS_ORG_ID.name(), ims_org_id)])).await
    }
}
