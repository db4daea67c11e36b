//! Site - a website under management

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::collection::{Collection, QueryOptions};
use crate::error::{DataAccessResult, SchemaError};
use crate::model::{Attribute, Model};
use crate::schema::validators::is_valid_url;
use crate::schema::{AttributeSpec, ReferenceOptions, ReferenceType, Schema};
use crate::value::record;

pub const ENTITY: &str = "Site";

string_enum! {
    /// How a site's content is delivered
    DeliveryType {
        AemEdge => "aem_edge",
        AemCs => "aem_cs",
        Other => "other",
    }
}

pub const BASE_URL: Attribute<String> = Attribute::new("baseURL");
pub const DELIVERY_TYPE: Attribute<DeliveryType> = Attribute::new("deliveryType");
pub const GITHUB_URL: Attribute<String> = Attribute::new("gitHubURL");
pub const IS_LIVE: Attribute<bool> = Attribute::new("isLive");
pub const IS_LIVE_TOGGLED_AT: Attribute<String> = Attribute::new("isLiveToggledAt");
pub const CONFIG: Attribute<Value> = Attribute::new("config");
pub const ORGANIZATION_ID: Attribute<String> = Attribute::new("organizationId");

pub fn schema() -> Result<Schema, SchemaError> {
    let dependents = || ReferenceOptions::new().remove_dependents(true);

    Schema::builder(ENTITY)
        .add_attribute("baseURL", AttributeSpec::string().required().validate(is_valid_url))
        .add_attribute(
            "deliveryType",
            AttributeSpec::enumeration(DeliveryType::VALUES.iter().copied())
                .required()
                .default_value(DeliveryType::Other.as_str()),
        )
        .add_attribute("gitHubURL", AttributeSpec::string().validate(is_valid_url))
        .add_attribute("isLive", AttributeSpec::boolean().required().default_value(false))
        .add_attribute("isLiveToggledAt", AttributeSpec::string())
        .add_attribute("config", AttributeSpec::map().required().default_with(|| json!({})))
        .add_attribute("hlxConfig", AttributeSpec::map())
        .add_reference(ReferenceType::BelongsTo, "Organization", vec![], ReferenceOptions::new())
        .add_reference(ReferenceType::HasMany, "Audit", vec![], dependents())
        .add_reference(ReferenceType::HasMany, "Opportunity", vec![], dependents())
        .add_reference(ReferenceType::HasMany, "KeyEvent", vec![], dependents())
        .add_reference(ReferenceType::HasMany, "SiteTopPage", vec![], dependents())
        .add_reference(ReferenceType::HasMany, "SiteEnrollment", vec![], dependents())
        .add_all_index(&["baseURL"])
        .add_index(&["deliveryType"], &["updatedAt"])
        .build()
}

#[async_trait]
pub trait SiteCollectionExt {
    async fn find_by_base_url(&self, base_url: &str) -> DataAccessResult<Option<Model>>;

    async fn all_by_delivery_type(&self, delivery_type: DeliveryType) -> DataAccessResult<Vec<Model>>;

    async fn all_by_organization_id(&self, organization_id: &str) -> DataAccessResult<Vec<Model>>;
}

#[async_trait]
impl SiteCollectionExt for Collection {
    async fn find_by_base_url(&self, base_url: &str) -> DataAccessResult<Option<Model>> {
        self.ensure_entity(ENTITY)?;
        self.find_by_index_keys(&record([(BASE_URL.name(), base_url)])).await
    }

    async fn all_by_delivery_type(&self, delivery_type: DeliveryType) -> DataAccessResult<Vec<Model>> {
        self.ensure_entity(ENTITY)?;
        self.all_by_index_keys(
            &record([(DELIVERY_TYPE.name(), delivery_type.as_str())]),
            QueryOptions::new(),
        )
        .await
    }

    async fn all_by_organization_id(&self, organization_id: &str) -> DataAccessResult<Vec<Model>> {
        self.ensure_entity(ENTITY)?;
        self.all_by_index_keys(
            &record([(ORGANIZATION_ID.name(), organization_id)]),
            QueryOptions::new(),
        )
        .await
    }
}

/// Toggle the live flag and stamp the toggle time
pub fn toggle_live(site: &mut Model) -> DataAccessResult<()> {
    site.ensure_entity(ENTITY)?;
    let live = site.read(&IS_LIVE)?.unwrap_or(false);
    site.write(&IS_LIVE, !live)?;
    site.write(&IS_LIVE_TOGGLED_AT, crate::value::now_iso())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_type_round_trip() {
        let value = serde_json::to_value(DeliveryType::AemCs).unwrap();
        assert_eq!(value, json!("aem_cs"));
        assert_eq!(DeliveryType::VALUES.len(), 3);
        assert_eq!(DeliveryType::Other.to_string(), "other");
    }

    #[test]
    fn test_base_url_must_be_url() {
        let schema = schema().unwrap();
        let spec = schema.attribute("baseURL").unwrap();
        assert!(spec.check(&json!("https://www.example.com")).is_ok());
        assert!(spec.check(&json!("www.example.com")).is_err());
    }
}
