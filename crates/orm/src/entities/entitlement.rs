//! Entitlement - a product an organization is entitled to

use serde_json::Value;

use crate::error::SchemaError;
use crate::model::Attribute;
use crate::schema::{AttributeSpec, ReferenceOptions, ReferenceType, Schema};

pub const ENTITY: &str = "Entitlement";

string_enum! {
    ProductCode {
        Aso => "ASO",
        Llmo => "LLMO",
    }
}

string_enum! {
    Tier {
        FreeTrial => "FREE_TRIAL",
        Paid => "PAID",
    }
}

pub const PRODUCT_CODE: Attribute<ProductCode> = Attribute::new("productCode");
pub const TIER: Attribute<Tier> = Attribute::new("tier");
pub const QUOTAS: Attribute<Value> = Attribute::new("quotas");
pub const ORGANIZATION_ID: Attribute<String> = Attribute::new("organizationId");

pub fn schema() -> Result<Schema, SchemaError> {
    Schema::builder(ENTITY)
        .add_attribute(
            "productCode",
            AttributeSpec::enumeration(ProductCode::VALUES.iter().copied()).required(),
        )
        .add_attribute("tier", AttributeSpec::enumeration(Tier::VALUES.iter().copied()).required())
        .add_attribute("quotas", AttributeSpec::map())
        .add_reference(
            ReferenceType::BelongsTo,
            "Organization",
            vec!["productCode".to_string()],
            ReferenceOptions::new().required(true),
        )
        .add_reference(
            ReferenceType::HasMany,
            "SiteEnrollment",
            vec![],
            ReferenceOptions::new().remove_dependents(true),
        )
        .build()
}
