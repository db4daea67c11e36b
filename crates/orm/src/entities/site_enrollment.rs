//! SiteEnrollment - a site enrolled in an entitlement

use crate::error::SchemaError;
use crate::model::Attribute;
use crate::schema::{AttributeSpec, ReferenceOptions, ReferenceType, Schema};

pub const ENTITY: &str = "SiteEnrollment";

string_enum! {
    EnrollmentStatus {
        Active => "ACTIVE",
        Suspended => "SUSPENDED",
    }
}

pub const STATUS: Attribute<EnrollmentStatus> = Attribute::new("status");
pub const SITE_ID: Attribute<String> = Attribute::new("siteId");
pub const ENTITLEMENT_ID: Attribute<String> = Attribute::new("entitlementId");

pub fn schema() -> Result<Schema, SchemaError> {
    Schema::builder(ENTITY)
        .add_attribute(
            "status",
            AttributeSpec::enumeration(EnrollmentStatus::VALUES.iter().copied())
                .required()
                .default_value(EnrollmentStatus::Active.as_str()),
        )
        .add_reference(
            ReferenceType::BelongsTo,
            "Site",
            vec![],
            ReferenceOptions::new().required(true),
        )
        .add_reference(
            ReferenceType::BelongsTo,
            "Entitlement",
            vec![],
            ReferenceOptions::new().required(true),
        )
        .build()
}
