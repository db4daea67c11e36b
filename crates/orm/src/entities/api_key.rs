//! ApiKey - hashed API key issued to an organization

use async_trait::async_trait;

use crate::collection::Collection;
use crate::error::{DataAccessResult, SchemaError};
use crate::model::{Attribute, Model};
use crate::schema::validators::is_iso_date;
use crate::schema::{AttributeSpec, ReferenceOptions, ReferenceType, Schema};
use crate::value::record;

pub const ENTITY: &str = "ApiKey";

pub const HASHED_API_KEY: Attribute<String> = Attribute::new("hashedApiKey");
pub const NAME: Attribute<String> = Attribute::new("name");
pub const SCOPES: Attribute<Vec<String>> = Attribute::new("scopes");
pub const EXPIRES_AT: Attribute<String> = Attribute::new("expiresAt");
pub const REVOKED_AT: Attribute<String> = Attribute::new("revokedAt");
pub const DELETED_AT: Attribute<String> = Attribute::new("deletedAt");

pub fn schema() -> Result<Schema, SchemaError> {
    Schema::builder(ENTITY)
        .add_attribute("hashedApiKey", AttributeSpec::string().required())
        .add_attribute("name", AttributeSpec::string().required())
        .add_attribute("scopes", AttributeSpec::list().required())
        .add_attribute("expiresAt", AttributeSpec::string().validate(is_iso_date))
        .add_attribute("revokedAt", AttributeSpec::string().validate(is_iso_date))
        .add_attribute("deletedAt", AttributeSpec::string().validate(is_iso_date))
        .add_reference(
            ReferenceType::BelongsTo,
            "Organization",
            vec![],
            ReferenceOptions::new().required(true),
        )
        .add_index(&["hashedApiKey"], &[])
        .build()
}

/// Whether the key is usable at `now` (RFC 3339)
pub fn is_valid(api_key: &Model, now: &str) -> DataAccessResult<bool> {
    api_key.ensure_entity(ENTITY)?;
    if api_key.read(&REVOKED_AT)?.is_some() || api_key.read(&DELETED_AT)?.is_some() {
        return Ok(false);
    }
    let expires_at = api_key.read(&EXPIRES_AT)?;
    Ok(match expires_at {
        Some(expires_at) => match (
            chrono::DateTime::parse_from_rfc3339(&expires_at),
            chrono::DateTime::parse_from_rfc3339(now),
        ) {
            (Ok(expires_at), Ok(now)) => expires_at > now,
            _ => false,
        },
        None => true,
    })
}

#[async_trait]
pub trait ApiKeyCollectionExt {
    async fn find_by_hashed_api_key(&self, hashed_api_key: &str) -> DataAccessResult<Option<Model>>;
}

#[async_trait]
impl ApiKeyCollectionExt for Collection {
    async fn find_by_hashed_api_key(&self, hashed_api_key: &str) -> DataAccessResult<Option<Model>> {
        self.ensure_entity(ENTITY)?;
        self.find_by_index_keys(&record([(HASHED_API_KEY.name(), hashed_api_key)])).await
    }
}
