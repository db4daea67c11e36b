//! Audit - result of one audit run against a site
//!
//! Audits expire: each record carries `recordExpiresAt` so the store can
//! drop it after the retention period.

use async_trait::async_trait;
use serde_json::Value;

use crate::collection::{Collection, QueryOptions};
use crate::error::{DataAccessResult, SchemaError};
use crate::model::{Attribute, Model};
use crate::schema::validators::{is_iso_date, is_non_empty_object};
use crate::schema::{AttributeSpec, ReferenceOptions, ReferenceType, Schema};
use crate::value::record;

pub const ENTITY: &str = "Audit";

/// Retention of audit records
pub const RETENTION_DAYS: i64 = 30;

pub const AUDIT_TYPE: Attribute<String> = Attribute::new("auditType");
pub const AUDIT_RESULT: Attribute<Value> = Attribute::new("auditResult");
pub const AUDITED_AT: Attribute<String> = Attribute::new("auditedAt");
pub const FULL_AUDIT_REF: Attribute<String> = Attribute::new("fullAuditRef");
pub const IS_ERROR: Attribute<bool> = Attribute::new("isError");
pub const SITE_ID: Attribute<String> = Attribute::new("siteId");

pub fn schema() -> Result<Schema, SchemaError> {
    Schema::builder(ENTITY)
        .add_attribute("auditType", AttributeSpec::string().required())
        .add_attribute("auditResult", AttributeSpec::map().required().validate(is_non_empty_object))
        .add_attribute("auditedAt", AttributeSpec::string().required().validate(is_iso_date))
        .add_attribute("fullAuditRef", AttributeSpec::string().required())
        .add_attribute("isError", AttributeSpec::boolean().required().default_value(false))
        .add_attribute("isLive", AttributeSpec::boolean().required().default_value(false))
        .add_reference(
            ReferenceType::BelongsTo,
            "Site",
            vec!["auditType".to_string(), "auditedAt".to_string()],
            ReferenceOptions::new().required(true),
        )
        .with_record_expiry(chrono::Duration::days(RETENTION_DAYS))
        .build()
}

#[async_trait]
pub trait AuditCollectionExt {
    /// Audits of one type for a site, oldest first
    async fn all_by_site_id_and_audit_type(&self, site_id: &str, audit_type: &str) -> DataAccessResult<Vec<Model>>;

    /// Most recent audit of one type for a site
    async fn latest_audit_by_type(&self, site_id: &str, audit_type: &str) -> DataAccessResult<Option<Model>>;
}

#[async_trait]
impl AuditCollectionExt for Collection {
    async fn all_by_site_id_and_audit_type(&self, site_id: &str, audit_type: &str) -> DataAccessResult<Vec<Model>> {
        self.ensure_entity(ENTITY)?;
        let keys = record([(SITE_ID.name(), site_id), (AUDIT_TYPE.name(), audit_type)]);
        self.all_by_index_keys(&keys, QueryOptions::new()).await
    }

    async fn latest_audit_by_type(&self, site_id: &str, audit_type: &str) -> DataAccessResult<Option<Model>> {
        self.ensure_entity(ENTITY)?;
        let keys = record([(SITE_ID.name(), site_id), (AUDIT_TYPE.name(), audit_type)]);
        self.find_by_all(&keys, QueryOptions::new().desc()).await
    }
}
