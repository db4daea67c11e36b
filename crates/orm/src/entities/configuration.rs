//! Configuration - global job, handler and queue setup
//!
//! Append-only: every change is stored as a new version and the latest
//! version is the effective configuration.

use serde_json::{json, Value};

use crate::error::SchemaError;
use crate::model::Attribute;
use crate::schema::{AttributeSpec, Schema};

pub const ENTITY: &str = "Configuration";

pub const VERSION: Attribute<u64> = Attribute::new("version");
pub const VERSION_STRING: Attribute<String> = Attribute::new("versionString");
pub const JOBS: Attribute<Vec<Value>> = Attribute::new("jobs");
pub const HANDLERS: Attribute<Value> = Attribute::new("handlers");
pub const QUEUES: Attribute<Value> = Attribute::new("queues");
pub const SLACK_ROLES: Attribute<Value> = Attribute::new("slackRoles");

pub fn schema() -> Result<Schema, SchemaError> {
    Schema::builder(ENTITY)
        .add_attribute("jobs", AttributeSpec::list().required().default_with(|| json!([])))
        .add_attribute("handlers", AttributeSpec::map().default_with(|| json!({})))
        .add_attribute("queues", AttributeSpec::map().required().default_with(|| json!({})))
        .add_attribute("slackRoles", AttributeSpec::map())
        .with_versioning()
        .allow_remove(false)
        .build()
}
