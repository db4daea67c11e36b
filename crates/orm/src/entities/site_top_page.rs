//! SiteTopPage - a top traffic page of a site, per source and geo

use async_trait::async_trait;
use serde_json::Value;

use crate::collection::{Collection, QueryOptions};
use crate::error::{DataAccessResult, SchemaError};
use crate::model::{Attribute, Model};
use crate::schema::validators::{is_iso_date, is_valid_url};
use crate::schema::{AttributeSpec, ReferenceOptions, ReferenceType, Schema};
use crate::value::{now_iso, record};

pub const ENTITY: &str = "SiteTopPage";

/// Geo of pages imported without one
pub const GLOBAL_GEO: &str = "global";

pub const URL: Attribute<String> = Attribute::new("url");
pub const TRAFFIC: Attribute<u64> = Attribute::new("traffic");
pub const SOURCE: Attribute<String> = Attribute::new("source");
pub const GEO: Attribute<String> = Attribute::new("geo");
pub const TOP_KEYWORD: Attribute<String> = Attribute::new("topKeyword");
pub const IMPORTED_AT: Attribute<String> = Attribute::new("importedAt");
pub const SITE_ID: Attribute<String> = Attribute::new("siteId");

pub fn schema() -> Result<Schema, SchemaError> {
    Schema::builder(ENTITY)
        .add_attribute("url", AttributeSpec::string().required().validate(is_valid_url))
        .add_attribute("traffic", AttributeSpec::integer().required().default_value(0))
        .add_attribute("source", AttributeSpec::string().required())
        .add_attribute("geo", AttributeSpec::string().required().default_value(GLOBAL_GEO))
        .add_attribute("topKeyword", AttributeSpec::string())
        .add_attribute(
            "importedAt",
            AttributeSpec::string()
                .required()
                .default_with(|| Value::String(now_iso()))
                .validate(is_iso_date),
        )
        .add_reference(
            ReferenceType::BelongsTo,
            "Site",
            vec!["source".to_string(), "geo".to_string(), "traffic".to_string()],
            ReferenceOptions::new().required(true),
        )
        .build()
}

#[async_trait]
pub trait SiteTopPageCollectionExt {
    /// Top pages of a site for one source and geo, highest traffic first
    async fn all_by_site_id_and_source_and_geo(
        &self,
        site_id: &str,
        source: &str,
        geo: &str,
    ) -> DataAccessResult<Vec<Model>>;

    /// Delete every top page of a site for one source and geo
    async fn remove_for_source_and_geo(&self, site_id: &str, source: &str, geo: &str) -> DataAccessResult<usize>;
}

#[async_trait]
impl SiteTopPageCollectionExt for Collection {
    async fn all_by_site_id_and_source_and_geo(
        &self,
        site_id: &str,
        source: &str,
        geo: &str,
    ) -> DataAccessResult<Vec<Model>> {
        self.ensure_entity(ENTITY)?;
        let keys = record([
            (SITE_ID.name(), site_id),
            (SOURCE.name(), source),
            (GEO.name(), geo),
        ]);
        self.all_by_index_keys(&keys, QueryOptions::new().desc().fetch_all())
            .await
    }

    async fn remove_for_source_and_geo(&self, site_id: &str, source: &str, geo: &str) -> DataAccessResult<usize> {
        let pages = self.all_by_site_id_and_source_and_geo(site_id, source, geo).await?;
        let ids: Vec<String> = pages.iter().map(|page| page.id().to_string()).collect();
        self.remove_by_ids(&ids).await?;
        tracing::info!(
            entity = ENTITY,
            site_id = %site_id,
            source = %source,
            geo = %geo,
            removed = ids.len(),
            "removed top pages"
        );
        Ok(ids.len())
    }
}
