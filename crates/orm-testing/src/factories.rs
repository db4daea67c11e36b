//! Factory system for test data generation
//!
//! Each factory produces a valid record for one entity type. Defaults can
//! be overridden attribute by attribute with `with`, and the record can be
//! built without persisting or created through a registry.

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use siteops_orm::entities::{configuration, opportunity, organization, site, suggestion};
use siteops_orm::{EntityRegistry, Model, Record};
use uuid::Uuid;

use crate::{TestError, TestResult};

/// Factory trait for creating entity records
#[async_trait]
pub trait EntityFactory: Send + Sync {
    /// Entity type the factory produces
    fn entity(&self) -> &'static str;

    /// Build the record without persisting it
    fn build(&self) -> Record;

    /// Create a single record
    async fn create(&self, registry: &EntityRegistry) -> TestResult<Model> {
        let collection = registry.collection(self.entity())?;
        Ok(collection.create(self.build()).await?)
    }

    /// Create multiple records, failing on the first error
    async fn create_many(&self, registry: &EntityRegistry, count: usize) -> TestResult<Vec<Model>> {
        let collection = registry.collection(self.entity())?;
        let result = collection.create_many((0..count).map(|_| self.build()).collect()).await;
        if let Some(failure) = result.failed.into_iter().next() {
            return Err(TestError::Factory {
                message: format!("{} #{}: {}", self.entity(), failure.index, failure.error),
            });
        }
        Ok(result.created)
    }
}

/// Attribute overrides shared by the entity factories
#[derive(Debug, Clone, Default)]
pub struct FactoryBuilder {
    attributes: Record,
}

impl FactoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute value
    pub fn with<V: serde::Serialize>(mut self, key: &str, value: V) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.attributes.insert(key.to_string(), json_value);
        }
        self
    }

    /// Set multiple attributes
    pub fn with_attributes(mut self, attributes: Record) -> Self {
        self.attributes.extend(attributes);
        self
    }

    pub fn attributes(&self) -> &Record {
        &self.attributes
    }

    /// Apply the overrides on top of `defaults`
    pub fn merge(&self, mut defaults: Record) -> Record {
        for (key, value) in &self.attributes {
            defaults.insert(key.clone(), value.clone());
        }
        defaults
    }
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

macro_rules! factory {
    ($(#[$meta:meta])* $name:ident, $entity:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default)]
        pub struct $name {
            builder: FactoryBuilder,
        }

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            /// Override one attribute
            pub fn with<V: serde::Serialize>(mut self, key: &str, value: V) -> Self {
                self.builder = self.builder.with(key, value);
                self
            }
        }

        #[async_trait]
        impl EntityFactory for $name {
            fn entity(&self) -> &'static str {
                $entity
            }

            fn build(&self) -> Record {
                self.builder.merge(self.defaults())
            }
        }
    };
}

factory!(
    /// Organization with a random IMS org id
    OrganizationFactory,
    organization::ENTITY
);

impl OrganizationFactory {
    fn defaults(&self) -> Record {
        let ims = Uuid::new_v4().simple().to_string()[..24].to_uppercase();
        siteops_orm::record([
            ("name", json!(format!("Org {}", short_id()))),
            ("imsOrgId", json!(format!("{ims}@AdobeOrg"))),
        ])
    }
}

factory!(
    /// Site with a unique base URL
    SiteFactory,
    site::ENTITY
);

impl SiteFactory {
    pub fn for_organization(self, organization: &Model) -> Self {
        self.with("organizationId", organization.id())
    }

    pub fn delivery_type(self, delivery_type: site::DeliveryType) -> Self {
        self.with("deliveryType", delivery_type)
    }

    fn defaults(&self) -> Record {
        siteops_orm::record([
            ("baseURL", json!(format!("https://site-{}.example.com", short_id()))),
            ("deliveryType", json!(site::DeliveryType::AemEdge)),
        ])
    }
}

factory!(
    /// New opportunity; set the site with `for_site`
    OpportunityFactory,
    opportunity::ENTITY
);

impl OpportunityFactory {
    pub fn for_site(self, site: &Model) -> Self {
        self.with("siteId", site.id())
    }

    pub fn status(self, status: opportunity::OpportunityStatus) -> Self {
        self.with("status", status)
    }

    fn defaults(&self) -> Record {
        siteops_orm::record([
            ("siteId", json!(Uuid::new_v4().to_string())),
            ("title", json!("Broken backlinks")),
            ("type", json!("broken-backlinks")),
            ("origin", json!(opportunity::Origin::Automation)),
            ("data", json!({ "source": "factory" })),
        ])
    }
}

factory!(
    /// New suggestion; set the opportunity with `for_opportunity`
    SuggestionFactory,
    suggestion::ENTITY
);

impl SuggestionFactory {
    pub fn for_opportunity(self, opportunity: &Model) -> Self {
        self.with("opportunityId", opportunity.id())
    }

    pub fn rank(self, rank: u32) -> Self {
        self.with("rank", rank)
    }

    fn defaults(&self) -> Record {
        siteops_orm::record([
            ("opportunityId", json!(Uuid::new_v4().to_string())),
            ("type", json!(suggestion::SuggestionType::RedirectUpdate)),
            ("rank", json!(1)),
            ("data", json!({ "url_from": "/old", "url_to": "/new" })),
        ])
    }
}

factory!(
    /// Configuration with one job
    ConfigurationFactory,
    configuration::ENTITY
);

impl ConfigurationFactory {
    fn defaults(&self) -> Record {
        siteops_orm::record([
            ("jobs", json!([{ "group": "audits", "type": "cwv", "interval": "daily" }])),
            ("queues", json!({ "audits": "sqs://audits" })),
        ])
    }
}

/// Random opaque value, e.g. for hashed API keys
pub fn random_token() -> JsonValue {
    json!(Uuid::new_v4().simple().to_string())
}
