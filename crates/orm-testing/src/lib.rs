//! # siteops-orm-testing - Test utilities for siteops-orm
//!
//! - **Fault injection**: [`FaultyStore`] wraps any store, records every call
//!   and fails chosen operations on chosen records
//! - **Log capture**: [`LogCapture`] collects tracing events for assertions
//! - **Factories**: valid entity data with sensible defaults
//! - **Harness**: a registry over an in-memory store in one call
//!
//! ```ignore
//! use siteops_orm_testing::prelude::*;
//!
//! #[tokio::test]
//! async fn creates_a_site() {
//!     let harness = TestHarness::new();
//!     let site = SiteFactory::new().create(&harness.registry).await.unwrap();
//!     assert_eq!(harness.store.count(Operation::Put), 1);
//! }
//! ```

pub mod factories;
pub mod harness;
pub mod logs;
pub mod store;

pub use factories::{
    ConfigurationFactory, EntityFactory, FactoryBuilder, OpportunityFactory, OrganizationFactory, SiteFactory,
    SuggestionFactory,
};
pub use harness::TestHarness;
pub use logs::{init_tracing, CapturedEvent, LogCapture};
pub use store::{Call, FaultyStore, Operation};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        factories::{
            ConfigurationFactory, EntityFactory, FactoryBuilder, OpportunityFactory, OrganizationFactory,
            SiteFactory, SuggestionFactory,
        },
        harness::TestHarness,
        logs::{init_tracing, CapturedEvent, LogCapture},
        store::{Call, FaultyStore, Operation},
        TestError, TestResult,
    };

    pub use serde_json::{json, Value as JsonValue};
    pub use siteops_orm::entities::prelude::*;
    pub use siteops_orm::{record, DataAccessConfig, DataAccessError, EntityRegistry, MemoryStore, Model, Record, StoreError};
    pub use uuid::Uuid;
}

/// Errors raised by test utilities
#[derive(thiserror::Error, Debug)]
pub enum TestError {
    #[error("Data access error: {0}")]
    DataAccess(#[from] siteops_orm::DataAccessError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Factory error: {message}")]
    Factory { message: String },
}

pub type TestResult<T> = Result<T, TestError>;
