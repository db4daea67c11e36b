use std::sync::Arc;

use siteops_orm::{
    AttributeSpec, DataAccessError, ReferenceOptions, ReferenceType, Schema, SchemaCatalog, SchemaError,
};
use siteops_orm_testing::prelude::*;
use tokio_test::assert_ok;
use tracing::Level;

/// Blog lists posts that do not point back at it; comments do
fn catalog() -> SchemaCatalog {
    let blog = Schema::builder("Blog")
        .add_attribute("name", AttributeSpec::string().required())
        .add_reference(ReferenceType::HasMany, "Post", vec![], ReferenceOptions::new())
        .add_reference(
            ReferenceType::HasMany,
            "Comment",
            vec![],
            ReferenceOptions::new().remove_dependents(true),
        )
        .build()
        .unwrap();
    let post = Schema::builder("Post")
        .add_attribute("title", AttributeSpec::string())
        .build()
        .unwrap();
    let comment = Schema::builder("Comment")
        .add_attribute("body", AttributeSpec::string())
        .add_reference(ReferenceType::BelongsTo, "Blog", vec![], ReferenceOptions::new())
        .build()
        .unwrap();
    vec![blog, post, comment].into_iter().collect()
}

#[tokio::test]
async fn test_missing_reciprocal_warns_once_per_collection() {
    let harness = TestHarness::with_catalog(catalog());
    let blogs = assert_ok!(harness.collection("Blog"));

    let logs = LogCapture::new();
    let _guard = logs.install();

    let first = assert_ok!(blogs.create(record([("name", json!("engineering"))])).await);
    assert_ok!(blogs.create(record([("name", json!("product"))])).await);
    assert_ok!(blogs.find_by_id(first.id()).await);

    let warnings = logs.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].field("entity"), Some("Blog"));
    assert_eq!(warnings[0].field("target"), Some("Post"));
    assert_eq!(warnings[0].field("reference"), Some("posts"));
    assert!(warnings[0].message.contains("no belongs_to reference back to 'Blog'"));
    assert!(logs.errors().is_empty());
}

#[tokio::test]
async fn test_unresolvable_reference_is_empty_not_an_error() {
    let harness = TestHarness::with_catalog(catalog());
    let blogs = assert_ok!(harness.collection("Blog"));
    let comments = assert_ok!(harness.collection("Comment"));
    let posts = assert_ok!(harness.collection("Post"));

    let mut blog = assert_ok!(blogs.create(record([("name", json!("engineering"))])).await);
    assert_ok!(posts.create(record([("title", json!("orphan"))])).await);
    assert_ok!(
        comments
            .create(record([("blogId", json!(blog.id())), ("body", json!("first"))]))
            .await
    );

    let logs = LogCapture::new();
    let _guard = logs.install();

    assert!(assert_ok!(blog.has_many("Post").await).is_empty());
    assert!(logs.contains(Level::WARN, "reciprocal reference not found"));

    let listed = assert_ok!(blog.related("comments").await).into_many();
    assert_eq!(listed.len(), 1);

    // Removal only follows the resolvable, owning reference
    assert_ok!(blog.remove().await);
    assert!(harness.memory.is_empty("Comment"));
    assert_eq!(harness.memory.len("Post"), 1);
}

#[tokio::test]
async fn test_strict_registry_refuses_inconsistent_entity() {
    let config = DataAccessConfig {
        strict_references: true,
        ..DataAccessConfig::default()
    };
    let store: Arc<dyn siteops_orm::Store> = Arc::new(MemoryStore::new());
    let registry = EntityRegistry::with_config(store, catalog(), config);

    match registry.collection("Blog") {
        Err(DataAccessError::Schema(SchemaError::Invalid { entity, message })) => {
            assert_eq!(entity, "Blog");
            assert!(message.contains("posts"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert!(registry.collection("Comment").is_ok());
    assert!(registry.collection("Post").is_ok());
}

#[tokio::test]
async fn test_unknown_entity() {
    let harness = TestHarness::with_catalog(catalog());
    assert!(matches!(
        harness.registry.collection("Nope"),
        Err(DataAccessError::UnknownEntity(ref name)) if name == "Nope"
    ));
}
