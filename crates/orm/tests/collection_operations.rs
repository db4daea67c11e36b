use siteops_orm::entities::{audit, opportunity, site, site_top_page, suggestion};
use siteops_orm::{DataAccessError, QueryOptions};
use siteops_orm_testing::prelude::*;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_find_by_id_is_idempotent() {
    init_tracing();
    let harness = TestHarness::new();
    let site = assert_ok!(SiteFactory::new().create(&harness.registry).await);
    let sites = assert_ok!(harness.collection("Site"));

    let first = assert_ok!(sites.find_by_id(site.id()).await).unwrap();
    let second = assert_ok!(sites.find_by_id(site.id()).await).unwrap();
    assert_eq!(first.record(), second.record());
    assert_eq!(harness.store.count(Operation::Put), 1);
    assert_eq!(harness.store.count(Operation::Patch), 0);

    assert!(assert_ok!(sites.find_by_id(&Uuid::new_v4().to_string()).await).is_none());
}

#[tokio::test]
async fn test_saved_changes_round_trip() {
    let harness = TestHarness::new();
    let mut site = assert_ok!(SiteFactory::new().create(&harness.registry).await);

    assert_ok!(site.write(&site::DELIVERY_TYPE, site::DeliveryType::AemCs));
    assert_ok!(site.set("gitHubURL", "https://github.com/example/site"));
    assert_ok!(site.save().await);

    let patches = harness
        .store
        .calls()
        .into_iter()
        .filter(|call| call.operation == Operation::Patch)
        .count();
    assert_eq!(patches, 1);

    let sites = assert_ok!(harness.collection("Site"));
    let reloaded = assert_ok!(sites.find_by_id(site.id()).await).unwrap();
    assert_eq!(
        assert_ok!(reloaded.read(&site::DELIVERY_TYPE)),
        Some(site::DeliveryType::AemCs)
    );
    assert_eq!(reloaded.get("gitHubURL"), Some(&json!("https://github.com/example/site")));
    assert_eq!(reloaded.updated_at(), site.updated_at());
    assert!(reloaded.updated_at() >= reloaded.created_at());
}

#[tokio::test]
async fn test_failed_save_keeps_changes() {
    let harness = TestHarness::new();
    let mut site = assert_ok!(SiteFactory::new().create(&harness.registry).await);
    harness
        .store
        .fail_record(Operation::Patch, "Site", site.id(), StoreError::Throttled);

    assert_ok!(site.set("isLive", true));
    let err = assert_err!(site.save().await);
    assert!(matches!(err, DataAccessError::Persistence { ref operation, .. } if operation == "save"));
    assert!(site.is_dirty());

    harness.store.clear_faults();
    assert_ok!(site.save().await);
    assert!(!site.is_dirty());
    let stored = harness.memory.records("Site");
    assert_eq!(stored[0]["isLive"], json!(true));
}

#[tokio::test]
async fn test_create_many_partial_success() {
    let harness = TestHarness::new();
    let sites = assert_ok!(harness.collection("Site"));

    let result = sites
        .create_many(vec![
            SiteFactory::new().build(),
            SiteFactory::new().with("baseURL", "not a url").build(),
            SiteFactory::new().build(),
        ])
        .await;

    assert_eq!(result.created.len(), 2);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].index, 1);
    assert_eq!(
        result.failed[0].error.as_validation().map(|e| e.attribute.as_str()),
        Some("baseURL")
    );
    assert_eq!(harness.memory.len("Site"), 2);
}

#[tokio::test]
async fn test_store_failure_surfaces_with_context() {
    init_tracing();
    let harness = TestHarness::new();
    harness.store.fail_entity(Operation::Put, "Site", StoreError::Timeout);

    let err = assert_err!(SiteFactory::new().create(&harness.registry).await);
    match err {
        TestError::DataAccess(DataAccessError::Persistence { entity, operation, source, .. }) => {
            assert_eq!(entity, "Site");
            assert_eq!(operation, "create");
            assert_eq!(source, StoreError::Timeout);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(harness.memory.is_empty("Site"));
}

#[tokio::test]
async fn test_site_helpers() {
    let harness = TestHarness::new();
    let sites = assert_ok!(harness.collection("Site"));
    let organization = assert_ok!(OrganizationFactory::new().create(&harness.registry).await);

    let edge = assert_ok!(
        SiteFactory::new()
            .with("baseURL", "https://www.example.com")
            .for_organization(&organization)
            .create(&harness.registry)
            .await
    );
    assert_ok!(
        SiteFactory::new()
            .delivery_type(site::DeliveryType::AemCs)
            .create(&harness.registry)
            .await
    );

    let found = assert_ok!(sites.find_by_base_url("https://www.example.com").await).unwrap();
    assert_eq!(found.id(), edge.id());
    assert!(assert_ok!(sites.find_by_base_url("https://nope.example.com").await).is_none());

    let cs = assert_ok!(sites.all_by_delivery_type(site::DeliveryType::AemCs).await);
    assert_eq!(cs.len(), 1);

    let owned = assert_ok!(sites.all_by_organization_id(organization.id()).await);
    assert_eq!(owned.len(), 1);
    let children = assert_ok!(organization.has_many("Site").await);
    assert_eq!(children[0].id(), edge.id());

    // Helpers refuse other collections
    let audits = assert_ok!(harness.collection("Audit"));
    assert!(matches!(
        audits.find_by_base_url("https://www.example.com").await,
        Err(DataAccessError::InvalidQuery { .. })
    ));
}

#[tokio::test]
async fn test_latest_audit_by_type() {
    let harness = TestHarness::new();
    let site = assert_ok!(SiteFactory::new().create(&harness.registry).await);
    let audits = assert_ok!(harness.collection("Audit"));

    for (audit_type, audited_at) in [
        ("cwv", "2024-03-01T00:00:00.000Z"),
        ("cwv", "2024-03-03T00:00:00.000Z"),
        ("cwv", "2024-03-02T00:00:00.000Z"),
        ("404", "2024-03-04T00:00:00.000Z"),
    ] {
        assert_ok!(
            audits
                .create(record([
                    ("siteId", json!(site.id())),
                    ("auditType", json!(audit_type)),
                    ("auditedAt", json!(audited_at)),
                    ("auditResult", json!({ "score": 0.9 })),
                    ("fullAuditRef", json!("s3://audits/ref")),
                ]))
                .await
        );
    }

    let cwv = assert_ok!(audits.all_by_site_id_and_audit_type(site.id(), "cwv").await);
    assert_eq!(cwv.len(), 3);

    let latest = assert_ok!(audits.latest_audit_by_type(site.id(), "cwv").await).unwrap();
    assert_eq!(
        assert_ok!(latest.read(&audit::AUDITED_AT)).as_deref(),
        Some("2024-03-03T00:00:00.000Z")
    );
    assert!(latest.get("recordExpiresAt").and_then(|v| v.as_i64()).is_some());
}

#[tokio::test]
async fn test_opportunity_and_suggestion_helpers() {
    let harness = TestHarness::new();
    let site = assert_ok!(SiteFactory::new().create(&harness.registry).await);
    let opportunities = assert_ok!(harness.collection("Opportunity"));

    let opportunity = assert_ok!(OpportunityFactory::new().for_site(&site).create(&harness.registry).await);
    assert_ok!(
        OpportunityFactory::new()
            .for_site(&site)
            .status(opportunity::OpportunityStatus::Resolved)
            .create(&harness.registry)
            .await
    );

    let open = assert_ok!(
        opportunities
            .all_by_site_id_and_status(site.id(), opportunity::OpportunityStatus::New)
            .await
    );
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].id(), opportunity.id());

    let added = assert_ok!(
        opportunity
            .add_suggestions(vec![
                SuggestionFactory::new().rank(2).build(),
                SuggestionFactory::new().rank(1).build(),
            ])
            .await
    );
    assert!(added.is_complete());

    let suggestions = assert_ok!(harness.collection("Suggestion"));
    let mut new = assert_ok!(
        suggestions
            .all_by_opportunity_id_and_status(opportunity.id(), suggestion::SuggestionStatus::New)
            .await
    );
    assert_eq!(new.len(), 2);
    assert_eq!(assert_ok!(new[0].read(&suggestion::RANK)), Some(1.0));

    assert_ok!(
        suggestions
            .bulk_update_status(&mut new, suggestion::SuggestionStatus::Approved)
            .await
    );
    let approved = assert_ok!(
        suggestions
            .all_by_opportunity_id_and_status(opportunity.id(), suggestion::SuggestionStatus::Approved)
            .await
    );
    assert_eq!(approved.len(), 2);
}

#[tokio::test]
async fn test_top_pages_by_source_and_geo() {
    let harness = TestHarness::new();
    let site = assert_ok!(SiteFactory::new().create(&harness.registry).await);
    let pages = assert_ok!(harness.collection("SiteTopPage"));

    for (url, traffic, geo) in [
        ("https://www.example.com/a", 100, "global"),
        ("https://www.example.com/b", 300, "global"),
        ("https://www.example.com/c", 200, "global"),
        ("https://www.example.com/d", 999, "us"),
    ] {
        assert_ok!(
            pages
                .create(record([
                    ("siteId", json!(site.id())),
                    ("url", json!(url)),
                    ("traffic", json!(traffic)),
                    ("source", json!("ahrefs")),
                    ("geo", json!(geo)),
                ]))
                .await
        );
    }

    let global = assert_ok!(
        pages
            .all_by_site_id_and_source_and_geo(site.id(), "ahrefs", site_top_page::GLOBAL_GEO)
            .await
    );
    let traffic: Vec<_> = global
        .iter()
        .map(|page| page.read(&site_top_page::TRAFFIC).unwrap().unwrap())
        .collect();
    assert_eq!(traffic, vec![300, 200, 100]);

    let removed = assert_ok!(pages.remove_for_source_and_geo(site.id(), "ahrefs", "global").await);
    assert_eq!(removed, 3);
    assert_eq!(harness.memory.len("SiteTopPage"), 1);
}

#[tokio::test]
async fn test_api_key_lookup_and_validity() {
    use siteops_orm::entities::api_key;

    let harness = TestHarness::new();
    let organization = assert_ok!(OrganizationFactory::new().create(&harness.registry).await);
    let keys = assert_ok!(harness.collection("ApiKey"));

    let hashed = siteops_orm_testing::factories::random_token();
    let mut key = assert_ok!(
        keys.create(record([
            ("organizationId", json!(organization.id())),
            ("hashedApiKey", hashed.clone()),
            ("name", json!("ci")),
            ("scopes", json!(["sites.read"])),
            ("expiresAt", json!("2099-01-01T00:00:00.000Z")),
        ]))
        .await
    );

    let found = assert_ok!(keys.find_by_hashed_api_key(hashed.as_str().unwrap()).await).unwrap();
    assert_eq!(found.id(), key.id());
    assert!(assert_ok!(api_key::is_valid(&key, "2024-01-01T00:00:00.000Z")));

    assert_ok!(key.write(&api_key::REVOKED_AT, "2024-06-01T00:00:00.000Z".to_string()));
    assert!(!assert_ok!(api_key::is_valid(&key, "2024-07-01T00:00:00.000Z")));
}

#[tokio::test]
async fn test_all_with_default_limit() {
    let config = DataAccessConfig {
        default_query_limit: Some(2),
        ..DataAccessConfig::default()
    };
    let harness = TestHarness::with_config(config);
    assert_ok!(SiteFactory::new().create_many(&harness.registry, 3).await);
    let sites = assert_ok!(harness.collection("Site"));

    assert_eq!(assert_ok!(sites.all(QueryOptions::new()).await).len(), 2);
    assert_eq!(assert_ok!(sites.all(QueryOptions::new().fetch_all()).await).len(), 3);
}
