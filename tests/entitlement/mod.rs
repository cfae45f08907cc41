//! Entitlement engine tests: grants, quotas, gating and request memoization.

mod quota_properties;

use std::sync::Arc;
use subtrack_core::constants::{features, plans};
use subtrack_core::entitlement::entitlement_cache_key;
use subtrack_core::{
    Account, CacheLeveledExt, EffectiveEntitlement, EntitlementEngine, Feature, FeatureId,
    FeatureType, Grant, PlanCatalog, RequestContext, SubtrackError,
};

use crate::common::CountingUsageStore;

fn catalog(allow_custom_providers: bool) -> PlanCatalog {
    PlanCatalog::builder()
        .feature(Feature::quota("active_subs", "Active subscriptions"))
        .feature(Feature::boolean("custom_providers", "Custom providers"))
        .feature(
            Feature::quota("custom_providers_count", "Custom provider count")
                .gated_by("custom_providers"),
        )
        .feature(Feature::quota("family_members_count", "Family members"))
        .grant("free", "active_subs", Grant::Limit(Some(10)))
        .grant("free", "custom_providers", Grant::Allowed(allow_custom_providers))
        .grant("free", "custom_providers_count", Grant::Limit(Some(5)))
        .grant("free", "family_members_count", Grant::Limit(None))
        .build()
        .expect("valid catalog")
}

fn engine(catalog: PlanCatalog) -> (EntitlementEngine, Arc<CountingUsageStore>) {
    let usage = Arc::new(CountingUsageStore::default());
    (EntitlementEngine::new(Arc::new(catalog), usage.clone()), usage)
}

fn feature(id: &'static str) -> FeatureId {
    FeatureId::from(id)
}

#[tokio::test]
async fn test_gated_quota_with_open_gate() {
    let (engine, usage) = engine(catalog(true));
    let account = Account::new("user-1", "free");
    usage
        .inner
        .set(&account.user_id, &feature("custom_providers_count"), 2);

    let entry = engine
        .resolve(&RequestContext::new(), &account, &feature("custom_providers_count"))
        .await
        .unwrap();

    assert_eq!(
        entry,
        EffectiveEntitlement {
            feature: feature("custom_providers_count"),
            feature_type: FeatureType::Quota,
            enabled: true,
            limit: Some(5),
            used: Some(2),
            remaining: Some(3),
        }
    );
}

#[tokio::test]
async fn test_closed_gate_disables_but_reports_remaining() {
    let (engine, usage) = engine(catalog(false));
    let account = Account::new("user-1", "free");
    usage
        .inner
        .set(&account.user_id, &feature("custom_providers_count"), 2);

    let entry = engine
        .resolve(&RequestContext::new(), &account, &feature("custom_providers_count"))
        .await
        .unwrap();

    assert!(!entry.enabled);
    assert_eq!(entry.limit, Some(5));
    assert_eq!(entry.used, Some(2));
    assert_eq!(entry.remaining, Some(3));
}

#[tokio::test]
async fn test_closed_gate_wins_even_with_unused_quota() {
    let (engine, _) = engine(catalog(false));
    let entry = engine
        .resolve(
            &RequestContext::new(),
            &Account::new("user-1", "free"),
            &feature("custom_providers_count"),
        )
        .await
        .unwrap();
    assert!(!entry.enabled);
    assert_eq!(entry.remaining, Some(5));
}

#[tokio::test]
async fn test_quota_boundaries() {
    let (engine, usage) = engine(catalog(true));
    let account = Account::new("user-1", "free");
    let active = feature("active_subs");

    for (used, enabled, remaining) in [(9, true, 1), (10, false, 0), (11, false, 0)] {
        usage.inner.set(&account.user_id, &active, used);
        let entry = engine
            .resolve(&RequestContext::new(), &account, &active)
            .await
            .unwrap();
        assert_eq!(entry.enabled, enabled, "used={used}");
        assert_eq!(entry.remaining, Some(remaining), "used={used}");
    }
}

#[tokio::test]
async fn test_unlimited_quota_reports_usage() {
    let (engine, usage) = engine(catalog(true));
    let account = Account::new("user-1", "free");
    usage
        .inner
        .set(&account.user_id, &feature("family_members_count"), 42);

    let entry = engine
        .resolve(&RequestContext::new(), &account, &feature("family_members_count"))
        .await
        .unwrap();

    assert!(entry.enabled);
    assert_eq!(entry.limit, None);
    assert_eq!(entry.used, Some(42));
    assert_eq!(entry.remaining, None);
}

#[tokio::test]
async fn test_missing_counter_reads_as_zero() {
    let (engine, _) = engine(catalog(true));
    let entry = engine
        .resolve(&RequestContext::new(), &Account::new("user-1", "free"), &feature("active_subs"))
        .await
        .unwrap();
    assert_eq!(entry.used, Some(0));
    assert_eq!(entry.remaining, Some(10));
}

#[tokio::test]
async fn test_one_usage_read_per_feature_per_request() {
    let (engine, usage) = engine(catalog(true));
    let account = Account::new("user-1", "free");
    let ctx = RequestContext::new();

    for _ in 0..3 {
        engine
            .resolve(&ctx, &account, &feature("active_subs"))
            .await
            .unwrap();
    }
    assert_eq!(usage.reads(), 1);

    let memo = ctx
        .request_cache()
        .get_as::<EffectiveEntitlement>(&entitlement_cache_key(&account, &feature("active_subs")))
        .await;
    assert!(memo.is_some());
    assert_eq!(
        entitlement_cache_key(&account, &feature("active_subs")),
        "entitlement:user-1:active_subs"
    );

    // A new request reads again
    engine
        .resolve(&RequestContext::new(), &account, &feature("active_subs"))
        .await
        .unwrap();
    assert_eq!(usage.reads(), 2);
}

#[tokio::test]
async fn test_memo_is_per_user() {
    let (engine, usage) = engine(catalog(true));
    let ctx = RequestContext::new();
    let first = Account::new("user-1", "free");
    let second = Account::new("user-2", "free");
    usage.inner.set(&first.user_id, &feature("active_subs"), 10);

    let a = engine.resolve(&ctx, &first, &feature("active_subs")).await.unwrap();
    let b = engine.resolve(&ctx, &second, &feature("active_subs")).await.unwrap();

    assert!(!a.enabled);
    assert!(b.enabled);
    assert_eq!(usage.reads(), 2);
}

#[tokio::test]
async fn test_resolve_all_keeps_input_order() {
    let (engine, _) = engine(catalog(true));
    let requested = [
        feature("custom_providers_count"),
        feature("active_subs"),
        feature("custom_providers"),
    ];

    let entries = engine
        .resolve_all(&RequestContext::new(), &Account::new("user-1", "free"), &requested)
        .await
        .unwrap();

    let ids: Vec<FeatureId> = entries.into_iter().map(|entry| entry.feature).collect();
    assert_eq!(ids, requested.to_vec());
}

#[tokio::test]
async fn test_resolve_quotas_covers_every_quota_feature() {
    let (engine, _) = engine(catalog(true));
    let entries = engine
        .resolve_quotas(&RequestContext::new(), &Account::new("user-1", "free"))
        .await
        .unwrap();

    assert_eq!(entries.len(), 3);
    assert!(entries
        .iter()
        .all(|entry| entry.feature_type == FeatureType::Quota));
}

#[tokio::test]
async fn test_unknown_feature_and_plan() {
    let (engine, _) = engine(catalog(true));
    let ctx = RequestContext::new();

    let err = engine
        .resolve(&ctx, &Account::new("user-1", "free"), &feature("teleportation"))
        .await
        .unwrap_err();
    assert_eq!(err, SubtrackError::FeatureNotFound(feature("teleportation")));
    assert_eq!(err.http_status(), 500);
    assert!(!err.is_client_error());

    let err = engine
        .resolve(&ctx, &Account::new("user-1", "enterprise"), &feature("active_subs"))
        .await
        .unwrap_err();
    assert_eq!(err, SubtrackError::PlanNotFound("enterprise".to_string()));
    assert_eq!(err.http_status(), 500);
}

#[tokio::test]
async fn test_check_gates_access() {
    let (engine, usage) = engine(catalog(false));
    let account = Account::new("user-1", "free");

    let allowed = engine
        .check(&RequestContext::new(), &account, &feature("active_subs"))
        .await
        .unwrap();
    assert!(allowed.enabled);

    let err = engine
        .check(&RequestContext::new(), &account, &feature("custom_providers"))
        .await
        .unwrap_err();
    assert!(matches!(err, SubtrackError::Unauthorized(_)));
    assert_eq!(err.http_status(), 403);

    usage.inner.set(&account.user_id, &feature("active_subs"), 10);
    let err = engine
        .check(&RequestContext::new(), &account, &feature("active_subs"))
        .await
        .unwrap_err();
    assert!(matches!(err, SubtrackError::Unauthorized(msg) if msg.contains("exhausted")));
}

#[tokio::test]
async fn test_standard_plans() {
    let (engine, _) = engine(PlanCatalog::standard().unwrap());
    let ctx = RequestContext::new();
    let free = Account::new("user-1", plans::FREE);
    let premium = Account::new("user-2", plans::PREMIUM);

    let conversion = FeatureId::from(features::CURRENCY_CONVERSION);
    assert!(!engine.resolve(&ctx, &free, &conversion).await.unwrap().enabled);
    assert!(engine.resolve(&ctx, &premium, &conversion).await.unwrap().enabled);

    let subs = FeatureId::from(features::ACTIVE_SUBSCRIPTIONS);
    assert_eq!(engine.resolve(&ctx, &free, &subs).await.unwrap().limit, Some(10));
    assert_eq!(engine.resolve(&ctx, &premium, &subs).await.unwrap().remaining, None);

    let labels = FeatureId::from(features::CUSTOM_LABELS_COUNT);
    assert!(engine.resolve(&ctx, &premium, &labels).await.unwrap().enabled);
}

#[test]
fn test_catalog_rejects_gating_cycle() {
    let err = PlanCatalog::builder()
        .feature(Feature::boolean("a", "A").gated_by("b"))
        .feature(Feature::boolean("b", "B").gated_by("a"))
        .build()
        .unwrap_err();
    assert!(matches!(err, SubtrackError::Configuration(msg) if msg.contains("cycle")));
}
