//! Cache fabric tests: expiry, tier isolation and fan-out precedence.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use subtrack_core::cache::{CacheResult, NoOpDistributedCache};
use subtrack_core::{
    CacheFabric, CacheLevel, CacheLeveled, CacheLeveledExt, CacheOptions, CacheValue,
    DistributedBackend, DistributedCache, RequestContext, ServerCache,
};

/// Backend remembering every write, readable for assertions
#[derive(Default)]
struct RecordingBackend {
    entries: Mutex<Vec<(String, CacheValue, Option<Duration>)>>,
}

#[async_trait]
impl DistributedBackend for RecordingBackend {
    async fn get(&self, key: &str) -> CacheResult<Option<CacheValue>> {
        Ok(self
            .entries
            .lock()
            .iter()
            .rev()
            .find(|(k, _, _)| k == key)
            .map(|(_, value, _)| value.clone()))
    }

    async fn set(&self, key: &str, value: &CacheValue, ttl: Option<Duration>) -> CacheResult<()> {
        self.entries
            .lock()
            .push((key.to_string(), value.clone(), ttl));
        Ok(())
    }

    async fn health_check(&self) -> CacheResult<bool> {
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "recording"
    }
}

#[tokio::test]
async fn test_entry_expires_after_duration() {
    let fabric = CacheFabric::default();
    let ctx = RequestContext::new();
    let ttl = Duration::from_millis(200);

    for level in CacheLevel::ALL {
        fabric
            .from(&ctx, level)
            .set("k", json!("v"), CacheOptions::with_duration(ttl))
            .await;
    }

    assert_eq!(fabric.from(&ctx, CacheLevel::Request).get("k").await, Some(json!("v")));
    assert_eq!(fabric.from(&ctx, CacheLevel::Server).get("k").await, Some(json!("v")));

    tokio::time::sleep(ttl + Duration::from_millis(100)).await;
    assert!(fabric.from(&ctx, CacheLevel::Request).get("k").await.is_none());
    assert!(fabric.from(&ctx, CacheLevel::Server).get("k").await.is_none());
    assert!(fabric.server().is_empty());
}

#[tokio::test]
async fn test_levels_are_isolated() {
    let fabric = CacheFabric::default();
    let ctx = RequestContext::new();

    fabric
        .from(&ctx, CacheLevel::Request)
        .set("request-only", json!(1), CacheOptions::default())
        .await;
    assert!(fabric.from(&ctx, CacheLevel::Server).get("request-only").await.is_none());
    assert!(fabric.from(&ctx, CacheLevel::Distributed).get("request-only").await.is_none());

    fabric
        .from(&ctx, CacheLevel::Server)
        .set("server-only", json!(2), CacheOptions::default())
        .await;
    assert!(fabric.from(&ctx, CacheLevel::Request).get("server-only").await.is_none());
    assert!(fabric.from(&ctx, CacheLevel::Distributed).get("server-only").await.is_none());
}

#[tokio::test]
async fn test_request_level_is_per_context() {
    let fabric = CacheFabric::default();
    let first = RequestContext::new();
    let second = RequestContext::new();

    fabric
        .from(&first, CacheLevel::Request)
        .set("k", json!("first"), CacheOptions::default())
        .await;

    assert!(fabric.from(&second, CacheLevel::Request).get("k").await.is_none());
    assert_eq!(
        fabric.from(&first.child(), CacheLevel::Request).get("k").await,
        Some(json!("first"))
    );
}

#[tokio::test]
async fn test_fan_out_survives_request_clear() {
    let fabric = CacheFabric::default();
    let ctx = RequestContext::new();

    fabric.set(&ctx, "k", json!({"v": 1}), CacheOptions::default()).await;
    assert_eq!(fabric.get(&ctx, "k").await, Some(json!({"v": 1})));

    ctx.request_cache().clear();
    assert_eq!(fabric.get(&ctx, "k").await, Some(json!({"v": 1})));

    // A later request sees the SERVER copy
    assert_eq!(fabric.get(&RequestContext::new(), "k").await, Some(json!({"v": 1})));
}

#[tokio::test]
async fn test_fan_out_reaches_distributed_backend() {
    let backend = Arc::new(RecordingBackend::default());
    let fabric = CacheFabric::new(
        Arc::new(ServerCache::new()),
        Arc::new(DistributedCache::new(backend.clone())),
    );
    let ctx = RequestContext::new();

    fabric
        .set(&ctx, "k", json!(7), CacheOptions::with_duration(Duration::from_secs(5)))
        .await;

    let writes = backend.entries.lock().clone();
    assert_eq!(writes, vec![("k".to_string(), json!(7), Some(Duration::from_secs(5)))]);
}

#[tokio::test]
async fn test_get_falls_through_to_distributed() {
    let backend = Arc::new(RecordingBackend::default());
    backend
        .set("shared", &json!("from-cluster"), None)
        .await
        .unwrap();
    let fabric = CacheFabric::new(
        Arc::new(ServerCache::new()),
        Arc::new(DistributedCache::new(backend)),
    );

    let ctx = RequestContext::new();
    assert_eq!(fabric.get(&ctx, "shared").await, Some(json!("from-cluster")));
    // Reads do not back-fill the narrower tiers
    assert!(fabric.server().get_value("shared").is_none());
}

#[tokio::test]
async fn test_noop_distributed_never_hits() {
    let cache = DistributedCache::new(Arc::new(NoOpDistributedCache::new()));
    cache.set("k", json!(1), CacheOptions::default()).await;
    assert!(cache.get("k").await.is_none());
}

#[tokio::test]
async fn test_typed_round_trip_on_server_level() {
    let server = ServerCache::new();
    server
        .set_as("rates", &vec![0.9f64, 150.0], CacheOptions::default())
        .await;
    assert_eq!(server.get_as::<Vec<f64>>("rates").await, Some(vec![0.9, 150.0]));
    assert_eq!(server.get_as::<String>("rates").await, None);
}

#[tokio::test]
async fn test_configured_default_ttl() {
    let fabric = CacheFabric::from_config(&subtrack_core::CacheConfig {
        default_ttl: Some(Duration::from_millis(50)),
    });
    let ctx = RequestContext::new();

    fabric.server().set_value("k", json!(1), CacheOptions::default());
    assert_eq!(fabric.get(&ctx, "k").await, Some(json!(1)));
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(fabric.get(&ctx, "k").await.is_none());
    assert!(fabric.server().is_empty());
}
