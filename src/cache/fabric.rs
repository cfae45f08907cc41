//! The three-tier fabric: level selection, fan-out writes, read-through gets.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::{
    decode, encode, CacheLevel, CacheLeveled, CacheOptions, CacheValue, DistributedCache,
    ServerCache,
};
use crate::config::CacheConfig;
use crate::context::RequestContext;

/// Process-wide handle on the cache tiers.
///
/// The SERVER and DISTRIBUTED tiers are owned here; the REQUEST tier is taken
/// from the [`RequestContext`] of each call.
#[derive(Debug, Clone)]
pub struct CacheFabric {
    server: Arc<ServerCache>,
    distributed: Arc<DistributedCache>,
}

impl Default for CacheFabric {
    fn default() -> Self {
        Self::new(Arc::new(ServerCache::new()), Arc::new(DistributedCache::noop()))
    }
}

impl CacheFabric {
    pub fn new(server: Arc<ServerCache>, distributed: Arc<DistributedCache>) -> Self {
        Self {
            server,
            distributed,
        }
    }

    /// Fabric with a SERVER tier using the configured default TTL and a
    /// no-op DISTRIBUTED tier
    pub fn from_config(config: &CacheConfig) -> Self {
        let fabric = Self::new(
            Arc::new(ServerCache::with_default_ttl(config.default_ttl)),
            Arc::new(DistributedCache::noop()),
        );
        info!(
            default_ttl_secs = config.default_ttl.map(|ttl| ttl.as_secs()),
            distributed = fabric.distributed.provider_name(),
            "Cache fabric initialized"
        );
        fabric
    }

    pub fn server(&self) -> &Arc<ServerCache> {
        &self.server
    }

    pub fn distributed(&self) -> &Arc<DistributedCache> {
        &self.distributed
    }

    /// Select a single tier
    pub fn from(&self, ctx: &RequestContext, level: CacheLevel) -> Arc<dyn CacheLeveled> {
        match level {
            CacheLevel::Request => ctx.request_cache().clone() as Arc<dyn CacheLeveled>,
            CacheLevel::Server => self.server.clone() as Arc<dyn CacheLeveled>,
            CacheLevel::Distributed => self.distributed.clone() as Arc<dyn CacheLeveled>,
        }
    }

    /// First non-empty value in REQUEST, SERVER, DISTRIBUTED order
    pub async fn get(&self, ctx: &RequestContext, key: &str) -> Option<CacheValue> {
        for level in CacheLevel::ALL {
            if let Some(value) = self.from(ctx, level).get(key).await {
                debug!(key = key, level = %level, "Cache fabric HIT");
                return Some(value);
            }
        }
        debug!(key = key, "Cache fabric MISS");
        None
    }

    /// Write to every tier, REQUEST first and DISTRIBUTED last. No atomicity
    /// across tiers.
    pub async fn set(&self, ctx: &RequestContext, key: &str, value: CacheValue, options: CacheOptions) {
        for level in CacheLevel::ALL {
            self.from(ctx, level).set(key, value.clone(), options).await;
        }
    }

    pub async fn get_as<T: DeserializeOwned>(&self, ctx: &RequestContext, key: &str) -> Option<T> {
        let value = self.get(ctx, key).await?;
        decode(key, value)
    }

    pub async fn set_as<T: Serialize>(
        &self,
        ctx: &RequestContext,
        key: &str,
        value: &T,
        options: CacheOptions,
    ) {
        if let Some(value) = encode(key, value) {
            self.set(ctx, key, value, options).await;
        }
    }
}
