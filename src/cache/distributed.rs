//! DISTRIBUTED tier: cluster-wide cache behind a pluggable backend.
//!
//! The only bundled backend is [`NoOpDistributedCache`], which always misses
//! and always accepts writes. [`DistributedCache`] wraps any backend and
//! degrades backend failures to misses.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::errors::CacheResult;
use super::{CacheLevel, CacheLeveled, CacheOptions, CacheValue};

/// Backend contract for a shared, cross-process cache
#[async_trait]
pub trait DistributedBackend: Send + Sync {
    /// Returns `Ok(Some(value))` on cache hit, `Ok(None)` on cache miss.
    async fn get(&self, key: &str) -> CacheResult<Option<CacheValue>>;

    async fn set(&self, key: &str, value: &CacheValue, ttl: Option<Duration>) -> CacheResult<()>;

    async fn health_check(&self) -> CacheResult<bool>;

    fn provider_name(&self) -> &'static str;
}

/// No-op backend that never caches anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpDistributedCache;

impl NoOpDistributedCache {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DistributedBackend for NoOpDistributedCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<CacheValue>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &CacheValue, _ttl: Option<Duration>) -> CacheResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> CacheResult<bool> {
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "noop"
    }
}

/// DISTRIBUTED tier adapter: unreachable backends read as a miss
#[derive(Clone)]
pub struct DistributedCache {
    backend: Arc<dyn DistributedBackend>,
}

impl fmt::Debug for DistributedCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributedCache")
            .field("backend", &self.backend.provider_name())
            .finish()
    }
}

impl Default for DistributedCache {
    fn default() -> Self {
        Self::noop()
    }
}

impl DistributedCache {
    pub fn new(backend: Arc<dyn DistributedBackend>) -> Self {
        Self { backend }
    }

    pub fn noop() -> Self {
        Self::new(Arc::new(NoOpDistributedCache::new()))
    }

    pub fn provider_name(&self) -> &'static str {
        self.backend.provider_name()
    }

    /// Backend health; a failing check reports unhealthy
    pub async fn is_healthy(&self) -> bool {
        self.backend.health_check().await.unwrap_or(false)
    }
}

#[async_trait]
impl CacheLeveled for DistributedCache {
    fn level(&self) -> CacheLevel {
        CacheLevel::Distributed
    }

    async fn get(&self, key: &str) -> Option<CacheValue> {
        match self.backend.get(key).await {
            Ok(value) => {
                debug!(key = key, hit = value.is_some(), provider = self.provider_name(), "Cache GET (distributed)");
                value
            }
            Err(err) => {
                warn!(key = key, error = %err, provider = self.provider_name(), "Distributed cache get failed, treating as miss");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: CacheValue, options: CacheOptions) {
        if let Err(err) = self.backend.set(key, &value, options.duration).await {
            warn!(key = key, error = %err, provider = self.provider_name(), "Distributed cache set failed, skipping");
        }
    }
}
