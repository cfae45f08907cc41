//! # Tiered Cache Fabric
//!
//! A key/value store layered by lifetime:
//!
//! ```text
//! CacheFabric
//!   ├── REQUEST      (RequestCache, one per RequestContext)
//!   ├── SERVER       (ServerCache, process-wide, TTL aware)
//!   └── DISTRIBUTED  (DistributedCache over a DistributedBackend, NoOp by default)
//! ```
//!
//! ## Design Decisions
//!
//! - **Best effort**: cache operations never return errors. Distributed
//!   backend failures are logged and reported as a miss.
//! - **Expiry on read**: entries carry an absolute expiry and are removed
//!   lazily by the reader that finds them expired.
//! - **Serde values**: values are `serde_json::Value` so every tier, including
//!   a distributed one, can hold the same payload.

pub mod distributed;
pub mod entry;
pub mod errors;
pub mod fabric;
pub mod request;
pub mod server;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub use distributed::{DistributedBackend, DistributedCache, NoOpDistributedCache};
pub use entry::CacheEntry;
pub use errors::{CacheError, CacheResult};
pub use fabric::CacheFabric;
pub use request::RequestCache;
pub use server::ServerCache;

/// Opaque cached value
pub type CacheValue = serde_json::Value;

/// Cache tiers, ordered from narrowest to widest visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheLevel {
    Request,
    Server,
    Distributed,
}

impl CacheLevel {
    /// Read order used by the fabric
    pub const ALL: [CacheLevel; 3] = [
        CacheLevel::Request,
        CacheLevel::Server,
        CacheLevel::Distributed,
    ];
}

impl fmt::Display for CacheLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheLevel::Request => write!(f, "REQUEST"),
            CacheLevel::Server => write!(f, "SERVER"),
            CacheLevel::Distributed => write!(f, "DISTRIBUTED"),
        }
    }
}

/// Per-call options for `set`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheOptions {
    pub duration: Option<Duration>,
}

impl CacheOptions {
    pub fn with_duration(duration: Duration) -> Self {
        Self {
            duration: Some(duration),
        }
    }
}

/// Operations available on a single cache tier
#[async_trait]
pub trait CacheLeveled: Send + Sync {
    fn level(&self) -> CacheLevel;

    /// Value stored under `key`, `None` when absent or expired
    async fn get(&self, key: &str) -> Option<CacheValue>;

    /// Store `value` unconditionally, replacing any prior entry and expiry
    async fn set(&self, key: &str, value: CacheValue, options: CacheOptions);
}

/// Typed access on top of [`CacheLeveled`]
#[async_trait]
pub trait CacheLeveledExt: CacheLeveled {
    /// Deserialize the cached value; a value of the wrong shape reads as a miss
    async fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: serde::de::DeserializeOwned + Send,
    {
        let value = self.get(key).await?;
        decode(key, value)
    }

    /// Serialize and store; values that fail to serialize are skipped
    async fn set_as<T>(&self, key: &str, value: &T, options: CacheOptions)
    where
        T: Serialize + Sync,
    {
        if let Some(value) = encode(key, value) {
            self.set(key, value, options).await;
        }
    }
}

impl<C: CacheLeveled + ?Sized> CacheLeveledExt for C {}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(key: &str, value: CacheValue) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(typed) => Some(typed),
        Err(err) => {
            tracing::debug!(key = key, error = %err, "Cached value has unexpected shape, treating as miss");
            None
        }
    }
}

pub(crate) fn encode<T: Serialize>(key: &str, value: &T) -> Option<CacheValue> {
    match serde_json::to_value(value) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(key = key, error = %err, "Failed to serialize cache value, skipping set");
            None
        }
    }
}
