//! SERVER tier: process-wide cache shared by all in-flight requests.
//!
//! Backed by a `moka` cache whose per-entry expiry follows each
//! [`CacheEntry`]'s deadline, so an explicit duration, the configured default
//! TTL and "never expires" all coexist in one store. Moka drops expired
//! entries itself; a value written after expiry is never discarded.

use async_trait::async_trait;
use moka::notification::RemovalCause;
use moka::sync::Cache;
use moka::Expiry;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use super::{CacheEntry, CacheLevel, CacheLeveled, CacheOptions, CacheValue};

/// Expires each entry at its own deadline; `None` keeps it until replaced
struct EntryExpiry;

impl Expiry<String, CacheEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.remaining_ttl()
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.remaining_ttl()
    }
}

pub struct ServerCache {
    entries: Cache<String, CacheEntry>,
    default_ttl: Option<Duration>,
    expired: Arc<AtomicUsize>,
}

impl Default for ServerCache {
    fn default() -> Self {
        Self::with_default_ttl(None)
    }
}

impl fmt::Debug for ServerCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerCache")
            .field("entry_count", &self.entries.entry_count())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl ServerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache whose entries expire after `default_ttl` unless the caller
    /// passes an explicit duration
    pub fn with_default_ttl(default_ttl: Option<Duration>) -> Self {
        let expired = Arc::new(AtomicUsize::new(0));
        let listener_count = Arc::clone(&expired);
        let entries = Cache::<String, CacheEntry>::builder()
            .expire_after(EntryExpiry)
            .eviction_listener(move |key: Arc<String>, _value: CacheEntry, cause: RemovalCause| {
                if cause == RemovalCause::Expired {
                    listener_count.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, "Cache EXPIRED (server)");
                }
            })
            .build();

        Self {
            entries,
            default_ttl,
            expired,
        }
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    pub fn get_value(&self, key: &str) -> Option<CacheValue> {
        let entry = self.entry(key)?;
        debug!(key = key, "Cache HIT (server)");
        Some(entry.value)
    }

    /// Full entry including expiry, `None` when absent or expired
    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).filter(|entry| !entry.is_expired())
    }

    pub fn set_value(&self, key: &str, value: CacheValue, options: CacheOptions) {
        let ttl = options.duration.or(self.default_ttl);
        self.entries
            .insert(key.to_string(), CacheEntry::new(value, ttl));
        debug!(key = key, ttl_ms = ttl.map(|ttl| ttl.as_millis() as u64), "Cache SET (server)");
    }

    /// Run moka's pending maintenance, returning how many expired entries
    /// were evicted during the sweep
    pub fn purge_expired(&self) -> usize {
        let before = self.expired.load(Ordering::Relaxed);
        self.entries.run_pending_tasks();
        self.expired.load(Ordering::Relaxed).saturating_sub(before)
    }

    /// Live entry count after pending maintenance has run
    pub fn len(&self) -> usize {
        self.entries.run_pending_tasks();
        usize::try_from(self.entries.entry_count()).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheLeveled for ServerCache {
    fn level(&self) -> CacheLevel {
        CacheLevel::Server
    }

    async fn get(&self, key: &str) -> Option<CacheValue> {
        self.get_value(key)
    }

    async fn set(&self, key: &str, value: CacheValue, options: CacheOptions) {
        self.set_value(key, value, options);
    }
}
