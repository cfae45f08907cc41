//! REQUEST tier: scratch space living as long as one request.
//!
//! Used from a single request's task chain, but guarded by a mutex so fan-out
//! tasks spawned by a handler can share it.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use super::{CacheEntry, CacheLevel, CacheLeveled, CacheOptions, CacheValue};

#[derive(Debug, Default)]
pub struct RequestCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl RequestCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_value(&self, key: &str) -> Option<CacheValue> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    pub fn set_value(&self, key: &str, value: CacheValue, options: CacheOptions) {
        self.entries
            .lock()
            .insert(key.to_string(), CacheEntry::new(value, options.duration));
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl CacheLeveled for RequestCache {
    fn level(&self) -> CacheLevel {
        CacheLevel::Request
    }

    async fn get(&self, key: &str) -> Option<CacheValue> {
        self.get_value(key)
    }

    async fn set(&self, key: &str, value: CacheValue, options: CacheOptions) {
        self.set_value(key, value, options);
    }
}
