//! Usage counters read by the entitlement engine.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use super::feature::{FeatureId, UsageCounter};
use crate::auth::{Account, UserId};
use crate::error::SubtrackResult;

/// Source of per-account usage counters. A missing counter is `Ok(None)`.
#[async_trait]
pub trait UsageStore: Send + Sync {
    async fn get(&self, account: &Account, feature: &FeatureId)
        -> SubtrackResult<Option<UsageCounter>>;
}

/// Key for counter lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct UsageKey {
    user_id: UserId,
    feature: FeatureId,
}

impl UsageKey {
    fn new(user_id: &UserId, feature: &FeatureId) -> Self {
        Self {
            user_id: user_id.clone(),
            feature: feature.clone(),
        }
    }
}

/// Process-local usage store keyed by `(user, feature)`
#[derive(Debug, Default)]
pub struct InMemoryUsageStore {
    counters: DashMap<UsageKey, UsageCounter>,
}

impl InMemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, user_id: &UserId, feature: &FeatureId, used: i64) {
        self.counters.insert(
            UsageKey::new(user_id, feature),
            UsageCounter {
                feature: feature.clone(),
                used,
                updated_at: Utc::now(),
            },
        );
    }

    /// Add `delta` to a counter, creating it at zero first. Returns the new
    /// value.
    pub fn increment(&self, user_id: &UserId, feature: &FeatureId, delta: i64) -> i64 {
        let mut counter = self
            .counters
            .entry(UsageKey::new(user_id, feature))
            .or_insert_with(|| UsageCounter {
                feature: feature.clone(),
                used: 0,
                updated_at: Utc::now(),
            });
        counter.used += delta;
        counter.updated_at = Utc::now();
        counter.used
    }

    pub fn used(&self, user_id: &UserId, feature: &FeatureId) -> i64 {
        self.counters
            .get(&UsageKey::new(user_id, feature))
            .map_or(0, |counter| counter.used)
    }
}

#[async_trait]
impl UsageStore for InMemoryUsageStore {
    async fn get(
        &self,
        account: &Account,
        feature: &FeatureId,
    ) -> SubtrackResult<Option<UsageCounter>> {
        Ok(self
            .counters
            .get(&UsageKey::new(&account.user_id, feature))
            .map(|counter| counter.value().clone()))
    }
}
