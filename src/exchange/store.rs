//! Rate persistence contract and the in-process implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use super::rate::{Rate, RateSet};
use crate::clock::midnight;
use crate::error::SubtrackResult;
use crate::money::CurrencyUnit;

/// Storage of exchange rates keyed by `(from, to, date)`.
///
/// Implementations normalize `at` to UTC midnight and match dates exactly.
#[async_trait]
pub trait RateStore: Send + Sync {
    /// The rate for `from -> to` whose date equals `midnight(at)`
    async fn get_rate_at(
        &self,
        from: CurrencyUnit,
        to: CurrencyUnit,
        at: DateTime<Utc>,
    ) -> SubtrackResult<Option<Rate>>;

    /// All rates for the date of `at`
    async fn get_rates_by_date(&self, at: DateTime<Utc>) -> SubtrackResult<RateSet>;

    /// Upsert by id; a rate whose ETag is unchanged is left untouched
    async fn save(&self, rates: &[Rate]) -> SubtrackResult<()>;

    /// Most recent `updated_at` across all rates
    async fn get_latest_update_date(&self) -> SubtrackResult<Option<DateTime<Utc>>>;
}

/// Rate store held in process memory
#[derive(Debug, Default)]
pub struct InMemoryRateStore {
    rates: RwLock<HashMap<Uuid, Rate>>,
}

impl InMemoryRateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rates(rates: impl IntoIterator<Item = Rate>) -> Self {
        let store = Self::new();
        {
            let mut guard = store.rates.write();
            for rate in rates {
                guard.insert(rate.id, rate);
            }
        }
        store
    }

    /// Every stored rate ordered by date, then currency pair
    pub fn all(&self) -> Vec<Rate> {
        let mut rates: Vec<Rate> = self.rates.read().values().cloned().collect();
        rates.sort_by(|a, b| (a.date, a.from, a.to).cmp(&(b.date, b.from, b.to)));
        rates
    }

    pub fn len(&self) -> usize {
        self.rates.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.read().is_empty()
    }
}

#[async_trait]
impl RateStore for InMemoryRateStore {
    async fn get_rate_at(
        &self,
        from: CurrencyUnit,
        to: CurrencyUnit,
        at: DateTime<Utc>,
    ) -> SubtrackResult<Option<Rate>> {
        let date = midnight(at);
        let rates = self.rates.read();
        Ok(rates
            .values()
            .filter(|rate| rate.from == from && rate.to == to && rate.date == date)
            .max_by_key(|rate| rate.updated_at)
            .cloned())
    }

    async fn get_rates_by_date(&self, at: DateTime<Utc>) -> SubtrackResult<RateSet> {
        let date = midnight(at);
        let mut rates: Vec<Rate> = self
            .rates
            .read()
            .values()
            .filter(|rate| rate.date == date)
            .cloned()
            .collect();
        rates.sort_by(|a, b| (a.from, a.to).cmp(&(b.from, b.to)));
        Ok(RateSet::new(rates))
    }

    async fn save(&self, rates: &[Rate]) -> SubtrackResult<()> {
        let mut stored = self.rates.write();
        for rate in rates {
            match stored.get_mut(&rate.id) {
                Some(existing) if existing.etag() == rate.etag() => {
                    debug!(rate_id = %rate.id, "Rate unchanged, skipping write");
                }
                Some(existing) => {
                    let created_at = existing.created_at;
                    *existing = Rate {
                        created_at,
                        ..rate.clone()
                    };
                }
                None => {
                    stored.insert(rate.id, rate.clone());
                }
            }
        }
        Ok(())
    }

    async fn get_latest_update_date(&self) -> SubtrackResult<Option<DateTime<Utc>>> {
        Ok(self.rates.read().values().map(|rate| rate.updated_at).max())
    }
}
