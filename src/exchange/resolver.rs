//! Currency conversion through the cache, the rate store and the external feed.
//!
//! Resolution order for `(from, to, at)`:
//!
//! 1. SERVER cache under `from-to-YYYY-MM-DD`
//! 2. Rate store, exact date match
//! 3. External feed for the date; on a 404 for a past date, one retry for
//!    today (logged, never persisted under the original date)
//!
//! A freshly fetched rate is persisted first and cached second, so a failure
//! in between leaves nothing behind and the next call retries.

use chrono::{DateTime, NaiveDate, Utc};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::feed::RateFeed;
use super::rate::{Rate, RateSet};
use super::store::RateStore;
use crate::cache::{CacheFabric, CacheLeveledExt, CacheOptions};
use crate::clock::{date_to_midnight, Clock, SystemClock};
use crate::constants::RATE_CACHE_TTL;
use crate::context::RequestContext;
use crate::error::{SubtrackError, SubtrackResult};
use crate::money::{Amount, CurrencyUnit};

/// SERVER cache key for a rate
pub fn rate_cache_key(from: CurrencyUnit, to: CurrencyUnit, date: NaiveDate) -> String {
    format!("{from}-{to}-{}", date.format("%Y-%m-%d"))
}

/// Where a resolved rate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RateOrigin {
    Cache,
    Store,
    Feed,
    /// Today's feed data standing in for a past date
    FeedFallback,
}

/// Stateless currency converter; all state lives in the cache and the store
#[derive(Clone)]
pub struct ExchangeResolver {
    cache: Arc<CacheFabric>,
    store: Arc<dyn RateStore>,
    feed: Arc<dyn RateFeed>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ExchangeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeResolver")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl ExchangeResolver {
    pub fn new(
        cache: Arc<CacheFabric>,
        store: Arc<dyn RateStore>,
        feed: Arc<dyn RateFeed>,
    ) -> Self {
        Self::with_clock(cache, store, feed, Arc::new(SystemClock))
    }

    pub fn with_clock(
        cache: Arc<CacheFabric>,
        store: Arc<dyn RateStore>,
        feed: Arc<dyn RateFeed>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cache,
            store,
            feed,
            clock,
        }
    }

    /// Convert `amount` into `target` at today's rate
    pub async fn to_currency(
        &self,
        ctx: &RequestContext,
        amount: &Amount,
        target: CurrencyUnit,
    ) -> SubtrackResult<Amount> {
        self.to_currency_at(ctx, amount, target, self.clock.now())
            .await
    }

    /// Convert `amount` into `target` at the rate of `at`'s UTC date.
    ///
    /// The input is never modified. Same-currency conversions bypass the
    /// cache and the store entirely.
    pub async fn to_currency_at(
        &self,
        ctx: &RequestContext,
        amount: &Amount,
        target: CurrencyUnit,
        at: DateTime<Utc>,
    ) -> SubtrackResult<Amount> {
        if !amount.is_valid() {
            return Err(SubtrackError::InvalidAmount);
        }
        if amount.currency == target {
            return Ok(Amount {
                source: None,
                ..amount.clone()
            });
        }

        let rate = self.rate(ctx, amount.currency, target, at.date_naive()).await?;
        Ok(amount.converted(rate, target))
    }

    /// Convert every amount, failing on the first error
    pub async fn convert_all(
        &self,
        ctx: &RequestContext,
        amounts: &[Amount],
        target: CurrencyUnit,
    ) -> SubtrackResult<Vec<Amount>> {
        try_join_all(
            amounts
                .iter()
                .map(|amount| self.to_currency(ctx, amount, target)),
        )
        .await
    }

    /// Stored rates for a date, each paired with its inverse
    pub async fn rates_for_date(
        &self,
        ctx: &RequestContext,
        at: DateTime<Utc>,
    ) -> SubtrackResult<RateSet> {
        let rates = ctx.run(self.store.get_rates_by_date(at)).await?;
        Ok(rates.with_reverse())
    }

    /// Resolve the factor converting one `from` into `to` on `date`
    pub async fn rate(
        &self,
        ctx: &RequestContext,
        from: CurrencyUnit,
        to: CurrencyUnit,
        date: NaiveDate,
    ) -> SubtrackResult<f64> {
        ctx.ensure_active()?;
        if from == to {
            return Ok(1.0);
        }
        let key = rate_cache_key(from, to, date);

        let (rate, origin) = match self.cached_rate(&key).await {
            Some(rate) => (rate, RateOrigin::Cache),
            None => self.load(ctx, from, to, date).await?,
        };

        if rate == 0.0 {
            return Err(SubtrackError::MissingRate { from, to, date });
        }

        ctx.ensure_active()?;
        if origin == RateOrigin::Feed {
            let now = self.clock.now();
            let record = Rate::new(from, to, date_to_midnight(date), rate, now);
            ctx.run(self.store.save(std::slice::from_ref(&record))).await?;
            info!(
                rate_id = %record.id,
                from = %from,
                to = %to,
                date = %date,
                exchange_rate = rate,
                "Persisted exchange rate from feed"
            );
        }

        ctx.ensure_active()?;
        // Re-set on a cache hit too, which extends the entry's lifetime
        self.cache
            .server()
            .set_as(&key, &rate, CacheOptions::with_duration(RATE_CACHE_TTL))
            .await;

        debug!(from = %from, to = %to, date = %date, origin = ?origin, exchange_rate = rate, "Resolved exchange rate");
        Ok(rate)
    }

    async fn cached_rate(&self, key: &str) -> Option<f64> {
        self.cache
            .server()
            .get_as::<f64>(key)
            .await
            .filter(|rate| *rate != 0.0)
    }

    async fn load(
        &self,
        ctx: &RequestContext,
        from: CurrencyUnit,
        to: CurrencyUnit,
        date: NaiveDate,
    ) -> SubtrackResult<(f64, RateOrigin)> {
        let at = date_to_midnight(date);
        if let Some(stored) = ctx.run(self.store.get_rate_at(from, to, at)).await? {
            if stored.exchange_rate != 0.0 {
                return Ok((stored.exchange_rate, RateOrigin::Store));
            }
        }

        if let Some(quote) = ctx.run(self.feed.fetch(date)).await? {
            let rate = quote
                .rate(from, to)
                .ok_or(SubtrackError::MissingRate { from, to, date })?;
            return Ok((rate, RateOrigin::Feed));
        }

        let today = self.clock.today();
        if date == today {
            return Err(SubtrackError::MissingRate { from, to, date });
        }

        warn!(
            from = %from,
            to = %to,
            date = %date,
            fallback_date = %today,
            "Rate feed has no data for date, falling back to today's rate"
        );

        match ctx.run(self.feed.fetch(today)).await? {
            Some(quote) => {
                let rate = quote
                    .rate(from, to)
                    .ok_or(SubtrackError::MissingRate { from, to, date })?;
                Ok((rate, RateOrigin::FeedFallback))
            }
            None => Err(SubtrackError::MissingRate { from, to, date }),
        }
    }
}
