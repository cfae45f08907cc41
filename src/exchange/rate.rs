//! Exchange rates and query result sets.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::clock::midnight;
use crate::money::CurrencyUnit;

/// A conversion factor for one `(from, to, date)` triple.
///
/// `date` is always UTC midnight. Identity is `id`; [`Rate::etag`] captures
/// the semantically significant fields for change detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    pub id: Uuid,
    pub from: CurrencyUnit,
    pub to: CurrencyUnit,
    pub date: DateTime<Utc>,
    pub exchange_rate: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Rate {
    /// New rate with a time-ordered id, stamped at `now`
    pub fn new(
        from: CurrencyUnit,
        to: CurrencyUnit,
        at: DateTime<Utc>,
        exchange_rate: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            from,
            to,
            date: midnight(at),
            exchange_rate,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn day(&self) -> NaiveDate {
        self.date.date_naive()
    }

    /// Stable hash of `(from, to, date, exchange_rate)`
    pub fn etag(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.from.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(self.to.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(self.day().format("%Y-%m-%d").to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(self.exchange_rate.to_bits().to_be_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// The `to -> from` counterpart: fresh id, inverted rate, same timestamps
    pub fn reversed(&self) -> Rate {
        Rate {
            id: Uuid::now_v7(),
            from: self.to,
            to: self.from,
            date: self.date,
            exchange_rate: 1.0 / self.exchange_rate,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Ordered rates returned by a store query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateSet {
    rates: Vec<Rate>,
}

impl RateSet {
    pub fn new(rates: Vec<Rate>) -> Self {
        Self { rates }
    }

    /// First rate converting `from` into `to`
    pub fn get(&self, from: CurrencyUnit, to: CurrencyUnit) -> Option<&Rate> {
        self.rates
            .iter()
            .find(|rate| rate.from == from && rate.to == to)
    }

    /// This set followed by the reverse of every rate. Zero rates have no
    /// finite inverse and are not reversed.
    pub fn with_reverse(&self) -> RateSet {
        let reversed = self
            .rates
            .iter()
            .filter(|rate| rate.exchange_rate != 0.0)
            .map(Rate::reversed);
        RateSet::new(self.rates.iter().cloned().chain(reversed).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rate> {
        self.rates.iter()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn into_inner(self) -> Vec<Rate> {
        self.rates
    }
}

impl IntoIterator for RateSet {
    type Item = Rate;
    type IntoIter = std::vec::IntoIter<Rate>;

    fn into_iter(self) -> Self::IntoIter {
        self.rates.into_iter()
    }
}

impl FromIterator<Rate> for RateSet {
    fn from_iter<I: IntoIterator<Item = Rate>>(iter: I) -> Self {
        RateSet::new(iter.into_iter().collect())
    }
}
