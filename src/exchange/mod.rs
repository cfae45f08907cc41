//! # Exchange Resolution
//!
//! Converts amounts between currencies as of a date, consulting the SERVER
//! cache, then the [`RateStore`], then the external [`RateFeed`], and
//! writing newly fetched rates back to both.

pub mod feed;
pub mod postgres;
pub mod rate;
pub mod resolver;
pub mod store;

pub use feed::{FeedQuote, HttpRateFeed, RateFeed};
pub use postgres::PgRateStore;
pub use rate::{Rate, RateSet};
pub use resolver::{rate_cache_key, ExchangeResolver};
pub use store::{InMemoryRateStore, RateStore};
