#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Subtrack Core
//!
//! Core services behind the subscription tracker backend.
//!
//! ## Overview
//!
//! Three components sit between the HTTP layer and persistence:
//!
//! - **Tiered cache fabric**: REQUEST, SERVER and DISTRIBUTED key/value tiers
//!   with TTL-aware entries and read-through lookups.
//! - **Exchange resolver**: converts [`Amount`]s between currencies as of a
//!   date, backed by the cache, a [`RateStore`] and an external [`RateFeed`].
//! - **Entitlement engine**: evaluates which plan features an account may use
//!   and how much of each quota is left, honoring feature gates.
//!
//! Every operation takes a [`RequestContext`], which carries the REQUEST cache
//! and the request's cancellation token.
//!
//! ## Module Organization
//!
//! - [`cache`] - Tiered cache fabric
//! - [`exchange`] - Rates, rate stores, the rate feed and the resolver
//! - [`entitlement`] - Plan catalog, usage counters and the engine
//! - [`auth`] - Accounts and the ownership rule
//! - [`money`] - Currency units and amounts
//! - [`config`] - Environment-driven configuration
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use subtrack_core::{
//!     CacheFabric, CurrencyUnit, ExchangeResolver, HttpRateFeed, InMemoryRateStore, Amount,
//!     RequestContext, SubtrackConfig,
//! };
//!
//! # async fn example() -> subtrack_core::SubtrackResult<()> {
//! subtrack_core::logging::init_structured_logging();
//! let config = SubtrackConfig::from_env()?;
//!
//! let resolver = ExchangeResolver::new(
//!     Arc::new(CacheFabric::from_config(&config.cache)),
//!     Arc::new(InMemoryRateStore::new()),
//!     Arc::new(HttpRateFeed::new(&config.exchange)?),
//! );
//!
//! let ctx = RequestContext::new();
//! let price = Amount::new(9.99, CurrencyUnit::USD);
//! let converted = resolver.to_currency(&ctx, &price, CurrencyUnit::EUR).await?;
//! println!("{converted}");
//! # Ok(())
//! # }
//! ```

mod macros;

pub mod auth;
pub mod cache;
pub mod clock;
pub mod config;
pub mod constants;
pub mod context;
pub mod entitlement;
pub mod error;
pub mod exchange;
pub mod logging;
pub mod money;

pub use auth::{check_permission, Account, FamilyId, Owner, Role, UserId};
pub use cache::{
    CacheFabric, CacheLevel, CacheLeveled, CacheLeveledExt, CacheOptions, CacheValue,
    DistributedBackend, DistributedCache, RequestCache, ServerCache,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{CacheConfig, ExchangeConfig, SubtrackConfig};
pub use context::RequestContext;
pub use entitlement::{
    EffectiveEntitlement, EntitlementEngine, Feature, FeatureId, FeatureType, Grant,
    InMemoryUsageStore, PlanCatalog, PlanId, UsageStore,
};
pub use error::{ErrorCause, SubtrackError, SubtrackResult};
pub use exchange::{
    ExchangeResolver, HttpRateFeed, InMemoryRateStore, PgRateStore, Rate, RateFeed, RateSet,
    RateStore,
};
pub use money::{Amount, CurrencyUnit};
