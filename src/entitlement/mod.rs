//! # Entitlement Engine
//!
//! Plan-driven feature gating. A [`PlanCatalog`] declares features and what
//! each plan grants; the [`EntitlementEngine`] combines a grant with the
//! account's usage counters into an [`EffectiveEntitlement`].
//!
//! A feature may be gated by another feature: its effective `enabled` flag is
//! the AND of its own state and its gate's effective state.

pub mod catalog;
pub mod engine;
pub mod feature;
pub mod usage;

pub use catalog::{PlanCatalog, PlanCatalogBuilder};
pub use engine::{entitlement_cache_key, EntitlementEngine};
pub use feature::{
    EffectiveEntitlement, Feature, FeatureId, FeatureType, Grant, PlanEntitlement, PlanId,
    UsageCounter,
};
pub use usage::{InMemoryUsageStore, UsageStore};
