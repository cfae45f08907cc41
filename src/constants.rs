//! # System Constants
//!
//! Fixed values shared by the cache fabric, the exchange resolver and the
//! entitlement engine.

use std::time::Duration;

/// Lifetime of a resolved exchange rate in the SERVER cache
pub const RATE_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default bound on a single external rate feed request
pub const DEFAULT_FEED_TIMEOUT: Duration = Duration::from_secs(10);

/// Base currency of the external rate feed
pub const FEED_BASE_CURRENCY: &str = "USD";

/// Prefix of REQUEST cache keys holding resolved entitlements
pub const ENTITLEMENT_CACHE_PREFIX: &str = "entitlement";

/// Feature identifiers used by the standard plan catalog
pub mod features {
    pub const ACTIVE_SUBSCRIPTIONS: &str = "active_subs";
    pub const CUSTOM_PROVIDERS: &str = "custom_providers";
    pub const CUSTOM_PROVIDERS_COUNT: &str = "custom_providers_count";
    pub const CUSTOM_LABELS: &str = "custom_labels";
    pub const CUSTOM_LABELS_COUNT: &str = "custom_labels_count";
    pub const FAMILY_MEMBERS_COUNT: &str = "family_members_count";
    pub const CURRENCY_CONVERSION: &str = "currency_conversion";
}

/// Plan identifiers used by the standard plan catalog
pub mod plans {
    pub const FREE: &str = "free";
    pub const PREMIUM: &str = "premium";
}
