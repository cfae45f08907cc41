//! # Core Configuration
//!
//! Configuration consulted by the cache fabric and the exchange resolver.
//! Values come from the process environment through the `config` crate's
//! `Environment` source; tests feed an explicit map instead.
//!
//! ## Keys
//!
//! | Key | Meaning |
//! |---|---|
//! | `CACHE_DEFAULT_TTL` | Default TTL for SERVER cache entries set without options |
//! | `EXCHANGE_RATE_BASE_URL` | Base URL of the external rate feed |
//! | `EXCHANGE_RATE_TOKEN` | Optional feed token |
//! | `EXCHANGE_RATE_TOKEN_HOSTS` | Comma separated URL prefixes allowed to receive the token |
//! | `EXCHANGE_RATE_TIMEOUT` | Feed request timeout (default 10s) |

pub mod duration;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::constants::DEFAULT_FEED_TIMEOUT;
use crate::error::SubtrackResult;

pub use duration::parse_duration;

const KEY_CACHE_DEFAULT_TTL: &str = "cache_default_ttl";
const KEY_BASE_URL: &str = "exchange_rate_base_url";
const KEY_TOKEN: &str = "exchange_rate_token";
const KEY_TOKEN_HOSTS: &str = "exchange_rate_token_hosts";
const KEY_TIMEOUT: &str = "exchange_rate_timeout";

/// Root configuration for the core services
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SubtrackConfig {
    pub cache: CacheConfig,
    pub exchange: ExchangeConfig,
}

/// Cache fabric settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CacheConfig {
    /// TTL applied to SERVER entries stored without an explicit duration.
    /// `None` keeps such entries until overwritten.
    pub default_ttl: Option<Duration>,
}

/// External rate feed settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExchangeConfig {
    pub base_url: Option<String>,
    pub token: Option<String>,
    /// URL prefixes that may receive the token
    pub token_hosts: Vec<String>,
    pub timeout: Duration,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            token_hosts: Vec::new(),
            timeout: DEFAULT_FEED_TIMEOUT,
        }
    }
}

impl ExchangeConfig {
    /// Whether the feed token may be attached to a request for `url`.
    pub fn token_allowed_for(&self, url: &str) -> bool {
        self.token.is_some() && self.token_hosts.iter().any(|prefix| url.starts_with(prefix))
    }
}

impl SubtrackConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> SubtrackResult<Self> {
        Self::load(config::Environment::default())
    }

    /// Load configuration from an explicit key/value map (keys as in the
    /// environment, e.g. `CACHE_DEFAULT_TTL`)
    pub fn from_source(source: HashMap<String, String>) -> SubtrackResult<Self> {
        Self::load(config::Environment::default().source(Some(source)))
    }

    fn load(environment: config::Environment) -> SubtrackResult<Self> {
        let settings = config::Config::builder().add_source(environment).build()?;

        let mut config = Self::default();

        if let Some(raw) = optional_string(&settings, KEY_CACHE_DEFAULT_TTL)? {
            config.cache.default_ttl = Some(parse_duration("CACHE_DEFAULT_TTL", &raw)?);
        }

        config.exchange.base_url = optional_string(&settings, KEY_BASE_URL)?
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        config.exchange.token =
            optional_string(&settings, KEY_TOKEN)?.filter(|token| !token.is_empty());

        if let Some(hosts) = optional_string(&settings, KEY_TOKEN_HOSTS)? {
            config.exchange.token_hosts = hosts
                .split(',')
                .map(str::trim)
                .filter(|host| !host.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(raw) = optional_string(&settings, KEY_TIMEOUT)? {
            config.exchange.timeout = parse_duration("EXCHANGE_RATE_TIMEOUT", &raw)?;
        }

        tracing::debug!(
            default_ttl = ?config.cache.default_ttl,
            feed_configured = config.exchange.base_url.is_some(),
            token_configured = config.exchange.token.is_some(),
            timeout_ms = config.exchange.timeout.as_millis() as u64,
            "Configuration loaded"
        );

        Ok(config)
    }
}

fn optional_string(settings: &config::Config, key: &str) -> SubtrackResult<Option<String>> {
    match settings.get_string(key) {
        Ok(value) => Ok(Some(value)),
        Err(config::ConfigError::NotFound(_)) => Ok(None),
        Err(err) => Err(err.into()),
    }
}
