//! External daily rate feed.
//!
//! The feed serves one JSON document per day at `<base>/<YYYY>/<MM>/<DD>.json`:
//!
//! ```json
//! {"from": "USD", "to": {"EUR": 0.9, "JPY": 150.0}}
//! ```
//!
//! Rates are quoted against USD. A 404 means the day has no data.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::config::ExchangeConfig;
use crate::error::{SubtrackError, SubtrackResult};
use crate::money::CurrencyUnit;

/// One day's USD-based quotes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedQuote {
    pub from: String,
    pub to: HashMap<String, f64>,
}

impl FeedQuote {
    /// Build a quote from `(code, rate)` pairs against USD
    pub fn usd<'a>(rates: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        Self {
            from: CurrencyUnit::USD.to_string(),
            to: rates
                .into_iter()
                .map(|(code, rate)| (code.to_string(), rate))
                .collect(),
        }
    }

    fn leg(&self, unit: CurrencyUnit) -> Option<f64> {
        self.to
            .get(unit.as_str())
            .copied()
            .filter(|rate| *rate != 0.0)
    }

    /// Rate converting one `from` into `to`; `None` when a needed leg is
    /// missing or zero.
    ///
    /// Cross rates go through USD as `(1 / from_leg) * to_leg`.
    pub fn rate(&self, from: CurrencyUnit, to: CurrencyUnit) -> Option<f64> {
        if from == to {
            return Some(1.0);
        }
        if from == CurrencyUnit::USD {
            return self.leg(to);
        }
        if to == CurrencyUnit::USD {
            return self.leg(from).map(|from_leg| 1.0 / from_leg);
        }
        let from_leg = self.leg(from)?;
        let to_leg = self.leg(to)?;
        Some((1.0 / from_leg) * to_leg)
    }
}

/// Source of daily quotes
#[async_trait]
pub trait RateFeed: Send + Sync {
    /// Quotes for `date`, `None` when the feed has no data for that day
    async fn fetch(&self, date: NaiveDate) -> SubtrackResult<Option<FeedQuote>>;
}

/// [`RateFeed`] over HTTP
#[derive(Clone)]
pub struct HttpRateFeed {
    client: reqwest::Client,
    base_url: String,
    config: ExchangeConfig,
}

impl fmt::Debug for HttpRateFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRateFeed")
            .field("base_url", &self.base_url)
            .field("timeout", &self.config.timeout)
            .field("token_configured", &self.config.token.is_some())
            .finish()
    }
}

impl HttpRateFeed {
    pub fn new(config: &ExchangeConfig) -> SubtrackResult<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                SubtrackError::Configuration("EXCHANGE_RATE_BASE_URL is not set".to_string())
            })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SubtrackError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            config: config.clone(),
        })
    }

    pub fn url_for(&self, date: NaiveDate) -> String {
        format!(
            "{}/{:04}/{:02}/{:02}.json",
            self.base_url,
            date.year(),
            date.month(),
            date.day()
        )
    }
}

#[async_trait]
impl RateFeed for HttpRateFeed {
    async fn fetch(&self, date: NaiveDate) -> SubtrackResult<Option<FeedQuote>> {
        let url = self.url_for(date);
        let mut request = self.client.get(&url);

        if self.config.token_allowed_for(&url) {
            if let Some(token) = &self.config.token {
                request = request.header(AUTHORIZATION, format!("token {token}"));
            }
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "Rate feed response");

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SubtrackError::http(format!(
                "unexpected status {status} from {url}"
            )));
        }

        let quote = response.json::<FeedQuote>().await?;
        Ok(Some(quote))
    }
}
