//! Error types for the subscription tracker core.
//!

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;

use crate::entitlement::FeatureId;
use crate::money::CurrencyUnit;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubtrackError {
    #[error("Invalid amount")]
    InvalidAmount,
    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),
    #[error("Missing exchange rate {from} -> {to} at {date}")]
    MissingRate {
        from: CurrencyUnit,
        to: CurrencyUnit,
        date: NaiveDate,
    },
    #[error("Feature not found: {0}")]
    FeatureNotFound(FeatureId),
    #[error("Plan not found: {0}")]
    PlanNotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("HTTP error: {message}")]
    Http {
        message: String,
        #[source]
        source: Option<ErrorCause>,
    },
    #[error("Store error: {message}")]
    Store {
        message: String,
        #[source]
        source: Option<ErrorCause>,
    },
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Operation cancelled")]
    Cancelled,
}

impl SubtrackError {
    /// Status code an HTTP adapter should answer with for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            SubtrackError::InvalidAmount | SubtrackError::InvalidCurrency(_) => 400,
            SubtrackError::Unauthorized(_) => 403,
            SubtrackError::MissingRate { .. } => 502,
            SubtrackError::FeatureNotFound(_)
            | SubtrackError::PlanNotFound(_)
            | SubtrackError::Http { .. }
            | SubtrackError::Store { .. }
            | SubtrackError::Configuration(_)
            | SubtrackError::Cancelled => 500,
        }
    }

    /// Store failure with no underlying error to carry.
    pub fn store(message: impl Into<String>) -> Self {
        SubtrackError::Store {
            message: message.into(),
            source: None,
        }
    }

    /// HTTP failure with no underlying error to carry.
    pub fn http(message: impl Into<String>) -> Self {
        SubtrackError::Http {
            message: message.into(),
            source: None,
        }
    }

    /// True for errors caused by the caller's input rather than the system.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.http_status())
    }
}

/// Shared handle on the I/O error behind a `Store` or `Http` failure.
///
/// Keeps [`SubtrackError`] `Clone` while still exposing the cause through
/// [`std::error::Error::source`]. Two causes are equal when they render the
/// same message.
#[derive(Debug, Clone)]
pub struct ErrorCause(Arc<dyn std::error::Error + Send + Sync + 'static>);

impl ErrorCause {
    pub fn new<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self(Arc::new(err))
    }
}

impl fmt::Display for ErrorCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ErrorCause {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl PartialEq for ErrorCause {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.to_string() == other.0.to_string()
    }
}

impl From<sqlx::Error> for SubtrackError {
    fn from(err: sqlx::Error) -> Self {
        SubtrackError::Store {
            message: err.to_string(),
            source: Some(ErrorCause::new(err)),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for SubtrackError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        SubtrackError::Store {
            message: format!("migration failed: {err}"),
            source: Some(ErrorCause::new(err)),
        }
    }
}

impl From<reqwest::Error> for SubtrackError {
    fn from(err: reqwest::Error) -> Self {
        let message = match err.status() {
            Some(status) => format!("{status}: {err}"),
            None => err.to_string(),
        };
        SubtrackError::Http {
            message,
            source: Some(ErrorCause::new(err)),
        }
    }
}

impl From<config::ConfigError> for SubtrackError {
    fn from(err: config::ConfigError) -> Self {
        SubtrackError::Configuration(err.to_string())
    }
}

pub type SubtrackResult<T> = std::result::Result<T, SubtrackError>;
