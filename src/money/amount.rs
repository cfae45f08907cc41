use serde::{Deserialize, Serialize};
use std::fmt;

use super::CurrencyUnit;

/// A monetary value with its currency, a validity flag and, after a
/// conversion, the amount it was converted from.
///
/// Invalid amounts are contagious: any arithmetic touching one yields an
/// invalid result. Equality compares `value` and `currency` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Amount {
    pub value: f64,
    pub currency: CurrencyUnit,
    pub source: Option<Box<Amount>>,
    pub valid: bool,
}

impl Amount {
    pub fn new(value: f64, currency: CurrencyUnit) -> Self {
        Self {
            value,
            currency,
            source: None,
            valid: true,
        }
    }

    pub fn invalid(currency: CurrencyUnit) -> Self {
        Self {
            value: 0.0,
            currency,
            source: None,
            valid: false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Result of converting `self` into `currency` at `rate`
    pub fn converted(&self, rate: f64, currency: CurrencyUnit) -> Amount {
        Amount {
            value: self.value * rate,
            currency,
            source: Some(Box::new(self.clone())),
            valid: self.valid,
        }
    }

    /// Sum of two amounts in the same currency
    pub fn add(&self, other: &Amount) -> Amount {
        if !self.valid || !other.valid || self.currency != other.currency {
            return Amount::invalid(self.currency);
        }
        Amount::new(self.value + other.value, self.currency)
    }

    pub fn scale(&self, factor: f64) -> Amount {
        if !self.valid {
            return Amount::invalid(self.currency);
        }
        Amount::new(self.value * factor, self.currency)
    }

    /// The original, pre-conversion amount at the end of the source chain
    pub fn root_source(&self) -> &Amount {
        let mut current = self;
        while let Some(source) = current.source.as_deref() {
            current = source;
        }
        current
    }
}

impl PartialEq for Amount {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.currency == other.currency
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.valid {
            return write!(f, "invalid {}", self.currency);
        }
        write!(f, "{:.2} {}", self.value, self.currency)
    }
}
