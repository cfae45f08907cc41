use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{SubtrackError, SubtrackResult};

/// ISO-4217 currency code: exactly three upper-case ASCII letters.
///
/// Identity is case-sensitive; `"usd"` is rejected rather than normalized.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyUnit([u8; 3]);

impl CurrencyUnit {
    pub const USD: CurrencyUnit = CurrencyUnit(*b"USD");
    pub const EUR: CurrencyUnit = CurrencyUnit(*b"EUR");
    pub const GBP: CurrencyUnit = CurrencyUnit(*b"GBP");
    pub const JPY: CurrencyUnit = CurrencyUnit(*b"JPY");

    pub fn parse(code: &str) -> SubtrackResult<Self> {
        match code.as_bytes() {
            [a, b, c] if [a, b, c].iter().all(|byte| byte.is_ascii_uppercase()) => {
                Ok(CurrencyUnit([*a, *b, *c]))
            }
            _ => Err(SubtrackError::InvalidCurrency(code.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        // Only upper-case ASCII is ever stored
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl FromStr for CurrencyUnit {
    type Err = SubtrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CurrencyUnit {
    type Error = SubtrackError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyUnit> for String {
    fn from(unit: CurrencyUnit) -> Self {
        unit.as_str().to_string()
    }
}

impl fmt::Display for CurrencyUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for CurrencyUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CurrencyUnit({})", self.as_str())
    }
}
