//! Monetary values: ISO-4217 currency units and amounts that remember what
//! they were converted from.

pub mod amount;
pub mod currency;

pub use amount::Amount;
pub use currency::CurrencyUnit;
