//! Duration parsing for configuration values.
//!
//! Accepts plain seconds (`"300"`) or humantime expressions (`"500ms"`,
//! `"30s"`, `"5m"`, `"24h"`, `"1h 30m"`).

use std::time::Duration;

use humantime_serde::re::humantime;

use crate::error::{SubtrackError, SubtrackResult};

/// Parse a duration string as used by `CACHE_DEFAULT_TTL` and friends.
pub fn parse_duration(key: &str, raw: &str) -> SubtrackResult<Duration> {
    let input = raw.trim();
    if input.is_empty() {
        return Err(invalid(key, raw, "empty value"));
    }

    if let Ok(seconds) = input.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }

    humantime::parse_duration(input).map_err(|err| invalid(key, raw, &err.to_string()))
}

fn invalid(key: &str, raw: &str, reason: &str) -> SubtrackError {
    SubtrackError::Configuration(format!("invalid duration for {key}: '{raw}' ({reason})"))
}
