use std::env;
use std::time::Duration;

use time::UtcOffset;

use crate::MAX_RANKED;

const API_KEY_VARS: &[&str] = &["STOCKPULSE_ALPHAVANTAGE_API_KEY", "ALPHAVANTAGE_API_KEY"];
const REMOTE_TIMEOUT_VAR: &str = "STOCKPULSE_REMOTE_TIMEOUT_MS";
const MARKET_OFFSET_VAR: &str = "STOCKPULSE_MARKET_UTC_OFFSET_HOURS";

/// Gateway settings.
///
/// A missing or blank `api_key` is not an error: the gateway skips the
/// remote tier and answers from cache or simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub api_key: Option<String>,
    /// Cache age under which a snapshot is served without a remote call.
    pub freshness_window: Duration,
    /// Rows older than this are pruned on every write cycle.
    pub retention: Duration,
    pub remote_timeout: Duration,
    /// Offset whose calendar fields drive the simulation clock.
    pub market_offset: UtcOffset,
    pub max_per_list: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            freshness_window: Duration::from_secs(5 * 60),
            retention: Duration::from_secs(24 * 60 * 60),
            remote_timeout: Duration::from_secs(10),
            market_offset: UtcOffset::from_hms(-5, 0, 0).unwrap_or(UtcOffset::UTC),
            max_per_list: MAX_RANKED,
        }
    }
}

impl GatewayConfig {
    /// Defaults overlaid with `STOCKPULSE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`GatewayConfig::from_env`] over an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        config.api_key = API_KEY_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .map(|value| value.trim().to_owned())
            .find(|value| !value.is_empty());

        if let Some(timeout_ms) = lookup(REMOTE_TIMEOUT_VAR)
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|value| *value > 0)
        {
            config.remote_timeout = Duration::from_millis(timeout_ms);
        }

        match lookup(MARKET_OFFSET_VAR).map(|value| value.trim().parse::<i8>()) {
            Some(Ok(hours)) => match UtcOffset::from_hms(hours, 0, 0) {
                Ok(offset) => config.market_offset = offset,
                Err(error) => tracing::warn!(hours, %error, "ignoring out-of-range market offset"),
            },
            Some(Err(error)) => tracing::warn!(%error, "ignoring unparsable market offset"),
            None => {}
        }

        config
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn without_api_key(mut self) -> Self {
        self.api_key = None;
        self
    }

    pub fn with_freshness_window(mut self, freshness_window: Duration) -> Self {
        self.freshness_window = freshness_window;
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_remote_timeout(mut self, remote_timeout: Duration) -> Self {
        self.remote_timeout = remote_timeout;
        self
    }

    pub fn with_market_offset(mut self, market_offset: UtcOffset) -> Self {
        self.market_offset = market_offset;
        self
    }

    /// The configured key, if it is non-blank.
    pub fn usable_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

/// Bounds for the validator's two existence checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorConfig {
    pub snapshot_timeout: Duration,
    pub overview_timeout: Duration,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            snapshot_timeout: Duration::from_secs(10),
            overview_timeout: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_match_documented_windows() {
        let config = GatewayConfig::default();
        assert_eq!(config.freshness_window, Duration::from_secs(300));
        assert_eq!(config.retention, Duration::from_secs(86_400));
        assert_eq!(config.remote_timeout, Duration::from_secs(10));
        assert_eq!(config.market_offset.whole_hours(), -5);
        assert!(config.usable_api_key().is_none());
    }

    #[test]
    fn prefixed_key_wins_and_blank_keys_are_ignored() {
        let config = GatewayConfig::from_lookup(lookup(&[
            ("STOCKPULSE_ALPHAVANTAGE_API_KEY", "  "),
            ("ALPHAVANTAGE_API_KEY", "fallback"),
        ]));
        assert_eq!(config.usable_api_key(), Some("fallback"));

        let config = GatewayConfig::from_lookup(lookup(&[
            ("STOCKPULSE_ALPHAVANTAGE_API_KEY", "primary"),
            ("ALPHAVANTAGE_API_KEY", "fallback"),
        ]));
        assert_eq!(config.usable_api_key(), Some("primary"));
    }

    #[test]
    fn timeout_and_offset_overrides() {
        let config = GatewayConfig::from_lookup(lookup(&[
            ("STOCKPULSE_REMOTE_TIMEOUT_MS", "2500"),
            ("STOCKPULSE_MARKET_UTC_OFFSET_HOURS", "0"),
        ]));
        assert_eq!(config.remote_timeout, Duration::from_millis(2_500));
        assert_eq!(config.market_offset, UtcOffset::UTC);

        let config = GatewayConfig::from_lookup(lookup(&[
            ("STOCKPULSE_REMOTE_TIMEOUT_MS", "soon"),
            ("STOCKPULSE_MARKET_UTC_OFFSET_HOURS", "99"),
        ]));
        assert_eq!(config, GatewayConfig::default());
    }
}
