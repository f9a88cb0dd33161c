//! FX subsystem configuration.

use std::time::Duration;

use expensegrove_common::time::{constants, DurationExt};

/// Default base URL of the rates API.
pub const DEFAULT_API_URL: &str = "https://api.expensegrove.com";

/// Configuration for the exchange-rate service.
#[derive(Debug, Clone)]
pub struct FxConfig {
    /// Base URL of the rates API.
    pub api_url: String,
    /// Bearer token issued by the auth service.
    pub api_token: Option<String>,
    /// Interval between scheduled refreshes.
    pub refresh_interval: Duration,
    /// Timeout for a single HTTP request.
    pub request_timeout: Duration,
    /// Timeout for each leg of a batch conversion.
    pub leg_timeout: Duration,
    /// Buffered notices per subscriber.
    pub notice_capacity: usize,
}

impl Default for FxConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            refresh_interval: constants::refresh_interval().as_std(),
            request_timeout: constants::request_timeout().as_std(),
            leg_timeout: constants::conversion_leg_timeout().as_std(),
            notice_capacity: 32,
        }
    }
}

impl FxConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("EXCHANGE_RATES_API_URL") {
            config.api_url = url;
        }

        if let Ok(token) = std::env::var("EXCHANGE_RATES_API_TOKEN") {
            if !token.is_empty() {
                config.api_token = Some(token);
            }
        }

        if let Ok(secs) = std::env::var("RATES_REFRESH_INTERVAL_SECS") {
            if let Ok(secs) = secs.parse() {
                config.refresh_interval = Duration::from_secs(secs);
            }
        }

        if let Ok(secs) = std::env::var("RATES_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                config.request_timeout = Duration::from_secs(secs);
            }
        }

        if let Ok(ms) = std::env::var("RATES_LEG_TIMEOUT_MS") {
            if let Ok(ms) = ms.parse() {
                config.leg_timeout = Duration::from_millis(ms);
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.api_url.trim().is_empty() {
            return Err("API URL cannot be empty".to_string());
        }

        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(format!("API URL must be http(s): {}", self.api_url));
        }

        if self.refresh_interval.is_zero() {
            return Err("Refresh interval cannot be zero".to_string());
        }

        if self.request_timeout.is_zero() {
            return Err("Request timeout cannot be zero".to_string());
        }

        if self.leg_timeout.is_zero() {
            return Err("Conversion leg timeout cannot be zero".to_string());
        }

        if self.notice_capacity == 0 {
            return Err("Notice capacity cannot be zero".to_string());
        }

        Ok(())
    }
}
