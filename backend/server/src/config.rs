use std::time::Duration;

use anyhow::{Result, ensure};
use tally::settings::{load_required, read_optional_secret, read_secret, try_load};
use tracing::info;

pub const DEFAULT_REAL_IP_HEADER: &str = "ar-real-ip";

pub struct Config {
    pub port: u16,
    pub dal_endpoint: String,
    pub dal_token: String,
    pub dal_timeout: Duration,
    pub admin_token: String,
    pub sync_interval: Duration,
    pub cache_clear_interval: Duration,
    pub rate_limit: u32,
    pub rate_limit_window: Duration,
    pub real_ip_header: String,
    pub cache_negative_on_error: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        let dal_token = read_secret("DAL_ACCESS_TOKEN")?;
        let admin_token = read_optional_secret("ADMIN_TOKEN")?.unwrap_or_else(|| {
            info!("ADMIN_TOKEN not set, admin routes accept DAL_ACCESS_TOKEN");
            dal_token.clone()
        });

        let config = Self {
            port: try_load("RUST_PORT", "3000")?,
            dal_endpoint: load_required("DAL_ENDPOINT")?,
            dal_token,
            dal_timeout: Duration::from_millis(try_load("DAL_TIMEOUT_MS", "2000")?),
            admin_token,
            sync_interval: Duration::from_millis(try_load("SYNC_INTERVAL_MS", "500")?),
            cache_clear_interval: Duration::from_millis(try_load("CONFIG_CACHE_CLEAR_MS", "5000")?),
            rate_limit: try_load("RATE_LIMIT", "40")?,
            rate_limit_window: Duration::from_secs(try_load("RATE_LIMIT_WINDOW_SECS", "60")?),
            real_ip_header: try_load("REAL_IP_HEADER", DEFAULT_REAL_IP_HEADER)?,
            cache_negative_on_error: try_load("CACHE_NEGATIVE_ON_ERROR", "true")?,
        };

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(!self.sync_interval.is_zero(), "SYNC_INTERVAL_MS must be positive");
        ensure!(
            !self.cache_clear_interval.is_zero(),
            "CONFIG_CACHE_CLEAR_MS must be positive"
        );
        ensure!(self.rate_limit > 0, "RATE_LIMIT must be positive");
        ensure!(
            !self.rate_limit_window.is_zero(),
            "RATE_LIMIT_WINDOW_SECS must be positive"
        );

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            dal_endpoint: "http://localhost:4000".to_string(),
            dal_token: String::new(),
            dal_timeout: Duration::from_secs(2),
            admin_token: String::new(),
            sync_interval: Duration::from_millis(500),
            cache_clear_interval: Duration::from_secs(5),
            rate_limit: 40,
            rate_limit_window: Duration::from_secs(60),
            real_ip_header: DEFAULT_REAL_IP_HEADER.to_string(),
            cache_negative_on_error: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_sync_interval_is_rejected() {
        let config = Config {
            sync_interval: Duration::ZERO,
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }
}
