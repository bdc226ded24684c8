use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::FixedOffset;
use tally::{
    day::{DEFAULT_UTC_OFFSET_MINUTES, reference_zone},
    settings::{read_secret, try_load},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Redis,
    Memory,
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(Backend::Redis),
            "memory" => Ok(Backend::Memory),
            other => bail!("unknown backend {other:?}, expected redis or memory"),
        }
    }
}

pub struct Config {
    pub port: u16,
    pub backend: Backend,
    pub redis_url: String,
    pub access_token: String,
    pub zone: FixedOffset,
}

impl Config {
    pub fn load() -> Result<Self> {
        let offset_minutes: i32 = try_load(
            "DAY_UTC_OFFSET_MINUTES",
            &DEFAULT_UTC_OFFSET_MINUTES.to_string(),
        )?;
        let zone = reference_zone(offset_minutes)
            .with_context(|| format!("DAY_UTC_OFFSET_MINUTES {offset_minutes} is out of range"))?;

        Ok(Self {
            port: try_load("RUST_PORT", "4000")?,
            backend: try_load("DAL_BACKEND", "redis")?,
            redis_url: try_load("REDIS_URL", "redis://redis:6379")?,
            access_token: read_secret("DAL_ACCESS_TOKEN")?,
            zone,
        })
    }
}
