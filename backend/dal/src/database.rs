//! # Redis
//!
//! RAM database behind the DAL.
//!
//! Core purpose is to hold the click counter and the config entries, and to
//! apply click increments atomically together with the daily rollover.
//!
//! ## Implementation
//!
//! - Redis hash `tally:counter`: `total`, `daily_amount`, `daily_day`, `last_update`
//! - Redis hash `tally:configs`: config key to value
//! - Increments run as one Lua script, Redis executes scripts atomically, so the
//!   "is it still the same day" check and the add cannot interleave with another add
//! - `daily_day` is the calendar day of `last_update` in the reference zone,
//!   computed by the caller and compared inside the script
use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use chrono::FixedOffset;
use redis::{
    AsyncCommands, Client, RedisError, Script,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use tally::{
    BackingStore, CounterSnapshot, StoreError,
    day::{day_key, now_millis},
};
use tracing::info;

pub const COUNTER_KEY: &str = "tally:counter";
pub const CONFIGS_KEY: &str = "tally:configs";

pub const DEFAULT_CONFIGS: [(&str, &str); 2] = [
    ("support", "https://t.me/amirparsab90"),
    (
        "servicestatus",
        "https://uptimekuma.afrachin.ir/status/salavat-madrese",
    ),
];

// ARGV[1] reaches HINCRBY as the raw decimal string, Lua numbers are doubles
const INCREMENT_SCRIPT: &str = r"
local total = redis.call('HINCRBY', KEYS[1], 'total', ARGV[1])
local daily
if redis.call('HGET', KEYS[1], 'daily_day') == ARGV[2] then
    daily = redis.call('HINCRBY', KEYS[1], 'daily_amount', ARGV[1])
else
    redis.call('HSET', KEYS[1], 'daily_amount', ARGV[1])
    daily = ARGV[1]
end
redis.call('HSET', KEYS[1], 'daily_day', ARGV[2], 'last_update', ARGV[3])
return { total, daily, ARGV[3] }
";

fn backend(e: RedisError) -> StoreError {
    StoreError::Backend(Box::new(e))
}

pub async fn init_redis(redis_url: &str) -> Result<ConnectionManager, RedisError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(500));

    let client = Client::open(redis_url)?;

    client.get_connection_manager_with_config(config).await
}

pub struct RedisStore {
    connection: ConnectionManager,
    increment: Script,
    zone: FixedOffset,
}

impl RedisStore {
    pub async fn connect(redis_url: &str, zone: FixedOffset) -> Result<Self, RedisError> {
        let connection = init_redis(redis_url).await?;

        Ok(Self {
            connection,
            increment: Script::new(INCREMENT_SCRIPT),
            zone,
        })
    }

    /// Creates the counter fields and default configs when they are missing.
    pub async fn initialize(&self) -> Result<(), RedisError> {
        let mut connection = self.connection.clone();

        for field in ["total", "daily_amount", "last_update"] {
            let _: bool = connection.hset_nx(COUNTER_KEY, field, 0).await?;
        }

        for (key, value) in DEFAULT_CONFIGS {
            let created: bool = connection.hset_nx(CONFIGS_KEY, key, value).await?;
            if created {
                info!(key, "Seeded default config");
            }
        }

        Ok(())
    }

    async fn increment_at(&self, amount: u64, now: i64) -> Result<CounterSnapshot, StoreError> {
        let mut connection = self.connection.clone();

        let (total, daily, last_update): (u64, u64, i64) = self
            .increment
            .key(COUNTER_KEY)
            .arg(amount)
            .arg(day_key(now, self.zone))
            .arg(now)
            .invoke_async(&mut connection)
            .await
            .map_err(backend)?;

        Ok(CounterSnapshot::new(total, daily, last_update))
    }
}

#[async_trait]
impl BackingStore for RedisStore {
    async fn read_counter(&self) -> Result<CounterSnapshot, StoreError> {
        let mut connection = self.connection.clone();

        let (total, daily, last_update): (Option<u64>, Option<u64>, Option<i64>) =
            redis::cmd("HMGET")
                .arg(COUNTER_KEY)
                .arg("total")
                .arg("daily_amount")
                .arg("last_update")
                .query_async(&mut connection)
                .await
                .map_err(backend)?;

        Ok(CounterSnapshot::new(
            total.unwrap_or_default(),
            daily.unwrap_or_default(),
            last_update.unwrap_or_default(),
        ))
    }

    async fn increment_counter(&self, amount: u64) -> Result<CounterSnapshot, StoreError> {
        self.increment_at(amount, now_millis()).await
    }

    async fn read_config(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut connection = self.connection.clone();

        connection.hget(CONFIGS_KEY, key).await.map_err(backend)
    }

    async fn write_config(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();

        let _: () = connection
            .hset(CONFIGS_KEY, key, value)
            .await
            .map_err(backend)?;

        Ok(())
    }

    async fn read_all_configs(&self) -> Result<HashMap<String, String>, StoreError> {
        let mut connection = self.connection.clone();

        connection.hgetall(CONFIGS_KEY).await.map_err(backend)
    }
}
