//! # Backing Store
//!
//! Durable side of the counter. The API server only ever talks to it through
//! [`BackingStore`], so the buffered counter and the config cache can run on
//! top of the DAL over HTTP ([`RemoteStore`](crate::RemoteStore)), Redis inside
//! the DAL, or an in-process [`MemoryStore`](crate::MemoryStore).
//!
//! ## Contract
//!
//! - `increment_counter` is atomic and owns the day rollover: when the calendar
//!   day of `lastUpdate` differs from today, the daily amount restarts at the
//!   incremented amount instead of accumulating
//! - `increment_counter` answers with the post-add state, which is authoritative
//! - `read_config` answers `None` for a missing key, errors are reserved for I/O
use std::collections::HashMap;

use async_trait::async_trait;

use crate::{error::StoreError, models::CounterSnapshot};

#[async_trait]
pub trait BackingStore: Send + Sync {
    async fn read_counter(&self) -> Result<CounterSnapshot, StoreError>;

    async fn increment_counter(&self, amount: u64) -> Result<CounterSnapshot, StoreError>;

    async fn read_config(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn write_config(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn read_all_configs(&self) -> Result<HashMap<String, String>, StoreError>;
}
