use std::collections::HashMap;

use async_trait::async_trait;
use chrono::FixedOffset;
use parking_lot::Mutex;

use crate::{
    day::{default_zone, now_millis, roll},
    error::StoreError,
    models::CounterSnapshot,
    store::BackingStore,
};

/// Process-local store. Nothing survives a restart.
pub struct MemoryStore {
    zone: FixedOffset,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    counter: CounterSnapshot,
    configs: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new(zone: FixedOffset) -> Self {
        Self {
            zone,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn with_snapshot(self, snapshot: CounterSnapshot) -> Self {
        self.inner.lock().counter = snapshot;
        self
    }

    pub fn with_config(self, key: &str, value: &str) -> Self {
        self.inner
            .lock()
            .configs
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        self.inner.lock().counter
    }

    /// Overwrites the counter the way an operator editing storage directly would.
    pub fn set_snapshot(&self, snapshot: CounterSnapshot) {
        self.inner.lock().counter = snapshot;
    }

    pub fn increment_at(&self, amount: u64, now: i64) -> CounterSnapshot {
        let mut inner = self.inner.lock();

        inner.counter.total = inner.counter.total.saturating_add(amount);
        inner.counter.daily = roll(inner.counter.daily, amount, now, self.zone);

        inner.counter
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(default_zone())
    }
}

#[async_trait]
impl BackingStore for MemoryStore {
    async fn read_counter(&self) -> Result<CounterSnapshot, StoreError> {
        Ok(self.snapshot())
    }

    async fn increment_counter(&self, amount: u64) -> Result<CounterSnapshot, StoreError> {
        Ok(self.increment_at(amount, now_millis()))
    }

    async fn read_config(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.lock().configs.get(key).cloned())
    }

    async fn write_config(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner
            .lock()
            .configs
            .insert(key.to_string(), value.to_string());

        Ok(())
    }

    async fn read_all_configs(&self) -> Result<HashMap<String, String>, StoreError> {
        Ok(self.inner.lock().configs.clone())
    }
}
