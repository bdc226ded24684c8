//! Store double for unit tests: wraps a [`MemoryStore`], counts calls and
//! injects failures or pauses on demand.
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tally::{BackingStore, CounterSnapshot, MemoryStore, StoreError};
use tokio::sync::Notify;

#[derive(Default)]
pub struct ScriptedStore {
    memory: MemoryStore,
    reads: AtomicUsize,
    increments: AtomicUsize,
    config_reads: AtomicUsize,
    failing_reads: AtomicUsize,
    failing_increments: AtomicUsize,
    failing_config_reads: AtomicUsize,
    gate: Mutex<Option<Gate>>,
    config_gate: Mutex<Option<Gate>>,
}

#[derive(Clone, Default)]
pub struct Gate {
    reached: Arc<Notify>,
    released: Arc<Notify>,
}

impl Gate {
    pub async fn reached(&self) {
        self.reached.notified().await;
    }

    pub fn release(&self) {
        self.released.notify_one();
    }

    async fn park(&self) {
        self.reached.notify_one();
        self.released.notified().await;
    }
}

fn take_failure(counter: &AtomicUsize) -> Result<(), StoreError> {
    let failed = counter
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| left.checked_sub(1))
        .is_ok();

    if failed {
        Err(StoreError::backend("injected failure"))
    } else {
        Ok(())
    }
}

impl ScriptedStore {
    pub fn new(memory: MemoryStore) -> Self {
        Self {
            memory,
            ..Default::default()
        }
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Acquire)
    }

    /// Successful increments only.
    pub fn increments(&self) -> usize {
        self.increments.load(Ordering::Acquire)
    }

    /// Single-key and full-set config reads.
    pub fn config_reads(&self) -> usize {
        self.config_reads.load(Ordering::Acquire)
    }

    pub fn fail_reads(&self, times: usize) {
        self.failing_reads.store(times, Ordering::Release);
    }

    pub fn fail_increments(&self, times: usize) {
        self.failing_increments.store(times, Ordering::Release);
    }

    pub fn fail_config_reads(&self, times: usize) {
        self.failing_config_reads.store(times, Ordering::Release);
    }

    /// Parks the next increment until the returned gate is released.
    pub fn hold_increments(&self) -> Gate {
        let gate = Gate::default();
        *self.gate.lock() = Some(gate.clone());
        gate
    }

    /// Parks the next single-key config read after it has read the value.
    pub fn hold_config_reads(&self) -> Gate {
        let gate = Gate::default();
        *self.config_gate.lock() = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl BackingStore for ScriptedStore {
    async fn read_counter(&self) -> Result<CounterSnapshot, StoreError> {
        self.reads.fetch_add(1, Ordering::AcqRel);
        take_failure(&self.failing_reads)?;

        self.memory.read_counter().await
    }

    async fn increment_counter(&self, amount: u64) -> Result<CounterSnapshot, StoreError> {
        let gate = self.gate.lock().take();
        if let Some(gate) = gate {
            gate.park().await;
        }

        take_failure(&self.failing_increments)?;
        self.increments.fetch_add(1, Ordering::AcqRel);

        self.memory.increment_counter(amount).await
    }

    async fn read_config(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.config_reads.fetch_add(1, Ordering::AcqRel);
        take_failure(&self.failing_config_reads)?;

        let value = self.memory.read_config(key).await;
        let gate = self.config_gate.lock().take();
        if let Some(gate) = gate {
            gate.park().await;
        }

        value
    }

    async fn write_config(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.memory.write_config(key, value).await
    }

    async fn read_all_configs(&self) -> Result<HashMap<String, String>, StoreError> {
        self.config_reads.fetch_add(1, Ordering::AcqRel);
        take_failure(&self.failing_config_reads)?;

        self.memory.read_all_configs().await
    }
}
