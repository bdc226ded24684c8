//! # Buffered Counter
//!
//! Clicks never touch the data layer on the request path. They land in an
//! in-memory pending delta which the sync job flushes every tick.
//!
//! ## State
//!
//! - **Snapshot**: last counter state read from the data layer, replaced wholesale
//! - **Pending**: clicks accepted since the last successful flush
//!
//! Readers see `snapshot + pending`, so every accepted click is visible right
//! away even though it is only persisted on the next flush.
//!
//! ## Flush
//!
//! 1. Capture the pending amount `n`, skip the write when it is zero
//! 2. Atomically add `n` in the data layer
//! 3. Under the snapshot lock, install the post-add state and subtract exactly `n`
//! 4. Re-read the snapshot so changes made directly in storage show up
//!
//! Clicks arriving during step 2 stay pending for the next tick. A failed add
//! leaves pending untouched, so nothing is lost, only delayed. A failed re-read
//! after a successful add still counts as a sync, the post-add state is kept.
//!
//! The data layer keeps the total as a signed 64-bit integer, so `add` refuses
//! anything that would push `snapshot + pending` past [`MAX_TOTAL`].
//!
//! ## Notes
//!
//! The daily amount shown between flushes is `snapshot.daily + pending`. That
//! is only right while the flush interval is far shorter than a day: clicks
//! buffered just before midnight are shown as today's until the next flush
//! moves them into storage, where the day rollover sorts them out.
//!
//! One counting process per data layer. Two processes would each keep their
//! own pending delta and their snapshots would race.
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use parking_lot::RwLock;
use tally::{BackingStore, CounterSnapshot, StoreError};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const MAX_TOTAL: u64 = i64::MAX as u64;

pub struct ClickCounter {
    store: Arc<dyn BackingStore>,
    snapshot: RwLock<CounterSnapshot>,
    pending: AtomicU64,
    flush_lock: Mutex<()>,
}

impl ClickCounter {
    pub fn new(store: Arc<dyn BackingStore>) -> Self {
        Self {
            store,
            snapshot: RwLock::new(CounterSnapshot::default()),
            pending: AtomicU64::new(0),
            flush_lock: Mutex::new(()),
        }
    }

    /// Buffers `amount` clicks and returns the total they bring the counter to.
    /// Returns `None` and buffers nothing when that total would pass [`MAX_TOTAL`].
    pub fn add(&self, amount: u64) -> Option<u64> {
        let snapshot = self.snapshot.read();
        let headroom = MAX_TOTAL.saturating_sub(snapshot.total);

        let previous = self
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |pending| {
                pending.checked_add(amount).filter(|&next| next <= headroom)
            })
            .ok()?;
        let pending = previous + amount;

        debug!(amount, pending, "Clicks buffered");

        Some(snapshot.total + pending)
    }

    pub fn pending(&self) -> u64 {
        self.pending.load(Ordering::Acquire)
    }

    pub fn read(&self) -> CounterSnapshot {
        let snapshot = self.snapshot.read();
        let pending = self.pending.load(Ordering::Acquire);

        let mut view = *snapshot;
        view.total = view.total.saturating_add(pending);
        view.daily.amount = view.daily.amount.saturating_add(pending);

        view
    }

    /// Replaces the snapshot with the data layer's state. On failure the
    /// previous snapshot stays in place.
    pub async fn load_snapshot(&self) -> Result<CounterSnapshot, StoreError> {
        let _guard = self.flush_lock.lock().await;

        self.refresh().await
    }

    /// One sync cycle. Returns how many clicks were persisted.
    pub async fn flush(&self) -> Result<u64, StoreError> {
        let _guard = self.flush_lock.lock().await;
        let amount = self.pending();

        if amount > 0 {
            let durable = self.store.increment_counter(amount).await?;

            {
                let mut snapshot = self.snapshot.write();
                *snapshot = durable;
                self.pending.fetch_sub(amount, Ordering::AcqRel);
            }

            info!(
                amount,
                total = durable.total,
                daily = durable.daily.amount,
                "Synced clicks to data layer"
            );

            if let Err(e) = self.refresh().await {
                warn!(error = %e, "Clicks synced but re-reading the counter failed");
            }

            return Ok(amount);
        }

        self.refresh().await?;

        Ok(0)
    }

    async fn refresh(&self) -> Result<CounterSnapshot, StoreError> {
        let fresh = self.store.read_counter().await?;
        *self.snapshot.write() = fresh;

        debug!(
            total = fresh.total,
            daily = fresh.daily.amount,
            pending = self.pending(),
            "Loaded click data from data layer"
        );

        Ok(fresh)
    }
}
