//! # Background Jobs
//!
//! Fixed-period tasks owned by the server lifecycle: the click sync and the
//! config cache clear. Both start after the initial snapshot load and stop on
//! graceful shutdown. A tick that is already running finishes before the
//! task notices cancellation.
use std::{future::Future, sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{clicks::ClickCounter, configs::ConfigCache};

pub struct PeriodicTask {
    name: &'static str,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// First run is one `period` after spawning.
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => job().await,
                }
            }
        });

        info!(
            task = name,
            period_ms = period.as_millis() as u64,
            "Started periodic task"
        );

        Self {
            name,
            cancel,
            handle,
        }
    }

    pub async fn stop(self) {
        self.cancel.cancel();

        if let Err(e) = self.handle.await {
            warn!(task = self.name, error = %e, "Periodic task ended abnormally");
        }

        info!(task = self.name, "Stopped periodic task");
    }
}

pub fn spawn_sync_job(counter: Arc<ClickCounter>, period: Duration) -> PeriodicTask {
    PeriodicTask::spawn("click-sync", period, move || {
        let counter = Arc::clone(&counter);
        async move {
            if let Err(e) = counter.flush().await {
                error!(
                    error = %e,
                    pending = counter.pending(),
                    "Failed to sync clicks with data layer"
                );
            }
        }
    })
}

pub fn spawn_cache_clear_job(cache: Arc<ConfigCache>, period: Duration) -> PeriodicTask {
    PeriodicTask::spawn("config-cache-clear", period, move || {
        let cache = Arc::clone(&cache);
        async move { cache.clear() }
    })
}
