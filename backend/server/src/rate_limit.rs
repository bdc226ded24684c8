//! # Rate Limiting
//!
//! Sliding window per client identity, guarding `POST /click`.
//!
//! - `max_requests` clicks per `window` for each client
//! - Every `cleanup_interval` checks, clients with no recent requests are dropped
//! - At most `max_tracked_clients` clients are tracked, so spoofed identities
//!   cannot grow the map without bound. Past the cap the least recently active
//!   client is forgotten to make room, a newcomer is never refused
use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::AppError;

pub const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
pub const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
pub const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
    pub cleanup_interval: u64,
    pub max_tracked_clients: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 40,
            window: Duration::from_secs(60),
            cleanup_interval: 100,
            max_tracked_clients: 10_000,
        }
    }
}

/// What is left of a client's window after an accepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub limit: u32,
    pub remaining: u32,
    pub reset_secs: u64,
}

impl Quota {
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(RATELIMIT_RESET, HeaderValue::from(self.reset_secs));
    }
}

pub struct RateLimiter {
    config: RateLimitConfig,
    clients: Mutex<HashMap<String, Vec<Instant>>>,
    checks: AtomicU64,
}

fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 { secs + 1 } else { secs }
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            clients: Mutex::new(HashMap::new()),
            checks: AtomicU64::new(0),
        }
    }

    fn cutoff(&self, now: Instant) -> Instant {
        now.checked_sub(self.config.window).unwrap_or(now)
    }

    fn rejected(&self, retry_after: Duration) -> AppError {
        AppError::RateLimited {
            limit: self.config.max_requests,
            retry_after: ceil_secs(retry_after).max(1),
        }
    }

    pub fn check(&self, client: &str) -> Result<Quota, AppError> {
        let now = Instant::now();
        let cutoff = self.cutoff(now);

        let checks = self.checks.fetch_add(1, Ordering::Relaxed);
        if checks > 0 && checks % self.config.cleanup_interval.max(1) == 0 {
            debug!(checks, "Running periodic rate limiter cleanup");
            self.cleanup();
        }

        let mut clients = self.clients.lock();

        if !clients.contains_key(client) && clients.len() >= self.config.max_tracked_clients {
            clients.retain(|_, stamps| {
                stamps.retain(|&t| t > cutoff);
                !stamps.is_empty()
            });

            if clients.len() >= self.config.max_tracked_clients {
                let idle = clients
                    .iter()
                    .min_by_key(|(_, stamps)| stamps.last().copied())
                    .map(|(id, _)| id.clone());

                if let Some(idle) = idle {
                    warn!(
                        client,
                        evicted = %idle,
                        tracked = clients.len(),
                        "Tracked client limit reached, forgetting least recent client"
                    );
                    clients.remove(&idle);
                }
            }
        }

        let stamps = clients.entry(client.to_string()).or_default();
        stamps.retain(|&t| t > cutoff);

        let reset = stamps
            .first()
            .map(|&oldest| (oldest + self.config.window).saturating_duration_since(now))
            .unwrap_or(self.config.window);

        if stamps.len() >= self.config.max_requests as usize {
            warn!(client, requests = stamps.len(), "Rate limit exceeded");
            return Err(self.rejected(reset));
        }

        stamps.push(now);

        Ok(Quota {
            limit: self.config.max_requests,
            remaining: self.config.max_requests - stamps.len() as u32,
            reset_secs: ceil_secs(reset),
        })
    }

    pub fn cleanup(&self) {
        let cutoff = self.cutoff(Instant::now());

        self.clients.lock().retain(|_, stamps| {
            stamps.retain(|&t| t > cutoff);
            !stamps.is_empty()
        });
    }

    pub fn tracked_clients(&self) -> usize {
        self.clients.lock().len()
    }
}
