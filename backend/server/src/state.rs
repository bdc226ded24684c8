use std::sync::Arc;

use tally::BackingStore;

use super::{
    clicks::ClickCounter,
    config::Config,
    configs::ConfigCache,
    rate_limit::{RateLimitConfig, RateLimiter},
};

pub struct AppState {
    pub config: Config,
    pub counter: Arc<ClickCounter>,
    pub configs: Arc<ConfigCache>,
    pub limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn BackingStore>) -> Arc<Self> {
        let counter = Arc::new(ClickCounter::new(store.clone()));
        let configs = Arc::new(ConfigCache::new(store, config.cache_negative_on_error));
        let limiter = RateLimiter::new(RateLimitConfig {
            max_requests: config.rate_limit,
            window: config.rate_limit_window,
            ..Default::default()
        });

        Arc::new(Self {
            config,
            counter,
            configs,
            limiter,
        })
    }
}
