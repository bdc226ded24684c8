//! # Config Cache
//!
//! Small key-value entries (support links, status page) read on every page
//! load. Lookups are memoized until the clear job wipes the whole cache, there
//! is no per-key expiry.
//!
//! - Misses are cached too, so unknown keys do not hammer the data layer
//! - Writes go to the data layer first, the cache only follows a successful write
//! - A fetch that fails is cached as "not found" until the next clear when
//!   `cache_negative_on_error` is set, otherwise it is retried on the next read
use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;
use tally::{BackingStore, StoreError};
use tracing::{debug, warn};

pub struct ConfigCache {
    store: Arc<dyn BackingStore>,
    negative_on_error: bool,
    state: RwLock<CacheState>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, Option<String>>,
    all: Option<HashMap<String, String>>,
    // Bumped by every clear and write so fetches started before them do not
    // store what they read
    generation: u64,
}

impl ConfigCache {
    pub fn new(store: Arc<dyn BackingStore>, negative_on_error: bool) -> Self {
        Self {
            store,
            negative_on_error,
            state: RwLock::new(CacheState::default()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let generation = {
            let state = self.state.read();
            if let Some(hit) = state.entries.get(key) {
                return hit.clone();
            }
            state.generation
        };

        let value = match self.store.read_config(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Failed to fetch config");
                if !self.negative_on_error {
                    return None;
                }
                None
            }
        };

        let mut state = self.state.write();
        if state.generation == generation {
            state.entries.insert(key.to_string(), value.clone());
        }

        value
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.store.write_config(key, value).await?;

        let mut state = self.state.write();
        state.generation = state.generation.wrapping_add(1);
        state
            .entries
            .insert(key.to_string(), Some(value.to_string()));
        if let Some(all) = state.all.as_mut() {
            all.insert(key.to_string(), value.to_string());
        }

        Ok(())
    }

    pub async fn get_all(&self) -> Result<HashMap<String, String>, StoreError> {
        let generation = {
            let state = self.state.read();
            if let Some(all) = &state.all {
                return Ok(all.clone());
            }
            state.generation
        };

        let all = self.store.read_all_configs().await?;

        let mut state = self.state.write();
        if state.generation == generation {
            for (key, value) in &all {
                state.entries.insert(key.clone(), Some(value.clone()));
            }
            state.all = Some(all.clone());
        }

        Ok(all)
    }

    pub fn clear(&self) {
        let mut state = self.state.write();
        state.entries.clear();
        state.all = None;
        state.generation = state.generation.wrapping_add(1);

        debug!("Cleared config cache");
    }
}

#[cfg(test)]
mod tests {
    use tally::MemoryStore;

    use super::*;
    use crate::testing::ScriptedStore;

    fn cache_on(memory: MemoryStore, negative_on_error: bool) -> (Arc<ScriptedStore>, ConfigCache) {
        let store = Arc::new(ScriptedStore::new(memory));
        let cache = ConfigCache::new(store.clone(), negative_on_error);
        (store, cache)
    }

    #[tokio::test]
    async fn hit_skips_the_store() {
        let (store, cache) = cache_on(MemoryStore::default().with_config("support", "link"), true);

        assert_eq!(cache.get("support").await.as_deref(), Some("link"));
        assert_eq!(cache.get("support").await.as_deref(), Some("link"));

        assert_eq!(store.config_reads(), 1);
    }

    #[tokio::test]
    async fn misses_are_cached() {
        let (store, cache) = cache_on(MemoryStore::default(), true);

        assert_eq!(cache.get("absent").await, None);
        assert_eq!(cache.get("absent").await, None);

        assert_eq!(store.config_reads(), 1);
    }

    #[tokio::test]
    async fn set_then_get_needs_no_read_and_clear_forces_one() {
        let (store, cache) = cache_on(MemoryStore::default(), true);

        cache.set("support", "https://t.me/x").await.unwrap();
        assert_eq!(cache.get("support").await.as_deref(), Some("https://t.me/x"));
        assert_eq!(store.config_reads(), 0);

        cache.clear();
        assert_eq!(cache.get("support").await.as_deref(), Some("https://t.me/x"));
        assert_eq!(cache.get("support").await.as_deref(), Some("https://t.me/x"));
        assert_eq!(store.config_reads(), 1);
    }

    #[tokio::test]
    async fn fetch_error_is_cached_as_not_found_when_failing_closed() {
        let (store, cache) = cache_on(MemoryStore::default().with_config("support", "link"), true);
        store.fail_config_reads(1);

        assert_eq!(cache.get("support").await, None);
        assert_eq!(cache.get("support").await, None);
        assert_eq!(store.config_reads(), 1);

        cache.clear();
        assert_eq!(cache.get("support").await.as_deref(), Some("link"));
    }

    #[tokio::test]
    async fn fetch_error_is_retried_when_not_failing_closed() {
        let (store, cache) = cache_on(MemoryStore::default().with_config("support", "link"), false);
        store.fail_config_reads(1);

        assert_eq!(cache.get("support").await, None);
        assert_eq!(cache.get("support").await.as_deref(), Some("link"));
        assert_eq!(store.config_reads(), 2);
    }

    #[tokio::test]
    async fn get_all_populates_per_key_entries() {
        let memory = MemoryStore::default()
            .with_config("support", "link")
            .with_config("servicestatus", "status");
        let (store, cache) = cache_on(memory, true);

        let all = cache.get_all().await.unwrap();
        assert_eq!(all.len(), 2);

        assert_eq!(cache.get("servicestatus").await.as_deref(), Some("status"));
        cache.get_all().await.unwrap();
        assert_eq!(store.config_reads(), 1);
    }

    #[tokio::test]
    async fn set_updates_cached_aggregate() {
        let (store, cache) = cache_on(MemoryStore::default().with_config("support", "link"), true);
        cache.get_all().await.unwrap();

        cache.set("support", "new-link").await.unwrap();

        assert_eq!(cache.get_all().await.unwrap()["support"], "new-link");
        assert_eq!(store.config_reads(), 1);
    }

    #[tokio::test]
    async fn failed_write_leaves_cache_alone() {
        struct ReadOnly(MemoryStore);

        #[async_trait::async_trait]
        impl BackingStore for ReadOnly {
            async fn read_counter(&self) -> Result<tally::CounterSnapshot, StoreError> {
                self.0.read_counter().await
            }
            async fn increment_counter(
                &self,
                amount: u64,
            ) -> Result<tally::CounterSnapshot, StoreError> {
                self.0.increment_counter(amount).await
            }
            async fn read_config(&self, key: &str) -> Result<Option<String>, StoreError> {
                self.0.read_config(key).await
            }
            async fn write_config(&self, _: &str, _: &str) -> Result<(), StoreError> {
                Err(StoreError::backend("read only"))
            }
            async fn read_all_configs(&self) -> Result<HashMap<String, String>, StoreError> {
                self.0.read_all_configs().await
            }
        }

        let cache = ConfigCache::new(
            Arc::new(ReadOnly(MemoryStore::default().with_config("support", "link"))),
            true,
        );
        assert_eq!(cache.get("support").await.as_deref(), Some("link"));

        assert!(cache.set("support", "other").await.is_err());

        assert_eq!(cache.get("support").await.as_deref(), Some("link"));
    }

    #[tokio::test]
    async fn fetch_started_before_a_write_does_not_overwrite_it() {
        let (store, cache) = cache_on(MemoryStore::default().with_config("support", "old"), true);
        let cache = Arc::new(cache);

        let gate = store.hold_config_reads();
        let reading = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get("support").await })
        };
        gate.reached().await;

        cache.set("support", "new").await.unwrap();
        gate.release();

        assert_eq!(reading.await.unwrap().as_deref(), Some("old"));
        assert_eq!(cache.get("support").await.as_deref(), Some("new"));
        assert_eq!(store.config_reads(), 1);
    }
}
