/*!
 * In-memory cache backend.
 */

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;

use crate::errors::CacheError;

use super::{
    CacheEntry, CacheOptions, CacheRepository, CacheStats, Clock, Counters, SystemClock,
    estimate_bytes,
};

#[derive(Debug, Default)]
struct Store {
    entries: HashMap<String, CacheEntry>,
    total_bytes: u64,
}

impl Store {
    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let removed = self.entries.remove(key)?;
        self.total_bytes = self.total_bytes.saturating_sub(removed.size_bytes);
        Some(removed)
    }

    fn insert(&mut self, entry: CacheEntry) {
        self.total_bytes += entry.size_bytes;
        if let Some(previous) = self.entries.insert(entry.key.clone(), entry) {
            self.total_bytes = self.total_bytes.saturating_sub(previous.size_bytes);
        }
    }

    fn evict_until(&mut self, byte_limit: u64) -> usize {
        if self.total_bytes <= byte_limit {
            return 0;
        }

        let mut order: Vec<(u64, String)> = self
            .entries
            .values()
            .map(|entry| (entry.last_access_time, entry.key.clone()))
            .collect();
        order.sort();

        let mut evicted = 0;
        for (_, key) in order {
            if self.total_bytes <= byte_limit {
                break;
            }
            if self.remove(&key).is_some() {
                evicted += 1;
            }
        }
        evicted
    }
}

/// Volatile cache guarded by a single mutex
#[derive(Debug)]
pub struct MemoryCacheRepository {
    store: Mutex<Store>,
    options: CacheOptions,
    clock: Arc<dyn Clock>,
    counters: Counters,
}

impl MemoryCacheRepository {
    pub fn new(options: CacheOptions) -> Self {
        Self::with_clock(options, Arc::new(SystemClock))
    }

    pub fn with_clock(options: CacheOptions, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Mutex::new(Store::default()),
            options,
            clock,
            counters: Counters::default(),
        }
    }

    pub fn options(&self) -> CacheOptions {
        self.options
    }

    pub fn len(&self) -> usize {
        self.store.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().entries.is_empty()
    }
}

impl Default for MemoryCacheRepository {
    fn default() -> Self {
        Self::new(CacheOptions::default())
    }
}

#[async_trait]
impl CacheRepository for MemoryCacheRepository {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let now = self.clock.now_ms();
        let mut store = self.store.lock();

        let expired = match store.entries.get(key) {
            None => {
                self.counters.miss();
                debug!("Cache miss for {}", key);
                return Ok(None);
            }
            Some(entry) => self.options.is_expired(entry.meta.created_at, now),
        };

        if expired {
            store.remove(key);
            self.counters.miss();
            debug!("Cache entry {} expired", key);
            return Ok(None);
        }

        let Some(entry) = store.entries.get_mut(key) else {
            return Ok(None);
        };
        entry.meta.hit_count += 1;
        entry.last_access_time = now;
        self.counters.hit();
        debug!("Cache hit for {}", key);

        Ok(Some(entry.clone()))
    }

    async fn set(&self, mut entry: CacheEntry) -> Result<CacheEntry, CacheError> {
        let now = self.clock.now_ms();
        let mut store = self.store.lock();

        entry.last_access_time = now;
        entry.size_bytes = estimate_bytes(&entry.translated_text);
        entry.meta.created_at = store
            .entries
            .get(&entry.key)
            .map(|existing| existing.meta.created_at)
            .unwrap_or(now);

        store.insert(entry.clone());

        let evicted = store.evict_until(self.options.max_bytes);
        if evicted > 0 {
            debug!("Evicted {} cache entries to stay within {} bytes", evicted, self.options.max_bytes);
        }

        Ok(entry)
    }

    async fn evict_until(&self, byte_limit: u64) -> Result<(), CacheError> {
        let evicted = self.store.lock().evict_until(byte_limit);
        if evicted > 0 {
            debug!("Evicted {} cache entries to stay within {} bytes", evicted, byte_limit);
        }
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        let store = self.store.lock();
        Ok(CacheStats {
            entry_count: store.entries.len() as u64,
            estimated_bytes: store.total_bytes,
            hits: self.counters.hits(),
            misses: self.counters.misses(),
        })
    }

    async fn clear(&self) -> Result<u64, CacheError> {
        let mut store = self.store.lock();
        let removed = store.entries.len() as u64;
        *store = Store::default();
        debug!("Translation cache cleared");
        Ok(removed)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
