//! The in-memory LRU cache backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};

use rdapify_common::normalized::RdapData;

use super::{CacheConfig, CacheKey, ResponseCache};

struct Entry {
    data: Arc<RdapData>,
    expires_at: DateTime<Utc>,
    tick: u64,
}

#[derive(Default)]
struct LruInner {
    map: HashMap<CacheKey, Entry>,
    /// Recency index: lowest tick is the least recently used.
    recency: BTreeMap<u64, CacheKey>,
    tick: u64,
}

impl LruInner {
    fn touch(&mut self, key: &CacheKey) {
        self.tick += 1;
        let tick = self.tick;
        if let Some(entry) = self.map.get_mut(key) {
            self.recency.remove(&entry.tick);
            entry.tick = tick;
            self.recency.insert(tick, key.clone());
        }
    }

    fn remove(&mut self, key: &CacheKey) {
        if let Some(entry) = self.map.remove(key) {
            self.recency.remove(&entry.tick);
        }
    }

    fn evict_lru(&mut self) {
        if let Some((&tick, key)) = self.recency.iter().next() {
            let key = key.clone();
            self.recency.remove(&tick);
            self.map.remove(&key);
        }
    }
}

/// An LRU cache with a size cap. Eviction happens on insertion past the
/// cap; expiry is checked on read.
pub struct MemoryCache {
    config: CacheConfig,
    inner: Mutex<LruInner>,
}

impl MemoryCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(LruInner::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// All live entries with their expiry, for snapshotting.
    pub(crate) fn entries(&self) -> Vec<(CacheKey, Arc<RdapData>, DateTime<Utc>)> {
        let inner = self.lock();
        let now = Utc::now();
        inner
            .map
            .iter()
            .filter(|(_k, e)| e.expires_at > now)
            .map(|(k, e)| (k.clone(), e.data.clone(), e.expires_at))
            .collect()
    }

    /// Inserts with an absolute expiry, used when loading a snapshot.
    pub(crate) fn set_with_expiry(
        &self,
        key: CacheKey,
        data: Arc<RdapData>,
        expires_at: DateTime<Utc>,
    ) {
        let mut inner = self.lock();
        inner.tick += 1;
        let tick = inner.tick;
        inner.remove(&key);
        inner.recency.insert(tick, key.clone());
        inner.map.insert(
            key,
            Entry {
                data,
                expires_at,
                tick,
            },
        );
        while inner.map.len() > self.config.max_size {
            inner.evict_lru();
        }
    }
}

#[async_trait::async_trait]
impl ResponseCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Option<Arc<RdapData>> {
        let mut inner = self.lock();
        let expired = match inner.map.get(key) {
            Some(entry) => entry.expires_at <= Utc::now(),
            None => return None,
        };
        if expired {
            inner.remove(key);
            return None;
        }
        inner.touch(key);
        inner.map.get(key).map(|entry| entry.data.clone())
    }

    fn set(&self, key: CacheKey, data: Arc<RdapData>, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or_else(|| self.config.ttl_for(key.class));
        let expires_at = Utc::now()
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_e| chrono::Duration::hours(1));
        self.set_with_expiry(key, data, expires_at);
    }

    fn len(&self) -> usize {
        self.lock().map.len()
    }

    fn clear(&self) {
        let mut inner = self.lock();
        inner.map.clear();
        inner.recency.clear();
    }
}
