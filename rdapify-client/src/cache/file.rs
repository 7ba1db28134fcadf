//! The file-persistent cache backend.
//!
//! Entries live in a memory LRU exactly like the memory backend; in
//! addition the whole cache is snapshotted to one JSON document at a
//! configured interval and on graceful shutdown, and loaded back on
//! start. Snapshot writes go to a temporary file first and are renamed
//! into place.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use rdapify_common::normalized::{ObjectClass, RdapData};

use super::{CacheConfig, CacheKey, MemoryCache, ResponseCache};
use crate::RdapClientError;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    version: u32,
    created_at: DateTime<Utc>,
    entries: Vec<SnapshotEntry>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SnapshotEntry {
    key: (ObjectClass, String),
    ttl_epoch_ms: i64,
    payload: RdapData,
}

/// A cache that snapshots to disk.
pub struct FileCache {
    memory: MemoryCache,
    path: PathBuf,
}

impl FileCache {
    /// Creates the cache, loading an existing snapshot when one is
    /// present. A corrupt or version-mismatched snapshot is discarded
    /// and the cache starts empty.
    pub fn new(config: CacheConfig, path: PathBuf) -> Self {
        let cache = Self {
            memory: MemoryCache::new(config),
            path,
        };
        cache.load();
        cache
    }

    fn load(&self) {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(_e) => return,
        };
        let snapshot: Snapshot = match serde_json::from_slice(&bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "discarding corrupt cache snapshot");
                return;
            }
        };
        if snapshot.version != SNAPSHOT_VERSION {
            warn!(
                path = %self.path.display(),
                version = snapshot.version,
                "discarding cache snapshot with unsupported version"
            );
            return;
        }
        let now = Utc::now();
        let mut loaded = 0usize;
        for entry in snapshot.entries {
            let expires_at = match Utc.timestamp_millis_opt(entry.ttl_epoch_ms).single() {
                Some(ts) => ts,
                None => continue,
            };
            if expires_at <= now {
                continue;
            }
            let (class, key) = entry.key;
            self.memory
                .set_with_expiry(CacheKey::new(class, key), Arc::new(entry.payload), expires_at);
            loaded += 1;
        }
        debug!(path = %self.path.display(), loaded, "cache snapshot loaded");
    }
}

#[async_trait::async_trait]
impl ResponseCache for FileCache {
    fn get(&self, key: &CacheKey) -> Option<Arc<RdapData>> {
        self.memory.get(key)
    }

    fn set(&self, key: CacheKey, data: Arc<RdapData>, ttl: Option<Duration>) {
        self.memory.set(key, data, ttl);
    }

    fn len(&self) -> usize {
        self.memory.len()
    }

    fn clear(&self) {
        self.memory.clear();
    }

    async fn persist(&self) -> Result<(), RdapClientError> {
        let entries = self
            .memory
            .entries()
            .into_iter()
            .map(|(key, data, expires_at)| SnapshotEntry {
                key: (key.class, key.key),
                ttl_epoch_ms: expires_at.timestamp_millis(),
                payload: (*data).clone(),
            })
            .collect::<Vec<SnapshotEntry>>();
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            created_at: Utc::now(),
            entries,
        };
        let json = serde_json::to_vec(&snapshot)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| RdapClientError::Transport {
                message: format!("cannot write cache snapshot {}: {e}", tmp.display()),
            })?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| RdapClientError::Transport {
                message: format!("cannot move cache snapshot into place: {e}"),
            })?;
        debug!(path = %self.path.display(), "cache snapshot written");
        Ok(())
    }
}
