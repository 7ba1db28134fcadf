//! The response cache.
//!
//! Entries are keyed by `(object class, normalized key)` and hold the
//! pre-redaction normalized response; redaction happens on read so a
//! policy change takes effect without re-fetching. Negative results are
//! never stored.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use rdapify_common::normalized::{ObjectClass, RdapData};

use crate::RdapClientError;

#[doc(inline)]
pub use file::FileCache;
#[doc(inline)]
pub use memory::MemoryCache;

pub(crate) mod file;
pub(crate) mod memory;

/// The cache key: object class plus the canonicalized query key.
///
/// Two inputs that normalize to the same key share one entry.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub class: ObjectClass,
    pub key: String,
}

impl CacheKey {
    pub fn new(class: ObjectClass, key: impl Into<String>) -> Self {
        Self {
            class,
            key: key.into(),
        }
    }
}

/// Which backend holds the entries.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    File,
}

/// Response cache settings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub backend: CacheBackend,
    /// Snapshot file location; required for the file backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub max_size: usize,
    pub ttl_domain_ms: u64,
    pub ttl_ip_ms: u64,
    pub ttl_asn_ms: u64,
    pub snapshot_interval_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackend::Memory,
            path: None,
            max_size: 1_000,
            ttl_domain_ms: 3_600_000,
            ttl_ip_ms: 1_800_000,
            ttl_asn_ms: 7_200_000,
            snapshot_interval_ms: 60_000,
        }
    }
}

impl CacheConfig {
    /// The default TTL for an object class.
    pub fn ttl_for(&self, class: ObjectClass) -> Duration {
        let ms = match class {
            ObjectClass::Domain => self.ttl_domain_ms,
            ObjectClass::IpNetwork => self.ttl_ip_ms,
            ObjectClass::Autnum => self.ttl_asn_ms,
        };
        Duration::from_millis(ms)
    }
}

/// Defines a thing that caches normalized responses.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Looks a key up, bumping its recency. Expired entries answer as
    /// absent.
    fn get(&self, key: &CacheKey) -> Option<Arc<RdapData>>;

    /// Inserts an entry with the class default TTL, or `ttl` when given.
    fn set(&self, key: CacheKey, data: Arc<RdapData>, ttl: Option<Duration>);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&self);

    /// Writes the cache to stable storage, where the backend has any.
    async fn persist(&self) -> Result<(), RdapClientError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use rdapify_common::normalized::ObjectClass;

    use super::{CacheConfig, CacheKey};

    #[test]
    fn GIVEN_same_normalized_key_WHEN_compared_THEN_equal() {
        // GIVEN
        let a = CacheKey::new(ObjectClass::Domain, "example.com");
        let b = CacheKey::new(ObjectClass::Domain, "example.com");

        // WHEN / THEN
        assert_eq!(a, b);
    }

    #[test]
    fn GIVEN_default_config_WHEN_ttl_for_THEN_per_class_defaults() {
        // GIVEN
        let config = CacheConfig::default();

        // WHEN / THEN
        assert_eq!(config.ttl_for(ObjectClass::Domain).as_secs(), 3_600);
        assert_eq!(config.ttl_for(ObjectClass::IpNetwork).as_secs(), 1_800);
        assert_eq!(config.ttl_for(ObjectClass::Autnum).as_secs(), 7_200);
    }

    #[test]
    fn GIVEN_unknown_key_WHEN_deserialize_config_THEN_rejected() {
        // GIVEN
        let json = r#"{"backend": "memory", "wat": true}"#;

        // WHEN
        let actual = serde_json::from_str::<CacheConfig>(json);

        // THEN
        assert!(actual.is_err());
    }
}
