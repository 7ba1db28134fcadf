//! Bootstrap registry storage and base URL resolution.
//!
//! Registries are downloaded once and kept until their TTL passes. A
//! lookup against a stale copy still answers from it while one
//! background refresh per registry file runs; only a cold miss fetches
//! synchronously.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use rdapify_common::{
    httpdata::HttpData,
    iana::{preferred_url, IanaRegistryType, RdapBootstrapRegistry},
};

use super::iana_request::iana_request;
use crate::http::Client;
use crate::rdap::QueryType;
use crate::{QueryContext, RdapClientError};

const DEFAULT_BOOTSTRAP_TTL_MS: u64 = 86_400_000;

/// Overrides for the published IANA registry URLs.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct BootstrapSources {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv4: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn: Option<String>,
}

/// Bootstrap settings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct BootstrapConfig {
    pub sources: BootstrapSources,
    pub ttl_ms: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            sources: BootstrapSources::default(),
            ttl_ms: DEFAULT_BOOTSTRAP_TTL_MS,
        }
    }
}

impl BootstrapConfig {
    /// The URL to fetch a registry from, honoring overrides.
    pub fn url_for(&self, registry_type: IanaRegistryType) -> String {
        let source = match registry_type {
            IanaRegistryType::RdapBootstrapDns => &self.sources.dns,
            IanaRegistryType::RdapBootstrapIpv4 => &self.sources.ipv4,
            IanaRegistryType::RdapBootstrapIpv6 => &self.sources.ipv6,
            IanaRegistryType::RdapBootstrapAsn => &self.sources.asn,
        };
        source
            .clone()
            .unwrap_or_else(|| registry_type.url().to_string())
    }
}

/// Defines a thing that stores bootstrap registries.
pub trait BootstrapStore: Send + Sync {
    /// True when a copy newer than the TTL is held.
    fn has_fresh_registry(&self, registry_type: IanaRegistryType) -> bool;

    /// True when any copy is held, fresh or stale.
    fn has_registry(&self, registry_type: IanaRegistryType) -> bool;

    /// Puts a registry into the store.
    fn put_registry(
        &self,
        registry_type: IanaRegistryType,
        registry: RdapBootstrapRegistry,
        http_data: HttpData,
    );

    fn dns_urls(&self, ldh: &str) -> Result<Vec<String>, RdapClientError>;
    fn asn_urls(&self, autnum: u32) -> Result<Vec<String>, RdapClientError>;
    fn ipv4_urls(&self, addr: std::net::Ipv4Addr) -> Result<Vec<String>, RdapClientError>;
    fn ipv6_urls(&self, addr: std::net::Ipv6Addr) -> Result<Vec<String>, RdapClientError>;
}

#[derive(Default)]
struct Slot {
    data: RwLock<Option<(RdapBootstrapRegistry, HttpData)>>,
    refreshing: AtomicBool,
    fetch_lock: tokio::sync::Mutex<()>,
}

/// A bootstrap registry store backed by memory.
///
/// Every new instance starts empty; registries are added and refreshed
/// over time by [`bootstrap_url_for`]. Keep it in the same scope as the
/// HTTP client so registries are fetched once per process, not once per
/// query.
#[derive(Default)]
pub struct MemoryBootstrapStore {
    ttl_secs: i64,
    dns: Slot,
    ipv4: Slot,
    ipv6: Slot,
    asn: Slot,
}

impl MemoryBootstrapStore {
    pub fn new(ttl_ms: u64) -> Self {
        Self {
            ttl_secs: (ttl_ms / 1_000) as i64,
            ..Self::default()
        }
    }

    fn slot(&self, registry_type: IanaRegistryType) -> &Slot {
        match registry_type {
            IanaRegistryType::RdapBootstrapDns => &self.dns,
            IanaRegistryType::RdapBootstrapIpv4 => &self.ipv4,
            IanaRegistryType::RdapBootstrapIpv6 => &self.ipv6,
            IanaRegistryType::RdapBootstrapAsn => &self.asn,
        }
    }

    fn with_registry<T>(
        &self,
        registry_type: IanaRegistryType,
        lookup: impl FnOnce(&RdapBootstrapRegistry) -> Result<T, RdapClientError>,
    ) -> Result<T, RdapClientError> {
        let data = read_slot(&self.slot(registry_type).data);
        match data.as_ref() {
            Some((registry, _http_data)) => lookup(registry),
            None => Err(RdapClientError::Bootstrap {
                message: format!("{} has not been fetched", registry_type.file_name()),
            }),
        }
    }
}

impl BootstrapStore for MemoryBootstrapStore {
    fn has_fresh_registry(&self, registry_type: IanaRegistryType) -> bool {
        let data = read_slot(&self.slot(registry_type).data);
        match data.as_ref() {
            Some((_registry, http_data)) => !http_data.is_expired(self.ttl_secs),
            None => false,
        }
    }

    fn has_registry(&self, registry_type: IanaRegistryType) -> bool {
        read_slot(&self.slot(registry_type).data).is_some()
    }

    fn put_registry(
        &self,
        registry_type: IanaRegistryType,
        registry: RdapBootstrapRegistry,
        http_data: HttpData,
    ) {
        let mut data = self
            .slot(registry_type)
            .data
            .write()
            .unwrap_or_else(|e| e.into_inner());
        *data = Some((registry, http_data));
    }

    fn dns_urls(&self, ldh: &str) -> Result<Vec<String>, RdapClientError> {
        self.with_registry(IanaRegistryType::RdapBootstrapDns, |r| {
            Ok(r.dns_urls(ldh)?)
        })
    }

    fn asn_urls(&self, autnum: u32) -> Result<Vec<String>, RdapClientError> {
        self.with_registry(IanaRegistryType::RdapBootstrapAsn, |r| {
            Ok(r.asn_urls(autnum)?)
        })
    }

    fn ipv4_urls(&self, addr: std::net::Ipv4Addr) -> Result<Vec<String>, RdapClientError> {
        self.with_registry(IanaRegistryType::RdapBootstrapIpv4, |r| {
            Ok(r.ipv4_urls(addr)?)
        })
    }

    fn ipv6_urls(&self, addr: std::net::Ipv6Addr) -> Result<Vec<String>, RdapClientError> {
        self.with_registry(IanaRegistryType::RdapBootstrapIpv6, |r| {
            Ok(r.ipv6_urls(addr)?)
        })
    }
}

fn read_slot(
    data: &RwLock<Option<(RdapBootstrapRegistry, HttpData)>>,
) -> std::sync::RwLockReadGuard<'_, Option<(RdapBootstrapRegistry, HttpData)>> {
    data.read().unwrap_or_else(|e| e.into_inner())
}

/// Resolves the RDAP base URL for a query, fetching or refreshing the
/// registry file as needed.
///
/// A cold miss fetches synchronously under a per-registry lock so
/// concurrent callers trigger one download. A stale copy answers
/// immediately while one background refresh runs; `background_cancel`
/// scopes that refresh to the client's lifetime rather than the query's.
pub async fn bootstrap_url_for(
    query: &QueryType,
    http: &Arc<Client>,
    store: &Arc<MemoryBootstrapStore>,
    config: &BootstrapConfig,
    ctx: &QueryContext,
    background_cancel: CancellationToken,
) -> Result<String, RdapClientError> {
    let registry_type = query.registry_type();
    ensure_registry(registry_type, http, store, config, ctx, background_cancel).await?;
    let urls = match query {
        QueryType::Domain(domain) => store.dns_urls(domain.to_ascii())?,
        QueryType::Ip(ip) => match ip.addr() {
            std::net::IpAddr::V4(addr) => store.ipv4_urls(addr)?,
            std::net::IpAddr::V6(addr) => store.ipv6_urls(addr)?,
        },
        QueryType::Autnum(asn) => store.asn_urls(asn.value())?,
    };
    Ok(preferred_url(urls, &query.normalized_key())?)
}

async fn ensure_registry(
    registry_type: IanaRegistryType,
    http: &Arc<Client>,
    store: &Arc<MemoryBootstrapStore>,
    config: &BootstrapConfig,
    ctx: &QueryContext,
    background_cancel: CancellationToken,
) -> Result<(), RdapClientError> {
    if store.has_fresh_registry(registry_type) {
        return Ok(());
    }
    if store.has_registry(registry_type) {
        // serve stale, refresh behind the caller's back
        let slot = store.slot(registry_type);
        if slot
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let http = http.clone();
            let store = store.clone();
            let url = config.url_for(registry_type);
            tokio::spawn(async move {
                let refresh_ctx = QueryContext {
                    cancel: background_cancel,
                    ..QueryContext::default()
                };
                match iana_request(registry_type, &url, &http, &refresh_ctx).await {
                    Ok(response) => {
                        debug!(file = registry_type.file_name(), "bootstrap registry refreshed");
                        store.put_registry(registry_type, response.registry, response.http_data);
                    }
                    Err(err) => {
                        warn!(
                            file = registry_type.file_name(),
                            error = %err,
                            "bootstrap refresh failed; serving stale copy"
                        );
                    }
                }
                store
                    .slot(registry_type)
                    .refreshing
                    .store(false, Ordering::Release);
            });
        }
        return Ok(());
    }
    // cold miss: fetch synchronously, one flight per registry file
    let slot = store.slot(registry_type);
    let _fetch = tokio::select! {
        _ = ctx.cancel.cancelled() => return Err(RdapClientError::Cancelled),
        guard = slot.fetch_lock.lock() => guard,
    };
    if store.has_registry(registry_type) {
        return Ok(());
    }
    let url = config.url_for(registry_type);
    let response = iana_request(registry_type, &url, http, ctx).await?;
    store.put_registry(registry_type, response.registry, response.http_data);
    Ok(())
}
