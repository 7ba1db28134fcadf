//! The RDAP client and its query orchestration.
//!
//! Every query runs the same pipeline: validate the key, consult the
//! response cache, discover the authoritative server through the
//! bootstrap registries, fetch, normalize, insert into the cache, and
//! apply the redaction policy on the way out. Concurrent cache misses
//! for one key collapse into a single upstream fetch.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

use rdapify_common::normalized::{AutnumData, DomainData, NetworkData, RdapData};

use crate::breaker::CircuitBreaker;
use crate::cache::{CacheBackend, CacheConfig, CacheKey, FileCache, MemoryCache, ResponseCache};
use crate::guard::SsrfGuard;
use crate::http::{
    create_reqwest_client, AuthConfig, Client as HttpClient, CompressionConfig, CompressionStats,
    CompressionTotals, PoolConfig, PoolStats, PoolTracker, ProxyConfig, ReqwestClientConfig,
    RequestOptions,
};
use crate::iana::{bootstrap_url_for, BootstrapConfig, MemoryBootstrapStore};
use crate::limiter::{RateLimitConfig, RateLimiter};
use crate::log::{LoggingConfig, QueryLog};
use crate::metrics::{MetricsCollector, MetricsSummary};
use crate::normalize::normalize;
use crate::queue::{PriorityConfig, PriorityQueue, QueueStats};
use crate::rdap::{rdap_url_request, QueryType};
use crate::redact::{PrivacyConfig, Redactor};
use crate::retry::RetryConfig;
use crate::{InputKind, QueryContext, RdapClientError};

/// All recognized client options. Unknown keys are rejected when the
/// configuration is loaded from JSON.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct RdapClientConfig {
    pub cache: CacheConfig,

    /// Attach the verbatim upstream JSON to responses. Raw data is
    /// never redacted; callers asking for it opt into that.
    pub include_raw: bool,

    pub privacy: PrivacyConfig,

    /// Allow outbound requests to private and special-use addresses.
    pub allow_private_ips: bool,

    /// Per-attempt HTTP timeout.
    pub timeout_ms: u64,

    pub max_redirects: u16,
    pub retry: RetryConfig,
    pub rate_limit: RateLimitConfig,
    pub connection_pool: PoolConfig,
    pub auth: AuthConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
    pub compression: CompressionConfig,
    pub bootstrap: BootstrapConfig,
    pub logging: LoggingConfig,

    /// Enable the priority admission queue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<PriorityConfig>,

    /// Transport-level knobs (user agent, TLS validation).
    pub http: ReqwestClientConfig,
}

impl Default for RdapClientConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            include_raw: false,
            privacy: PrivacyConfig::default(),
            allow_private_ips: false,
            timeout_ms: 30_000,
            max_redirects: 3,
            retry: RetryConfig::default(),
            rate_limit: RateLimitConfig::default(),
            connection_pool: PoolConfig::default(),
            auth: AuthConfig::default(),
            proxy: None,
            compression: CompressionConfig::default(),
            bootstrap: BootstrapConfig::default(),
            logging: LoggingConfig::default(),
            priority: None,
            http: ReqwestClientConfig::default(),
        }
    }
}

#[buildstructor::buildstructor]
impl RdapClientConfig {
    #[builder(visibility = "pub")]
    #[allow(clippy::too_many_arguments)]
    fn new(
        cache: Option<CacheConfig>,
        include_raw: Option<bool>,
        privacy: Option<PrivacyConfig>,
        allow_private_ips: Option<bool>,
        timeout_ms: Option<u64>,
        max_redirects: Option<u16>,
        retry: Option<RetryConfig>,
        rate_limit: Option<RateLimitConfig>,
        connection_pool: Option<PoolConfig>,
        auth: Option<AuthConfig>,
        proxy: Option<ProxyConfig>,
        compression: Option<CompressionConfig>,
        bootstrap: Option<BootstrapConfig>,
        logging: Option<LoggingConfig>,
        priority: Option<PriorityConfig>,
        http: Option<ReqwestClientConfig>,
    ) -> Self {
        let default = Self::default();
        Self {
            cache: cache.unwrap_or(default.cache),
            include_raw: include_raw.unwrap_or(default.include_raw),
            privacy: privacy.unwrap_or(default.privacy),
            allow_private_ips: allow_private_ips.unwrap_or(default.allow_private_ips),
            timeout_ms: timeout_ms.unwrap_or(default.timeout_ms),
            max_redirects: max_redirects.unwrap_or(default.max_redirects),
            retry: retry.unwrap_or(default.retry),
            rate_limit: rate_limit.unwrap_or(default.rate_limit),
            connection_pool: connection_pool.unwrap_or(default.connection_pool),
            auth: auth.unwrap_or(default.auth),
            proxy,
            compression: compression.unwrap_or(default.compression),
            bootstrap: bootstrap.unwrap_or(default.bootstrap),
            logging: logging.unwrap_or(default.logging),
            priority,
            http: http.unwrap_or(default.http),
        }
    }
}

/// One input's outcome in a batch call.
#[derive(Debug)]
pub struct BatchResult<T> {
    pub input: String,
    pub result: Result<T, RdapClientError>,
}

struct ClientInner {
    http: Arc<HttpClient>,
    bootstrap_store: Arc<MemoryBootstrapStore>,
    bootstrap_config: BootstrapConfig,
    cache: Option<Arc<dyn ResponseCache>>,
    redactor: Option<Redactor>,
    include_raw: bool,
    metrics: MetricsCollector,
    queue: Option<PriorityQueue>,
    inflight: tokio::sync::Mutex<HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>>,
    log: QueryLog,
    shutdown: CancellationToken,
    tasks: std::sync::Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

/// An RDAP client.
///
/// Cloning is cheap and shares all state: the connection pool, caches,
/// limiter, breaker, and metrics. Separate clients are fully
/// independent of one another.
#[derive(Clone)]
pub struct RdapClient {
    inner: Arc<ClientInner>,
}

impl RdapClient {
    /// Creates a client from its options.
    pub fn new(config: RdapClientConfig) -> Result<Self, RdapClientError> {
        let reqwest_client = create_reqwest_client(
            &config.http,
            config.timeout_ms,
            &config.connection_pool,
            &config.compression,
            config.proxy.as_ref(),
        )?;
        let http = Arc::new(HttpClient {
            reqwest_client,
            options: RequestOptions {
                max_redirects: config.max_redirects,
            },
            auth: config.auth.clone(),
            guard: SsrfGuard::new(config.allow_private_ips),
            limiter: config
                .rate_limit
                .enabled
                .then(|| RateLimiter::new(&config.rate_limit)),
            key_by: config.rate_limit.key_by,
            breaker: CircuitBreaker::new(config.retry.circuit_breaker),
            retry: config.retry,
            compression: config.compression.clone(),
            compression_stats: CompressionStats::default(),
            pool_tracker: PoolTracker::default(),
        });
        let cache: Option<Arc<dyn ResponseCache>> = if config.cache.enabled {
            match config.cache.backend {
                CacheBackend::Memory => Some(Arc::new(MemoryCache::new(config.cache.clone()))),
                CacheBackend::File => {
                    let path =
                        config
                            .cache
                            .path
                            .clone()
                            .ok_or_else(|| RdapClientError::InvalidInput {
                                kind: InputKind::Options,
                                message: "the file cache backend needs a path".to_string(),
                            })?;
                    Some(Arc::new(FileCache::new(config.cache.clone(), path)))
                }
            }
        } else {
            None
        };
        let client = Self {
            inner: Arc::new(ClientInner {
                http,
                bootstrap_store: Arc::new(MemoryBootstrapStore::new(config.bootstrap.ttl_ms)),
                bootstrap_config: config.bootstrap.clone(),
                cache,
                redactor: config
                    .privacy
                    .redact_pii
                    .then(|| Redactor::new(config.privacy.policy.clone())),
                include_raw: config.include_raw,
                metrics: MetricsCollector::default(),
                queue: config.priority.map(PriorityQueue::new),
                inflight: tokio::sync::Mutex::new(HashMap::new()),
                log: QueryLog::new(&config.logging),
                shutdown: CancellationToken::new(),
                tasks: std::sync::Mutex::new(Vec::new()),
                closed: AtomicBool::new(false),
            }),
        };
        client.spawn_background_tasks(&config);
        Ok(client)
    }

    /// Looks up registration data for a domain name.
    pub async fn domain(&self, name: &str) -> Result<DomainData, RdapClientError> {
        self.domain_with(name, &QueryContext::default()).await
    }

    /// Looks up a domain with an explicit query context.
    pub async fn domain_with(
        &self,
        name: &str,
        ctx: &QueryContext,
    ) -> Result<DomainData, RdapClientError> {
        let query = QueryType::domain(name)?;
        match self.orchestrate(query, ctx).await? {
            RdapData::Domain(domain) => Ok(domain),
            other => Err(unexpected_class(&other)),
        }
    }

    /// Looks up registration data for an IPv4 or IPv6 address.
    pub async fn ip(&self, addr: &str) -> Result<NetworkData, RdapClientError> {
        self.ip_with(addr, &QueryContext::default()).await
    }

    /// Looks up an IP address with an explicit query context.
    pub async fn ip_with(
        &self,
        addr: &str,
        ctx: &QueryContext,
    ) -> Result<NetworkData, RdapClientError> {
        let query = QueryType::ip(addr)?;
        match self.orchestrate(query, ctx).await? {
            RdapData::Network(network) => Ok(network),
            other => Err(unexpected_class(&other)),
        }
    }

    /// Looks up registration data for an autonomous system number. An
    /// `AS` prefix on the input is accepted.
    pub async fn autnum(&self, asn: &str) -> Result<AutnumData, RdapClientError> {
        self.autnum_with(asn, &QueryContext::default()).await
    }

    /// Looks up an autonomous system number with an explicit context.
    pub async fn autnum_with(
        &self,
        asn: &str,
        ctx: &QueryContext,
    ) -> Result<AutnumData, RdapClientError> {
        let query = QueryType::autnum(asn)?;
        match self.orchestrate(query, ctx).await? {
            RdapData::Autnum(autnum) => Ok(autnum),
            other => Err(unexpected_class(&other)),
        }
    }

    /// Looks up many domains; one input failing does not abort the rest.
    pub async fn domain_batch(&self, names: &[&str]) -> Vec<BatchResult<DomainData>> {
        join_all(names.iter().map(|name| async move {
            BatchResult {
                input: (*name).to_string(),
                result: self.domain(name).await,
            }
        }))
        .await
    }

    /// Looks up many IP addresses; per-input errors are reported in place.
    pub async fn ip_batch(&self, addrs: &[&str]) -> Vec<BatchResult<NetworkData>> {
        join_all(addrs.iter().map(|addr| async move {
            BatchResult {
                input: (*addr).to_string(),
                result: self.ip(addr).await,
            }
        }))
        .await
    }

    /// Looks up many autonomous system numbers; per-input errors are
    /// reported in place.
    pub async fn autnum_batch(&self, asns: &[&str]) -> Vec<BatchResult<AutnumData>> {
        join_all(asns.iter().map(|asn| async move {
            BatchResult {
                input: (*asn).to_string(),
                result: self.autnum(asn).await,
            }
        }))
        .await
    }

    /// Aggregated metrics over the record buffer.
    pub fn metrics(&self) -> MetricsSummary {
        self.inner.metrics.summary()
    }

    /// Aggregated metrics over records at or after `since`.
    pub fn metrics_since(&self, since: chrono::DateTime<chrono::Utc>) -> MetricsSummary {
        self.inner.metrics.summary_since(since)
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.inner.http.pool_stats()
    }

    pub fn compression_totals(&self) -> CompressionTotals {
        self.inner.http.compression_totals()
    }

    /// Admission queue counters, when the priority queue is enabled.
    pub fn queue_stats(&self) -> Option<QueueStats> {
        self.inner.queue.as_ref().map(PriorityQueue::stats)
    }

    pub fn cached_entries(&self) -> usize {
        self.inner
            .cache
            .as_ref()
            .map(|cache| cache.len())
            .unwrap_or(0)
    }

    /// Stops accepting queries, cancels in-flight ones, snapshots the
    /// persistent cache, and stops background timers.
    pub async fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.shutdown.cancel();
        if let Some(cache) = &self.inner.cache {
            if let Err(err) = cache.persist().await {
                warn!(error = %err, "cache snapshot on shutdown failed");
            }
        }
        let tasks = {
            let mut tasks = self
                .inner
                .tasks
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            tasks.drain(..).collect::<Vec<JoinHandle<()>>>()
        };
        for task in tasks {
            task.abort();
        }
    }

    fn spawn_background_tasks(&self, config: &RdapClientConfig) {
        // background timers need a runtime; without one the client
        // still works, it just never snapshots or sweeps on its own
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let mut tasks = Vec::new();
        if let (Some(cache), CacheBackend::File) = (self.inner.cache.clone(), config.cache.backend)
        {
            let shutdown = self.inner.shutdown.clone();
            let interval = Duration::from_millis(config.cache.snapshot_interval_ms.max(1_000));
            tasks.push(handle.spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                ticker.tick().await;
                loop {
                    tokio::select! {
                        _ = shutdown.cancelled() => return,
                        _ = ticker.tick() => {
                            if let Err(err) = cache.persist().await {
                                warn!(error = %err, "periodic cache snapshot failed");
                            }
                        }
                    }
                }
            }));
        }
        if self.inner.http.limiter.is_some() {
            let http = self.inner.http.clone();
            let shutdown = self.inner.shutdown.clone();
            tasks.push(handle.spawn(async move {
                let mut ticker = tokio::time::interval(Duration::from_secs(60));
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                ticker.tick().await;
                loop {
                    tokio::select! {
                        _ = shutdown.cancelled() => return,
                        _ = ticker.tick() => {
                            if let Some(limiter) = &http.limiter {
                                limiter.sweep_idle();
                            }
                        }
                    }
                }
            }));
        }
        self.inner
            .tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(tasks);
    }

    async fn orchestrate(
        &self,
        query: QueryType,
        ctx: &QueryContext,
    ) -> Result<RdapData, RdapClientError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(RdapClientError::Cancelled);
        }
        let _permit = match &self.inner.queue {
            Some(queue) => Some(queue.acquire(ctx.priority, &ctx.cancel).await?),
            None => None,
        };
        let query_id = Uuid::new_v4();
        let started = Instant::now();
        let kind = query.object_class();
        self.inner
            .log
            .debug(&query_id, &format!("{query}: {}", query.normalized_key()));
        let outcome = tokio::select! {
            _ = self.inner.shutdown.cancelled() => Err(RdapClientError::Cancelled),
            result = self.run_pipeline(&query, ctx, &query_id) => result,
        };
        let (data, cache_hit) = match outcome {
            Ok((data, cache_hit)) => (Ok(data), cache_hit),
            Err(err) => (Err(err), false),
        };
        self.inner.metrics.record(
            kind,
            started.elapsed(),
            cache_hit,
            data.as_ref().err().map(RdapClientError::kind),
        );
        match &data {
            Ok(_) => self.inner.log.info(
                &query_id,
                &format!(
                    "{query} finished in {}ms (cache {})",
                    started.elapsed().as_millis(),
                    if cache_hit { "hit" } else { "miss" }
                ),
            ),
            Err(err) => self
                .inner
                .log
                .error(&query_id, &format!("{query} failed: {err}")),
        }
        let data = data?;
        Ok(match &self.inner.redactor {
            Some(redactor) => redactor.redact(&data),
            None => (*data).clone(),
        })
    }

    async fn run_pipeline(
        &self,
        query: &QueryType,
        ctx: &QueryContext,
        query_id: &Uuid,
    ) -> Result<(Arc<RdapData>, bool), RdapClientError> {
        let key = CacheKey::new(query.object_class(), query.normalized_key());
        if let Some(entry) = self.cache_get(&key) {
            return Ok((entry, true));
        }
        // single flight: the first caller for a missing key fetches,
        // the rest wait here and then hit the double-check below
        let key_lock = {
            let mut inflight = self.inner.inflight.lock().await;
            inflight
                .entry(key.clone())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        let guard = tokio::select! {
            _ = ctx.cancel.cancelled() => return Err(RdapClientError::Cancelled),
            guard = key_lock.lock() => guard,
        };
        if let Some(entry) = self.cache_get(&key) {
            drop(guard);
            self.remove_inflight(&key).await;
            return Ok((entry, true));
        }
        let fetched = self.fetch_and_normalize(query, ctx, query_id).await;
        let result = match fetched {
            Ok(data) => {
                let data = Arc::new(data);
                if let Some(cache) = &self.inner.cache {
                    cache.set(key.clone(), data.clone(), None);
                }
                Ok((data, false))
            }
            // failures are never cached
            Err(err) => Err(err),
        };
        drop(guard);
        self.remove_inflight(&key).await;
        result
    }

    async fn fetch_and_normalize(
        &self,
        query: &QueryType,
        ctx: &QueryContext,
        query_id: &Uuid,
    ) -> Result<RdapData, RdapClientError> {
        let server = bootstrap_url_for(
            query,
            &self.inner.http,
            &self.inner.bootstrap_store,
            &self.inner.bootstrap_config,
            ctx,
            self.inner.shutdown.clone(),
        )
        .await?;
        self.inner
            .log
            .debug(query_id, &format!("authoritative server {server}"));
        let url = query.query_url(&server);
        let response = rdap_url_request(&url, &self.inner.http, ctx).await?;
        normalize(
            response.json,
            query.object_class(),
            &server,
            self.inner.include_raw,
        )
    }

    fn cache_get(&self, key: &CacheKey) -> Option<Arc<RdapData>> {
        self.inner.cache.as_ref().and_then(|cache| cache.get(key))
    }

    async fn remove_inflight(&self, key: &CacheKey) {
        let mut inflight = self.inner.inflight.lock().await;
        inflight.remove(key);
    }
}

fn unexpected_class(data: &RdapData) -> RdapClientError {
    RdapClientError::Protocol {
        message: format!("unexpected {} response", data.object_class()),
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::{RdapClient, RdapClientConfig};
    use crate::cache::CacheBackend;
    use crate::RdapClientError;

    #[tokio::test]
    async fn GIVEN_default_config_WHEN_new_THEN_client_builds() {
        // GIVEN
        let config = RdapClientConfig::default();

        // WHEN
        let actual = RdapClient::new(config);

        // THEN
        assert!(actual.is_ok());
    }

    #[tokio::test]
    async fn GIVEN_builder_WHEN_build_THEN_overrides_applied() {
        // GIVEN / WHEN
        let config = RdapClientConfig::builder()
            .include_raw(true)
            .allow_private_ips(true)
            .timeout_ms(5_000u64)
            .build();

        // THEN
        assert!(config.include_raw);
        assert!(config.allow_private_ips);
        assert_eq!(config.timeout_ms, 5_000);
        assert!(config.privacy.redact_pii);
    }

    #[tokio::test]
    async fn GIVEN_file_backend_without_path_WHEN_new_THEN_invalid_options() {
        // GIVEN
        let mut config = RdapClientConfig::default();
        config.cache.backend = CacheBackend::File;

        // WHEN
        let actual = RdapClient::new(config);

        // THEN
        assert!(matches!(
            actual,
            Err(RdapClientError::InvalidInput { .. })
        ));
    }

    #[tokio::test]
    async fn GIVEN_closed_client_WHEN_query_THEN_refused() {
        // GIVEN
        let client = RdapClient::new(RdapClientConfig::default()).expect("client");
        client.close().await;

        // WHEN
        let actual = client.domain("example.com").await;

        // THEN
        assert!(matches!(actual, Err(RdapClientError::Cancelled)));
    }

    #[tokio::test]
    async fn GIVEN_invalid_domain_WHEN_query_THEN_invalid_input_and_metrics_untouched() {
        // GIVEN
        let client = RdapClient::new(RdapClientConfig::default()).expect("client");

        // WHEN
        let actual = client.domain("bad domain name").await;

        // THEN validation fails before any orchestration is recorded
        assert!(matches!(
            actual,
            Err(RdapClientError::InvalidInput { .. })
        ));
        assert_eq!(client.metrics().total, 0);
    }

    #[tokio::test]
    async fn GIVEN_batch_with_invalid_input_WHEN_domain_batch_THEN_per_input_errors() {
        // GIVEN inputs that all fail validation, so no network is touched
        let client = RdapClient::new(RdapClientConfig::default()).expect("client");

        // WHEN
        let results = client.domain_batch(&["not a domain", "also bad!"]).await;

        // THEN
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].input, "not a domain");
        assert!(results[0].result.is_err());
        assert!(results[1].result.is_err());
    }

    #[test]
    fn GIVEN_unknown_top_level_option_WHEN_deserialize_THEN_rejected() {
        // GIVEN
        let json = r#"{"includeRaw": true, "unknownOption": 1}"#;

        // WHEN
        let actual = serde_json::from_str::<RdapClientConfig>(json);

        // THEN
        assert!(actual.is_err());
    }

    #[test]
    fn GIVEN_nested_options_WHEN_deserialize_THEN_parsed() {
        // GIVEN
        let json = r#"
        {
            "cache": {"backend": "memory", "maxSize": 50},
            "retry": {"strategy": "exponential-jitter", "maxAttempts": 2},
            "rateLimit": {"max": 5, "windowMs": 2000},
            "logging": {"level": "debug"},
            "priority": {"concurrency": 2, "maxPending": 10}
        }
        "#;

        // WHEN
        let actual = serde_json::from_str::<RdapClientConfig>(json).expect("parsing config");

        // THEN
        assert_eq!(actual.cache.max_size, 50);
        assert_eq!(actual.retry.max_attempts, 2);
        assert_eq!(actual.rate_limit.max, 5);
        assert_eq!(actual.priority.expect("priority missing").concurrency, 2);
    }
}
