//! The wrapped client and the fetch pipeline.
//!
//! [`wrapped_request`] is the single path every outbound RDAP and
//! bootstrap request takes: circuit breaker check, rate limit token,
//! SSRF guard, the GET itself with a per-attempt timeout, manual
//! redirect hops (each re-guarded), response classification, and the
//! retry strategy over transient failures.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Instant;

use reqwest::header::{
    CACHE_CONTROL, CONTENT_ENCODING, CONTENT_TYPE, EXPIRES, LOCATION, RETRY_AFTER,
};
use reqwest::{StatusCode, Url};
use tracing::{debug, error, warn};

use rdapify_common::httpdata::HttpData;

use super::compression::decode_body;
use super::{AuthConfig, CompressionConfig, CompressionStats};
use crate::breaker::CircuitBreaker;
use crate::guard::SsrfGuard;
use crate::limiter::{RateLimitKeyBy, RateLimiter};
use crate::retry::RetryConfig;
use crate::{QueryContext, RdapClientError};

/// Options for the fetch pipeline itself.
#[derive(Clone, Copy, Debug)]
pub struct RequestOptions {
    /// Redirect hops followed before giving up.
    pub max_redirects: u16,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self { max_redirects: 3 }
    }
}

/// Live connection usage per origin, tracked around each request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub total_requests: u64,
    pub active: u64,
    pub hosts: usize,
}

#[derive(Debug, Default)]
struct PoolInner {
    active: HashMap<String, u64>,
    hosts: HashSet<String>,
    total: u64,
}

/// Origin-level request accounting. Socket reuse itself lives inside
/// the Reqwest pool; this tracks what the library has in flight.
#[derive(Debug, Default)]
pub struct PoolTracker {
    inner: Mutex<PoolInner>,
}

impl PoolTracker {
    fn track(&self, origin: &str) -> PoolBorrow<'_> {
        let mut inner = self.lock();
        *inner.active.entry(origin.to_string()).or_insert(0) += 1;
        inner.hosts.insert(origin.to_string());
        inner.total += 1;
        PoolBorrow {
            tracker: self,
            origin: origin.to_string(),
        }
    }

    pub fn stats(&self) -> PoolStats {
        let inner = self.lock();
        PoolStats {
            total_requests: inner.total,
            active: inner.active.values().sum(),
            hosts: inner.hosts.len(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

struct PoolBorrow<'a> {
    tracker: &'a PoolTracker,
    origin: String,
}

impl Drop for PoolBorrow<'_> {
    fn drop(&mut self) {
        let mut inner = self.tracker.lock();
        if let Some(active) = inner.active.get_mut(&self.origin) {
            *active = active.saturating_sub(1);
        }
    }
}

/// A wrapper around the Reqwest client carrying the per-request
/// concerns of the fetch pipeline.
pub struct Client {
    pub(crate) reqwest_client: reqwest::Client,
    pub(crate) options: RequestOptions,
    pub(crate) auth: AuthConfig,
    pub(crate) guard: SsrfGuard,
    pub(crate) limiter: Option<RateLimiter>,
    pub(crate) key_by: RateLimitKeyBy,
    pub(crate) breaker: CircuitBreaker,
    pub(crate) retry: RetryConfig,
    pub(crate) compression: CompressionConfig,
    pub(crate) compression_stats: CompressionStats,
    pub(crate) pool_tracker: PoolTracker,
}

impl Client {
    pub fn pool_stats(&self) -> PoolStats {
        self.pool_tracker.stats()
    }

    pub fn compression_totals(&self) -> super::CompressionTotals {
        self.compression_stats.totals()
    }
}

/// The data coming back from a request.
#[derive(Debug, Clone)]
pub struct WrappedResponse {
    pub text: String,
    pub http_data: HttpData,
}

/// The origin an URL points at, in `scheme://host:port` form.
pub(crate) fn origin_of(url: &Url) -> String {
    let scheme = url.scheme();
    let host = url.host_str().unwrap_or_default();
    match url.port_or_known_default() {
        Some(port) => format!("{scheme}://{host}:{port}"),
        None => format!("{scheme}://{host}"),
    }
}

/// Issues a GET against `url` with retries, circuit breaking, rate
/// limiting, and SSRF guarding. Returns the decoded body text and the
/// response metadata.
pub async fn wrapped_request(
    url: &str,
    client: &Client,
    ctx: &QueryContext,
) -> Result<WrappedResponse, RdapClientError> {
    let parsed = Url::parse(url).map_err(|e| RdapClientError::Protocol {
        message: format!("invalid url {url}: {e}"),
    })?;
    let origin = origin_of(&parsed);
    let started = Instant::now();
    let mut attempt: u32 = 1;
    loop {
        match attempt_request(&parsed, client, ctx).await {
            Ok(response) => {
                client.breaker.record_success(&origin);
                return Ok(response);
            }
            Err(err) => {
                if breaker_counts(&err) {
                    client.breaker.record_failure(&origin);
                }
                if matches!(err, RdapClientError::Cancelled) {
                    return Err(err);
                }
                if !err.is_retryable() || attempt >= client.retry.max_attempts {
                    error!(
                        origin = %origin,
                        attempt,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        kind = %err.kind(),
                        "request failed"
                    );
                    return Err(err);
                }
                let mut delay = client.retry.delay_for(attempt);
                if let RdapClientError::RateLimit { retry_after } = &err {
                    delay = delay.max(*retry_after);
                }
                warn!(
                    origin = %origin,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    kind = %err.kind(),
                    "retrying after transient failure"
                );
                tokio::select! {
                    _ = ctx.cancel.cancelled() => return Err(RdapClientError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
            }
        }
    }
}

/// Failures the circuit breaker counts from here: transport-level
/// trouble. Cancellation is recorded at the point it interrupts an
/// in-flight request; a cancellation observed before send never counts.
fn breaker_counts(err: &RdapClientError) -> bool {
    matches!(err, RdapClientError::Transport { .. })
}

async fn attempt_request(
    url: &Url,
    client: &Client,
    ctx: &QueryContext,
) -> Result<WrappedResponse, RdapClientError> {
    let origin = origin_of(url);
    client.breaker.check(&origin)?;

    if let Some(limiter) = &client.limiter {
        let host = url.host_str().unwrap_or_default().to_string();
        let key = match client.key_by {
            RateLimitKeyBy::Host => host,
            RateLimitKeyBy::Caller => ctx.rate_key.clone().unwrap_or(host),
        };
        limiter.acquire(&key, &ctx.cancel).await?;
    }

    if ctx.cancel.is_cancelled() {
        return Err(RdapClientError::Cancelled);
    }
    client.guard.check_url(url).await?;

    let mut current = url.clone();
    let mut visited: HashSet<String> = HashSet::new();
    loop {
        let current_origin = origin_of(&current);
        let _borrow = client.pool_tracker.track(&current_origin);
        let request = client.auth.apply(client.reqwest_client.get(current.clone()))?;
        let response = tokio::select! {
            _ = ctx.cancel.cancelled() => {
                // the request was already on the wire; this abort
                // counts against the origin
                client.breaker.record_failure(&current_origin);
                return Err(RdapClientError::Cancelled);
            }
            result = request.send() => result.map_err(RdapClientError::from)?,
        };
        let status = response.status();
        let http_data = http_data_of(&response, &current);

        if status.is_redirection() {
            let location = http_data
                .location
                .clone()
                .ok_or_else(|| RdapClientError::Protocol {
                    message: format!("redirect from {current} without a location"),
                })?;
            let next = current
                .join(&location)
                .map_err(|e| RdapClientError::Protocol {
                    message: format!("bad redirect target {location}: {e}"),
                })?;
            visited.insert(current.to_string());
            if next == current || visited.contains(next.as_str()) {
                return Err(RdapClientError::Protocol {
                    message: format!("circular redirect chain at {next}"),
                });
            }
            if visited.len() > client.options.max_redirects as usize {
                return Err(RdapClientError::Protocol {
                    message: format!(
                        "more than {} redirects from {url}",
                        client.options.max_redirects
                    ),
                });
            }
            client.guard.check_url(&next).await?;
            debug!(from = %current, to = %next, "following redirect");
            current = next;
            continue;
        }

        return classify(response, status, http_data, &current_origin, client, ctx).await;
    }
}

async fn classify(
    response: reqwest::Response,
    status: StatusCode,
    http_data: HttpData,
    origin: &str,
    client: &Client,
    ctx: &QueryContext,
) -> Result<WrappedResponse, RdapClientError> {
    match status.as_u16() {
        404 => Err(RdapClientError::NotFound),
        429 => Err(RdapClientError::RateLimit {
            retry_after: http_data
                .retry_after_duration()
                .unwrap_or_else(|| std::time::Duration::from_millis(client.retry.initial_delay_ms)),
        }),
        s if (500..600).contains(&s) => Err(RdapClientError::Transport {
            message: format!("{status} from {}", http_data.host),
        }),
        s if (400..500).contains(&s) => Err(RdapClientError::Protocol {
            message: format!("{status} from {}", http_data.host),
        }),
        _ => {
            let content_encoding = response
                .headers()
                .get(CONTENT_ENCODING)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            let body = tokio::select! {
                _ = ctx.cancel.cancelled() => {
                    // aborted mid-body; the socket was in use
                    client.breaker.record_failure(origin);
                    return Err(RdapClientError::Cancelled);
                }
                result = response.bytes() => result.map_err(RdapClientError::from)?,
            };
            // wire size before any decoding; transparent decompression
            // is off, so this is what actually crossed the network
            let wire_len = body.len() as u64;
            let decoded = decode_body(&body, content_encoding.as_deref())?;
            let text = String::from_utf8(decoded).map_err(|_e| RdapClientError::Protocol {
                message: format!("response from {} is not valid UTF-8", http_data.host),
            })?;
            client.compression_stats.record(
                wire_len,
                text.len() as u64,
                client.compression.threshold_bytes,
            );
            Ok(WrappedResponse { text, http_data })
        }
    }
}

fn http_data_of(response: &reqwest::Response, url: &Url) -> HttpData {
    let header = |name| {
        response
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    HttpData::now()
        .and_content_length(response.content_length())
        .and_content_type(header(CONTENT_TYPE))
        .scheme(url.scheme())
        .host(url.host_str().unwrap_or_default().to_owned())
        .status_code(response.status().as_u16())
        .and_location(header(LOCATION))
        .and_expires(header(EXPIRES))
        .and_cache_control(header(CACHE_CONTROL))
        .and_retry_after(header(RETRY_AFTER))
        .build()
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use reqwest::Url;
    use rstest::rstest;

    use super::{origin_of, PoolTracker};

    #[rstest]
    #[case("https://rdap.example.com/domain/foo", "https://rdap.example.com:443")]
    #[case("http://rdap.example.com/domain/foo", "http://rdap.example.com:80")]
    #[case("https://rdap.example.com:8443/x", "https://rdap.example.com:8443")]
    fn GIVEN_url_WHEN_origin_of_THEN_scheme_host_port(
        #[case] url: &str,
        #[case] expected: &str,
    ) {
        // GIVEN
        let url = Url::parse(url).expect("valid url");

        // WHEN
        let actual = origin_of(&url);

        // THEN
        assert_eq!(actual, expected);
    }

    #[test]
    fn GIVEN_tracked_requests_WHEN_dropped_THEN_active_returns_to_zero() {
        // GIVEN
        let tracker = PoolTracker::default();

        // WHEN
        {
            let _a = tracker.track("https://a.example:443");
            let _b = tracker.track("https://b.example:443");
            let stats = tracker.stats();
            assert_eq!(stats.active, 2);
            assert_eq!(stats.hosts, 2);
        }

        // THEN
        let stats = tracker.stats();
        assert_eq!(stats.active, 0);
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.hosts, 2);
    }
}
