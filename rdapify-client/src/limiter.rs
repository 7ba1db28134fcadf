//! A token-bucket rate limiter with per-key buckets.
//!
//! Each key (the request origin host by default, or a caller-supplied
//! key) gets its own bucket of `max` tokens refilled continuously over
//! `window`. Acquiring waits cooperatively while the projected wait fits
//! within one window; beyond that it fails fast so heavily contended
//! callers get a `RateLimit` error with a usable `retry_after` instead
//! of an unbounded queue.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::RdapClientError;

const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// What the limiter keys its buckets by.
#[derive(Serialize, Deserialize, Display, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitKeyBy {
    #[default]
    #[strum(serialize = "host")]
    Host,
    #[strum(serialize = "caller")]
    Caller,
}

/// Rate limiter settings.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Bucket capacity: the largest burst a key may spend at once.
    pub max: u32,
    /// The window over which `max` tokens are refilled.
    pub window_ms: u64,
    pub key_by: RateLimitKeyBy,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max: 10,
            window_ms: 1_000,
            key_by: RateLimitKeyBy::Host,
        }
    }
}

#[derive(Debug)]
struct Bucket {
    /// May go negative: a negative value is debt owed by waiters that
    /// already reserved their token.
    tokens: f64,
    last_refill: Instant,
    last_used: Instant,
}

/// Token buckets in a map with idle eviction.
#[derive(Debug)]
pub struct RateLimiter {
    max: f64,
    window_ms: f64,
    idle_timeout: Duration,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max: f64::from(config.max.max(1)),
            window_ms: (config.window_ms.max(1)) as f64,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    fn rate_per_ms(&self) -> f64 {
        self.max / self.window_ms
    }

    /// Reserves one token. `Ok(None)` means the token is available now;
    /// `Ok(Some(wait))` means the caller owns a token that becomes
    /// usable after `wait`; an error means the bucket is oversubscribed
    /// past one full window.
    fn try_reserve(&self, key: &str) -> Result<Option<Duration>, RdapClientError> {
        let mut buckets = lock_buckets(&self.buckets);
        let now = Instant::now();
        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            tokens: self.max,
            last_refill: now,
            last_used: now,
        });
        let elapsed_ms = now.duration_since(bucket.last_refill).as_secs_f64() * 1_000.0;
        bucket.tokens = (bucket.tokens + elapsed_ms * self.rate_per_ms()).min(self.max);
        bucket.last_refill = now;
        bucket.last_used = now;
        bucket.tokens -= 1.0;
        if bucket.tokens >= 0.0 {
            return Ok(None);
        }
        let wait_ms = -bucket.tokens / self.rate_per_ms();
        if wait_ms > self.window_ms {
            bucket.tokens += 1.0;
            return Err(RdapClientError::RateLimit {
                retry_after: Duration::from_millis(wait_ms.ceil() as u64),
            });
        }
        Ok(Some(Duration::from_millis(wait_ms.ceil() as u64)))
    }

    fn refund(&self, key: &str) {
        let mut buckets = lock_buckets(&self.buckets);
        if let Some(bucket) = buckets.get_mut(key) {
            bucket.tokens = (bucket.tokens + 1.0).min(self.max);
        }
    }

    /// Takes a token for `key`, waiting cooperatively when the bucket
    /// is momentarily empty. A cancellation observed while waiting
    /// returns the reserved token to the bucket.
    pub async fn acquire(
        &self,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<(), RdapClientError> {
        match self.try_reserve(key)? {
            None => Ok(()),
            Some(wait) => {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        self.refund(key);
                        Err(RdapClientError::Cancelled)
                    }
                    _ = tokio::time::sleep(wait) => Ok(()),
                }
            }
        }
    }

    /// Drops buckets unused for longer than the idle timeout. Returns
    /// how many were evicted.
    pub fn sweep_idle(&self) -> usize {
        let mut buckets = lock_buckets(&self.buckets);
        let now = Instant::now();
        let before = buckets.len();
        buckets.retain(|_k, b| now.duration_since(b.last_used) < self.idle_timeout);
        before - buckets.len()
    }

    #[cfg(test)]
    fn bucket_count(&self) -> usize {
        lock_buckets(&self.buckets).len()
    }
}

fn lock_buckets(
    buckets: &Mutex<HashMap<String, Bucket>>,
) -> std::sync::MutexGuard<'_, HashMap<String, Bucket>> {
    buckets.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;

    use super::{RateLimitConfig, RateLimiter};
    use crate::RdapClientError;

    fn limiter(max: u32, window_ms: u64) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            enabled: true,
            max,
            window_ms,
            ..RateLimitConfig::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn GIVEN_fresh_bucket_WHEN_burst_up_to_max_THEN_no_waiting() {
        // GIVEN
        let limiter = limiter(5, 1_000);

        // WHEN / THEN
        for _ in 0..5 {
            let reserved = limiter.try_reserve("key").expect("reserve");
            assert!(reserved.is_none());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn GIVEN_empty_bucket_WHEN_reserve_THEN_wait_is_one_refill_interval() {
        // GIVEN
        let limiter = limiter(5, 1_000);
        for _ in 0..5 {
            limiter.try_reserve("key").expect("reserve");
        }

        // WHEN
        let actual = limiter.try_reserve("key").expect("reserve");

        // THEN
        assert_eq!(actual, Some(Duration::from_millis(200)));
    }

    #[tokio::test(start_paused = true)]
    async fn GIVEN_oversubscribed_bucket_WHEN_reserve_THEN_rate_limit_error() {
        // GIVEN a bucket of one token per second
        let limiter = limiter(1, 1_000);
        limiter.try_reserve("key").expect("first token");
        // second caller waits one full window
        limiter.try_reserve("key").expect("second token waits");

        // WHEN a third caller would wait past the window
        let actual = limiter.try_reserve("key");

        // THEN
        let err = actual.expect_err("should be rate limited");
        assert!(matches!(err, RdapClientError::RateLimit { retry_after } if retry_after > Duration::from_millis(1_000)));
    }

    #[tokio::test(start_paused = true)]
    async fn GIVEN_empty_bucket_WHEN_acquire_THEN_waits_and_succeeds() {
        // GIVEN
        let limiter = limiter(2, 1_000);
        let cancel = CancellationToken::new();
        limiter.acquire("key", &cancel).await.expect("token 1");
        limiter.acquire("key", &cancel).await.expect("token 2");

        // WHEN
        let start = tokio::time::Instant::now();
        limiter.acquire("key", &cancel).await.expect("token 3");

        // THEN
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn GIVEN_cancelled_waiter_WHEN_acquire_THEN_token_refunded() {
        // GIVEN
        let limiter = limiter(1, 1_000);
        let cancel = CancellationToken::new();
        limiter.acquire("key", &cancel).await.expect("token 1");
        cancel.cancel();

        // WHEN
        let actual = limiter.acquire("key", &cancel).await;

        // THEN the waiter is cancelled and its reservation is returned
        assert!(matches!(actual, Err(RdapClientError::Cancelled)));
        let next = limiter.try_reserve("key").expect("reserve");
        assert_eq!(next, Some(Duration::from_millis(1_000)));
    }

    #[tokio::test(start_paused = true)]
    async fn GIVEN_distinct_keys_WHEN_acquire_THEN_independent_buckets() {
        // GIVEN
        let limiter = limiter(1, 1_000);
        let cancel = CancellationToken::new();

        // WHEN
        limiter.acquire("a", &cancel).await.expect("token for a");
        let b = limiter.try_reserve("b").expect("reserve for b");

        // THEN
        assert!(b.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn GIVEN_idle_buckets_WHEN_sweep_THEN_evicted() {
        // GIVEN
        let limiter = limiter(5, 1_000);
        limiter.try_reserve("old").expect("reserve");
        tokio::time::advance(Duration::from_secs(301)).await;
        limiter.try_reserve("fresh").expect("reserve");

        // WHEN
        let evicted = limiter.sweep_idle();

        // THEN
        assert_eq!(evicted, 1);
        assert_eq!(limiter.bucket_count(), 1);
    }
}
