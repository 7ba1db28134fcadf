//! Retry strategies and the circuit breaker configuration.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// How the delay between attempts grows.
#[derive(Serialize, Deserialize, Display, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RetryStrategy {
    #[strum(serialize = "fixed")]
    Fixed,
    #[strum(serialize = "linear")]
    Linear,
    #[strum(serialize = "exponential")]
    Exponential,
    #[strum(serialize = "exponential-jitter")]
    ExponentialJitter,
}

/// Circuit breaker settings, applied per origin.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct CircuitBreakerConfig {
    pub enabled: bool,
    /// Consecutive failures before the circuit opens.
    pub threshold: u32,
    /// How long the circuit stays open before admitting a probe.
    pub timeout_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 5,
            timeout_ms: 30_000,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Retry settings for transient failures.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct RetryConfig {
    pub strategy: RetryStrategy,
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            strategy: RetryStrategy::Exponential,
            max_attempts: 3,
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl RetryConfig {
    /// The delay after attempt `attempt` (1-indexed), clamped to the
    /// maximum. The jitter variant multiplies the clamped delay by a
    /// uniform random factor in `[0.5, 1.5)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let initial = self.initial_delay_ms;
        let base = match self.strategy {
            RetryStrategy::Fixed => initial,
            RetryStrategy::Linear => initial.saturating_mul(attempt as u64),
            RetryStrategy::Exponential | RetryStrategy::ExponentialJitter => initial
                .saturating_mul(1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX)),
        };
        let clamped = base.min(self.max_delay_ms);
        let millis = if matches!(self.strategy, RetryStrategy::ExponentialJitter) {
            let factor: f64 = rand::thread_rng().gen_range(0.5..1.5);
            (clamped as f64 * factor) as u64
        } else {
            clamped
        };
        Duration::from_millis(millis)
    }

    /// A configuration that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use rstest::rstest;

    use super::{RetryConfig, RetryStrategy};

    fn config(strategy: RetryStrategy) -> RetryConfig {
        RetryConfig {
            strategy,
            max_attempts: 5,
            initial_delay_ms: 100,
            max_delay_ms: 1_000,
            ..RetryConfig::default()
        }
    }

    #[rstest]
    #[case(1, 100)]
    #[case(2, 100)]
    #[case(5, 100)]
    fn GIVEN_fixed_strategy_WHEN_delay_for_THEN_constant(#[case] attempt: u32, #[case] ms: u64) {
        // GIVEN
        let config = config(RetryStrategy::Fixed);

        // WHEN
        let actual = config.delay_for(attempt);

        // THEN
        assert_eq!(actual.as_millis() as u64, ms);
    }

    #[rstest]
    #[case(1, 100)]
    #[case(2, 200)]
    #[case(3, 300)]
    #[case(100, 1_000)]
    fn GIVEN_linear_strategy_WHEN_delay_for_THEN_grows_and_clamps(
        #[case] attempt: u32,
        #[case] ms: u64,
    ) {
        // GIVEN
        let config = config(RetryStrategy::Linear);

        // WHEN
        let actual = config.delay_for(attempt);

        // THEN
        assert_eq!(actual.as_millis() as u64, ms);
    }

    #[rstest]
    #[case(1, 100)]
    #[case(2, 200)]
    #[case(3, 400)]
    #[case(4, 800)]
    #[case(5, 1_000)]
    fn GIVEN_exponential_strategy_WHEN_delay_for_THEN_doubles_and_clamps(
        #[case] attempt: u32,
        #[case] ms: u64,
    ) {
        // GIVEN
        let config = config(RetryStrategy::Exponential);

        // WHEN
        let actual = config.delay_for(attempt);

        // THEN
        assert_eq!(actual.as_millis() as u64, ms);
    }

    #[test]
    fn GIVEN_jitter_strategy_WHEN_delay_for_THEN_within_half_to_one_and_a_half() {
        // GIVEN
        let config = config(RetryStrategy::ExponentialJitter);

        // WHEN / THEN
        for _ in 0..100 {
            let ms = config.delay_for(3).as_millis() as u64;
            assert!((200..600).contains(&ms), "jittered delay {ms} out of range");
        }
    }

    #[test]
    fn GIVEN_retry_json_WHEN_deserialize_THEN_kebab_case_strategy_accepted() {
        // GIVEN
        let json = r#"{"strategy": "exponential-jitter", "maxAttempts": 4}"#;

        // WHEN
        let actual = serde_json::from_str::<RetryConfig>(json).expect("parsing config");

        // THEN
        assert_eq!(actual.strategy, RetryStrategy::ExponentialJitter);
        assert_eq!(actual.max_attempts, 4);
    }

    #[test]
    fn GIVEN_unknown_key_WHEN_deserialize_THEN_rejected() {
        // GIVEN
        let json = r#"{"strategy": "fixed", "surpriseKey": true}"#;

        // WHEN
        let actual = serde_json::from_str::<RetryConfig>(json);

        // THEN
        assert!(actual.is_err());
    }
}
