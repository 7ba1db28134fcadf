//! A per-origin circuit breaker.
//!
//! Origins accumulate consecutive failures while the circuit is closed.
//! At the threshold the circuit opens and requests fail fast until the
//! open window elapses, after which exactly one probe is admitted. A
//! successful probe closes the circuit; a failed probe re-opens it for
//! a fresh window.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::retry::CircuitBreakerConfig;
use crate::RdapClientError;

#[derive(Debug, Clone, Copy)]
enum State {
    Closed { failures: u32 },
    Open { until: Instant },
    HalfOpen,
}

/// Tracks breaker state for every origin seen.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    origins: Mutex<HashMap<String, State>>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            origins: Mutex::new(HashMap::new()),
        }
    }

    /// Consulted before each attempt. While the circuit is open this
    /// fails fast; when the open window has elapsed the first caller
    /// through becomes the half-open probe.
    pub fn check(&self, origin: &str) -> Result<(), RdapClientError> {
        if !self.config.enabled {
            return Ok(());
        }
        let mut origins = lock_origins(&self.origins);
        let state = origins
            .entry(origin.to_string())
            .or_insert(State::Closed { failures: 0 });
        match *state {
            State::Closed { .. } => Ok(()),
            State::Open { until } => {
                let now = Instant::now();
                if now >= until {
                    *state = State::HalfOpen;
                    Ok(())
                } else {
                    Err(RdapClientError::CircuitOpen {
                        origin: origin.to_string(),
                        retry_after: until - now,
                    })
                }
            }
            // a probe is already in flight
            State::HalfOpen => Err(RdapClientError::CircuitOpen {
                origin: origin.to_string(),
                retry_after: self.config.timeout(),
            }),
        }
    }

    /// A successful response from any attempt closes the circuit and
    /// resets the failure count.
    pub fn record_success(&self, origin: &str) {
        if !self.config.enabled {
            return;
        }
        let mut origins = lock_origins(&self.origins);
        origins.insert(origin.to_string(), State::Closed { failures: 0 });
    }

    pub fn record_failure(&self, origin: &str) {
        if !self.config.enabled {
            return;
        }
        let mut origins = lock_origins(&self.origins);
        let state = origins
            .entry(origin.to_string())
            .or_insert(State::Closed { failures: 0 });
        match *state {
            State::Closed { failures } => {
                let failures = failures + 1;
                if failures >= self.config.threshold {
                    *state = State::Open {
                        until: Instant::now() + self.config.timeout(),
                    };
                } else {
                    *state = State::Closed { failures };
                }
            }
            State::HalfOpen => {
                *state = State::Open {
                    until: Instant::now() + self.config.timeout(),
                };
            }
            State::Open { .. } => {}
        }
    }

    /// How long until the origin's circuit admits traffic, if it is open.
    pub fn retry_after(&self, origin: &str) -> Option<Duration> {
        let origins = lock_origins(&self.origins);
        match origins.get(origin) {
            Some(State::Open { until }) => Some(until.saturating_duration_since(Instant::now())),
            _ => None,
        }
    }
}

fn lock_origins(
    origins: &Mutex<HashMap<String, State>>,
) -> std::sync::MutexGuard<'_, HashMap<String, State>> {
    // a poisoned lock means a panic mid-update; state is a plain enum,
    // so continuing with the last written value is sound
    origins.lock().unwrap_or_else(|e| e.into_inner())
}
