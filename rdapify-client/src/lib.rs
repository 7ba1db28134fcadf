#![allow(rustdoc::bare_urls)]
#![doc = include_str!("../README.md")]
use std::time::Duration;

use strum_macros::Display;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use rdapify_common::{
    asn_types::AsnKeyError, dns_types::DomainNameError, iana::BootstrapRegistryError,
    ip_types::IpKeyError, response::RdapResponseError,
};

pub mod breaker;
pub mod cache;
pub mod client;
pub mod guard;
pub mod http;
pub mod iana;
pub mod limiter;
pub mod log;
pub mod metrics;
pub mod normalize;
pub mod queue;
pub mod rdap;
pub mod redact;
pub mod retry;

/// The kind of query input that failed validation.
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    #[strum(serialize = "domain")]
    Domain,
    #[strum(serialize = "ip")]
    Ip,
    #[strum(serialize = "asn")]
    Asn,
    #[strum(serialize = "options")]
    Options,
}

/// Why a request was refused before leaving the process.
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityReason {
    #[strum(serialize = "ssrf")]
    Ssrf,
    #[strum(serialize = "auth")]
    Auth,
}

/// The public error taxonomy. The kind of every failure is part of the
/// API; use [`RdapClientError::kind`] for metrics keys.
#[derive(Debug, Error)]
pub enum RdapClientError {
    /// Malformed domain/IP/ASN input, or an unrecognized client option.
    #[error("Invalid {kind} input: {message}")]
    InvalidInput { kind: InputKind, message: String },

    /// SSRF rejection or authentication misconfiguration.
    #[error("Request blocked ({reason}): {message}")]
    Security {
        reason: SecurityReason,
        message: String,
    },

    /// The server has no data for the query key.
    #[error("Resource not found")]
    NotFound,

    /// The local limiter is exhausted or the server answered 429.
    #[error("Rate limited; retry after {retry_after:?}")]
    RateLimit { retry_after: Duration },

    /// A network failure or timeout.
    #[error("Transport failure: {message}")]
    Transport { message: String },

    /// Malformed RDAP JSON, an object class mismatch, a redirect loop,
    /// or an unsupported content encoding.
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// The circuit breaker for this origin is open.
    #[error("Circuit open for {origin}; retry after {retry_after:?}")]
    CircuitOpen {
        origin: String,
        retry_after: Duration,
    },

    /// Bootstrap registry download failure or no match for the key.
    #[error("Bootstrap failure: {message}")]
    Bootstrap { message: String },

    /// The priority queue is saturated.
    #[error("Query queue is full")]
    QueueFull,

    /// The caller's cancellation signal was observed.
    #[error("Cancelled")]
    Cancelled,
}

/// Metric-friendly name for each [`RdapClientError`] variant.
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    #[strum(serialize = "invalid-input")]
    InvalidInput,
    #[strum(serialize = "security")]
    Security,
    #[strum(serialize = "not-found")]
    NotFound,
    #[strum(serialize = "rate-limit")]
    RateLimit,
    #[strum(serialize = "transport")]
    Transport,
    #[strum(serialize = "protocol")]
    Protocol,
    #[strum(serialize = "circuit-open")]
    CircuitOpen,
    #[strum(serialize = "bootstrap")]
    Bootstrap,
    #[strum(serialize = "queue-full")]
    QueueFull,
    #[strum(serialize = "cancelled")]
    Cancelled,
}

impl RdapClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Security { .. } => ErrorKind::Security,
            Self::NotFound => ErrorKind::NotFound,
            Self::RateLimit { .. } => ErrorKind::RateLimit,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            Self::Bootstrap { .. } => ErrorKind::Bootstrap,
            Self::QueueFull => ErrorKind::QueueFull,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// True for outcomes the retry strategy may try again: network
    /// failures, timeouts, and rate limiting. Everything else is final
    /// within a call.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::RateLimit { .. })
    }
}

impl From<DomainNameError> for RdapClientError {
    fn from(err: DomainNameError) -> Self {
        Self::InvalidInput {
            kind: InputKind::Domain,
            message: err.to_string(),
        }
    }
}

impl From<IpKeyError> for RdapClientError {
    fn from(err: IpKeyError) -> Self {
        Self::InvalidInput {
            kind: InputKind::Ip,
            message: err.to_string(),
        }
    }
}

impl From<AsnKeyError> for RdapClientError {
    fn from(err: AsnKeyError) -> Self {
        Self::InvalidInput {
            kind: InputKind::Asn,
            message: err.to_string(),
        }
    }
}

impl From<BootstrapRegistryError> for RdapClientError {
    fn from(err: BootstrapRegistryError) -> Self {
        Self::Bootstrap {
            message: err.to_string(),
        }
    }
}

impl From<RdapResponseError> for RdapClientError {
    fn from(err: RdapResponseError) -> Self {
        Self::Protocol {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for RdapClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for RdapClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Protocol {
                message: err.to_string(),
            }
        } else if err.is_timeout() {
            Self::Transport {
                message: "request timed out".to_string(),
            }
        } else {
            Self::Transport {
                message: err.to_string(),
            }
        }
    }
}

/// Per-query context: a cancellation signal, an admission priority, and
/// an optional rate-limit key overriding the default per-host key.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    pub cancel: CancellationToken,
    pub priority: crate::queue::Priority,
    pub rate_key: Option<String>,
}

/// Things that are nice to have around.
pub mod prelude {
    #[doc(inline)]
    pub use crate::{
        cache::{CacheBackend, CacheConfig},
        client::{BatchResult, RdapClient, RdapClientConfig},
        http::{
            AuthConfig, CompressionConfig, PoolConfig, ProxyConfig, ReqwestClientConfig,
        },
        iana::BootstrapConfig,
        limiter::RateLimitConfig,
        log::LoggingConfig,
        queue::{Priority, PriorityConfig},
        rdap::QueryType,
        redact::{PrivacyConfig, RedactionPolicy},
        retry::{CircuitBreakerConfig, RetryConfig, RetryStrategy},
        ErrorKind, QueryContext, RdapClientError,
    };
    #[doc(inline)]
    pub use rdapify_common::prelude::*;
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::RdapClientError;

    #[test]
    fn GIVEN_each_error_WHEN_is_retryable_THEN_only_transient_kinds() {
        // GIVEN / WHEN / THEN
        assert!(RdapClientError::Transport {
            message: "reset".to_string()
        }
        .is_retryable());
        assert!(RdapClientError::RateLimit {
            retry_after: std::time::Duration::from_secs(1)
        }
        .is_retryable());
        assert!(!RdapClientError::NotFound.is_retryable());
        assert!(!RdapClientError::Cancelled.is_retryable());
        assert!(!RdapClientError::Protocol {
            message: "bad json".to_string()
        }
        .is_retryable());
        assert!(!RdapClientError::QueueFull.is_retryable());
    }

    #[test]
    fn GIVEN_error_WHEN_kind_THEN_metric_name() {
        // GIVEN
        let err = RdapClientError::NotFound;

        // WHEN
        let kind = err.kind();

        // THEN
        assert_eq!(kind.to_string(), "not-found");
    }
}
