//! The leveled query log.
//!
//! The library never installs a tracing subscriber; it only emits
//! events, each tagged with the orchestration's correlation id. When
//! logging is disabled the gate is a single boolean check.

use serde::{Deserialize, Serialize};
use strum_macros::Display;
use uuid::Uuid;

/// Log verbosity threshold.
#[derive(
    Serialize, Deserialize, Display, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[strum(serialize = "debug")]
    Debug,
    #[default]
    #[strum(serialize = "info")]
    Info,
    #[strum(serialize = "warn")]
    Warn,
    #[strum(serialize = "error")]
    Error,
}

/// Logging settings.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct LoggingConfig {
    pub enabled: bool,
    pub level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: LogLevel::Info,
        }
    }
}

/// Emits structured query events through tracing.
#[derive(Debug, Clone, Copy)]
pub(crate) struct QueryLog {
    enabled: bool,
    level: LogLevel,
}

impl QueryLog {
    pub(crate) fn new(config: &LoggingConfig) -> Self {
        Self {
            enabled: config.enabled,
            level: config.level,
        }
    }

    #[inline]
    fn enabled_for(&self, level: LogLevel) -> bool {
        self.enabled && level >= self.level
    }

    pub(crate) fn debug(&self, query_id: &Uuid, message: &str) {
        if self.enabled_for(LogLevel::Debug) {
            tracing::debug!(query_id = %query_id, "{message}");
        }
    }

    pub(crate) fn info(&self, query_id: &Uuid, message: &str) {
        if self.enabled_for(LogLevel::Info) {
            tracing::info!(query_id = %query_id, "{message}");
        }
    }

    pub(crate) fn warn(&self, query_id: &Uuid, message: &str) {
        if self.enabled_for(LogLevel::Warn) {
            tracing::warn!(query_id = %query_id, "{message}");
        }
    }

    pub(crate) fn error(&self, query_id: &Uuid, message: &str) {
        if self.enabled_for(LogLevel::Error) {
            tracing::error!(query_id = %query_id, "{message}");
        }
    }
}
