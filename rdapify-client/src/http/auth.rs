//! Per-request authentication.
//!
//! Credentials are attached to the outbound request at call time and are
//! never logged; the `Debug` implementations print placeholders.

use std::fmt;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use reqwest::header::HeaderName;
use serde::{Deserialize, Serialize};

use crate::{RdapClientError, SecurityReason};

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct OAuth2Inner {
    token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

/// An OAuth2 bearer token with caller-managed refresh.
///
/// The fetcher never refreshes the token itself; when it has expired,
/// requests fail with a security error until the caller installs a new
/// one via [`OAuth2Token::update_token`].
#[derive(Clone)]
pub struct OAuth2Token {
    inner: Arc<RwLock<OAuth2Inner>>,
}

impl OAuth2Token {
    pub fn new(token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(OAuth2Inner {
                token: token.into(),
                expires_at,
            })),
        }
    }

    pub fn is_expired(&self) -> bool {
        let inner = self.read();
        inner
            .expires_at
            .map(|expires| Utc::now() >= expires)
            .unwrap_or(false)
    }

    pub fn update_token(&self, token: impl Into<String>, expires_at: Option<DateTime<Utc>>) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.token = token.into();
        inner.expires_at = expires_at;
    }

    fn access_token(&self) -> String {
        self.read().token.clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, OAuth2Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }
}

impl fmt::Debug for OAuth2Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Token")
            .field("token", &"***")
            .field("expires_at", &self.read().expires_at)
            .finish()
    }
}

impl Serialize for OAuth2Token {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.read().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for OAuth2Token {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let inner = OAuth2Inner::deserialize(deserializer)?;
        Ok(Self {
            inner: Arc::new(RwLock::new(inner)),
        })
    }
}

/// How outbound requests authenticate to RDAP servers.
#[derive(Serialize, Deserialize, Clone, Default)]
#[serde(tag = "scheme", rename_all = "camelCase")]
pub enum AuthConfig {
    #[default]
    None,
    Basic {
        username: String,
        password: String,
    },
    Bearer {
        token: String,
    },
    ApiKey {
        name: String,
        value: String,
    },
    #[serde(rename = "oauth2")]
    OAuth2(OAuth2Token),
}

impl AuthConfig {
    /// Attaches the credentials to a request.
    pub fn apply(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, RdapClientError> {
        match self {
            Self::None => Ok(request),
            Self::Basic { username, password } => {
                Ok(request.basic_auth(username, Some(password)))
            }
            Self::Bearer { token } => Ok(request.bearer_auth(token)),
            Self::ApiKey { name, value } => {
                let header =
                    HeaderName::from_bytes(name.as_bytes()).map_err(|_e| {
                        RdapClientError::Security {
                            reason: SecurityReason::Auth,
                            message: format!("invalid api key header name: {name}"),
                        }
                    })?;
                Ok(request.header(header, value))
            }
            Self::OAuth2(token) => {
                if token.is_expired() {
                    return Err(RdapClientError::Security {
                        reason: SecurityReason::Auth,
                        message: "oauth2 token has expired".to_string(),
                    });
                }
                Ok(request.bearer_auth(token.access_token()))
            }
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::Bearer { .. } => write!(f, "Bearer(***)"),
            Self::ApiKey { name, .. } => f
                .debug_struct("ApiKey")
                .field("name", name)
                .field("value", &"***")
                .finish(),
            Self::OAuth2(token) => token.fmt(f),
        }
    }
}
