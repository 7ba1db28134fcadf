//! Proxying of outbound requests.

use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::{InputKind, RdapClientError};

/// The proxy protocol spoken to the proxy itself.
#[derive(Serialize, Deserialize, Display, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProxyProtocol {
    #[strum(serialize = "http")]
    Http,
    #[strum(serialize = "https")]
    Https,
    #[strum(serialize = "socks4")]
    Socks4,
    #[strum(serialize = "socks5")]
    Socks5,
}

/// Credentials for a proxy requiring authentication.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProxyAuth {
    pub username: String,
    pub password: String,
}

/// Proxy settings for all outbound requests.
///
/// Bypass entries are wildcard host patterns (`*.example.com`); a target
/// matching one connects directly. The SSRF guard applies to the
/// ultimate target either way.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    pub protocol: ProxyProtocol,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<ProxyAuth>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bypass: Vec<String>,
}

impl ProxyConfig {
    /// Builds the reqwest proxy for this configuration.
    pub fn to_proxy(&self) -> Result<reqwest::Proxy, RdapClientError> {
        let url = format!("{}://{}:{}", self.protocol, self.host, self.port);
        let mut proxy = reqwest::Proxy::all(&url).map_err(|e| RdapClientError::InvalidInput {
            kind: InputKind::Options,
            message: format!("invalid proxy {url}: {e}"),
        })?;
        if let Some(auth) = &self.auth {
            proxy = proxy.basic_auth(&auth.username, &auth.password);
        }
        if !self.bypass.is_empty() {
            let patterns = self
                .bypass
                .iter()
                .map(|p| p.trim_start_matches('*'))
                .collect::<Vec<&str>>()
                .join(",");
            proxy = proxy.no_proxy(reqwest::NoProxy::from_string(&patterns));
        }
        Ok(proxy)
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::{ProxyConfig, ProxyProtocol};

    #[test]
    fn GIVEN_socks5_config_WHEN_to_proxy_THEN_builds() {
        // GIVEN
        let config = ProxyConfig {
            host: "proxy.example".to_string(),
            port: 1080,
            protocol: ProxyProtocol::Socks5,
            auth: None,
            bypass: vec!["*.internal.example".to_string()],
        };

        // WHEN
        let actual = config.to_proxy();

        // THEN
        assert!(actual.is_ok());
    }

    #[test]
    fn GIVEN_proxy_json_WHEN_deserialize_THEN_protocol_lowercase() {
        // GIVEN
        let json = r#"{"host": "p.example", "port": 8080, "protocol": "http"}"#;

        // WHEN
        let actual = serde_json::from_str::<ProxyConfig>(json).expect("parsing proxy config");

        // THEN
        assert_eq!(actual.protocol, ProxyProtocol::Http);
        assert!(actual.bypass.is_empty());
    }

    #[test]
    fn GIVEN_unknown_key_WHEN_deserialize_THEN_rejected() {
        // GIVEN
        let json = r#"{"host": "p.example", "port": 8080, "protocol": "http", "extra": 1}"#;

        // WHEN
        let actual = serde_json::from_str::<ProxyConfig>(json);

        // THEN
        assert!(actual.is_err());
    }
}
