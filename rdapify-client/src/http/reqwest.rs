//! Creates the underlying Reqwest client.

use std::time::Duration;

use reqwest::header::{self, HeaderValue, ACCEPT, ACCEPT_ENCODING};
use serde::{Deserialize, Serialize};

use rdapify_common::{media_types::RDAP_ACCEPT_HEADER, VERSION};

use super::{CompressionConfig, ProxyConfig};
use crate::RdapClientError;

/// Connection pool settings.
///
/// The Reqwest client owns the sockets; these settings bound reusable
/// connections per host, evict idle ones, and control TCP keep-alive.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct PoolConfig {
    pub max_connections_per_host: usize,
    pub idle_timeout_ms: u64,
    pub keep_alive: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections_per_host: 6,
            idle_timeout_ms: 90_000,
            keep_alive: true,
        }
    }
}

/// Configures the HTTP client.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ReqwestClientConfig {
    /// This string is appended to the user agent. It is provided so
    /// library users may identify their programs.
    pub user_agent_suffix: String,

    /// If set to true, connections will be required to use HTTPS.
    pub https_only: bool,

    /// If set to true, invalid host names will be accepted.
    pub accept_invalid_host_names: bool,

    /// If set to true, invalid certificates will be accepted.
    pub accept_invalid_certificates: bool,
}

impl Default for ReqwestClientConfig {
    fn default() -> Self {
        Self {
            user_agent_suffix: "library".to_string(),
            https_only: true,
            accept_invalid_host_names: false,
            accept_invalid_certificates: false,
        }
    }
}

/// Creates an HTTP client using Reqwest. The Reqwest client holds its
/// own connection pools, so one client per [`crate::client::RdapClient`]
/// is all that is needed.
///
/// Redirects are not followed by the Reqwest client; the fetch pipeline
/// walks them manually so every hop passes the SSRF guard.
pub fn create_reqwest_client(
    config: &ReqwestClientConfig,
    timeout_ms: u64,
    pool: &PoolConfig,
    compression: &CompressionConfig,
    proxy: Option<&ProxyConfig>,
) -> Result<reqwest::Client, RdapClientError> {
    let mut default_headers = header::HeaderMap::new();
    default_headers.insert(ACCEPT, HeaderValue::from_static(RDAP_ACCEPT_HEADER));
    if let Some(accept_encoding) = compression.accept_encoding() {
        // constructed from fixed encoding names; always a valid value
        let value = HeaderValue::from_str(&accept_encoding)
            .expect("unparseable accept-encoding value");
        default_headers.insert(ACCEPT_ENCODING, value);
    }

    let mut client = reqwest::Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .user_agent(format!(
            "rdapify client {VERSION} {}",
            config.user_agent_suffix
        ))
        .redirect(reqwest::redirect::Policy::none())
        .https_only(config.https_only)
        .danger_accept_invalid_hostnames(config.accept_invalid_host_names)
        .danger_accept_invalid_certs(config.accept_invalid_certificates)
        .pool_max_idle_per_host(pool.max_connections_per_host)
        .pool_idle_timeout(Duration::from_millis(pool.idle_timeout_ms));

    if pool.keep_alive {
        client = client.tcp_keepalive(Duration::from_secs(60));
    }
    if let Some(proxy) = proxy {
        client = client.proxy(proxy.to_proxy()?);
    }

    let client = client.default_headers(default_headers).build()?;
    Ok(client)
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::{create_reqwest_client, ReqwestClientConfig};
    use crate::http::CompressionConfig;

    #[tokio::test]
    async fn GIVEN_default_configs_WHEN_create_client_THEN_builds() {
        // GIVEN
        let config = ReqwestClientConfig::default();
        let compression = CompressionConfig::default();

        // WHEN
        let actual =
            create_reqwest_client(&config, 30_000, &super::PoolConfig::default(), &compression, None);

        // THEN
        assert!(actual.is_ok());
    }

    #[test]
    fn GIVEN_unknown_key_WHEN_deserialize_config_THEN_rejected() {
        // GIVEN
        let json = r#"{"httpsOnly": true, "nope": 1}"#;

        // WHEN
        let actual = serde_json::from_str::<ReqwestClientConfig>(json);

        // THEN
        assert!(actual.is_err());
    }
}
