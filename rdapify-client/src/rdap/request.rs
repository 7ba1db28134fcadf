//! Functions to make RDAP requests.

use serde_json::Value;

use rdapify_common::httpdata::HttpData;

use crate::http::{wrapped_request, Client};
use crate::iana::{bootstrap_url_for, BootstrapConfig, MemoryBootstrapStore};
use crate::{QueryContext, RdapClientError};

use super::qtype::QueryType;

/// The data returned from an RDAP request: the decoded JSON document
/// and the HTTP response metadata.
#[derive(Debug, Clone)]
pub struct ResponseData {
    pub json: Value,
    pub http_data: HttpData,
}

/// Makes an RDAP request with a full RDAP URL.
///
/// The URL goes through the whole fetch pipeline: SSRF guard, rate
/// limiting, circuit breaking, retries, and redirect hops.
pub async fn rdap_url_request(
    url: &str,
    client: &Client,
    ctx: &QueryContext,
) -> Result<ResponseData, RdapClientError> {
    let wrapped_response = wrapped_request(url, client, ctx).await?;
    let json: Value = serde_json::from_str(&wrapped_response.text)?;
    Ok(ResponseData {
        json,
        http_data: wrapped_response.http_data,
    })
}

/// Makes an RDAP request against a known base URL.
pub async fn rdap_request(
    base_url: &str,
    query_type: &QueryType,
    client: &Client,
    ctx: &QueryContext,
) -> Result<ResponseData, RdapClientError> {
    let url = query_type.query_url(base_url);
    rdap_url_request(&url, client, ctx).await
}

/// Makes an RDAP request using bootstrapping.
///
/// The authoritative server is discovered through the bootstrap store,
/// which is populated from the IANA registries as needed. Keep the
/// store in the same scope as the client; a fresh store per request
/// would re-download the registry every time.
pub async fn rdap_bootstrapped_request(
    query_type: &QueryType,
    client: &std::sync::Arc<Client>,
    store: &std::sync::Arc<MemoryBootstrapStore>,
    config: &BootstrapConfig,
    ctx: &QueryContext,
) -> Result<ResponseData, RdapClientError> {
    let base_url = bootstrap_url_for(
        query_type,
        client,
        store,
        config,
        ctx,
        ctx.cancel.clone(),
    )
    .await?;
    rdap_request(&base_url, query_type, client, ctx).await
}
