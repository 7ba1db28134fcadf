//! Fetching IANA RDAP bootstrap registry files.

use rdapify_common::{
    httpdata::HttpData,
    iana::{IanaRegistryType, RdapBootstrapRegistry},
};

use crate::http::{wrapped_request, Client};
use crate::{QueryContext, RdapClientError};

/// Response from getting an IANA registry.
#[derive(Debug, Clone)]
pub struct IanaResponse {
    pub registry: RdapBootstrapRegistry,
    pub registry_type: IanaRegistryType,
    pub http_data: HttpData,
}

/// Issues the HTTP request to get an IANA registry.
///
/// The URL usually comes from [`IanaRegistryType::url`] but may be a
/// configured override. Download and parse failures surface as
/// bootstrap errors; only cancellation keeps its own kind.
pub async fn iana_request(
    registry_type: IanaRegistryType,
    url: &str,
    client: &Client,
    ctx: &QueryContext,
) -> Result<IanaResponse, RdapClientError> {
    let wrapped_response = wrapped_request(url, client, ctx)
        .await
        .map_err(to_bootstrap_error)?;
    let registry: RdapBootstrapRegistry =
        serde_json::from_str(&wrapped_response.text).map_err(|e| RdapClientError::Bootstrap {
            message: format!("cannot parse {}: {e}", registry_type.file_name()),
        })?;
    Ok(IanaResponse {
        registry,
        registry_type,
        http_data: wrapped_response.http_data,
    })
}

fn to_bootstrap_error(err: RdapClientError) -> RdapClientError {
    match err {
        RdapClientError::Cancelled => RdapClientError::Cancelled,
        other => RdapClientError::Bootstrap {
            message: other.to_string(),
        },
    }
}
