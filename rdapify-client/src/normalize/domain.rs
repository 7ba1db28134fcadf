//! Domain normalization.

use reqwest::Url;
use serde_json::Value;

use rdapify_common::{normalized::DomainData, response::Domain};

use super::entity::normalize_entities;
use super::{normalize_events, normalize_links};
use crate::RdapClientError;

pub(crate) fn normalize_domain(
    domain: Domain,
    base: Option<&Url>,
    raw_response: Option<Value>,
) -> Result<DomainData, RdapClientError> {
    let ldh_name = domain
        .ldh_name
        .clone()
        .or_else(|| domain.unicode_name.clone())
        .ok_or_else(|| RdapClientError::Protocol {
            message: "domain response has no ldhName or unicodeName".to_string(),
        })?;
    let nameservers = domain
        .nameservers
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter_map(|ns| ns.ldh_name.clone().or_else(|| ns.unicode_name.clone()))
        .collect();
    Ok(DomainData {
        ldh_name,
        unicode_name: domain.unicode_name,
        status: domain.object_common.status.unwrap_or_default(),
        nameservers,
        events: normalize_events(domain.object_common.events),
        entities: normalize_entities(domain.object_common.entities.as_ref()),
        secure_dns: domain.secure_dns,
        links: normalize_links(domain.object_common.links, base),
        port43: domain.object_common.port_43,
        rdap_conformance: domain.common.rdap_conformance.unwrap_or_default(),
        raw_response,
    })
}
