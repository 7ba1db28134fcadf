//! Conversion of raw RDAP documents into the normalized response shape.
//!
//! The typed parse ([`RdapResponse`]) tolerates what loose servers send;
//! this module maps it onto the uniform model: events with unparseable
//! dates are dropped, link relations are lowercased, relative link
//! targets are resolved against the origin server, and entity contact
//! data is lifted out of jCards. Nothing missing upstream is fabricated.

use reqwest::Url;
use serde_json::Value;

use rdapify_common::{
    normalized::{EventData, LinkData, ObjectClass, RdapData},
    response::{Events, Links, RdapResponse},
};

use crate::RdapClientError;

pub(crate) mod autnum;
pub(crate) mod domain;
pub(crate) mod entity;
pub(crate) mod network;

/// Normalizes a raw RDAP document.
///
/// The document must carry the expected object class; anything else is
/// a protocol error. When `include_raw` is set, the verbatim decoded
/// JSON rides along on the result.
pub fn normalize(
    raw: Value,
    expected: ObjectClass,
    server_url: &str,
    include_raw: bool,
) -> Result<RdapData, RdapClientError> {
    let base = Url::parse(server_url).ok();
    let parsed = RdapResponse::try_from(raw.clone())?;
    let raw_response = include_raw.then_some(raw);
    match (parsed, expected) {
        (RdapResponse::Domain(d), ObjectClass::Domain) => Ok(RdapData::Domain(
            domain::normalize_domain(d, base.as_ref(), raw_response)?,
        )),
        (RdapResponse::Network(n), ObjectClass::IpNetwork) => Ok(RdapData::Network(
            network::normalize_network(n, base.as_ref(), raw_response)?,
        )),
        (RdapResponse::Autnum(a), ObjectClass::Autnum) => Ok(RdapData::Autnum(
            autnum::normalize_autnum(a, base.as_ref(), raw_response)?,
        )),
        (other, expected) => Err(RdapClientError::Protocol {
            message: format!("expected a {expected} response, server returned {other}"),
        }),
    }
}

/// Maps raw events, dropping any whose date does not parse as RFC 3339.
pub(crate) fn normalize_events(events: Option<Events>) -> Vec<EventData> {
    events
        .unwrap_or_default()
        .into_iter()
        .filter_map(|event| {
            let action = event.event_action?;
            let date = event.event_date.as_deref()?;
            let date = chrono::DateTime::parse_from_rfc3339(date)
                .ok()?
                .with_timezone(&chrono::Utc);
            Some(EventData {
                action,
                date,
                actor: event.event_actor,
            })
        })
        .collect()
}

/// Maps raw links: `rel` lowercased, relative targets resolved against
/// the origin server, linkless entries dropped.
pub(crate) fn normalize_links(links: Option<Links>, base: Option<&Url>) -> Vec<LinkData> {
    links
        .unwrap_or_default()
        .into_iter()
        .filter_map(|link| {
            let href = link.href?;
            let href = match (Url::parse(&href), base) {
                (Ok(absolute), _) => absolute.to_string(),
                (Err(_e), Some(base)) => base.join(&href).ok()?.to_string(),
                (Err(_e), None) => return None,
            };
            Some(LinkData {
                href,
                rel: link.rel.map(|rel| rel.to_lowercase()),
                media_type: link.media_type,
                hreflang: link.hreflang.unwrap_or_default(),
            })
        })
        .collect()
}
