//! IP network normalization.

use std::net::IpAddr;
use std::str::FromStr;

use reqwest::Url;
use serde_json::Value;

use rdapify_common::{ip_types::IpVersion, normalized::NetworkData, response::Network};

use super::entity::normalize_entities;
use super::{normalize_events, normalize_links};
use crate::RdapClientError;

pub(crate) fn normalize_network(
    network: Network,
    base: Option<&Url>,
    raw_response: Option<Value>,
) -> Result<NetworkData, RdapClientError> {
    let start_address = network
        .start_address
        .clone()
        .ok_or_else(|| RdapClientError::Protocol {
            message: "ip network response has no startAddress".to_string(),
        })?;
    let end_address = network
        .end_address
        .clone()
        .ok_or_else(|| RdapClientError::Protocol {
            message: "ip network response has no endAddress".to_string(),
        })?;
    let start = parse_address(&start_address)?;
    let end = parse_address(&end_address)?;
    // the version comes from the address family itself, and the range
    // must be coherent
    let ip_version = match (start, end) {
        (IpAddr::V4(s), IpAddr::V4(e)) if s <= e => IpVersion::V4,
        (IpAddr::V6(s), IpAddr::V6(e)) if s <= e => IpVersion::V6,
        _ => {
            return Err(RdapClientError::Protocol {
                message: format!("incoherent address range {start_address}-{end_address}"),
            })
        }
    };
    let cidrs = network
        .cidr0_cidrs
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|cidr| cidr.to_string())
        .collect();
    Ok(NetworkData {
        handle: network.object_common.handle.clone(),
        start_address: start.to_string(),
        end_address: end.to_string(),
        ip_version,
        name: network.name,
        network_type: network.network_type,
        country: network.country,
        parent_handle: network.parent_handle,
        status: network.object_common.status.unwrap_or_default(),
        events: normalize_events(network.object_common.events),
        entities: normalize_entities(network.object_common.entities.as_ref()),
        links: normalize_links(network.object_common.links, base),
        cidrs,
        rdap_conformance: network.common.rdap_conformance.unwrap_or_default(),
        raw_response,
    })
}

fn parse_address(address: &str) -> Result<IpAddr, RdapClientError> {
    IpAddr::from_str(address.trim()).map_err(|_e| RdapClientError::Protocol {
        message: format!("unparseable address {address} in ip network response"),
    })
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use rdapify_common::ip_types::IpVersion;
    use rdapify_common::response::Network;

    use super::normalize_network;

    #[test]
    fn GIVEN_rir_payload_WHEN_normalize_THEN_uniform_shape() {
        // GIVEN
        let json = r#"
        {
          "objectClassName": "ip network",
          "handle": "NET-8-8-8-0-1",
          "startAddress": "8.8.8.0",
          "endAddress": "8.8.8.255",
          "ipVersion": "v4",
          "name": "LVLT-GOGL-8-8-8",
          "type": "ALLOCATION",
          "country": "US",
          "cidr0_cidrs": [ { "v4prefix": "8.8.8.0", "length": 24 } ]
        }
        "#;
        let network = serde_json::from_str::<Network>(json).expect("parsing network");

        // WHEN
        let actual = normalize_network(network, None, None).expect("normalizing");

        // THEN
        assert_eq!(actual.start_address, "8.8.8.0");
        assert_eq!(actual.end_address, "8.8.8.255");
        assert_eq!(actual.ip_version, IpVersion::V4);
        assert_eq!(actual.country.as_deref(), Some("US"));
        assert_eq!(actual.cidrs, vec!["8.8.8.0/24".to_string()]);
    }

    #[test]
    fn GIVEN_inverted_range_WHEN_normalize_THEN_protocol_error() {
        // GIVEN
        let json = r#"
        {
          "objectClassName": "ip network",
          "startAddress": "8.8.8.255",
          "endAddress": "8.8.8.0"
        }
        "#;
        let network = serde_json::from_str::<Network>(json).expect("parsing network");

        // WHEN
        let actual = normalize_network(network, None, None);

        // THEN
        assert!(actual.is_err());
    }

    #[test]
    fn GIVEN_mixed_families_WHEN_normalize_THEN_protocol_error() {
        // GIVEN
        let json = r#"
        {
          "objectClassName": "ip network",
          "startAddress": "8.8.8.0",
          "endAddress": "2001:db8::1"
        }
        "#;
        let network = serde_json::from_str::<Network>(json).expect("parsing network");

        // WHEN
        let actual = normalize_network(network, None, None);

        // THEN
        assert!(actual.is_err());
    }

    #[test]
    fn GIVEN_v6_range_WHEN_normalize_THEN_version_inferred() {
        // GIVEN
        let json = r#"
        {
          "objectClassName": "ip network",
          "startAddress": "2001:db8::",
          "endAddress": "2001:db8:ffff:ffff:ffff:ffff:ffff:ffff"
        }
        "#;
        let network = serde_json::from_str::<Network>(json).expect("parsing network");

        // WHEN
        let actual = normalize_network(network, None, None).expect("normalizing");

        // THEN
        assert_eq!(actual.ip_version, IpVersion::V6);
    }
}
