//! Autnum normalization.

use std::str::FromStr;

use reqwest::Url;
use serde_json::Value;

use rdapify_common::{asn_types::AsnKey, normalized::AutnumData, response::Autnum};

use super::entity::normalize_entities;
use super::{normalize_events, normalize_links};
use crate::RdapClientError;

pub(crate) fn normalize_autnum(
    autnum: Autnum,
    base: Option<&Url>,
    raw_response: Option<Value>,
) -> Result<AutnumData, RdapClientError> {
    let handle = autnum.object_common.handle.clone();
    // some registries only put the number in the handle, e.g. "AS15169"
    let handle_number = handle
        .as_deref()
        .and_then(|h| AsnKey::from_str(h).ok())
        .map(|k| k.value());
    let (start_autnum, end_autnum) = match (autnum.start_autnum, autnum.end_autnum) {
        (Some(start), Some(end)) => (start, end),
        (Some(only), None) | (None, Some(only)) => (only, only),
        (None, None) => match handle_number {
            Some(n) => (n, n),
            None => {
                return Err(RdapClientError::Protocol {
                    message: "autnum response has no startAutnum or endAutnum".to_string(),
                })
            }
        },
    };
    if start_autnum > end_autnum {
        return Err(RdapClientError::Protocol {
            message: format!("incoherent autnum range {start_autnum}-{end_autnum}"),
        });
    }
    Ok(AutnumData {
        handle,
        start_autnum,
        end_autnum,
        name: autnum.name,
        autnum_type: autnum.autnum_type,
        country: autnum.country,
        status: autnum.object_common.status.unwrap_or_default(),
        events: normalize_events(autnum.object_common.events),
        entities: normalize_entities(autnum.object_common.entities.as_ref()),
        links: normalize_links(autnum.object_common.links, base),
        rdap_conformance: autnum.common.rdap_conformance.unwrap_or_default(),
        raw_response,
    })
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use rdapify_common::response::Autnum;

    use super::normalize_autnum;

    #[test]
    fn GIVEN_rir_payload_WHEN_normalize_THEN_uniform_shape() {
        // GIVEN
        let json = r#"
        {
          "objectClassName": "autnum",
          "handle": "AS15169",
          "startAutnum": 15169,
          "endAutnum": 15169,
          "name": "GOOGLE"
        }
        "#;
        let autnum = serde_json::from_str::<Autnum>(json).expect("parsing autnum");

        // WHEN
        let actual = normalize_autnum(autnum, None, None).expect("normalizing");

        // THEN
        assert_eq!(actual.start_autnum, 15169);
        assert_eq!(actual.end_autnum, 15169);
        assert_eq!(actual.name.as_deref(), Some("GOOGLE"));
    }

    #[test]
    fn GIVEN_only_handle_WHEN_normalize_THEN_number_parsed_from_handle() {
        // GIVEN
        let json = r#"{ "objectClassName": "autnum", "handle": "AS15169" }"#;
        let autnum = serde_json::from_str::<Autnum>(json).expect("parsing autnum");

        // WHEN
        let actual = normalize_autnum(autnum, None, None).expect("normalizing");

        // THEN
        assert_eq!(actual.start_autnum, 15169);
        assert_eq!(actual.end_autnum, 15169);
    }

    #[test]
    fn GIVEN_no_numbers_anywhere_WHEN_normalize_THEN_protocol_error() {
        // GIVEN
        let json = r#"{ "objectClassName": "autnum", "handle": "WEIRD-HANDLE" }"#;
        let autnum = serde_json::from_str::<Autnum>(json).expect("parsing autnum");

        // WHEN
        let actual = normalize_autnum(autnum, None, None);

        // THEN
        assert!(actual.is_err());
    }

    #[test]
    fn GIVEN_inverted_range_WHEN_normalize_THEN_protocol_error() {
        // GIVEN
        let json = r#"
        {
          "objectClassName": "autnum",
          "startAutnum": 20,
          "endAutnum": 10
        }
        "#;
        let autnum = serde_json::from_str::<Autnum>(json).expect("parsing autnum");

        // WHEN
        let actual = normalize_autnum(autnum, None, None);

        // THEN
        assert!(actual.is_err());
    }
}
