//! The normalized, uniform response shape returned to callers.
//!
//! Upstream RDAP documents are loosely typed and full of optional
//! members. These types present one predictable shape per object class;
//! fields missing upstream stay absent and are never fabricated. The
//! `rawResponse` member is attached only when the caller opted in and
//! always carries the verbatim decoded JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::Display;

use crate::ip_types::IpVersion;

#[doc(inline)]
pub use crate::response::SecureDns as SecureDnsData;

/// The three object classes this library resolves.
#[derive(Serialize, Deserialize, Display, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectClass {
    #[serde(rename = "domain")]
    #[strum(serialize = "domain")]
    Domain,

    #[serde(rename = "ip network")]
    #[strum(serialize = "ip network")]
    IpNetwork,

    #[serde(rename = "autnum")]
    #[strum(serialize = "autnum")]
    Autnum,
}

/// A normalized RDAP response, tagged by its object class.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "objectClass")]
pub enum RdapData {
    #[serde(rename = "domain")]
    Domain(DomainData),

    #[serde(rename = "ip network")]
    Network(NetworkData),

    #[serde(rename = "autnum")]
    Autnum(AutnumData),
}

impl RdapData {
    pub fn object_class(&self) -> ObjectClass {
        match self {
            Self::Domain(_) => ObjectClass::Domain,
            Self::Network(_) => ObjectClass::IpNetwork,
            Self::Autnum(_) => ObjectClass::Autnum,
        }
    }

    pub fn entities(&self) -> &[EntityData] {
        match self {
            Self::Domain(d) => &d.entities,
            Self::Network(n) => &n.entities,
            Self::Autnum(a) => &a.entities,
        }
    }

    pub fn raw_response(&self) -> Option<&Value> {
        match self {
            Self::Domain(d) => d.raw_response.as_ref(),
            Self::Network(n) => n.raw_response.as_ref(),
            Self::Autnum(a) => a.raw_response.as_ref(),
        }
    }
}

/// A normalized event.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EventData {
    /// The event action, preserved verbatim even when unknown.
    pub action: String,

    /// The event date. Events whose upstream date cannot be parsed are
    /// dropped during normalization rather than coerced.
    pub date: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

/// A normalized entity. Recursive: registrars carry their own contacts.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct EntityData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<EntityData>,
}

/// A normalized link.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LinkData {
    pub href: String,

    /// The link relation, lowercased.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,

    #[serde(rename = "type")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hreflang: Vec<String>,
}

/// A normalized domain lookup response.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct DomainData {
    #[serde(rename = "ldhName")]
    pub ldh_name: String,

    #[serde(rename = "unicodeName")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unicode_name: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub status: Vec<String>,

    /// Nameserver LDH names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nameservers: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EventData>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<EntityData>,

    #[serde(rename = "secureDNS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure_dns: Option<SecureDnsData>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<LinkData>,

    #[serde(rename = "port43")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port43: Option<String>,

    #[serde(rename = "rdapConformance")]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rdap_conformance: Vec<String>,

    #[serde(rename = "rawResponse")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<Value>,
}

/// A normalized IP network lookup response.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NetworkData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,

    #[serde(rename = "startAddress")]
    pub start_address: String,

    #[serde(rename = "endAddress")]
    pub end_address: String,

    #[serde(rename = "ipVersion")]
    pub ip_version: IpVersion,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "type")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(rename = "parentHandle")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_handle: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub status: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EventData>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<EntityData>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<LinkData>,

    /// CIDRs from the Cidr0 extension, carried through but never
    /// synthesized.
    #[serde(rename = "cidr0_cidrs")]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cidrs: Vec<String>,

    #[serde(rename = "rdapConformance")]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rdap_conformance: Vec<String>,

    #[serde(rename = "rawResponse")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<Value>,
}

/// A normalized autnum lookup response.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct AutnumData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,

    #[serde(rename = "startAutnum")]
    pub start_autnum: u32,

    #[serde(rename = "endAutnum")]
    pub end_autnum: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "type")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autnum_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub status: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EventData>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<EntityData>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<LinkData>,

    #[serde(rename = "rdapConformance")]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rdap_conformance: Vec<String>,

    #[serde(rename = "rawResponse")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<Value>,
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::{DomainData, ObjectClass, RdapData};

    #[test]
    fn GIVEN_domain_data_WHEN_serialize_THEN_tagged_with_object_class() {
        // GIVEN
        let data = RdapData::Domain(DomainData {
            ldh_name: "example.com".to_string(),
            ..Default::default()
        });

        // WHEN
        let json = serde_json::to_value(&data).expect("serializing");

        // THEN
        assert_eq!(json["objectClass"], "domain");
        assert_eq!(json["ldhName"], "example.com");
        assert_eq!(data.object_class(), ObjectClass::Domain);
    }

    #[test]
    fn GIVEN_tagged_json_WHEN_deserialize_THEN_correct_variant() {
        // GIVEN
        let json = r#"{"objectClass": "domain", "ldhName": "example.com"}"#;

        // WHEN
        let actual = serde_json::from_str::<RdapData>(json).expect("deserializing");

        // THEN
        assert!(matches!(actual, RdapData::Domain(_)));
    }

    #[test]
    fn GIVEN_object_class_WHEN_display_THEN_rdap_names() {
        // GIVEN in parameters

        // WHEN/THEN
        assert_eq!(ObjectClass::Domain.to_string(), "domain");
        assert_eq!(ObjectClass::IpNetwork.to_string(), "ip network");
        assert_eq!(ObjectClass::Autnum.to_string(), "autnum");
    }
}
