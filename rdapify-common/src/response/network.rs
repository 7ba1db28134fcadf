//! RDAP IP Network Object Class.

use serde::{Deserialize, Serialize};

use super::{Common, ObjectCommon};

/// A CIDR from the Cidr0 extension.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum Cidr0Cidr {
    V4Cidr(V4Cidr),
    V6Cidr(V6Cidr),
}

/// Represents a CIDR0 V4 CIDR.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct V4Cidr {
    pub v4prefix: Option<String>,
    pub length: Option<u8>,
}

/// Represents a CIDR0 V6 CIDR.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct V6Cidr {
    pub v6prefix: Option<String>,
    pub length: Option<u8>,
}

impl std::fmt::Display for Cidr0Cidr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::V4Cidr(cidr) => write!(
                f,
                "{}/{}",
                cidr.v4prefix.as_deref().unwrap_or("not_given"),
                cidr.length.map_or("not_given".to_string(), |l| l.to_string())
            ),
            Self::V6Cidr(cidr) => write!(
                f,
                "{}/{}",
                cidr.v6prefix.as_deref().unwrap_or("not_given"),
                cidr.length.map_or("not_given".to_string(), |l| l.to_string())
            ),
        }
    }
}

/// Represents an RDAP IP network lookup response.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Network {
    #[serde(flatten)]
    pub common: Common,

    #[serde(flatten)]
    pub object_common: ObjectCommon,

    #[serde(rename = "startAddress")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_address: Option<String>,

    #[serde(rename = "endAddress")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_address: Option<String>,

    #[serde(rename = "ipVersion")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "type")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_type: Option<String>,

    #[serde(rename = "parentHandle")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_handle: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cidr0_cidrs: Option<Vec<Cidr0Cidr>>,
}
