//! RDAP Nameserver Object Class.

use serde::{Deserialize, Serialize};

use super::{Common, ObjectCommon};

/// The IP addresses of a nameserver.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct IpAddresses {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v4: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub v6: Option<Vec<String>>,
}

/// Represents an RDAP nameserver response.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Nameserver {
    #[serde(flatten)]
    pub common: Common,

    #[serde(flatten)]
    pub object_common: ObjectCommon,

    #[serde(rename = "ldhName")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ldh_name: Option<String>,

    #[serde(rename = "unicodeName")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unicode_name: Option<String>,

    #[serde(rename = "ipAddresses")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_addresses: Option<IpAddresses>,
}
