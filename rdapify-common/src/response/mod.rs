//! Raw RDAP response structures for parsing RFC 9083 documents.
//!
//! These types mirror the wire format, so every field an RDAP server may
//! omit is optional. The client's normalizer converts them into the
//! [`crate::normalized`] model returned to callers.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::Display;
use thiserror::Error;

#[doc(inline)]
pub use autnum::*;
#[doc(inline)]
pub use domain::*;
#[doc(inline)]
pub use entity::*;
#[doc(inline)]
pub use nameserver::*;
#[doc(inline)]
pub use network::*;
#[doc(inline)]
pub use obj_common::*;
#[doc(inline)]
pub use types::*;

pub(crate) mod autnum;
pub(crate) mod domain;
pub(crate) mod entity;
pub(crate) mod nameserver;
pub(crate) mod network;
pub(crate) mod obj_common;
pub(crate) mod types;

/// An error caused by processing an RDAP response.
#[derive(Debug, Error)]
pub enum RdapResponseError {
    /// The JSON type is incorrect.
    #[error("Wrong JSON type: {0}")]
    WrongJsonType(String),

    /// The object class of the response is not one this library handles.
    #[error("Unknown RDAP object class: {0}")]
    UnknownObjectClass(String),

    /// The response has no `objectClassName` member.
    #[error("No object class name in RDAP response")]
    NoObjectClass,

    /// An error has occurred parsing the JSON.
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

/// The types of RDAP lookup response.
///
/// It can be parsed from JSON using serde:
///
/// ```rust
/// use rdapify_common::response::RdapResponse;
///
/// let json = r#"
///   {
///     "objectClassName": "ip network",
///     "startAddress": "10.0.0.0",
///     "endAddress": "10.0.255.255",
///     "ipVersion": "v4"
///   }
/// "#;
///
/// let rdap: RdapResponse = serde_json::from_str(json).unwrap();
/// assert!(matches!(rdap, RdapResponse::Network(_)));
/// ```
#[derive(Serialize, Deserialize, Clone, Display, PartialEq, Debug)]
#[serde(untagged, try_from = "Value")]
pub enum RdapResponse {
    Domain(Domain),
    Entity(Entity),
    Nameserver(Nameserver),
    Autnum(Autnum),
    Network(Network),
}

impl TryFrom<Value> for RdapResponse {
    type Error = RdapResponseError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let object = value.as_object().ok_or_else(|| {
            RdapResponseError::WrongJsonType("response is not an object".to_string())
        })?;
        let class = object
            .get("objectClassName")
            .ok_or(RdapResponseError::NoObjectClass)?
            .as_str()
            .ok_or_else(|| {
                RdapResponseError::WrongJsonType("'objectClassName' is not a string".to_string())
            })?;
        match class {
            "domain" => Ok(Self::Domain(serde_json::from_value(value)?)),
            "entity" => Ok(Self::Entity(serde_json::from_value(value)?)),
            "nameserver" => Ok(Self::Nameserver(serde_json::from_value(value)?)),
            "autnum" => Ok(Self::Autnum(serde_json::from_value(value)?)),
            "ip network" => Ok(Self::Network(serde_json::from_value(value)?)),
            _ => Err(RdapResponseError::UnknownObjectClass(class.to_string())),
        }
    }
}
