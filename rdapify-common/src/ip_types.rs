//! IP address key parsing and canonicalization.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::Display;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IpKeyError {
    #[error("Invalid IP address")]
    InvalidIpAddress,
    #[error("Zone identifier on an IPv4 address")]
    ZoneOnIpv4,
}

/// The IP protocol version of an address or network.
#[derive(Serialize, Deserialize, Display, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IpVersion {
    #[serde(rename = "v4")]
    #[strum(serialize = "v4")]
    V4,
    #[serde(rename = "v6")]
    #[strum(serialize = "v6")]
    V6,
}

/// A validated IP address query key.
///
/// IPv4 addresses must be dotted-quads without extra leading zeros; IPv6
/// addresses are accepted in any RFC 5952 form and canonicalized. A
/// trailing `%zone` on an IPv6 address is parsed off and retained for
/// diagnostics only; it is never sent upstream.
///
/// ```rust
/// use std::str::FromStr;
/// use rdapify_common::ip_types::IpKey;
///
/// let key = IpKey::from_str("2001:DB8:0:0:0:0:0:1").unwrap();
/// assert_eq!(key.to_string(), "2001:db8::1");
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct IpKey {
    addr: IpAddr,
    zone: Option<String>,
}

impl IpKey {
    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    pub fn version(&self) -> IpVersion {
        match self.addr {
            IpAddr::V4(_) => IpVersion::V4,
            IpAddr::V6(_) => IpVersion::V6,
        }
    }

    /// The zone identifier stripped from the input, if any.
    pub fn zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }
}

impl fmt::Display for IpKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.addr.fmt(f)
    }
}

impl FromStr for IpKey {
    type Err = IpKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return Err(IpKeyError::InvalidIpAddress);
        }
        let (addr_part, zone) = match trimmed.split_once('%') {
            Some((addr, zone)) if !zone.is_empty() => (addr, Some(zone.to_string())),
            Some(_) => return Err(IpKeyError::InvalidIpAddress),
            None => (trimmed, None),
        };
        let addr = IpAddr::from_str(addr_part).map_err(|_e| IpKeyError::InvalidIpAddress)?;
        if addr.is_ipv4() && zone.is_some() {
            return Err(IpKeyError::ZoneOnIpv4);
        }
        Ok(Self { addr, zone })
    }
}
