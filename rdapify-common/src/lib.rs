#![allow(rustdoc::bare_urls)]
#![doc = include_str!("../README.md")]
pub mod asn_types;
pub mod contact;
pub mod dns_types;
pub mod httpdata;
pub mod iana;
pub mod ip_types;
pub mod media_types;
pub mod normalized;
pub mod response;

#[cfg(debug_assertions)]
use const_format::formatcp;

/// Version of this software.
#[cfg(not(debug_assertions))]
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version of this software.
#[cfg(debug_assertions)]
pub const VERSION: &str = formatcp!("{}_DEV_BUILD", env!("CARGO_PKG_VERSION"));

/// Things that are nice to have around.
pub mod prelude {
    #[doc(inline)]
    pub use crate::{
        asn_types::{AsnKey, AsnRange},
        contact::Contact,
        dns_types::DomainName,
        httpdata::HttpData,
        iana::{IanaRegistryType, RdapBootstrapRegistry},
        ip_types::{IpKey, IpVersion},
        media_types::{JSON_MEDIA_TYPE, RDAP_ACCEPT_HEADER, RDAP_MEDIA_TYPE},
        normalized::{
            AutnumData, DomainData, EntityData, EventData, LinkData, NetworkData, ObjectClass,
            RdapData, SecureDnsData,
        },
        response::RdapResponse,
        VERSION,
    };
}
