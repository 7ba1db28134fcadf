//! The IANA RDAP bootstrap registry format and lookups.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::net::{Ipv4Addr, Ipv6Addr};

use ipnet::{Ipv4Net, Ipv6Net};
use prefix_trie::PrefixMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The four bootstrap registries published by IANA.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IanaRegistryType {
    RdapBootstrapDns,
    RdapBootstrapAsn,
    RdapBootstrapIpv4,
    RdapBootstrapIpv6,
}

impl IanaRegistryType {
    /// The URL of the registry file as published by IANA.
    pub fn url(&self) -> &'static str {
        match self {
            Self::RdapBootstrapDns => "https://data.iana.org/rdap/dns.json",
            Self::RdapBootstrapAsn => "https://data.iana.org/rdap/asn.json",
            Self::RdapBootstrapIpv4 => "https://data.iana.org/rdap/ipv4.json",
            Self::RdapBootstrapIpv6 => "https://data.iana.org/rdap/ipv6.json",
        }
    }

    /// The file name of the registry.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::RdapBootstrapDns => "dns.json",
            Self::RdapBootstrapAsn => "asn.json",
            Self::RdapBootstrapIpv4 => "ipv4.json",
            Self::RdapBootstrapIpv6 => "ipv6.json",
        }
    }
}

/// A bootstrap registry file as published by IANA.
///
/// Each service is a two-element array: an array of match tokens (TLD
/// labels, CIDR prefixes, or ASN ranges depending on the registry)
/// followed by an array of RDAP base URLs.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RdapBootstrapRegistry {
    pub version: String,
    pub publication: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub services: Vec<Vec<Vec<String>>>,
}

#[derive(Debug, Error)]
pub enum BootstrapRegistryError {
    #[error("Empty Service")]
    EmptyService,
    #[error("Empty URL Set")]
    EmptyUrlSet,
    #[error("Invalid Bootstrap Service")]
    InvalidBootstrapService,
    #[error("No Bootstrap URLs Found")]
    NoMatch,
}

impl RdapBootstrapRegistry {
    /// Finds the service URLs for a domain name by its right-most label.
    ///
    /// An empty match token denotes the root and matches any name that
    /// no other token matched.
    pub fn dns_urls(&self, ldh: &str) -> Result<Vec<String>, BootstrapRegistryError> {
        let tld = ldh.rsplit('.').next().unwrap_or(ldh);
        let mut root_urls: Option<&Vec<String>> = None;
        for service in &self.services {
            let tlds = service.first().ok_or(BootstrapRegistryError::EmptyService)?;
            let urls = service.last().ok_or(BootstrapRegistryError::EmptyUrlSet)?;
            for token in tlds {
                if token.eq_ignore_ascii_case(tld) {
                    return Ok(urls.to_owned());
                }
                if token.is_empty() {
                    root_urls = Some(urls);
                }
            }
        }
        root_urls
            .map(|urls| urls.to_owned())
            .ok_or(BootstrapRegistryError::NoMatch)
    }

    /// Finds the service URLs for an autonomous system number.
    ///
    /// Match tokens are inclusive decimal ranges of the form
    /// `"start-end"`; a bare number denotes a single-element range.
    pub fn asn_urls(&self, autnum: u32) -> Result<Vec<String>, BootstrapRegistryError> {
        for service in &self.services {
            let ranges = service.first().ok_or(BootstrapRegistryError::EmptyService)?;
            for range in ranges {
                let mut split = range.splitn(2, '-');
                let start = split
                    .next()
                    .ok_or(BootstrapRegistryError::InvalidBootstrapService)?
                    .parse::<u32>()
                    .map_err(|_e| BootstrapRegistryError::InvalidBootstrapService)?;
                let end = match split.next() {
                    Some(end) => end
                        .parse::<u32>()
                        .map_err(|_e| BootstrapRegistryError::InvalidBootstrapService)?,
                    None => start,
                };
                if start <= autnum && autnum <= end {
                    let urls = service.last().ok_or(BootstrapRegistryError::EmptyUrlSet)?;
                    return Ok(urls.to_owned());
                }
            }
        }
        Err(BootstrapRegistryError::NoMatch)
    }

    /// Finds the service URLs for an IPv4 address by longest prefix match.
    pub fn ipv4_urls(&self, addr: Ipv4Addr) -> Result<Vec<String>, BootstrapRegistryError> {
        let mut pm: PrefixMap<Ipv4Net, Vec<String>> = PrefixMap::new();
        for service in &self.services {
            let urls = service.last().ok_or(BootstrapRegistryError::EmptyUrlSet)?;
            for cidr in service
                .first()
                .ok_or(BootstrapRegistryError::EmptyService)?
            {
                pm.insert(
                    cidr.parse()
                        .map_err(|_e| BootstrapRegistryError::InvalidBootstrapService)?,
                    urls.clone(),
                );
            }
        }
        let addr_net = Ipv4Net::new(addr, 32)
            .map_err(|_e| BootstrapRegistryError::InvalidBootstrapService)?;
        let net = pm
            .get_lpm(&addr_net)
            .ok_or(BootstrapRegistryError::NoMatch)?;
        Ok(net.1.to_owned())
    }

    /// Finds the service URLs for an IPv6 address by longest prefix match.
    pub fn ipv6_urls(&self, addr: Ipv6Addr) -> Result<Vec<String>, BootstrapRegistryError> {
        let mut pm: PrefixMap<Ipv6Net, Vec<String>> = PrefixMap::new();
        for service in &self.services {
            let urls = service.last().ok_or(BootstrapRegistryError::EmptyUrlSet)?;
            for cidr in service
                .first()
                .ok_or(BootstrapRegistryError::EmptyService)?
            {
                pm.insert(
                    cidr.parse()
                        .map_err(|_e| BootstrapRegistryError::InvalidBootstrapService)?,
                    urls.clone(),
                );
            }
        }
        let addr_net = Ipv6Net::new(addr, 128)
            .map_err(|_e| BootstrapRegistryError::InvalidBootstrapService)?;
        let net = pm
            .get_lpm(&addr_net)
            .ok_or(BootstrapRegistryError::NoMatch)?;
        Ok(net.1.to_owned())
    }
}

/// Picks the server URL to use from a bootstrap service URL set.
///
/// HTTPS URLs are preferred over HTTP. Among the preferred set, a stable
/// hash of the query key makes the choice, so repeated queries for the
/// same key land on the same server and benefit from its cache and
/// keep-alive. The returned URL has no trailing slash.
pub fn preferred_url(urls: Vec<String>, key: &str) -> Result<String, BootstrapRegistryError> {
    if urls.is_empty() {
        return Err(BootstrapRegistryError::EmptyUrlSet);
    }
    let https: Vec<&String> = urls.iter().filter(|u| u.starts_with("https://")).collect();
    let pool: Vec<&String> = if https.is_empty() {
        urls.iter().collect()
    } else {
        https
    };
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    let index = (hasher.finish() as usize) % pool.len();
    Ok(pool[index].trim_end_matches('/').to_string())
}
