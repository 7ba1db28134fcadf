//! Defines the types of RDAP lookups.

use std::str::FromStr;

use pct_str::{PctString, URIReserved};
use strum_macros::Display;

use rdapify_common::{
    asn_types::AsnKey, dns_types::DomainName, iana::IanaRegistryType, ip_types::IpKey,
    normalized::ObjectClass,
};

use crate::RdapClientError;

/// The three kinds of RDAP lookup, each holding its validated key.
#[derive(Display, Debug, Clone)]
pub enum QueryType {
    #[strum(serialize = "Domain Lookup")]
    Domain(DomainName),

    #[strum(serialize = "IP Address Lookup")]
    Ip(IpKey),

    #[strum(serialize = "Autonomous System Number Lookup")]
    Autnum(AsnKey),
}

impl QueryType {
    pub fn domain(domain_name: &str) -> Result<Self, RdapClientError> {
        Ok(Self::Domain(DomainName::from_str(domain_name)?))
    }

    pub fn ip(ip: &str) -> Result<Self, RdapClientError> {
        Ok(Self::Ip(IpKey::from_str(ip)?))
    }

    pub fn autnum(autnum: &str) -> Result<Self, RdapClientError> {
        Ok(Self::Autnum(AsnKey::from_str(autnum)?))
    }

    /// The lookup URL under a server base URL, per the RDAP URL format.
    pub fn query_url(&self, base_url: &str) -> String {
        let base_url = base_url.trim_end_matches('/');
        match self {
            Self::Domain(value) => format!(
                "{base_url}/domain/{}",
                PctString::encode(value.to_ascii().chars(), URIReserved)
            ),
            Self::Ip(value) => format!(
                "{base_url}/ip/{}",
                PctString::encode(value.to_string().chars(), URIReserved)
            ),
            Self::Autnum(value) => format!(
                "{base_url}/autnum/{}",
                PctString::encode(value.to_string().chars(), URIReserved)
            ),
        }
    }

    /// The object class the response must carry.
    pub fn object_class(&self) -> ObjectClass {
        match self {
            Self::Domain(_) => ObjectClass::Domain,
            Self::Ip(_) => ObjectClass::IpNetwork,
            Self::Autnum(_) => ObjectClass::Autnum,
        }
    }

    /// The canonical text of the key, used for caching and server
    /// selection. Inputs that normalize to the same text share cache
    /// entries.
    pub fn normalized_key(&self) -> String {
        match self {
            Self::Domain(value) => value.to_ascii().to_string(),
            Self::Ip(value) => value.to_string(),
            Self::Autnum(value) => value.to_string(),
        }
    }

    /// The bootstrap registry that resolves this query.
    pub fn registry_type(&self) -> IanaRegistryType {
        match self {
            Self::Domain(_) => IanaRegistryType::RdapBootstrapDns,
            Self::Ip(value) => match value.addr() {
                std::net::IpAddr::V4(_) => IanaRegistryType::RdapBootstrapIpv4,
                std::net::IpAddr::V6(_) => IanaRegistryType::RdapBootstrapIpv6,
            },
            Self::Autnum(_) => IanaRegistryType::RdapBootstrapAsn,
        }
    }
}

impl FromStr for QueryType {
    type Err = RdapClientError;

    /// Guesses the query kind: an AS-number first, then an IP address,
    /// then a domain name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(asn) = AsnKey::from_str(trimmed) {
            return Ok(Self::Autnum(asn));
        }
        if let Ok(ip) = IpKey::from_str(trimmed) {
            return Ok(Self::Ip(ip));
        }
        Self::domain(trimmed)
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;

    use rdapify_common::normalized::ObjectClass;

    use super::QueryType;

    #[rstest]
    #[case("example.com", "https://rdap.example", "https://rdap.example/domain/example.com")]
    #[case("EXAMPLE.COM", "https://rdap.example/", "https://rdap.example/domain/example.com")]
    fn GIVEN_domain_WHEN_query_url_THEN_domain_path(
        #[case] domain: &str,
        #[case] base: &str,
        #[case] expected: &str,
    ) {
        // GIVEN
        let query = QueryType::domain(domain).expect("valid domain");

        // WHEN
        let actual = query.query_url(base);

        // THEN
        assert_eq!(actual, expected);
    }

    #[test]
    fn GIVEN_idn_WHEN_query_url_THEN_alabel_in_path() {
        // GIVEN
        let query = QueryType::domain("مثال.السعودية").expect("valid idn");

        // WHEN
        let actual = query.query_url("https://rdap.example");

        // THEN
        assert_eq!(
            actual,
            "https://rdap.example/domain/xn--mgbh0fb.xn--mgberp4a5d4ar"
        );
    }

    #[rstest]
    #[case("8.8.8.8", "https://rdap.example/ip/8.8.8.8")]
    #[case("2001:db8::1", "https://rdap.example/ip/2001%3Adb8%3A%3A1")]
    fn GIVEN_ip_WHEN_query_url_THEN_ip_path(#[case] ip: &str, #[case] expected: &str) {
        // GIVEN
        let query = QueryType::ip(ip).expect("valid ip");

        // WHEN
        let actual = query.query_url("https://rdap.example");

        // THEN
        assert_eq!(actual, expected);
    }

    #[test]
    fn GIVEN_autnum_WHEN_query_url_THEN_autnum_path() {
        // GIVEN
        let query = QueryType::autnum("AS15169").expect("valid asn");

        // WHEN
        let actual = query.query_url("https://rdap.example");

        // THEN
        assert_eq!(actual, "https://rdap.example/autnum/15169");
    }

    #[rstest]
    #[case("AS15169", ObjectClass::Autnum)]
    #[case("15169", ObjectClass::Autnum)]
    #[case("8.8.8.8", ObjectClass::IpNetwork)]
    #[case("2001:db8::1", ObjectClass::IpNetwork)]
    #[case("example.com", ObjectClass::Domain)]
    fn GIVEN_string_WHEN_from_str_THEN_kind_guessed(
        #[case] input: &str,
        #[case] expected: ObjectClass,
    ) {
        // GIVEN in parameters

        // WHEN
        let actual = QueryType::from_str(input).expect("valid query");

        // THEN
        assert_eq!(actual.object_class(), expected);
    }

    #[test]
    fn GIVEN_equivalent_inputs_WHEN_normalized_key_THEN_identical() {
        // GIVEN
        let a = QueryType::domain("Example.COM").expect("valid domain");
        let b = QueryType::domain("example.com.").expect("valid domain");

        // WHEN / THEN
        assert_eq!(a.normalized_key(), b.normalized_key());
    }
}
