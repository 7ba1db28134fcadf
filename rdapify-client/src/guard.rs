//! Outbound request guarding against server-side request forgery.
//!
//! Every URL the fetcher intends to use is checked here first: literal
//! IP hosts are classified directly, named hosts are resolved and every
//! resolved address is classified. Redirect targets go through the same
//! check before the hop is followed.

use std::net::IpAddr;
use std::sync::LazyLock;

use ipnet::{Ipv4Net, Ipv6Net};
use reqwest::Url;

use crate::{RdapClientError, SecurityReason};

// Special-use and private ranges that are never legitimate RDAP servers.
static UNSAFE_V4: LazyLock<Vec<Ipv4Net>> = LazyLock::new(|| {
    [
        "0.0.0.0/8",
        "10.0.0.0/8",
        "100.64.0.0/10",
        "127.0.0.0/8",
        "169.254.0.0/16",
        "172.16.0.0/12",
        "192.168.0.0/16",
        "224.0.0.0/4",
        "255.255.255.255/32",
    ]
    .iter()
    // these are literals; parsing cannot fail
    .map(|s| s.parse().expect("unparseable builtin cidr"))
    .collect()
});

static UNSAFE_V6: LazyLock<Vec<Ipv6Net>> = LazyLock::new(|| {
    ["::1/128", "fc00::/7", "fe80::/10", "ff00::/8"]
        .iter()
        .map(|s| s.parse().expect("unparseable builtin cidr"))
        .collect()
});

/// Classifies outbound targets as safe or unsafe.
#[derive(Debug, Clone, Copy, Default)]
pub struct SsrfGuard {
    /// When true, private and special-use addresses are allowed through.
    pub allow_private: bool,
}

impl SsrfGuard {
    pub fn new(allow_private: bool) -> Self {
        Self { allow_private }
    }

    /// True when the address falls in a private or special-use range.
    pub fn is_unsafe(&self, addr: IpAddr) -> bool {
        match addr {
            IpAddr::V4(v4) => UNSAFE_V4.iter().any(|net| net.contains(&v4)),
            IpAddr::V6(v6) => {
                // IPv4-mapped addresses are judged by their embedded address
                if let Some(mapped) = v6.to_ipv4_mapped() {
                    return UNSAFE_V4.iter().any(|net| net.contains(&mapped));
                }
                UNSAFE_V6.iter().any(|net| net.contains(&v6))
            }
        }
    }

    /// Checks a single resolved address.
    pub fn check_addr(&self, addr: IpAddr) -> Result<(), RdapClientError> {
        if !self.allow_private && self.is_unsafe(addr) {
            return Err(RdapClientError::Security {
                reason: SecurityReason::Ssrf,
                message: format!("{addr} is in a private or special-use range"),
            });
        }
        Ok(())
    }

    /// Checks the host of an outbound URL, resolving names as needed.
    ///
    /// Name resolution is a suspension point; callers race it against
    /// their cancellation token.
    pub async fn check_url(&self, url: &Url) -> Result<(), RdapClientError> {
        if self.allow_private {
            return Ok(());
        }
        let host = url.host().ok_or_else(|| RdapClientError::Protocol {
            message: format!("no host in url {url}"),
        })?;
        match host {
            url::Host::Ipv4(addr) => self.check_addr(IpAddr::V4(addr)),
            url::Host::Ipv6(addr) => self.check_addr(IpAddr::V6(addr)),
            url::Host::Domain(name) => {
                let port = url.port_or_known_default().unwrap_or(443);
                let addrs = tokio::net::lookup_host((name, port)).await.map_err(|e| {
                    RdapClientError::Transport {
                        message: format!("cannot resolve {name}: {e}"),
                    }
                })?;
                for addr in addrs {
                    self.check_addr(addr.ip())?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use std::net::IpAddr;
    use std::str::FromStr;

    use rstest::rstest;

    use super::SsrfGuard;

    #[rstest]
    #[case("10.1.2.3", true)]
    #[case("172.16.0.1", true)]
    #[case("172.32.0.1", false)]
    #[case("192.168.1.1", true)]
    #[case("127.0.0.1", true)]
    #[case("169.254.10.10", true)]
    #[case("100.64.0.1", true)]
    #[case("0.1.2.3", true)]
    #[case("224.0.0.251", true)]
    #[case("255.255.255.255", true)]
    #[case("8.8.8.8", false)]
    #[case("198.51.100.7", false)]
    fn GIVEN_ipv4_address_WHEN_is_unsafe_THEN_classified(
        #[case] addr: &str,
        #[case] expected: bool,
    ) {
        // GIVEN
        let guard = SsrfGuard::new(false);
        let addr = IpAddr::from_str(addr).expect("valid address");

        // WHEN
        let actual = guard.is_unsafe(addr);

        // THEN
        assert_eq!(actual, expected);
    }

    #[rstest]
    #[case("::1", true)]
    #[case("fc00::1", true)]
    #[case("fd12:3456::1", true)]
    #[case("fe80::1", true)]
    #[case("ff02::fb", true)]
    #[case("::ffff:192.168.0.1", true)]
    #[case("::ffff:8.8.8.8", false)]
    #[case("2001:db8::1", false)]
    #[case("2606:4700::1111", false)]
    fn GIVEN_ipv6_address_WHEN_is_unsafe_THEN_classified(
        #[case] addr: &str,
        #[case] expected: bool,
    ) {
        // GIVEN
        let guard = SsrfGuard::new(false);
        let addr = IpAddr::from_str(addr).expect("valid address");

        // WHEN
        let actual = guard.is_unsafe(addr);

        // THEN
        assert_eq!(actual, expected);
    }

    #[test]
    fn GIVEN_private_address_allowed_WHEN_check_addr_THEN_ok() {
        // GIVEN
        let guard = SsrfGuard::new(true);
        let addr = IpAddr::from_str("192.168.1.1").expect("valid address");

        // WHEN
        let actual = guard.check_addr(addr);

        // THEN
        assert!(actual.is_ok());
    }

    #[tokio::test]
    async fn GIVEN_literal_private_host_WHEN_check_url_THEN_security_error() {
        // GIVEN
        let guard = SsrfGuard::new(false);
        let url = reqwest::Url::parse("https://192.168.1.1/domain/foo").expect("valid url");

        // WHEN
        let actual = guard.check_url(&url).await;

        // THEN
        let err = actual.expect_err("should be refused");
        assert!(matches!(
            err,
            crate::RdapClientError::Security { .. }
        ));
    }
}
