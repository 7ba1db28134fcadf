//! Autonomous system number key parsing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AsnKeyError {
    #[error("Invalid autonomous system number")]
    InvalidAsn,
    #[error("Invalid autonomous system number range")]
    InvalidRange,
}

/// A validated autonomous system number.
///
/// An optional `AS` prefix (any case) is accepted and stripped.
///
/// ```rust
/// use std::str::FromStr;
/// use rdapify_common::asn_types::AsnKey;
///
/// let asn = AsnKey::from_str("AS15169").unwrap();
/// assert_eq!(asn.value(), 15169);
/// ```
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AsnKey(u32);

impl AsnKey {
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for AsnKey {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for AsnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for AsnKey {
    type Err = AsnKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = strip_as_prefix(trimmed);
        let value = digits.parse::<u32>().map_err(|_e| AsnKeyError::InvalidAsn)?;
        Ok(Self(value))
    }
}

/// An inclusive range of autonomous system numbers.
///
/// The range form `AS<n>-AS<m>` is accepted as input metadata; a single
/// query always targets a single number, so callers wanting the whole
/// range decompose it themselves.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct AsnRange {
    pub start: u32,
    pub end: u32,
}

impl AsnRange {
    pub fn contains(&self, asn: u32) -> bool {
        self.start <= asn && asn <= self.end
    }
}

impl FromStr for AsnRange {
    type Err = AsnKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s.trim().split_once('-').ok_or(AsnKeyError::InvalidRange)?;
        let start = AsnKey::from_str(start)
            .map_err(|_e| AsnKeyError::InvalidRange)?
            .value();
        let end = AsnKey::from_str(end)
            .map_err(|_e| AsnKeyError::InvalidRange)?
            .value();
        if start > end {
            return Err(AsnKeyError::InvalidRange);
        }
        Ok(Self { start, end })
    }
}

fn strip_as_prefix(s: &str) -> &str {
    if s.len() > 2 && s[..2].eq_ignore_ascii_case("as") {
        &s[2..]
    } else {
        s
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;

    use super::{AsnKey, AsnRange};

    #[rstest]
    #[case("15169", 15169)]
    #[case("AS15169", 15169)]
    #[case("as15169", 15169)]
    #[case("aS15169", 15169)]
    #[case("0", 0)]
    #[case("4294967295", 4294967295)]
    fn GIVEN_valid_asn_WHEN_from_str_THEN_value_parsed(#[case] input: &str, #[case] expected: u32) {
        // GIVEN in parameters

        // WHEN
        let actual = AsnKey::from_str(input).expect("valid asn");

        // THEN
        assert_eq!(actual.value(), expected);
    }

    #[rstest]
    #[case("4294967296")]
    #[case("-1")]
    #[case("AS")]
    #[case("ASfoo")]
    #[case("")]
    fn GIVEN_invalid_asn_WHEN_from_str_THEN_error(#[case] input: &str) {
        // GIVEN in parameters

        // WHEN
        let actual = AsnKey::from_str(input);

        // THEN
        assert!(actual.is_err());
    }

    #[rstest]
    #[case("AS15169-AS15200", 15169, 15200)]
    #[case("64496-64496", 64496, 64496)]
    fn GIVEN_valid_range_WHEN_from_str_THEN_bounds_parsed(
        #[case] input: &str,
        #[case] start: u32,
        #[case] end: u32,
    ) {
        // GIVEN in parameters

        // WHEN
        let actual = AsnRange::from_str(input).expect("valid range");

        // THEN
        assert_eq!(actual.start, start);
        assert_eq!(actual.end, end);
        assert!(actual.contains(start));
        assert!(actual.contains(end));
    }

    #[rstest]
    #[case("AS20-AS10")]
    #[case("AS15169")]
    #[case("foo-bar")]
    fn GIVEN_invalid_range_WHEN_from_str_THEN_error(#[case] input: &str) {
        // GIVEN in parameters

        // WHEN
        let actual = AsnRange::from_str(input);

        // THEN
        assert!(actual.is_err());
    }
}
