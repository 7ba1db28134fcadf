//! Domain name parsing and validation.

use std::fmt;
use std::str::FromStr;

use idna::domain_to_ascii_strict;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum octets in a full domain name, without a trailing dot.
const MAX_NAME_LENGTH: usize = 253;

/// Maximum octets in a single label.
const MAX_LABEL_LENGTH: usize = 63;

#[derive(Debug, Error)]
pub enum DomainNameError {
    #[error("Empty domain name")]
    EmptyName,
    #[error("Empty domain label")]
    EmptyLabel,
    #[error("Domain label exceeds {MAX_LABEL_LENGTH} octets")]
    LabelTooLong,
    #[error("Domain name exceeds {MAX_NAME_LENGTH} octets")]
    NameTooLong,
    #[error("Disallowed character in domain name")]
    DisallowedCharacter,
    #[error(transparent)]
    IdnaError(#[from] idna::Errors),
}

/// A validated, canonicalized domain name.
///
/// Construction strips surrounding whitespace and one trailing dot,
/// lowercases, and converts internationalized names to their ASCII
/// (A-label) form. The Unicode form of an IDN is retained for display.
///
/// ```rust
/// use std::str::FromStr;
/// use rdapify_common::dns_types::DomainName;
///
/// let name = DomainName::from_str("Example.COM").unwrap();
/// assert_eq!(name.to_ascii(), "example.com");
/// assert!(!name.is_idn());
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DomainName {
    ascii: String,
    unicode: Option<String>,
}

impl DomainName {
    /// The ASCII (LDH or A-label) form used on the wire.
    pub fn to_ascii(&self) -> &str {
        &self.ascii
    }

    /// The Unicode form, present only when the input was an IDN.
    pub fn unicode_name(&self) -> Option<&str> {
        self.unicode.as_deref()
    }

    /// True when the input was an internationalized name.
    pub fn is_idn(&self) -> bool {
        self.unicode.is_some()
    }

    /// The right-most label, used for bootstrap lookup.
    pub fn tld(&self) -> &str {
        self.ascii.rsplit('.').next().unwrap_or(&self.ascii)
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ascii)
    }
}

impl FromStr for DomainName {
    type Err = DomainNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);
        if trimmed.is_empty() {
            return Err(DomainNameError::EmptyName);
        }
        let lowered = trimmed.to_lowercase();
        let (ascii, unicode) = if lowered.is_ascii() {
            (lowered, None)
        } else {
            (domain_to_ascii_strict(&lowered)?, Some(lowered))
        };
        validate_ascii_name(&ascii)?;
        Ok(Self { ascii, unicode })
    }
}

fn validate_ascii_name(name: &str) -> Result<(), DomainNameError> {
    if name.len() > MAX_NAME_LENGTH {
        return Err(DomainNameError::NameTooLong);
    }
    for label in name.split('.') {
        if label.is_empty() {
            return Err(DomainNameError::EmptyLabel);
        }
        if label.len() > MAX_LABEL_LENGTH {
            return Err(DomainNameError::LabelTooLong);
        }
        if !label.chars().all(is_ldh) {
            return Err(DomainNameError::DisallowedCharacter);
        }
    }
    Ok(())
}

fn is_ldh(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9' | '-')
}
