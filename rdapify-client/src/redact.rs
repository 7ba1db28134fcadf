//! PII redaction of normalized responses.
//!
//! Redaction happens on every read; the cached entry keeps the
//! unredacted canonical form so a policy change needs no re-fetch. The
//! operation is idempotent and never touches `rawResponse` (a caller
//! asking for raw data opted into unredacted data).

use serde::{Deserialize, Serialize};

use rdapify_common::normalized::{EntityData, RdapData};

/// Entity roles whose personal name is treated as PII.
const PII_NAME_ROLES: [&str; 4] = ["registrant", "administrative", "technical", "billing"];

/// What to do with a PII field that is present.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "mode", content = "placeholder", rename_all = "lowercase")]
pub enum RedactionPolicy {
    /// Drop the field entirely.
    Remove,
    /// Replace the value with a fixed placeholder.
    Placeholder(String),
}

impl Default for RedactionPolicy {
    fn default() -> Self {
        Self::Placeholder("REDACTED".to_string())
    }
}

/// Privacy settings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct PrivacyConfig {
    /// Apply PII redaction on read.
    pub redact_pii: bool,
    pub policy: RedactionPolicy,
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            redact_pii: true,
            policy: RedactionPolicy::default(),
        }
    }
}

/// Applies a redaction policy to responses.
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    policy: RedactionPolicy,
}

impl Redactor {
    pub fn new(policy: RedactionPolicy) -> Self {
        Self { policy }
    }

    /// Returns a copy of `data` with entity PII scrubbed, recursively.
    ///
    /// Email, phone, and address are always redacted; the personal name
    /// only when the entity holds one of the contact roles. Handle,
    /// roles, organization, and country stay.
    pub fn redact(&self, data: &RdapData) -> RdapData {
        let mut copy = data.clone();
        let entities = match &mut copy {
            RdapData::Domain(d) => &mut d.entities,
            RdapData::Network(n) => &mut n.entities,
            RdapData::Autnum(a) => &mut a.entities,
        };
        for entity in entities.iter_mut() {
            self.scrub(entity);
        }
        copy
    }

    fn scrub(&self, entity: &mut EntityData) {
        self.apply(&mut entity.email);
        self.apply(&mut entity.phone);
        self.apply(&mut entity.address);
        let personal = entity
            .roles
            .iter()
            .any(|role| PII_NAME_ROLES.contains(&role.to_lowercase().as_str()));
        if personal {
            self.apply(&mut entity.name);
        }
        for child in entity.entities.iter_mut() {
            self.scrub(child);
        }
    }

    /// Present fields are replaced or removed; absent fields are never
    /// fabricated.
    fn apply(&self, field: &mut Option<String>) {
        match &self.policy {
            RedactionPolicy::Remove => *field = None,
            RedactionPolicy::Placeholder(placeholder) => {
                if field.is_some() {
                    *field = Some(placeholder.clone());
                }
            }
        }
    }
}
