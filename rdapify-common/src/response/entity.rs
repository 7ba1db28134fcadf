//! RDAP Entity Object Class.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::contact::Contact;

use super::{Common, ObjectCommon};

/// Represents an RDAP entity response.
///
/// The contact data is carried as a jCard in `vcardArray`; use
/// [`Entity::contact`] to extract it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Entity {
    #[serde(flatten)]
    pub common: Common,

    #[serde(flatten)]
    pub object_common: ObjectCommon,

    #[serde(rename = "vcardArray")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vcard_array: Option<Vec<Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

impl Entity {
    /// The contact information from the jCard, if any can be extracted.
    pub fn contact(&self) -> Option<Contact> {
        let vcard = self.vcard_array.as_ref()?;
        Contact::from_vcard(vcard)
    }
}
