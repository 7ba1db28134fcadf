//! RDAP Autnum Object Class.

use serde::{Deserialize, Serialize};

use super::{Common, ObjectCommon};

/// Represents an RDAP autnum lookup response.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Autnum {
    #[serde(flatten)]
    pub common: Common,

    #[serde(flatten)]
    pub object_common: ObjectCommon,

    #[serde(rename = "startAutnum")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_autnum: Option<u32>,

    #[serde(rename = "endAutnum")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_autnum: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "type")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autnum_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::Autnum;

    #[test]
    fn GIVEN_autnum_WHEN_deserialize_THEN_success() {
        // GIVEN
        let json = r#"
        {
          "objectClassName" : "autnum",
          "handle" : "AS15169",
          "startAutnum" : 15169,
          "endAutnum" : 15169,
          "name" : "GOOGLE",
          "type" : "DIRECT ALLOCATION",
          "status" : [ "active" ]
        }
        "#;

        // WHEN
        let actual = serde_json::from_str::<Autnum>(json).expect("parsing autnum");

        // THEN
        assert_eq!(actual.start_autnum, Some(15169));
        assert_eq!(actual.end_autnum, Some(15169));
        assert_eq!(actual.name.as_deref(), Some("GOOGLE"));
    }

    #[test]
    fn GIVEN_autnum_with_only_handle_WHEN_deserialize_THEN_numbers_absent() {
        // GIVEN
        let json = r#"{ "objectClassName" : "autnum", "handle" : "AS15169" }"#;

        // WHEN
        let actual = serde_json::from_str::<Autnum>(json).expect("parsing autnum");

        // THEN
        assert!(actual.start_autnum.is_none());
        assert!(actual.end_autnum.is_none());
        assert_eq!(actual.object_common.handle.as_deref(), Some("AS15169"));
    }
}
