//! Value types shared by all RDAP object classes.

use serde::{Deserialize, Deserializer, Serialize};

/// An array of links.
pub type Links = Vec<Link>;

/// An array of events.
pub type Events = Vec<Event>;

/// Represents an RDAP link structure.
///
/// RFC 9083 requires `href`, but some servers omit it, so it is optional
/// here to be able to parse their responses.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct Link {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,

    #[serde(
        skip_serializing_if = "Option::is_none",
        default,
        deserialize_with = "string_or_vec"
    )]
    pub hreflang: Option<Vec<String>>,

    #[serde(rename = "type")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[buildstructor::buildstructor]
impl Link {
    #[builder(visibility = "pub")]
    fn new(
        value: Option<String>,
        rel: Option<String>,
        href: String,
        hreflang: Option<Vec<String>>,
        media_type: Option<String>,
        title: Option<String>,
    ) -> Self {
        Self {
            value,
            rel,
            href: Some(href),
            hreflang,
            media_type,
            title,
        }
    }
}

/// Represents an RDAP event.
///
/// RFC 9083 requires `eventAction` and `eventDate`, but both are optional
/// here to be able to parse responses from servers that do not strictly
/// obey the RFC.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct Event {
    #[serde(rename = "eventAction")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_action: Option<String>,

    #[serde(rename = "eventActor")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_actor: Option<String>,

    #[serde(rename = "eventDate")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<Links>,
}

#[buildstructor::buildstructor]
impl Event {
    #[builder(visibility = "pub")]
    fn new(
        event_action: String,
        event_date: String,
        event_actor: Option<String>,
        links: Option<Links>,
    ) -> Self {
        Self {
            event_action: Some(event_action),
            event_actor,
            event_date: Some(event_date),
            links,
        }
    }
}

/// Deserializes a value that servers send either as one string or as an
/// array of strings (e.g. `hreflang`).
fn string_or_vec<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }
    let value = Option::<OneOrMany>::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    }))
}
