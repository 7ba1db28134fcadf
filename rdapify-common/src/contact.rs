//! Contact information carried in RDAP entities as vCard/jCard.
//!
//! RDAP entities embed contact data as a jCard array (RFC 7095), which is
//! awkward to work with directly. [`Contact::from_vcard`] pulls out the
//! handful of properties the normalized model cares about; everything
//! else is ignored. A malformed jCard yields `None`, letting the entity
//! degrade to its handle and roles.

use serde_json::Value;

/// Contact properties extracted from a jCard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    /// The kind such as individual, org, etc...
    pub kind: Option<String>,

    /// Full name of the contact (the `fn` property).
    pub full_name: Option<String>,

    /// Organization name (the first `org` property).
    pub organization: Option<String>,

    /// The first email address.
    pub email: Option<String>,

    /// The first telephone number.
    pub phone: Option<String>,

    /// The first postal address, joined into a single line.
    pub address: Option<String>,

    /// The country component of the first postal address.
    pub country: Option<String>,
}

#[buildstructor::buildstructor]
impl Contact {
    #[builder(visibility = "pub")]
    fn new(
        kind: Option<String>,
        full_name: Option<String>,
        organization: Option<String>,
        email: Option<String>,
        phone: Option<String>,
        address: Option<String>,
        country: Option<String>,
    ) -> Self {
        Self {
            kind,
            full_name,
            organization,
            email,
            phone,
            address,
            country,
        }
    }

    /// Creates a Contact from a jCard array of [`Value`]s.
    ///
    /// ```rust
    /// use rdapify_common::contact::Contact;
    /// use serde_json::Value;
    ///
    /// let json = r#"
    /// [
    ///   "vcard",
    ///   [
    ///     ["version", {}, "text", "4.0"],
    ///     ["fn", {}, "text", "Joe User"],
    ///     ["email", { "type":"work" }, "text", "joe.user@example.com"]
    ///   ]
    /// ]"#;
    ///
    /// let data: Vec<Value> = serde_json::from_str(json).unwrap();
    /// let contact = Contact::from_vcard(&data).unwrap();
    /// assert_eq!(contact.full_name.as_deref(), Some("Joe User"));
    /// ```
    pub fn from_vcard(vcard_array: &[Value]) -> Option<Contact> {
        // value should be "vcard" followed by an array of properties
        let value = vcard_array.first()?;
        let vcard_literal = value.as_str()?;
        if !vcard_literal.eq_ignore_ascii_case("vcard") {
            return None;
        };
        let vcard = vcard_array.get(1)?;
        let vcard = vcard.as_array()?;

        let contact = Contact::builder()
            .and_kind(vcard.find_property("kind").get_text())
            .and_full_name(vcard.find_property("fn").get_text())
            .and_organization(vcard.find_property("org").get_text())
            .and_email(vcard.find_property("email").get_text())
            .and_phone(vcard.find_property("tel").get_text())
            .and_address(vcard.find_property("adr").get_address())
            .and_country(vcard.find_property("adr").get_country())
            .build();

        contact.is_non_empty().then_some(contact)
    }

    fn is_non_empty(&self) -> bool {
        self.kind.is_some()
            || self.full_name.is_some()
            || self.organization.is_some()
            || self.email.is_some()
            || self.phone.is_some()
            || self.address.is_some()
            || self.country.is_some()
    }
}

trait FindProperty<'a> {
    fn find_property(self, name: &'a str) -> Option<&'a Vec<Value>>;
}

impl<'a> FindProperty<'a> for &'a [Value] {
    fn find_property(self, name: &'a str) -> Option<&'a Vec<Value>> {
        self.iter()
            .filter_map(|prop_array| prop_array.as_array())
            .find(|prop_array| {
                prop_array
                    .first()
                    .and_then(|prop_name| prop_name.as_str())
                    .is_some_and(|prop_name| prop_name.eq_ignore_ascii_case(name))
            })
    }
}

trait GetText<'a> {
    fn get_text(self) -> Option<String>;
}

impl<'a> GetText<'a> for Option<&'a Vec<Value>> {
    fn get_text(self) -> Option<String> {
        let values = self?;
        let fourth = values.get(3)?;
        fourth.as_str().map(|s| s.to_owned())
    }
}

trait GetAddress<'a> {
    fn get_address(self) -> Option<String>;
}

impl<'a> GetAddress<'a> for Option<&'a Vec<Value>> {
    /// Joins the non-empty components of an `adr` property
    /// (post office box, extension, street, locality, region,
    /// postal code, country) into one line.
    fn get_address(self) -> Option<String> {
        let values = self?;
        let fourth = values.get(3)?;
        let components = fourth.as_array()?;
        let joined = components
            .iter()
            .filter_map(|c| c.as_str())
            .filter(|c| !c.is_empty())
            .collect::<Vec<&str>>()
            .join(", ");
        (!joined.is_empty()).then_some(joined)
    }
}

trait GetCountry<'a> {
    fn get_country(self) -> Option<String>;
}

impl<'a> GetCountry<'a> for Option<&'a Vec<Value>> {
    /// The seventh `adr` component is the country name.
    fn get_country(self) -> Option<String> {
        let values = self?;
        let fourth = values.get(3)?;
        let components = fourth.as_array()?;
        let country = components.get(6)?.as_str()?;
        (!country.is_empty()).then(|| country.to_owned())
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use serde_json::Value;

    use super::Contact;

    const FULL_VCARD: &str = r#"
    [
      "vcard",
      [
        ["version", {}, "text", "4.0"],
        ["fn", {}, "text", "Joe User"],
        ["kind", {}, "text", "individual"],
        ["org", { "type":"work" }, "text", "Example"],
        ["adr",
          { "type":"work" },
          "text",
          [
            "",
            "Suite 1234",
            "4321 Rue Somewhere",
            "Quebec",
            "QC",
            "G1V 2M2",
            "Canada"
          ]
        ],
        ["tel",
          { "type":["work", "voice"], "pref":"1" },
          "uri", "tel:+1-555-555-1234;ext=102"
        ],
        ["email",
          { "type":"work" },
          "text", "joe.user@example.com"
        ]
      ]
    ]"#;

    #[test]
    fn GIVEN_full_vcard_WHEN_from_vcard_THEN_all_properties_extracted() {
        // GIVEN
        let data: Vec<Value> = serde_json::from_str(FULL_VCARD).expect("invalid jcard");

        // WHEN
        let actual = Contact::from_vcard(&data).expect("from vcard");

        // THEN
        assert_eq!(actual.full_name.as_deref(), Some("Joe User"));
        assert_eq!(actual.kind.as_deref(), Some("individual"));
        assert_eq!(actual.organization.as_deref(), Some("Example"));
        assert_eq!(actual.email.as_deref(), Some("joe.user@example.com"));
        assert_eq!(actual.phone.as_deref(), Some("tel:+1-555-555-1234;ext=102"));
        assert_eq!(
            actual.address.as_deref(),
            Some("Suite 1234, 4321 Rue Somewhere, Quebec, QC, G1V 2M2, Canada")
        );
        assert_eq!(actual.country.as_deref(), Some("Canada"));
    }

    #[test]
    fn GIVEN_not_a_vcard_WHEN_from_vcard_THEN_none() {
        // GIVEN
        let data: Vec<Value> =
            serde_json::from_str(r#"["jcard", []]"#).expect("invalid json");

        // WHEN
        let actual = Contact::from_vcard(&data);

        // THEN
        assert!(actual.is_none());
    }

    #[test]
    fn GIVEN_empty_array_WHEN_from_vcard_THEN_none() {
        // GIVEN
        let data: Vec<Value> = vec![];

        // WHEN
        let actual = Contact::from_vcard(&data);

        // THEN
        assert!(actual.is_none());
    }

    #[test]
    fn GIVEN_vcard_with_no_known_properties_WHEN_from_vcard_THEN_none() {
        // GIVEN
        let data: Vec<Value> = serde_json::from_str(
            r#"["vcard", [["version", {}, "text", "4.0"], ["x-unknown", {}, "text", "foo"]]]"#,
        )
        .expect("invalid json");

        // WHEN
        let actual = Contact::from_vcard(&data);

        // THEN
        assert!(actual.is_none());
    }

    #[test]
    fn GIVEN_malformed_adr_WHEN_from_vcard_THEN_address_absent() {
        // GIVEN
        let data: Vec<Value> = serde_json::from_str(
            r#"["vcard", [["fn", {}, "text", "Joe User"], ["adr", {}, "text", 42]]]"#,
        )
        .expect("invalid json");

        // WHEN
        let actual = Contact::from_vcard(&data).expect("from vcard");

        // THEN
        assert_eq!(actual.full_name.as_deref(), Some("Joe User"));
        assert!(actual.address.is_none());
    }
}
