//! RDAP media types (formerly known as mime types).

/// The "application/json" media type value.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// The "application/rdap+json" media type value.
pub const RDAP_MEDIA_TYPE: &str = "application/rdap+json";

/// The value sent in the `Accept` header: RDAP JSON preferred,
/// plain JSON as a fallback.
pub const RDAP_ACCEPT_HEADER: &str = "application/rdap+json, application/json;q=0.8";
