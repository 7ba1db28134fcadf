//! Metadata about an HTTP response, used for cache freshness decisions.

use buildstructor::Builder;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// HTTP response metadata kept alongside downloaded data.
///
/// The bootstrap store uses this to decide when a registry copy is stale,
/// and the fetcher uses it to surface `Retry-After` information.
#[derive(Serialize, Deserialize, Clone, Debug, Builder, PartialEq, Eq)]
pub struct HttpData {
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    pub scheme: Option<String>,
    pub host: String,
    pub status_code: u16,
    pub location: Option<String>,
    pub expires: Option<String>,
    pub cache_control: Option<String>,
    pub retry_after: Option<String>,
    pub received: DateTime<Utc>,
}

#[buildstructor::buildstructor]
impl HttpData {
    #[builder(entry = "now")]
    #[allow(clippy::too_many_arguments)]
    pub fn new_now(
        content_length: Option<u64>,
        content_type: Option<String>,
        scheme: String,
        host: String,
        status_code: Option<u16>,
        location: Option<String>,
        expires: Option<String>,
        cache_control: Option<String>,
        retry_after: Option<String>,
    ) -> Self {
        Self {
            content_length,
            content_type,
            scheme: Some(scheme),
            host,
            status_code: status_code.unwrap_or(200),
            location,
            expires,
            cache_control,
            retry_after,
            received: Utc::now(),
        }
    }

    #[builder(entry = "example")]
    #[allow(clippy::too_many_arguments)]
    pub fn new_example(
        content_length: Option<u64>,
        content_type: Option<String>,
        status_code: Option<u16>,
        location: Option<String>,
        expires: Option<String>,
        cache_control: Option<String>,
        retry_after: Option<String>,
    ) -> Self {
        Self {
            content_length,
            content_type,
            scheme: Some("https".to_string()),
            host: "example.com".to_string(),
            status_code: status_code.unwrap_or(200),
            location,
            expires,
            cache_control,
            retry_after,
            received: Utc::now(),
        }
    }

    /// True if this data is older than `max_age` seconds, taking any
    /// `Cache-Control: max-age` or `Expires` header into account.
    pub fn is_expired(&self, max_age: i64) -> bool {
        let now = Utc::now();
        if now >= self.received + Duration::seconds(max_age) {
            return true;
        }
        if let Some(cache_control) = &self.cache_control {
            let cc_max_age = cache_control
                .split(',')
                .map(|s| s.trim())
                .find(|s| s.starts_with("max-age="));
            if let Some(cc_max_age) = cc_max_age {
                let cc_max_age = cc_max_age.trim_start_matches("max-age=").parse::<i64>();
                if let Ok(cc_max_age) = cc_max_age {
                    return now >= self.received + Duration::seconds(cc_max_age);
                }
            }
        }
        if let Some(expires) = &self.expires {
            let expire_time = DateTime::parse_from_rfc2822(expires);
            return if let Ok(expire_time) = expire_time {
                now >= expire_time
            } else {
                false
            };
        }
        false
    }

    /// True unless `Cache-Control` forbids storing the response.
    pub fn should_cache(&self) -> bool {
        if let Some(cache_control) = &self.cache_control {
            return !cache_control
                .split(',')
                .map(|s| s.trim())
                .any(|s| s.eq("no-store") || s.eq("no-cache"));
        }
        true
    }

    /// The `Retry-After` header as a duration, if it was a delta-seconds value.
    pub fn retry_after_duration(&self) -> Option<std::time::Duration> {
        let value = self.retry_after.as_ref()?;
        if let Ok(secs) = value.trim().parse::<u64>() {
            return Some(std::time::Duration::from_secs(secs));
        }
        let date = DateTime::parse_from_rfc2822(value).ok()?;
        let delta = date.with_timezone(&Utc) - Utc::now();
        delta.to_std().ok()
    }
}
