//! Response compression negotiation, decoding, and accounting.
//!
//! The library advertises its encodings and decodes bodies itself,
//! keyed on the response `Content-Encoding`. Reqwest's transparent
//! decompression stays disabled: it strips the headers and hides the
//! wire size, and the stats here report real original vs. decoded byte
//! counts. An encoding outside the supported set is a protocol error.

use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};

use flate2::read::{GzDecoder, ZlibDecoder};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::RdapClientError;

/// A content encoding the client can accept, in priority order.
#[derive(Serialize, Deserialize, Display, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CompressionType {
    #[strum(serialize = "br")]
    Br,
    #[strum(serialize = "gzip")]
    Gzip,
    #[strum(serialize = "deflate")]
    Deflate,
}

/// Compression settings.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct CompressionConfig {
    pub enabled: bool,
    /// Encodings to advertise, priority-ordered.
    pub types: Vec<CompressionType>,
    /// Responses smaller than this do not count toward the stats.
    pub threshold_bytes: u64,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            types: vec![
                CompressionType::Br,
                CompressionType::Gzip,
                CompressionType::Deflate,
            ],
            threshold_bytes: 1_024,
        }
    }
}

impl CompressionConfig {
    /// The `Accept-Encoding` value to send, or `None` when compression
    /// is disabled or no encodings are configured.
    pub fn accept_encoding(&self) -> Option<String> {
        if !self.enabled || self.types.is_empty() {
            return None;
        }
        Some(
            self.types
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<String>>()
                .join(", "),
        )
    }
}

/// Decodes a response body per its `Content-Encoding`.
///
/// Identity and absent encodings pass through. Anything outside the
/// supported set fails; servers that compress without being asked are
/// still decoded as long as the encoding is one this library speaks.
pub(crate) fn decode_body(
    body: &[u8],
    content_encoding: Option<&str>,
) -> Result<Vec<u8>, RdapClientError> {
    let encoding = content_encoding.map(str::trim).filter(|e| !e.is_empty());
    match encoding {
        None => Ok(body.to_vec()),
        Some(e) if e.eq_ignore_ascii_case("identity") => Ok(body.to_vec()),
        Some(e) if e.eq_ignore_ascii_case("gzip") || e.eq_ignore_ascii_case("x-gzip") => {
            read_decoded(GzDecoder::new(body), e)
        }
        Some(e) if e.eq_ignore_ascii_case("deflate") => read_decoded(ZlibDecoder::new(body), e),
        Some(e) if e.eq_ignore_ascii_case("br") => {
            read_decoded(brotli::Decompressor::new(body, 4_096), e)
        }
        Some(other) => Err(RdapClientError::Protocol {
            message: format!("unsupported content encoding {other}"),
        }),
    }
}

fn read_decoded(mut reader: impl Read, encoding: &str) -> Result<Vec<u8>, RdapClientError> {
    let mut decoded = Vec::new();
    reader
        .read_to_end(&mut decoded)
        .map_err(|e| RdapClientError::Protocol {
            message: format!("cannot decode {encoding} response body: {e}"),
        })?;
    Ok(decoded)
}

/// Byte totals observed across all responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionTotals {
    pub original_bytes: u64,
    pub decoded_bytes: u64,
}

/// Accumulates compression byte counts.
#[derive(Debug, Default)]
pub struct CompressionStats {
    original: AtomicU64,
    decoded: AtomicU64,
}

impl CompressionStats {
    pub fn record(&self, original: u64, decoded: u64, threshold: u64) {
        if decoded < threshold {
            return;
        }
        self.original.fetch_add(original, Ordering::Relaxed);
        self.decoded.fetch_add(decoded, Ordering::Relaxed);
    }

    pub fn totals(&self) -> CompressionTotals {
        CompressionTotals {
            original_bytes: self.original.load(Ordering::Relaxed),
            decoded_bytes: self.decoded.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use std::io::Write;

    use rstest::rstest;

    use super::{decode_body, CompressionConfig, CompressionStats, CompressionType};
    use crate::RdapClientError;

    const PAYLOAD: &[u8] = br#"{"objectClassName": "domain", "ldhName": "example.com"}"#;

    fn gzipped(payload: &[u8]) -> Vec<u8> {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(payload).expect("gzip write");
        encoder.finish().expect("gzip finish")
    }

    #[test]
    fn GIVEN_default_config_WHEN_accept_encoding_THEN_priority_ordered() {
        // GIVEN
        let config = CompressionConfig::default();

        // WHEN
        let actual = config.accept_encoding();

        // THEN
        assert_eq!(actual.as_deref(), Some("br, gzip, deflate"));
    }

    #[test]
    fn GIVEN_disabled_config_WHEN_accept_encoding_THEN_none() {
        // GIVEN
        let config = CompressionConfig {
            enabled: false,
            ..CompressionConfig::default()
        };

        // WHEN
        let actual = config.accept_encoding();

        // THEN
        assert!(actual.is_none());
    }

    #[test]
    fn GIVEN_subset_config_WHEN_accept_encoding_THEN_only_those() {
        // GIVEN
        let config = CompressionConfig {
            enabled: true,
            types: vec![CompressionType::Gzip],
            threshold_bytes: 0,
        };

        // WHEN
        let actual = config.accept_encoding();

        // THEN
        assert_eq!(actual.as_deref(), Some("gzip"));
    }

    #[rstest]
    #[case(None)]
    #[case(Some("identity"))]
    #[case(Some(""))]
    fn GIVEN_unencoded_body_WHEN_decode_THEN_passthrough(#[case] encoding: Option<&str>) {
        // GIVEN in parameters

        // WHEN
        let actual = decode_body(PAYLOAD, encoding).expect("decoding");

        // THEN
        assert_eq!(actual, PAYLOAD);
    }

    #[test]
    fn GIVEN_gzip_body_WHEN_decode_THEN_original_bytes_and_smaller_wire() {
        // GIVEN
        let payload = PAYLOAD.repeat(50);
        let compressed = gzipped(&payload);
        assert!(compressed.len() < payload.len());

        // WHEN
        let actual = decode_body(&compressed, Some("gzip")).expect("decoding");

        // THEN
        assert_eq!(actual, payload);
    }

    #[test]
    fn GIVEN_deflate_body_WHEN_decode_THEN_original_bytes() {
        // GIVEN
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(PAYLOAD).expect("deflate write");
        let compressed = encoder.finish().expect("deflate finish");

        // WHEN
        let actual = decode_body(&compressed, Some("deflate")).expect("decoding");

        // THEN
        assert_eq!(actual, PAYLOAD);
    }

    #[test]
    fn GIVEN_brotli_body_WHEN_decode_THEN_original_bytes() {
        // GIVEN
        let mut compressed = Vec::new();
        {
            let mut writer = brotli::CompressorWriter::new(&mut compressed, 4_096, 5, 22);
            writer.write_all(PAYLOAD).expect("brotli write");
        }

        // WHEN
        let actual = decode_body(&compressed, Some("br")).expect("decoding");

        // THEN
        assert_eq!(actual, PAYLOAD);
    }

    #[rstest]
    #[case("zstd")]
    #[case("compress")]
    #[case("gzip, br")]
    fn GIVEN_unsupported_encoding_WHEN_decode_THEN_protocol_error(#[case] encoding: &str) {
        // GIVEN in parameters

        // WHEN
        let actual = decode_body(PAYLOAD, Some(encoding));

        // THEN
        assert!(matches!(actual, Err(RdapClientError::Protocol { .. })));
    }

    #[test]
    fn GIVEN_truncated_gzip_body_WHEN_decode_THEN_protocol_error() {
        // GIVEN
        let compressed = gzipped(PAYLOAD);
        let truncated = &compressed[..compressed.len() / 2];

        // WHEN
        let actual = decode_body(truncated, Some("gzip"));

        // THEN
        assert!(matches!(actual, Err(RdapClientError::Protocol { .. })));
    }

    #[test]
    fn GIVEN_small_response_WHEN_record_THEN_not_counted() {
        // GIVEN
        let stats = CompressionStats::default();

        // WHEN
        stats.record(10, 100, 1_024);
        stats.record(1_000, 10_000, 1_024);

        // THEN
        let totals = stats.totals();
        assert_eq!(totals.original_bytes, 1_000);
        assert_eq!(totals.decoded_bytes, 10_000);
    }
}
