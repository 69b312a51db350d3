//! Payload decoding for captured page snapshots.
//!
//! Snapshots arrive base64-encoded and gzip-compressed, and some
//! producers wrap the true HTML in a generated XML envelope holding a
//! second base64+gzip layer. Decoding is tolerant: payloads that were
//! never compressed pass through, and byte decoding falls back from
//! UTF-8 to Latin-1 so a string is always produced for decodable input.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use flate2::read::GzDecoder;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Read as _;
use thiserror::Error;

/// Upper bound on nested envelope unwrapping. Malformed or adversarial
/// input must not send the decoder into an unbounded loop.
pub const MAX_DECODE_DEPTH: usize = 10;

/// Element wrapping a further encoded layer. The envelope is not
/// guaranteed to be well-formed XML, so it is located by pattern search.
static ENVELOPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<Base64EncodedGZipCompressedContent>(.*?)</Base64EncodedGZipCompressedContent>")
        .expect("valid envelope pattern")
});

/// How many encoding layers a variant's producer applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nesting {
    /// Single base64+gzip layer; the decoded text is used as-is.
    None,
    /// Unwrap the envelope when present, up to [`MAX_DECODE_DEPTH`] times.
    Optional,
    /// The outer layer must contain the envelope; its absence is an error.
    Required,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("empty payload")]
    Empty,

    #[error("invalid base64 payload: {0}")]
    Base64(String),

    #[error("nested content envelope not found")]
    EnvelopeMissing,
}

/// Decode one base64+gzip layer to text.
///
/// ASCII whitespace is stripped and padding restored before the base64
/// pass. A failed gzip decompression means the payload was never
/// compressed; the raw bytes are decoded instead.
pub fn decode_layer(payload: &str) -> Result<String, DecodeError> {
    let compact: String = payload.split_ascii_whitespace().collect();
    if compact.is_empty() {
        return Err(DecodeError::Empty);
    }
    let padded = pad_base64(&compact);
    let bytes = STANDARD
        .decode(padded.as_bytes())
        .map_err(|e| DecodeError::Base64(e.to_string()))?;
    let bytes = gunzip(&bytes).unwrap_or(bytes);
    Ok(decode_text(&bytes))
}

/// Fully decode a record payload according to the variant's nesting policy.
pub fn decode_payload(payload: &str, nesting: Nesting) -> Result<String, DecodeError> {
    match nesting {
        Nesting::None => decode_layer(payload),
        Nesting::Required => {
            let outer = decode_layer(payload)?;
            let inner = envelope_content(&outer).ok_or(DecodeError::EnvelopeMissing)?;
            decode_layer(inner)
        }
        Nesting::Optional => {
            let mut current = decode_layer(payload)?;
            for _ in 0..MAX_DECODE_DEPTH {
                let Some(inner) = envelope_content(&current) else {
                    return Ok(current);
                };
                match decode_layer(inner) {
                    Ok(next) => current = next,
                    // Inner text was not a further layer after all; the
                    // outer text is the document.
                    Err(_) => return Ok(current),
                }
            }
            Ok(current)
        }
    }
}

/// Text content of the nested envelope element, when present.
pub fn envelope_content(decoded: &str) -> Option<&str> {
    ENVELOPE_RE
        .captures(decoded)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

fn pad_base64(compact: &str) -> String {
    let mut padded = compact.to_string();
    let rem = padded.len() % 4;
    if rem != 0 {
        padded.extend(std::iter::repeat_n('=', 4 - rem));
    }
    padded
}

fn gunzip(bytes: &[u8]) -> Option<Vec<u8>> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).ok().map(|_| out)
}

/// UTF-8 first, Latin-1 when the bytes are not valid UTF-8. Latin-1
/// maps every byte, so this always yields a string.
fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use proptest::prelude::*;
    use std::io::Write as _;

    pub(crate) fn encode_layer(text: &str) -> String {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        STANDARD.encode(encoder.finish().unwrap())
    }

    pub(crate) fn encode_nested(html: &str) -> String {
        let inner = encode_layer(html);
        encode_layer(&format!(
            "<Envelope><Base64EncodedGZipCompressedContent>{inner}</Base64EncodedGZipCompressedContent></Envelope>"
        ))
    }

    #[test]
    fn round_trip_single_layer() {
        let encoded = encode_layer("<html>hello</html>");
        assert_eq!(
            decode_payload(&encoded, Nesting::Optional).unwrap(),
            "<html>hello</html>"
        );
    }

    #[test]
    fn nested_envelope_yields_inner_document() {
        let encoded = encode_nested("<html>inner</html>");
        assert_eq!(
            decode_payload(&encoded, Nesting::Optional).unwrap(),
            "<html>inner</html>"
        );
        assert_eq!(
            decode_payload(&encoded, Nesting::Required).unwrap(),
            "<html>inner</html>"
        );
    }

    #[test]
    fn required_nesting_rejects_flat_payload() {
        let encoded = encode_layer("<html>flat</html>");
        assert_eq!(
            decode_payload(&encoded, Nesting::Required),
            Err(DecodeError::EnvelopeMissing)
        );
    }

    #[test]
    fn uncompressed_payload_passes_through() {
        let encoded = STANDARD.encode("plain text, never gzipped");
        assert_eq!(
            decode_layer(&encoded).unwrap(),
            "plain text, never gzipped"
        );
    }

    #[test]
    fn missing_padding_is_restored() {
        let encoded = encode_layer("padding test");
        let trimmed = encoded.trim_end_matches('=');
        assert_eq!(decode_layer(trimmed).unwrap(), "padding test");
    }

    #[test]
    fn malformed_base64_is_an_error_not_a_panic() {
        assert!(matches!(
            decode_payload("!!not base64!!", Nesting::Optional),
            Err(DecodeError::Base64(_))
        ));
        assert_eq!(decode_payload("", Nesting::Optional), Err(DecodeError::Empty));
    }

    #[test]
    fn latin1_fallback_produces_text() {
        // 0xE9 alone is invalid UTF-8 but valid Latin-1 ("é").
        let encoded = STANDARD.encode([0xE9u8, b'!']);
        assert_eq!(decode_layer(&encoded).unwrap(), "é!");
    }

    proptest! {
        #[test]
        fn decode_round_trip_law(text in ".*") {
            let encoded = encode_layer(&text);
            prop_assert_eq!(decode_payload(&encoded, Nesting::Optional).unwrap(), text);
        }

        #[test]
        fn decode_never_panics_on_garbage(payload in ".*") {
            let _ = decode_payload(&payload, Nesting::Optional);
            let _ = decode_payload(&payload, Nesting::Required);
        }
    }
}
