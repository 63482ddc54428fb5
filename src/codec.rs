//! Base64 helpers for links and subscription payloads
//!
//! Subscription providers mix the standard and URL-safe alphabets, drop
//! padding and wrap lines, so decoding here never fails loudly: anything that
//! cannot be decoded becomes an empty string and the caller decides what an
//! empty payload means.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use tracing::trace;

/// Standard alphabet, padding optional, non-zero trailing bits tolerated.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decodes standard or URL-safe Base64 into text.
///
/// ASCII whitespace is removed, `-`/`_` are mapped to `+`/`/`, and `=`
/// padding is added up to a multiple of four. Bytes that are not valid UTF-8
/// are replaced with U+FFFD. Returns `""` when the input cannot be decoded.
pub fn decode_auto(data: &str) -> String {
    if data.is_empty() {
        return String::new();
    }

    let mut normalized: String = data
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    while normalized.len() % 4 != 0 {
        normalized.push('=');
    }

    match LENIENT.decode(normalized.as_bytes()) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(err) => {
            trace!("Base64 decode failed ({}), length {}", err, normalized.len());
            String::new()
        }
    }
}

/// Returns true for non-empty `[A-Za-z0-9+/_-]+=*` tokens.
pub fn looks_like_base64(s: &str) -> bool {
    let body = s.trim_end_matches('=');
    !body.is_empty()
        && body
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'_' | b'-'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_standard_with_padding() {
        assert_eq!(decode_auto("aGVsbG8gd29ybGQ="), "hello world");
    }

    #[test]
    fn decodes_missing_padding() {
        assert_eq!(decode_auto("aGVsbG8gd29ybGQ"), "hello world");
    }

    #[test]
    fn decodes_url_safe_alphabet() {
        // "subjects?_d" encodes to "c3ViamVjdHM_X2Q" in the URL-safe alphabet.
        assert_eq!(decode_auto("c3ViamVjdHM_X2Q"), "subjects?_d");
    }

    #[test]
    fn decodes_across_line_breaks() {
        assert_eq!(decode_auto("aGVs\nbG8g\r\nd29y\nbGQ="), "hello world");
    }

    #[test]
    fn invalid_utf8_is_replaced_not_rejected() {
        // 0xFF 0xFE 0x41
        let decoded = decode_auto("//5B");
        assert!(decoded.ends_with('A'));
        assert!(decoded.contains('\u{FFFD}'));
    }

    #[test]
    fn garbage_yields_empty_string() {
        assert_eq!(decode_auto("!!!"), "");
        assert_eq!(decode_auto("a"), "");
        assert_eq!(decode_auto(""), "");
    }

    #[test]
    fn base64_shape_detection() {
        assert!(looks_like_base64("YWVzLTI1Ni1nY206cGFzcw=="));
        assert!(looks_like_base64("abc-_+/"));
        assert!(!looks_like_base64("abc{}"));
        assert!(!looks_like_base64("=="));
        assert!(!looks_like_base64("ab=c"));
    }
}
