//! Candidate link extraction from pasted text or subscription bodies
//!
//! Subscriptions arrive as newline-separated links, as one Base64 blob, or as
//! links glued together with no separator at all. Extraction handles all
//! three:
//!
//! 1. A whole input without `://` that looks like Base64 is decoded; the
//!    decoded text is used when it contains `://`.
//! 2. The text is split on whitespace.
//! 3. Inside each chunk, every recognized scheme prefix starts a new
//!    candidate that runs up to the next recognized prefix.
//! 4. A chunk with `://` but no recognized prefix is passed through whole, so
//!    the parser can report it as unsupported instead of dropping it.

use crate::codec::{decode_auto, looks_like_base64};
use crate::constants::scheme;
use tracing::trace;

/// Splits `raw` into candidate links, in input order.
///
/// # Example
///
/// ```rust
/// use clash_link_serde::extract_links;
///
/// let links = extract_links("vless://a@h:1#Xtrojan://b@h2:2#Y");
/// assert_eq!(links, vec!["vless://a@h:1#X", "trojan://b@h2:2#Y"]);
/// ```
pub fn extract_links(raw: &str) -> Vec<String> {
    let mut text = raw.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let decoded;
    if !text.contains("://") && looks_like_base64(text) {
        decoded = decode_auto(text);
        if decoded.contains("://") {
            trace!("Input decoded as a Base64 subscription body");
            text = decoded.as_str();
        }
    }

    let mut result = Vec::new();
    for chunk in text.split_whitespace() {
        let mut found = false;
        let mut pos = 0;
        while let Some((start, prefix_len)) = earliest_scheme(chunk, pos) {
            found = true;
            let end = earliest_scheme(chunk, start + prefix_len)
                .map(|(next, _)| next)
                .unwrap_or(chunk.len());
            let candidate = chunk[start..end].trim();
            if !candidate.is_empty() {
                result.push(candidate.to_string());
            }
            pos = end;
        }
        if !found && chunk.contains("://") {
            result.push(chunk.to_string());
        }
    }
    result
}

/// Position and length of the earliest recognized prefix at or after `from`.
fn earliest_scheme(text: &str, from: usize) -> Option<(usize, usize)> {
    let haystack = text.get(from..)?;
    scheme::ALL
        .iter()
        .filter_map(|prefix| haystack.find(prefix).map(|idx| (from + idx, prefix.len())))
        .min_by_key(|(idx, _)| *idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    #[test]
    fn whitespace_separated_links() {
        let links = extract_links("  vless://a@h:1#A\n\n trojan://b@h:2\tss://c@h:3  ");
        assert_eq!(links, vec!["vless://a@h:1#A", "trojan://b@h:2", "ss://c@h:3"]);
    }

    #[test]
    fn glued_links_are_split() {
        let links = extract_links("vless://a@h:1#Xtrojan://b@h2:2#Y");
        assert_eq!(links, vec!["vless://a@h:1#X", "trojan://b@h2:2#Y"]);
    }

    #[test]
    fn text_before_first_scheme_is_dropped() {
        let links = extract_links("node:vmess://abc");
        assert_eq!(links, vec!["vmess://abc"]);
    }

    #[test]
    fn unknown_scheme_passes_through() {
        let links = extract_links("socks5://h:1 plain-text");
        assert_eq!(links, vec!["socks5://h:1"]);
    }

    #[test]
    fn base64_body_is_unwrapped() {
        let body = STANDARD.encode("hy2://p@h:1#A\ntuic://u:p@h:2#B\n");
        assert_eq!(
            extract_links(&body),
            vec!["hy2://p@h:1#A", "tuic://u:p@h:2#B"]
        );
    }

    #[test]
    fn base64_without_links_is_kept_as_is() {
        assert!(extract_links(&STANDARD.encode("hello")).is_empty());
        assert!(extract_links("   ").is_empty());
    }

    #[test]
    fn hysteria2_is_not_split_as_hy2() {
        assert_eq!(
            extract_links("hysteria2://p@h:1"),
            vec!["hysteria2://p@h:1"]
        );
    }
}
