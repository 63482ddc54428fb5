//! Display-string sanitizing shared by every parser branch.

use crate::constants::MAX_NAME_CHARS;
use unicode_normalization::UnicodeNormalization;

/// Cleans a display string and falls back when nothing survives.
///
/// Steps: removal of C0/C1 controls, bidi marks and overrides, variation
/// selectors; NFKC normalization; whitespace runs collapse to a single
/// space; the result is trimmed and cut to 120 chars. Rust strings cannot
/// hold unpaired surrogates, so lossy UTF-8 decoding upstream already
/// replaced them.
///
/// The output is a fixed point: `sanitize(&sanitize(x, ""), "") == sanitize(x, "")`.
pub fn sanitize(input: &str, fallback: &str) -> String {
    // Strip before composing so a letter and its combining mark are adjacent.
    let normalized: String = input
        .chars()
        .filter(|c| !is_stripped(*c))
        .nfkc()
        .filter(|c| !is_stripped(*c))
        .collect();

    let mut collapsed = String::with_capacity(normalized.len());
    for word in normalized.split_whitespace() {
        if !collapsed.is_empty() {
            collapsed.push(' ');
        }
        collapsed.push_str(word);
    }

    let truncated: String = collapsed.chars().take(MAX_NAME_CHARS).collect();
    let trimmed = truncated.trim_end();

    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// [`sanitize`] for optional inputs; `None` yields the fallback.
pub fn sanitize_opt(input: Option<&str>, fallback: &str) -> String {
    match input {
        Some(s) => sanitize(s, fallback),
        None => fallback.to_string(),
    }
}

/// Removes C0 controls (except TAB, LF, CR) and DEL.
pub fn strip_control_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(*c, '\u{00}'..='\u{08}' | '\u{0B}' | '\u{0C}' | '\u{0E}'..='\u{1F}' | '\u{7F}'))
        .collect()
}

fn is_stripped(c: char) -> bool {
    matches!(
        c,
        '\u{0000}'..='\u{001F}'
            | '\u{007F}'..='\u{009F}'
            | '\u{200E}'
            | '\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2066}'..='\u{2069}'
            | '\u{FE00}'..='\u{FE0F}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_and_trims() {
        assert_eq!(sanitize("  Tokyo   01 \u{3000} fast ", ""), "Tokyo 01 fast");
    }

    #[test]
    fn strips_controls_bidi_and_variation_selectors() {
        let dirty = "\u{202E}node\u{0007}\u{FE0F}-\u{0085}1\u{200F}";
        assert_eq!(sanitize(dirty, ""), "node-1");
    }

    #[test]
    fn normalizes_compatibility_forms() {
        // Fullwidth letters fold to ASCII under NFKC.
        assert_eq!(sanitize("\u{FF28}\u{FF2B}", ""), "HK");
    }

    #[test]
    fn composes_across_stripped_chars() {
        assert_eq!(sanitize("e\u{7}\u{301}x", ""), "\u{E9}x");
        assert_eq!(sanitize("e\u{200F}\u{301}", ""), "\u{E9}");
    }

    #[test]
    fn truncates_to_limit_without_trailing_space() {
        let long = format!("{} tail", "a".repeat(119));
        let out = sanitize(&long, "");
        assert_eq!(out.chars().count(), 119);
        assert_eq!(sanitize(&out, ""), out);
    }

    #[test]
    fn empty_result_uses_fallback() {
        assert_eq!(sanitize(" \u{200E}\t ", "vless"), "vless");
        assert_eq!(sanitize_opt(None, "host"), "host");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let repeated = "x ".repeat(90);
        let samples = [
            "",
            "plain",
            "  a\u{2066}b  c ",
            "\u{FB01}ne \u{00A0} x",
            "\u{1F1EF}\u{1F1F5} Japan \u{FE0F}",
            repeated.as_str(),
        ];
        for s in samples {
            let once = sanitize(s, "");
            assert_eq!(sanitize(&once, ""), once, "input {:?}", s);
        }
    }

    #[test]
    fn strip_control_chars_keeps_line_breaks() {
        assert_eq!(strip_control_chars("a\u{0}b\tc\nd\u{7F}"), "ab\tc\nd");
    }
}
