//! URI splitting shared by the `scheme://userinfo@host:port/path?query#fragment` parsers
//!
//! Proxy links are not always valid URLs: userinfo can hold raw Base64, hosts
//! can be bracketed IPv6 literals and the fragment is free text. Splitting is
//! done by hand in the order fragment, query, authority, so a `?` or `@`
//! inside the remark never changes the meaning of the rest of the link.
//!
//! ## Parsing rules
//!
//! 1. The scheme is everything before the first `://` and is lower-cased.
//! 2. The fragment (after the first `#`) is percent-decoded; on a decoding
//!    error the raw text is kept.
//! 3. The query (after the first `?`) is parsed as
//!    `application/x-www-form-urlencoded`; a repeated key keeps its last value.
//! 4. The authority ends at the first `/`; userinfo is everything before the
//!    last `@` in it.
//! 5. `[v6]:port` hosts lose their brackets.

use crate::constants::{MAX_HOST_LEN, MAX_NAME_CHARS, error_msg};
use crate::error::{ParseError, Result};
use crate::sanitize::sanitize;

/// Query string as ordered `(key, value)` pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Parses an `application/x-www-form-urlencoded` query string.
    pub fn parse(query: &str) -> Self {
        QueryParams {
            pairs: url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        }
    }

    /// Value of `key`; the last occurrence wins.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value of `key` when it is present and non-empty.
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// First non-empty value among `keys`, in the given priority order.
    pub fn first_non_empty(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.non_empty(k))
    }

    /// True when `key` appears in the query, even with an empty value.
    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// True when any of `keys` appears in the query.
    pub fn contains_any(&self, keys: &[&str]) -> bool {
        keys.iter().any(|k| self.contains(k))
    }

    /// Boolean flag: `None` when absent, otherwise true for `1`, `true`,
    /// `True` or `yes`.
    pub fn flag(&self, key: &str) -> Option<bool> {
        self.get(key)
            .map(|v| matches!(v, "1" | "true" | "True" | "yes"))
    }

    /// True when no parameters were given.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// A proxy link split into its URI components
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkParts {
    /// Lower-cased scheme without `://`
    pub scheme: String,
    /// Raw userinfo (before the last `@` of the authority)
    pub userinfo: Option<String>,
    /// Host without IPv6 brackets; may be empty
    pub host: String,
    /// Raw port text, `None` when absent or empty
    pub port: Option<String>,
    /// Path including its leading `/`, or empty
    pub path: String,
    /// Raw authority + path, as written in the link
    pub rest: String,
    /// Query parameters
    pub query: QueryParams,
    /// Decoded fragment, `None` when absent or empty
    pub fragment: Option<String>,
}

impl LinkParts {
    /// Splits `link` into components.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` when the link has no `scheme://` prefix or the
    /// bracketed host is unterminated.
    pub fn parse(link: &str) -> Result<Self> {
        let link = link.trim();
        let (scheme, body) = link.split_once("://").ok_or_else(|| invalid_url(link))?;
        if scheme.is_empty()
            || !scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        {
            return Err(invalid_url(link));
        }

        let (before_hash, fragment) = match body.split_once('#') {
            Some((before, frag)) => (before, Some(frag)),
            None => (body, None),
        };
        let (rest, query) = match before_hash.split_once('?') {
            Some((main, query)) => (main, query),
            None => (before_hash, ""),
        };

        let (authority, path) = match rest.find('/') {
            Some(pos) => (&rest[..pos], &rest[pos..]),
            None => (rest, ""),
        };

        let (userinfo, host_port) = match authority.rfind('@') {
            Some(pos) => (Some(&authority[..pos]), &authority[pos + 1..]),
            None => (None, authority),
        };

        let (host, port) = split_host_port(host_port)?;

        Ok(LinkParts {
            scheme: scheme.to_ascii_lowercase(),
            userinfo: userinfo.map(str::to_string),
            host: host.to_string(),
            port: port.filter(|p| !p.is_empty()).map(str::to_string),
            path: path.to_string(),
            rest: rest.to_string(),
            query: QueryParams::parse(query),
            fragment: fragment
                .filter(|f| !f.is_empty())
                .map(decode_component),
        })
    }

    /// Percent-decoded userinfo, empty when absent.
    pub fn username(&self) -> String {
        self.userinfo.as_deref().map(decode_component).unwrap_or_default()
    }

    /// Host, which must pass [`check_host`].
    pub fn require_host(&self) -> Result<String> {
        check_host(&self.host)
    }

    /// Port, which must be present and in 1–65535.
    pub fn require_port(&self) -> Result<u16> {
        match self.port.as_deref() {
            Some(raw) => parse_port(raw),
            None => Err(ParseError::MissingField(error_msg::MISSING_PORT.to_string())),
        }
    }

    /// Display name: the fragment when present, otherwise the host, with
    /// `fallback` when both sanitize to nothing.
    pub fn display_name(&self, fallback: &str) -> String {
        match self.fragment.as_deref() {
            Some(frag) => sanitize(frag, fallback),
            None => sanitize(&self.host, fallback),
        }
    }
}

/// Parses a decimal port in 1–65535.
pub fn parse_port(raw: &str) -> Result<u16> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidField(format!(
            "{}: {}",
            error_msg::INVALID_PORT,
            raw
        )));
    }
    match raw.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ParseError::InvalidField(format!(
            "{}: {}",
            error_msg::INVALID_PORT,
            raw
        ))),
    }
}

/// Trims a server address, drops IPv6 brackets and rejects values that
/// cannot be written as a bare Clash scalar.
///
/// Empty hosts are `MissingField`; whitespace, control characters, quotes,
/// flow indicators, `#` and overlong hosts are `InvalidField`.
pub fn check_host(host: &str) -> Result<String> {
    let host = normalize_hostname(host.trim());
    if host.is_empty() {
        return Err(ParseError::MissingField(error_msg::MISSING_HOST.to_string()));
    }
    let garbage = host.len() > MAX_HOST_LEN
        || host.chars().any(|c| {
            c.is_whitespace()
                || c.is_control()
                || matches!(c, '"' | '\'' | ',' | '{' | '}' | '[' | ']' | '#' | '\\')
        });
    if garbage {
        let shown: String = host.chars().take(40).collect();
        return Err(ParseError::InvalidField(format!(
            "{}: {:?}",
            error_msg::INVALID_HOST,
            shown
        )));
    }
    Ok(host.to_string())
}

/// Strips one pair of IPv6 brackets, if present.
pub fn normalize_hostname(host: &str) -> &str {
    host.strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host)
}

/// Percent-decodes `s`; broken escapes stay as written and the raw text is
/// kept when the decoded bytes are not UTF-8.
pub fn decode_component(s: &str) -> String {
    urlencoding::decode(s)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| s.to_string())
}

fn split_host_port(host_port: &str) -> Result<(&str, Option<&str>)> {
    if let Some(bracketed) = host_port.strip_prefix('[') {
        let close = bracketed.find(']').ok_or_else(|| {
            ParseError::InvalidFormat("Unterminated IPv6 host".to_string())
        })?;
        let host = &bracketed[..close];
        let after = &bracketed[close + 1..];
        return match after.strip_prefix(':') {
            Some(port) => Ok((host, Some(port))),
            None if after.is_empty() => Ok((host, None)),
            None => Err(ParseError::InvalidFormat(format!(
                "Unexpected text after IPv6 host: {}",
                after
            ))),
        };
    }

    Ok(match host_port.split_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (host_port, None),
    })
}

fn invalid_url(link: &str) -> ParseError {
    let shown: String = link.chars().take(MAX_NAME_CHARS).collect();
    ParseError::InvalidFormat(format!("{}: {}", error_msg::INVALID_URL, shown))
}
