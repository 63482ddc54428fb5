//! Shadowsocks link parser
//!
//! Accepted forms:
//!
//! - `ss://base64(method:password@host:port)#tag` (legacy, whole body encoded)
//! - `ss://base64(method:password)@host:port[/?plugin=...]#tag` (SIP002)
//! - `ss://method:password@host:port#tag` (plain userinfo, percent-encoded)
//!
//! ## Parsing rules
//!
//! 1. When the part after `ss://` has no `@` and looks like Base64 it is
//!    decoded as `method:password[@host:port]`.
//! 2. Otherwise the userinfo is percent-decoded, then Base64-decoded when it
//!    looks like Base64 and the result contains `:`.
//! 3. An `encryption` query value replaces the cipher. If no password was
//!    given and the old method looks like a UUID/hex key, it becomes the
//!    password.
//! 4. `plugin=name;k=v;flag` becomes `plugin: name` plus ordered
//!    `plugin-opts` (bare flags map to `"true"`).
//!
//! Shadowsocks is validated strictly because garbage subscriptions often
//! decode to something that looks like a link: the host must be a clean
//! token of at most 255 chars, the port must be in range, the cipher must be
//! on the allow-list and the password must be non-empty and free of
//! `{`, `}`, `,` and `"`.

use crate::ProtocolParser;
use crate::codec::{decode_auto, looks_like_base64};
use crate::constants::SS_ALLOWED_CIPHERS;
use crate::descriptor::{ProxyDescriptor, ProxyType};
use crate::error::{ParseError, Result};
use crate::link::{LinkParts, QueryParams, check_host, normalize_hostname, parse_port};
use crate::sanitize::{sanitize, strip_control_chars};
use crate::vless::encryption_of;

/// Cipher used when the link carries no method at all.
const DEFAULT_CIPHER: &str = "aes-256-gcm";

/// Shadowsocks protocol parser
#[derive(Debug, Clone, Copy, Default)]
pub struct Shadowsocks;

/// Credentials and address pieces before validation
#[derive(Debug, Default)]
struct RawCredentials {
    method: Option<String>,
    password: Option<String>,
    host: Option<String>,
    port: Option<String>,
}

impl ProtocolParser for Shadowsocks {
    const TYPE: ProxyType = ProxyType::Ss;

    fn parse(link: &str) -> Result<ProxyDescriptor> {
        let parts = LinkParts::parse(link)?;
        let q = &parts.query;

        let mut raw = decode_whole_body(&parts);
        if raw.method.is_none() {
            decode_userinfo(&parts, &mut raw);
        }
        if raw.host.is_none() && !parts.host.is_empty() {
            raw.host = Some(parts.host.clone());
        }
        if raw.port.is_none() {
            raw.port = parts.port.clone();
        }

        let mut method = strip_control_chars(raw.method.as_deref().unwrap_or_default());
        if method.is_empty() {
            method = DEFAULT_CIPHER.to_string();
        }
        let mut password = strip_control_chars(raw.password.as_deref().unwrap_or_default());

        if let Some(enc) = q.non_empty("encryption") {
            if password.is_empty() && looks_like_key(&method) {
                password = method.clone();
            }
            method = encryption_of(Some(enc));
        }

        let raw_host = raw.host.as_deref().unwrap_or_default();
        let host = check_host(raw_host).map_err(|_| invalid("host", raw_host))?;
        let port = parse_port(raw.port.as_deref().unwrap_or_default())
            .map_err(|_| invalid("port", raw.port.as_deref().unwrap_or_default()))?;
        let cipher = validate_cipher(&method)?;
        let password = validate_password(&password)?;

        let name = match parts.fragment.as_deref() {
            Some(frag) => sanitize(frag, &host),
            None => sanitize(&host, ProxyType::Ss.as_str()),
        };

        let mut p = ProxyDescriptor::new(Self::TYPE, name, host, port);
        p.cipher = Some(sanitize(&cipher, DEFAULT_CIPHER));
        p.password = Some(sanitize(&password, ""));
        apply_plugin(&mut p, q);
        Ok(p)
    }
}

/// Legacy form: the whole body is `base64(method:password[@host:port])`.
fn decode_whole_body(parts: &LinkParts) -> RawCredentials {
    let rest = parts.rest.trim_start_matches('/');
    if rest.is_empty() || rest.contains('@') || !looks_like_base64(rest) {
        return RawCredentials::default();
    }
    let decoded = decode_auto(rest);
    if decoded.is_empty() {
        return RawCredentials::default();
    }

    let mut raw = RawCredentials::default();
    let userinfo = match decoded.rsplit_once('@') {
        Some((userinfo, hostinfo)) => {
            match hostinfo.rsplit_once(':') {
                Some((host, port)) => {
                    raw.host = Some(normalize_hostname(host).to_string());
                    raw.port = Some(port.trim_end_matches('/').to_string());
                }
                None => raw.host = Some(hostinfo.to_string()),
            }
            userinfo
        }
        None => decoded.as_str(),
    };
    let (method, password) = split_method(userinfo);
    raw.method = Some(method);
    raw.password = Some(password);
    raw
}

/// SIP002 and plain forms: credentials live in the userinfo.
fn decode_userinfo(parts: &LinkParts, raw: &mut RawCredentials) {
    let mut user = parts.username();
    if user.is_empty() {
        return;
    }
    if looks_like_base64(&user) {
        let decoded = decode_auto(&user);
        if decoded.contains(':') {
            user = decoded;
        }
    }
    let (method, password) = split_method(&user);
    raw.method = Some(method);
    raw.password = Some(password);
}

/// `method:password`; the password keeps any further `:`.
fn split_method(userinfo: &str) -> (String, String) {
    match userinfo.split_once(':') {
        Some((method, password)) => (method.to_string(), password.to_string()),
        None => (userinfo.to_string(), String::new()),
    }
}

/// UUID or hex key written where a method was expected.
fn looks_like_key(method: &str) -> bool {
    let lower = method.to_ascii_lowercase();
    method.len() >= 16
        && method.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
        && !lower.contains("gcm")
        && !lower.contains("chacha")
}

fn validate_cipher(method: &str) -> Result<String> {
    let cipher = method.trim().to_lowercase();
    if !SS_ALLOWED_CIPHERS.contains(&cipher.as_str()) {
        return Err(invalid("cipher", &cipher));
    }
    Ok(cipher)
}

fn validate_password(password: &str) -> Result<String> {
    let password = password.trim();
    if password.is_empty() || password.contains(['{', '}', ',', '"']) {
        return Err(ParseError::InvalidField("Invalid SS password".to_string()));
    }
    Ok(password.to_string())
}

fn apply_plugin(p: &mut ProxyDescriptor, q: &QueryParams) {
    let Some(plugin) = q.non_empty("plugin") else {
        return;
    };
    let mut segments = plugin.split(';');
    let name = segments.next().unwrap_or_default().trim();
    if name.is_empty() {
        return;
    }
    p.plugin = Some(name.to_string());

    let mut opts: Vec<(String, String)> = Vec::new();
    for segment in segments.filter(|s| !s.is_empty()) {
        let (key, value) = segment.split_once('=').unwrap_or((segment, "true"));
        match opts.iter_mut().find(|(k, _)| k == key) {
            Some(existing) => existing.1 = value.to_string(),
            None => opts.push((key.to_string(), value.to_string())),
        }
    }
    if !opts.is_empty() {
        p.plugin_opts = Some(opts);
    }
}

fn invalid(what: &str, value: &str) -> ParseError {
    let shown: String = value.chars().take(40).collect();
    ParseError::InvalidField(format!("Invalid SS {}: {}", what, shown))
}
