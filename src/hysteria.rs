//! Hysteria (v1) and Hysteria2 link parsers
//!
//! | Scheme | Parser | Credentials |
//! |--------|--------|-------------|
//! | `hysteria://`, `hy://` | [`Hysteria`] | `auth` query parameter |
//! | `hysteria2://`, `hy2://` | [`Hysteria2`] | userinfo as `password` |
//!
//! **Query parameters**: `sni`, `alpn`, obfuscation type
//! (`obfs`/`obfs-type`/`obfsType`) and password
//! (`obfs-password`/`obfsPassword`, plus `obfsparam`/`obfsParam` for v1).
//! v1 also reads `insecure`, `upmbps` and `downmbps`.
//!
//! ## Obfuscation
//!
//! - v1 emits `obfs: <type>` and `obfs-password` when the type is set, is not
//!   `plain`, and a password is present.
//! - v2 always emits `obfs: salamander`, and only when an obfuscation type key
//!   is explicitly present in the query, is not `plain`, and a password is
//!   present.

use crate::ProtocolParser;
use crate::constants::HY2_OBFS_TYPE;
use crate::descriptor::{ProxyDescriptor, ProxyType};
use crate::error::Result;
use crate::link::{LinkParts, QueryParams};
use crate::sanitize::{sanitize, strip_control_chars};

const OBFS_TYPE_KEYS: [&str; 3] = ["obfs", "obfs-type", "obfsType"];
const OBFS_PASSWORD_KEYS: [&str; 2] = ["obfs-password", "obfsPassword"];
const V1_OBFS_PASSWORD_KEYS: [&str; 4] = ["obfs-password", "obfsPassword", "obfsparam", "obfsParam"];

/// Hysteria v1 parser (`hysteria://`, `hy://`)
#[derive(Debug, Clone, Copy, Default)]
pub struct Hysteria;

/// Hysteria2 parser (`hysteria2://`, `hy2://`)
#[derive(Debug, Clone, Copy, Default)]
pub struct Hysteria2;

impl ProtocolParser for Hysteria {
    const TYPE: ProxyType = ProxyType::Hysteria;

    fn parse(link: &str) -> Result<ProxyDescriptor> {
        let parts = LinkParts::parse(link)?;
        let q = &parts.query;
        let mut p = base(&parts, Self::TYPE)?;

        p.auth = q
            .non_empty("auth")
            .map(|a| sanitize(a, ""))
            .filter(|a| !a.is_empty());
        if q.contains("insecure") {
            p.insecure = Some(matches!(
                q.get("insecure").unwrap_or_default(),
                "1" | "true" | "True"
            ));
        }
        p.up_mbps = q.non_empty("upmbps").map(str::to_string);
        p.down_mbps = q.non_empty("downmbps").map(str::to_string);

        if let Some((obfs, password)) = obfs_pair(q, &V1_OBFS_PASSWORD_KEYS) {
            p.obfs = Some(obfs);
            p.obfs_password = Some(password);
        }
        Ok(p)
    }
}

impl ProtocolParser for Hysteria2 {
    const TYPE: ProxyType = ProxyType::Hysteria2;

    fn parse(link: &str) -> Result<ProxyDescriptor> {
        let parts = LinkParts::parse(link)?;
        let q = &parts.query;
        let mut p = base(&parts, Self::TYPE)?;

        p.password = Some(sanitize(&strip_control_chars(&parts.username()), ""));

        if q.contains_any(&OBFS_TYPE_KEYS) {
            if let Some((_, password)) = obfs_pair(q, &OBFS_PASSWORD_KEYS) {
                p.obfs = Some(HY2_OBFS_TYPE.to_string());
                p.obfs_password = Some(password);
            }
        }
        Ok(p)
    }
}

/// Fields shared by both versions: address, name, `sni` and `alpn`.
fn base(parts: &LinkParts, proxy_type: ProxyType) -> Result<ProxyDescriptor> {
    let q = &parts.query;
    let server = parts.require_host()?;
    let port = parts.require_port()?;
    let name = parts.display_name(proxy_type.as_str());

    let mut p = ProxyDescriptor::new(proxy_type, name, server, port);
    p.servername = q
        .non_empty("sni")
        .map(|s| sanitize(s, ""))
        .filter(|s| !s.is_empty());
    p.alpn = q
        .non_empty("alpn")
        .map(|raw| {
            raw.split(',')
                .map(|x| sanitize(x.trim(), ""))
                .filter(|x| !x.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|list| !list.is_empty());
    Ok(p)
}

/// Lower-cased obfuscation type and its password, when both are usable.
fn obfs_pair(q: &QueryParams, password_keys: &[&str]) -> Option<(String, String)> {
    let obfs = sanitize(q.first_non_empty(&OBFS_TYPE_KEYS).unwrap_or_default(), "").to_lowercase();
    if obfs.is_empty() || obfs == "plain" {
        return None;
    }
    let password = sanitize(q.first_non_empty(password_keys).unwrap_or_default(), "");
    if password.is_empty() {
        return None;
    }
    Some((obfs, password))
}
