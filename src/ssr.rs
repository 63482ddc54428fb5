//! ShadowsocksR link parser
//!
//! Link format: `ssr://base64(server:port:protocol:method:obfs:base64(password)/?params)`
//!
//! **Params** (each value Base64-encoded): `obfsparam`, `protoparam` (or
//! `protocolparam`), `remarks`, `group`.
//!
//! ## Parsing rules
//!
//! 1. The whole payload is decoded with the lenient Base64 decoder; it must
//!    contain at least six `:`-separated fields. The password field keeps any
//!    further `:`.
//! 2. Params are split on `&` and `=` without form decoding, so a `+` in a
//!    Base64 value survives.
//! 3. Defaults: protocol `origin`, obfs `plain`, cipher `aes-256-cfb`.
//! 4. A non-plain obfs without an `obfsparam` is downgraded to `plain`.
//! 5. Name: `remarks`, then server, then `ssr`.

use crate::ProtocolParser;
use crate::codec::decode_auto;
use crate::descriptor::{ProxyDescriptor, ProxyType};
use crate::error::{ParseError, Result};
use crate::link::{check_host, parse_port};
use crate::sanitize::sanitize;
use tracing::trace;

/// ShadowsocksR protocol parser
#[derive(Debug, Clone, Copy, Default)]
pub struct ShadowsocksR;

impl ProtocolParser for ShadowsocksR {
    const TYPE: ProxyType = ProxyType::Ssr;

    fn parse(link: &str) -> Result<ProxyDescriptor> {
        let link = link.trim();
        let payload = match link.get(..6) {
            Some(prefix) if prefix.eq_ignore_ascii_case("ssr://") => &link[6..],
            _ => {
                return Err(ParseError::InvalidFormat(
                    "Link must start with ssr://".to_string(),
                ));
            }
        };

        let decoded = decode_auto(payload.trim());
        trace!("SSR payload decoded to {} bytes", decoded.len());
        if !decoded.contains(':') {
            return Err(ParseError::InvalidFormat("Invalid SSR link".to_string()));
        }

        let fields: Vec<&str> = decoded.splitn(6, ':').collect();
        let [server_raw, port_raw, protocol_raw, method_raw, obfs_raw, tail] = fields[..] else {
            return Err(ParseError::InvalidFormat("Invalid SSR tail".to_string()));
        };
        if tail.is_empty() {
            return Err(ParseError::InvalidFormat("Invalid SSR tail".to_string()));
        }

        let (password_b64, params_raw) = tail.split_once("/?").unwrap_or((tail, ""));
        let params = SsrParams::parse(params_raw);

        let server = check_host(&sanitize(server_raw, ""))?;
        let port = parse_port(port_raw)?;

        let mut obfs = sanitize(obfs_raw, "plain");
        let mut obfs_param = params.decoded("obfsparam");
        if obfs_param.is_empty() && !obfs.eq_ignore_ascii_case("plain") {
            obfs = "plain".to_string();
            obfs_param.clear();
        }
        let protocol_param = match params.decoded("protoparam") {
            param if param.is_empty() => params.decoded("protocolparam"),
            param => param,
        };
        let remarks = params.decoded("remarks");

        let name = if remarks.is_empty() {
            sanitize(&server, Self::TYPE.as_str())
        } else {
            sanitize(&remarks, &server)
        };

        let mut p = ProxyDescriptor::new(Self::TYPE, name, server, port);
        p.cipher = Some(sanitize(method_raw, "aes-256-cfb"));
        p.password = Some(sanitize(
            &decode_auto(password_b64.trim_end_matches('/')),
            "",
        ));
        p.protocol = Some(sanitize(protocol_raw, "origin"));
        p.obfs = Some(obfs);
        p.protocol_param = Some(protocol_param).filter(|s| !s.is_empty());
        p.obfs_param = Some(obfs_param).filter(|s| !s.is_empty());
        Ok(p)
    }
}

/// `key=base64value` pairs from the SSR tail
struct SsrParams<'a> {
    pairs: Vec<(&'a str, &'a str)>,
}

impl<'a> SsrParams<'a> {
    fn parse(raw: &'a str) -> Self {
        SsrParams {
            pairs: raw
                .split('&')
                .filter(|s| !s.is_empty())
                .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
                .collect(),
        }
    }

    /// Base64-decoded, sanitized value of `key`; empty when absent.
    fn decoded(&self, key: &str) -> String {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| sanitize(&decode_auto(v), ""))
            .unwrap_or_default()
    }
}
