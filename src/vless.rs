//! VLESS link parser
//!
//! URI format: `vless://<uuid>@<address>:<port>[?<query>][#<remark>]`
//!
//! **Required**: `uuid` (userinfo), `address`, `port` (1–65535).
//!
//! **Query parameters** (optional): `security` (tls/reality), `type`/`net`
//! (tcp/ws/grpc/h2/http/httpupgrade/xhttp/kcp), `sni`, `fp`, `flow`, `alpn`,
//! `authority`, `encryption`, `pbk`/`sid`/`spx` (REALITY), transport keys
//! (`path`, `host`, `serviceName`, `mode`, `seed`, `headerType`).
//!
//! ## Parsing rules
//!
//! 1. `security=reality` enables TLS and attaches `reality-opts`;
//!    `security=tls` only enables TLS.
//! 2. `encryption` is stripped of control characters, trimmed and cut at the
//!    first `=`; it defaults to `none`.
//! 3. `network` is the sanitized `type`/`net` value unless the transport
//!    mapping overrides it (e.g. `httpupgrade` becomes `http`).

use crate::ProtocolParser;
use crate::descriptor::{ProxyDescriptor, ProxyType, RealityOpts};
use crate::error::Result;
use crate::link::{LinkParts, decode_component};
use crate::sanitize::{sanitize, strip_control_chars};
use crate::transport::{self, Transports};

/// VLESS protocol parser
#[derive(Debug, Clone, Copy, Default)]
pub struct VLess;

impl ProtocolParser for VLess {
    const TYPE: ProxyType = ProxyType::Vless;

    fn parse(link: &str) -> Result<ProxyDescriptor> {
        let parts = LinkParts::parse(link)?;
        let q = &parts.query;
        let server = parts.require_host()?;
        let port = parts.require_port()?;
        let name = parts.display_name(Self::TYPE.as_str());

        let mut p = ProxyDescriptor::new(Self::TYPE, name, server, port);
        p.uuid = Some(sanitize(&parts.username(), ""));
        p.network = Some(sanitize(
            q.first_non_empty(&["type", "net"]).unwrap_or("tcp"),
            "tcp",
        ));
        p.servername = q.non_empty("sni").map(str::to_string);

        match q.get("security").unwrap_or_default() {
            "reality" => {
                p.tls = Some(true);
                p.reality_opts = Some(reality_opts(&parts));
            }
            "tls" => p.tls = Some(true),
            _ => {}
        }

        p.flow = q.non_empty("flow").map(str::to_string);
        p.alpn = transport::alpn_of(q);
        p.authority = q.non_empty("authority").map(decode_component);
        p.client_fingerprint = q.non_empty("fp").map(str::to_string);
        p.encryption = Some(encryption_of(q.non_empty("encryption")));

        transport::apply(&mut p, q, Transports::Full);
        Ok(p)
    }
}

/// REALITY options from `pbk`, `sid` and `spx`; missing keys stay empty.
pub(crate) fn reality_opts(parts: &LinkParts) -> RealityOpts {
    let q = &parts.query;
    RealityOpts {
        public_key: q.get("pbk").unwrap_or_default().to_string(),
        short_id: q.get("sid").unwrap_or_default().to_string(),
        spiderx: q.get("spx").unwrap_or_default().to_string(),
    }
}

/// Normalizes the `encryption` query value, e.g. `mlkem768x25519plus.native.0rtt=abc`
/// becomes `mlkem768x25519plus.native.0rtt`.
pub(crate) fn encryption_of(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return "none".to_string();
    };
    let cleaned = strip_control_chars(raw);
    let trimmed = cleaned.trim();
    let head = trimmed.split('=').next().unwrap_or_default();
    if head.is_empty() {
        "none".to_string()
    } else {
        head.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reality_link() {
        let p = VLess::parse(
            "vless://uuid@host:443?security=reality&pbk=PBK&sid=SID&sni=www.apple.com&fp=chrome&flow=xtls-rprx-vision#name",
        )
        .unwrap();
        assert_eq!(p.name, "name");
        assert_eq!(p.tls, Some(true));
        let reality = p.reality_opts.unwrap();
        assert_eq!(reality.public_key, "PBK");
        assert_eq!(reality.short_id, "SID");
        assert_eq!(reality.spiderx, "");
        assert_eq!(p.servername.as_deref(), Some("www.apple.com"));
        assert_eq!(p.client_fingerprint.as_deref(), Some("chrome"));
        assert_eq!(p.flow.as_deref(), Some("xtls-rprx-vision"));
        assert_eq!(p.network.as_deref(), Some("tcp"));
        assert_eq!(p.encryption.as_deref(), Some("none"));
    }

    #[test]
    fn plain_link_has_no_tls() {
        let p = VLess::parse("vless://id@10.0.0.1:80").unwrap();
        assert_eq!(p.tls, None);
        assert_eq!(p.name, "10.0.0.1");
        assert_eq!(p.uuid.as_deref(), Some("id"));
    }

    #[test]
    fn encryption_is_truncated_at_equals() {
        assert_eq!(encryption_of(Some(" mlkem768.native=xyz ")), "mlkem768.native");
        assert_eq!(encryption_of(Some("=abc")), "none");
        assert_eq!(encryption_of(Some("\u{1}none")), "none");
        assert_eq!(encryption_of(None), "none");
    }

    #[test]
    fn xhttp_transport() {
        let p = VLess::parse("vless://id@h:443?type=xhttp&path=%2Fx&host=h.example&security=tls").unwrap();
        assert_eq!(p.network.as_deref(), Some("xhttp"));
        let http = p.http_opts.unwrap();
        assert_eq!(http.path, "/x");
        assert_eq!(http.host.as_deref(), Some("h.example"));
    }

    #[test]
    fn missing_port_fails() {
        assert!(VLess::parse("vless://id@host").is_err());
        assert!(VLess::parse("vless://id@:443").is_err());
    }
}
