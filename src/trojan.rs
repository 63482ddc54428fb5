//! Trojan link parser
//!
//! Link format: `trojan://<password>@<host>:<port>[?query][#remark]`
//!
//! **Query parameters** (optional): `security` (tls/reality), `sni`, `fp`,
//! `alpn`, `insecure`, `allowInsecure`, `pbk`/`sid`/`spx` (REALITY),
//! `type` (tcp/ws/grpc) with `path`, `host`, `serviceName`, `mode`.
//!
//! ## Parsing rules
//!
//! 1. The password is the percent-decoded userinfo; it may be empty.
//! 2. TLS is on for `security=tls`, `security=reality` or any `sni`.
//! 3. `insecure` sets `insecure`; `allowInsecure` sets `skip-cert-verify`,
//!    which falls back to the `insecure` value when absent.
//! 4. Only the `ws` and `grpc` transports are mapped.

use crate::ProtocolParser;
use crate::descriptor::{ProxyDescriptor, ProxyType};
use crate::error::Result;
use crate::link::LinkParts;
use crate::sanitize::sanitize;
use crate::transport::{self, Transports};
use crate::vless::reality_opts;

/// Trojan protocol parser
#[derive(Debug, Clone, Copy, Default)]
pub struct Trojan;

impl ProtocolParser for Trojan {
    const TYPE: ProxyType = ProxyType::Trojan;

    fn parse(link: &str) -> Result<ProxyDescriptor> {
        let parts = LinkParts::parse(link)?;
        let q = &parts.query;
        let server = parts.require_host()?;
        let port = parts.require_port()?;
        let name = parts.display_name(Self::TYPE.as_str());

        let mut p = ProxyDescriptor::new(Self::TYPE, name, server, port);
        p.password = Some(sanitize(&parts.username(), ""));

        let security = q.get("security").unwrap_or_default();
        let sni = q.non_empty("sni");
        if matches!(security, "tls" | "reality") || sni.is_some() {
            p.tls = Some(true);
        }
        p.servername = sni.map(str::to_string);

        let insecure = q.flag("insecure");
        p.insecure = insecure;
        p.skip_cert_verify = q.flag("allowInsecure").or(insecure);

        p.client_fingerprint = q.non_empty("fp").map(str::to_string);
        p.alpn = transport::alpn_of(q);
        if security == "reality" {
            p.reality_opts = Some(reality_opts(&parts));
        }

        transport::apply(&mut p, q, Transports::WsGrpc);
        Ok(p)
    }
}
