//! VMess link parser
//!
//! Two link forms are accepted:
//!
//! | Form | Shape | Notes |
//! |------|-------|-------|
//! | **Legacy JSON** | `vmess://base64(JSON)` | The common subscription format. Every JSON field may be a string or a number. |
//! | **URI** | `vmess://<uuid>@<host>:<port>?<query>#<remark>` | Same query keys as VLESS plus `cipher` and `aid`. |
//!
//! A link is treated as legacy JSON when the part after the scheme has no
//! `@` and there is no query string.
//!
//! ## Legacy JSON fields
//!
//! `ps` (name), `add` (server), `port`, `id` (uuid), `aid` (alterId),
//! `net`/`network`, `tls`/`security`, `scy`/`cipher`, `sni`, `host`, `path`,
//! `mode`, `alpn` (string or list). `add` and `port` are required; the name
//! falls back from `ps` to `add` to `vmess`.

use crate::ProtocolParser;
use crate::codec::decode_auto;
use crate::descriptor::{
    GrpcOpts, H2Opts, HostList, HttpOpts, ProxyDescriptor, ProxyType, WsOpts, split_list,
};
use crate::error::{ParseError, Result};
use crate::link::{LinkParts, check_host, parse_port};
use crate::sanitize::{sanitize, sanitize_opt};
use crate::transport::{self, Transports};
use serde::{Deserialize, Deserializer};
use tracing::trace;

/// Deserializes an optional scalar (string, number or bool) as a string.
fn deserialize_loose_string<'de, D>(d: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Str(String),
        Num(serde_json::Number),
        Bool(bool),
    }
    Ok(match Option::<Scalar>::deserialize(d)? {
        None => None,
        Some(Scalar::Str(s)) => Some(s),
        Some(Scalar::Num(n)) => Some(n.to_string()),
        Some(Scalar::Bool(b)) => Some(b.to_string()),
    })
}

/// `alpn` as written by different panels: one string or a list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AlpnField {
    /// `"h2,http/1.1"`
    One(String),
    /// `["h2", "http/1.1"]`
    Many(Vec<String>),
}

impl AlpnField {
    fn into_list(self) -> Vec<String> {
        match self {
            AlpnField::One(s) => split_list(&s),
            AlpnField::Many(v) => v
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

/// Legacy VMess JSON body, loosely typed on the wire
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VmessJson {
    /// Remark
    #[serde(deserialize_with = "deserialize_loose_string")]
    pub ps: Option<String>,
    /// Server address
    #[serde(deserialize_with = "deserialize_loose_string")]
    pub add: Option<String>,
    /// Server port
    #[serde(deserialize_with = "deserialize_loose_string")]
    pub port: Option<String>,
    /// User id
    #[serde(deserialize_with = "deserialize_loose_string")]
    pub id: Option<String>,
    /// Alter id
    #[serde(deserialize_with = "deserialize_loose_string")]
    pub aid: Option<String>,
    /// Transport (`net`)
    #[serde(deserialize_with = "deserialize_loose_string")]
    pub net: Option<String>,
    /// Transport (`network`, older panels)
    #[serde(deserialize_with = "deserialize_loose_string")]
    pub network: Option<String>,
    /// `"tls"` when TLS is on
    #[serde(deserialize_with = "deserialize_loose_string")]
    pub tls: Option<String>,
    /// `"tls"` when TLS is on (older panels)
    #[serde(deserialize_with = "deserialize_loose_string")]
    pub security: Option<String>,
    /// Cipher
    #[serde(deserialize_with = "deserialize_loose_string")]
    pub scy: Option<String>,
    /// Cipher (older panels)
    #[serde(deserialize_with = "deserialize_loose_string")]
    pub cipher: Option<String>,
    /// TLS server name
    #[serde(deserialize_with = "deserialize_loose_string")]
    pub sni: Option<String>,
    /// Host header / h2 hosts
    #[serde(deserialize_with = "deserialize_loose_string")]
    pub host: Option<String>,
    /// Path or gRPC service name
    #[serde(deserialize_with = "deserialize_loose_string")]
    pub path: Option<String>,
    /// gRPC mode
    #[serde(deserialize_with = "deserialize_loose_string")]
    pub mode: Option<String>,
    /// ALPN
    pub alpn: Option<AlpnField>,
}

/// The two shapes a `vmess://` link can take
#[derive(Debug, Clone, PartialEq)]
pub enum VmessForm {
    /// Base64 JSON body
    Json(VmessJson),
    /// Regular URI with query parameters
    Uri(LinkParts),
}

impl VmessForm {
    /// Detects the link form and decodes the JSON body when present.
    ///
    /// # Errors
    ///
    /// Returns `JsonParseError` when the Base64 body is not a JSON object.
    pub fn detect(link: &str) -> Result<Self> {
        let parts = LinkParts::parse(link)?;
        let rest = parts.rest.strip_suffix('/').unwrap_or(&parts.rest);
        let rest = rest.strip_prefix('/').unwrap_or(rest);

        if rest.contains('@') || !parts.query.is_empty() {
            return Ok(VmessForm::Uri(parts));
        }

        let decoded = decode_auto(rest);
        trace!("VMess JSON body decoded to {} bytes", decoded.len());
        let json: VmessJson = serde_json::from_str(&decoded).map_err(|e| {
            ParseError::JsonParseError(format!("Invalid vmess base64 JSON: {}", e))
        })?;
        Ok(VmessForm::Json(json))
    }
}

/// VMess protocol parser
#[derive(Debug, Clone, Copy, Default)]
pub struct VMess;

impl ProtocolParser for VMess {
    const TYPE: ProxyType = ProxyType::Vmess;

    fn parse(link: &str) -> Result<ProxyDescriptor> {
        match VmessForm::detect(link)? {
            VmessForm::Json(json) => from_json(json),
            VmessForm::Uri(parts) => from_uri(&parts),
        }
    }
}

fn from_json(cfg: VmessJson) -> Result<ProxyDescriptor> {
    let add = cfg.add.as_deref().map(str::trim).unwrap_or_default();
    if add.is_empty() {
        return Err(ParseError::MissingField("add".to_string()));
    }
    let server = check_host(add)?;
    let port = match cfg.port.as_deref() {
        Some(raw) => parse_port(raw)?,
        None => return Err(ParseError::MissingField("port".to_string())),
    };

    let name_source = cfg
        .ps
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(add);
    let name = sanitize(name_source, add);

    let mut p = ProxyDescriptor::new(ProxyType::Vmess, name, server, port);
    p.uuid = Some(sanitize_opt(cfg.id.as_deref(), ""));
    p.cipher = Some(sanitize(
        first_non_empty(&[&cfg.cipher, &cfg.scy]).unwrap_or("auto"),
        "auto",
    ));
    p.alter_id = Some(
        cfg.aid
            .as_deref()
            .and_then(|a| a.trim().parse().ok())
            .unwrap_or(0),
    );
    let network = sanitize(
        first_non_empty(&[&cfg.net, &cfg.network]).unwrap_or("tcp"),
        "tcp",
    );
    p.tls = Some(cfg.tls.as_deref() == Some("tls") || cfg.security.as_deref() == Some("tls"));
    p.servername = first_non_empty(&[&cfg.sni]).map(str::to_string);
    p.alpn = cfg
        .alpn
        .map(AlpnField::into_list)
        .filter(|list| !list.is_empty());

    let path = first_non_empty(&[&cfg.path]).map(str::to_string);
    let host = first_non_empty(&[&cfg.host]).map(str::to_string);
    match network.to_ascii_lowercase().as_str() {
        "ws" => {
            p.ws_opts = Some(WsOpts {
                path: path.unwrap_or_default(),
                host,
            });
        }
        "grpc" => {
            let grpc = GrpcOpts {
                grpc_service_name: path,
                mode: first_non_empty(&[&cfg.mode]).map(str::to_string),
            };
            if !grpc.is_empty() {
                p.grpc_opts = Some(grpc);
            }
        }
        "h2" => {
            let h2 = H2Opts {
                path,
                host: host.as_deref().and_then(HostList::from_csv),
            };
            if !h2.is_empty() {
                p.h2_opts = Some(h2);
            }
        }
        "http" => {
            if path.is_some() || host.is_some() {
                p.http_opts = Some(HttpOpts {
                    path: path.unwrap_or_default(),
                    host,
                });
            }
        }
        _ => {}
    }
    p.network = Some(network);
    Ok(p)
}

fn from_uri(parts: &LinkParts) -> Result<ProxyDescriptor> {
    let q = &parts.query;
    let server = parts.require_host()?;
    let port = parts.require_port()?;
    let name = parts.display_name(ProxyType::Vmess.as_str());

    let mut p = ProxyDescriptor::new(ProxyType::Vmess, name, server, port);
    p.uuid = Some(sanitize(&parts.username(), ""));
    p.cipher = Some(sanitize(q.non_empty("cipher").unwrap_or("auto"), "auto"));
    p.alter_id = Some(
        q.get("aid")
            .and_then(|a| a.trim().parse().ok())
            .unwrap_or(0),
    );
    p.network = Some(sanitize(
        q.first_non_empty(&["type", "net"]).unwrap_or("tcp"),
        "tcp",
    ));
    p.servername = q.non_empty("sni").map(str::to_string);
    if q.get("security") == Some("tls") || q.get("tls") == Some("tls") {
        p.tls = Some(true);
    }
    p.alpn = transport::alpn_of(q);

    transport::apply(&mut p, q, Transports::Common);
    Ok(p)
}

fn first_non_empty<'a>(fields: &[&'a Option<String>]) -> Option<&'a str> {
    fields
        .iter()
        .find_map(|f| f.as_deref().filter(|s| !s.is_empty()))
}
