//! Canonical proxy descriptor
//!
//! Every parser produces a [`ProxyDescriptor`]. Field names follow the Clash
//! (Mihomo) proxy schema; optional fields stay `None` when the link did not
//! carry them, so the serializer can omit them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Proxy protocol of a descriptor
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    /// VLESS
    Vless,
    /// VMess
    Vmess,
    /// Shadowsocks
    Ss,
    /// ShadowsocksR
    Ssr,
    /// Trojan
    Trojan,
    /// Hysteria v1
    Hysteria,
    /// Hysteria v2
    Hysteria2,
    /// TUIC
    Tuic,
}

impl ProxyType {
    /// Clash `type` value, also used as the last-resort display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyType::Vless => "vless",
            ProxyType::Vmess => "vmess",
            ProxyType::Ss => "ss",
            ProxyType::Ssr => "ssr",
            ProxyType::Trojan => "trojan",
            ProxyType::Hysteria => "hysteria",
            ProxyType::Hysteria2 => "hysteria2",
            ProxyType::Tuic => "tuic",
        }
    }
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// WebSocket transport options (`ws-opts`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WsOpts {
    /// Request path
    pub path: String,
    /// `Host` header, serialized as `headers: { Host: .. }`
    #[serde(
        rename = "headers",
        with = "host_header",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub host: Option<String>,
}

/// gRPC transport options (`grpc-opts`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct GrpcOpts {
    /// Service name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grpc_service_name: Option<String>,
    /// Transport mode (gun/multi)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

impl GrpcOpts {
    /// True when neither field is set.
    pub fn is_empty(&self) -> bool {
        self.grpc_service_name.is_none() && self.mode.is_none()
    }
}

/// One host or several hosts, as written in the link
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum HostList {
    /// Single host
    Single(String),
    /// Comma separated hosts
    Many(Vec<String>),
}

impl HostList {
    /// Splits a comma separated host list; `None` when nothing remains.
    pub fn from_csv(raw: &str) -> Option<HostList> {
        let mut hosts: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .collect();
        match hosts.len() {
            0 => None,
            1 => hosts.pop().map(HostList::Single),
            _ => Some(HostList::Many(hosts)),
        }
    }
}

/// HTTP/2 transport options (`h2-opts`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct H2Opts {
    /// Request path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Host(s)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<HostList>,
}

impl H2Opts {
    /// True when neither field is set.
    pub fn is_empty(&self) -> bool {
        self.path.is_none() && self.host.is_none()
    }
}

/// HTTP transport options (`http-opts`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HttpOpts {
    /// Request path; emitted as a one-element list
    #[serde(with = "one_element_list", default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    /// `Host` header, serialized as `headers: { Host: [..] }`
    #[serde(
        rename = "headers",
        with = "host_header_list",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub host: Option<String>,
}

/// A string or a list of strings; only the first item is kept.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl Default for OneOrMany {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl OneOrMany {
    fn into_first(self) -> Option<String> {
        match self {
            OneOrMany::One(s) => Some(s),
            OneOrMany::Many(list) => list.into_iter().next(),
        }
    }
}

#[derive(Deserialize)]
struct Headers {
    #[serde(rename = "Host", default)]
    host: OneOrMany,
}

mod host_header {
    use super::Headers;
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(host: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(usize::from(host.is_some())))?;
        if let Some(host) = host {
            map.serialize_entry("Host", host)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let headers = Headers::deserialize(d)?;
        Ok(headers.host.into_first())
    }
}

mod host_header_list {
    use serde::Serializer;
    use serde::ser::SerializeMap;

    pub use super::host_header::deserialize;

    pub fn serialize<S: Serializer>(host: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(usize::from(host.is_some())))?;
        if let Some(host) = host {
            map.serialize_entry("Host", std::slice::from_ref(host))?;
        }
        map.end()
    }
}

mod one_element_list {
    use super::OneOrMany;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[allow(clippy::ptr_arg)]
    pub fn serialize<S: Serializer>(value: &String, s: S) -> Result<S::Ok, S::Error> {
        std::slice::from_ref(value).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(OneOrMany::deserialize(d)?.into_first().unwrap_or_default())
    }
}

/// mKCP transport options (`kcp-opts`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct KcpOpts {
    /// Obfuscation seed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<String>,
    /// Header type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_type: Option<String>,
}

impl KcpOpts {
    /// True when neither field is set.
    pub fn is_empty(&self) -> bool {
        self.seed.is_none() && self.header_type.is_none()
    }
}

/// Raw TCP options (`tcp-opts`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct TcpOpts {
    /// Header type
    pub header_type: String,
}

/// REALITY options (`reality-opts`)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct RealityOpts {
    /// Server public key (`pbk`)
    pub public_key: String,
    /// Short id (`sid`)
    pub short_id: String,
    /// Spider path (`spx`)
    pub spiderx: String,
}

/// One parsed proxy entry
///
/// `name`, `type`, `server` and `port` are always present. `udp` is always
/// true. Everything else is only set when the link supplied it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct ProxyDescriptor {
    /// Display name
    pub name: String,
    /// Protocol
    #[serde(rename = "type")]
    pub proxy_type: ProxyType,
    /// Hostname or IP literal, without IPv6 brackets
    pub server: String,
    /// Port, 1–65535
    pub port: u16,
    /// User id (VLESS, VMess, TUIC)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    /// Password; may be empty but is still emitted when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Cipher (VMess security, SS/SSR method)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cipher: Option<String>,
    /// VMess alter id
    #[serde(rename = "alterId", skip_serializing_if = "Option::is_none")]
    pub alter_id: Option<u32>,
    /// Transport network
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// XTLS flow
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,
    /// TLS server name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servername: Option<String>,
    /// uTLS fingerprint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_fingerprint: Option<String>,
    /// TUIC SNI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,
    /// Hysteria v1 auth string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    /// TUIC v4 token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// SSR protocol
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    /// Obfuscation type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obfs: Option<String>,
    /// SSR protocol parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_param: Option<String>,
    /// SSR obfuscation parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obfs_param: Option<String>,
    /// Hysteria obfuscation password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obfs_password: Option<String>,
    /// VLESS encryption
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption: Option<String>,
    /// TLS enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<bool>,
    /// UDP relay, always true
    pub udp: bool,
    /// Hysteria/Trojan `insecure`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,
    /// Skip certificate verification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_cert_verify: Option<bool>,
    /// Upload bandwidth hint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub up_mbps: Option<String>,
    /// Download bandwidth hint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub down_mbps: Option<String>,
    /// ALPN list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpn: Option<Vec<String>>,
    /// VLESS `authority`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,
    /// TUIC congestion controller
    #[serde(skip_serializing_if = "Option::is_none")]
    pub congestion_controller: Option<String>,
    /// TUIC UDP relay mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub udp_relay_mode: Option<String>,
    /// TUIC disable SNI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_sni: Option<bool>,
    /// SS plugin name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
    /// SS plugin options in link order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugin_opts: Option<Vec<(String, String)>>,
    /// WebSocket options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ws_opts: Option<WsOpts>,
    /// gRPC options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grpc_opts: Option<GrpcOpts>,
    /// HTTP/2 options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h2_opts: Option<H2Opts>,
    /// HTTP options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_opts: Option<HttpOpts>,
    /// mKCP options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kcp_opts: Option<KcpOpts>,
    /// TCP options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tcp_opts: Option<TcpOpts>,
    /// REALITY options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reality_opts: Option<RealityOpts>,
}

impl ProxyDescriptor {
    /// Creates a descriptor with only the mandatory fields set.
    pub fn new(proxy_type: ProxyType, name: String, server: String, port: u16) -> Self {
        ProxyDescriptor {
            name,
            proxy_type,
            server,
            port,
            uuid: None,
            password: None,
            cipher: None,
            alter_id: None,
            network: None,
            flow: None,
            servername: None,
            client_fingerprint: None,
            sni: None,
            auth: None,
            token: None,
            protocol: None,
            obfs: None,
            protocol_param: None,
            obfs_param: None,
            obfs_password: None,
            encryption: None,
            tls: None,
            udp: true,
            insecure: None,
            skip_cert_verify: None,
            up_mbps: None,
            down_mbps: None,
            alpn: None,
            authority: None,
            congestion_controller: None,
            udp_relay_mode: None,
            disable_sni: None,
            plugin: None,
            plugin_opts: None,
            ws_opts: None,
            grpc_opts: None,
            h2_opts: None,
            http_opts: None,
            kcp_opts: None,
            tcp_opts: None,
            reality_opts: None,
        }
    }

    /// Serializes the descriptor as a JSON object with Clash key names.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Splits a comma separated list, trimming items and dropping empty ones.
pub(crate) fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
