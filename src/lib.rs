//! # Clash Link Serde
//!
//! Turns proxy subscription links into a Clash (Mihomo) configuration.
//!
//! ## Features
//!
//! - Parse share links of seven protocols into one canonical [`ProxyDescriptor`]
//! - Pull links out of pasted text, Base64 subscription bodies and run-together
//!   link soup ([`extract_links`], [`parse_many`])
//! - Keep proxy names unique and group references consistent
//!   ([`resolve_name_conflicts`])
//! - Maintain an ordered rule list with a pinned terminal `MATCH` rule
//!   ([`RuleOrder`])
//! - Render deterministic YAML for proxies, groups, providers and rules
//!   ([`Document`]), driven by a single owning [`Workspace`]
//!
//! ## Supported Protocols
//!
//! - **[VLess]** (`vless://`): TLS, REALITY, ws/grpc/h2/http/xhttp/kcp transports
//! - **[VMess]** (`vmess://`): legacy Base64 JSON and URI forms
//! - **[Shadowsocks]** (`ss://`): SIP002, legacy Base64 and plain userinfo; strict validation
//! - **[ShadowsocksR]** (`ssr://`): Base64 payload with Base64 params
//! - **[Trojan]** (`trojan://`): TLS/REALITY, ws and grpc
//! - **[Hysteria]** (`hysteria://`, `hy://`) and **[Hysteria2]** (`hysteria2://`, `hy2://`)
//! - **[Tuic]** (`tuic://`)
//!
//! ## Link parsing rules (unified)
//!
//! - **Scheme**: case-insensitive (`VLESS://` is valid).
//! - **Port**: required, 1–65535.
//! - **Query string**: `application/x-www-form-urlencoded`; names are case-sensitive
//!   and the last occurrence of a key wins.
//! - **Fragment (`#`)**: percent-decoded display name; falls back to the host, then
//!   to the protocol tag.
//! - **Names and credentials**: sanitized (NFKC, controls and bidi marks removed,
//!   whitespace collapsed, at most 120 chars).
//! - **Errors**: malformed link → `InvalidFormat`; missing host/port → `MissingField`;
//!   bad value → `InvalidField`; unknown scheme → `UnsupportedProtocol`.
//!
//! ## Example
//!
//! ```rust
//! use clash_link_serde::{ParseOptions, parse_link, parse_many};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let proxy = parse_link("vless://uuid@example.com:443?security=tls#Node")?;
//! assert_eq!(proxy.name, "Node");
//!
//! let outcome = parse_many(
//!     "trojan://pw@a.example:443#A\nnot-a-link",
//!     ParseOptions { collect_errors: true },
//! );
//! assert_eq!(outcome.proxies.len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod batch;
mod codec;
mod conflict;
mod constants;
mod descriptor;
mod error;
mod extract;
mod geo;
mod group;
mod hysteria;
mod link;
mod provider;
mod rules;
mod sanitize;
mod settings;
mod shadowsocks;
mod ssr;
mod transport;
mod trojan;
mod tuic;
mod validate;
mod vless;
mod vmess;
mod workspace;
mod yaml;

#[cfg(test)]
mod conversion_comprehensive;

pub use batch::{LinkError, ParseOptions, ParseOutcome, parse_many};
pub use codec::{decode_auto, looks_like_base64};
pub use conflict::resolve_name_conflicts;
pub use constants::{MATCH_ENTRY_ID, PRESET_RULES, policy, scheme};
pub use descriptor::{
    GrpcOpts, H2Opts, HostList, HttpOpts, KcpOpts, ProxyDescriptor, ProxyType, RealityOpts,
    TcpOpts, WsOpts,
};
pub use error::{ParseError, Result, SettingsError, ValidationError};
pub use extract::extract_links;
pub use geo::{LoadEvent, collect_lines, filter_entries, iso_to_flag, spawn_line_loader};
pub use group::{GroupType, ProxyGroup};
pub use hysteria::{Hysteria, Hysteria2};
pub use link::{LinkParts, QueryParams};
pub use provider::{FetchMode, RuleProvider, RuleProviderInput, Subscription};
pub use rules::{
    ManualRule, MatchPolicy, MatchSelection, RuleAction, RuleEntry, RuleKind, RuleOrder,
    RuleSelections, build_rule_entries, rebuild_order,
};
pub use sanitize::{sanitize, strip_control_chars};
pub use settings::{HealthCheck, Overrides, RuleProviderDefaults, Settings};
pub use shadowsocks::Shadowsocks;
pub use ssr::ShadowsocksR;
pub use trojan::Trojan;
pub use tuic::Tuic;
pub use validate::{ManualRuleType, normalize_manual_rule};
pub use vless::VLess;
pub use vmess::{AlpnField, VMess, VmessForm, VmessJson};
pub use workspace::{BuildReport, BuildStatus, RuleMove, Workspace};
pub use yaml::{
    Document, emit_groups, emit_proxies, emit_rule_providers, emit_rules,
    emit_subscription_providers, yaml_quote,
};

use tracing::debug;

/// Trait implemented by every per-protocol link parser
pub trait ProtocolParser {
    /// Proxy type produced by this parser
    const TYPE: ProxyType;

    /// Parse one link of this protocol into a descriptor
    ///
    /// # Errors
    ///
    /// Returns `ParseError` when the link is malformed, misses its host or
    /// port, or carries an invalid value.
    ///
    /// # Example
    ///
    /// ```rust
    /// use clash_link_serde::{ProtocolParser, Trojan};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let proxy = Trojan::parse("trojan://secret@t.example.com:443?sni=t.example.com")?;
    /// assert_eq!(proxy.password.as_deref(), Some("secret"));
    /// # Ok(())
    /// # }
    /// ```
    fn parse(link: &str) -> Result<ProxyDescriptor>;
}

/// Parse any supported link, picking the parser from its scheme
///
/// `ssr://` links are recognized before generic URI splitting since their
/// body is not a URI. Scheme matching is case-insensitive.
///
/// # Errors
///
/// Returns `InvalidFormat` for empty input or text without `://`,
/// `UnsupportedProtocol` (`"Unsupported scheme: <s>"`) for unknown schemes,
/// and whatever the protocol parser reports otherwise.
///
/// # Example
///
/// ```rust
/// use clash_link_serde::{ProxyType, parse_link};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let proxy = parse_link("HY2://pass@h.example:8443#H2")?;
/// assert_eq!(proxy.proxy_type, ProxyType::Hysteria2);
/// assert!(parse_link("socks5://h:1").is_err());
/// # Ok(())
/// # }
/// ```
pub fn parse_link(link: &str) -> Result<ProxyDescriptor> {
    let link = link.trim();
    if link.is_empty() {
        return Err(ParseError::InvalidFormat("Empty url".to_string()));
    }

    let lower_prefix = link
        .get(..scheme::SHADOWSOCKSR.len())
        .map(str::to_ascii_lowercase);
    if lower_prefix.as_deref() == Some(scheme::SHADOWSOCKSR) {
        return ShadowsocksR::parse(link);
    }

    let parts = LinkParts::parse(link)?;
    debug!("Dispatching {} link", parts.scheme);
    match parts.scheme.as_str() {
        "vless" => VLess::parse(link),
        "vmess" => VMess::parse(link),
        "ss" => Shadowsocks::parse(link),
        "trojan" => Trojan::parse(link),
        "hysteria" | "hy" => Hysteria::parse(link),
        "hysteria2" | "hy2" => Hysteria2::parse(link),
        "tuic" => Tuic::parse(link),
        other => Err(ParseError::UnsupportedProtocol(format!(
            "Unsupported scheme: {}",
            other
        ))),
    }
}
