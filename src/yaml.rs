//! Clash configuration text
//!
//! Output format:
//! - Every block starts with its top-level key (`proxies:`, `proxy-groups:`, ...)
//!   and list items are indented by two spaces.
//! - Strings are double-quoted with `\` and `"` escaped and control characters
//!   (except tab and line breaks) removed. Hostnames, ports and other numbers
//!   are written bare.
//! - Empty values are left out, except `password`, which is written even when
//!   empty.
//! - Entries are separated by a blank line and appear in their stored order,
//!   so the same input always renders to the same bytes.

use crate::descriptor::{HostList, ProxyDescriptor};
use crate::group::ProxyGroup;
use crate::provider::{RuleProvider, Subscription};
use crate::rules::RuleEntry;
use crate::settings::{Overrides, Settings};

/// Quotes a string for a double-quoted YAML scalar.
///
/// # Example
///
/// ```rust
/// use clash_link_serde::yaml_quote;
///
/// assert_eq!(yaml_quote("a \"b\" \\ c\u{7}"), r#""a \"b\" \\ c""#);
/// ```
pub fn yaml_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\t' | '\n' | '\r' => out.push(c),
            c if c.is_ascii_control() => {}
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Line buffer shared by the block emitters
#[derive(Default)]
struct Emitter {
    lines: Vec<String>,
}

impl Emitter {
    fn line(&mut self, indent: usize, text: &str) {
        self.lines.push(format!("{}{}", " ".repeat(indent), text));
    }

    fn blank(&mut self) {
        self.lines.push(String::new());
    }

    /// Quoted `key: "value"`; empty values are skipped.
    fn kv(&mut self, indent: usize, key: &str, value: &str) {
        if value.is_empty() {
            return;
        }
        self.line(indent, &format!("{}: {}", key, yaml_quote(value)));
    }

    fn opt_kv(&mut self, indent: usize, key: &str, value: Option<&String>) {
        if let Some(v) = value {
            self.kv(indent, key, v);
        }
    }

    fn bare(&mut self, indent: usize, key: &str, value: impl std::fmt::Display) {
        self.line(indent, &format!("{}: {}", key, value));
    }

    fn flag(&mut self, indent: usize, key: &str, value: Option<bool>) {
        if let Some(v) = value {
            self.bare(indent, key, v);
        }
    }

    /// Bare when numeric, quoted otherwise.
    fn number_like(&mut self, indent: usize, key: &str, value: Option<&String>) {
        match value {
            Some(v) if !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()) => {
                self.bare(indent, key, v)
            }
            Some(v) => self.kv(indent, key, v),
            None => {}
        }
    }

    fn list(&mut self, indent: usize, key: &str, items: &[String]) {
        if items.is_empty() {
            return;
        }
        self.line(indent, &format!("{}:", key));
        for item in items {
            self.line(indent + 2, &format!("- {}", yaml_quote(item)));
        }
    }

    fn finish(self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

fn emit_proxy(e: &mut Emitter, p: &ProxyDescriptor) {
    let name = if p.name.is_empty() { "proxy" } else { &p.name };
    e.line(2, &format!("- name: {}", yaml_quote(name)));
    e.kv(4, "type", p.proxy_type.as_str());
    e.bare(4, "server", &p.server);
    e.bare(4, "port", p.port);

    e.opt_kv(4, "uuid", p.uuid.as_ref());
    if let Some(password) = &p.password {
        e.line(4, &format!("password: {}", yaml_quote(password)));
    }
    e.opt_kv(4, "cipher", p.cipher.as_ref());
    if let Some(aid) = p.alter_id {
        e.bare(4, "alterId", aid);
    }
    let strings = [
        ("network", &p.network),
        ("flow", &p.flow),
        ("servername", &p.servername),
        ("client-fingerprint", &p.client_fingerprint),
        ("sni", &p.sni),
        ("auth", &p.auth),
        ("token", &p.token),
        ("protocol", &p.protocol),
        ("obfs", &p.obfs),
        ("protocol-param", &p.protocol_param),
        ("obfs-param", &p.obfs_param),
        ("obfs-password", &p.obfs_password),
        ("encryption", &p.encryption),
    ];
    for (key, value) in strings {
        e.opt_kv(4, key, value.as_ref());
    }

    e.flag(4, "tls", p.tls);
    e.bare(4, "udp", p.udp);
    e.flag(4, "insecure", p.insecure);
    e.flag(4, "skip-cert-verify", p.skip_cert_verify);

    e.number_like(4, "up-mbps", p.up_mbps.as_ref());
    e.number_like(4, "down-mbps", p.down_mbps.as_ref());
    if let Some(alpn) = &p.alpn {
        e.list(4, "alpn", alpn);
    }
    e.opt_kv(4, "authority", p.authority.as_ref());
    e.opt_kv(4, "congestion-controller", p.congestion_controller.as_ref());
    e.opt_kv(4, "udp-relay-mode", p.udp_relay_mode.as_ref());
    e.flag(4, "disable-sni", p.disable_sni);

    e.opt_kv(4, "plugin", p.plugin.as_ref());
    if let Some(opts) = p.plugin_opts.as_ref().filter(|o| !o.is_empty()) {
        e.line(4, "plugin-opts:");
        for (k, v) in opts {
            e.kv(6, k, v);
        }
    }

    emit_transport_opts(e, p);
}

fn emit_transport_opts(e: &mut Emitter, p: &ProxyDescriptor) {
    if let Some(ws) = &p.ws_opts {
        e.line(4, "ws-opts:");
        e.kv(6, "path", &ws.path);
        if let Some(host) = ws.host.as_ref().filter(|h| !h.is_empty()) {
            e.line(6, "headers:");
            e.kv(8, "Host", host);
        }
    }
    if let Some(reality) = &p.reality_opts {
        e.line(4, "reality-opts:");
        e.kv(6, "public-key", &reality.public_key);
        e.kv(6, "short-id", &reality.short_id);
        e.kv(6, "spiderx", &reality.spiderx);
    }
    if let Some(grpc) = p.grpc_opts.as_ref().filter(|g| !g.is_empty()) {
        e.line(4, "grpc-opts:");
        e.opt_kv(6, "grpc-service-name", grpc.grpc_service_name.as_ref());
        e.opt_kv(6, "mode", grpc.mode.as_ref());
    }
    if let Some(h2) = p.h2_opts.as_ref().filter(|h| !h.is_empty()) {
        e.line(4, "h2-opts:");
        e.opt_kv(6, "path", h2.path.as_ref());
        match &h2.host {
            Some(HostList::Single(host)) => e.kv(6, "host", host),
            Some(HostList::Many(hosts)) => e.list(6, "host", hosts),
            None => {}
        }
    }
    if let Some(http) = &p.http_opts {
        e.line(4, "http-opts:");
        if !http.path.is_empty() {
            e.list(6, "path", std::slice::from_ref(&http.path));
        }
        if let Some(host) = http.host.as_ref().filter(|h| !h.is_empty()) {
            e.line(6, "headers:");
            e.list(8, "Host", std::slice::from_ref(host));
        }
    }
    if let Some(kcp) = p.kcp_opts.as_ref().filter(|k| !k.is_empty()) {
        e.line(4, "kcp-opts:");
        e.opt_kv(6, "seed", kcp.seed.as_ref());
        if let Some(header) = &kcp.header_type {
            e.line(6, "header:");
            e.kv(8, "type", header);
        }
    }
    if let Some(tcp) = &p.tcp_opts {
        e.line(4, "tcp-opts:");
        e.line(6, "header:");
        e.kv(8, "type", &tcp.header_type);
    }
}

/// Renders the `proxies:` block.
///
/// # Example
///
/// ```rust
/// use clash_link_serde::{emit_proxies, parse_link};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let proxy = parse_link("trojan://secret@example.com:443?sni=example.com#Home")?;
/// let yaml = emit_proxies(&[proxy]);
/// assert!(yaml.starts_with("proxies:\n  - name: \"Home\"\n    type: \"trojan\"\n"));
/// assert!(yaml.contains("    server: example.com\n    port: 443\n"));
/// # Ok(())
/// # }
/// ```
pub fn emit_proxies(proxies: &[ProxyDescriptor]) -> String {
    let mut e = Emitter::default();
    e.line(0, "proxies:");
    for (i, proxy) in proxies.iter().enumerate() {
        if i > 0 {
            e.blank();
        }
        emit_proxy(&mut e, proxy);
    }
    e.finish()
}

/// Renders the `proxy-groups:` block; empty string when there are no groups.
pub fn emit_groups(groups: &[ProxyGroup]) -> String {
    if groups.is_empty() {
        return String::new();
    }
    let mut e = Emitter::default();
    e.line(0, "proxy-groups:");
    for (i, group) in groups.iter().enumerate() {
        if i > 0 {
            e.blank();
        }
        let name = if group.name.is_empty() { "GROUP" } else { &group.name };
        e.line(2, &format!("- name: {}", yaml_quote(name)));
        e.bare(4, "type", group.group_type);
        if let Some(icon) = group.icon.as_ref().filter(|i| !i.is_empty()) {
            e.bare(4, "icon", icon);
        }
        let members = group.members();
        if !members.is_empty() {
            e.line(4, "proxies:");
            for member in &members {
                e.line(4, &format!("- {}", yaml_quote(member)));
            }
        }
        if !group.use_subs.is_empty() {
            e.line(4, "use:");
            for sub in &group.use_subs {
                e.line(4, &format!("- {}", yaml_quote(sub)));
            }
        }
    }
    e.finish()
}

/// Renders the `rules:` block from an ordered entry list.
pub fn emit_rules(entries: &[RuleEntry]) -> String {
    let mut e = Emitter::default();
    e.line(0, "rules:");
    for entry in entries {
        e.line(2, &format!("- {}", entry.to_rule_line()));
    }
    e.finish()
}

/// Renders the `proxy-providers:` block; empty string when there are no
/// subscriptions.
pub fn emit_subscription_providers(subs: &[Subscription], settings: &Settings) -> String {
    if subs.is_empty() {
        return String::new();
    }
    let health = &settings.health_check;
    let mut e = Emitter::default();
    e.line(0, "proxy-providers:");
    for sub in subs {
        let interval = if sub.interval == 0 {
            settings.subscription_interval
        } else {
            sub.interval
        };
        e.line(2, &format!("{}:", sub.name));
        e.bare(4, "type", "http");
        e.line(4, &format!("url: {}", yaml_quote(&sub.url)));
        e.bare(4, "interval", interval);
        e.bare(4, "path", format!("{}/{}.yaml", settings.providers_dir, sub.name));
        if let Some(proxy) = sub.effective_proxy() {
            e.bare(4, "proxy", proxy);
        }
        e.line(4, "health-check:");
        e.bare(6, "enable", health.enable);
        e.bare(6, "url", &health.url);
        e.bare(6, "interval", health.interval);
    }
    e.finish()
}

/// Renders the `rule-providers:` block; empty string when there are no
/// providers.
pub fn emit_rule_providers(providers: &[RuleProvider]) -> String {
    if providers.is_empty() {
        return String::new();
    }
    let mut e = Emitter::default();
    e.line(0, "rule-providers:");
    for (i, rp) in providers.iter().enumerate() {
        if i > 0 {
            e.blank();
        }
        let provider_type = if rp.provider_type.is_empty() {
            "http"
        } else {
            &rp.provider_type
        };
        e.line(2, &format!("{}:", rp.name));
        e.bare(4, "type", provider_type);
        if !rp.path.is_empty() {
            e.line(4, &format!("path: {}", yaml_quote(&rp.path)));
        }
        e.line(4, &format!("url: {}", yaml_quote(&rp.url)));
        if let Some(interval) = rp.interval {
            e.bare(4, "interval", interval);
        }
        if let Some(proxy) = rp.proxy.as_ref().filter(|p| !p.is_empty()) {
            e.bare(4, "proxy", proxy);
        }
        if !rp.behavior.is_empty() {
            e.bare(4, "behavior", &rp.behavior);
        }
        if !rp.format.is_empty() {
            e.bare(4, "format", &rp.format);
        }
    }
    e.finish()
}

/// A full configuration assembled from rendered blocks
///
/// Empty blocks are skipped. The rest are trimmed and joined with one blank
/// line, in the order proxies, proxy-providers, proxy-groups, rule-providers,
/// rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    /// `proxies:` block
    pub proxies: String,
    /// `proxy-providers:` block
    pub proxy_providers: String,
    /// `proxy-groups:` block
    pub proxy_groups: String,
    /// `rule-providers:` block
    pub rule_providers: String,
    /// `rules:` block
    pub rules: String,
}

impl Document {
    /// Replaces generated blocks with the non-empty user overrides.
    pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
        let slots = [
            (&mut self.proxy_groups, &overrides.groups),
            (&mut self.proxy_providers, &overrides.proxy_providers),
            (&mut self.rule_providers, &overrides.rule_providers),
            (&mut self.rules, &overrides.rules),
        ];
        for (block, replacement) in slots {
            if let Some(text) = replacement {
                *block = text.clone();
            }
        }
        self
    }

    /// True when every block is blank.
    pub fn is_empty(&self) -> bool {
        self.blocks().all(|b| b.trim().is_empty())
    }

    fn blocks(&self) -> impl Iterator<Item = &String> {
        [
            &self.proxies,
            &self.proxy_providers,
            &self.proxy_groups,
            &self.rule_providers,
            &self.rules,
        ]
        .into_iter()
    }

    /// Joins the blocks into the final text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for block in self.blocks().map(|b| b.trim()).filter(|b| !b.is_empty()) {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(block);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ProxyType, RealityOpts, WsOpts};
    use crate::group::GroupType;
    use crate::provider::FetchMode;
    use crate::rules::RuleEntry;

    fn vless() -> ProxyDescriptor {
        let mut p = ProxyDescriptor::new(
            ProxyType::Vless,
            "My \"node\"".to_string(),
            "1.2.3.4".to_string(),
            443,
        );
        p.uuid = Some("uuid-1".to_string());
        p.network = Some("ws".to_string());
        p.tls = Some(true);
        p.alpn = Some(vec!["h2".to_string(), "http/1.1".to_string()]);
        p.ws_opts = Some(WsOpts {
            path: "/ws".to_string(),
            host: Some("cdn.example.com".to_string()),
        });
        p.reality_opts = Some(RealityOpts {
            public_key: "PBK".to_string(),
            short_id: String::new(),
            spiderx: String::new(),
        });
        p
    }

    #[test]
    fn proxy_layout() {
        let yaml = emit_proxies(&[vless()]);
        let expected = "proxies:
  - name: \"My \\\"node\\\"\"
    type: \"vless\"
    server: 1.2.3.4
    port: 443
    uuid: \"uuid-1\"
    network: \"ws\"
    tls: true
    udp: true
    alpn:
      - \"h2\"
      - \"http/1.1\"
    ws-opts:
      path: \"/ws\"
      headers:
        Host: \"cdn.example.com\"
    reality-opts:
      public-key: \"PBK\"
";
        assert_eq!(yaml, expected);
    }

    #[test]
    fn password_emitted_even_when_empty() {
        let mut p = ProxyDescriptor::new(ProxyType::Tuic, "t".into(), "h".into(), 1);
        p.password = Some(String::new());
        p.uuid = Some(String::new());
        p.up_mbps = Some("100".to_string());
        p.down_mbps = Some("1 Gbps".to_string());
        let yaml = emit_proxies(&[p]);
        assert!(yaml.contains("    password: \"\"\n"));
        assert!(!yaml.contains("uuid"));
        assert!(yaml.contains("    up-mbps: 100\n"));
        assert!(yaml.contains("    down-mbps: \"1 Gbps\"\n"));
    }

    #[test]
    fn proxies_separated_by_blank_line() {
        let a = ProxyDescriptor::new(ProxyType::Trojan, "a".into(), "h".into(), 1);
        let b = ProxyDescriptor::new(ProxyType::Trojan, "b".into(), "h".into(), 2);
        let yaml = emit_proxies(&[a, b]);
        assert!(yaml.contains("    udp: true\n\n  - name: \"b\"\n"));
        assert_eq!(emit_proxies(&[]), "proxies:\n");
    }

    #[test]
    fn groups_layout() {
        let mut g = ProxyGroup::new("auto", GroupType::UrlTest);
        g.icon = Some("https://icons/x.png".to_string());
        g.proxies = vec!["a".into(), "b".into()];
        g.manual = vec!["a".into(), "DIRECT".into()];
        g.use_subs = vec!["sub-1".into()];
        let other = ProxyGroup::new("empty", GroupType::Select);
        let yaml = emit_groups(&[g, other]);
        let expected = "proxy-groups:
  - name: \"auto\"
    type: url-test
    icon: https://icons/x.png
    proxies:
    - \"a\"
    - \"b\"
    - \"DIRECT\"
    use:
    - \"sub-1\"

  - name: \"empty\"
    type: select
";
        assert_eq!(yaml, expected);
        assert_eq!(emit_groups(&[]), "");
    }

    #[test]
    fn providers_layout() {
        let settings = Settings::default();
        let mut sub = Subscription::new(1, "https://sub/x?a=\"b\"", FetchMode::Proxy, &settings);
        sub.fetch_proxy = "auto".to_string();
        let yaml = emit_subscription_providers(&[sub], &settings);
        let expected = "proxy-providers:
  sub-1:
    type: http
    url: \"https://sub/x?a=\\\"b\\\"\"
    interval: 3600
    path: ./providers/sub-1.yaml
    proxy: auto
    health-check:
      enable: true
      url: http://www.gstatic.com/generate_204
      interval: 600
";
        assert_eq!(yaml, expected);

        let rp = RuleProvider {
            name: "ads".to_string(),
            url: "https://r/ads.yaml".to_string(),
            behavior: "domain".to_string(),
            policy: "REJECT".to_string(),
            provider_type: "http".to_string(),
            format: "yaml".to_string(),
            path: "./rules/ads.yaml".to_string(),
            interval: Some(600),
            proxy: None,
        };
        let yaml = emit_rule_providers(&[rp]);
        let expected = "rule-providers:
  ads:
    type: http
    path: \"./rules/ads.yaml\"
    url: \"https://r/ads.yaml\"
    interval: 600
    behavior: domain
    format: yaml
";
        assert_eq!(yaml, expected);
    }

    #[test]
    fn document_order_and_overrides() {
        let doc = Document {
            proxies: emit_proxies(&[]),
            rules: emit_rules(&[RuleEntry::match_entry("DIRECT")]),
            ..Default::default()
        };
        assert_eq!(doc.render(), "proxies:\n\nrules:\n  - MATCH,DIRECT\n");

        let overrides = Overrides {
            groups: Some("  proxy-groups: []  \n".to_string()),
            ..Default::default()
        };
        let doc = doc.with_overrides(&overrides);
        assert_eq!(
            doc.render(),
            "proxies:\n\nproxy-groups: []\n\nrules:\n  - MATCH,DIRECT\n"
        );
        assert!(Document::default().is_empty());
        assert_eq!(Document::default().render(), "");
    }
}
