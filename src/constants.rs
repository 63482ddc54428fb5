//! Shared constants for link schemes, defaults and error messages.

/// Link prefixes recognized by the extractor (lowercase, with `://`).
///
/// Order matters only for readability; the extractor always picks the
/// earliest match in the text.
pub mod scheme {
    /// VLESS: `vless://`
    pub const VLESS: &str = "vless://";
    /// VMess: `vmess://`
    pub const VMESS: &str = "vmess://";
    /// Shadowsocks: `ss://`
    pub const SHADOWSOCKS: &str = "ss://";
    /// Trojan: `trojan://`
    pub const TROJAN: &str = "trojan://";
    /// ShadowsocksR: `ssr://`
    pub const SHADOWSOCKSR: &str = "ssr://";
    /// Hysteria v1: `hysteria://`
    pub const HYSTERIA: &str = "hysteria://";
    /// Hysteria v1 short form: `hy://`
    pub const HY: &str = "hy://";
    /// Hysteria v2 short form: `hy2://`
    pub const HY2: &str = "hy2://";
    /// Hysteria v2: `hysteria2://`
    pub const HYSTERIA2: &str = "hysteria2://";
    /// TUIC: `tuic://`
    pub const TUIC: &str = "tuic://";

    /// Every prefix the link extractor splits on.
    pub const ALL: [&str; 10] = [
        VLESS,
        VMESS,
        SHADOWSOCKS,
        TROJAN,
        SHADOWSOCKSR,
        HYSTERIA,
        HY,
        HY2,
        HYSTERIA2,
        TUIC,
    ];
}

/// Shadowsocks ciphers accepted by the strict `ss://` parser.
pub const SS_ALLOWED_CIPHERS: [&str; 13] = [
    "aes-128-gcm",
    "aes-192-gcm",
    "aes-256-gcm",
    "aes-128-cfb",
    "aes-192-cfb",
    "aes-256-cfb",
    "chacha20-ietf-poly1305",
    "chacha20-poly1305",
    "xchacha20-ietf-poly1305",
    "2022-blake3-aes-128-gcm",
    "2022-blake3-aes-256-gcm",
    "2022-blake3-chacha20-poly1305",
    "none",
];

/// Maximum length of a sanitized display string, in chars.
pub const MAX_NAME_CHARS: usize = 120;

/// Maximum accepted Shadowsocks host length.
pub const MAX_HOST_LEN: usize = 255;

/// Obfuscation type emitted for Hysteria2 links.
pub const HY2_OBFS_TYPE: &str = "salamander";

/// Rule entry id of the terminal MATCH rule.
pub const MATCH_ENTRY_ID: &str = "MATCH:__default__";

/// Ready-made rule list installed by
/// [`Workspace::apply_preset_rules`](crate::Workspace::apply_preset_rules),
/// followed by a `MATCH` line. Keeps local, Steam and Russian traffic direct
/// and sends messengers and video through `PROXY`.
pub const PRESET_RULES: [&str; 26] = [
    "GEOIP,private,DIRECT",
    "IP-CIDR,45.121.184.0/22,DIRECT",
    "IP-CIDR,103.10.124.0/23,DIRECT",
    "IP-CIDR,103.28.54.0/23,DIRECT",
    "IP-CIDR,146.66.152.0/21,DIRECT",
    "IP-CIDR,155.133.224.0/19,DIRECT",
    "IP-CIDR,162.254.192.0/21,DIRECT",
    "IP-CIDR,185.25.180.0/22,DIRECT",
    "IP-CIDR,192.69.96.0/22,DIRECT",
    "IP-CIDR,205.196.6.0/24,DIRECT",
    "IP-CIDR,208.64.200.0/22,DIRECT",
    "IP-CIDR,208.78.164.0/22,DIRECT",
    "GEOSITE,reddit,DIRECT",
    "GEOSITE,steam,DIRECT",
    "GEOSITE,whatsapp,PROXY",
    "GEOSITE,telegram,PROXY",
    "GEOSITE,discord,PROXY",
    "GEOSITE,youtube,PROXY",
    "DOMAIN-KEYWORD,habr,PROXY",
    "GEOSITE,category-media-ru,PROXY",
    "GEOSITE,category-ru,DIRECT",
    "DOMAIN-SUFFIX,ru,DIRECT",
    "DOMAIN-SUFFIX,by,DIRECT",
    "DOMAIN-SUFFIX,xn--p1ai,DIRECT",
    "GEOSITE,category-gov-ru,DIRECT",
    "GEOIP,RU,DIRECT",
];

/// Group name pattern for groups added without a name (`NAME_<n>`).
pub const NEW_GROUP_PREFIX: &str = "NAME_";

/// Built-in policy targets.
pub mod policy {
    /// Connect without a proxy.
    pub const DIRECT: &str = "DIRECT";
    /// Drop the connection.
    pub const REJECT: &str = "REJECT";
    /// Placeholder for a proxy rule with no target group.
    pub const PROXY: &str = "PROXY";
}

/// Common error message fragments for link parsing.
pub mod error_msg {
    /// Link has no host.
    pub const MISSING_HOST: &str = "host";
    /// Link has no port.
    pub const MISSING_PORT: &str = "port";
    /// Invalid port value.
    pub const INVALID_PORT: &str = "Invalid port";
    /// Host that cannot be emitted as a server address.
    pub const INVALID_HOST: &str = "Invalid host";
    /// Link is not `scheme://...`.
    pub const INVALID_URL: &str = "Invalid URL";
}
