//! End-to-end conversion tests: pasted text → descriptors → Clash text
//!
//! Covers:
//! - sanitizer and Base64 decoder guarantees
//! - scheme dispatch (case-insensitive prefixes, unsupported schemes)
//! - SS strictness, VLESS REALITY mapping, link extraction from run-together text
//! - duplicate name resolution with group references
//! - rule order stability and the pinned MATCH rule
//! - batch partial failure and a full workspace build

#![cfg(test)]

use crate::{
    BuildStatus, FetchMode, GroupType, ManualRuleType, ParseError, ParseOptions, ProxyGroup,
    ProxyType, RuleEntry, RuleKind, RuleMove, RuleOrder, RuleProviderInput, Settings, Workspace,
    decode_auto, emit_proxies, extract_links, parse_link, parse_many, rebuild_order,
    resolve_name_conflicts, sanitize,
};
use base64::Engine;

// =============================================================================
// Sanitizer and decoder
// =============================================================================

#[test]
fn sanitize_is_idempotent() {
    let long = "x".repeat(300);
    let wrapped = format!("{} tail", "ab ".repeat(60));
    let samples: [&str; 12] = [
        "",
        "   ",
        "plain",
        "  many   inner \t\n spaces  ",
        "ﬁ ligature and ＦＵＬＬＷＩＤＴＨ",
        "bidi \u{202E}override\u{202C} and \u{200F}marks",
        "emoji 🇷🇺 with selector \u{FE0F}",
        "controls\u{0}\u{7}\u{85}\u{9F}end",
        "e\u{7}\u{301}x",
        "a\u{200F}\u{308}\u{FE0F}\u{301}",
        &long,
        &wrapped,
    ];
    for s in samples {
        let once = sanitize(s, "");
        assert_eq!(sanitize(&once, ""), once, "not a fixed point for {:?}", s);
        assert!(once.chars().count() <= 120);
    }
    assert_eq!(sanitize(" \u{202E} ", "fallback"), "fallback");
}

#[test]
fn base64_decoding_never_fails_loudly() {
    // 0xFF 0xFE 0xFD is not UTF-8
    let lossy = decode_auto("//79");
    assert_eq!(lossy.chars().count(), 3);
    assert!(lossy.chars().all(|c| c == '\u{FFFD}'));

    assert_eq!(decode_auto("aGk"), "hi");
    assert_eq!(decode_auto("a-_b"), decode_auto("a+/b"));
    assert_eq!(decode_auto("!!!"), "");
    assert_eq!(decode_auto(""), "");
}

// =============================================================================
// Dispatch
// =============================================================================

#[test]
fn scheme_prefix_is_case_insensitive() {
    let vmess_body = base64::engine::general_purpose::STANDARD
        .encode(r#"{"add":"127.0.0.1","port":443,"id":"uuid-123"}"#);
    let cases = [
        (format!("VMESS://{}", vmess_body), ProxyType::Vmess),
        ("VLeSs://id@host:443".to_string(), ProxyType::Vless),
        ("TROJAN://pw@host:443".to_string(), ProxyType::Trojan),
        ("Hysteria2://pw@host:443".to_string(), ProxyType::Hysteria2),
        ("HY://host:443?auth=a".to_string(), ProxyType::Hysteria),
        ("Tuic://id:pw@host:443".to_string(), ProxyType::Tuic),
    ];
    for (link, expected) in cases {
        let p = parse_link(&link).unwrap_or_else(|e| panic!("{} failed: {}", link, e));
        assert_eq!(p.proxy_type, expected, "{}", link);
        assert!(p.udp);
    }
}

#[test]
fn unsupported_scheme_is_reported() {
    let err = parse_link("socks5://user@host:1080").unwrap_err();
    assert_eq!(
        err,
        ParseError::UnsupportedProtocol("Unsupported scheme: socks5".to_string())
    );
    assert!(matches!(parse_link("   "), Err(ParseError::InvalidFormat(_))));
}

// =============================================================================
// Protocol properties
// =============================================================================

#[test]
fn ss_rejects_brace_in_password() {
    assert!(parse_link("ss://bWV0aG9kOnth{}@host:1234").is_err());

    let user = base64::engine::general_purpose::STANDARD.encode("aes-256-gcm:p{w}");
    assert!(parse_link(&format!("ss://{}@host:8388", user)).is_err());

    let user = base64::engine::general_purpose::STANDARD.encode("aes-256-gcm:secret");
    let p = parse_link(&format!("ss://{}@host:8388#Home", user)).unwrap();
    assert_eq!(p.cipher.as_deref(), Some("aes-256-gcm"));
    assert_eq!(p.password.as_deref(), Some("secret"));
    assert_eq!(p.name, "Home");
}

#[test]
fn vless_reality_mapping() {
    let p = parse_link("vless://uuid@host:443?security=reality&pbk=PBK&sid=SID#name").unwrap();
    assert_eq!(p.proxy_type, ProxyType::Vless);
    assert_eq!(p.tls, Some(true));
    let reality = p.reality_opts.expect("reality-opts");
    assert_eq!(reality.public_key, "PBK");
    assert_eq!(reality.short_id, "SID");
}

#[test]
fn extraction_splits_run_together_links() {
    assert_eq!(
        extract_links("vless://a@h:1#Xtrojan://b@h2:2#Y"),
        vec!["vless://a@h:1#X", "trojan://b@h2:2#Y"]
    );

    let body = base64::engine::general_purpose::STANDARD
        .encode("trojan://a@h:1#A\nhy2://b@h:2#B\n");
    assert_eq!(extract_links(&body), vec!["trojan://a@h:1#A", "hy2://b@h:2#B"]);
}

#[test]
fn server_fields_cannot_break_out_of_the_proxy_item() {
    let vmess = base64::engine::general_purpose::STANDARD
        .encode(r#"{"add":"h.example\n  - name: injected","port":443,"id":"u"}"#);
    let ssr_body = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .encode("h.example x:443:origin:aes-256-cfb:plain:cHc/");
    let outcome = parse_many(
        &format!("vmess://{}\nssr://{}\ntrojan://pw@ok.example:443#ok", vmess, ssr_body),
        ParseOptions {
            collect_errors: true,
        },
    );
    assert_eq!(outcome.proxies.len(), 1);
    assert_eq!(outcome.errors.len(), 2);
    assert!(
        outcome
            .errors
            .iter()
            .all(|e| matches!(e.error, ParseError::InvalidField(_)))
    );

    let yaml = emit_proxies(&outcome.proxies);
    assert!(!yaml.contains("injected"));
    assert_eq!(yaml.matches("  - name:").count(), 1);
}

// =============================================================================
// Names and rules
// =============================================================================

#[test]
fn duplicate_names_and_group_references() {
    let mut proxies = vec![
        parse_link("trojan://a@h1:443#srv").unwrap(),
        parse_link("trojan://b@h2:443#srv").unwrap(),
    ];
    let mut group = ProxyGroup::new("G", GroupType::Select);
    group.proxies = vec!["srv".to_string(), "srv".to_string()];
    let mut groups = vec![group];

    resolve_name_conflicts(&mut proxies, &mut groups);

    assert_eq!(proxies[0].name, "srv");
    assert_eq!(proxies[1].name, "srv_1");
    assert_eq!(groups[0].proxies, vec!["srv", "srv_1"]);
}

fn geosite(key: &str) -> RuleEntry {
    RuleEntry {
        id: format!("GEOSITE:{}", key),
        kind: RuleKind::Geosite,
        key: key.to_string(),
        policy: "DIRECT".to_string(),
    }
}

fn keys(entries: &[RuleEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.key.as_str()).collect()
}

#[test]
fn rule_order_is_stable_across_edits() {
    let previous = vec![
        geosite("A"),
        geosite("B"),
        geosite("C"),
        RuleEntry::match_entry("DIRECT"),
    ];
    let current = vec![
        geosite("D"),
        geosite("A"),
        geosite("C"),
        RuleEntry::match_entry("DIRECT"),
    ];
    let next = rebuild_order(&previous, current);
    assert_eq!(keys(&next), vec!["A", "C", "D", "MATCH"]);

    let mut order = RuleOrder::new(next);
    assert!(!order.move_up(3));
    assert!(!order.move_to_top(3));
    assert!(!order.move_down(2));
    assert!(order.move_to_top(2));
    assert_eq!(keys(order.entries()), vec!["D", "A", "C", "MATCH"]);
    assert!(order.entries().last().is_some_and(RuleEntry::is_match));
}

// =============================================================================
// Batch and serialization
// =============================================================================

#[test]
fn batch_partial_failure() {
    let outcome = parse_many(
        "trojan://pw@t.example:443#ok\nss://bWV0aG9kOnth{}@host:1234",
        ParseOptions {
            collect_errors: true,
        },
    );
    assert_eq!(outcome.urls.len(), 2);
    assert_eq!(outcome.proxies.len(), 1);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].url, "ss://bWV0aG9kOnth{}@host:1234");
    assert!(outcome.first_error().is_some());

    let silent = parse_many("ss://bWV0aG9kOnth{}@host:1234", ParseOptions::default());
    assert!(silent.errors.is_empty());
    assert!(silent.proxies.is_empty());
}

#[test]
fn serializer_is_deterministic() {
    let outcome = parse_many(
        "vless://id@v.example:443?type=ws&path=%2Fws&host=cdn.example&security=tls#V \
         trojan://pw@t.example:443?type=grpc&serviceName=svc#T \
         hy2://pw@h.example:8443?obfs=salamander&obfs-password=x&alpn=h3#H",
        ParseOptions::default(),
    );
    assert_eq!(outcome.proxies.len(), 3);
    let first = emit_proxies(&outcome.proxies);
    let second = emit_proxies(&outcome.proxies);
    assert_eq!(first, second);
    assert!(first.contains("    ws-opts:\n      path: \"/ws\"\n      headers:\n        Host: \"cdn.example\"\n"));
    assert!(first.contains("    grpc-opts:\n      grpc-service-name: \"svc\"\n"));
    assert!(first.contains("    obfs: \"salamander\"\n"));
}

// =============================================================================
// Workspace
// =============================================================================

#[test]
fn full_workspace_build() {
    let mut ws = Workspace::new(Settings::default());
    ws.add_subscription("https://sub.example/list", FetchMode::Proxy, false);
    ws.add_rule_provider(RuleProviderInput {
        name: "ads".to_string(),
        url: "https://rules.example/ads.yaml".to_string(),
        behavior: Some("domain".to_string()),
        policy: "REJECT".to_string(),
    })
    .unwrap();
    ws.add_manual_rule(ManualRuleType::DomainSuffix, "*.Example.org", "auto")
        .unwrap();
    ws.select_geoip("RU", "DIRECT");

    let report = ws.build("trojan://pw@a.example:443#A\nss://bWV0aG9kOnth{}@host:1234");
    assert_eq!(report.errors.len(), 1);
    match &report.status {
        BuildStatus::Partial {
            proxies, errors, ..
        } => assert_eq!((*proxies, *errors), (1, 1)),
        other => panic!("unexpected status {:?}", other),
    }

    let yaml = &report.yaml;
    let order = [
        "proxies:\n",
        "\nproxy-providers:\n  sub-1:\n",
        "\nproxy-groups:\n  - name: \"auto\"\n    type: select\n    proxies:\n    - \"A\"\n    use:\n    - \"sub-1\"\n",
        "\nrule-providers:\n  ads:\n",
        "\nrules:\n  - RULE-SET,ads,REJECT\n  - DOMAIN-SUFFIX,example.org,auto\n  - GEOIP,RU,DIRECT\n  - MATCH,auto\n",
    ];
    let mut from = 0;
    for block in order {
        let at = yaml[from..]
            .find(block)
            .unwrap_or_else(|| panic!("missing {:?} in\n{}", block, yaml));
        from += at + block.len();
    }
    assert!(yaml.contains("    proxy: GLOBAL\n"));
    assert!(yaml.ends_with("MATCH,auto\n"));

    // New selections land after existing rules; a manual move survives rebuilds.
    assert!(ws.move_rule(2, RuleMove::Top));
    let report = ws.build("trojan://pw@a.example:443#A");
    assert!(matches!(report.status, BuildStatus::Complete { rules: 3, .. }));
    assert!(report.yaml.contains(
        "rules:\n  - GEOIP,RU,DIRECT\n  - RULE-SET,ads,REJECT\n  - DOMAIN-SUFFIX,example.org,auto\n  - MATCH,auto\n"
    ));
}
