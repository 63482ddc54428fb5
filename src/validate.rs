//! Manual rule validation and normalization
//!
//! Values are accepted the way people paste them (full URLs, `*.` wildcards,
//! `AS` prefixes, quoted paths) and reduced to the form Clash expects.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Kinds of hand-written rules
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum ManualRuleType {
    /// `DOMAIN-SUFFIX`
    DomainSuffix,
    /// `DOMAIN-KEYWORD`
    DomainKeyword,
    /// `IP-CIDR`
    IpCidr,
    /// `IP-ASN`
    IpAsn,
    /// `PROCESS-NAME`
    ProcessName,
    /// `PROCESS-PATH`
    ProcessPath,
}

impl ManualRuleType {
    /// Clash rule keyword
    pub fn as_str(&self) -> &'static str {
        match self {
            ManualRuleType::DomainSuffix => "DOMAIN-SUFFIX",
            ManualRuleType::DomainKeyword => "DOMAIN-KEYWORD",
            ManualRuleType::IpCidr => "IP-CIDR",
            ManualRuleType::IpAsn => "IP-ASN",
            ManualRuleType::ProcessName => "PROCESS-NAME",
            ManualRuleType::ProcessPath => "PROCESS-PATH",
        }
    }
}

impl fmt::Display for ManualRuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ManualRuleType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DOMAIN-SUFFIX" => Ok(ManualRuleType::DomainSuffix),
            "DOMAIN-KEYWORD" => Ok(ManualRuleType::DomainKeyword),
            "IP-CIDR" => Ok(ManualRuleType::IpCidr),
            "IP-ASN" => Ok(ManualRuleType::IpAsn),
            "PROCESS-NAME" => Ok(ManualRuleType::ProcessName),
            "PROCESS-PATH" => Ok(ManualRuleType::ProcessPath),
            _ => Err(ValidationError::UnknownRuleType(s.to_string())),
        }
    }
}

/// Validates `raw` for the given rule type and returns the normalized value.
///
/// # Errors
///
/// Returns a [`ValidationError`] describing why the value was rejected.
///
/// # Example
///
/// ```rust
/// use clash_link_serde::{ManualRuleType, normalize_manual_rule};
///
/// let v = normalize_manual_rule(ManualRuleType::DomainSuffix, "https://*.Example.COM/path");
/// assert_eq!(v.unwrap(), "example.com");
/// assert_eq!(normalize_manual_rule(ManualRuleType::IpCidr, "10.0.0.1").unwrap(), "10.0.0.1/32");
/// ```
pub fn normalize_manual_rule(
    rule_type: ManualRuleType,
    raw: &str,
) -> Result<String, ValidationError> {
    match rule_type {
        ManualRuleType::DomainSuffix => normalize_domain(raw),
        ManualRuleType::DomainKeyword => normalize_keyword(raw),
        ManualRuleType::IpCidr => normalize_cidr(raw),
        ManualRuleType::IpAsn => normalize_asn(raw),
        ManualRuleType::ProcessName => normalize_process_name(raw),
        ManualRuleType::ProcessPath => normalize_process_path(raw),
    }
}

/// Drops an `http(s)://` or `ws(s)://` prefix and anything after the host.
fn strip_scheme_and_path(raw: &str) -> &str {
    let mut s = raw.trim_start();
    for prefix in ["https://", "http://", "wss://", "ws://"] {
        if s.get(..prefix.len()).is_some_and(|head| head.eq_ignore_ascii_case(prefix)) {
            s = &s[prefix.len()..];
            break;
        }
    }
    s.split(['/', '?', '#']).next().unwrap_or_default().trim()
}

fn without_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn is_valid_domain(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > 253 {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && label
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-')
                && !label.starts_with('-')
                && !label.ends_with('-')
        })
}

fn normalize_domain(raw: &str) -> Result<String, ValidationError> {
    let lowered = without_whitespace(&strip_scheme_and_path(raw).to_lowercase());
    let domain = lowered.strip_prefix("*.").unwrap_or(&lowered);
    let domain = domain.strip_suffix('.').unwrap_or(domain);
    if !is_valid_domain(domain) {
        return Err(ValidationError::InvalidDomain(raw.to_string()));
    }
    Ok(domain.to_string())
}

fn normalize_keyword(raw: &str) -> Result<String, ValidationError> {
    let keyword = without_whitespace(&strip_scheme_and_path(raw).to_lowercase());
    if keyword.is_empty() {
        return Err(ValidationError::EmptyKeyword);
    }
    if keyword.contains(['/', '\\']) {
        return Err(ValidationError::KeywordSlash);
    }
    Ok(keyword)
}

/// Dotted quad with 1-3 digits per octet; leading zeros are accepted and
/// dropped from the canonical form.
fn parse_ipv4(ip: &str) -> Option<Ipv4Addr> {
    let mut octets = [0u8; 4];
    let mut parts = ip.split('.');
    for octet in &mut octets {
        let part = parts.next()?;
        if !(1..=3).contains(&part.len()) || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *octet = part.parse().ok()?;
    }
    match parts.next() {
        Some(_) => None,
        None => Some(Ipv4Addr::from(octets)),
    }
}

fn normalize_cidr(raw: &str) -> Result<String, ValidationError> {
    let value = raw.trim();
    if let Some(addr) = parse_ipv4(value) {
        return Ok(format!("{}/32", addr));
    }

    let Some((ip, mask)) = value.rsplit_once('/') else {
        return Err(ValidationError::InvalidCidr(raw.to_string()));
    };
    if ip.is_empty()
        || !(1..=2).contains(&mask.len())
        || !mask.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(ValidationError::InvalidCidr(raw.to_string()));
    }
    let ip = ip.trim();
    let Some(addr) = parse_ipv4(ip) else {
        return Err(ValidationError::InvalidIpv4(ip.to_string()));
    };
    match mask.parse::<u8>() {
        Ok(mask) if mask <= 32 => Ok(format!("{}/{}", addr, mask)),
        _ => Err(ValidationError::MaskRange(raw.to_string())),
    }
}

fn normalize_asn(raw: &str) -> Result<String, ValidationError> {
    let upper = raw.trim().to_ascii_uppercase();
    let digits = upper.strip_prefix("AS").unwrap_or(&upper);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::AsnNotNumber(raw.to_string()));
    }
    Ok(digits.to_string())
}

fn unquote(raw: &str) -> &str {
    raw.trim().trim_matches('"')
}

fn normalize_process_name(raw: &str) -> Result<String, ValidationError> {
    let name = unquote(raw);
    if name.is_empty() {
        return Err(ValidationError::ProcessNameEmpty);
    }
    if name.contains(['/', '\\', ':']) {
        return Err(ValidationError::ProcessNamePath);
    }
    Ok(name.to_string())
}

fn normalize_process_path(raw: &str) -> Result<String, ValidationError> {
    let path = unquote(raw);
    if path.is_empty() {
        return Err(ValidationError::ProcessPathEmpty);
    }
    let bytes = path.as_bytes();
    let windows_drive =
        bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'\\';
    let absolute = windows_drive || path.starts_with("\\\\") || path.starts_with('/');
    if !absolute {
        return Err(ValidationError::ProcessPathNotAbsolute(path.to_string()));
    }
    Ok(path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_test::{Token, assert_tokens};

    #[test]
    fn domains() {
        let ok = |raw| normalize_manual_rule(ManualRuleType::DomainSuffix, raw).unwrap();
        assert_eq!(ok("Example.com"), "example.com");
        assert_eq!(ok(" wss://*.cdn.example.com/x?y"), "cdn.example.com");
        assert_eq!(ok("xn--p1ai.ru."), "xn--p1ai.ru");
        for bad in ["localhost", "-a.com", "a..com", "a_b.com", ""] {
            assert!(matches!(
                normalize_manual_rule(ManualRuleType::DomainSuffix, bad),
                Err(ValidationError::InvalidDomain(_))
            ));
        }
    }

    #[test]
    fn keywords() {
        assert_eq!(
            normalize_manual_rule(ManualRuleType::DomainKeyword, " Goo gle ").unwrap(),
            "google"
        );
        assert_eq!(
            normalize_manual_rule(ManualRuleType::DomainKeyword, "  "),
            Err(ValidationError::EmptyKeyword)
        );
        assert_eq!(
            normalize_manual_rule(ManualRuleType::DomainKeyword, "a\\b"),
            Err(ValidationError::KeywordSlash)
        );
    }

    #[test]
    fn cidrs() {
        let cidr = |raw| normalize_manual_rule(ManualRuleType::IpCidr, raw);
        assert_eq!(cidr("192.168.1.1").unwrap(), "192.168.1.1/32");
        assert_eq!(cidr("10.0.0.0/8").unwrap(), "10.0.0.0/8");
        assert!(matches!(cidr("10.0.0.0/33"), Err(ValidationError::MaskRange(_))));
        assert!(matches!(cidr("300.0.0.0/8"), Err(ValidationError::InvalidIpv4(_))));
        assert!(matches!(cidr("fe80::/10"), Err(ValidationError::InvalidIpv4(_))));
        assert!(matches!(cidr("garbage"), Err(ValidationError::InvalidCidr(_))));
        assert!(matches!(cidr("10.0.0.0/123"), Err(ValidationError::InvalidCidr(_))));
        assert_eq!(cidr("010.001.0.7").unwrap(), "10.1.0.7/32");
        assert_eq!(cidr("192.168.001.0/24").unwrap(), "192.168.1.0/24");
        assert!(matches!(cidr("1.2.3"), Err(ValidationError::InvalidCidr(_))));
        assert!(matches!(cidr("1.2.3.4.5/8"), Err(ValidationError::InvalidIpv4(_))));
        assert!(matches!(cidr("1.2.3.0001/8"), Err(ValidationError::InvalidIpv4(_))));
        assert!(matches!(cidr("1.2.+3.4/8"), Err(ValidationError::InvalidIpv4(_))));
    }

    #[test]
    fn asn() {
        assert_eq!(
            normalize_manual_rule(ManualRuleType::IpAsn, "as13335").unwrap(),
            "13335"
        );
        assert!(normalize_manual_rule(ManualRuleType::IpAsn, "AS").is_err());
        assert!(normalize_manual_rule(ManualRuleType::IpAsn, "12a").is_err());
    }

    #[test]
    fn processes() {
        let name = |raw| normalize_manual_rule(ManualRuleType::ProcessName, raw);
        assert_eq!(name("\"Telegram.exe\"").unwrap(), "Telegram.exe");
        assert_eq!(name("C:\\x.exe"), Err(ValidationError::ProcessNamePath));
        assert_eq!(name("\"\""), Err(ValidationError::ProcessNameEmpty));

        let path = |raw| normalize_manual_rule(ManualRuleType::ProcessPath, raw);
        assert_eq!(path("/usr/bin/curl").unwrap(), "/usr/bin/curl");
        assert_eq!(path("c:\\Apps\\x.exe").unwrap(), "c:\\Apps\\x.exe");
        assert_eq!(path("\\\\server\\share\\x.exe").unwrap(), "\\\\server\\share\\x.exe");
        assert!(matches!(
            path("bin/curl"),
            Err(ValidationError::ProcessPathNotAbsolute(_))
        ));
    }

    #[test]
    fn rule_type_names() {
        assert_eq!(
            "ip-cidr".parse::<ManualRuleType>().unwrap(),
            ManualRuleType::IpCidr
        );
        assert!("GEOIP".parse::<ManualRuleType>().is_err());
        assert_tokens(
            &ManualRuleType::ProcessPath,
            &[Token::UnitVariant {
                name: "ManualRuleType",
                variant: "PROCESS-PATH",
            }],
        );
    }
}
