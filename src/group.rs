//! Proxy groups (`proxy-groups` entries)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Clash proxy group strategy
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum GroupType {
    /// Manual selection
    #[default]
    Select,
    /// Lowest latency
    UrlTest,
    /// First healthy member
    Fallback,
    /// Spread connections
    LoadBalance,
}

impl GroupType {
    /// Clash `type` value
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupType::Select => "select",
            GroupType::UrlTest => "url-test",
            GroupType::Fallback => "fallback",
            GroupType::LoadBalance => "load-balance",
        }
    }
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A proxy group
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProxyGroup {
    /// Group name, referenced by rules and other groups
    pub name: String,
    /// Strategy
    #[serde(rename = "type")]
    pub group_type: GroupType,
    /// Icon URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Member proxies picked from the parsed list
    #[serde(default)]
    pub proxies: Vec<String>,
    /// Member names typed by hand (other groups, `DIRECT`, ...)
    #[serde(default)]
    pub manual: Vec<String>,
    /// Subscription providers used by the group (`use`)
    #[serde(default, rename = "use")]
    pub use_subs: Vec<String>,
}

impl ProxyGroup {
    /// Creates an empty group.
    pub fn new(name: impl Into<String>, group_type: GroupType) -> Self {
        ProxyGroup {
            name: name.into(),
            group_type,
            ..Default::default()
        }
    }

    /// Emitted members: `proxies` followed by `manual`, first occurrence kept.
    pub fn members(&self) -> Vec<String> {
        uniq(self.proxies.iter().chain(self.manual.iter()).cloned())
    }

    /// Replaces the manual members from a comma separated list.
    pub fn set_manual_csv(&mut self, raw: &str) {
        self.manual = crate::descriptor::split_list(raw);
    }
}

/// Removes later duplicates, keeping the first occurrence order.
pub(crate) fn uniq<I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_test::{Token, assert_tokens};

    #[test]
    fn members_are_deduplicated_in_order() {
        let mut g = ProxyGroup::new("G", GroupType::UrlTest);
        g.proxies = vec!["a".into(), "b".into(), "a".into()];
        g.set_manual_csv(" DIRECT, b ,, c");
        assert_eq!(g.manual, vec!["DIRECT", "b", "c"]);
        assert_eq!(g.members(), vec!["a", "b", "DIRECT", "c"]);
    }

    #[test]
    fn group_type_tokens() {
        assert_tokens(
            &GroupType::LoadBalance,
            &[Token::UnitVariant {
                name: "GroupType",
                variant: "load-balance",
            }],
        );
        assert_eq!(GroupType::UrlTest.to_string(), "url-test");
    }
}
