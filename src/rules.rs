//! Routing rules and their user-controlled order
//!
//! Rules come from five sources and are flattened into one list of
//! [`RuleEntry`] values:
//! 1. GEOSITE selections (domain list name → policy)
//! 2. GEOIP selections (country code → policy)
//! 3. RULE-SET references for every rule provider that has a policy
//! 4. Manual rules (`TYPE,VALUE`)
//! 5. The terminal MATCH rule
//!
//! The user may reorder everything except MATCH. When the sources change,
//! [`rebuild_order`] keeps the previous relative order of surviving entries,
//! appends new ones and pins MATCH last.

use crate::constants::{MATCH_ENTRY_ID, policy};
use crate::group::ProxyGroup;
use crate::provider::RuleProvider;
use crate::validate::ManualRuleType;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

/// Source of a rule entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum RuleKind {
    /// Domain list
    Geosite,
    /// Country / IP list
    Geoip,
    /// Rule provider reference
    RuleSet,
    /// Hand-written rule
    Manual,
    /// Catch-all
    Match,
}

impl RuleKind {
    /// Clash rule keyword (`MANUAL` entries carry their own in the key)
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Geosite => "GEOSITE",
            RuleKind::Geoip => "GEOIP",
            RuleKind::RuleSet => "RULE-SET",
            RuleKind::Manual => "MANUAL",
            RuleKind::Match => "MATCH",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of routing policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleEntry {
    /// Stable identity across rebuilds (`KIND:key`, `MANUAL:<rule id>`)
    pub id: String,
    /// Source
    pub kind: RuleKind,
    /// List name, country code, provider name or `TYPE,VALUE`
    pub key: String,
    /// `DIRECT`, `REJECT` or a group name
    pub policy: String,
}

impl RuleEntry {
    fn new(kind: RuleKind, id: String, key: String, policy: String) -> Self {
        RuleEntry {
            id,
            kind,
            key,
            policy,
        }
    }

    /// The terminal MATCH entry.
    pub fn match_entry(policy: impl Into<String>) -> Self {
        RuleEntry::new(
            RuleKind::Match,
            MATCH_ENTRY_ID.to_string(),
            "MATCH".to_string(),
            policy.into(),
        )
    }

    /// True for the MATCH entry.
    pub fn is_match(&self) -> bool {
        self.kind == RuleKind::Match
    }

    /// Clash rule line, e.g. `GEOIP,RU,DIRECT` or `MATCH,auto`.
    pub fn to_rule_line(&self) -> String {
        match self.kind {
            RuleKind::Match => format!("MATCH,{}", self.policy),
            RuleKind::Manual => format!("{},{}", self.key, self.policy),
            kind => format!("{},{},{}", kind, self.key, self.policy),
        }
    }
}

/// What a manual rule does with matching traffic
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleAction {
    /// Bypass proxies
    Direct,
    /// Reject the connection
    Block,
    /// Send through a group
    Proxy,
}

impl RuleAction {
    /// Maps a policy choice (`DIRECT`, `REJECT` or a group name) to an action
    /// and its stored target.
    pub fn from_choice(choice: &str) -> (RuleAction, String) {
        match choice {
            policy::DIRECT => (RuleAction::Direct, String::new()),
            policy::REJECT => (RuleAction::Block, policy::REJECT.to_string()),
            group => (RuleAction::Proxy, group.to_string()),
        }
    }
}

/// A validated hand-written rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManualRule {
    /// Opaque unique id
    pub id: String,
    /// Rule type
    #[serde(rename = "type")]
    pub rule_type: ManualRuleType,
    /// Normalized value
    pub value: String,
    /// Action
    pub action: RuleAction,
    /// Group name, `REJECT`, or empty for DIRECT
    pub target: String,
}

impl ManualRule {
    /// Policy written into the rule line.
    pub fn policy(&self) -> String {
        match self.action {
            RuleAction::Direct => policy::DIRECT.to_string(),
            RuleAction::Block => policy::REJECT.to_string(),
            RuleAction::Proxy if self.target == policy::REJECT => policy::REJECT.to_string(),
            RuleAction::Proxy if self.target.is_empty() => policy::PROXY.to_string(),
            RuleAction::Proxy => self.target.clone(),
        }
    }
}

/// Source of the MATCH policy
pub trait MatchPolicy {
    /// Policy target of the terminal rule.
    fn match_policy_target(&self) -> String;
}

impl MatchPolicy for str {
    fn match_policy_target(&self) -> String {
        self.to_string()
    }
}

impl MatchPolicy for String {
    fn match_policy_target(&self) -> String {
        self.clone()
    }
}

/// User choice for the MATCH rule
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", content = "value", rename_all = "lowercase")]
pub enum MatchSelection {
    /// Auto group, else the first group, else DIRECT
    #[default]
    Auto,
    /// `DIRECT` or `REJECT`
    Builtin(String),
    /// A named group
    Group(String),
}

impl MatchSelection {
    /// Falls back to [`MatchSelection::Auto`] when the chosen builtin is not
    /// DIRECT/REJECT or the chosen group no longer exists.
    pub fn normalized(self, groups: &[ProxyGroup]) -> MatchSelection {
        let valid = match &self {
            MatchSelection::Auto => true,
            MatchSelection::Builtin(v) => v == policy::DIRECT || v == policy::REJECT,
            MatchSelection::Group(name) => groups.iter().any(|g| &g.name == name),
        };
        if valid { self } else { MatchSelection::Auto }
    }

    /// Resolves the selection against the current groups.
    pub fn resolve(&self, groups: &[ProxyGroup], auto_group_name: &str) -> String {
        match self.clone().normalized(groups) {
            MatchSelection::Builtin(v) | MatchSelection::Group(v) => v,
            MatchSelection::Auto => groups
                .iter()
                .find(|g| g.name == auto_group_name)
                .or_else(|| groups.first())
                .map(|g| g.name.clone())
                .unwrap_or_else(|| policy::DIRECT.to_string()),
        }
    }
}

/// GEOSITE and GEOIP selections, in the order they were first chosen
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleSelections {
    /// Domain list name → policy
    pub geosite: Vec<(String, String)>,
    /// Country code → policy
    pub geoip: Vec<(String, String)>,
}

impl RuleSelections {
    /// Sets or clears (empty `target`) a GEOSITE selection.
    pub fn select_geosite(&mut self, name: &str, target: &str) {
        select(&mut self.geosite, name, target);
    }

    /// Sets or clears (empty `target`) a GEOIP selection.
    pub fn select_geoip(&mut self, code: &str, target: &str) {
        select(&mut self.geoip, code, target);
    }
}

/// Updates keep the original position, like a map with insertion order.
fn select(list: &mut Vec<(String, String)>, key: &str, target: &str) {
    let target = target.trim();
    if target.is_empty() {
        list.retain(|(k, _)| k != key);
    } else if let Some(slot) = list.iter_mut().find(|(k, _)| k == key) {
        slot.1 = target.to_string();
    } else {
        list.push((key.to_string(), target.to_string()));
    }
}

/// Builds the entries in natural order, MATCH last.
///
/// Rule providers without a policy produce no entry.
pub fn build_rule_entries<P>(
    selections: &RuleSelections,
    providers: &[RuleProvider],
    manual: &[ManualRule],
    match_policy: &P,
) -> Vec<RuleEntry>
where
    P: MatchPolicy + ?Sized,
{
    let geosite = selections.geosite.iter().map(|(name, target)| {
        RuleEntry::new(
            RuleKind::Geosite,
            format!("GEOSITE:{}", name),
            name.clone(),
            target.clone(),
        )
    });
    let geoip = selections.geoip.iter().map(|(code, target)| {
        RuleEntry::new(
            RuleKind::Geoip,
            format!("GEOIP:{}", code),
            code.clone(),
            target.clone(),
        )
    });
    let rule_sets = providers
        .iter()
        .filter(|rp| !rp.policy.is_empty())
        .map(|rp| {
            RuleEntry::new(
                RuleKind::RuleSet,
                format!("RULE-SET:{}", rp.name),
                rp.name.clone(),
                rp.policy.clone(),
            )
        });
    let manual = manual.iter().map(|r| {
        RuleEntry::new(
            RuleKind::Manual,
            format!("MANUAL:{}", r.id),
            format!("{},{}", r.rule_type, r.value),
            r.policy(),
        )
    });

    let mut entries: Vec<RuleEntry> = geosite.chain(geoip).chain(rule_sets).chain(manual).collect();
    entries.push(RuleEntry::match_entry(match_policy.match_policy_target()));
    entries
}

/// Merges `current` into the order of `previous`.
///
/// Surviving entries keep their previous relative order (with fresh policy
/// values), new entries follow in natural order, and a MATCH entry always
/// comes last: the one from `current`, else the previous one, else
/// `MATCH,DIRECT`.
pub fn rebuild_order(previous: &[RuleEntry], current: Vec<RuleEntry>) -> Vec<RuleEntry> {
    let mut match_entry = None;
    let mut remaining: Vec<Option<RuleEntry>> = Vec::with_capacity(current.len());
    for entry in current {
        if entry.is_match() {
            match_entry = Some(entry);
        } else {
            remaining.push(Some(entry));
        }
    }

    let mut next = Vec::with_capacity(remaining.len() + 1);
    for old in previous.iter().filter(|e| !e.is_match()) {
        let fresh = remaining
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(|e| e.id == old.id))
            .and_then(Option::take);
        if let Some(fresh) = fresh {
            next.push(fresh);
        }
    }
    next.extend(remaining.into_iter().flatten());
    let match_entry = match_entry
        .or_else(|| previous.iter().find(|e| e.is_match()).cloned())
        .unwrap_or_else(|| RuleEntry::match_entry(policy::DIRECT));
    next.push(match_entry);
    trace!("Rebuilt rule order with {} entries", next.len());
    next
}

/// A user-reorderable rule list
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleOrder {
    entries: Vec<RuleEntry>,
}

impl RuleOrder {
    /// Wraps an already ordered list.
    pub fn new(entries: Vec<RuleEntry>) -> Self {
        RuleOrder { entries }
    }

    /// Entries in emission order.
    pub fn entries(&self) -> &[RuleEntry] {
        &self.entries
    }

    /// True when no entry exists.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replaces the entries with `current`, keeping the existing order.
    pub fn rebuild(&mut self, current: Vec<RuleEntry>) {
        self.entries = rebuild_order(&self.entries, current);
    }

    fn movable_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_match()).count()
    }

    fn movable(&self, index: usize) -> bool {
        self.entries.get(index).is_some_and(|e| !e.is_match())
    }

    fn relocate(&mut self, from: usize, to: usize) {
        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
    }

    /// Moves the entry at `index` by `delta` positions.
    ///
    /// Returns `false` (and changes nothing) for MATCH, an unknown index, or
    /// a destination outside the movable range.
    pub fn move_by(&mut self, index: usize, delta: isize) -> bool {
        if !self.movable(index) {
            return false;
        }
        let Some(to) = index.checked_add_signed(delta) else {
            return false;
        };
        if to >= self.movable_count() {
            return false;
        }
        self.relocate(index, to);
        true
    }

    /// Moves the entry one position up.
    pub fn move_up(&mut self, index: usize) -> bool {
        self.move_by(index, -1)
    }

    /// Moves the entry one position down.
    pub fn move_down(&mut self, index: usize) -> bool {
        self.move_by(index, 1)
    }

    /// Moves the entry to the first position.
    pub fn move_to_top(&mut self, index: usize) -> bool {
        if !self.movable(index) || index == 0 {
            return false;
        }
        self.relocate(index, 0);
        true
    }

    /// Moves the entry to the last position before MATCH.
    pub fn move_to_bottom(&mut self, index: usize) -> bool {
        if !self.movable(index) {
            return false;
        }
        let target = self.movable_count() - 1;
        if index == target {
            return false;
        }
        self.relocate(index, target);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::GroupType;

    fn entry(id: &str) -> RuleEntry {
        RuleEntry::new(RuleKind::Geosite, id.to_string(), id.to_string(), "DIRECT".to_string())
    }

    fn ids(entries: &[RuleEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.id.as_str()).collect()
    }

    fn order(names: &[&str]) -> RuleOrder {
        let mut entries: Vec<RuleEntry> = names.iter().map(|n| entry(n)).collect();
        entries.push(RuleEntry::match_entry("DIRECT"));
        RuleOrder::new(entries)
    }

    #[test]
    fn rebuild_keeps_previous_order() {
        let previous = order(&["C", "A", "B"]);
        let current = vec![entry("A"), entry("B"), entry("D"), RuleEntry::match_entry("auto"), entry("C")];
        let next = rebuild_order(previous.entries(), current);
        assert_eq!(ids(&next), vec!["C", "A", "B", "D", MATCH_ENTRY_ID]);
        assert_eq!(next[4].policy, "auto");
    }

    #[test]
    fn rebuild_always_ends_with_match() {
        let next = rebuild_order(&[], vec![entry("A")]);
        assert_eq!(ids(&next), vec!["A", MATCH_ENTRY_ID]);
        assert_eq!(next[1].to_rule_line(), "MATCH,DIRECT");

        let previous = vec![entry("A"), RuleEntry::match_entry("auto")];
        let next = rebuild_order(&previous, vec![entry("B"), entry("A")]);
        assert_eq!(ids(&next), vec!["A", "B", MATCH_ENTRY_ID]);
        assert_eq!(next[2].policy, "auto");

        assert_eq!(ids(&rebuild_order(&[], Vec::new())), vec![MATCH_ENTRY_ID]);
    }

    #[test]
    fn moves_are_bounded() {
        let mut o = order(&["A", "B", "C"]);
        assert!(!o.move_up(0));
        assert!(!o.move_down(2));
        assert!(!o.move_down(3));
        assert!(!o.move_up(3));
        assert!(!o.move_to_top(3));
        assert!(!o.move_to_bottom(9));
        assert!(o.move_down(0));
        assert_eq!(ids(o.entries()), vec!["B", "A", "C", MATCH_ENTRY_ID]);
        assert!(o.move_to_bottom(0));
        assert_eq!(ids(o.entries()), vec!["A", "C", "B", MATCH_ENTRY_ID]);
        assert!(!o.move_to_bottom(2));
        assert!(o.move_to_top(2));
        assert_eq!(ids(o.entries()), vec!["B", "A", "C", MATCH_ENTRY_ID]);
        assert!(!o.move_to_top(0));
    }

    #[test]
    fn natural_order_and_lines() {
        let mut selections = RuleSelections::default();
        selections.select_geoip("RU", "DIRECT");
        selections.select_geosite("youtube", "auto");
        selections.select_geosite("steam", "DIRECT");
        selections.select_geosite("youtube", "REJECT");
        selections.select_geosite("steam", "");

        let manual = vec![ManualRule {
            id: "1".to_string(),
            rule_type: ManualRuleType::DomainSuffix,
            value: "ru".to_string(),
            action: RuleAction::Direct,
            target: String::new(),
        }];
        let providers = vec![
            RuleProvider {
                name: "ads".to_string(),
                policy: "REJECT".to_string(),
                ..providers_template()
            },
            RuleProvider {
                name: "unused".to_string(),
                policy: String::new(),
                ..providers_template()
            },
        ];

        let entries = build_rule_entries(&selections, &providers, &manual, "auto");
        let lines: Vec<String> = entries.iter().map(RuleEntry::to_rule_line).collect();
        assert_eq!(
            lines,
            vec![
                "GEOSITE,youtube,REJECT",
                "GEOIP,RU,DIRECT",
                "RULE-SET,ads,REJECT",
                "DOMAIN-SUFFIX,ru,DIRECT",
                "MATCH,auto",
            ]
        );
        assert_eq!(entries[3].id, "MANUAL:1");
    }

    fn providers_template() -> RuleProvider {
        RuleProvider {
            name: String::new(),
            url: String::new(),
            behavior: String::new(),
            policy: String::new(),
            provider_type: String::new(),
            format: String::new(),
            path: String::new(),
            interval: None,
            proxy: None,
        }
    }

    #[test]
    fn manual_policies() {
        let (action, target) = RuleAction::from_choice("REJECT");
        assert_eq!((action, target.as_str()), (RuleAction::Block, "REJECT"));
        let (action, target) = RuleAction::from_choice("DIRECT");
        assert_eq!((action, target.as_str()), (RuleAction::Direct, ""));

        let mut rule = ManualRule {
            id: "x".to_string(),
            rule_type: ManualRuleType::IpAsn,
            value: "13335".to_string(),
            action: RuleAction::Proxy,
            target: String::new(),
        };
        assert_eq!(rule.policy(), "PROXY");
        rule.target = "REJECT".to_string();
        assert_eq!(rule.policy(), "REJECT");
        rule.target = "auto".to_string();
        assert_eq!(rule.policy(), "auto");
    }

    #[test]
    fn match_selection_resolution() {
        let groups = vec![
            ProxyGroup::new("first", GroupType::Select),
            ProxyGroup::new("auto", GroupType::Select),
        ];
        assert_eq!(MatchSelection::Auto.resolve(&groups, "auto"), "auto");
        assert_eq!(MatchSelection::Auto.resolve(&groups[..1], "auto"), "first");
        assert_eq!(MatchSelection::Auto.resolve(&[], "auto"), "DIRECT");
        assert_eq!(
            MatchSelection::Builtin("REJECT".to_string()).resolve(&groups, "auto"),
            "REJECT"
        );
        assert_eq!(
            MatchSelection::Builtin("PASS".to_string()).resolve(&groups, "auto"),
            "auto"
        );
        assert_eq!(
            MatchSelection::Group("first".to_string()).resolve(&groups, "auto"),
            "first"
        );
        assert_eq!(
            MatchSelection::Group("gone".to_string()).normalized(&groups),
            MatchSelection::Auto
        );
    }
}
