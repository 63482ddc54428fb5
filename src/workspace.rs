//! Configuration workspace
//!
//! [`Workspace`] owns every collection that goes into a configuration:
//! parsed proxies, groups, subscriptions, rule providers, manual rules,
//! GEOSITE/GEOIP selections, the MATCH choice and the user's rule order.
//! Every mutating operation keeps the rule order in sync, so [`render`]
//! and [`build`] always see a consistent state.
//!
//! [`render`]: Workspace::render
//! [`build`]: Workspace::build

use crate::batch::{LinkError, ParseOptions, parse_many};
use crate::conflict::resolve_name_conflicts;
use crate::constants::{NEW_GROUP_PREFIX, PRESET_RULES};
use crate::descriptor::ProxyDescriptor;
use crate::error::ValidationError;
use crate::geo::{LoadEvent, spawn_line_loader};
use crate::group::{GroupType, ProxyGroup, uniq};
use crate::provider::{FetchMode, RuleProvider, RuleProviderInput, Subscription};
use crate::rules::{
    ManualRule, MatchPolicy, MatchSelection, RuleAction, RuleOrder, RuleSelections,
    build_rule_entries,
};
use crate::settings::Settings;
use crate::validate::{ManualRuleType, normalize_manual_rule};
use crate::yaml::{
    Document, emit_groups, emit_proxies, emit_rule_providers, emit_rules,
    emit_subscription_providers,
};
use std::io::Read;
use std::sync::mpsc::Receiver;
use tracing::debug;

/// Direction of a rule move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleMove {
    /// One position up
    Up,
    /// One position down
    Down,
    /// First position
    Top,
    /// Last position before MATCH
    Bottom,
}

/// Outcome of [`Workspace::build`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    /// Nothing to render
    Empty {
        /// First link error, if any link failed
        first_error: Option<String>,
    },
    /// Rendered, but some links failed
    Partial {
        /// Parsed proxies
        proxies: usize,
        /// Failed links
        errors: usize,
        /// Message of the first failure
        first_error: String,
    },
    /// Rendered without link errors
    Complete {
        /// Parsed proxies
        proxies: usize,
        /// Subscriptions
        subscriptions: usize,
        /// Proxy groups
        groups: usize,
        /// Rules other than MATCH
        rules: usize,
    },
}

/// Rendered configuration with its status
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    /// Configuration text; empty for [`BuildStatus::Empty`]
    pub yaml: String,
    /// Summary
    pub status: BuildStatus,
    /// Links that failed to parse
    pub errors: Vec<LinkError>,
}

/// Owner of all configuration state
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    /// Generator settings
    pub settings: Settings,
    /// Proxies from the last build
    pub proxies: Vec<ProxyDescriptor>,
    /// Proxy groups, in output order
    pub groups: Vec<ProxyGroup>,
    /// Subscriptions (`proxy-providers`)
    pub subscriptions: Vec<Subscription>,
    /// Rule providers
    pub rule_providers: Vec<RuleProvider>,
    /// Hand-written rules
    pub manual_rules: Vec<ManualRule>,
    /// GEOSITE / GEOIP selections
    pub selections: RuleSelections,
    match_selection: MatchSelection,
    rule_order: RuleOrder,
    next_rule_id: u64,
}

impl MatchPolicy for Workspace {
    fn match_policy_target(&self) -> String {
        self.match_selection
            .resolve(&self.groups, &self.settings.auto_group_name)
    }
}

impl Workspace {
    /// Creates an empty workspace.
    pub fn new(settings: Settings) -> Self {
        Workspace {
            settings,
            ..Default::default()
        }
    }

    /// Current rule order, MATCH last.
    pub fn rule_order(&self) -> &RuleOrder {
        &self.rule_order
    }

    /// Current MATCH choice.
    pub fn match_selection(&self) -> &MatchSelection {
        &self.match_selection
    }

    /// Adds an empty group named `NAME_<n>`, one above the highest existing
    /// `NAME_<n>`.
    pub fn add_group(&mut self, group_type: GroupType) -> &ProxyGroup {
        let max = self
            .groups
            .iter()
            .filter_map(|g| g.name.strip_prefix(NEW_GROUP_PREFIX))
            .filter(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
            .filter_map(|n| n.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        let name = format!("{}{}", NEW_GROUP_PREFIX, max + 1);
        debug!("Adding group {}", name);
        let index = self.groups.len();
        self.groups.push(ProxyGroup::new(name, group_type));
        self.rebuild_rule_order();
        &self.groups[index]
    }

    /// Removes a group by name. Rules pointing at it keep the name.
    pub fn remove_group(&mut self, name: &str) -> bool {
        let before = self.groups.len();
        self.groups.retain(|g| g.name != name);
        let removed = self.groups.len() != before;
        if removed {
            self.match_selection = std::mem::take(&mut self.match_selection).normalized(&self.groups);
            self.rebuild_rule_order();
        }
        removed
    }

    /// Adds a subscription named `sub-<n>`; blank URLs are ignored.
    pub fn add_subscription(
        &mut self,
        url: &str,
        fetch_mode: FetchMode,
        skip_cert_verify: bool,
    ) -> Option<&Subscription> {
        let url = url.trim();
        if url.is_empty() {
            return None;
        }
        let mut sub = Subscription::new(self.subscriptions.len() + 1, url, fetch_mode, &self.settings);
        sub.skip_cert_verify = skip_cert_verify;
        debug!("Adding subscription {}", sub.name);
        self.subscriptions.push(sub);
        self.subscriptions.last()
    }

    /// Removes a subscription by name.
    pub fn remove_subscription(&mut self, name: &str) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.name != name);
        self.subscriptions.len() != before
    }

    /// Validates and adds a rule provider.
    ///
    /// # Errors
    ///
    /// See [`RuleProvider::from_input`].
    pub fn add_rule_provider(&mut self, input: RuleProviderInput) -> Result<(), ValidationError> {
        let provider = RuleProvider::from_input(input, &self.rule_providers, &self.settings)?;
        debug!("Adding rule provider {}", provider.name);
        self.rule_providers.push(provider);
        self.rebuild_rule_order();
        Ok(())
    }

    /// Removes a rule provider by name.
    pub fn remove_rule_provider(&mut self, name: &str) -> bool {
        let before = self.rule_providers.len();
        self.rule_providers.retain(|rp| rp.name != name);
        let removed = self.rule_providers.len() != before;
        if removed {
            self.rebuild_rule_order();
        }
        removed
    }

    /// Validates and adds a manual rule; returns its id.
    ///
    /// `choice` is `DIRECT`, `REJECT` or a group name.
    ///
    /// # Errors
    ///
    /// `MissingField` for a blank value or choice, or the normalization error.
    pub fn add_manual_rule(
        &mut self,
        rule_type: ManualRuleType,
        raw_value: &str,
        choice: &str,
    ) -> Result<String, ValidationError> {
        let choice = choice.trim();
        if raw_value.trim().is_empty() {
            return Err(ValidationError::MissingField("value".to_string()));
        }
        if choice.is_empty() {
            return Err(ValidationError::MissingField("policy".to_string()));
        }
        let value = normalize_manual_rule(rule_type, raw_value)?;
        let (action, target) = RuleAction::from_choice(choice);

        self.next_rule_id += 1;
        let id = format!("rule-{}", self.next_rule_id);
        self.manual_rules.push(ManualRule {
            id: id.clone(),
            rule_type,
            value,
            action,
            target,
        });
        self.rebuild_rule_order();
        Ok(id)
    }

    /// Removes a manual rule by id.
    pub fn remove_manual_rule(&mut self, id: &str) -> bool {
        let before = self.manual_rules.len();
        self.manual_rules.retain(|r| r.id != id);
        let removed = self.manual_rules.len() != before;
        if removed {
            self.rebuild_rule_order();
        }
        removed
    }

    /// Sets the policy for a domain list; an empty target clears it.
    pub fn select_geosite(&mut self, name: &str, target: &str) {
        self.selections.select_geosite(name, target);
        self.rebuild_rule_order();
    }

    /// Sets the policy for a country code; an empty target clears it.
    pub fn select_geoip(&mut self, code: &str, target: &str) {
        self.selections.select_geoip(code, target);
        self.rebuild_rule_order();
    }

    /// Chooses the MATCH policy. Invalid choices fall back to auto.
    pub fn set_match(&mut self, selection: MatchSelection) {
        self.match_selection = selection.normalized(&self.groups);
        self.rebuild_rule_order();
    }

    /// Makes sure the auto group exists and lists every proxy and
    /// subscription.
    ///
    /// Does nothing while there are neither proxies nor subscriptions. A
    /// missing group is created as `select` at the front. Members that still
    /// exist keep their position; new ones are appended.
    pub fn ensure_auto_group(&mut self) {
        if self.proxies.is_empty() && self.subscriptions.is_empty() {
            return;
        }
        let auto_name = self.settings.auto_group_name.clone();
        let index = match self.groups.iter().position(|g| g.name == auto_name) {
            Some(index) => index,
            None => {
                debug!("Creating group {}", auto_name);
                self.groups.insert(0, ProxyGroup::new(auto_name, GroupType::Select));
                0
            }
        };

        let proxy_names: Vec<String> = self.proxies.iter().map(|p| p.name.clone()).collect();
        let sub_names: Vec<String> = self.subscriptions.iter().map(|s| s.name.clone()).collect();
        let group = &mut self.groups[index];

        let kept: Vec<String> = group
            .proxies
            .drain(..)
            .filter(|n| proxy_names.contains(n))
            .collect();
        group.proxies = uniq(kept.into_iter().chain(proxy_names));

        if sub_names.is_empty() {
            group.use_subs.clear();
        } else {
            let kept: Vec<String> = group
                .use_subs
                .drain(..)
                .filter(|n| sub_names.contains(n))
                .collect();
            group.use_subs = uniq(kept.into_iter().chain(sub_names));
        }
    }

    /// Recomputes the rule entries and merges them into the current order.
    pub fn rebuild_rule_order(&mut self) {
        let entries = build_rule_entries(
            &self.selections,
            &self.rule_providers,
            &self.manual_rules,
            &*self,
        );
        self.rule_order.rebuild(entries);
    }

    /// Moves the rule at `index`; `false` when the move is not allowed.
    pub fn move_rule(&mut self, index: usize, direction: RuleMove) -> bool {
        if self.rule_order.is_empty() {
            self.rebuild_rule_order();
        }
        match direction {
            RuleMove::Up => self.rule_order.move_up(index),
            RuleMove::Down => self.rule_order.move_down(index),
            RuleMove::Top => self.rule_order.move_to_top(index),
            RuleMove::Bottom => self.rule_order.move_to_bottom(index),
        }
    }

    /// Installs the preset rule list as the `rules` override.
    pub fn apply_preset_rules(&mut self) {
        let mut lines: Vec<String> = PRESET_RULES.iter().map(|r| r.to_string()).collect();
        lines.push(format!("MATCH,{}", self.match_policy_target()));
        self.settings.overrides.rules = Some(format!("rules:\n  - {}", lines.join("\n  - ")));
    }

    /// Streams a GEOSITE/GEOIP list from `source` in batches of
    /// `settings.loader_chunk_size` lines.
    ///
    /// `total` is the expected byte size, when known.
    pub fn load_line_list<R>(&self, source: R, total: Option<u64>) -> Receiver<LoadEvent>
    where
        R: Read + Send + 'static,
    {
        spawn_line_loader(source, total, self.settings.loader_chunk_size)
    }

    fn has_content(&self) -> bool {
        !self.proxies.is_empty()
            || !self.subscriptions.is_empty()
            || !self.groups.is_empty()
            || !self.rule_providers.is_empty()
            || self.rule_order.entries().iter().any(|e| !e.is_match())
    }

    /// Renders the current state.
    ///
    /// The rules block is only generated once there is something else to
    /// route; overrides always apply.
    pub fn render(&self) -> Document {
        let proxies = if self.proxies.is_empty() {
            String::new()
        } else {
            emit_proxies(&self.proxies)
        };
        let rules = if self.has_content() {
            let mut entries = if self.rule_order.is_empty() {
                build_rule_entries(
                    &self.selections,
                    &self.rule_providers,
                    &self.manual_rules,
                    self,
                )
            } else {
                self.rule_order.entries().to_vec()
            };
            // MATCH follows the groups as they are now.
            let target = self.match_policy_target();
            for entry in entries.iter_mut().filter(|e| e.is_match()) {
                entry.policy = target.clone();
            }
            emit_rules(&entries)
        } else {
            String::new()
        };
        Document {
            proxies,
            proxy_providers: emit_subscription_providers(&self.subscriptions, &self.settings),
            proxy_groups: emit_groups(&self.groups),
            rule_providers: emit_rule_providers(&self.rule_providers),
            rules,
        }
        .with_overrides(&self.settings.overrides)
    }

    /// Parses `raw`, merges the proxies into the workspace and renders.
    ///
    /// Replaces the proxy list, renames duplicates (rewriting group
    /// references), refreshes the auto group and the rule order.
    ///
    /// # Example
    ///
    /// ```rust
    /// use clash_link_serde::{BuildStatus, Settings, Workspace};
    ///
    /// let mut ws = Workspace::new(Settings::default());
    /// let report = ws.build("trojan://pw@a.example:443#A\ntrojan://pw@b.example:443#A");
    /// assert!(matches!(report.status, BuildStatus::Complete { proxies: 2, .. }));
    /// assert_eq!(ws.groups[0].proxies, vec!["A", "A_1"]);
    /// assert!(report.yaml.ends_with("rules:\n  - MATCH,auto\n"));
    /// ```
    pub fn build(&mut self, raw: &str) -> BuildReport {
        let outcome = parse_many(raw, ParseOptions { collect_errors: true });
        let first_error = outcome.first_error();
        let mut proxies = outcome.proxies;
        resolve_name_conflicts(&mut proxies, &mut self.groups);
        self.proxies = proxies;

        self.ensure_auto_group();
        self.match_selection = std::mem::take(&mut self.match_selection).normalized(&self.groups);
        self.rebuild_rule_order();

        let document = self.render();
        let errors = outcome.errors;
        let status = if document.is_empty() {
            BuildStatus::Empty { first_error }
        } else if let Some(first_error) = first_error {
            BuildStatus::Partial {
                proxies: self.proxies.len(),
                errors: errors.len(),
                first_error,
            }
        } else {
            BuildStatus::Complete {
                proxies: self.proxies.len(),
                subscriptions: self.subscriptions.len(),
                groups: self.groups.len(),
                rules: self.rule_order.entries().iter().filter(|e| !e.is_match()).count(),
            }
        };
        debug!("Build finished: {:?}", status);

        BuildReport {
            yaml: document.render(),
            status,
            errors,
        }
    }
}
