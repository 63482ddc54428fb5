//! Proxy providers (subscriptions) and rule providers

use crate::error::ValidationError;
use crate::settings::Settings;
use serde::{Deserialize, Serialize};

/// How a subscription is downloaded by the client
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum FetchMode {
    /// Fetch without a proxy
    #[default]
    Direct,
    /// Fetch through `fetch_proxy`
    Proxy,
}

/// A remote subscription rendered as a `proxy-providers` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subscription {
    /// Provider name (`sub-N`)
    pub name: String,
    /// Subscription URL
    pub url: String,
    /// Refresh interval in seconds
    pub interval: u32,
    /// Download mode
    pub fetch_mode: FetchMode,
    /// Proxy used when `fetch_mode` is `Proxy`
    pub fetch_proxy: String,
    /// Skip TLS verification while fetching
    #[serde(default)]
    pub skip_cert_verify: bool,
}

impl Subscription {
    /// Creates a subscription named `sub-<index>` with the configured defaults.
    pub fn new(index: usize, url: impl Into<String>, fetch_mode: FetchMode, settings: &Settings) -> Self {
        Subscription {
            name: format!("sub-{}", index),
            url: url.into(),
            interval: settings.subscription_interval,
            fetch_mode,
            fetch_proxy: settings.subscription_fetch_proxy.clone(),
            skip_cert_verify: false,
        }
    }

    /// Proxy to emit, only in proxy fetch mode with a non-empty proxy.
    pub fn effective_proxy(&self) -> Option<&str> {
        match self.fetch_mode {
            FetchMode::Proxy if !self.fetch_proxy.is_empty() => Some(&self.fetch_proxy),
            _ => None,
        }
    }
}

/// User input for a new rule provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleProviderInput {
    /// Provider name (also the RULE-SET key)
    pub name: String,
    /// Rule list URL
    pub url: String,
    /// `domain`, `ipcidr` or `classical`; settings default when `None`
    pub behavior: Option<String>,
    /// Policy for the RULE-SET rule (group, `DIRECT` or `REJECT`)
    pub policy: String,
}

/// A remote rule list rendered as a `rule-providers` entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleProvider {
    /// Provider name
    pub name: String,
    /// Rule list URL
    pub url: String,
    /// Provider behavior
    pub behavior: String,
    /// Policy of the RULE-SET rule; no rule is generated when empty
    pub policy: String,
    /// Provider `type`
    #[serde(rename = "type")]
    pub provider_type: String,
    /// Provider `format`
    pub format: String,
    /// Local cache path
    pub path: String,
    /// Refresh interval in seconds
    pub interval: Option<u32>,
    /// Proxy used to download the list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
}

impl RuleProvider {
    /// Validates `input` against `existing` providers and fills defaults.
    ///
    /// # Errors
    ///
    /// `MissingField` when name, url or policy is blank, `DuplicateName` when
    /// a provider with the same name exists.
    pub fn from_input(
        input: RuleProviderInput,
        existing: &[RuleProvider],
        settings: &Settings,
    ) -> Result<Self, ValidationError> {
        let name = input.name.trim().to_string();
        let url = input.url.trim().to_string();
        let policy = input.policy.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::MissingField("name".to_string()));
        }
        if url.is_empty() {
            return Err(ValidationError::MissingField("url".to_string()));
        }
        if policy.is_empty() {
            return Err(ValidationError::MissingField("policy".to_string()));
        }
        if existing.iter().any(|rp| rp.name == name) {
            return Err(ValidationError::DuplicateName(name));
        }

        let defaults = &settings.rule_provider;
        let behavior = input
            .behavior
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| defaults.behavior.clone());
        Ok(RuleProvider {
            path: format!("{}/{}.{}", settings.rules_dir, name, defaults.format),
            name,
            url,
            behavior,
            policy,
            provider_type: defaults.provider_type.clone(),
            format: defaults.format.clone(),
            interval: Some(defaults.interval),
            proxy: None,
        })
    }
}
