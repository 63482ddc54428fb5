//! Generator settings
//!
//! Every field has a default matching what Clash clients expect, so an empty
//! JSON object (or no settings file at all) yields a working configuration.
//!
//! ```json
//! {
//!   "auto_group_name": "auto",
//!   "subscription_interval": 3600,
//!   "health_check": { "enable": true, "url": "http://www.gstatic.com/generate_204", "interval": 600 },
//!   "rule_provider": { "type": "http", "behavior": "classical", "format": "yaml", "interval": 600 },
//!   "overrides": { "rules": "rules:\n  - MATCH,DIRECT" }
//! }
//! ```

use crate::error::SettingsError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Health check attached to every proxy provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HealthCheck {
    /// Enable probing
    pub enable: bool,
    /// Probe URL
    pub url: String,
    /// Probe interval in seconds
    pub interval: u32,
}

impl Default for HealthCheck {
    fn default() -> Self {
        HealthCheck {
            enable: true,
            url: "http://www.gstatic.com/generate_204".to_string(),
            interval: 600,
        }
    }
}

/// Defaults applied to new rule providers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RuleProviderDefaults {
    /// Provider `type`
    #[serde(rename = "type")]
    pub provider_type: String,
    /// Provider `behavior` when the caller gives none
    pub behavior: String,
    /// Provider `format`
    pub format: String,
    /// Refresh interval in seconds
    pub interval: u32,
}

impl Default for RuleProviderDefaults {
    fn default() -> Self {
        RuleProviderDefaults {
            provider_type: "http".to_string(),
            behavior: "classical".to_string(),
            format: "yaml".to_string(),
            interval: 600,
        }
    }
}

/// Verbatim replacements for generated blocks
///
/// A `Some` value is emitted as-is (trimmed) instead of the generated block.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Overrides {
    /// Replaces `proxy-groups`
    pub groups: Option<String>,
    /// Replaces `proxy-providers`
    pub proxy_providers: Option<String>,
    /// Replaces `rule-providers`
    pub rule_providers: Option<String>,
    /// Replaces `rules`
    pub rules: Option<String>,
}

/// Generator settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Name of the group that collects every proxy and subscription
    pub auto_group_name: String,
    /// Directory for proxy provider caches
    pub providers_dir: String,
    /// Directory for rule provider caches
    pub rules_dir: String,
    /// Refresh interval of new subscriptions, in seconds
    pub subscription_interval: u32,
    /// Proxy used to fetch subscriptions in proxy fetch mode
    pub subscription_fetch_proxy: String,
    /// Provider health check
    pub health_check: HealthCheck,
    /// Rule provider defaults
    pub rule_provider: RuleProviderDefaults,
    /// Lines per chunk sent by the line-list loader
    pub loader_chunk_size: usize,
    /// Verbatim block overrides
    pub overrides: Overrides,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            auto_group_name: "auto".to_string(),
            providers_dir: "./providers".to_string(),
            rules_dir: "./rules".to_string(),
            subscription_interval: 3600,
            subscription_fetch_proxy: "GLOBAL".to_string(),
            health_check: HealthCheck::default(),
            rule_provider: RuleProviderDefaults::default(),
            loader_chunk_size: 6000,
            overrides: Overrides::default(),
        }
    }
}

impl Settings {
    /// Deserialize settings from a JSON string; missing keys take defaults.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and deserialize a JSON settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Serialize the settings to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
