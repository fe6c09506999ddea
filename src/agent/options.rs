use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use super::interval::parse_schedule;
use crate::types::AgentId;

/// Placeholder values that mean "no key configured".
pub const API_KEY_SENTINELS: [&str; 2] = ["-empty-", "your-key"];

pub const DEFAULT_CREDENTIAL: &str = "wunderground_api_key";

/// Resolves a named credential to its secret value.
pub trait CredentialResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<String>;
}

/// Looks credentials up in the process environment under their upper-cased name.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentials;

impl CredentialResolver for EnvCredentials {
    fn resolve(&self, name: &str) -> Option<String> {
        std::env::var(name.to_uppercase())
            .ok()
            .filter(|v| !v.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    values: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl CredentialResolver for StaticCredentials {
    fn resolve(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

/// Raw, user-editable agent options as written in an options file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentOptions {
    /// Stable identity for persisted memory; a fresh one is generated when absent.
    pub id: Option<AgentId>,
    /// Starting location, used until a forecast signal supplies one.
    pub location: Option<String>,
    pub api_key: String,
    pub api_key_credential: String,
    pub default_check_schedule: String,
    pub on_alert_check_schedule: String,
    pub expected_update_period_in_days: u32,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            id: None,
            location: None,
            api_key: "-empty-".to_string(),
            api_key_credential: DEFAULT_CREDENTIAL.to_string(),
            default_check_schedule: "every_30m".to_string(),
            on_alert_check_schedule: "every_10m".to_string(),
            expected_update_period_in_days: 1,
        }
    }
}

impl AgentOptions {
    /// Loads options from a `.toml`, `.yaml` or `.yml` file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content)
                .map_err(|e| anyhow!("Failed to parse TOML {}: {}", path.display(), e)),
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .map_err(|e| anyhow!("Failed to parse YAML {}: {}", path.display(), e)),
            _ => Err(anyhow!(
                "Unsupported options file {} (expected .toml or .yaml)",
                path.display()
            )),
        }
    }

    fn inline_api_key(&self) -> Option<String> {
        let key = self.api_key.trim();
        if key.is_empty() || API_KEY_SENTINELS.contains(&key) {
            None
        } else {
            Some(key.to_string())
        }
    }

    /// Inline key first, falling back to the named credential.
    pub fn api_key(&self, credentials: &dyn CredentialResolver) -> Option<String> {
        self.inline_api_key().or_else(|| {
            let name = self.api_key_credential.trim();
            if name.is_empty() {
                None
            } else {
                credentials.resolve(name)
            }
        })
    }

    pub fn location(&self) -> Option<String> {
        self.location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
    }

    /// Every problem with these options, in a form fit for showing to a user.
    pub fn validate(&self, credentials: &dyn CredentialResolver) -> Vec<String> {
        let mut errors = Vec::new();

        if self.api_key(credentials).is_none() {
            errors.push("api_key is required".to_string());
        }
        if self.location().is_none() {
            errors.push("location is required".to_string());
        }
        if let Err(e) = parse_schedule(&self.default_check_schedule) {
            errors.push(format!("default_check_schedule: {}", e));
        }
        if let Err(e) = parse_schedule(&self.on_alert_check_schedule) {
            errors.push(format!("on_alert_check_schedule: {}", e));
        }
        if self.expected_update_period_in_days == 0 {
            errors.push("expected_update_period_in_days must be at least 1".to_string());
        }

        errors
    }

    /// Builds the typed configuration. A missing key is not an error here;
    /// the agent reports itself as not ready instead.
    pub fn resolve(&self, credentials: &dyn CredentialResolver) -> Result<AgentConfig> {
        Ok(AgentConfig {
            api_key: self.api_key(credentials),
            location: self.location(),
            default_interval: parse_schedule(&self.default_check_schedule)?,
            alerted_interval: parse_schedule(&self.on_alert_check_schedule)?,
            expected_update_period: Duration::from_secs(
                u64::from(self.expected_update_period_in_days.max(1)) * 86_400,
            ),
        })
    }
}

/// Resolved, typed configuration for one agent. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub api_key: Option<String>,
    pub location: Option<String>,
    pub default_interval: Duration,
    pub alerted_interval: Duration,
    pub expected_update_period: Duration,
}

impl AgentConfig {
    pub fn key_setup(&self) -> bool {
        self.api_key
            .as_deref()
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            location: None,
            default_interval: Duration::from_secs(30 * 60),
            alerted_interval: Duration::from_secs(10 * 60),
            expected_update_period: Duration::from_secs(86_400),
        }
    }
}
