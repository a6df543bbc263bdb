//! Configuration for source servers, the target directory and pass behaviour.
//!
//! Configuration is plain serde data. It is usually read from the dashboard's
//! JSON document:
//!
//! ```rust
//! use seerr_sync::config::SyncConfig;
//!
//! let config = SyncConfig::from_json_str(r#"{
//!     "target": { "url": "http://localhost:5055", "api_key": "secret" },
//!     "servers": [
//!         { "id": "Plex Server 1", "type": "plex", "url": "http://localhost:32400",
//!           "token": "plex-token", "password_suffix": "2025", "request_limit": 10 }
//!     ],
//!     "sync_interval_minutes": 60
//! }"#).unwrap();
//!
//! assert_eq!(config.enabled_servers().count(), 1);
//! assert!(config.sync_interval().is_some());
//! ```
//!
//! [`SyncConfig::validate`] is run before every pass; anything it rejects is a
//! [`ConfigError`] and the pass does not start.

use crate::error::{ConfigError, ConfigResult};
use crate::identity::SourceType;
use crate::planner::DeletionSafety;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Connection settings for one media server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Unique, human-readable server id (the dashboard uses the server name).
    pub id: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    #[serde(deserialize_with = "trimmed_string")]
    pub url: String,
    pub token: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Appended to the password base for accounts created from this server.
    #[serde(default)]
    pub password_suffix: String,
    /// Request limit for accounts created from this server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_limit: Option<u32>,
    /// Plex only: restrict shared users to this server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_identifier: Option<String>,
    /// Include the server owner/admin account.
    #[serde(default = "default_true")]
    pub include_owner: bool,
}

impl ServerConfig {
    pub fn new(
        id: impl Into<String>,
        source_type: SourceType,
        url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source_type,
            url: url.into().trim().to_string(),
            token: token.into(),
            enabled: true,
            password_suffix: String::new(),
            request_limit: None,
            machine_identifier: None,
            include_owner: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_password_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.password_suffix = suffix.into();
        self
    }

    pub fn with_request_limit(mut self, limit: u32) -> Self {
        self.request_limit = Some(limit);
        self
    }

    /// Validate this server on its own. Disabled servers only need an id.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::missing("media server", "id"));
        }
        if !self.enabled {
            return Ok(());
        }

        let scope = format!("server '{}'", self.id);
        if self.token.trim().is_empty() {
            return Err(ConfigError::missing(scope, "token"));
        }
        validate_url(&scope, &self.url)
    }
}

/// Connection settings for the target directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(deserialize_with = "trimmed_string")]
    pub url: String,
    pub api_key: String,
}

impl TargetConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into().trim().to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::missing("target directory", "api_key"));
        }
        validate_url("target directory", &self.url)
    }
}

/// What a created account's password starts with before the suffix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasswordBase {
    /// The account's display username.
    #[default]
    Username,
    /// A shared secret.
    Secret(String),
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub target: TargetConfig,
    #[serde(default, alias = "media_servers")]
    pub servers: Vec<ServerConfig>,
    /// Run passes on this period when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_interval_minutes: Option<u64>,
    /// Delete target accounts that no source reports any more.
    #[serde(default)]
    pub remove_missing: bool,
    #[serde(default)]
    pub deletion_safety: DeletionSafety,
    #[serde(default)]
    pub password_base: PasswordBase,
    /// Request limit used when neither policy nor server sets one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_request_limit: Option<u32>,
    /// Upper bound on concurrent create/delete calls.
    #[serde(default = "default_max_concurrent_operations")]
    pub max_concurrent_operations: usize,
    /// Timeout applied to every adapter call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter_timeout_secs: Option<u64>,
}

impl SyncConfig {
    pub fn new(target: TargetConfig) -> Self {
        Self {
            target,
            servers: Vec::new(),
            sync_interval_minutes: None,
            remove_missing: false,
            deletion_safety: DeletionSafety::default(),
            password_base: PasswordBase::default(),
            default_request_limit: None,
            max_concurrent_operations: default_max_concurrent_operations(),
            adapter_timeout_secs: None,
        }
    }

    pub fn with_server(mut self, server: ServerConfig) -> Self {
        self.servers.push(server);
        self
    }

    pub fn with_remove_missing(mut self, remove_missing: bool) -> Self {
        self.remove_missing = remove_missing;
        self
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: SyncConfig = serde_json::from_str(json).map_err(|e| ConfigError::Load {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Load {
            message: format!("{}: {}", path.display(), e),
        })?;
        Self::from_json_str(&contents)
    }

    pub fn enabled_servers(&self) -> impl Iterator<Item = &ServerConfig> {
        self.servers.iter().filter(|server| server.enabled)
    }

    pub fn server(&self, id: &str) -> Option<&ServerConfig> {
        self.servers.iter().find(|server| server.id == id)
    }

    pub fn sync_interval(&self) -> Option<Duration> {
        self.sync_interval_minutes
            .map(|minutes| Duration::from_secs(minutes.saturating_mul(60)))
    }

    pub fn adapter_timeout(&self) -> Option<Duration> {
        self.adapter_timeout_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.target.validate()?;
        validate_servers(&self.servers)?;

        if self.sync_interval_minutes == Some(0) {
            return Err(ConfigError::invalid(
                "sync settings",
                "sync_interval_minutes",
                "must be greater than 0",
            ));
        }
        if self.max_concurrent_operations == 0 {
            return Err(ConfigError::invalid(
                "sync settings",
                "max_concurrent_operations",
                "must be greater than 0",
            ));
        }
        if self.adapter_timeout_secs == Some(0) {
            return Err(ConfigError::invalid(
                "sync settings",
                "adapter_timeout_secs",
                "must be greater than 0",
            ));
        }
        if let PasswordBase::Secret(secret) = &self.password_base {
            if secret.is_empty() {
                return Err(ConfigError::invalid(
                    "sync settings",
                    "password_base",
                    "secret cannot be empty",
                ));
            }
        }
        Ok(())
    }
}

/// Validate a server list: unique ids, every server valid, at least one enabled.
pub fn validate_servers(servers: &[ServerConfig]) -> ConfigResult<()> {
    let mut seen = HashSet::new();
    for server in servers {
        server.validate()?;
        if !seen.insert(server.id.as_str()) {
            return Err(ConfigError::DuplicateServerId {
                server_id: server.id.clone(),
            });
        }
    }

    if !servers.iter().any(|server| server.enabled) {
        return Err(ConfigError::NoEnabledServers);
    }
    Ok(())
}

fn validate_url(scope: &str, url: &str) -> ConfigResult<()> {
    if url.is_empty() {
        return Err(ConfigError::missing(scope, "url"));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::invalid(
            scope,
            "url",
            "must start with http:// or https://",
        ));
    }
    Ok(())
}

fn default_true() -> bool {
    true
}

fn default_max_concurrent_operations() -> usize {
    4
}

fn trimmed_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(value.trim().to_string())
}
