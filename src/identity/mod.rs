//! User identities as reported by source servers and as merged across them.
//!
//! Source adapters normalise vendor payloads into [`RawSourceUser`] records.
//! The [`merger`] folds those records into one [`UnifiedUser`] per
//! case-insensitive username. Nothing here is persisted; unified users are
//! rebuilt on every pass.

pub mod merger;

pub use merger::{SourceBatch, merge};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// The kind of media server a source is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Plex,
    Jellyfin,
    Emby,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Plex => "plex",
            SourceType::Jellyfin => "jellyfin",
            SourceType::Emby => "emby",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "plex" => Ok(SourceType::Plex),
            "jellyfin" => Ok(SourceType::Jellyfin),
            "emby" => Ok(SourceType::Emby),
            other => Err(format!("Unsupported media server type: {other}")),
        }
    }
}

/// Normalise a username into the key used for identity matching.
///
/// Both the merger and the planner go through this function so that source
/// users and target accounts compare equal under the same rules.
pub fn canonical_username(username: &str) -> String {
    username.trim().to_lowercase()
}

/// A user record exactly as one source server reported it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSourceUser {
    pub source_server_id: String,
    pub source_type: SourceType,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_email: Option<String>,
    pub native_id: String,
}

impl RawSourceUser {
    pub fn new(
        source_server_id: impl Into<String>,
        source_type: SourceType,
        username: impl Into<String>,
        native_id: impl Into<String>,
    ) -> Self {
        Self {
            source_server_id: source_server_id.into(),
            source_type,
            username: username.into(),
            display_email: None,
            native_id: native_id.into(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.display_email = Some(email.into());
        self
    }

    /// The email with surrounding whitespace removed, or `None` if blank.
    pub fn normalized_email(&self) -> Option<&str> {
        self.display_email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }
}

/// The canonical identity for one username across every source of a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedUser {
    /// Lower-cased key shared by all contributing records.
    pub username: String,
    /// Casing of the first record seen.
    pub display_username: String,
    pub email: Option<String>,
    /// Contributing server ids without duplicates, in the order they first
    /// contributed.
    pub source_servers: Vec<String>,
    pub source_types: BTreeSet<SourceType>,
}

impl UnifiedUser {
    /// `server_id` is the server whose batch carried the record.
    pub(crate) fn from_first_record(username: String, server_id: &str, record: &RawSourceUser) -> Self {
        let mut source_types = BTreeSet::new();
        source_types.insert(record.source_type);
        Self {
            username,
            display_username: record.username.trim().to_string(),
            email: record.normalized_email().map(str::to_string),
            source_servers: vec![server_id.to_string()],
            source_types,
        }
    }

    pub(crate) fn absorb(&mut self, server_id: &str, record: &RawSourceUser) {
        if self.email.is_none() {
            self.email = record.normalized_email().map(str::to_string);
        }
        if !self.source_servers.iter().any(|id| id == server_id) {
            self.source_servers.push(server_id.to_string());
        }
        self.source_types.insert(record.source_type);
    }

    pub fn is_from_server(&self, server_id: &str) -> bool {
        self.source_servers.iter().any(|id| id == server_id)
    }
}
