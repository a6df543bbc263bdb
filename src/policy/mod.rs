//! Per-username policy overrides.
//!
//! Overrides are owned by whatever backs the [`PolicyStore`] (the dashboard's
//! user settings in practice). The reconciliation engine only reads them.
//!
//! # Example Usage
//!
//! ```rust
//! use seerr_sync::policy::{InMemoryPolicyStore, PolicyOverride, PolicyStore};
//!
//! let store = InMemoryPolicyStore::new();
//! store.set(PolicyOverride::new("Alice").blocked());
//!
//! assert!(store.get("alice").blocked);
//! assert!(!store.get("bob").blocked);
//! ```

pub mod in_memory;

pub use in_memory::InMemoryPolicyStore;

use crate::identity::canonical_username;
use serde::{Deserialize, Serialize};

/// Policy applied to one username.
///
/// The defaults (`blocked = false`, `immune = false`, no limit, no suffix)
/// are what a username without a stored override gets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyOverride {
    pub username: String,
    /// Never create this identity in the target directory.
    #[serde(default)]
    pub blocked: bool,
    /// Never delete this account from the target directory.
    #[serde(default)]
    pub immune: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_suffix: Option<String>,
}

impl PolicyOverride {
    /// An override carrying only defaults, keyed by the canonical username.
    pub fn new(username: &str) -> Self {
        Self {
            username: canonical_username(username),
            ..Self::default()
        }
    }

    pub fn blocked(mut self) -> Self {
        self.blocked = true;
        self
    }

    pub fn immune(mut self) -> Self {
        self.immune = true;
        self
    }

    pub fn with_request_limit(mut self, limit: u32) -> Self {
        self.request_limit = Some(limit);
        self
    }

    pub fn with_password_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.password_suffix = Some(suffix.into());
        self
    }

    /// The suffix, if one is set and non-empty.
    pub fn effective_password_suffix(&self) -> Option<&str> {
        self.password_suffix
            .as_deref()
            .filter(|suffix| !suffix.is_empty())
    }
}

/// Read access to policy overrides.
///
/// Lookups are case-insensitive: implementations must treat `"Alice"` and
/// `"alice"` as the same username. A username without an override yields
/// [`PolicyOverride::new`].
pub trait PolicyStore: Send + Sync {
    fn get(&self, username: &str) -> PolicyOverride;
}

impl<T: PolicyStore + ?Sized> PolicyStore for std::sync::Arc<T> {
    fn get(&self, username: &str) -> PolicyOverride {
        (**self).get(username)
    }
}
