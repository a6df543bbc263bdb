//! In-memory policy store.
//!
//! Thread-safe map from canonical username to [`PolicyOverride`], suitable for
//! tests and for embedding the engine behind a dashboard that loads user
//! settings into memory.

use super::{PolicyOverride, PolicyStore};
use crate::identity::canonical_username;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Clone, Default)]
pub struct InMemoryPolicyStore {
    // Structure: canonical username -> override
    overrides: Arc<RwLock<HashMap<String, PolicyOverride>>>,
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a list of overrides. Later entries for the same
    /// username replace earlier ones.
    pub fn from_overrides(overrides: impl IntoIterator<Item = PolicyOverride>) -> Self {
        let store = Self::new();
        for policy in overrides {
            store.set(policy);
        }
        store
    }

    /// Insert or replace the override for `policy.username`.
    pub fn set(&self, mut policy: PolicyOverride) {
        policy.username = canonical_username(&policy.username);
        let mut guard = self.overrides.write().unwrap_or_else(PoisonError::into_inner);
        guard.insert(policy.username.clone(), policy);
    }

    /// Remove the override for a username, returning it if present.
    pub fn remove(&self, username: &str) -> Option<PolicyOverride> {
        let mut guard = self.overrides.write().unwrap_or_else(PoisonError::into_inner);
        guard.remove(&canonical_username(username))
    }

    pub fn len(&self) -> usize {
        self.overrides
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PolicyStore for InMemoryPolicyStore {
    fn get(&self, username: &str) -> PolicyOverride {
        let key = canonical_username(username);
        let guard = self.overrides.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .get(&key)
            .cloned()
            .unwrap_or_else(|| PolicyOverride::new(&key))
    }
}
