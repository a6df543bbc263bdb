//! Last-confirmed provenance of usernames.
//!
//! A [`ProvenanceStore`] remembers which source servers reported a username
//! the last time that server was reachable. The planner consults it under
//! [`DeletionSafety::SkipUnconfirmed`](crate::planner::DeletionSafety) to
//! decide whether an account that is missing this pass might only be missing
//! because its server failed.

use crate::identity::canonical_username;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

pub trait ProvenanceStore: Send + Sync {
    /// Server ids the username was last confirmed on, or `None` if unknown.
    fn known_servers(&self, username: &str) -> Option<BTreeSet<String>>;

    /// Replace the recorded servers for a username.
    fn record(&self, username: &str, servers: BTreeSet<String>);

    /// Drop everything recorded for a username.
    fn forget(&self, username: &str);

    /// Every username with a recorded entry, canonical form.
    fn known_usernames(&self) -> Vec<String>;
}

/// Provenance held in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvenanceStore {
    entries: Arc<RwLock<HashMap<String, BTreeSet<String>>>>,
}

impl InMemoryProvenanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProvenanceStore for InMemoryProvenanceStore {
    fn known_servers(&self, username: &str) -> Option<BTreeSet<String>> {
        let guard = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        guard.get(&canonical_username(username)).cloned()
    }

    fn record(&self, username: &str, servers: BTreeSet<String>) {
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        guard.insert(canonical_username(username), servers);
    }

    fn forget(&self, username: &str) {
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        guard.remove(&canonical_username(username));
    }

    fn known_usernames(&self) -> Vec<String> {
        let guard = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        guard.keys().cloned().collect()
    }
}
