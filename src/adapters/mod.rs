//! Capability interfaces for the systems a pass talks to.
//!
//! The engine never speaks a vendor protocol itself. Each media server type is
//! reached through a [`SourceAdapter`], and the request-management instance
//! through a [`TargetDirectory`]. Adapters own transport concerns: HTTP,
//! authentication, pagination, retries and their own timeouts. The engine
//! only needs a definitive success or failure for each call.
//!
//! Vendor payloads are normalised at this boundary. A source adapter returns
//! [`RawSourceUser`] records and nothing downstream looks at vendor fields.
//!
//! # Design Principles
//!
//! - **One adapter per server type**: the same adapter serves every
//!   configured server of its [`SourceType`]; per-server details arrive
//!   through [`ServerConfig`].
//! - **Errors are values**: a failed source is a [`SourceError`], never a
//!   panic, so one unreachable server cannot take the pass down.
//! - **Listing is authoritative**: [`TargetDirectory::list_accounts`] must
//!   return the full account set or fail.

pub mod in_memory;

pub use in_memory::{InMemorySource, InMemoryTargetDirectory};

use crate::config::ServerConfig;
use crate::error::{AccountOpResult, SourceResult, TargetResult};
use crate::identity::{RawSourceUser, SourceType, UnifiedUser};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// An account that currently exists in the target directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetAccount {
    pub username: String,
    pub native_id: String,
}

impl TargetAccount {
    pub fn new(username: impl Into<String>, native_id: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            native_id: native_id.into(),
        }
    }
}

/// Harvests user identities from media servers of one type.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// The server type this adapter understands.
    fn source_type(&self) -> SourceType;

    /// Cheap reachability check run before listing.
    async fn check_health(&self, _server: &ServerConfig) -> SourceResult<()> {
        Ok(())
    }

    /// Every user of the server, already normalised.
    async fn list_users(&self, server: &ServerConfig) -> SourceResult<Vec<RawSourceUser>>;
}

/// Reads and mutates accounts of the request-management instance.
#[async_trait]
pub trait TargetDirectory: Send + Sync {
    async fn list_accounts(&self) -> TargetResult<Vec<TargetAccount>>;

    async fn create_account(
        &self,
        user: &UnifiedUser,
        password: &str,
        request_limit: Option<u32>,
    ) -> AccountOpResult<TargetAccount>;

    async fn delete_account(&self, account: &TargetAccount) -> AccountOpResult<()>;
}

/// Source adapters keyed by the server type they serve.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<SourceType, Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own [`SourceAdapter::source_type`],
    /// replacing any adapter previously registered for that type.
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) -> &mut Self {
        self.adapters.insert(adapter.source_type(), adapter);
        self
    }

    pub fn get(&self, source_type: SourceType) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters.get(&source_type).cloned()
    }

    pub fn contains(&self, source_type: SourceType) -> bool {
        self.adapters.contains_key(&source_type)
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.adapters.keys().collect();
        types.sort();
        f.debug_struct("AdapterRegistry")
            .field("source_types", &types)
            .finish()
    }
}
