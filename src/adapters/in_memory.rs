//! In-memory adapters for testing, development and embedding.
//!
//! [`InMemorySource`] serves canned user lists per server id and
//! [`InMemoryTargetDirectory`] keeps accounts in a vector. Both can be told
//! to fail specific calls, which is how pass-level failure handling is
//! exercised without a network.
//!
//! # Example Usage
//!
//! ```rust
//! use seerr_sync::adapters::{InMemoryTargetDirectory, TargetDirectory};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let target = InMemoryTargetDirectory::with_accounts(["alice", "bob"]);
//! let accounts = target.list_accounts().await?;
//! assert_eq!(accounts.len(), 2);
//! # Ok(())
//! # }
//! ```

use super::{SourceAdapter, TargetAccount, TargetDirectory};
use crate::config::ServerConfig;
use crate::error::{AccountOpError, AccountOpResult, SourceError, SourceResult, TargetError, TargetResult};
use crate::identity::{RawSourceUser, SourceType, UnifiedUser, canonical_username};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// Canned source adapter for one server type.
#[derive(Clone)]
pub struct InMemorySource {
    source_type: SourceType,
    // Structure: server id -> usernames with optional email
    users: Arc<RwLock<HashMap<String, Vec<(String, Option<String>)>>>>,
    list_failures: Arc<RwLock<HashMap<String, SourceError>>>,
    health_failures: Arc<RwLock<HashMap<String, SourceError>>>,
    delay: Arc<RwLock<Option<Duration>>>,
    list_calls: Arc<AtomicUsize>,
}

impl InMemorySource {
    pub fn new(source_type: SourceType) -> Self {
        Self {
            source_type,
            users: Arc::new(RwLock::new(HashMap::new())),
            list_failures: Arc::new(RwLock::new(HashMap::new())),
            health_failures: Arc::new(RwLock::new(HashMap::new())),
            delay: Arc::new(RwLock::new(None)),
            list_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Replace the users reported for a server.
    pub async fn set_users<I, S>(&self, server_id: &str, usernames: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let users = usernames
            .into_iter()
            .map(|name| (name.into(), None))
            .collect();
        self.users.write().await.insert(server_id.to_string(), users);
    }

    /// Add a single user with an email to a server.
    pub async fn add_user_with_email(&self, server_id: &str, username: &str, email: &str) {
        self.users
            .write()
            .await
            .entry(server_id.to_string())
            .or_default()
            .push((username.to_string(), Some(email.to_string())));
    }

    /// Make `list_users` fail for a server until cleared.
    pub async fn fail_listing(&self, server_id: &str, error: SourceError) {
        self.list_failures
            .write()
            .await
            .insert(server_id.to_string(), error);
    }

    /// Make `check_health` fail for a server until cleared.
    pub async fn fail_health(&self, server_id: &str, error: SourceError) {
        self.health_failures
            .write()
            .await
            .insert(server_id.to_string(), error);
    }

    pub async fn clear_failures(&self) {
        self.list_failures.write().await.clear();
        self.health_failures.write().await.clear();
    }

    /// Sleep this long inside every `check_health` and `list_users` call.
    pub async fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write().await = delay;
    }

    async fn apply_delay(&self) {
        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for InMemorySource {
    fn source_type(&self) -> SourceType {
        self.source_type
    }

    async fn check_health(&self, server: &ServerConfig) -> SourceResult<()> {
        self.apply_delay().await;
        match self.health_failures.read().await.get(&server.id) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn list_users(&self, server: &ServerConfig) -> SourceResult<Vec<RawSourceUser>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.apply_delay().await;

        if let Some(error) = self.list_failures.read().await.get(&server.id) {
            return Err(error.clone());
        }

        let users = self.users.read().await;
        let records = users
            .get(&server.id)
            .map(|users| {
                users
                    .iter()
                    .enumerate()
                    .map(|(position, (username, email))| {
                        let mut record = RawSourceUser::new(
                            server.id.clone(),
                            self.source_type,
                            username.clone(),
                            format!("{}-{}", server.id, position),
                        );
                        record.display_email = email.clone();
                        record
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(records)
    }
}

/// An account creation as the target directory received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedAccount {
    pub username: String,
    pub email: Option<String>,
    pub password: String,
    pub request_limit: Option<u32>,
}

/// Target directory backed by a vector of accounts.
#[derive(Clone, Default)]
pub struct InMemoryTargetDirectory {
    accounts: Arc<RwLock<Vec<TargetAccount>>>,
    created: Arc<RwLock<Vec<CreatedAccount>>>,
    list_failure: Arc<RwLock<Option<TargetError>>>,
    // Keyed by canonical username
    create_failures: Arc<RwLock<HashMap<String, AccountOpError>>>,
    delete_failures: Arc<RwLock<HashMap<String, AccountOpError>>>,
    operation_delay: Arc<RwLock<Option<Duration>>>,
    next_id: Arc<AtomicUsize>,
}

impl InMemoryTargetDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the directory with accounts, assigning sequential native ids.
    pub fn with_accounts<I, S>(usernames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut directory = Self::new();
        let accounts: Vec<TargetAccount> = usernames
            .into_iter()
            .map(|username| TargetAccount::new(username, directory.allocate_id()))
            .collect();
        directory.accounts = Arc::new(RwLock::new(accounts));
        directory
    }

    fn allocate_id(&self) -> String {
        (self.next_id.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }

    pub async fn accounts(&self) -> Vec<TargetAccount> {
        self.accounts.read().await.clone()
    }

    /// Usernames currently in the directory, in insertion order.
    pub async fn usernames(&self) -> Vec<String> {
        self.accounts
            .read()
            .await
            .iter()
            .map(|account| account.username.clone())
            .collect()
    }

    /// Every successful creation since construction.
    pub async fn created(&self) -> Vec<CreatedAccount> {
        self.created.read().await.clone()
    }

    pub async fn fail_listing(&self, error: Option<TargetError>) {
        *self.list_failure.write().await = error;
    }

    pub async fn fail_create(&self, username: &str, error: AccountOpError) {
        self.create_failures
            .write()
            .await
            .insert(canonical_username(username), error);
    }

    pub async fn fail_delete(&self, username: &str, error: AccountOpError) {
        self.delete_failures
            .write()
            .await
            .insert(canonical_username(username), error);
    }

    /// Sleep this long inside every create and delete call.
    pub async fn set_operation_delay(&self, delay: Option<Duration>) {
        *self.operation_delay.write().await = delay;
    }

    async fn apply_delay(&self) {
        let delay = *self.operation_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl TargetDirectory for InMemoryTargetDirectory {
    async fn list_accounts(&self) -> TargetResult<Vec<TargetAccount>> {
        if let Some(error) = self.list_failure.read().await.clone() {
            return Err(error);
        }
        Ok(self.accounts.read().await.clone())
    }

    async fn create_account(
        &self,
        user: &UnifiedUser,
        password: &str,
        request_limit: Option<u32>,
    ) -> AccountOpResult<TargetAccount> {
        self.apply_delay().await;

        if let Some(error) = self.create_failures.read().await.get(&user.username) {
            return Err(error.clone());
        }

        let mut accounts = self.accounts.write().await;
        if accounts
            .iter()
            .any(|account| canonical_username(&account.username) == user.username)
        {
            return Err(AccountOpError::AlreadyExists {
                username: user.display_username.clone(),
            });
        }

        let account = TargetAccount::new(user.display_username.clone(), self.allocate_id());
        accounts.push(account.clone());
        self.created.write().await.push(CreatedAccount {
            username: user.display_username.clone(),
            email: user.email.clone(),
            password: password.to_string(),
            request_limit,
        });
        Ok(account)
    }

    async fn delete_account(&self, account: &TargetAccount) -> AccountOpResult<()> {
        self.apply_delay().await;

        let key = canonical_username(&account.username);
        if let Some(error) = self.delete_failures.read().await.get(&key) {
            return Err(error.clone());
        }

        let mut accounts = self.accounts.write().await;
        let before = accounts.len();
        accounts.retain(|existing| existing.native_id != account.native_id);
        if accounts.len() == before {
            return Err(AccountOpError::NotFound {
                username: account.username.clone(),
            });
        }
        Ok(())
    }
}
