//! The sync orchestrator: one pass from fetch to apply.

use super::credentials::AccountDefaults;
use super::report::{AccountFailure, AccountOperation, PassReport, PassState, SyncStatus};
use crate::adapters::{AdapterRegistry, TargetAccount, TargetDirectory};
use crate::config::{ServerConfig, SyncConfig, validate_servers};
use crate::error::{AccountOpError, SourceError, SourceResult, SyncError, SyncResult, TargetError};
use crate::identity::{RawSourceUser, SourceBatch, UnifiedUser, canonical_username, merge};
use crate::planner::{PlanOptions, SourceFailure, SyncPlan, plan_with};
use crate::policy::PolicyStore;
use crate::provenance::ProvenanceStore;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use futures::future::join_all;
use log::{debug, error, info, warn};
use std::collections::{BTreeSet, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Callback invoked after every pass that started, with its outcome.
pub type CompletionHook = Arc<dyn Fn(Result<&PassReport, &SyncError>) + Send + Sync>;

/// Drives reconciliation passes against one target directory.
///
/// At most one pass runs at a time. The guard is shared by
/// [`run_pass_now`](Self::run_pass_now), [`run_pass`](Self::run_pass) and the
/// [`SyncDaemon`](super::SyncDaemon); a trigger that finds it held returns
/// [`SyncError::PassInProgress`] immediately instead of queueing.
pub struct SyncOrchestrator {
    pub(super) config: SyncConfig,
    pub(super) adapters: AdapterRegistry,
    pub(super) target: Arc<dyn TargetDirectory>,
    pub(super) policy: Arc<dyn PolicyStore>,
    pub(super) provenance: Arc<dyn ProvenanceStore>,
    pub(super) on_complete: Option<CompletionHook>,
    pub(super) run_guard: Mutex<()>,
    pub(super) running: AtomicBool,
    pub(super) status: RwLock<SyncStatus>,
}

/// Raised while a pass holds the run guard.
struct RunningFlag<'a>(&'a AtomicBool);

impl<'a> RunningFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for RunningFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct ApplyOutcome {
    created: Vec<TargetAccount>,
    deleted: Vec<TargetAccount>,
    failures: Vec<AccountFailure>,
}

impl SyncOrchestrator {
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Run a pass with the configured servers and removal setting.
    ///
    /// This is the trigger exposed to the dashboard.
    pub async fn run_pass_now(&self) -> SyncResult<PassReport> {
        self.run_pass(&self.config.servers, self.config.remove_missing)
            .await
    }

    /// Run one pass over `servers`.
    ///
    /// Partial failures (a source that could not be read, an account that
    /// could not be created or deleted) are recorded in the returned report.
    /// Only configuration problems, a held run guard, and a failed target
    /// listing produce an error.
    pub async fn run_pass(
        &self,
        servers: &[ServerConfig],
        remove_missing: bool,
    ) -> SyncResult<PassReport> {
        let Ok(_guard) = self.run_guard.try_lock() else {
            debug!("Sync pass already in progress, dropping trigger");
            self.status.write().await.passes_skipped += 1;
            return Err(SyncError::PassInProgress);
        };
        // Declared after the guard so it is cleared before the guard is released.
        let _running = RunningFlag::raise(&self.running);

        if let Err(e) = self.check_servers(servers) {
            warn!("Sync pass not started: {}", e);
            self.status.write().await.last_error = Some(e.to_string());
            return Err(e);
        }

        let pass_id = Uuid::new_v4();
        let started_at = Utc::now();
        {
            let mut status = self.status.write().await;
            status.current_pass = Some(pass_id);
            status.last_started_at = Some(started_at);
        }
        info!("Starting sync pass {} (remove_missing={})", pass_id, remove_missing);

        let result = self
            .execute_pass(pass_id, started_at, servers, remove_missing)
            .await;

        {
            let mut status = self.status.write().await;
            status.current_pass = None;
            status.last_finished_at = Some(Utc::now());
            match &result {
                Ok(report) => {
                    status.state = PassState::Done;
                    status.passes_completed += 1;
                    status.last_error = None;
                    status.last_report = Some(report.clone());
                }
                Err(e) => {
                    status.state = PassState::Failed;
                    status.passes_failed += 1;
                    status.last_error = Some(e.to_string());
                }
            }
        }

        match &result {
            Ok(report) => info!(
                "Sync pass {} done: {} created, {} deleted, {} skipped, {} account failure(s), {} source failure(s)",
                pass_id,
                report.created_count(),
                report.deleted_count(),
                report.skipped_count(),
                report.account_failures.len(),
                report.source_failures.len()
            ),
            Err(e) => error!("Sync pass {} failed: {}", pass_id, e),
        }

        if let Some(hook) = &self.on_complete {
            hook(result.as_ref());
        }
        result
    }

    /// Current state and the outcome of the last pass.
    pub async fn status(&self) -> SyncStatus {
        let mut status = self.status.read().await.clone();
        status.running = self.is_running();
        status
    }

    /// Whether a pass holds the run guard. Never contends with triggers.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn check_servers(&self, servers: &[ServerConfig]) -> SyncResult<()> {
        validate_servers(servers)?;
        for server in servers.iter().filter(|server| server.enabled) {
            if !self.adapters.contains(server.source_type) {
                return Err(SyncError::missing_adapter(&server.id, server.source_type));
            }
        }
        Ok(())
    }

    async fn set_state(&self, state: PassState) {
        debug!("Sync pass entering {}", state);
        self.status.write().await.state = state;
    }

    async fn execute_pass(
        &self,
        pass_id: Uuid,
        started_at: chrono::DateTime<Utc>,
        servers: &[ServerConfig],
        remove_missing: bool,
    ) -> SyncResult<PassReport> {
        let enabled: Vec<&ServerConfig> = servers.iter().filter(|server| server.enabled).collect();

        self.set_state(PassState::FetchingSources).await;
        let sources = async {
            let fetched = self.fetch_sources(&enabled).await;
            self.set_state(PassState::FetchingTarget).await;
            fetched
        };
        let ((batches, source_failures), target_accounts) =
            tokio::join!(sources, self.fetch_target());
        let target_accounts = target_accounts?;

        self.set_state(PassState::Merging).await;
        let unified = merge(&batches);
        info!(
            "Found {} unique users across {} reporting server(s)",
            unified.len(),
            batches.len()
        );

        self.set_state(PassState::Planning).await;
        let options = PlanOptions::new(remove_missing)
            .with_deletion_safety(self.config.deletion_safety);
        let plan = plan_with(
            &unified,
            &target_accounts,
            self.policy.as_ref(),
            &source_failures,
            options,
            Some(self.provenance.as_ref()),
        );
        self.record_provenance(&unified, &source_failures);

        self.set_state(PassState::Applying).await;
        let outcome = self.apply(&plan, servers).await;
        self.prune_provenance(&unified, &target_accounts, &outcome);

        Ok(PassReport {
            pass_id,
            started_at,
            finished_at: Utc::now(),
            remove_missing,
            sources_polled: enabled.len(),
            source_failures,
            unified_users: unified.len(),
            target_accounts: target_accounts.len(),
            plan,
            created: outcome.created,
            deleted: outcome.deleted,
            account_failures: outcome.failures,
        })
    }

    /// Fetch every enabled server concurrently. Results keep server order.
    async fn fetch_sources(
        &self,
        servers: &[&ServerConfig],
    ) -> (Vec<SourceBatch>, Vec<SourceFailure>) {
        let results = join_all(servers.iter().map(|server| self.fetch_source(server))).await;

        let mut batches = Vec::new();
        let mut failures = Vec::new();
        for (server, result) in servers.iter().zip(results) {
            match result {
                Ok(users) => {
                    info!(
                        "Found {} users on {} ({})",
                        users.len(),
                        server.id,
                        server.source_type
                    );
                    batches.push(SourceBatch::new(server.id.clone(), users));
                }
                Err(e) => {
                    warn!(
                        "Could not read users from {} ({}): {}",
                        server.id, server.source_type, e
                    );
                    failures.push(SourceFailure::new(server.id.clone(), e));
                }
            }
        }

        if !failures.is_empty() {
            warn!(
                "{} of {} enabled server(s) unavailable; their users are protected from removal",
                failures.len(),
                servers.len()
            );
        }
        (batches, failures)
    }

    async fn fetch_source(&self, server: &ServerConfig) -> SourceResult<Vec<RawSourceUser>> {
        let adapter = self.adapters.get(server.source_type).ok_or_else(|| {
            SourceError::other(format!(
                "no adapter registered for {}",
                server.source_type
            ))
        })?;

        // Health check and listing share one deadline.
        let fetch = async {
            adapter.check_health(server).await?;
            adapter.list_users(server).await
        };
        self.bounded(fetch, |after| SourceError::Timeout { after })
            .await
    }

    async fn fetch_target(&self) -> SyncResult<Vec<TargetAccount>> {
        let accounts = self
            .bounded(self.target.list_accounts(), |after| TargetError::Timeout {
                after,
            })
            .await?;
        info!("Found {} existing accounts in the target directory", accounts.len());
        Ok(accounts)
    }

    /// Remember where each unified user was seen. Servers that failed this
    /// pass keep whatever was recorded for them before.
    fn record_provenance(&self, unified: &[UnifiedUser], failures: &[SourceFailure]) {
        for user in unified {
            let mut servers: BTreeSet<String> = user.source_servers.iter().cloned().collect();
            if !failures.is_empty() {
                if let Some(known) = self.provenance.known_servers(&user.username) {
                    servers.extend(known.into_iter().filter(|server| {
                        failures.iter().any(|failure| &failure.server_id == server)
                    }));
                }
            }
            self.provenance.record(&user.username, servers);
        }
    }

    /// Drop provenance for usernames that are neither reported this pass nor
    /// present in the target directory after apply.
    fn prune_provenance(
        &self,
        unified: &[UnifiedUser],
        target_accounts: &[TargetAccount],
        outcome: &ApplyOutcome,
    ) {
        let deleted: HashSet<&str> = outcome
            .deleted
            .iter()
            .map(|account| account.native_id.as_str())
            .collect();
        let mut live: HashSet<String> = unified.iter().map(|user| user.username.clone()).collect();
        live.extend(
            target_accounts
                .iter()
                .filter(|account| !deleted.contains(account.native_id.as_str()))
                .chain(&outcome.created)
                .map(|account| canonical_username(&account.username)),
        );

        let mut pruned = 0;
        for username in self.provenance.known_usernames() {
            if !live.contains(&username) {
                self.provenance.forget(&username);
                pruned += 1;
            }
        }
        if pruned > 0 {
            debug!("Dropped provenance for {} username(s) no longer seen", pruned);
        }
    }

    /// Issue creates, then deletes. Every call is independent.
    async fn apply(&self, plan: &SyncPlan, servers: &[ServerConfig]) -> ApplyOutcome {
        let limit = self.config.max_concurrent_operations.max(1);
        let defaults = AccountDefaults::new(
            servers,
            &self.config.password_base,
            self.config.default_request_limit,
        );

        let created: Vec<(UnifiedUser, Result<TargetAccount, AccountOpError>)> =
            stream::iter(plan.to_create.clone())
                .map(|user| async move {
                    let result = self.create_account(&user, &defaults).await;
                    (user, result)
                })
                .buffered(limit)
                .collect()
                .await;

        let deleted: Vec<(TargetAccount, Result<(), AccountOpError>)> =
            stream::iter(plan.to_delete.clone())
                .map(|account| async move {
                    let result = self.delete_account(&account).await;
                    (account, result)
                })
                .buffered(limit)
                .collect()
                .await;

        let mut outcome = ApplyOutcome {
            created: Vec::new(),
            deleted: Vec::new(),
            failures: Vec::new(),
        };
        for (user, result) in created {
            match result {
                Ok(account) => outcome.created.push(account),
                Err(error) => outcome.failures.push(AccountFailure {
                    username: user.username,
                    operation: AccountOperation::Create,
                    error,
                }),
            }
        }
        for (account, result) in deleted {
            match result {
                Ok(()) => outcome.deleted.push(account),
                Err(error) => outcome.failures.push(AccountFailure {
                    username: canonical_username(&account.username),
                    operation: AccountOperation::Delete,
                    error,
                }),
            }
        }
        outcome
    }

    async fn create_account(
        &self,
        user: &UnifiedUser,
        defaults: &AccountDefaults<'_>,
    ) -> Result<TargetAccount, AccountOpError> {
        let policy = self.policy.get(&user.username);
        let password = defaults.password_for(user, &policy);
        let request_limit = defaults.request_limit_for(user, &policy);

        info!(
            "Creating user {} (from {})",
            user.display_username,
            user.source_servers.join(", ")
        );
        let result = self
            .bounded(
                self.target.create_account(user, &password, request_limit),
                |after| AccountOpError::Timeout { after },
            )
            .await;
        match &result {
            Ok(account) => debug!(
                "Created {} as {} (request limit {:?})",
                user.display_username, account.native_id, request_limit
            ),
            Err(e) => error!("Failed to create user {}: {}", user.display_username, e),
        }
        result
    }

    async fn delete_account(&self, account: &TargetAccount) -> Result<(), AccountOpError> {
        info!(
            "Removing user {} (ID: {}) - not found in any enabled media server",
            account.username, account.native_id
        );
        let result = self
            .bounded(self.target.delete_account(account), |after| {
                AccountOpError::Timeout { after }
            })
            .await;
        if let Err(e) = &result {
            error!("Failed to delete user {}: {}", account.username, e);
        }
        result
    }

    /// Apply the configured adapter timeout to `call`.
    async fn bounded<T, E, F>(&self, call: F, on_timeout: impl FnOnce(Duration) -> E) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        match self.config.adapter_timeout() {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => Err(on_timeout(limit)),
            },
            None => call.await,
        }
    }
}

impl std::fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("servers", &self.config.servers.len())
            .field("adapters", &self.adapters)
            .field("running", &self.is_running())
            .finish()
    }
}
