//! Fluent builder for a fully wired test harness.
//!
//! Every harness registers an in-memory adapter for each source type and
//! shares handles to the target, policy and provenance stores so tests can
//! seed and inspect them around a pass.

use super::fixtures;
use super::{HookOutcome, RecordingTarget};
use seerr_sync::adapters::{InMemorySource, InMemoryTargetDirectory, TargetDirectory};
use seerr_sync::config::{PasswordBase, ServerConfig, SyncConfig};
use seerr_sync::identity::SourceType;
use seerr_sync::orchestrator::{SyncOrchestrator, SyncOrchestratorBuilder};
use seerr_sync::planner::DeletionSafety;
use seerr_sync::policy::{InMemoryPolicyStore, PolicyOverride};
use seerr_sync::provenance::InMemoryProvenanceStore;
use std::sync::{Arc, Mutex};

pub struct Harness {
    pub plex: InMemorySource,
    pub jellyfin: InMemorySource,
    pub emby: InMemorySource,
    pub target: InMemoryTargetDirectory,
    pub policy: InMemoryPolicyStore,
    pub provenance: InMemoryProvenanceStore,
    pub orchestrator: Arc<SyncOrchestrator>,
    /// Outcomes passed to the completion hook, in call order.
    pub outcomes: Arc<Mutex<Vec<HookOutcome>>>,
    /// Target calls in issue order, when built with `record_operations`.
    pub operations: Arc<Mutex<Vec<String>>>,
}

impl Harness {
    pub fn hook_outcomes(&self) -> Vec<HookOutcome> {
        self.outcomes.lock().unwrap().clone()
    }

    pub fn recorded_operations(&self) -> Vec<String> {
        self.operations.lock().unwrap().clone()
    }

    /// Seed Plex and Jellyfin with the two-server scenario users.
    pub async fn seed_scenario_users(&self) {
        self.plex
            .set_users(fixtures::PLEX_ID, fixtures::PLEX_USERS)
            .await;
        self.jellyfin
            .set_users(fixtures::JELLYFIN_ID, fixtures::JELLYFIN_USERS)
            .await;
    }
}

#[derive(Debug, Clone)]
pub struct HarnessBuilder {
    config: SyncConfig,
    target_accounts: Vec<String>,
    policies: Vec<PolicyOverride>,
    record_operations: bool,
}

impl HarnessBuilder {
    /// Plex and Jellyfin enabled, empty target, removal off.
    pub fn new() -> Self {
        Self {
            config: fixtures::two_server_config(),
            target_accounts: Vec::new(),
            policies: Vec::new(),
            record_operations: false,
        }
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_server(mut self, server: ServerConfig) -> Self {
        self.config.servers.push(server);
        self
    }

    /// Replace a configured server by id.
    pub fn map_server(mut self, id: &str, f: impl FnOnce(ServerConfig) -> ServerConfig) -> Self {
        if let Some(position) = self.config.servers.iter().position(|s| s.id == id) {
            let server = self.config.servers.remove(position);
            self.config.servers.insert(position, f(server));
        }
        self
    }

    pub fn remove_missing(mut self, remove_missing: bool) -> Self {
        self.config.remove_missing = remove_missing;
        self
    }

    pub fn deletion_safety(mut self, deletion_safety: DeletionSafety) -> Self {
        self.config.deletion_safety = deletion_safety;
        self
    }

    pub fn password_base(mut self, password_base: PasswordBase) -> Self {
        self.config.password_base = password_base;
        self
    }

    pub fn default_request_limit(mut self, limit: u32) -> Self {
        self.config.default_request_limit = Some(limit);
        self
    }

    pub fn adapter_timeout_secs(mut self, secs: u64) -> Self {
        self.config.adapter_timeout_secs = Some(secs);
        self
    }

    pub fn max_concurrent_operations(mut self, limit: usize) -> Self {
        self.config.max_concurrent_operations = limit;
        self
    }

    pub fn target_accounts<I, S>(mut self, usernames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_accounts = usernames.into_iter().map(Into::into).collect();
        self
    }

    pub fn policy(mut self, policy: PolicyOverride) -> Self {
        self.policies.push(policy);
        self
    }

    /// Wrap the target so every create and delete is logged in order.
    pub fn record_operations(mut self) -> Self {
        self.record_operations = true;
        self
    }

    pub fn build(self) -> Harness {
        super::init_logging();

        let plex = InMemorySource::new(SourceType::Plex);
        let jellyfin = InMemorySource::new(SourceType::Jellyfin);
        let emby = InMemorySource::new(SourceType::Emby);
        let target = InMemoryTargetDirectory::with_accounts(self.target_accounts);
        let policy = InMemoryPolicyStore::from_overrides(self.policies);
        let provenance = InMemoryProvenanceStore::new();

        let operations = Arc::new(Mutex::new(Vec::new()));
        let target_arc: Arc<dyn TargetDirectory> = if self.record_operations {
            Arc::new(RecordingTarget::new(target.clone(), operations.clone()))
        } else {
            Arc::new(target.clone())
        };

        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let recorded = outcomes.clone();

        let orchestrator = SyncOrchestratorBuilder::new(self.config)
            .with_source(plex.clone())
            .with_source(jellyfin.clone())
            .with_source(emby.clone())
            .with_target_arc(target_arc)
            .with_policy_store(policy.clone())
            .with_provenance_store(provenance.clone())
            .on_complete(move |result| {
                let outcome = match result {
                    Ok(report) => HookOutcome::Completed(report.pass_id),
                    Err(error) => HookOutcome::Failed(error.to_string()),
                };
                recorded.lock().unwrap().push(outcome);
            })
            .build()
            .expect("harness configuration should be valid");

        Harness {
            plex,
            jellyfin,
            emby,
            target,
            policy,
            provenance,
            orchestrator: Arc::new(orchestrator),
            outcomes,
            operations,
        }
    }
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self::new()
    }
}
