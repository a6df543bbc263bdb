//! Diffing unified users against the target directory.
//!
//! The planner is a pure function of its inputs. It decides, for every
//! unified user and every target account, which single bucket of the
//! [`SyncPlan`] it belongs to:
//!
//! | Input                              | Condition                              | Bucket                 |
//! |------------------------------------|----------------------------------------|------------------------|
//! | unified user                       | policy `blocked`                       | `skipped_blocked`      |
//! | unified user                       | account exists                         | `unchanged`            |
//! | unified user                       | otherwise                              | `to_create`            |
//! | target account missing from sources| `remove_missing` off                   | `retained_missing`     |
//! | target account missing from sources| policy `immune`                        | `skipped_immune`       |
//! | target account missing from sources| deletion unsafe this pass              | `retained_unconfirmed` |
//! | target account missing from sources| otherwise                              | `to_delete`            |
//!
//! Usernames on both sides are compared through
//! [`canonical_username`](crate::identity::canonical_username).
//!
//! Deletion safety is decided by [`DeletionSafety`]. With `WholePass` (the
//! default) any source failure empties `to_delete` for the pass, so a single
//! unreachable server can never cause mass deletion.

use crate::adapters::TargetAccount;
use crate::identity::{UnifiedUser, canonical_username};
use crate::error::SourceError;
use crate::policy::PolicyStore;
use crate::provenance::ProvenanceStore;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A source that did not report this pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub server_id: String,
    pub error: SourceError,
}

impl SourceFailure {
    pub fn new(server_id: impl Into<String>, error: SourceError) -> Self {
        Self {
            server_id: server_id.into(),
            error,
        }
    }
}

/// How to treat deletion candidates when some source failed this pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionSafety {
    /// Any source failure suppresses every deletion for the pass.
    #[default]
    WholePass,
    /// Only accounts whose last known provenance touches a failed server,
    /// or whose provenance is unknown, are retained.
    SkipUnconfirmed,
}

/// Options for one planning run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanOptions {
    pub remove_missing: bool,
    pub deletion_safety: DeletionSafety,
}

impl PlanOptions {
    pub fn new(remove_missing: bool) -> Self {
        Self {
            remove_missing,
            deletion_safety: DeletionSafety::WholePass,
        }
    }

    pub fn with_deletion_safety(mut self, deletion_safety: DeletionSafety) -> Self {
        self.deletion_safety = deletion_safety;
        self
    }
}

/// Operations for one pass. Derived, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncPlan {
    pub to_create: Vec<UnifiedUser>,
    pub to_delete: Vec<TargetAccount>,
    pub skipped_blocked: Vec<String>,
    pub skipped_immune: Vec<String>,
    pub unchanged: Vec<String>,
    /// Deletion candidates held back because a source failed.
    pub retained_unconfirmed: Vec<String>,
    /// Accounts missing from every source while removal is disabled.
    pub retained_missing: Vec<String>,
}

impl SyncPlan {
    /// True when the plan issues no create or delete call.
    pub fn is_noop(&self) -> bool {
        self.to_create.is_empty() && self.to_delete.is_empty()
    }
}

/// Plan a pass with the whole-pass deletion gate.
pub fn plan<P>(
    unified: &[UnifiedUser],
    target_accounts: &[TargetAccount],
    policy: &P,
    source_failures: &[SourceFailure],
    remove_missing: bool,
) -> SyncPlan
where
    P: PolicyStore + ?Sized,
{
    plan_with(
        unified,
        target_accounts,
        policy,
        source_failures,
        PlanOptions::new(remove_missing),
        None,
    )
}

/// Plan a pass with explicit options.
///
/// `provenance` is only consulted under [`DeletionSafety::SkipUnconfirmed`];
/// without a store every deletion candidate counts as unconfirmed while a
/// source is failing.
pub fn plan_with<P>(
    unified: &[UnifiedUser],
    target_accounts: &[TargetAccount],
    policy: &P,
    source_failures: &[SourceFailure],
    options: PlanOptions,
    provenance: Option<&dyn ProvenanceStore>,
) -> SyncPlan
where
    P: PolicyStore + ?Sized,
{
    let mut plan = SyncPlan::default();

    let existing: HashSet<String> = target_accounts
        .iter()
        .map(|account| canonical_username(&account.username))
        .filter(|username| !username.is_empty())
        .collect();

    for user in unified {
        let user_policy = policy.get(&user.username);
        if user_policy.blocked {
            debug!("User {} is blocked, skipping", user.display_username);
            plan.skipped_blocked.push(user.username.clone());
        } else if existing.contains(&user.username) {
            plan.unchanged.push(user.username.clone());
        } else {
            plan.to_create.push(user.clone());
        }
    }

    let reported: HashSet<&str> = unified.iter().map(|user| user.username.as_str()).collect();
    let failed_servers: HashSet<&str> = source_failures
        .iter()
        .map(|failure| failure.server_id.as_str())
        .collect();

    if options.remove_missing && !failed_servers.is_empty() {
        warn!(
            "{} source(s) failed this pass; applying {:?} deletion safety",
            failed_servers.len(),
            options.deletion_safety
        );
    }

    for account in target_accounts {
        let username = canonical_username(&account.username);
        if username.is_empty() {
            warn!("Ignoring target account {} with blank username", account.native_id);
            continue;
        }
        if reported.contains(username.as_str()) {
            continue;
        }

        if !options.remove_missing {
            plan.retained_missing.push(username);
            continue;
        }

        if policy.get(&username).immune {
            debug!("Account {} is immune from deletion, retaining", account.username);
            plan.skipped_immune.push(username);
            continue;
        }

        if !deletion_is_safe(&username, &failed_servers, options.deletion_safety, provenance) {
            debug!(
                "Retaining {}: provenance cannot be reconfirmed while sources are failing",
                account.username
            );
            plan.retained_unconfirmed.push(username);
            continue;
        }

        plan.to_delete.push(account.clone());
    }

    info!(
        "Planned {} create(s), {} delete(s); {} unchanged, {} blocked, {} immune, {} retained",
        plan.to_create.len(),
        plan.to_delete.len(),
        plan.unchanged.len(),
        plan.skipped_blocked.len(),
        plan.skipped_immune.len(),
        plan.retained_unconfirmed.len() + plan.retained_missing.len()
    );
    plan
}

fn deletion_is_safe(
    username: &str,
    failed_servers: &HashSet<&str>,
    safety: DeletionSafety,
    provenance: Option<&dyn ProvenanceStore>,
) -> bool {
    if failed_servers.is_empty() {
        return true;
    }

    match safety {
        DeletionSafety::WholePass => false,
        DeletionSafety::SkipUnconfirmed => {
            let Some(known) = provenance.and_then(|store| store.known_servers(username)) else {
                return false;
            };
            !known
                .iter()
                .any(|server| failed_servers.contains(server.as_str()))
        }
    }
}
