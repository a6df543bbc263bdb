//! Pass summaries and orchestrator status.

use crate::adapters::TargetAccount;
use crate::error::AccountOpError;
use crate::planner::{SourceFailure, SyncPlan};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Stage of the pass currently executing.
///
/// A pass moves `FetchingSources → FetchingTarget → Merging → Planning →
/// Applying → Done`. `Failed` is only entered when the target directory
/// cannot be listed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassState {
    /// No pass has started yet.
    #[default]
    Idle,
    FetchingSources,
    FetchingTarget,
    Merging,
    Planning,
    Applying,
    Done,
    Failed,
}

impl PassState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PassState::Idle | PassState::Done | PassState::Failed)
    }
}

impl fmt::Display for PassState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PassState::Idle => "idle",
            PassState::FetchingSources => "fetching_sources",
            PassState::FetchingTarget => "fetching_target",
            PassState::Merging => "merging",
            PassState::Planning => "planning",
            PassState::Applying => "applying",
            PassState::Done => "done",
            PassState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountOperation {
    Create,
    Delete,
}

/// A create or delete call that failed during apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountFailure {
    /// Canonical username, for both creates and deletes.
    pub username: String,
    pub operation: AccountOperation,
    pub error: AccountOpError,
}

/// Summary of one completed pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub pass_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub remove_missing: bool,
    /// Enabled sources the pass tried to reach.
    pub sources_polled: usize,
    pub source_failures: Vec<SourceFailure>,
    pub unified_users: usize,
    pub target_accounts: usize,
    pub plan: SyncPlan,
    /// Accounts created this pass, as the target directory returned them.
    pub created: Vec<TargetAccount>,
    /// Accounts deleted.
    pub deleted: Vec<TargetAccount>,
    pub account_failures: Vec<AccountFailure>,
}

impl PassReport {
    pub fn created_count(&self) -> usize {
        self.created.len()
    }

    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }

    pub fn skipped_blocked_count(&self) -> usize {
        self.plan.skipped_blocked.len()
    }

    pub fn skipped_immune_count(&self) -> usize {
        self.plan.skipped_immune.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped_blocked_count() + self.skipped_immune_count()
    }

    /// True when every source reported and every account call succeeded.
    pub fn is_clean(&self) -> bool {
        self.source_failures.is_empty() && self.account_failures.is_empty()
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Snapshot of the orchestrator for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub state: PassState,
    pub running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_pass: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_report: Option<PassReport>,
    /// Message of the last fatal error, cleared by the next successful pass.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_finished_at: Option<DateTime<Utc>>,
    pub passes_completed: u64,
    pub passes_failed: u64,
    /// Triggers dropped because a pass was already running.
    pub passes_skipped: u64,
}
