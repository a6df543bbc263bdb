//! Pass orchestration.
//!
//! A pass fetches users from every enabled source concurrently, lists the
//! target directory, merges, plans, and applies the plan:
//!
//! ```text
//! FetchingSources ─┬─> FetchingTarget ─> Merging ─> Planning ─> Applying ─> Done
//!                  └─ target listing fails ─────────────────────────────> Failed
//! ```
//!
//! Each source fetch is isolated: an error or timeout from one server becomes
//! a [`SourceFailure`](crate::planner::SourceFailure) and the pass continues.
//! Creates are issued before deletes; a failed account call is recorded in the
//! [`PassReport`] and the rest of the plan still runs.
//!
//! # Modules
//!
//! - [`builder`] - wiring adapters and stores into an orchestrator
//! - [`core`] - the orchestrator and a single pass
//! - [`credentials`] - passwords and request limits for new accounts
//! - [`daemon`] - periodic passes
//! - [`report`] - pass summaries and status

pub mod builder;
pub mod core;
pub mod credentials;
pub mod daemon;
pub mod report;

pub use builder::SyncOrchestratorBuilder;
pub use core::{CompletionHook, SyncOrchestrator};
pub use credentials::{AccountDefaults, compose_password};
pub use daemon::{DaemonHandle, SyncDaemon};
pub use report::{AccountFailure, AccountOperation, PassReport, PassState, SyncStatus};
