//! Multi-source user reconciliation for Overseerr/Jellyseerr.
//!
//! Keeps a request-management instance (the *target directory*) populated
//! with accounts mirroring the users of one or more Plex, Jellyfin or Emby
//! servers. Each pass collects users from every enabled server, merges them
//! by case-insensitive username, diffs the result against the target
//! directory under per-user policy, and applies the resulting creates and
//! deletes.
//!
//! # Core Components
//!
//! - [`identity::merge`] - Folds raw source records into unified users
//! - [`planner::plan`] - Diffs unified users against target accounts
//! - [`SyncOrchestrator`] - Runs passes, on demand or via [`SyncDaemon`]
//! - [`SourceAdapter`] / [`TargetDirectory`] - Traits for the remote systems
//!
//! # Safety Guarantees
//!
//! - A failed source never causes deletions: by default any source failure
//!   empties the deletion set for the whole pass.
//! - Blocked users are never created and immune accounts are never deleted.
//! - Re-running a pass with unchanged inputs issues no operations.
//! - At most one pass runs at a time.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use seerr_sync::{SyncConfig, SyncDaemon, SyncOrchestratorBuilder};
//! use seerr_sync::adapters::{InMemorySource, InMemoryTargetDirectory};
//! use seerr_sync::identity::SourceType;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SyncConfig::from_file("config.json")?;
//! let orchestrator = SyncOrchestratorBuilder::new(config)
//!     .with_source(InMemorySource::new(SourceType::Plex))
//!     .with_target(InMemoryTargetDirectory::new())
//!     .build()?;
//!
//! let orchestrator = Arc::new(orchestrator);
//! let report = orchestrator.run_pass_now().await?;
//! println!("created {} users", report.created_count());
//!
//! if let Some(daemon) = SyncDaemon::from_config(orchestrator.clone())? {
//!     tokio::signal::ctrl_c().await?;
//!     daemon.shutdown().await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod config;
pub mod error;
pub mod identity;
pub mod orchestrator;
pub mod planner;
pub mod policy;
pub mod provenance;

// Re-export commonly used types for convenience
pub use adapters::{SourceAdapter, TargetAccount, TargetDirectory};
pub use config::{PasswordBase, ServerConfig, SyncConfig, TargetConfig};
pub use error::{AccountOpError, ConfigError, SourceError, SyncError, SyncResult, TargetError};
pub use identity::{RawSourceUser, SourceType, UnifiedUser};
pub use orchestrator::{
    PassReport, PassState, SyncDaemon, SyncOrchestrator, SyncOrchestratorBuilder, SyncStatus,
};
pub use planner::{DeletionSafety, SourceFailure, SyncPlan};
pub use policy::{PolicyOverride, PolicyStore};
pub use provenance::ProvenanceStore;
