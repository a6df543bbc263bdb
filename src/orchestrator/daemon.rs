//! Background loop that runs passes on a fixed period.
//!
//! Ticks go through the orchestrator's run guard like any other trigger, so
//! a tick that lands while a pass is running (started by the daemon or by the
//! dashboard) is dropped rather than queued. Shutdown is only observed
//! between passes: a pass that has started applying runs to completion.

use super::core::SyncOrchestrator;
use crate::error::{ConfigError, SyncError, SyncResult};
use log::{debug, error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub struct SyncDaemon;

impl SyncDaemon {
    /// Spawn the loop on the current tokio runtime. The first pass runs
    /// immediately.
    pub fn spawn(orchestrator: Arc<SyncOrchestrator>, period: Duration) -> SyncResult<DaemonHandle> {
        if period.is_zero() {
            return Err(ConfigError::invalid(
                "sync settings",
                "sync_interval_minutes",
                "must be greater than 0",
            )
            .into());
        }

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            info!("Running in daemon mode with {:?} interval", period);
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => run_tick(&orchestrator).await,
                }
            }
            info!("Sync daemon stopped");
        });

        Ok(DaemonHandle { shutdown, task })
    }

    /// Spawn using the orchestrator's configured interval, if it has one.
    pub fn from_config(orchestrator: Arc<SyncOrchestrator>) -> SyncResult<Option<DaemonHandle>> {
        match orchestrator.config().sync_interval() {
            Some(period) => Self::spawn(orchestrator, period).map(Some),
            None => Ok(None),
        }
    }
}

async fn run_tick(orchestrator: &SyncOrchestrator) {
    match orchestrator.run_pass_now().await {
        Ok(_) => {}
        Err(SyncError::PassInProgress) => {
            debug!("Previous sync still running, skipping this tick");
        }
        Err(e) => error!("Scheduled sync failed: {}", e),
    }
}

/// Handle to a running daemon. Dropping it also stops the loop after the
/// current pass.
pub struct DaemonHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl DaemonHandle {
    /// Stop scheduling passes and wait for the loop to exit.
    pub async fn shutdown(self) -> Result<(), tokio::task::JoinError> {
        info!("Shutdown requested, finishing current sync");
        let _ = self.shutdown.send(true);
        self.task.await
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
