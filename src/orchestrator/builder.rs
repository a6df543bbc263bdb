//! Builder for wiring an orchestrator to its collaborators.

use super::core::{CompletionHook, SyncOrchestrator};
use super::report::{PassReport, SyncStatus};
use crate::adapters::{AdapterRegistry, SourceAdapter, TargetDirectory};
use crate::config::SyncConfig;
use crate::error::{ConfigError, SyncError, SyncResult};
use crate::policy::{InMemoryPolicyStore, PolicyStore};
use crate::provenance::{InMemoryProvenanceStore, ProvenanceStore};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio::sync::{Mutex, RwLock};

/// Fluent setup for a [`SyncOrchestrator`].
///
/// A target directory is required. Policy and provenance default to empty
/// in-memory stores. `build` validates the configuration and checks that
/// every enabled server has an adapter for its type.
///
/// # Examples
///
/// ```rust
/// use seerr_sync::adapters::{InMemorySource, InMemoryTargetDirectory};
/// use seerr_sync::config::{ServerConfig, SyncConfig, TargetConfig};
/// use seerr_sync::identity::SourceType;
/// use seerr_sync::orchestrator::SyncOrchestratorBuilder;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = SyncConfig::new(TargetConfig::new("http://localhost:5055", "key"))
///     .with_server(ServerConfig::new("plex", SourceType::Plex, "http://plex:32400", "token"));
///
/// let source = InMemorySource::new(SourceType::Plex);
/// source.set_users("plex", ["alice"]).await;
///
/// let orchestrator = SyncOrchestratorBuilder::new(config)
///     .with_source(source)
///     .with_target(InMemoryTargetDirectory::new())
///     .build()?;
///
/// let report = orchestrator.run_pass_now().await?;
/// assert_eq!(report.created_count(), 1);
/// # Ok(())
/// # }
/// ```
pub struct SyncOrchestratorBuilder {
    config: SyncConfig,
    adapters: AdapterRegistry,
    target: Option<Arc<dyn TargetDirectory>>,
    policy: Option<Arc<dyn PolicyStore>>,
    provenance: Option<Arc<dyn ProvenanceStore>>,
    on_complete: Option<CompletionHook>,
}

impl SyncOrchestratorBuilder {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            adapters: AdapterRegistry::new(),
            target: None,
            policy: None,
            provenance: None,
            on_complete: None,
        }
    }

    pub fn with_source(mut self, adapter: impl SourceAdapter + 'static) -> Self {
        self.adapters.register(Arc::new(adapter));
        self
    }

    pub fn with_source_arc(mut self, adapter: Arc<dyn SourceAdapter>) -> Self {
        self.adapters.register(adapter);
        self
    }

    pub fn with_adapters(mut self, adapters: AdapterRegistry) -> Self {
        self.adapters = adapters;
        self
    }

    pub fn with_target(mut self, target: impl TargetDirectory + 'static) -> Self {
        self.target = Some(Arc::new(target));
        self
    }

    pub fn with_target_arc(mut self, target: Arc<dyn TargetDirectory>) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_policy_store(mut self, policy: impl PolicyStore + 'static) -> Self {
        self.policy = Some(Arc::new(policy));
        self
    }

    pub fn with_provenance_store(mut self, provenance: impl ProvenanceStore + 'static) -> Self {
        self.provenance = Some(Arc::new(provenance));
        self
    }

    /// Call `hook` after every pass that started.
    pub fn on_complete<F>(mut self, hook: F) -> Self
    where
        F: Fn(Result<&PassReport, &SyncError>) + Send + Sync + 'static,
    {
        self.on_complete = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> SyncResult<SyncOrchestrator> {
        self.config.validate()?;

        let target = self
            .target
            .ok_or_else(|| ConfigError::missing("orchestrator", "target directory adapter"))?;

        for server in self.config.enabled_servers() {
            if !self.adapters.contains(server.source_type) {
                return Err(SyncError::missing_adapter(&server.id, server.source_type));
            }
        }

        Ok(SyncOrchestrator {
            config: self.config,
            adapters: self.adapters,
            target,
            policy: self
                .policy
                .unwrap_or_else(|| Arc::new(InMemoryPolicyStore::new())),
            provenance: self
                .provenance
                .unwrap_or_else(|| Arc::new(InMemoryProvenanceStore::new())),
            on_complete: self.on_complete,
            run_guard: Mutex::new(()),
            running: AtomicBool::new(false),
            status: RwLock::new(SyncStatus::default()),
        })
    }
}
