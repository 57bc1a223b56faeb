//! Strategy composer
//!
//! Owns the collaborators, the configuration and the staging store, and
//! hands out the workflow components bound to them.

use crate::attachments::AttachmentPipeline;
use crate::config::ComposerConfig;
use crate::draft::{DraftManager, DraftSession};
use crate::error::ComposerResult;
use crate::finalize::{FinalizeOrchestrator, FinalizeReport};
use crate::reconcile::ReconciliationReader;
use crate::select::CopyOnSelect;
use draftline_core::{
    BlobStorage, ChildFields, ChildKind, IdentityProvider, PersistenceGateway, StagedChild,
    StrategyFields,
};
use draftline_staging::{
    DurableLocalStore, SelectedOperationalGoals, SelectedStrategicGoals, StagedPillars,
    StagedValues, StagingStore,
};
use std::sync::Arc;

/// Entry point for the draft workflow
#[derive(Clone)]
pub struct StrategyComposer {
    config: Arc<ComposerConfig>,
    gateway: Arc<dyn PersistenceGateway>,
    identity: Arc<dyn IdentityProvider>,
    staging: StagingStore,
    attachments: AttachmentPipeline,
}

impl std::fmt::Debug for StrategyComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyComposer")
            .field("config", &self.config)
            .field("staging", &self.staging)
            .finish_non_exhaustive()
    }
}

impl StrategyComposer {
    /// Create composer
    #[must_use]
    pub fn new(
        config: ComposerConfig,
        gateway: Arc<dyn PersistenceGateway>,
        storage: Arc<dyn BlobStorage>,
        identity: Arc<dyn IdentityProvider>,
        local_store: Arc<dyn DurableLocalStore>,
    ) -> Self {
        let config = Arc::new(config);
        let staging = StagingStore::new(local_store);
        let attachments =
            AttachmentPipeline::new(gateway.clone(), storage, staging.clone(), config.clone());
        Self {
            config,
            gateway,
            identity,
            staging,
            attachments,
        }
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Staging store shared by every component
    #[inline]
    #[must_use]
    pub fn staging(&self) -> &StagingStore {
        &self.staging
    }

    /// Draft manager
    #[must_use]
    pub fn drafts(&self) -> DraftManager {
        DraftManager::new(
            self.gateway.clone(),
            self.identity.clone(),
            self.staging.clone(),
            self.config.clone(),
        )
    }

    /// Attachment pipeline
    ///
    /// Clones share one path stamp sequence.
    #[must_use]
    pub fn attachments(&self) -> AttachmentPipeline {
        self.attachments.clone()
    }

    /// Finalize orchestrator
    #[must_use]
    pub fn finalizer(&self) -> FinalizeOrchestrator {
        FinalizeOrchestrator::new(
            self.gateway.clone(),
            self.identity.clone(),
            self.staging.clone(),
            self.attachments(),
        )
    }

    /// Edit-mode reader
    #[must_use]
    pub fn reconciler(&self) -> ReconciliationReader {
        ReconciliationReader::new(self.gateway.clone(), self.staging.clone())
    }

    /// Copy-on-select
    #[must_use]
    pub fn selector(&self) -> CopyOnSelect {
        CopyOnSelect::new(self.gateway.clone(), self.identity.clone(), self.staging.clone())
    }

    /// Stage a freshly authored child
    ///
    /// Values and pillars go to their authored namespaces; goals share the
    /// goal selection namespaces.
    pub fn stage_child(&self, fields: ChildFields) -> ComposerResult<StagedChild> {
        let item = StagedChild::authored(fields);
        match item.kind() {
            ChildKind::Value => self.staging.append::<StagedValues>(item.clone())?,
            ChildKind::Pillar => self.staging.append::<StagedPillars>(item.clone())?,
            ChildKind::StrategicGoal => self.staging.append::<SelectedStrategicGoals>(item.clone())?,
            ChildKind::OperationalGoal => self.staging.append::<SelectedOperationalGoals>(item.clone())?,
        }
        tracing::debug!(kind = %item.kind(), staged_id = %item.id, "child staged");
        Ok(item)
    }

    /// Finalize `session` with `fields`
    pub async fn finalize(&self, session: &DraftSession, fields: StrategyFields) -> ComposerResult<FinalizeReport> {
        self.finalizer().finalize(session, fields).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftline_staging::MemoryLocalStore;
    use draftline_test_utils::{
        operational_goal, pillar, strategic_goal, value, InMemoryBlobStorage, InMemoryGateway,
        StaticIdentity,
    };

    fn composer() -> StrategyComposer {
        StrategyComposer::new(
            ComposerConfig::default(),
            Arc::new(InMemoryGateway::new()),
            Arc::new(InMemoryBlobStorage::new()),
            Arc::new(StaticIdentity::signed_in("u1")),
            Arc::new(MemoryLocalStore::new()),
        )
    }

    #[test]
    fn stage_child_routes_by_kind() {
        let composer = composer();
        composer.stage_child(value("v")).unwrap();
        composer.stage_child(pillar("p")).unwrap();
        composer.stage_child(strategic_goal("s")).unwrap();
        composer.stage_child(operational_goal("o")).unwrap();

        let staging = composer.staging();
        assert_eq!(staging.len::<StagedValues>().unwrap(), 1);
        assert_eq!(staging.len::<StagedPillars>().unwrap(), 1);
        assert_eq!(staging.len::<SelectedStrategicGoals>().unwrap(), 1);
        assert_eq!(staging.len::<SelectedOperationalGoals>().unwrap(), 1);
    }

    #[test]
    fn components_share_staging() {
        let composer = composer();
        let staged = composer.stage_child(value("v")).unwrap();
        let pending = composer.reconciler().pending(ChildKind::Value).unwrap();
        assert_eq!(pending, vec![staged]);
    }
}
