//! Finalize orchestration
//!
//! Commits the parent record, flushes every staged child namespace with
//! per-item failure isolation, applies queued deletions and clears staging.
//! Only the parent update is blocking; everything after it is best effort
//! and reported item by item.

use crate::attachments::AttachmentPipeline;
use crate::draft::DraftSession;
use crate::error::{ComposerError, ComposerResult, FinalizeStage};
use draftline_core::{
    DeletionMarker, IdentityProvider, PersistenceGateway, RecordId, StagedChild, Strategy,
    StrategyFields, StrategyId, StrategyPatch,
};
use draftline_staging::{
    ChildNamespace, DeletionMarkers, Namespace, SelectedOperationalGoals, SelectedPillars,
    SelectedStrategicGoals, SelectedValues, StagedPillars, StagedValues, StagingStore,
};
use serde::Serialize;
use std::sync::Arc;

/// What finalize attempted for one staged entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FlushAction {
    /// Create a staged child under the parent
    Create {
        /// Namespace the item was staged in
        namespace: &'static str,
        /// The staged item
        item: StagedChild,
    },
    /// Delete a committed record
    Delete {
        /// The deletion marker
        marker: DeletionMarker,
    },
}

/// Result of one attempted entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// Child created with this id
    Created {
        /// Server-assigned id
        record_id: RecordId,
    },
    /// Record deleted
    Deleted,
    /// Attempt failed; siblings were still attempted
    Failed {
        /// Error message
        error: String,
        /// Whether a retry could succeed
        retryable: bool,
    },
}

impl ItemOutcome {
    fn failed(err: &ComposerError) -> Self {
        Self::Failed {
            error: err.to_string(),
            retryable: err.is_retryable(),
        }
    }

    /// Whether the attempt failed
    #[inline]
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// One attempted entry and its outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChildResult {
    /// What was attempted
    pub action: FlushAction,
    /// How it went
    pub outcome: ItemOutcome,
}

/// Structured finalize result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalizeReport {
    /// Parent record after the update
    pub strategy: Strategy,
    /// Every attempted child creation and deletion, in order
    pub child_results: Vec<ChildResult>,
    /// Whether staging (and, for new strategies, the draft key) was cleared
    pub staging_cleared: bool,
}

impl FinalizeReport {
    /// Whether the parent is committed
    #[inline]
    #[must_use]
    pub fn parent_committed(&self) -> bool {
        !self.strategy.is_draft
    }

    /// Failed entries
    pub fn failures(&self) -> impl Iterator<Item = &ChildResult> {
        self.child_results.iter().filter(|r| r.outcome.is_failure())
    }

    /// Number of children created
    #[must_use]
    pub fn created_count(&self) -> usize {
        self.child_results
            .iter()
            .filter(|r| matches!(r.outcome, ItemOutcome::Created { .. }))
            .count()
    }

    /// Everything attempted succeeded and staging was cleared
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.staging_cleared && self.failures().next().is_none()
    }
}

/// Commits a composite assembled in staging
#[derive(Clone)]
pub struct FinalizeOrchestrator {
    gateway: Arc<dyn PersistenceGateway>,
    identity: Arc<dyn IdentityProvider>,
    staging: StagingStore,
    attachments: AttachmentPipeline,
}

impl std::fmt::Debug for FinalizeOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinalizeOrchestrator")
            .field("staging", &self.staging)
            .finish_non_exhaustive()
    }
}

impl FinalizeOrchestrator {
    /// Create orchestrator
    #[must_use]
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        identity: Arc<dyn IdentityProvider>,
        staging: StagingStore,
        attachments: AttachmentPipeline,
    ) -> Self {
        Self {
            gateway,
            identity,
            staging,
            attachments,
        }
    }

    /// Commit `fields` to the session's parent and flush staging
    ///
    /// # Workflow
    /// 1. Update the parent (`is_draft = false` for new strategies). Failure
    ///    aborts with [`ComposerError::Fatal`] and leaves staging untouched.
    /// 2. Create every staged child, one call at a time; failures are
    ///    recorded and the loop continues
    /// 3. Apply queued deletions with the same isolation
    /// 4. Clear staging, and the draft key for new strategies
    ///
    /// Each attempted item leaves staging right after its attempt, so an
    /// interrupted run never re-creates a child on the next call.
    pub async fn finalize(
        &self,
        session: &DraftSession,
        fields: StrategyFields,
    ) -> ComposerResult<FinalizeReport> {
        let owner = self.identity.current_user().await?;
        validate_fields(&fields)?;
        let parent = session.strategy_id;

        tracing::info!(strategy_id = %parent, owner = %owner, mode = ?session.mode, "finalizing strategy");

        let patch = if session.is_new_strategy() {
            StrategyPatch::commit(fields)
        } else {
            StrategyPatch::fields_only(fields)
        };
        let strategy = self.gateway.update_strategy(parent, patch).await.map_err(|e| {
            tracing::error!(strategy_id = %parent, error = %e, "parent update failed; staging kept for retry");
            ComposerError::fatal(FinalizeStage::ParentUpdate, e)
        })?;

        let mut child_results = Vec::new();
        self.flush::<StagedValues>(parent, &mut child_results).await;
        self.flush::<StagedPillars>(parent, &mut child_results).await;
        self.flush::<SelectedStrategicGoals>(parent, &mut child_results).await;
        self.flush::<SelectedOperationalGoals>(parent, &mut child_results).await;
        self.flush::<SelectedValues>(parent, &mut child_results).await;
        self.flush::<SelectedPillars>(parent, &mut child_results).await;
        self.apply_deletions(&mut child_results).await;

        let staging_cleared = self.clear(session);

        let report = FinalizeReport {
            strategy,
            child_results,
            staging_cleared,
        };

        let failed = report.failures().count();
        if failed == 0 {
            tracing::info!(
                strategy_id = %parent,
                attempted = report.child_results.len(),
                "strategy finalized"
            );
        } else {
            tracing::warn!(
                strategy_id = %parent,
                attempted = report.child_results.len(),
                failed,
                "strategy finalized with child failures"
            );
        }
        Ok(report)
    }

    async fn flush<N: ChildNamespace>(&self, parent: StrategyId, results: &mut Vec<ChildResult>) {
        let items = match self.staging.read::<N>() {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(namespace = N::KEY, error = %e, "cannot read staged items; skipping namespace");
                return;
            }
        };

        for item in items {
            let outcome = match self.gateway.create_child(parent, item.fields.clone()).await {
                Ok(record) => {
                    tracing::debug!(namespace = N::KEY, staged_id = %item.id, record_id = %record.id, "child created");
                    ItemOutcome::Created { record_id: record.id }
                }
                Err(e) => {
                    tracing::warn!(namespace = N::KEY, staged_id = %item.id, name = item.fields.name(), error = %e, "child create failed");
                    ItemOutcome::failed(&ComposerError::Gateway(e))
                }
            };

            let staged_id = item.id;
            if let Err(e) = self.staging.remove::<N, _>(|i| i.id == staged_id) {
                tracing::warn!(namespace = N::KEY, staged_id = %staged_id, error = %e, "cannot unstage attempted child");
            }
            results.push(ChildResult {
                action: FlushAction::Create {
                    namespace: N::KEY,
                    item,
                },
                outcome,
            });
        }
    }

    async fn apply_deletions(&self, results: &mut Vec<ChildResult>) {
        let markers = match self.staging.read::<DeletionMarkers>() {
            Ok(markers) => markers,
            Err(e) => {
                tracing::warn!(namespace = DeletionMarkers::KEY, error = %e, "cannot read deletion markers");
                return;
            }
        };

        for marker in markers {
            let attempt = match marker {
                DeletionMarker::Child { kind, id } => self
                    .gateway
                    .delete_child(kind, id)
                    .await
                    .map_err(ComposerError::from),
                DeletionMarker::Attachment { id } => self.attachments.delete(id).await,
            };
            let outcome = match attempt {
                Ok(()) => {
                    tracing::debug!(record_id = %marker.record_id(), "queued record deleted");
                    ItemOutcome::Deleted
                }
                Err(e) => {
                    tracing::warn!(record_id = %marker.record_id(), error = %e, "queued deletion failed");
                    ItemOutcome::failed(&e)
                }
            };

            if let Err(e) = self.staging.remove::<DeletionMarkers, _>(|m| *m == marker) {
                tracing::warn!(record_id = %marker.record_id(), error = %e, "cannot unstage deletion marker");
            }
            results.push(ChildResult {
                action: FlushAction::Delete { marker },
                outcome,
            });
        }
    }

    fn clear(&self, session: &DraftSession) -> bool {
        let mut cleared = true;
        if let Err(e) = self.staging.clear_all() {
            tracing::warn!(strategy_id = %session.strategy_id, error = %e, "failed to clear staging after finalize");
            cleared = false;
        }
        if session.is_new_strategy() {
            if let Err(e) = self.staging.clear_draft_id() {
                tracing::warn!(strategy_id = %session.strategy_id, error = %e, "failed to clear draft id after finalize");
                cleared = false;
            }
        }
        cleared
    }
}

fn validate_fields(fields: &StrategyFields) -> ComposerResult<()> {
    if fields.name.trim().is_empty() {
        return Err(ComposerError::Validation("strategy name is required".into()));
    }
    if fields.end_date < fields.start_date {
        return Err(ComposerError::Validation(format!(
            "end date {} is before start date {}",
            fields.end_date, fields.start_date
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ComposerConfig;
    use draftline_core::{ChildKind, GatewayError, UserId};
    use draftline_staging::MemoryLocalStore;
    use draftline_test_utils::{
        fixed_day, pillar, strategy_fields, value, InMemoryBlobStorage, InMemoryGateway,
        StaticIdentity,
    };
    use pretty_assertions::assert_eq;

    struct Fixture {
        gateway: Arc<InMemoryGateway>,
        identity: Arc<StaticIdentity>,
        staging: StagingStore,
        orchestrator: FinalizeOrchestrator,
        session: DraftSession,
    }

    fn fixture() -> Fixture {
        let gateway = Arc::new(InMemoryGateway::new());
        let identity = Arc::new(StaticIdentity::signed_in("u1"));
        let staging = StagingStore::new(Arc::new(MemoryLocalStore::new()));
        let attachments = AttachmentPipeline::new(
            gateway.clone(),
            Arc::new(InMemoryBlobStorage::new()),
            staging.clone(),
            Arc::new(ComposerConfig::default()),
        );
        let draft = gateway.seed_strategy(&UserId::new("u1"), strategy_fields("Draft"), true);
        staging.set_draft_id(draft.id).unwrap();
        let orchestrator =
            FinalizeOrchestrator::new(gateway.clone(), identity.clone(), staging.clone(), attachments);
        Fixture {
            gateway,
            identity,
            staging,
            orchestrator,
            session: DraftSession::new_strategy(draft.id),
        }
    }

    #[tokio::test]
    async fn commits_parent_and_creates_children() {
        let f = fixture();
        f.staging.append::<StagedValues>(StagedChild::authored(value("v1"))).unwrap();
        f.staging.append::<StagedPillars>(StagedChild::authored(pillar("p1"))).unwrap();

        let report = f
            .orchestrator
            .finalize(&f.session, strategy_fields("Final"))
            .await
            .unwrap();

        assert!(report.parent_committed());
        assert!(report.is_clean());
        assert_eq!(report.created_count(), 2);
        assert_eq!(report.strategy.fields.name, "Final");
        assert_eq!(f.gateway.children_of(f.session.strategy_id).len(), 2);
        assert!(f.staging.is_empty().unwrap());
        assert_eq!(f.staging.draft_id().unwrap(), None);
    }

    #[tokio::test]
    async fn child_failure_is_isolated() {
        let f = fixture();
        for name in ["v1", "bad", "v3"] {
            f.staging.append::<StagedValues>(StagedChild::authored(value(name))).unwrap();
        }
        f.gateway.fail_child_named("bad");

        let report = f
            .orchestrator
            .finalize(&f.session, strategy_fields("Final"))
            .await
            .unwrap();

        assert!(report.parent_committed());
        assert!(!report.is_clean());
        assert_eq!(f.gateway.child_creates(ChildKind::Value), 3);
        assert_eq!(report.created_count(), 2);
        let failed: Vec<_> = report.failures().collect();
        assert_eq!(failed.len(), 1);
        assert!(matches!(
            &failed[0].action,
            FlushAction::Create { item, .. } if item.fields.name() == "bad"
        ));
        assert!(f.staging.is_empty().unwrap());
    }

    #[tokio::test]
    async fn report_serializes_with_tagged_outcomes() {
        let f = fixture();
        f.staging.append::<StagedValues>(StagedChild::authored(value("bad"))).unwrap();
        f.gateway.fail_child_named("bad");

        let report = f
            .orchestrator
            .finalize(&f.session, strategy_fields("Final"))
            .await
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();

        let result = &json["child_results"][0];
        assert_eq!(result["action"]["action"], "create");
        assert_eq!(result["action"]["namespace"], StagedValues::KEY);
        assert_eq!(result["outcome"]["outcome"], "failed");
        assert_eq!(json["staging_cleared"], true);
    }

    #[tokio::test]
    async fn parent_failure_is_fatal_and_keeps_staging() {
        let f = fixture();
        f.staging.append::<StagedValues>(StagedChild::authored(value("v1"))).unwrap();
        let before = f.staging.snapshot().unwrap();
        f.gateway.fail_strategy_updates(GatewayError::Network("reset".into()));

        let err = f
            .orchestrator
            .finalize(&f.session, strategy_fields("Final"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ComposerError::Fatal {
                stage: FinalizeStage::ParentUpdate,
                ..
            }
        ));
        assert!(err.is_retryable());
        assert_eq!(f.staging.snapshot().unwrap(), before);
        assert_eq!(f.gateway.child_creates(ChildKind::Value), 0);
    }

    #[tokio::test]
    async fn signed_out_user_mutates_nothing() {
        let f = fixture();
        f.staging.append::<StagedValues>(StagedChild::authored(value("v1"))).unwrap();
        f.identity.sign_out();
        f.gateway.reset_calls();

        let err = f
            .orchestrator
            .finalize(&f.session, strategy_fields("Final"))
            .await
            .unwrap_err();
        assert!(matches!(err, ComposerError::NotAuthenticated));
        assert!(f.gateway.calls().is_empty());
        assert_eq!(f.staging.len::<StagedValues>().unwrap(), 1);
    }

    #[tokio::test]
    async fn invalid_fields_are_rejected_before_any_call() {
        let f = fixture();
        f.gateway.reset_calls();
        let backwards = StrategyFields::new("Plan", fixed_day(2025, 6, 1), fixed_day(2025, 1, 1));

        let err = f.orchestrator.finalize(&f.session, backwards).await.unwrap_err();
        assert!(matches!(err, ComposerError::Validation(_)));
        assert!(f.gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn edit_mode_keeps_phase_and_leaves_draft_key() {
        let f = fixture();
        let committed = f
            .gateway
            .seed_strategy(&UserId::new("u1"), strategy_fields("Live"), false);
        f.staging.append::<StagedPillars>(StagedChild::authored(pillar("p1"))).unwrap();

        let report = f
            .orchestrator
            .finalize(&DraftSession::edit(committed.id), strategy_fields("Live v2"))
            .await
            .unwrap();

        assert!(report.parent_committed());
        assert_eq!(f.gateway.children_of(committed.id).len(), 1);
        assert!(f.staging.is_empty().unwrap());
        assert_eq!(f.staging.draft_id().unwrap(), Some(f.session.strategy_id));
    }

    #[tokio::test]
    async fn deletion_markers_are_applied() {
        let f = fixture();
        let existing = f.gateway.seed_child(f.session.strategy_id, value("old"));
        f.staging
            .append::<DeletionMarkers>(DeletionMarker::Child {
                kind: ChildKind::Value,
                id: existing.id,
            })
            .unwrap();

        let report = f
            .orchestrator
            .finalize(&f.session, strategy_fields("Final"))
            .await
            .unwrap();

        assert!(f.gateway.child(existing.id).is_none());
        assert_eq!(report.child_results.len(), 1);
        assert_eq!(report.child_results[0].outcome, ItemOutcome::Deleted);
    }
}
