//! Edit-mode reconciliation
//!
//! Committed children come straight from the gateway; staged additions come
//! from the staging store. The two are kept apart so a screen can render
//! "existing" and "new" separately and route edits to the right place.

use crate::error::ComposerResult;
use draftline_core::{
    AttachmentRecord, ChildFields, ChildKind, ChildRecord, DeletionMarker, PersistenceGateway,
    RecordId, StagedChild, StagedId, Strategy, StrategyId,
};
use draftline_staging::{
    ChildNamespace, DeletionMarkers, SelectedOperationalGoals, SelectedPillars,
    SelectedStrategicGoals, SelectedValues, StagedAttachments, StagedPillars, StagedValues,
    StagingError, StagingResult, StagingStore,
};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Committed items next to items pending addition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Partitioned<E, P> {
    /// Already committed
    pub existing: Vec<E>,
    /// Added in this session
    pub pending: Vec<P>,
}

impl<E, P> Partitioned<E, P> {
    /// Total items in both partitions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.existing.len() + self.pending.len()
    }

    /// Whether both partitions are empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.existing.is_empty() && self.pending.is_empty()
    }
}

impl<E, P> Default for Partitioned<E, P> {
    fn default() -> Self {
        Self {
            existing: Vec::new(),
            pending: Vec::new(),
        }
    }
}

/// Child partition
pub type ChildPartition = Partitioned<ChildRecord, StagedChild>;

/// Everything an edit screen renders for one strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompositeView {
    /// Parent record
    pub strategy: Strategy,
    /// Strategic goals
    pub strategic_goals: ChildPartition,
    /// Operational goals
    pub operational_goals: ChildPartition,
    /// Values
    pub values: ChildPartition,
    /// Pillars
    pub pillars: ChildPartition,
    /// Attachments; `pending` holds uploads made in this session
    pub attachments: Partitioned<AttachmentRecord, AttachmentRecord>,
}

impl CompositeView {
    /// Partition for `kind`
    #[must_use]
    pub fn children(&self, kind: ChildKind) -> &ChildPartition {
        match kind {
            ChildKind::StrategicGoal => &self.strategic_goals,
            ChildKind::OperationalGoal => &self.operational_goals,
            ChildKind::Value => &self.values,
            ChildKind::Pillar => &self.pillars,
        }
    }

    fn children_mut(&mut self, kind: ChildKind) -> &mut ChildPartition {
        match kind {
            ChildKind::StrategicGoal => &mut self.strategic_goals,
            ChildKind::OperationalGoal => &mut self.operational_goals,
            ChildKind::Value => &mut self.values,
            ChildKind::Pillar => &mut self.pillars,
        }
    }
}

/// Loads and edits a committed composite
#[derive(Clone)]
pub struct ReconciliationReader {
    gateway: Arc<dyn PersistenceGateway>,
    staging: StagingStore,
}

impl std::fmt::Debug for ReconciliationReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationReader")
            .field("staging", &self.staging)
            .finish_non_exhaustive()
    }
}

impl ReconciliationReader {
    /// Create reader
    #[must_use]
    pub fn new(gateway: Arc<dyn PersistenceGateway>, staging: StagingStore) -> Self {
        Self { gateway, staging }
    }

    /// Load the composite for `strategy_id`
    ///
    /// Items already queued for deletion are left out of both partitions.
    pub async fn load(&self, strategy_id: StrategyId) -> ComposerResult<CompositeView> {
        let strategy = self.gateway.get_strategy(strategy_id).await?;
        let queued: HashSet<RecordId> = self
            .staging
            .read::<DeletionMarkers>()?
            .iter()
            .map(DeletionMarker::record_id)
            .collect();

        let mut view = CompositeView {
            strategy,
            strategic_goals: ChildPartition::default(),
            operational_goals: ChildPartition::default(),
            values: ChildPartition::default(),
            pillars: ChildPartition::default(),
            attachments: Partitioned::default(),
        };

        for kind in ChildKind::ALL {
            let existing = self.gateway.list_children(kind, strategy_id).await?;
            let partition = view.children_mut(kind);
            partition.existing = existing
                .into_iter()
                .filter(|record| !queued.contains(&record.id))
                .collect();
            partition.pending = self.pending(kind)?;
        }

        let session_uploads = self.staging.read::<StagedAttachments>()?;
        let session_ids: HashSet<RecordId> = session_uploads.iter().map(|a| a.id).collect();
        view.attachments.existing = self
            .gateway
            .list_attachments(strategy_id)
            .await?
            .into_iter()
            .filter(|a| !queued.contains(&a.id) && !session_ids.contains(&a.id))
            .collect();
        view.attachments.pending = session_uploads
            .into_iter()
            .filter(|a| !queued.contains(&a.id))
            .collect();

        tracing::debug!(
            strategy_id = %strategy_id,
            goals = view.strategic_goals.len() + view.operational_goals.len(),
            values = view.values.len(),
            pillars = view.pillars.len(),
            attachments = view.attachments.len(),
            "composite loaded"
        );
        Ok(view)
    }

    /// Staged additions of `kind`, authored items first
    pub fn pending(&self, kind: ChildKind) -> StagingResult<Vec<StagedChild>> {
        Ok(match kind {
            ChildKind::StrategicGoal => self.staging.read::<SelectedStrategicGoals>()?,
            ChildKind::OperationalGoal => self.staging.read::<SelectedOperationalGoals>()?,
            ChildKind::Value => {
                let mut items = self.staging.read::<StagedValues>()?;
                items.extend(self.staging.read::<SelectedValues>()?);
                items
            }
            ChildKind::Pillar => {
                let mut items = self.staging.read::<StagedPillars>()?;
                items.extend(self.staging.read::<SelectedPillars>()?);
                items
            }
        })
    }

    /// Update a committed child immediately
    pub async fn update_existing(&self, id: RecordId, fields: ChildFields) -> ComposerResult<ChildRecord> {
        let record = self.gateway.update_child(id, fields).await?;
        tracing::info!(record_id = %id, kind = %record.kind(), "committed child updated");
        Ok(record)
    }

    /// Delete a committed child immediately
    pub async fn delete_existing(&self, kind: ChildKind, id: RecordId) -> ComposerResult<()> {
        self.gateway.delete_child(kind, id).await?;
        self.staging
            .remove::<DeletionMarkers, _>(|m| m.record_id() == id)?;
        tracing::info!(record_id = %id, kind = %kind, "committed child deleted");
        Ok(())
    }

    /// Queue a committed child for deletion at finalize
    ///
    /// Returns `false` when it was already queued.
    pub fn mark_for_deletion(&self, kind: ChildKind, id: RecordId) -> ComposerResult<bool> {
        let marker = DeletionMarker::Child { kind, id };
        if self.staging.read::<DeletionMarkers>()?.contains(&marker) {
            return Ok(false);
        }
        self.staging.append::<DeletionMarkers>(marker)?;
        Ok(true)
    }

    /// Take a committed record back off the deletion queue
    pub fn unmark_for_deletion(&self, id: RecordId) -> ComposerResult<bool> {
        Ok(self.staging.remove::<DeletionMarkers, _>(|m| m.record_id() == id)? > 0)
    }

    /// Edit a staged child in place; nothing is sent to the gateway
    pub fn update_pending(&self, id: StagedId, fields: ChildFields) -> ComposerResult<StagedChild> {
        let updated = match fields.kind() {
            ChildKind::StrategicGoal => self.staging.update_child::<SelectedStrategicGoals>(id, fields)?,
            ChildKind::OperationalGoal => self.staging.update_child::<SelectedOperationalGoals>(id, fields)?,
            ChildKind::Value => self.update_either::<StagedValues, SelectedValues>(id, fields)?,
            ChildKind::Pillar => self.update_either::<StagedPillars, SelectedPillars>(id, fields)?,
        };
        Ok(updated)
    }

    /// Drop a staged child of `kind`
    pub fn remove_pending(&self, kind: ChildKind, id: StagedId) -> ComposerResult<bool> {
        let removed = match kind {
            ChildKind::StrategicGoal => self.staging.remove::<SelectedStrategicGoals, _>(|i| i.id == id)?,
            ChildKind::OperationalGoal => self.staging.remove::<SelectedOperationalGoals, _>(|i| i.id == id)?,
            ChildKind::Value => {
                self.staging.remove::<StagedValues, _>(|i| i.id == id)?
                    + self.staging.remove::<SelectedValues, _>(|i| i.id == id)?
            }
            ChildKind::Pillar => {
                self.staging.remove::<StagedPillars, _>(|i| i.id == id)?
                    + self.staging.remove::<SelectedPillars, _>(|i| i.id == id)?
            }
        };
        Ok(removed > 0)
    }

    fn update_either<A: ChildNamespace, B: ChildNamespace>(
        &self,
        id: StagedId,
        fields: ChildFields,
    ) -> StagingResult<StagedChild> {
        match self.staging.update_child::<A>(id, fields.clone()) {
            Err(StagingError::NotStaged { .. }) => self.staging.update_child::<B>(id, fields),
            other => other,
        }
    }
}
