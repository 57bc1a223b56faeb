//! Copy-on-select
//!
//! Lets a user pull a child from another of their strategies into the
//! current one. The source row is never re-parented: its field values are
//! cloned into a new record (edit mode) or a new staged item (new strategy).

use crate::draft::{DraftSession, SessionMode};
use crate::error::ComposerResult;
use draftline_core::{
    ChildKind, ChildRecord, IdentityProvider, PersistenceGateway, StagedChild, StagedId,
    StagedOrigin,
};
use draftline_staging::{
    ChildNamespace, SelectedOperationalGoals, SelectedPillars, SelectedStrategicGoals,
    SelectedValues, StagingResult, StagingStore,
};
use serde::Serialize;
use std::sync::Arc;

/// Result of selecting a child into the current strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "selection", content = "item", rename_all = "snake_case")]
pub enum Selection {
    /// Copied and committed under the current strategy (edit mode)
    Committed(ChildRecord),
    /// Copied into staging (new strategy)
    Staged(StagedChild),
    /// Already part of the current strategy; nothing changed
    AlreadyPresent,
}

/// Searches and copies children across a user's strategies
#[derive(Clone)]
pub struct CopyOnSelect {
    gateway: Arc<dyn PersistenceGateway>,
    identity: Arc<dyn IdentityProvider>,
    staging: StagingStore,
}

impl std::fmt::Debug for CopyOnSelect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CopyOnSelect")
            .field("staging", &self.staging)
            .finish_non_exhaustive()
    }
}

impl CopyOnSelect {
    /// Create selector
    #[must_use]
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        identity: Arc<dyn IdentityProvider>,
        staging: StagingStore,
    ) -> Self {
        Self {
            gateway,
            identity,
            staging,
        }
    }

    /// Children of `kind` across the current user's strategies, newest first
    ///
    /// A blank term matches everything.
    pub async fn search(&self, kind: ChildKind, term: &str) -> ComposerResult<Vec<ChildRecord>> {
        let owner = self.identity.current_user().await?;
        let found = self.gateway.search_children(&owner, kind, term.trim()).await?;
        tracing::debug!(kind = %kind, term, hits = found.len(), "searched children");
        Ok(found)
    }

    /// Copy `source` into the session's strategy
    pub async fn select(&self, session: &DraftSession, source: &ChildRecord) -> ComposerResult<Selection> {
        self.identity.current_user().await?;

        match session.mode {
            SessionMode::Edit => {
                if source.strategy_id == session.strategy_id {
                    return Ok(Selection::AlreadyPresent);
                }
                let record = self
                    .gateway
                    .create_child(session.strategy_id, source.fields.clone())
                    .await?;
                tracing::info!(
                    source_id = %source.id,
                    record_id = %record.id,
                    strategy_id = %session.strategy_id,
                    "copied child into strategy"
                );
                Ok(Selection::Committed(record))
            }
            SessionMode::NewStrategy => {
                let copied = StagedOrigin::CopiedFrom(source.id);
                if self.selected(source.kind())?.iter().any(|i| i.origin == copied) {
                    return Ok(Selection::AlreadyPresent);
                }
                let staged = StagedChild::copied_from(source);
                self.stage(staged.clone())?;
                tracing::debug!(source_id = %source.id, staged_id = %staged.id, "staged copied child");
                Ok(Selection::Staged(staged))
            }
        }
    }

    /// Remove a staged selection; returns whether it was present
    pub fn deselect(&self, kind: ChildKind, id: StagedId) -> ComposerResult<bool> {
        let removed = match kind {
            ChildKind::StrategicGoal => remove_from::<SelectedStrategicGoals>(&self.staging, id)?,
            ChildKind::OperationalGoal => remove_from::<SelectedOperationalGoals>(&self.staging, id)?,
            ChildKind::Value => remove_from::<SelectedValues>(&self.staging, id)?,
            ChildKind::Pillar => remove_from::<SelectedPillars>(&self.staging, id)?,
        };
        Ok(removed)
    }

    /// Staged selections of `kind`
    pub fn selected(&self, kind: ChildKind) -> StagingResult<Vec<StagedChild>> {
        match kind {
            ChildKind::StrategicGoal => self.staging.read::<SelectedStrategicGoals>(),
            ChildKind::OperationalGoal => self.staging.read::<SelectedOperationalGoals>(),
            ChildKind::Value => self.staging.read::<SelectedValues>(),
            ChildKind::Pillar => self.staging.read::<SelectedPillars>(),
        }
    }

    fn stage(&self, item: StagedChild) -> StagingResult<()> {
        match item.kind() {
            ChildKind::StrategicGoal => self.staging.append::<SelectedStrategicGoals>(item),
            ChildKind::OperationalGoal => self.staging.append::<SelectedOperationalGoals>(item),
            ChildKind::Value => self.staging.append::<SelectedValues>(item),
            ChildKind::Pillar => self.staging.append::<SelectedPillars>(item),
        }
    }
}

fn remove_from<N: ChildNamespace>(staging: &StagingStore, id: StagedId) -> StagingResult<bool> {
    Ok(staging.remove::<N, _>(|item| item.id == id)? > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ComposerError;
    use draftline_core::{StrategyId, UserId};
    use draftline_staging::MemoryLocalStore;
    use draftline_test_utils::{
        operational_goal, pillar, strategy_fields, InMemoryGateway, StaticIdentity,
    };
    use pretty_assertions::assert_eq;

    struct Fixture {
        gateway: Arc<InMemoryGateway>,
        identity: Arc<StaticIdentity>,
        staging: StagingStore,
        selector: CopyOnSelect,
        other: StrategyId,
    }

    fn fixture() -> Fixture {
        let gateway = Arc::new(InMemoryGateway::new());
        let identity = Arc::new(StaticIdentity::signed_in("u1"));
        let staging = StagingStore::new(Arc::new(MemoryLocalStore::new()));
        let selector = CopyOnSelect::new(gateway.clone(), identity.clone(), staging.clone());
        let other = gateway
            .seed_strategy(&UserId::new("u1"), strategy_fields("Other"), false)
            .id;
        Fixture {
            gateway,
            identity,
            staging,
            selector,
            other,
        }
    }

    #[tokio::test]
    async fn search_requires_identity() {
        let f = fixture();
        f.gateway.seed_child(f.other, pillar("People first"));
        assert_eq!(f.selector.search(ChildKind::Pillar, "  ").await.unwrap().len(), 1);

        f.identity.sign_out();
        let err = f.selector.search(ChildKind::Pillar, "").await.unwrap_err();
        assert!(matches!(err, ComposerError::NotAuthenticated));
    }

    #[tokio::test]
    async fn new_strategy_selection_is_staged_once() {
        let f = fixture();
        let source = f.gateway.seed_child(f.other, operational_goal("Ship v2"));
        let session = DraftSession::new_strategy(StrategyId::new());

        let first = f.selector.select(&session, &source).await.unwrap();
        let Selection::Staged(staged) = first else {
            panic!("expected staged selection, got {first:?}");
        };
        assert_eq!(staged.origin, StagedOrigin::CopiedFrom(source.id));
        assert_eq!(f.staging.len::<SelectedOperationalGoals>().unwrap(), 1);

        let second = f.selector.select(&session, &source).await.unwrap();
        assert_eq!(second, Selection::AlreadyPresent);
        assert_eq!(f.staging.len::<SelectedOperationalGoals>().unwrap(), 1);

        assert!(f.selector.deselect(ChildKind::OperationalGoal, staged.id).unwrap());
        assert!(f.selector.selected(ChildKind::OperationalGoal).unwrap().is_empty());
    }

    #[tokio::test]
    async fn edit_selection_commits_a_copy() {
        let f = fixture();
        let source = f.gateway.seed_child(f.other, pillar("People"));
        let current = f
            .gateway
            .seed_strategy(&UserId::new("u1"), strategy_fields("Current"), false);
        let session = DraftSession::edit(current.id);

        let Selection::Committed(copy) = f.selector.select(&session, &source).await.unwrap() else {
            panic!("expected committed selection");
        };
        assert_ne!(copy.id, source.id);
        assert_eq!(copy.strategy_id, current.id);
        assert_eq!(f.gateway.child(source.id).unwrap().strategy_id, f.other);
        assert!(f.staging.is_empty().unwrap());
    }

    #[tokio::test]
    async fn edit_selection_of_own_child_is_noop() {
        let f = fixture();
        let own = f.gateway.seed_child(f.other, pillar("Mine"));
        let selection = f
            .selector
            .select(&DraftSession::edit(f.other), &own)
            .await
            .unwrap();
        assert_eq!(selection, Selection::AlreadyPresent);
        assert_eq!(f.gateway.children_of(f.other).len(), 1);
    }
}
