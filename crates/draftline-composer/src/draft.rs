//! Draft acquisition
//!
//! Resolves which parent record a composite-editing session writes against.
//! Edit mode passes the committed id straight through; new-strategy mode
//! reuses the draft recorded in the durable store or creates a placeholder.

use crate::config::ComposerConfig;
use crate::error::ComposerResult;
use chrono::Utc;
use draftline_core::{IdentityProvider, PersistenceGateway, StrategyFields, StrategyId};
use draftline_staging::StagingStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How a session relates to its parent record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Assembling a new strategy on top of a draft
    NewStrategy,
    /// Editing an already committed strategy
    Edit,
}

/// Parent record a session is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DraftSession {
    /// Parent id
    pub strategy_id: StrategyId,
    /// Session mode
    pub mode: SessionMode,
}

impl DraftSession {
    /// Session over a draft
    #[inline]
    #[must_use]
    pub fn new_strategy(strategy_id: StrategyId) -> Self {
        Self {
            strategy_id,
            mode: SessionMode::NewStrategy,
        }
    }

    /// Session over a committed record
    #[inline]
    #[must_use]
    pub fn edit(strategy_id: StrategyId) -> Self {
        Self {
            strategy_id,
            mode: SessionMode::Edit,
        }
    }

    /// Whether this session assembles a new strategy
    #[inline]
    #[must_use]
    pub fn is_new_strategy(&self) -> bool {
        self.mode == SessionMode::NewStrategy
    }
}

/// Acquires and forgets provisional parent records
#[derive(Clone)]
pub struct DraftManager {
    gateway: Arc<dyn PersistenceGateway>,
    identity: Arc<dyn IdentityProvider>,
    staging: StagingStore,
    config: Arc<ComposerConfig>,
}

impl std::fmt::Debug for DraftManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftManager")
            .field("staging", &self.staging)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DraftManager {
    /// Create draft manager
    #[must_use]
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        identity: Arc<dyn IdentityProvider>,
        staging: StagingStore,
        config: Arc<ComposerConfig>,
    ) -> Self {
        Self {
            gateway,
            identity,
            staging,
            config,
        }
    }

    /// Resolve the parent record for a session
    ///
    /// # Workflow
    /// 1. `Some(id)`: edit mode, returned as-is without touching local state
    /// 2. A recorded draft id that still resolves to a draft is reused
    /// 3. Otherwise a placeholder draft is created and its id recorded
    ///
    /// A recorded id that resolves to an already committed strategy is not
    /// reused; a fresh draft replaces it.
    /// Lookup errors are treated as "does not exist" and fall through to
    /// creation.
    pub async fn acquire(&self, existing: Option<StrategyId>) -> ComposerResult<DraftSession> {
        if let Some(id) = existing {
            tracing::debug!(strategy_id = %id, "editing committed strategy");
            return Ok(DraftSession::edit(id));
        }

        if let Some(id) = self.staging.draft_id()? {
            match self.gateway.get_strategy(id).await {
                Ok(strategy) if strategy.is_draft => {
                    tracing::debug!(strategy_id = %id, "reusing recorded draft");
                    return Ok(DraftSession::new_strategy(id));
                }
                Ok(_) => {
                    tracing::warn!(strategy_id = %id, "recorded draft is already committed; creating a new one");
                }
                Err(e) => {
                    tracing::warn!(strategy_id = %id, error = %e, "recorded draft not reachable; creating a new one");
                }
            }
        }

        self.create_draft().await
    }

    /// Forget the recorded draft id
    ///
    /// The server-side draft is left in place.
    pub fn discard(&self) -> ComposerResult<()> {
        self.staging.clear_draft_id()?;
        Ok(())
    }

    /// Draft id currently recorded, if any
    pub fn recorded(&self) -> ComposerResult<Option<StrategyId>> {
        Ok(self.staging.draft_id()?)
    }

    async fn create_draft(&self) -> ComposerResult<DraftSession> {
        let owner = self.identity.current_user().await?;
        let today = Utc::now().date_naive();
        let fields = StrategyFields::placeholder(self.config.draft_placeholder_name.clone(), today);

        let strategy = self.gateway.create_strategy(&owner, fields, true).await?;
        self.staging.set_draft_id(strategy.id)?;

        tracing::info!(strategy_id = %strategy.id, owner = %owner, "created draft strategy");
        Ok(DraftSession::new_strategy(strategy.id))
    }
}
