//! In-memory persistence gateway with call recording and fault injection

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use draftline_core::{
    AttachmentFields, AttachmentRecord, ChildFields, ChildKind, ChildRecord, EntityKind,
    GatewayError, GatewayResult, PersistenceGateway, RecordId, Strategy, StrategyFields,
    StrategyId, StrategyPatch, StrategyPhase, UserId,
};
use parking_lot::Mutex;
use std::collections::HashSet;

/// One recorded gateway call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    CreateStrategy { is_draft: bool },
    UpdateStrategy { id: StrategyId, is_draft: Option<bool> },
    GetStrategy(StrategyId),
    DeleteStrategy(StrategyId),
    CreateChild { strategy_id: StrategyId, kind: ChildKind, name: String },
    UpdateChild(RecordId),
    DeleteChild { kind: ChildKind, id: RecordId },
    ListChildren { kind: ChildKind, strategy_id: StrategyId },
    SearchChildren { kind: ChildKind, term: String },
    CreateAttachment(StrategyId),
    GetAttachment(RecordId),
    DeleteAttachment(RecordId),
    ListAttachments(StrategyId),
}

#[derive(Debug, Default)]
struct Faults {
    strategy_create: Option<GatewayError>,
    strategy_update: Option<GatewayError>,
    strategy_get: Option<GatewayError>,
    child_names: HashSet<String>,
    stalled_children: HashSet<String>,
    child_every_nth: Option<usize>,
    child_creates_seen: usize,
    deletes: HashSet<RecordId>,
}

/// Gateway backed by concurrent maps
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    strategies: DashMap<StrategyId, Strategy>,
    children: DashMap<RecordId, ChildRecord>,
    attachments: DashMap<RecordId, AttachmentRecord>,
    calls: Mutex<Vec<GatewayCall>>,
    faults: Mutex<Faults>,
}

impl InMemoryGateway {
    /// Create empty gateway
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ---- fault injection ----

    /// Every `create_strategy` fails with `error`
    pub fn fail_strategy_creates(&self, error: GatewayError) {
        self.faults.lock().strategy_create = Some(error);
    }

    /// Every `update_strategy` fails with `error`
    pub fn fail_strategy_updates(&self, error: GatewayError) {
        self.faults.lock().strategy_update = Some(error);
    }

    /// Every `get_strategy` fails with `error`
    pub fn fail_strategy_lookups(&self, error: GatewayError) {
        self.faults.lock().strategy_get = Some(error);
    }

    /// `create_child` fails for items with this name
    pub fn fail_child_named(&self, name: impl Into<String>) {
        self.faults.lock().child_names.insert(name.into());
    }

    /// `create_child` never resolves for items with this name
    pub fn stall_child_named(&self, name: impl Into<String>) {
        self.faults.lock().stalled_children.insert(name.into());
    }

    /// Every `n`th `create_child` call fails
    pub fn fail_every_nth_child_create(&self, n: usize) {
        self.faults.lock().child_every_nth = Some(n.max(1));
    }

    /// Deleting this record (child or attachment) fails
    pub fn fail_delete_of(&self, id: RecordId) {
        self.faults.lock().deletes.insert(id);
    }

    /// Remove every injected fault
    pub fn clear_faults(&self) {
        *self.faults.lock() = Faults::default();
    }

    // ---- inspection ----

    /// Every call so far, in order
    #[must_use]
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().clone()
    }

    /// Number of calls matching `predicate`
    pub fn count_calls(&self, predicate: impl Fn(&GatewayCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| predicate(c)).count()
    }

    /// Number of `create_child` calls for `kind`
    #[must_use]
    pub fn child_creates(&self, kind: ChildKind) -> usize {
        self.count_calls(|c| matches!(c, GatewayCall::CreateChild { kind: k, .. } if *k == kind))
    }

    /// Number of `create_attachment` calls
    #[must_use]
    pub fn attachment_creates(&self) -> usize {
        self.count_calls(|c| matches!(c, GatewayCall::CreateAttachment(_)))
    }

    /// Forget recorded calls
    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }

    /// Stored strategy
    #[must_use]
    pub fn strategy(&self, id: StrategyId) -> Option<Strategy> {
        self.strategies.get(&id).map(|s| s.clone())
    }

    /// Stored child
    #[must_use]
    pub fn child(&self, id: RecordId) -> Option<ChildRecord> {
        self.children.get(&id).map(|c| c.clone())
    }

    /// Stored children of a strategy, any kind
    #[must_use]
    pub fn children_of(&self, strategy_id: StrategyId) -> Vec<ChildRecord> {
        let mut out: Vec<ChildRecord> = self
            .children
            .iter()
            .filter(|c| c.strategy_id == strategy_id)
            .map(|c| c.clone())
            .collect();
        out.sort_by_key(|c| c.created_at);
        out
    }

    /// Whether attachment metadata exists
    #[must_use]
    pub fn has_attachment(&self, id: RecordId) -> bool {
        self.attachments.contains_key(&id)
    }

    // ---- seeding (not recorded) ----

    /// Insert a strategy directly
    pub fn seed_strategy(&self, owner: &UserId, fields: StrategyFields, is_draft: bool) -> Strategy {
        let now = Utc::now();
        let strategy = Strategy {
            id: StrategyId::new(),
            owner: owner.clone(),
            fields,
            is_draft,
            created_at: now,
            updated_at: now,
        };
        self.strategies.insert(strategy.id, strategy.clone());
        strategy
    }

    /// Insert a child directly
    pub fn seed_child(&self, strategy_id: StrategyId, fields: ChildFields) -> ChildRecord {
        let now = Utc::now();
        let record = ChildRecord {
            id: RecordId::new(),
            strategy_id,
            fields,
            created_at: now,
            updated_at: now,
        };
        self.children.insert(record.id, record.clone());
        record
    }

    /// Insert attachment metadata directly
    pub fn seed_attachment(&self, strategy_id: StrategyId, fields: AttachmentFields) -> AttachmentRecord {
        let record = AttachmentRecord {
            id: RecordId::new(),
            strategy_id,
            fields,
            created_at: Utc::now(),
        };
        self.attachments.insert(record.id, record.clone());
        record
    }

    /// Delete a strategy out-of-band (not recorded)
    pub fn remove_strategy(&self, id: StrategyId) {
        self.strategies.remove(&id);
    }

    fn record(&self, call: GatewayCall) {
        self.calls.lock().push(call);
    }

    fn child_fault(&self, fields: &ChildFields) -> Option<GatewayError> {
        let mut faults = self.faults.lock();
        faults.child_creates_seen += 1;
        if faults.child_names.contains(fields.name()) {
            return Some(GatewayError::Validation(format!("rejected {}", fields.name())));
        }
        match faults.child_every_nth {
            Some(n) if faults.child_creates_seen % n == 0 => {
                tracing::debug!(call = faults.child_creates_seen, "injecting child create failure");
                Some(GatewayError::Network("injected failure".to_string()))
            }
            _ => None,
        }
    }

    fn delete_fault(&self, id: RecordId) -> Option<GatewayError> {
        self.faults
            .lock()
            .deletes
            .contains(&id)
            .then(|| GatewayError::Network(format!("injected delete failure for {id}")))
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryGateway {
    async fn create_strategy(
        &self,
        owner: &UserId,
        fields: StrategyFields,
        is_draft: bool,
    ) -> GatewayResult<Strategy> {
        self.record(GatewayCall::CreateStrategy { is_draft });
        if let Some(err) = self.faults.lock().strategy_create.clone() {
            return Err(err);
        }
        if fields.name.trim().is_empty() {
            return Err(GatewayError::Validation("strategy name is required".to_string()));
        }
        Ok(self.seed_strategy(owner, fields, is_draft))
    }

    async fn update_strategy(&self, id: StrategyId, patch: StrategyPatch) -> GatewayResult<Strategy> {
        self.record(GatewayCall::UpdateStrategy {
            id,
            is_draft: patch.is_draft,
        });
        if let Some(err) = self.faults.lock().strategy_update.clone() {
            return Err(err);
        }
        let mut entry = self
            .strategies
            .get_mut(&id)
            .ok_or_else(|| GatewayError::not_found(EntityKind::Strategy, id))?;

        if let Some(is_draft) = patch.is_draft {
            let next = StrategyPhase::from_draft_flag(is_draft);
            if !entry.phase().can_transition_to(next) {
                return Err(GatewayError::Conflict(format!(
                    "strategy {id} cannot move from {:?} to {next:?}",
                    entry.phase()
                )));
            }
            entry.is_draft = is_draft;
        }
        entry.fields = patch.fields;
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn get_strategy(&self, id: StrategyId) -> GatewayResult<Strategy> {
        self.record(GatewayCall::GetStrategy(id));
        if let Some(err) = self.faults.lock().strategy_get.clone() {
            return Err(err);
        }
        self.strategy(id)
            .ok_or_else(|| GatewayError::not_found(EntityKind::Strategy, id))
    }

    async fn delete_strategy(&self, id: StrategyId) -> GatewayResult<()> {
        self.record(GatewayCall::DeleteStrategy(id));
        self.strategies
            .remove(&id)
            .ok_or_else(|| GatewayError::not_found(EntityKind::Strategy, id))?;
        self.children.retain(|_, c| c.strategy_id != id);
        self.attachments.retain(|_, a| a.strategy_id != id);
        Ok(())
    }

    async fn create_child(&self, strategy_id: StrategyId, fields: ChildFields) -> GatewayResult<ChildRecord> {
        self.record(GatewayCall::CreateChild {
            strategy_id,
            kind: fields.kind(),
            name: fields.name().to_string(),
        });
        let stalled = self.faults.lock().stalled_children.contains(fields.name());
        if stalled {
            std::future::pending::<()>().await;
        }
        if let Some(err) = self.child_fault(&fields) {
            return Err(err);
        }
        if !self.strategies.contains_key(&strategy_id) {
            return Err(GatewayError::not_found(EntityKind::Strategy, strategy_id));
        }
        if fields.name().trim().is_empty() {
            return Err(GatewayError::Validation(format!("{} name is required", fields.kind())));
        }
        Ok(self.seed_child(strategy_id, fields))
    }

    async fn update_child(&self, id: RecordId, fields: ChildFields) -> GatewayResult<ChildRecord> {
        self.record(GatewayCall::UpdateChild(id));
        let mut entry = self
            .children
            .get_mut(&id)
            .ok_or_else(|| GatewayError::not_found(EntityKind::from(fields.kind()), id))?;
        if entry.kind() != fields.kind() {
            return Err(GatewayError::Validation(format!(
                "cannot change {} into {}",
                entry.kind(),
                fields.kind()
            )));
        }
        entry.fields = fields;
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn delete_child(&self, kind: ChildKind, id: RecordId) -> GatewayResult<()> {
        self.record(GatewayCall::DeleteChild { kind, id });
        if let Some(err) = self.delete_fault(id) {
            return Err(err);
        }
        let stored = self.children.get(&id).map(|c| c.kind());
        match stored {
            Some(stored) if stored == kind => {
                self.children.remove(&id);
                Ok(())
            }
            _ => Err(GatewayError::not_found(EntityKind::from(kind), id)),
        }
    }

    async fn list_children(&self, kind: ChildKind, strategy_id: StrategyId) -> GatewayResult<Vec<ChildRecord>> {
        self.record(GatewayCall::ListChildren { kind, strategy_id });
        Ok(self
            .children_of(strategy_id)
            .into_iter()
            .filter(|c| c.kind() == kind)
            .collect())
    }

    async fn search_children(
        &self,
        owner: &UserId,
        kind: ChildKind,
        term: &str,
    ) -> GatewayResult<Vec<ChildRecord>> {
        self.record(GatewayCall::SearchChildren {
            kind,
            term: term.to_string(),
        });
        let owned: HashSet<StrategyId> = self
            .strategies
            .iter()
            .filter(|s| &s.owner == owner)
            .map(|s| s.id)
            .collect();
        let mut out: Vec<ChildRecord> = self
            .children
            .iter()
            .filter(|c| c.kind() == kind && owned.contains(&c.strategy_id) && c.fields.matches_term(term))
            .map(|c| c.clone())
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn create_attachment(
        &self,
        strategy_id: StrategyId,
        fields: AttachmentFields,
    ) -> GatewayResult<AttachmentRecord> {
        self.record(GatewayCall::CreateAttachment(strategy_id));
        if !self.strategies.contains_key(&strategy_id) {
            return Err(GatewayError::not_found(EntityKind::Strategy, strategy_id));
        }
        Ok(self.seed_attachment(strategy_id, fields))
    }

    async fn get_attachment(&self, id: RecordId) -> GatewayResult<AttachmentRecord> {
        self.record(GatewayCall::GetAttachment(id));
        self.attachments
            .get(&id)
            .map(|a| a.clone())
            .ok_or_else(|| GatewayError::not_found(EntityKind::Attachment, id))
    }

    async fn delete_attachment(&self, id: RecordId) -> GatewayResult<()> {
        self.record(GatewayCall::DeleteAttachment(id));
        if let Some(err) = self.delete_fault(id) {
            return Err(err);
        }
        self.attachments
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| GatewayError::not_found(EntityKind::Attachment, id))
    }

    async fn list_attachments(&self, strategy_id: StrategyId) -> GatewayResult<Vec<AttachmentRecord>> {
        self.record(GatewayCall::ListAttachments(strategy_id));
        let mut out: Vec<AttachmentRecord> = self
            .attachments
            .iter()
            .filter(|a| a.strategy_id == strategy_id)
            .map(|a| a.clone())
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftline_core::NamedFields;

    fn fields() -> StrategyFields {
        let today = Utc::now().date_naive();
        StrategyFields::new("Plan", today, today)
    }

    #[tokio::test]
    async fn committed_strategy_cannot_return_to_draft() {
        let gateway = InMemoryGateway::new();
        let owner = UserId::new("u1");
        let s = gateway.seed_strategy(&owner, fields(), false);

        let err = gateway
            .update_strategy(
                s.id,
                StrategyPatch {
                    fields: fields(),
                    is_draft: Some(true),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Conflict(_)));
    }

    #[tokio::test]
    async fn every_nth_child_create_fails() {
        let gateway = InMemoryGateway::new();
        let s = gateway.seed_strategy(&UserId::new("u1"), fields(), true);
        gateway.fail_every_nth_child_create(2);

        let mut outcomes = Vec::new();
        for i in 0..4 {
            let r = gateway
                .create_child(s.id, ChildFields::Value(NamedFields::new(format!("v{i}"))))
                .await;
            outcomes.push(r.is_ok());
        }
        assert_eq!(outcomes, vec![true, false, true, false]);
        assert_eq!(gateway.child_creates(ChildKind::Value), 4);
    }

    #[tokio::test]
    async fn search_is_scoped_to_owner() {
        let gateway = InMemoryGateway::new();
        let mine = gateway.seed_strategy(&UserId::new("me"), fields(), false);
        let theirs = gateway.seed_strategy(&UserId::new("them"), fields(), false);
        gateway.seed_child(mine.id, ChildFields::Pillar(NamedFields::new("Ops excellence")));
        gateway.seed_child(theirs.id, ChildFields::Pillar(NamedFields::new("Ops focus")));

        let found = gateway
            .search_children(&UserId::new("me"), ChildKind::Pillar, "ops")
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].strategy_id, mine.id);
    }
}
