//! Write-through staging store
//!
//! Every mutating call serializes the whole updated list back to the durable
//! local store before returning, so a reload loses at most an in-flight
//! network call, never previously-entered data. Reads are local and
//! synchronous.

use crate::error::{LocalStoreError, StagingError, StagingResult};
use crate::local_store::DurableLocalStore;
use crate::namespace::{ChildNamespace, Namespace, ALL_KEYS, DRAFT_ID_KEY};
use draftline_core::{ChildFields, StagedChild, StagedId, StrategyId};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Raw contents of every staging key (and the draft key)
pub type StagingSnapshot = BTreeMap<&'static str, Option<String>>;

/// Session-scoped repository of uncommitted items
#[derive(Clone)]
pub struct StagingStore {
    store: Arc<dyn DurableLocalStore>,
}

impl std::fmt::Debug for StagingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingStore").finish_non_exhaustive()
    }
}

impl StagingStore {
    /// Create store over a durable backend
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn DurableLocalStore>) -> Self {
        Self { store }
    }

    /// Underlying durable store
    #[inline]
    #[must_use]
    pub fn local_store(&self) -> &Arc<dyn DurableLocalStore> {
        &self.store
    }

    /// Read the staged list of `N`
    ///
    /// A stored list that cannot be decoded is logged and read as empty.
    pub fn read<N: Namespace>(&self) -> StagingResult<Vec<N::Item>> {
        let Some(raw) = self.store.get(N::KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(items) => Ok(items),
            Err(e) => {
                tracing::warn!(namespace = N::KEY, error = %e, "discarding undecodable staged list");
                Ok(Vec::new())
            }
        }
    }

    /// Append one item
    pub fn append<N: Namespace>(&self, item: N::Item) -> StagingResult<()> {
        N::validate(&item)?;
        let mut items = self.read::<N>()?;
        items.push(item);
        self.write::<N>(&items)?;
        tracing::debug!(namespace = N::KEY, len = items.len(), "staged item appended");
        Ok(())
    }

    /// Remove every item matching `predicate`; returns how many were removed
    pub fn remove<N, F>(&self, predicate: F) -> StagingResult<usize>
    where
        N: Namespace,
        F: Fn(&N::Item) -> bool,
    {
        let mut items = self.read::<N>()?;
        let before = items.len();
        items.retain(|item| !predicate(item));
        let removed = before - items.len();
        if removed > 0 {
            self.write::<N>(&items)?;
            tracing::debug!(namespace = N::KEY, removed, "staged items removed");
        }
        Ok(removed)
    }

    /// Replace the whole list
    pub fn replace<N: Namespace>(&self, items: Vec<N::Item>) -> StagingResult<()> {
        for item in &items {
            N::validate(item)?;
        }
        self.write::<N>(&items)
    }

    /// Drop the namespace key entirely
    pub fn clear<N: Namespace>(&self) -> StagingResult<()> {
        self.store.remove(N::KEY)?;
        Ok(())
    }

    /// Replace the fields of a staged child in place
    ///
    /// The staged id and origin are kept; only the field values change.
    pub fn update_child<N: ChildNamespace>(
        &self,
        id: StagedId,
        fields: ChildFields,
    ) -> StagingResult<StagedChild> {
        if fields.kind() != N::KIND {
            return Err(StagingError::KindMismatch {
                namespace: N::KEY,
                expected: N::KIND,
                actual: fields.kind(),
            });
        }

        let mut items = self.read::<N>()?;
        let Some(item) = items.iter_mut().find(|item| item.id == id) else {
            return Err(StagingError::NotStaged {
                namespace: N::KEY,
                id: id.to_string(),
            });
        };
        item.fields = fields;
        let updated = item.clone();
        self.write::<N>(&items)?;
        Ok(updated)
    }

    /// Number of staged items in `N`
    pub fn len<N: Namespace>(&self) -> StagingResult<usize> {
        Ok(self.read::<N>()?.len())
    }

    /// Drop every namespace key (the draft key is left alone)
    ///
    /// Attempts every key even if one fails; the first failure is returned.
    pub fn clear_all(&self) -> StagingResult<()> {
        let mut first_error: Option<LocalStoreError> = None;
        for key in ALL_KEYS {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!(namespace = key, error = %e, "failed to clear namespace");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Whether every namespace is empty
    pub fn is_empty(&self) -> StagingResult<bool> {
        for key in ALL_KEYS {
            if let Some(raw) = self.store.get(key)? {
                let empty = serde_json::from_str::<Vec<serde_json::Value>>(&raw)
                    .map(|items| items.is_empty())
                    .unwrap_or(true);
                if !empty {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Raw contents of every key, including the draft key
    pub fn snapshot(&self) -> StagingResult<StagingSnapshot> {
        let mut snapshot = StagingSnapshot::new();
        for key in ALL_KEYS.into_iter().chain(std::iter::once(DRAFT_ID_KEY)) {
            snapshot.insert(key, self.store.get(key)?);
        }
        Ok(snapshot)
    }

    /// Draft id recorded by a previous session, if any
    ///
    /// A malformed value is logged and treated as absent.
    pub fn draft_id(&self) -> StagingResult<Option<StrategyId>> {
        let Some(raw) = self.store.get(DRAFT_ID_KEY)? else {
            return Ok(None);
        };
        match raw.parse() {
            Ok(id) => Ok(Some(id)),
            Err(e) => {
                tracing::warn!(value = %raw, error = %e, "ignoring malformed draft id");
                Ok(None)
            }
        }
    }

    /// Record the active draft id
    pub fn set_draft_id(&self, id: StrategyId) -> StagingResult<()> {
        self.store.set(DRAFT_ID_KEY, &id.to_string())?;
        Ok(())
    }

    /// Forget the active draft id
    pub fn clear_draft_id(&self) -> StagingResult<()> {
        self.store.remove(DRAFT_ID_KEY)?;
        Ok(())
    }

    fn write<N: Namespace>(&self, items: &[N::Item]) -> StagingResult<()> {
        let raw = serde_json::to_string(items).map_err(|source| StagingError::Encode {
            namespace: N::KEY,
            source,
        })?;
        self.store.set(N::KEY, &raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local_store::MemoryLocalStore;
    use crate::namespace::{DeletionMarkers, SelectedValues, StagedPillars, StagedValues};
    use draftline_core::{ChildKind, DeletionMarker, NamedFields, RecordId};
    use pretty_assertions::assert_eq;

    fn staging() -> (StagingStore, Arc<MemoryLocalStore>) {
        let backend = Arc::new(MemoryLocalStore::new());
        (StagingStore::new(backend.clone()), backend)
    }

    fn value(name: &str) -> StagedChild {
        StagedChild::authored(ChildFields::Value(NamedFields::new(name)))
    }

    fn pillar(name: &str) -> StagedChild {
        StagedChild::authored(ChildFields::Pillar(NamedFields::new(name)))
    }

    #[test]
    fn append_writes_through_immediately() {
        let (staging, backend) = staging();
        staging.append::<StagedValues>(value("Trust")).unwrap();

        let raw = backend.get(StagedValues::KEY).unwrap().unwrap();
        let decoded: Vec<StagedChild> = serde_json::from_str(&raw).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].fields.name(), "Trust");
    }

    #[test]
    fn a_new_store_over_the_same_backend_sees_staged_items() {
        let (staging, backend) = staging();
        staging.append::<StagedValues>(value("Trust")).unwrap();
        staging.append::<StagedPillars>(pillar("People")).unwrap();

        let reloaded = StagingStore::new(backend);
        assert_eq!(reloaded.read::<StagedValues>().unwrap().len(), 1);
        assert_eq!(reloaded.read::<StagedPillars>().unwrap()[0].fields.name(), "People");
    }

    #[test]
    fn append_rejects_wrong_kind() {
        let (staging, backend) = staging();
        let err = staging.append::<StagedValues>(pillar("People")).unwrap_err();
        assert!(matches!(
            err,
            StagingError::KindMismatch {
                expected: ChildKind::Value,
                actual: ChildKind::Pillar,
                ..
            }
        ));
        assert_eq!(backend.get(StagedValues::KEY).unwrap(), None);
    }

    #[test]
    fn remove_by_predicate_counts_removed() {
        let (staging, _) = staging();
        let keep = value("Keep");
        let drop = value("Drop");
        let drop_id = drop.id;
        staging.append::<StagedValues>(keep.clone()).unwrap();
        staging.append::<StagedValues>(drop).unwrap();

        let removed = staging.remove::<StagedValues, _>(|item| item.id == drop_id).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(staging.read::<StagedValues>().unwrap(), vec![keep]);

        let removed = staging.remove::<StagedValues, _>(|_| false).unwrap();
        assert_eq!(removed, 0);
    }

    #[test]
    fn replace_and_clear() {
        let (staging, backend) = staging();
        staging.append::<SelectedValues>(value("Old")).unwrap();
        staging
            .replace::<SelectedValues>(vec![value("A"), value("B")])
            .unwrap();
        assert_eq!(staging.len::<SelectedValues>().unwrap(), 2);

        staging.clear::<SelectedValues>().unwrap();
        assert_eq!(backend.get(SelectedValues::KEY).unwrap(), None);
        assert!(staging.read::<SelectedValues>().unwrap().is_empty());
    }

    #[test]
    fn update_child_keeps_identity() {
        let (staging, _) = staging();
        let item = value("Draft name");
        let id = item.id;
        staging.append::<StagedValues>(item).unwrap();

        let updated = staging
            .update_child::<StagedValues>(id, ChildFields::Value(NamedFields::new("Final name")))
            .unwrap();
        assert_eq!(updated.id, id);
        assert_eq!(staging.read::<StagedValues>().unwrap()[0].fields.name(), "Final name");

        let missing = staging.update_child::<StagedValues>(
            StagedId::new(),
            ChildFields::Value(NamedFields::new("x")),
        );
        assert!(matches!(missing, Err(StagingError::NotStaged { .. })));
    }

    #[test]
    fn undecodable_list_reads_as_empty() {
        let (staging, backend) = staging();
        backend.set(StagedValues::KEY, "{not json").unwrap();
        assert!(staging.read::<StagedValues>().unwrap().is_empty());

        staging.append::<StagedValues>(value("Fresh")).unwrap();
        assert_eq!(staging.len::<StagedValues>().unwrap(), 1);
    }

    #[test]
    fn draft_id_roundtrip_and_malformed_value() {
        let (staging, backend) = staging();
        assert_eq!(staging.draft_id().unwrap(), None);

        let id = StrategyId::new();
        staging.set_draft_id(id).unwrap();
        assert_eq!(staging.draft_id().unwrap(), Some(id));

        backend.set(DRAFT_ID_KEY, "garbage").unwrap();
        assert_eq!(staging.draft_id().unwrap(), None);

        staging.clear_draft_id().unwrap();
        assert_eq!(backend.get(DRAFT_ID_KEY).unwrap(), None);
    }

    #[test]
    fn clear_all_leaves_draft_key() {
        let (staging, backend) = staging();
        let id = StrategyId::new();
        staging.set_draft_id(id).unwrap();
        staging.append::<StagedValues>(value("A")).unwrap();
        staging
            .append::<DeletionMarkers>(DeletionMarker::Attachment { id: RecordId::new() })
            .unwrap();
        assert!(!staging.is_empty().unwrap());

        staging.clear_all().unwrap();
        assert!(staging.is_empty().unwrap());
        assert_eq!(staging.draft_id().unwrap(), Some(id));
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn snapshot_lists_every_key() {
        let (staging, _) = staging();
        staging.append::<StagedValues>(value("A")).unwrap();
        let snapshot = staging.snapshot().unwrap();
        assert_eq!(snapshot.len(), ALL_KEYS.len() + 1);
        assert!(snapshot[StagedValues::KEY].is_some());
        assert!(snapshot[DRAFT_ID_KEY].is_none());
    }
}
