//! Staged work survives a "reload": a fresh StagingStore opened over the same
//! directory sees everything the previous one wrote.

use draftline_core::{
    ChildFields, DeletionMarker, GoalFields, NamedFields, RecordId, StagedChild, StrategyId,
};
use draftline_staging::{
    DeletionMarkers, FileLocalStore, SelectedStrategicGoals, StagedValues, StagingStore,
};
use proptest::prelude::*;
use std::sync::Arc;

fn open(dir: &std::path::Path) -> StagingStore {
    StagingStore::new(Arc::new(FileLocalStore::open(dir).unwrap()))
}

#[test]
fn staged_lists_and_draft_key_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let draft = StrategyId::new();
    let marker = DeletionMarker::Attachment { id: RecordId::new() };

    {
        let staging = open(dir.path());
        staging.set_draft_id(draft).unwrap();
        staging
            .append::<StagedValues>(StagedChild::authored(ChildFields::Value(NamedFields::new(
                "Integrity",
            ))))
            .unwrap();
        staging
            .append::<SelectedStrategicGoals>(StagedChild::authored(ChildFields::StrategicGoal(
                GoalFields::new("Grow", "3y", "finance"),
            )))
            .unwrap();
        staging.append::<DeletionMarkers>(marker).unwrap();
    }

    let staging = open(dir.path());
    assert_eq!(staging.draft_id().unwrap(), Some(draft));
    assert_eq!(staging.read::<StagedValues>().unwrap()[0].fields.name(), "Integrity");
    assert_eq!(staging.len::<SelectedStrategicGoals>().unwrap(), 1);
    assert_eq!(staging.read::<DeletionMarkers>().unwrap(), vec![marker]);
}

#[test]
fn clear_all_then_reopen_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    {
        let staging = open(dir.path());
        staging
            .append::<StagedValues>(StagedChild::authored(ChildFields::Value(NamedFields::new("A"))))
            .unwrap();
        staging.clear_all().unwrap();
    }
    assert!(open(dir.path()).is_empty().unwrap());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Whatever sequence of names is appended comes back in the same order
    /// after reopening.
    #[test]
    fn append_order_is_preserved(names in proptest::collection::vec("[a-zA-Z ]{1,16}", 0..12)) {
        let dir = tempfile::tempdir().unwrap();
        {
            let staging = open(dir.path());
            for name in &names {
                staging
                    .append::<StagedValues>(StagedChild::authored(ChildFields::Value(NamedFields::new(name.clone()))))
                    .unwrap();
            }
        }
        let read: Vec<String> = open(dir.path())
            .read::<StagedValues>()
            .unwrap()
            .into_iter()
            .map(|item| item.fields.name().to_string())
            .collect();
        prop_assert_eq!(read, names);
    }
}
