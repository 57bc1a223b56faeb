//! Typed staging namespaces
//!
//! Each namespace is a marker type bound to one durable key and one item
//! type, so callers can never read a pillar list as values or write to a
//! misspelled key.

use crate::error::{StagingError, StagingResult};
use draftline_core::{AttachmentRecord, ChildKind, DeletionMarker, StagedChild};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Durable key holding the active draft id
pub const DRAFT_ID_KEY: &str = "draftStrategyId";

/// A staged list bound to a durable key
pub trait Namespace: Send + Sync + 'static {
    /// Durable store key
    const KEY: &'static str;

    /// Item type
    type Item: Serialize + DeserializeOwned + Clone + Debug + Send + Sync;

    /// Check that `item` belongs in this namespace
    fn validate(_item: &Self::Item) -> StagingResult<()> {
        Ok(())
    }
}

/// A namespace of staged child items of one kind
pub trait ChildNamespace: Namespace<Item = StagedChild> {
    /// Kind accepted by this namespace
    const KIND: ChildKind;
}

macro_rules! child_namespace {
    ($(#[$doc:meta])* $name:ident, $key:literal, $kind:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl Namespace for $name {
            const KEY: &'static str = $key;
            type Item = StagedChild;

            fn validate(item: &StagedChild) -> StagingResult<()> {
                if item.kind() == $kind {
                    Ok(())
                } else {
                    Err(StagingError::KindMismatch {
                        namespace: $key,
                        expected: $kind,
                        actual: item.kind(),
                    })
                }
            }
        }

        impl ChildNamespace for $name {
            const KIND: ChildKind = $kind;
        }
    };
}

child_namespace!(
    /// Values authored for this strategy
    StagedValues,
    "strategyValues",
    ChildKind::Value
);
child_namespace!(
    /// Pillars authored for this strategy
    StagedPillars,
    "strategyPillars",
    ChildKind::Pillar
);
child_namespace!(
    /// Strategic goals (authored or copied from another strategy)
    SelectedStrategicGoals,
    "selectedStrategicGoals",
    ChildKind::StrategicGoal
);
child_namespace!(
    /// Operational goals (authored or copied from another strategy)
    SelectedOperationalGoals,
    "selectedOperationalGoals",
    ChildKind::OperationalGoal
);
child_namespace!(
    /// Values copied from another strategy
    SelectedValues,
    "selectedValues",
    ChildKind::Value
);
child_namespace!(
    /// Pillars copied from another strategy
    SelectedPillars,
    "selectedPillars",
    ChildKind::Pillar
);

/// Attachments uploaded during this session (already committed)
#[derive(Debug, Clone, Copy, Default)]
pub struct StagedAttachments;

impl Namespace for StagedAttachments {
    const KEY: &'static str = "strategyAttachments";
    type Item = AttachmentRecord;
}

/// Committed items queued for deletion at finalize
#[derive(Debug, Clone, Copy, Default)]
pub struct DeletionMarkers;

impl Namespace for DeletionMarkers {
    const KEY: &'static str = "strategyDeletions";
    type Item = DeletionMarker;
}

/// Every namespace key, in flush order
pub const ALL_KEYS: [&str; 8] = [
    StagedValues::KEY,
    StagedPillars::KEY,
    SelectedStrategicGoals::KEY,
    SelectedOperationalGoals::KEY,
    SelectedValues::KEY,
    SelectedPillars::KEY,
    StagedAttachments::KEY,
    DeletionMarkers::KEY,
];

/// Child namespace keys paired with the kind they hold
pub const CHILD_NAMESPACES: [(&str, ChildKind); 6] = [
    (StagedValues::KEY, StagedValues::KIND),
    (StagedPillars::KEY, StagedPillars::KIND),
    (SelectedStrategicGoals::KEY, SelectedStrategicGoals::KIND),
    (SelectedOperationalGoals::KEY, SelectedOperationalGoals::KIND),
    (SelectedValues::KEY, SelectedValues::KIND),
    (SelectedPillars::KEY, SelectedPillars::KIND),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn keys_are_distinct() {
        let mut keys: HashSet<&str> = ALL_KEYS.into_iter().collect();
        assert_eq!(keys.len(), ALL_KEYS.len());
        assert!(keys.insert(DRAFT_ID_KEY));
    }

    #[test]
    fn child_namespace_validates_kind() {
        use draftline_core::{ChildFields, NamedFields};

        let value = StagedChild::authored(ChildFields::Value(NamedFields::new("Trust")));
        assert!(StagedValues::validate(&value).is_ok());
        assert!(SelectedValues::validate(&value).is_ok());
        assert!(matches!(
            StagedPillars::validate(&value),
            Err(StagingError::KindMismatch { expected: ChildKind::Pillar, .. })
        ));
    }

    #[test]
    fn child_namespaces_cover_every_kind() {
        for kind in ChildKind::ALL {
            assert!(CHILD_NAMESPACES.iter().any(|(_, k)| *k == kind), "{kind} has no namespace");
        }
    }
}
