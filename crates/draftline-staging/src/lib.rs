//! Draftline Staging - reload-surviving staging of uncommitted items
//!
//! The trusted local side of the draft workflow.
//!
//! # Core Operations
//!
//! - **Read**: load a typed staged list from the durable store
//! - **Mutate**: `append` / `remove` / `replace` / `clear`, each written
//!   through to the durable store before returning
//! - **Draft key**: record, read and forget the active draft id
//!
//! # Architecture
//!
//! ```text
//! screen → StagingStore<N: Namespace> → serde_json → DurableLocalStore (memory | files)
//! ```
//!
//! # Example
//!
//! ```rust
//! use draftline_core::{ChildFields, NamedFields, StagedChild};
//! use draftline_staging::{MemoryLocalStore, StagedValues, StagingStore};
//! use std::sync::Arc;
//!
//! let staging = StagingStore::new(Arc::new(MemoryLocalStore::new()));
//! staging
//!     .append::<StagedValues>(StagedChild::authored(ChildFields::Value(NamedFields::new("Trust"))))
//!     .unwrap();
//! assert_eq!(staging.len::<StagedValues>().unwrap(), 1);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod local_store;
pub mod namespace;
pub mod store;

pub use error::{LocalStoreError, StagingError, StagingResult};
pub use local_store::{DurableLocalStore, FileLocalStore, MemoryLocalStore};
pub use namespace::{
    ChildNamespace, DeletionMarkers, Namespace, SelectedOperationalGoals, SelectedPillars,
    SelectedStrategicGoals, SelectedValues, StagedAttachments, StagedPillars, StagedValues,
    ALL_KEYS, CHILD_NAMESPACES, DRAFT_ID_KEY,
};
pub use store::{StagingSnapshot, StagingStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
