//! Draftline Core - strategy composite model
//!
//! Shared vocabulary for the draft workflow:
//! - Identifiers for committed and staged records
//! - The strategy, child and attachment model
//! - The draft/committed phase state machine
//! - Collaborator traits for the remote store, blob storage and identity
//!
//! # Example
//!
//! ```rust
//! use draftline_core::{ChildFields, NamedFields, StagedChild, StrategyPhase};
//!
//! let staged = StagedChild::authored(ChildFields::Value(NamedFields::new("Integrity")));
//! assert_eq!(staged.fields.name(), "Integrity");
//! assert!(!StrategyPhase::Committed.can_transition_to(StrategyPhase::Draft));
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod gateway;
pub mod ids;
pub mod model;

pub use error::{EntityKind, GatewayError, GatewayResult, IdentityError, StorageError};
pub use gateway::{BlobStorage, IdentityProvider, PersistenceGateway};
pub use ids::{RecordId, StagedId, StrategyId, UserId};
pub use model::{
    AttachmentEntry, AttachmentFields, AttachmentRecord, ChildFields, ChildKind, ChildRecord,
    DeletionMarker, GoalFields, NamedFields, PendingFile, StagedChild, StagedOrigin, Strategy,
    StrategyFields, StrategyPatch, StrategyPhase,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the strategy model
    pub use crate::{
        BlobStorage, ChildFields, ChildKind, ChildRecord, GatewayError, IdentityProvider,
        PersistenceGateway, RecordId, StagedChild, Strategy, StrategyFields, StrategyId, UserId,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
