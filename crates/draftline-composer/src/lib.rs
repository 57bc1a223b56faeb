//! Draftline Composer - draft staging and finalize workflow
//!
//! Assembles a strategy and its child collections across disconnected
//! screens, then commits the whole composite in one finalize call:
//! - Acquires or recovers the provisional draft record
//! - Uploads attachments eagerly against the draft id
//! - Flushes staged children with per-item failure isolation
//! - Reconciles committed and staged children in edit mode
//! - Copies children across strategies without re-parenting them
//!
//! # Example
//!
//! ```rust,ignore
//! use draftline_composer::{ComposerConfig, StrategyComposer};
//!
//! # async fn example(composer: StrategyComposer) -> Result<(), Box<dyn std::error::Error>> {
//! let session = composer.drafts().acquire(None).await?;
//! composer.stage_child(value("Integrity"))?;
//!
//! let report = composer.finalize(&session, fields).await?;
//! println!("created {} children", report.created_count());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

// Core modules
pub mod attachments;
pub mod composer;
pub mod config;
pub mod draft;
pub mod error;
pub mod finalize;
pub mod reconcile;
pub mod select;

// Re-exports for convenience
pub use attachments::AttachmentPipeline;
pub use composer::StrategyComposer;
pub use config::ComposerConfig;
pub use draft::{DraftManager, DraftSession, SessionMode};
pub use error::{ComposerError, ComposerResult, FinalizeStage};
pub use finalize::{ChildResult, FinalizeOrchestrator, FinalizeReport, FlushAction, ItemOutcome};
pub use reconcile::{ChildPartition, CompositeView, Partitioned, ReconciliationReader};
pub use select::{CopyOnSelect, Selection};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the draft workflow
    pub use crate::{
        ComposerConfig, ComposerError, DraftSession, FinalizeReport, Selection, SessionMode,
        StrategyComposer,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
