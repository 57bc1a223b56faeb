//! Error types for the composer
//!
//! Provides error handling for:
//! - Missing or rejected sessions
//! - Fatal parent-update failures during finalize
//! - Blob storage failures during upload
//! - Staging and configuration problems

use draftline_core::{GatewayError, IdentityError, StorageError};
use draftline_staging::StagingError;

/// Main composer error type
#[derive(Debug, thiserror::Error)]
pub enum ComposerError {
    /// No authenticated user; nothing was mutated
    #[error("user not authenticated")]
    NotAuthenticated,

    /// Authenticated user may not perform the action
    #[error("identity error: {0}")]
    Identity(IdentityError),

    /// A blocking step failed; the composite was not committed
    #[error("finalize aborted at {stage}: {source}")]
    Fatal {
        /// Step that failed
        stage: FinalizeStage,
        /// Underlying gateway error
        #[source]
        source: GatewayError,
    },

    /// Blob bucket missing or inaccessible
    #[error("attachment storage unavailable: {0}")]
    StorageUnavailable(#[source] StorageError),

    /// Blob transfer or removal failed
    #[error("storage error: {0}")]
    Storage(#[source] StorageError),

    /// Remote store call failed
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Local staging failed
    #[error("staging error: {0}")]
    Staging(#[from] StagingError),

    /// Input rejected before any remote call
    #[error("validation failed: {0}")]
    Validation(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl ComposerError {
    /// Create a fatal error for `stage`
    #[inline]
    pub fn fatal(stage: FinalizeStage, source: GatewayError) -> Self {
        Self::Fatal { stage, source }
    }

    /// Check if error aborted a finalize (staging kept for retry)
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. } | Self::NotAuthenticated)
    }

    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Fatal { source, .. } | Self::Gateway(source) => source.is_retryable(),
            Self::StorageUnavailable(_) => true,
            Self::Storage(e) => matches!(e, StorageError::Transfer(_)),
            _ => false,
        }
    }
}

impl From<IdentityError> for ComposerError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::NotAuthenticated => Self::NotAuthenticated,
            other => Self::Identity(other),
        }
    }
}

impl From<StorageError> for ComposerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::BucketUnavailable { .. } => Self::StorageUnavailable(err),
            other => Self::Storage(other),
        }
    }
}

/// Blocking finalize steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FinalizeStage {
    /// Committing the parent record
    ParentUpdate,
}

impl std::fmt::Display for FinalizeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FinalizeStage::ParentUpdate => f.write_str("parent update"),
        }
    }
}

/// Result alias for composer operations
pub type ComposerResult<T> = Result<T, ComposerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use draftline_core::UserId;

    #[test]
    fn identity_errors_map_to_not_authenticated() {
        let err: ComposerError = IdentityError::NotAuthenticated.into();
        assert!(matches!(err, ComposerError::NotAuthenticated));
        assert!(err.is_fatal());

        let err: ComposerError = IdentityError::Forbidden {
            user: UserId::new("u1"),
            action: "finalize".into(),
        }
        .into();
        assert!(matches!(err, ComposerError::Identity(_)));
    }

    #[test]
    fn bucket_errors_map_to_storage_unavailable() {
        let err: ComposerError = StorageError::bucket_unavailable("b", "gone").into();
        assert!(matches!(err, ComposerError::StorageUnavailable(_)));

        let err: ComposerError = StorageError::Rejected("too big".into()).into();
        assert!(matches!(err, ComposerError::Storage(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn fatal_retryability_follows_source() {
        let err = ComposerError::fatal(
            FinalizeStage::ParentUpdate,
            GatewayError::Network("reset".into()),
        );
        assert!(err.is_fatal());
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "finalize aborted at parent update: network error: reset");

        let err = ComposerError::fatal(
            FinalizeStage::ParentUpdate,
            GatewayError::Validation("name".into()),
        );
        assert!(!err.is_retryable());
    }
}
