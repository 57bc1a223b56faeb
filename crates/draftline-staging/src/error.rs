//! Error types for the staging layer
//!
//! Provides error handling for:
//! - Durable local store access (io, bad keys)
//! - Encoding staged lists
//! - Namespace/kind mismatches on append

use draftline_core::ChildKind;
use std::path::PathBuf;

/// Errors from a durable local store
#[derive(Debug, thiserror::Error)]
pub enum LocalStoreError {
    /// IO error reading or writing a key
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Key contains characters the backend cannot store
    #[error("invalid key: '{0}'")]
    InvalidKey(String),

    /// Store cannot be used at all
    #[error("local store unavailable: {0}")]
    Unavailable(String),
}

impl LocalStoreError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors from staging operations
#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    /// Underlying store failed
    #[error("local store error: {0}")]
    LocalStore(#[from] LocalStoreError),

    /// List could not be encoded
    #[error("failed to encode namespace {namespace}: {source}")]
    Encode {
        namespace: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Item kind does not belong in the namespace
    #[error("namespace {namespace} holds {expected} items, got {actual}")]
    KindMismatch {
        namespace: &'static str,
        expected: ChildKind,
        actual: ChildKind,
    },

    /// No staged item with this id
    #[error("no staged item {id} in {namespace}")]
    NotStaged { namespace: &'static str, id: String },
}

/// Result type alias for staging operations
pub type StagingResult<T> = Result<T, StagingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_mismatch_display() {
        let err = StagingError::KindMismatch {
            namespace: "strategyValues",
            expected: ChildKind::Value,
            actual: ChildKind::Pillar,
        };
        assert_eq!(
            err.to_string(),
            "namespace strategyValues holds value items, got pillar"
        );
    }

    #[test]
    fn local_store_error_converts() {
        let err: StagingError = LocalStoreError::InvalidKey("../x".into()).into();
        assert!(matches!(err, StagingError::LocalStore(_)));
    }
}
