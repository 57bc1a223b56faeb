//! Error types for collaborator calls
//!
//! Provides the error surface of the external systems:
//! - Persistence gateway failures (network, validation, conflict, not found)
//! - Blob storage failures (bucket unavailable, rejected uploads)
//! - Identity lookups

use crate::ids::UserId;

/// Entity kinds as named in gateway errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Parent strategy
    Strategy,
    /// Strategic goal
    StrategicGoal,
    /// Operational goal
    OperationalGoal,
    /// Value
    Value,
    /// Pillar
    Pillar,
    /// Attachment metadata
    Attachment,
}

impl From<crate::model::ChildKind> for EntityKind {
    fn from(kind: crate::model::ChildKind) -> Self {
        use crate::model::ChildKind;
        match kind {
            ChildKind::StrategicGoal => Self::StrategicGoal,
            ChildKind::OperationalGoal => Self::OperationalGoal,
            ChildKind::Value => Self::Value,
            ChildKind::Pillar => Self::Pillar,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Strategy => "strategy",
            EntityKind::StrategicGoal => "strategic_goal",
            EntityKind::OperationalGoal => "operational_goal",
            EntityKind::Value => "value",
            EntityKind::Pillar => "pillar",
            EntityKind::Attachment => "attachment",
        };
        f.write_str(name)
    }
}

/// Persistence gateway errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Transport failure
    #[error("network error: {0}")]
    Network(String),

    /// Payload rejected by the store
    #[error("validation failed: {0}")]
    Validation(String),

    /// Write conflicts with current record state
    #[error("conflict: {0}")]
    Conflict(String),

    /// Record does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// Caller has no session
    #[error("user not authenticated")]
    NotAuthenticated,
}

impl GatewayError {
    /// Create not found error
    pub fn not_found(kind: EntityKind, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Check if this is a not-found error
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Blob storage errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// Bucket missing or inaccessible
    #[error("storage bucket unavailable: {bucket}: {reason}")]
    BucketUnavailable { bucket: String, reason: String },

    /// Payload rejected (size, type, policy)
    #[error("upload rejected: {0}")]
    Rejected(String),

    /// Transfer failed
    #[error("transfer failed: {0}")]
    Transfer(String),

    /// Object does not exist
    #[error("object not found: {0}")]
    NotFound(String),
}

impl StorageError {
    /// Create bucket unavailable error
    pub fn bucket_unavailable(bucket: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::BucketUnavailable {
            bucket: bucket.into(),
            reason: reason.into(),
        }
    }
}

/// Identity provider errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// No authenticated user
    #[error("user not authenticated")]
    NotAuthenticated,

    /// User is known but not allowed to act on this record
    #[error("user {user} is not allowed to {action}")]
    Forbidden { user: UserId, action: String },
}

/// Result alias for gateway calls
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChildKind;

    #[test]
    fn gateway_error_display() {
        let err = GatewayError::not_found(EntityKind::Strategy, "abc");
        assert_eq!(err.to_string(), "strategy not found: abc");
        assert!(err.is_not_found());
    }

    #[test]
    fn only_network_errors_are_retryable() {
        assert!(GatewayError::Network("timeout".into()).is_retryable());
        assert!(!GatewayError::Validation("name".into()).is_retryable());
        assert!(!GatewayError::Conflict("phase".into()).is_retryable());
    }

    #[test]
    fn child_kind_maps_to_entity_kind() {
        assert_eq!(EntityKind::from(ChildKind::Pillar), EntityKind::Pillar);
        assert_eq!(EntityKind::from(ChildKind::StrategicGoal).to_string(), "strategic_goal");
    }

    #[test]
    fn storage_error_display() {
        let err = StorageError::bucket_unavailable("strategy-attachments", "policy denied");
        assert!(err.to_string().contains("strategy-attachments"));
    }
}
