//! Collaborator traits
//!
//! The remote store, the blob bucket and the identity provider are external
//! systems. Everything above this crate talks to them only through these
//! traits.

use crate::error::{GatewayResult, IdentityError, StorageError};
use crate::ids::{RecordId, StrategyId, UserId};
use crate::model::{
    AttachmentFields, AttachmentRecord, ChildFields, ChildKind, ChildRecord, Strategy,
    StrategyFields, StrategyPatch,
};
use async_trait::async_trait;

/// Remote CRUD per entity type
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Create a strategy owned by `owner`
    async fn create_strategy(
        &self,
        owner: &UserId,
        fields: StrategyFields,
        is_draft: bool,
    ) -> GatewayResult<Strategy>;

    /// Update a strategy
    async fn update_strategy(&self, id: StrategyId, patch: StrategyPatch) -> GatewayResult<Strategy>;

    /// Fetch a strategy (`NotFound` if absent)
    async fn get_strategy(&self, id: StrategyId) -> GatewayResult<Strategy>;

    /// Delete a strategy and its children
    async fn delete_strategy(&self, id: StrategyId) -> GatewayResult<()>;

    /// Create a child record under `strategy_id`
    async fn create_child(&self, strategy_id: StrategyId, fields: ChildFields) -> GatewayResult<ChildRecord>;

    /// Replace a child record's fields
    async fn update_child(&self, id: RecordId, fields: ChildFields) -> GatewayResult<ChildRecord>;

    /// Delete a child record
    async fn delete_child(&self, kind: ChildKind, id: RecordId) -> GatewayResult<()>;

    /// List children of one kind for a strategy
    async fn list_children(&self, kind: ChildKind, strategy_id: StrategyId) -> GatewayResult<Vec<ChildRecord>>;

    /// Search children of one kind across all strategies owned by `owner`
    async fn search_children(
        &self,
        owner: &UserId,
        kind: ChildKind,
        term: &str,
    ) -> GatewayResult<Vec<ChildRecord>>;

    /// Register attachment metadata
    async fn create_attachment(
        &self,
        strategy_id: StrategyId,
        fields: AttachmentFields,
    ) -> GatewayResult<AttachmentRecord>;

    /// Fetch attachment metadata
    async fn get_attachment(&self, id: RecordId) -> GatewayResult<AttachmentRecord>;

    /// Delete attachment metadata
    async fn delete_attachment(&self, id: RecordId) -> GatewayResult<()>;

    /// List attachments for a strategy
    async fn list_attachments(&self, strategy_id: StrategyId) -> GatewayResult<Vec<AttachmentRecord>>;
}

/// Binary object storage
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Verify that `bucket` exists and is writable
    async fn ensure_bucket(&self, bucket: &str) -> Result<(), StorageError>;

    /// Store bytes at `path`; returns the stored path
    async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>) -> Result<String, StorageError>;

    /// Public URL for a stored path
    fn public_url(&self, bucket: &str, path: &str) -> String;

    /// Remove a stored object
    async fn remove(&self, bucket: &str, path: &str) -> Result<(), StorageError>;
}

/// Current-user lookup
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The authenticated user
    async fn current_user(&self) -> Result<UserId, IdentityError>;
}
