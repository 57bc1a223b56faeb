//! Attachment upload pipeline
//!
//! Attachments are the one child kind committed eagerly: the blob path is
//! named after the parent id, so bytes and metadata are written as soon as a
//! file is dropped. The staging namespace only tracks what this session added
//! (for list rendering and undo) and which committed attachments are queued
//! for removal at finalize.

use crate::config::ComposerConfig;
use crate::error::{ComposerError, ComposerResult};
use chrono::Utc;
use draftline_core::{
    AttachmentEntry, AttachmentFields, AttachmentRecord, BlobStorage, DeletionMarker,
    PendingFile, PersistenceGateway, RecordId, StorageError, StrategyId,
};
use draftline_staging::{DeletionMarkers, StagedAttachments, StagingStore};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Uploads blobs and registers attachment metadata
#[derive(Clone)]
pub struct AttachmentPipeline {
    gateway: Arc<dyn PersistenceGateway>,
    storage: Arc<dyn BlobStorage>,
    staging: StagingStore,
    config: Arc<ComposerConfig>,
    last_stamp: Arc<AtomicI64>,
}

impl std::fmt::Debug for AttachmentPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachmentPipeline")
            .field("bucket", &self.config.attachment_bucket)
            .finish_non_exhaustive()
    }
}

impl AttachmentPipeline {
    /// Create pipeline
    #[must_use]
    pub fn new(
        gateway: Arc<dyn PersistenceGateway>,
        storage: Arc<dyn BlobStorage>,
        staging: StagingStore,
        config: Arc<ComposerConfig>,
    ) -> Self {
        Self {
            gateway,
            storage,
            staging,
            config,
            last_stamp: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Make sure the attachment bucket is usable
    pub async fn ensure_bucket(&self) -> ComposerResult<()> {
        self.storage
            .ensure_bucket(&self.config.attachment_bucket)
            .await
            .map_err(|e| {
                tracing::error!(bucket = %self.config.attachment_bucket, error = %e, "attachment bucket unavailable");
                ComposerError::StorageUnavailable(e)
            })
    }

    /// Check size and MIME type against configuration
    pub fn validate(&self, file: &PendingFile) -> ComposerResult<()> {
        if file.file_name.trim().is_empty() {
            return Err(ComposerError::Validation("attachment has no file name".into()));
        }
        if !self.config.validate_uploads {
            return Ok(());
        }
        if file.size_bytes() > self.config.max_attachment_bytes {
            return Err(ComposerError::Validation(format!(
                "{} is {} bytes, limit is {}",
                file.file_name,
                file.size_bytes(),
                self.config.max_attachment_bytes
            )));
        }
        if !self.config.accepts_mime(&file.mime_type) {
            return Err(ComposerError::Validation(format!(
                "{} has unsupported type {}",
                file.file_name, file.mime_type
            )));
        }
        Ok(())
    }

    /// Blob path for `file` under `parent`: `<parent>/<unix-millis>.<ext>`
    ///
    /// Stamps are strictly increasing per pipeline so two files dropped in
    /// the same millisecond do not share a path.
    #[must_use]
    pub fn storage_path(&self, parent: StrategyId, file: &PendingFile) -> String {
        let now = Utc::now().timestamp_millis();
        let mut prev = self.last_stamp.load(Ordering::Relaxed);
        let stamp = loop {
            let next = now.max(prev + 1);
            match self
                .last_stamp
                .compare_exchange(prev, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => break next,
                Err(actual) => prev = actual,
            }
        };
        format!("{parent}/{stamp}.{}", file.extension())
    }

    /// Upload bytes and register metadata under `parent`
    ///
    /// # Workflow
    /// 1. Ensure the bucket is usable (`StorageUnavailable` otherwise)
    /// 2. Validate size and type
    /// 3. Transfer the blob
    /// 4. Create the metadata record; on failure the blob is removed again
    pub async fn upload(&self, parent: StrategyId, file: PendingFile) -> ComposerResult<AttachmentRecord> {
        self.ensure_bucket().await?;
        self.validate(&file)?;

        let bucket = &self.config.attachment_bucket;
        let path = self.storage_path(parent, &file);
        let size_bytes = file.size_bytes();
        let stored_path = self.storage.upload(bucket, &path, file.bytes).await?;
        let public_url = self.storage.public_url(bucket, &stored_path);

        let fields = AttachmentFields {
            file_name: file.file_name,
            storage_path: stored_path.clone(),
            public_url,
            size_bytes,
            mime_type: file.mime_type,
        };

        match self.gateway.create_attachment(parent, fields).await {
            Ok(record) => {
                tracing::info!(
                    strategy_id = %parent,
                    attachment_id = %record.id,
                    path = %stored_path,
                    size_bytes,
                    "attachment uploaded"
                );
                Ok(record)
            }
            Err(e) => {
                if let Err(cleanup) = self.storage.remove(bucket, &stored_path).await {
                    tracing::warn!(path = %stored_path, error = %cleanup, "orphaned blob after failed metadata write");
                }
                Err(e.into())
            }
        }
    }

    /// Upload and add the record to this session's attachment list
    pub async fn stage_upload(&self, parent: StrategyId, file: PendingFile) -> ComposerResult<AttachmentRecord> {
        let record = self.upload(parent, file).await?;
        self.staging.append::<StagedAttachments>(record.clone())?;
        Ok(record)
    }

    /// Bring an entry to its committed form
    pub async fn settle(&self, parent: StrategyId, entry: AttachmentEntry) -> ComposerResult<AttachmentRecord> {
        match entry {
            AttachmentEntry::Pending(file) => self.stage_upload(parent, file).await,
            AttachmentEntry::Committed(record) => Ok(record),
        }
    }

    /// Drop an entry from the session list
    ///
    /// A pending entry has nothing stored yet. A committed entry is removed
    /// from the list only; see [`Self::undo_upload`].
    pub fn discard(&self, entry: &AttachmentEntry) -> ComposerResult<()> {
        match entry {
            AttachmentEntry::Pending(file) => {
                tracing::debug!(file_name = %file.file_name, "discarded pending attachment");
                Ok(())
            }
            AttachmentEntry::Committed(record) => self.undo_upload(record.id).map(|_| ()),
        }
    }

    /// Remove an uploaded attachment from the session list
    ///
    /// The blob and metadata stay in place. Returns whether an entry was
    /// removed.
    pub fn undo_upload(&self, id: RecordId) -> ComposerResult<bool> {
        let removed = self.staging.remove::<StagedAttachments, _>(|record| record.id == id)?;
        if removed > 0 {
            tracing::warn!(attachment_id = %id, "upload undone; blob and metadata left orphaned");
        }
        Ok(removed > 0)
    }

    /// Delete a committed attachment now: metadata first, then the blob
    ///
    /// # Workflow
    /// 1. Ensure the bucket is usable; nothing is touched otherwise
    /// 2. Delete the metadata record
    /// 3. Drop the record from the session list
    /// 4. Remove the blob. A blob that is already gone counts as removed;
    ///    any other failure is logged as an orphan and does not fail the call.
    pub async fn delete(&self, id: RecordId) -> ComposerResult<()> {
        self.ensure_bucket().await?;
        let record = self.gateway.get_attachment(id).await?;
        self.gateway.delete_attachment(id).await?;
        self.staging.remove::<StagedAttachments, _>(|r| r.id == id)?;

        let path = &record.fields.storage_path;
        match self.storage.remove(&self.config.attachment_bucket, path).await {
            Ok(()) => {}
            Err(StorageError::NotFound(_)) => {
                tracing::debug!(attachment_id = %id, path = %path, "blob already removed");
            }
            Err(e) => {
                tracing::warn!(attachment_id = %id, path = %path, error = %e, "orphaned blob after attachment delete");
            }
        }
        tracing::info!(attachment_id = %id, path = %path, "attachment deleted");
        Ok(())
    }

    /// Queue a committed attachment for deletion at finalize
    ///
    /// Returns `false` when it was already queued.
    pub fn queue_deletion(&self, id: RecordId) -> ComposerResult<bool> {
        let marker = DeletionMarker::Attachment { id };
        if self.staging.read::<DeletionMarkers>()?.contains(&marker) {
            return Ok(false);
        }
        self.staging.append::<DeletionMarkers>(marker)?;
        Ok(true)
    }

    /// Attachments uploaded in this session
    pub fn staged(&self) -> ComposerResult<Vec<AttachmentRecord>> {
        Ok(self.staging.read::<StagedAttachments>()?)
    }
}
