//! Blob storage and identity doubles

use async_trait::async_trait;
use dashmap::DashMap;
use draftline_core::{BlobStorage, IdentityError, IdentityProvider, StorageError, UserId};
use parking_lot::{Mutex, RwLock};

/// Blob storage kept in memory
#[derive(Debug)]
pub struct InMemoryBlobStorage {
    objects: DashMap<(String, String), Vec<u8>>,
    available: RwLock<bool>,
    reject_uploads: RwLock<Option<String>>,
    fail_removes: RwLock<Option<String>>,
    removed: Mutex<Vec<String>>,
}

impl Default for InMemoryBlobStorage {
    fn default() -> Self {
        Self {
            objects: DashMap::new(),
            available: RwLock::new(true),
            reject_uploads: RwLock::new(None),
            fail_removes: RwLock::new(None),
            removed: Mutex::new(Vec::new()),
        }
    }
}

impl InMemoryBlobStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket setup and removal fail while `false`
    pub fn set_available(&self, available: bool) {
        *self.available.write() = available;
    }

    /// Every upload is rejected with `reason`
    pub fn reject_uploads(&self, reason: impl Into<String>) {
        *self.reject_uploads.write() = Some(reason.into());
    }

    /// Every removal fails with a transfer error carrying `reason`
    pub fn fail_removes(&self, reason: impl Into<String>) {
        *self.fail_removes.write() = Some(reason.into());
    }

    #[must_use]
    pub fn contains(&self, bucket: &str, path: &str) -> bool {
        self.objects.contains_key(&(bucket.to_string(), path.to_string()))
    }

    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Paths passed to `remove`, in order
    #[must_use]
    pub fn removed_paths(&self) -> Vec<String> {
        self.removed.lock().clone()
    }
}

#[async_trait]
impl BlobStorage for InMemoryBlobStorage {
    async fn ensure_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        if *self.available.read() {
            Ok(())
        } else {
            Err(StorageError::bucket_unavailable(bucket, "storage offline"))
        }
    }

    async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>) -> Result<String, StorageError> {
        if let Some(reason) = self.reject_uploads.read().clone() {
            return Err(StorageError::Rejected(reason));
        }
        self.objects.insert((bucket.to_string(), path.to_string()), bytes);
        Ok(path.to_string())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("memory://{bucket}/{path}")
    }

    async fn remove(&self, bucket: &str, path: &str) -> Result<(), StorageError> {
        self.removed.lock().push(path.to_string());
        if !*self.available.read() {
            return Err(StorageError::bucket_unavailable(bucket, "storage offline"));
        }
        if let Some(reason) = self.fail_removes.read().clone() {
            return Err(StorageError::Transfer(reason));
        }
        self.objects
            .remove(&(bucket.to_string(), path.to_string()))
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }
}

/// Identity provider with a switchable session
#[derive(Debug)]
pub struct StaticIdentity {
    user: RwLock<Option<UserId>>,
}

impl StaticIdentity {
    #[must_use]
    pub fn signed_in(user: impl Into<String>) -> Self {
        Self {
            user: RwLock::new(Some(UserId::new(user))),
        }
    }

    #[must_use]
    pub fn signed_out() -> Self {
        Self {
            user: RwLock::new(None),
        }
    }

    pub fn sign_out(&self) {
        *self.user.write() = None;
    }

    pub fn sign_in(&self, user: impl Into<String>) {
        *self.user.write() = Some(UserId::new(user));
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn current_user(&self) -> Result<UserId, IdentityError> {
        self.user.read().clone().ok_or(IdentityError::NotAuthenticated)
    }
}
