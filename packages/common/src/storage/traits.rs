use async_trait::async_trait;

use super::error::StorageError;
use super::path::StoragePath;

/// Bucket of photo objects addressed by [`StoragePath`].
#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Write a new object.
    ///
    /// Never replaces an existing object: a taken path fails with
    /// [`StorageError::AlreadyExists`] and leaves that object untouched.
    async fn put(&self, path: &StoragePath, data: &[u8]) -> Result<(), StorageError>;

    /// Delete an object.
    ///
    /// Returns `true` if the object was deleted, `false` if it did not exist.
    async fn delete(&self, path: &StoragePath) -> Result<bool, StorageError>;
}
