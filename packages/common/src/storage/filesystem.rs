use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use super::error::StorageError;
use super::path::StoragePath;
use super::traits::PhotoStore;

/// Filesystem-backed photo bucket.
///
/// Objects live at `{base_path}/{storage_path}`, so the directory can be
/// served as-is under a public URL prefix.
pub struct FilesystemPhotoStore {
    base_path: PathBuf,
    max_size: u64,
}

impl FilesystemPhotoStore {
    /// Create the store, creating `base_path` and its staging directory.
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    fn object_path(&self, path: &StoragePath) -> PathBuf {
        path.segments()
            .fold(self.base_path.clone(), |acc, segment| acc.join(segment))
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl PhotoStore for FilesystemPhotoStore {
    async fn put(&self, path: &StoragePath, data: &[u8]) -> Result<(), StorageError> {
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let object_path = self.object_path(path);
        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(parent) = object_path.parent()
            && let Err(e) = fs::create_dir_all(parent).await
        {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        // A hard link fails on an existing target, unlike rename.
        let linked = fs::hard_link(&temp_path, &object_path).await;
        let _ = fs::remove_file(&temp_path).await;
        match linked {
            Ok(()) => {
                tracing::debug!(path = %path, bytes = data.len(), "Stored photo object");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(StorageError::AlreadyExists(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, path: &StoragePath) -> Result<bool, StorageError> {
        match fs::remove_file(self.object_path(path)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
