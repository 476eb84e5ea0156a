use async_trait::async_trait;
use journal_common::storage::StoragePath;

#[derive(Debug, thiserror::Error)]
pub enum PhotoUrlError {
    #[error("invalid storage path: {0}")]
    InvalidPath(String),
    #[error("photo URL unavailable: {0}")]
    Unavailable(String),
}

/// Turns a photo's storage path into something a view can display.
#[async_trait]
pub trait PhotoUrlResolver: Send + Sync {
    async fn resolve(&self, storage_path: &str) -> Result<String, PhotoUrlError>;
}

/// Resolves paths against the server's public `/photos` mount.
///
/// Existence is not checked; a well-formed path always yields a URL.
#[derive(Clone, Debug)]
pub struct PublicUrlResolver {
    base_url: String,
}

impl PublicUrlResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PhotoUrlResolver for PublicUrlResolver {
    async fn resolve(&self, storage_path: &str) -> Result<String, PhotoUrlError> {
        let path = StoragePath::parse(storage_path)
            .map_err(|e| PhotoUrlError::InvalidPath(e.to_string()))?;
        Ok(format!("{}/photos/{}", self.base_url, path))
    }
}
