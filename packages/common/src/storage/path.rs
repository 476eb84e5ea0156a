use std::fmt;

use uuid::Uuid;

use super::error::StorageError;

const MAX_PATH_LEN: usize = 512;

/// Validated, slash-separated locator of an object inside the photo bucket.
///
/// Segments are non-empty, never start with `.`, and only contain
/// `a-zA-Z0-9`, `-`, `_` and `.`, so a path can always be joined onto a
/// filesystem root or a URL without escaping.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StoragePath(String);

impl StoragePath {
    /// Path of a photo belonging to `owner_id`'s entry: `<owner>/<entry>/<file>`.
    pub fn for_photo(owner_id: &str, entry_id: Uuid, file_name: &str) -> Result<Self, StorageError> {
        Self::parse(&format!("{owner_id}/{entry_id}/{file_name}"))
    }

    pub fn parse(path: &str) -> Result<Self, StorageError> {
        let invalid = |msg: &str| Err(StorageError::InvalidPath(msg.to_string()));

        if path.is_empty() {
            return invalid("path cannot be empty");
        }
        if path.len() > MAX_PATH_LEN {
            return invalid("path exceeds maximum length of 512 characters");
        }
        if path.starts_with('/') || path.ends_with('/') {
            return invalid("path must not start or end with '/'");
        }

        for segment in path.split('/') {
            if segment.is_empty() {
                return invalid("path must not contain empty segments");
            }
            if segment.starts_with('.') {
                return invalid("path segments must not start with '.'");
            }
            if !segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            {
                return invalid("path contains invalid characters (allowed: a-zA-Z0-9, -, _, .)");
            }
        }

        Ok(Self(path.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StoragePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
