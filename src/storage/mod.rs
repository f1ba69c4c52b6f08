//! Asset storage backends.
//!
//! Holds opaque binary objects: product images, payment receipts, secure
//! deliverable files and packaged delivery bundles. Keys are namespaced by
//! the caller, e.g. `images/<name>` or `bundles/<token>.zip`.

pub mod filesystem;
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{AppError, Result};

/// A stored object with its content type
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: String,
}

/// Storage backend trait
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store content under the given key, replacing any existing object
    async fn put(&self, key: &str, content: Bytes, content_type: &str) -> Result<()>;

    /// Retrieve an object by key
    async fn get(&self, key: &str) -> Result<StoredObject>;

    /// Check if key exists
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Delete content by key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Reduce an uploaded filename to a safe object-name fragment: path
/// components are stripped and anything outside `[A-Za-z0-9._-]` becomes
/// `_`. Empty input falls back to `"file"`.
pub fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches('.').to_string();
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed
    }
}

/// Validate a storage key: at most one namespace segment plus an object
/// name, neither of which may traverse upward.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && !key.contains("..")
        && !key.starts_with('/')
        && !key.contains('\\')
        && key.split('/').count() <= 2
        && key.split('/').all(|seg| !seg.is_empty() && !seg.starts_with('.'));
    if !valid {
        return Err(AppError::Storage(format!("invalid storage key: {key:?}")));
    }
    Ok(())
}
