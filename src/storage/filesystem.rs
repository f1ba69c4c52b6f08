//! Filesystem storage backend.
//!
//! Objects land at `<base>/<key>`; the content type is kept in a small
//! `.meta` sidecar next to the object so it survives restarts.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{validate_key, StorageBackend, StoredObject};
use crate::error::{AppError, Result};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Serialize, Deserialize)]
struct ObjectMeta {
    content_type: String,
}

/// Filesystem-based storage backend
pub struct FilesystemStorage {
    base_path: PathBuf,
}

impl FilesystemStorage {
    /// Create new filesystem storage
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn key_to_path(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{key}.meta"))
    }
}

#[async_trait]
impl StorageBackend for FilesystemStorage {
    async fn put(&self, key: &str, content: Bytes, content_type: &str) -> Result<()> {
        validate_key(key)?;
        let path = self.key_to_path(key);

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write content
        let mut file = fs::File::create(&path).await?;
        file.write_all(&content).await?;
        file.sync_all().await?;

        let meta = serde_json::to_vec(&ObjectMeta {
            content_type: content_type.to_string(),
        })?;
        fs::write(self.meta_path(key), meta).await?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<StoredObject> {
        validate_key(key)?;
        let path = self.key_to_path(key);
        let content = fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::NotFound(format!("object {key}"))
            } else {
                AppError::Storage(format!("Failed to read {key}: {e}"))
            }
        })?;

        let content_type = match fs::read(self.meta_path(key)).await {
            Ok(raw) => serde_json::from_slice::<ObjectMeta>(&raw)
                .map(|m| m.content_type)
                .unwrap_or_else(|_| FALLBACK_CONTENT_TYPE.to_string()),
            Err(_) => FALLBACK_CONTENT_TYPE.to_string(),
        };

        Ok(StoredObject {
            data: Bytes::from(content),
            content_type,
        })
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        Ok(self.key_to_path(key).exists())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        match fs::remove_file(self.key_to_path(key)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(AppError::Storage(format!("Failed to delete {key}: {e}"))),
        }
        let _ = fs::remove_file(self.meta_path(key)).await;
        Ok(())
    }
}
