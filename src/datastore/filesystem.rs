//! Filesystem record store.
//!
//! One JSON document per record at `<base>/<bucket>/<id>.json`. Writes go to
//! a temp file first and are renamed into place, so a crash mid-write never
//! leaves a truncated record behind.

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use tokio::fs;

use super::{merge_partial, validate_id, RecordStore};
use crate::error::{AppError, Result};

/// Filesystem-based record store
pub struct FilesystemStore {
    base_path: PathBuf,
}

impl FilesystemStore {
    /// Create new filesystem store
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn record_path(&self, bucket: &str, id: &str) -> PathBuf {
        self.base_path.join(bucket).join(format!("{id}.json"))
    }
}

#[async_trait]
impl RecordStore for FilesystemStore {
    async fn get(&self, bucket: &str, id: &str) -> Result<Option<Value>> {
        validate_id(id)?;
        let path = self.record_path(bucket, id);
        match fs::read(&path).await {
            Ok(raw) => {
                let value = serde_json::from_slice(&raw).map_err(|e| {
                    AppError::Datastore(format!("corrupt record {bucket}/{id}: {e}"))
                })?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Datastore(format!(
                "failed to read {bucket}/{id}: {e}"
            ))),
        }
    }

    async fn put(&self, bucket: &str, id: &str, record: Value) -> Result<()> {
        validate_id(id)?;
        let path = self.record_path(bucket, id);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Datastore(format!("failed to create {bucket}: {e}")))?;
        }

        let raw = serde_json::to_vec_pretty(&record)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &raw)
            .await
            .map_err(|e| AppError::Datastore(format!("failed to write {bucket}/{id}: {e}")))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| AppError::Datastore(format!("failed to commit {bucket}/{id}: {e}")))?;

        Ok(())
    }

    async fn update(&self, bucket: &str, id: &str, partial: Value) -> Result<()> {
        let mut record = self
            .get(bucket, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("record {bucket}/{id}")))?;
        merge_partial(&mut record, partial)?;
        self.put(bucket, id, record).await
    }

    async fn delete(&self, bucket: &str, id: &str) -> Result<()> {
        validate_id(id)?;
        let path = self.record_path(bucket, id);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Datastore(format!(
                "failed to delete {bucket}/{id}: {e}"
            ))),
        }
    }

    async fn list_all(&self, bucket: &str) -> Result<Vec<(String, Value)>> {
        let dir = self.base_path.join(bucket);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(AppError::Datastore(format!(
                    "failed to list {bucket}: {e}"
                )))
            }
        };

        let mut records = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::Datastore(format!("failed to list {bucket}: {e}")))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(id) = name.strip_suffix(".json") else {
                continue;
            };
            if let Some(record) = self.get(bucket, id).await? {
                records.push((id.to_string(), record));
            }
        }
        Ok(records)
    }
}
