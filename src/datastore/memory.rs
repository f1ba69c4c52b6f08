//! In-memory record store, used by tests and ephemeral deployments.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{merge_partial, validate_id, RecordStore};
use crate::error::{AppError, Result};

/// In-memory record store
#[derive(Default)]
pub struct MemoryStore {
    buckets: RwLock<HashMap<String, HashMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, bucket: &str, id: &str) -> Result<Option<Value>> {
        validate_id(id)?;
        let buckets = self.buckets.read().await;
        Ok(buckets.get(bucket).and_then(|b| b.get(id)).cloned())
    }

    async fn put(&self, bucket: &str, id: &str, record: Value) -> Result<()> {
        validate_id(id)?;
        let mut buckets = self.buckets.write().await;
        buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(id.to_string(), record);
        Ok(())
    }

    async fn update(&self, bucket: &str, id: &str, partial: Value) -> Result<()> {
        validate_id(id)?;
        let mut buckets = self.buckets.write().await;
        let record = buckets
            .get_mut(bucket)
            .and_then(|b| b.get_mut(id))
            .ok_or_else(|| AppError::NotFound(format!("record {bucket}/{id}")))?;
        merge_partial(record, partial)
    }

    async fn delete(&self, bucket: &str, id: &str) -> Result<()> {
        validate_id(id)?;
        let mut buckets = self.buckets.write().await;
        if let Some(b) = buckets.get_mut(bucket) {
            b.remove(id);
        }
        Ok(())
    }

    async fn list_all(&self, bucket: &str) -> Result<Vec<(String, Value)>> {
        let buckets = self.buckets.read().await;
        Ok(buckets
            .get(bucket)
            .map(|b| b.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }
}
