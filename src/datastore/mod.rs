//! Persistence collaborator.
//!
//! Records are schemaless JSON documents grouped into named buckets, with
//! last-writer-wins semantics and no cross-bucket transactions. The services
//! keep an in-memory view of each bucket and write through this store before
//! updating it; startup reconciles the in-memory view via [`RecordStore::list_all`].

pub mod filesystem;
pub mod memory;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{AppError, Result};

/// Bucket holding product records
pub const PRODUCTS_BUCKET: &str = "products";

/// Bucket holding order records
pub const ORDERS_BUCKET: &str = "orders";

/// Record store trait. All operations are idempotent and safe to retry.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch a record, or `None` if it does not exist
    async fn get(&self, bucket: &str, id: &str) -> Result<Option<Value>>;

    /// Store a full record, replacing any existing one
    async fn put(&self, bucket: &str, id: &str, record: Value) -> Result<()>;

    /// Merge the top-level fields of `partial` into an existing record
    async fn update(&self, bucket: &str, id: &str, partial: Value) -> Result<()>;

    /// Delete a record. Deleting a missing record is not an error.
    async fn delete(&self, bucket: &str, id: &str) -> Result<()>;

    /// List every record in a bucket
    async fn list_all(&self, bucket: &str) -> Result<Vec<(String, Value)>>;
}

/// Merge the top-level fields of `partial` into `base`. Both must be JSON
/// objects; nested objects are replaced, not merged.
pub(crate) fn merge_partial(base: &mut Value, partial: Value) -> Result<()> {
    let (Value::Object(base), Value::Object(partial)) = (base, partial) else {
        return Err(AppError::Datastore(
            "partial update requires JSON objects".into(),
        ));
    };
    for (key, value) in partial {
        base.insert(key, value);
    }
    Ok(())
}

/// Reject ids that could escape the bucket when mapped to a path.
pub(crate) fn validate_id(id: &str) -> Result<()> {
    if id.is_empty()
        || id.contains('/')
        || id.contains('\\')
        || id.contains("..")
        || id.starts_with('.')
    {
        return Err(AppError::Datastore(format!("invalid record id: {id:?}")));
    }
    Ok(())
}
