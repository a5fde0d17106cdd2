/// Object storage for card assets
///
/// Keys are slash-separated paths scoped to one card, see [`paths`].
/// The disk backend is the default; S3 configuration is accepted but
/// the backend is not implemented yet.
pub mod disk;
pub mod paths;

use crate::config::StorageBackendConfig;
use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use std::sync::Arc;

/// Storage backend interface
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store an object under a key, replacing any existing object.
    async fn put(&self, key: &str, data: Vec<u8>) -> ApiResult<()>;

    /// Read an object, or None when absent.
    async fn get(&self, key: &str) -> ApiResult<Option<Vec<u8>>>;

    /// Delete an object. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> ApiResult<()>;

    /// Whether an object exists.
    async fn exists(&self, key: &str) -> ApiResult<bool>;

    /// Size of an object in bytes, or None when absent.
    async fn size(&self, key: &str) -> ApiResult<Option<u64>>;

    /// List every key under a prefix.
    async fn list_prefix(&self, prefix: &str) -> ApiResult<Vec<String>>;

    /// Delete every object under a prefix, returning the number removed.
    async fn delete_prefix(&self, prefix: &str) -> ApiResult<usize>;

    /// Mark an object publicly readable. Returns false when the backend
    /// manages visibility at a coarser level and the call is a no-op.
    async fn make_public(&self, key: &str) -> ApiResult<bool>;
}

/// Build the configured storage backend.
pub fn build_store(config: &StorageBackendConfig) -> ApiResult<Arc<dyn ObjectStore>> {
    match config {
        StorageBackendConfig::Disk { location } => {
            Ok(Arc::new(disk::DiskObjectStore::new(location.clone())))
        }
        StorageBackendConfig::S3 { .. } => Err(ApiError::Internal(
            "S3 backend not yet implemented".to_string(),
        )),
    }
}
