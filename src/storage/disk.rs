/// Disk-based object storage backend
use crate::{
    error::{ApiError, ApiResult},
    storage::ObjectStore,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Stores objects on the local filesystem, mirroring the key layout
/// as a directory tree under the base path.
#[derive(Clone)]
pub struct DiskObjectStore {
    base_path: PathBuf,
}

impl DiskObjectStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Keys have already passed segment and filename hygiene, but a
    /// defect upstream must never let a path escape the base.
    fn object_path(&self, key: &str) -> ApiResult<PathBuf> {
        if key.is_empty()
            || key.starts_with('/')
            || key.contains('\\')
            || key.split('/').any(|seg| seg.is_empty() || seg == "..")
        {
            return Err(ApiError::Storage(format!("Invalid object key: {:?}", key)));
        }
        Ok(self.base_path.join(key))
    }

    fn prefix_dir(&self, prefix: &str) -> ApiResult<PathBuf> {
        let trimmed = prefix.trim_end_matches('/');
        self.object_path(trimmed)
    }

    async fn collect_keys(dir: &Path, base: &Path, out: &mut Vec<String>) -> ApiResult<()> {
        let mut stack = vec![dir.to_path_buf()];
        while let Some(current) = stack.pop() {
            let mut entries = match fs::read_dir(&current).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(ApiError::Storage(format!(
                        "Failed to list {}: {}",
                        current.display(),
                        e
                    )))
                }
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| ApiError::Storage(format!("Failed to list objects: {}", e)))?
            {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if let Ok(relative) = path.strip_prefix(base) {
                    out.push(relative.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for DiskObjectStore {
    async fn put(&self, key: &str, data: Vec<u8>) -> ApiResult<()> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                ApiError::Storage(format!("Failed to create object directory: {}", e))
            })?;
        }

        fs::write(&path, data)
            .await
            .map_err(|e| ApiError::Storage(format!("Failed to write object {}: {}", key, e)))?;

        Ok(())
    }

    async fn get(&self, key: &str) -> ApiResult<Option<Vec<u8>>> {
        let path = self.object_path(key)?;

        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ApiError::Storage(format!(
                "Failed to read object {}: {}",
                key, e
            ))),
        }
    }

    async fn delete(&self, key: &str) -> ApiResult<()> {
        let path = self.object_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ApiError::Storage(format!(
                "Failed to delete object {}: {}",
                key, e
            ))),
        }
    }

    async fn exists(&self, key: &str) -> ApiResult<bool> {
        Ok(self.object_path(key)?.is_file())
    }

    async fn size(&self, key: &str) -> ApiResult<Option<u64>> {
        let path = self.object_path(key)?;

        match fs::metadata(&path).await {
            Ok(metadata) => Ok(Some(metadata.len())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ApiError::Storage(format!(
                "Failed to stat object {}: {}",
                key, e
            ))),
        }
    }

    async fn list_prefix(&self, prefix: &str) -> ApiResult<Vec<String>> {
        let dir = self.prefix_dir(prefix)?;
        let mut keys = Vec::new();
        Self::collect_keys(&dir, &self.base_path, &mut keys).await?;
        keys.sort();
        Ok(keys)
    }

    async fn delete_prefix(&self, prefix: &str) -> ApiResult<usize> {
        let keys = self.list_prefix(prefix).await?;
        let count = keys.len();
        for key in &keys {
            self.delete(key).await?;
        }

        // Remove the now-empty directory tree
        let dir = self.prefix_dir(prefix)?;
        if dir.is_dir() {
            if let Err(e) = fs::remove_dir_all(&dir).await {
                tracing::warn!(prefix = %prefix, error = %e, "Failed to remove empty prefix directory");
            }
        }

        Ok(count)
    }

    async fn make_public(&self, _key: &str) -> ApiResult<bool> {
        // Disk objects are served through the API, there is no per-object ACL.
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, DiskObjectStore) {
        let dir = tempdir().unwrap();
        let store = DiskObjectStore::new(dir.path().to_path_buf());
        (dir, store)
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let (_dir, store) = store();

        store
            .put("algebra/tag1/cours.pdf", b"content".to_vec())
            .await
            .unwrap();

        let data = store.get("algebra/tag1/cours.pdf").await.unwrap();
        assert_eq!(data, Some(b"content".to_vec()));
    }

    #[tokio::test]
    async fn test_get_absent_key() {
        let (_dir, store) = store();
        assert_eq!(store.get("algebra/tag1/missing.pdf").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (_dir, store) = store();

        store.put("a/tag1/f.txt", b"x".to_vec()).await.unwrap();
        store.delete("a/tag1/f.txt").await.unwrap();
        store.delete("a/tag1/f.txt").await.unwrap();
        assert!(!store.exists("a/tag1/f.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_size() {
        let (_dir, store) = store();

        store.put("a/tag1/f.txt", b"12345".to_vec()).await.unwrap();
        assert_eq!(store.size("a/tag1/f.txt").await.unwrap(), Some(5));
        assert_eq!(store.size("a/tag1/g.txt").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_prefix_recurses() {
        let (_dir, store) = store();

        store.put("a/tag1/f.txt", b"x".to_vec()).await.unwrap();
        store
            .put("a/tag1/imagesQuizz/q1.png", b"y".to_vec())
            .await
            .unwrap();
        store.put("a/tag2/other.txt", b"z".to_vec()).await.unwrap();

        let keys = store.list_prefix("a/tag1/").await.unwrap();
        assert_eq!(keys, vec!["a/tag1/f.txt", "a/tag1/imagesQuizz/q1.png"]);
    }

    #[tokio::test]
    async fn test_delete_prefix() {
        let (_dir, store) = store();

        store.put("a/tag1/f.txt", b"x".to_vec()).await.unwrap();
        store
            .put("a/tag1/imagesQuizz/q1.png", b"y".to_vec())
            .await
            .unwrap();

        let removed = store.delete_prefix("a/tag1/").await.unwrap();
        assert_eq!(removed, 2);
        assert!(store.list_prefix("a/tag1/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_traversal_keys() {
        let (_dir, store) = store();
        assert!(store.get("../outside").await.is_err());
        assert!(store.get("/absolute").await.is_err());
        assert!(store.get("a//b").await.is_err());
    }
}
