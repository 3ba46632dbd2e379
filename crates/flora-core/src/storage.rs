//! Storage backend abstraction for asset bytes (memory, local filesystem, object storage).
//!
//! This module defines the contract shared by every backend that can hold
//! flower image assets. The same trait backs both sides of the discovery
//! collaborator: a local directory tree during curation and a remote bucket
//! in production. Paths are forward-slash separated keys relative to the
//! backend root; no backend-specific prefix ever leaks to callers.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// Metadata about a stored object.
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    /// Object path (key), relative to the backend root.
    pub path: String,
    /// Object size in bytes.
    pub size: u64,
    /// Last modification timestamp, when the backend tracks one.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Storage backend trait for asset bytes.
///
/// All backends (memory, local filesystem, remote object storage) implement
/// this trait. The contract is read-heavy: reconciliation lists and reads;
/// only snapshot publication writes.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Reads an entire object.
    ///
    /// Returns `Error::NotFound` if the object doesn't exist.
    async fn get(&self, path: &str) -> Result<Bytes>;

    /// Writes an object, replacing any existing content.
    async fn put(&self, path: &str, data: Bytes) -> Result<()>;

    /// Deletes an object.
    ///
    /// Succeeds even if the object doesn't exist (idempotent).
    async fn delete(&self, path: &str) -> Result<()>;

    /// Lists objects with the given prefix.
    ///
    /// Returns an empty vec if no objects match.
    ///
    /// **Ordering**: results come back in arbitrary order that may vary
    /// between backends and invocations. Callers requiring deterministic
    /// order must sort (reconciliation sorts by `path`).
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>>;

    /// Gets object metadata without reading content.
    ///
    /// Returns `None` if the object doesn't exist.
    async fn head(&self, path: &str) -> Result<Option<ObjectMeta>>;
}

/// In-memory storage backend for testing.
///
/// Thread-safe via `RwLock`. Not suitable for production.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    objects: Arc<RwLock<HashMap<String, StoredObject>>>,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    last_modified: DateTime<Utc>,
}

impl MemoryBackend {
    /// Creates a new empty memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_poisoned() -> Error {
    Error::Internal {
        message: "lock poisoned".into(),
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, path: &str) -> Result<Bytes> {
        let objects = self.objects.read().map_err(|_| lock_poisoned())?;
        objects
            .get(path)
            .map(|o| o.data.clone())
            .ok_or_else(|| Error::NotFound(format!("object not found: {path}")))
    }

    async fn put(&self, path: &str, data: Bytes) -> Result<()> {
        let mut objects = self.objects.write().map_err(|_| lock_poisoned())?;
        objects.insert(
            path.to_string(),
            StoredObject {
                data,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.objects
            .write()
            .map_err(|_| lock_poisoned())?
            .remove(path);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>> {
        let objects = self.objects.read().map_err(|_| lock_poisoned())?;
        Ok(objects
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(path, obj)| ObjectMeta {
                path: path.clone(),
                size: obj.data.len() as u64,
                last_modified: Some(obj.last_modified),
            })
            .collect())
    }

    async fn head(&self, path: &str) -> Result<Option<ObjectMeta>> {
        let objects = self.objects.read().map_err(|_| lock_poisoned())?;
        Ok(objects.get(path).map(|obj| ObjectMeta {
            path: path.to_string(),
            size: obj.data.len() as u64,
            last_modified: Some(obj.last_modified),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend_roundtrip() {
        let backend = MemoryBackend::new();
        let data = Bytes::from("petal bytes");

        backend
            .put("rose/wh.webp", data.clone())
            .await
            .expect("put should succeed");

        let retrieved = backend.get("rose/wh.webp").await.expect("get should succeed");
        assert_eq!(retrieved, data);
    }

    #[tokio::test]
    async fn get_missing_object_is_not_found() {
        let backend = MemoryBackend::new();
        let err = backend.get("tulip/rd.webp").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn list_filters_by_prefix() {
        let backend = MemoryBackend::new();
        backend.put("rose/wh.webp", Bytes::from("a")).await.unwrap();
        backend.put("rose/rd.webp", Bytes::from("b")).await.unwrap();
        backend.put("tulip/wh.webp", Bytes::from("c")).await.unwrap();

        let roses = backend.list("rose/").await.expect("list should succeed");
        assert_eq!(roses.len(), 2);

        let tulips = backend.list("tulip/").await.expect("list should succeed");
        assert_eq!(tulips.len(), 1);
    }

    #[tokio::test]
    async fn head_reports_size_and_timestamp() {
        let backend = MemoryBackend::new();
        backend.put("rose/wh.webp", Bytes::from("1234")).await.unwrap();

        let meta = backend
            .head("rose/wh.webp")
            .await
            .expect("head should succeed")
            .expect("object should exist");
        assert_eq!(meta.size, 4);
        assert!(meta.last_modified.is_some());

        assert!(backend.head("absent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let backend = MemoryBackend::new();
        backend.put("rose/wh.webp", Bytes::from("x")).await.unwrap();

        backend.delete("rose/wh.webp").await.expect("delete should succeed");
        backend.delete("rose/wh.webp").await.expect("second delete should succeed");
        assert!(backend.head("rose/wh.webp").await.unwrap().is_none());
    }
}
