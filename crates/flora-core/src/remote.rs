//! Remote object-storage backend (GCS, S3) via the `object_store` crate.
//!
//! Credentials come from the ambient environment (`object_store`'s own
//! `from_env` conventions); no provider-specific auth logic lives here.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::ObjectStore;
use object_store::aws::AmazonS3Builder;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::path::Path as StorePath;

use crate::error::{Error, Result};
use crate::storage::{ObjectMeta, StorageBackend};

/// Storage backend over a cloud object-storage bucket.
pub struct ObjectStoreBackend {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl std::fmt::Debug for ObjectStoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreBackend")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl ObjectStoreBackend {
    /// Creates a backend from a bucket spec.
    ///
    /// Accepts `gs://name`, `s3://name`, `s3a://name`, or a bare bucket name
    /// (treated as GCS).
    pub fn from_bucket(bucket: &str) -> Result<Self> {
        let spec = bucket.trim().trim_end_matches('/');
        if spec.is_empty() {
            return Err(Error::InvalidInput("empty bucket spec".to_string()));
        }

        let (name, store): (&str, Arc<dyn ObjectStore>) = if let Some(name) = spec
            .strip_prefix("s3://")
            .or_else(|| spec.strip_prefix("s3a://"))
        {
            let store = AmazonS3Builder::from_env()
                .with_bucket_name(name)
                .build()
                .map_err(|e| Error::storage_with_source(format!("s3 init for '{name}'"), e))?;
            (name, Arc::new(store))
        } else {
            let name = spec.strip_prefix("gs://").unwrap_or(spec);
            let store = GoogleCloudStorageBuilder::from_env()
                .with_bucket_name(name)
                .build()
                .map_err(|e| Error::storage_with_source(format!("gcs init for '{name}'"), e))?;
            (name, Arc::new(store))
        };

        Ok(Self {
            store,
            bucket: name.to_string(),
        })
    }

    /// Wraps an existing `ObjectStore` (primarily tests).
    pub fn with_store(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    /// Returns the bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

fn map_store_error(path: &str, err: object_store::Error) -> Error {
    match err {
        object_store::Error::NotFound { .. } => {
            Error::NotFound(format!("object not found: {path}"))
        }
        other => Error::storage_with_source(format!("object store error at '{path}'"), other),
    }
}

#[async_trait]
impl StorageBackend for ObjectStoreBackend {
    async fn get(&self, path: &str) -> Result<Bytes> {
        let location = StorePath::from(path);
        let result = self
            .store
            .get(&location)
            .await
            .map_err(|e| map_store_error(path, e))?;
        result.bytes().await.map_err(|e| map_store_error(path, e))
    }

    async fn put(&self, path: &str, data: Bytes) -> Result<()> {
        let location = StorePath::from(path);
        self.store
            .put(&location, data.into())
            .await
            .map(|_| ())
            .map_err(|e| map_store_error(path, e))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let location = StorePath::from(path);
        match self.store.delete(&location).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(map_store_error(path, e)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>> {
        let location = if prefix.is_empty() {
            None
        } else {
            Some(StorePath::from(prefix))
        };

        let mut stream = self.store.list(location.as_ref());
        let mut results = Vec::new();
        while let Some(meta) = stream
            .try_next()
            .await
            .map_err(|e| map_store_error(prefix, e))?
        {
            results.push(ObjectMeta {
                path: meta.location.to_string(),
                size: meta.size as u64,
                last_modified: Some(meta.last_modified),
            });
        }
        Ok(results)
    }

    async fn head(&self, path: &str) -> Result<Option<ObjectMeta>> {
        let location = StorePath::from(path);
        match self.store.head(&location).await {
            Ok(meta) => Ok(Some(ObjectMeta {
                path: meta.location.to_string(),
                size: meta.size as u64,
                last_modified: Some(meta.last_modified),
            })),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(map_store_error(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    fn backend() -> ObjectStoreBackend {
        ObjectStoreBackend::with_store(Arc::new(InMemory::new()), "test-bucket")
    }

    #[tokio::test]
    async fn roundtrip_via_in_memory_store() {
        let backend = backend();
        backend
            .put("rose/wh.webp", Bytes::from("petals"))
            .await
            .expect("put should succeed");

        let data = backend.get("rose/wh.webp").await.expect("get should succeed");
        assert_eq!(data, Bytes::from("petals"));

        let listed = backend.list("rose/").await.expect("list should succeed");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].path, "rose/wh.webp");
    }

    #[tokio::test]
    async fn missing_object_maps_to_not_found() {
        let backend = backend();
        let err = backend.get("absent.webp").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(backend.head("absent.webp").await.unwrap().is_none());
    }

    #[test]
    fn from_bucket_rejects_empty_spec() {
        let err = ObjectStoreBackend::from_bucket("  ").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
