//! Local-filesystem storage backend.
//!
//! Backs curation runs against a directory tree of per-flower, per-color
//! image files. Keys are forward-slash paths relative to the configured
//! root; anything that would escape the root is rejected up front.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::storage::{ObjectMeta, StorageBackend};

/// Storage backend rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalFsBackend {
    root: PathBuf,
}

impl LocalFsBackend {
    /// Creates a backend rooted at `root`.
    ///
    /// The directory does not need to exist yet; it is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the configured root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a key to an absolute path under the root.
    ///
    /// Rejects absolute keys and any `..` component so a crafted key can
    /// never read or write outside the root.
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        for component in relative.components() {
            match component {
                Component::Normal(_) => {}
                _ => {
                    return Err(Error::InvalidInput(format!(
                        "path escapes storage root: {key}"
                    )));
                }
            }
        }
        Ok(self.root.join(relative))
    }
}

fn io_error(path: &str, err: &std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::NotFound(format!("object not found: {path}"))
    } else {
        Error::storage(format!("io error at '{path}': {err}"))
    }
}

fn modified_timestamp(meta: &std::fs::Metadata) -> Option<DateTime<Utc>> {
    meta.modified().ok().map(DateTime::<Utc>::from)
}

#[async_trait]
impl StorageBackend for LocalFsBackend {
    async fn get(&self, path: &str) -> Result<Bytes> {
        let full = self.resolve(path)?;
        match tokio::fs::read(&full).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) => Err(io_error(path, &e)),
        }
    }

    async fn put(&self, path: &str, data: Bytes) -> Result<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(path, &e))?;
        }
        tokio::fs::write(&full, &data)
            .await
            .map_err(|e| io_error(path, &e))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full = self.resolve(path)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(path, &e)),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>> {
        if !self.root.is_dir() {
            return Err(Error::NotFound(format!(
                "asset root not found: {}",
                self.root.display()
            )));
        }

        let mut results = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| io_error(&dir.display().to_string(), &e))?;

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| io_error(&dir.display().to_string(), &e))?
            {
                let entry_path = entry.path();
                let meta = entry
                    .metadata()
                    .await
                    .map_err(|e| io_error(&entry_path.display().to_string(), &e))?;

                if meta.is_dir() {
                    pending.push(entry_path);
                    continue;
                }

                let Ok(relative) = entry_path.strip_prefix(&self.root) else {
                    continue;
                };
                let key = relative
                    .components()
                    .filter_map(|c| c.as_os_str().to_str())
                    .collect::<Vec<_>>()
                    .join("/");
                if !key.starts_with(prefix) {
                    continue;
                }

                results.push(ObjectMeta {
                    path: key,
                    size: meta.len(),
                    last_modified: modified_timestamp(&meta),
                });
            }
        }

        Ok(results)
    }

    async fn head(&self, path: &str) -> Result<Option<ObjectMeta>> {
        let full = self.resolve(path)?;
        match tokio::fs::metadata(&full).await {
            Ok(meta) if meta.is_file() => Ok(Some(ObjectMeta {
                path: path.to_string(),
                size: meta.len(),
                last_modified: modified_timestamp(&meta),
            })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(path, &e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalFsBackend::new(dir.path());

        backend
            .put("rose/wh.webp", Bytes::from("petals"))
            .await
            .expect("put should succeed");

        let data = backend.get("rose/wh.webp").await.expect("get should succeed");
        assert_eq!(data, Bytes::from("petals"));
    }

    #[tokio::test]
    async fn list_walks_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalFsBackend::new(dir.path());

        backend.put("rose/wh.webp", Bytes::from("a")).await.unwrap();
        backend.put("rose/rd.webp", Bytes::from("b")).await.unwrap();
        backend.put("tulip/yl.webp", Bytes::from("c")).await.unwrap();

        let mut all = backend.list("").await.expect("list should succeed");
        all.sort_by(|a, b| a.path.cmp(&b.path));
        let keys: Vec<&str> = all.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(keys, vec!["rose/rd.webp", "rose/wh.webp", "tulip/yl.webp"]);

        let roses = backend.list("rose/").await.unwrap();
        assert_eq!(roses.len(), 2);
    }

    #[tokio::test]
    async fn list_missing_root_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalFsBackend::new(dir.path().join("nope"));

        let err = backend.list("").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn traversal_outside_root_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalFsBackend::new(dir.path());

        let err = backend.get("../escape.webp").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = backend.put("/etc/passwd", Bytes::from("x")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn delete_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalFsBackend::new(dir.path());
        backend.delete("rose/wh.webp").await.expect("delete should succeed");
    }
}
