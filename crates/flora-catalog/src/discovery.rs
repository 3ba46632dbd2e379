//! Discovery and encode collaborators.
//!
//! Discovery yields the raw asset listing a reconciliation run consumes:
//! a finite set of `(raw entity label, raw color label, origin path)`
//! descriptors plus a byte-read capability. The same contract is served by
//! a local directory tree and a remote bucket via [`StorageAssetSource`]
//! over any `flora_core::StorageBackend`.
//!
//! A listing is not restartable mid-stream; the reconciler issues a fresh
//! `discover` call per run.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use flora_core::StorageBackend;

use crate::error::{CatalogError, Result};

/// One discovered raw asset, labels still unresolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawAsset {
    /// Raw entity label (folder name, legacy spelling and all).
    pub entity_label: String,
    /// Raw color label (file stem).
    pub color_label: String,
    /// Origin path within the backing store.
    pub origin_path: String,
}

/// The result of one discovery call.
#[derive(Clone, Debug, Default)]
pub struct DiscoveryListing {
    /// Assets whose paths matched the expected shape.
    pub assets: Vec<RawAsset>,
    /// Paths that did not match `<entity>/<color>.<ext>` and were skipped.
    pub unrecognized: Vec<String>,
}

/// Produces raw asset listings and reads individual assets.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Lists the full raw asset set.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Discovery` when the root listing itself is
    /// unreachable. This is the only error that aborts a whole run.
    async fn discover(&self) -> Result<DiscoveryListing>;

    /// Reads one asset's bytes.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::AssetRead`; the reconciler skips the asset
    /// and records the failure, the run continues.
    async fn read(&self, origin_path: &str) -> Result<Bytes>;
}

/// Asset source over any storage backend.
///
/// Derives labels from object paths of the shape
/// `{prefix}<entity>/<color>.<ext>`; anything else under the prefix is
/// reported as unrecognized.
#[derive(Clone)]
pub struct StorageAssetSource {
    backend: Arc<dyn StorageBackend>,
    prefix: String,
    io_timeout: Duration,
}

const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(30);

impl StorageAssetSource {
    /// Creates a source over `backend`, listing under `prefix`.
    ///
    /// A non-empty prefix is normalized to end with `/`.
    pub fn new(backend: Arc<dyn StorageBackend>, prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        if !prefix.is_empty() && !prefix.ends_with('/') {
            prefix.push('/');
        }
        Self {
            backend,
            prefix,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }

    /// Overrides the per-call I/O timeout.
    #[must_use]
    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    fn parse_key(&self, key: &str) -> Option<RawAsset> {
        let relative = key.strip_prefix(&self.prefix)?;
        let (entity, file) = relative.split_once('/')?;
        // Exactly one directory level: deeper nesting is not a catalog asset.
        if file.is_empty() || file.contains('/') {
            return None;
        }
        // Only known image formats are catalog assets; snapshots and stray
        // files under the prefix are reported, not ingested.
        ImageFormat::from_path(file)?;
        let stem = file.rsplit_once('.').map_or(file, |(stem, _ext)| stem);
        if entity.is_empty() || stem.is_empty() {
            return None;
        }
        Some(RawAsset {
            entity_label: entity.to_string(),
            color_label: stem.to_string(),
            origin_path: key.to_string(),
        })
    }
}

impl std::fmt::Debug for StorageAssetSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageAssetSource")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AssetSource for StorageAssetSource {
    async fn discover(&self) -> Result<DiscoveryListing> {
        let listing = tokio::time::timeout(self.io_timeout, self.backend.list(&self.prefix))
            .await
            .map_err(|_| CatalogError::Discovery {
                message: format!("listing timed out after {:?}", self.io_timeout),
            })?;
        let objects = listing.map_err(|e| CatalogError::Discovery {
            message: e.to_string(),
        })?;

        let mut listing = DiscoveryListing::default();
        for meta in objects {
            match self.parse_key(&meta.path) {
                Some(asset) => listing.assets.push(asset),
                None => listing.unrecognized.push(meta.path),
            }
        }
        Ok(listing)
    }

    async fn read(&self, origin_path: &str) -> Result<Bytes> {
        let bytes = tokio::time::timeout(self.io_timeout, self.backend.get(origin_path))
            .await
            .map_err(|_| CatalogError::AssetRead {
                path: origin_path.to_string(),
                message: format!("read timed out after {:?}", self.io_timeout),
            })?;
        bytes.map_err(|e| CatalogError::AssetRead {
            path: origin_path.to_string(),
            message: e.to_string(),
        })
    }
}

/// Canonical binary formats for catalog assets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    /// WebP, the canonical catalog format.
    Webp,
    /// JPEG source material.
    Jpeg,
    /// PNG source material.
    Png,
}

impl ImageFormat {
    /// Canonical file extension for the format.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Webp => "webp",
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }

    /// Guesses a format from a path extension, if recognizable.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let ext = path.rsplit_once('.')?.1.to_ascii_lowercase();
        match ext.as_str() {
            "webp" => Some(Self::Webp),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }
}

/// Opaque re-encoding step invoked before ingestion when a source asset is
/// not already in the canonical format.
pub trait Encoder: Send + Sync {
    /// Re-encodes `bytes` into `target` at the given quality (0–100).
    ///
    /// # Errors
    ///
    /// Per-asset: a failure skips that asset and is recorded in the run
    /// report; it never aborts the run.
    fn encode(&self, bytes: Bytes, target: ImageFormat, quality: u8) -> Result<Bytes>;
}

/// Encoder that returns bytes unchanged. Default collaborator; real
/// re-encoding is wired in by the ingestion deployment.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughEncoder;

impl Encoder for PassthroughEncoder {
    fn encode(&self, bytes: Bytes, _target: ImageFormat, _quality: u8) -> Result<Bytes> {
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flora_core::MemoryBackend;

    async fn seeded_source() -> StorageAssetSource {
        let backend = Arc::new(MemoryBackend::new());
        backend.put("assets/rose/화이트.webp", Bytes::from("a")).await.unwrap();
        backend.put("assets/rose/레드.jpg", Bytes::from("b")).await.unwrap();
        backend.put("assets/loose-file.webp", Bytes::from("c")).await.unwrap();
        backend.put("assets/rose/extra/deep.webp", Bytes::from("d")).await.unwrap();
        StorageAssetSource::new(backend, "assets")
    }

    #[tokio::test]
    async fn discover_derives_labels_from_paths() {
        let source = seeded_source().await;
        let mut listing = source.discover().await.expect("discover should succeed");
        listing.assets.sort_by(|a, b| a.origin_path.cmp(&b.origin_path));

        assert_eq!(listing.assets.len(), 2);
        assert_eq!(listing.assets[0].entity_label, "rose");
        assert_eq!(listing.assets[0].color_label, "레드");
        assert_eq!(listing.assets[1].color_label, "화이트");
    }

    #[tokio::test]
    async fn discover_reports_unrecognized_shapes() {
        let source = seeded_source().await;
        let mut listing = source.discover().await.unwrap();
        listing.unrecognized.sort();

        assert_eq!(
            listing.unrecognized,
            vec!["assets/loose-file.webp", "assets/rose/extra/deep.webp"]
        );
    }

    #[tokio::test]
    async fn discover_on_missing_root_is_a_discovery_failure() {
        let backend = Arc::new(flora_core::LocalFsBackend::new("/nonexistent/flora-root"));
        let source = StorageAssetSource::new(backend, "");
        let err = source.discover().await.unwrap_err();
        assert!(matches!(err, CatalogError::Discovery { .. }));
    }

    #[tokio::test]
    async fn read_failure_is_per_asset() {
        let source = seeded_source().await;
        let err = source.read("assets/rose/missing.webp").await.unwrap_err();
        assert!(matches!(err, CatalogError::AssetRead { .. }));
    }

    #[test]
    fn format_guess_from_path() {
        assert_eq!(ImageFormat::from_path("a/b.webp"), Some(ImageFormat::Webp));
        assert_eq!(ImageFormat::from_path("a/b.JPEG"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_path("a/b.tiff"), None);
        assert_eq!(ImageFormat::from_path("noext"), None);
    }
}
