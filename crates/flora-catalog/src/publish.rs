//! Applying a reconciliation outcome to storage, and snapshot publication.
//!
//! A run itself never mutates the asset tree; this module is the write
//! side. Applying an outcome converges storage onto the canonical layout
//! `{prefix}{entity}/{code}.{ext}`: dropped duplicates and conflict losers
//! are deleted, surviving assets are rewritten under their canonical path.
//! A second pass over an applied tree discovers only canonical files and
//! reports all-`kept`.
//!
//! The index snapshot is published atomically as one JSON object after a
//! full pass; readers never observe partially-reconciled state.

use std::sync::Arc;

use bytes::Bytes;

use flora_core::StorageBackend;

use crate::color::ColorVocabulary;
use crate::discovery::{Encoder, ImageFormat, PassthroughEncoder};
use crate::error::{CatalogError, Result};
use crate::index::CatalogIndex;
use crate::reconcile::ReconcileOutcome;
use crate::report::ReconcileAction;

/// Result of applying an outcome to storage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ApplySummary {
    /// Assets rewritten to their canonical path.
    pub rewritten: usize,
    /// Objects deleted (duplicates, conflict losers, stale originals).
    pub deleted: usize,
    /// Per-object operations that failed and were left in place.
    pub failed: usize,
}

/// Write-side collaborator converging storage onto the canonical layout.
pub struct CatalogPublisher {
    backend: Arc<dyn StorageBackend>,
    encoder: Arc<dyn Encoder>,
    vocabulary: ColorVocabulary,
    target_format: ImageFormat,
    encode_quality: u8,
}

impl std::fmt::Debug for CatalogPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogPublisher")
            .field("target_format", &self.target_format)
            .finish_non_exhaustive()
    }
}

impl CatalogPublisher {
    /// Creates a publisher over `backend` with the built-in vocabulary.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            encoder: Arc::new(PassthroughEncoder),
            vocabulary: ColorVocabulary::flower_default(),
            target_format: ImageFormat::Webp,
            encode_quality: 80,
        }
    }

    /// Replaces the encode collaborator.
    #[must_use]
    pub fn with_encoder(mut self, encoder: Arc<dyn Encoder>) -> Self {
        self.encoder = encoder;
        self
    }

    /// Replaces the color vocabulary.
    #[must_use]
    pub fn with_vocabulary(mut self, vocabulary: ColorVocabulary) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    /// Sets the canonical binary format and encode quality.
    #[must_use]
    pub fn with_target_format(mut self, format: ImageFormat, quality: u8) -> Self {
        self.target_format = format;
        self.encode_quality = quality;
        self
    }

    /// Canonical storage path for an (entity, color) key.
    #[must_use]
    pub fn canonical_path(&self, prefix: &str, entity: &str, color: &str) -> String {
        let code = self.vocabulary.to_code(color);
        let ext = self.target_format.extension();
        format!("{prefix}{entity}/{code}.{ext}")
    }

    /// Applies an outcome: deletes dropped objects, rewrites survivors to
    /// canonical paths, and returns the index with updated provenance.
    ///
    /// Per-object failures are logged and counted; they never abort the
    /// apply.
    pub async fn apply(
        &self,
        outcome: &ReconcileOutcome,
        prefix: &str,
    ) -> Result<(CatalogIndex, ApplySummary)> {
        let mut summary = ApplySummary::default();

        // Dropped objects first, so a canonical path occupied by a loser
        // is free before its winner is written there.
        for action in &outcome.report.actions {
            let dropped = match action {
                ReconcileAction::MergedDuplicate { dropped_path, .. }
                | ReconcileAction::DroppedConflict { dropped_path, .. } => dropped_path,
                _ => continue,
            };
            match self.backend.delete(dropped).await {
                Ok(()) => summary.deleted += 1,
                Err(e) => {
                    tracing::error!(path = %dropped, error = %e, "failed to delete dropped asset");
                    summary.failed += 1;
                }
            }
        }

        let mut applied = outcome.index.clone();
        let records: Vec<_> = outcome.index.records().cloned().collect();
        for record in records {
            let canonical =
                self.canonical_path(prefix, record.entity.as_str(), record.color.as_str());
            if record.origin_path == canonical {
                continue;
            }

            match self.rewrite(&record.origin_path, &canonical).await {
                Ok(()) => {
                    summary.rewritten += 1;
                    if let Some(mut moved) = applied.remove(&record.entity, &record.color) {
                        moved.origin_path = canonical;
                        applied.upsert(moved)?;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        from = %record.origin_path,
                        to = %canonical,
                        error = %e,
                        "failed to rewrite asset to canonical path"
                    );
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            rewritten = summary.rewritten,
            deleted = summary.deleted,
            failed = summary.failed,
            "apply complete"
        );

        Ok((applied, summary))
    }

    async fn rewrite(&self, from: &str, to: &str) -> Result<()> {
        let bytes = self
            .backend
            .get(from)
            .await
            .map_err(|e| CatalogError::AssetRead {
                path: from.to_string(),
                message: e.to_string(),
            })?;

        let bytes = if ImageFormat::from_path(from) == Some(self.target_format) {
            bytes
        } else {
            self.encoder
                .encode(bytes, self.target_format, self.encode_quality)?
        };

        self.backend.put(to, bytes).await?;
        self.backend.delete(from).await?;
        Ok(())
    }

    /// Publishes the index snapshot as one JSON object.
    pub async fn publish_snapshot(&self, index: &CatalogIndex, path: &str) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(index).map_err(|e| CatalogError::Serialization {
            message: format!("failed to encode catalog snapshot: {e}"),
        })?;
        self.backend.put(path, Bytes::from(bytes)).await?;
        Ok(())
    }
}

/// Loads a previously published snapshot, if one exists.
pub async fn load_snapshot(
    backend: &Arc<dyn StorageBackend>,
    path: &str,
) -> Result<Option<CatalogIndex>> {
    let bytes = match backend.get(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.is_not_found() => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| CatalogError::Serialization {
            message: format!("failed to parse catalog snapshot at '{path}': {e}"),
        })
}
