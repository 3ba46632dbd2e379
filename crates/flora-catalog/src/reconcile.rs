//! The reconciliation pass.
//!
//! One state-free pass over the full raw asset set per run: resolve labels,
//! fingerprint everything, collapse byte-identical duplicates, resolve key
//! conflicts by policy, and emit a conflict-free [`CatalogIndex`] plus an
//! ordered [`ReconciliationReport`]. The pass is not incremental; a fresh
//! discovery call is issued per run and the index is rebuilt from scratch,
//! which makes the operation naturally idempotent.
//!
//! # Determinism
//!
//! For a fixed raw input set the output index and report are bit-identical
//! across runs and process restarts. Discovery order is ignored: tuples are
//! sorted by origin path before grouping, groups iterate in fingerprint
//! order, and ties break on the lexicographically smallest origin path
//! (preferring a tuple whose key already exists in a supplied prior
//! snapshot, for stability across runs).
//!
//! # Concurrency
//!
//! Reading and fingerprinting independent assets fans out across tasks
//! bounded by the configured concurrency limit. There is a hard barrier
//! between that phase and the sequential group-and-upsert phase; nothing
//! observes a partially built index. Asset bytes are not retained past
//! fingerprinting.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures::StreamExt;

use crate::alias::{AliasResolver, EntityKey};
use crate::color::{CanonicalColor, ColorVocabulary};
use crate::discovery::{AssetSource, Encoder, ImageFormat, PassthroughEncoder, RawAsset};
use crate::error::{CatalogError, Result};
use crate::fingerprint::Fingerprint;
use crate::index::{AssetRecord, CatalogIndex};
use crate::report::{ReconcileAction, ReconciliationReport, SkipReason, SkippedAsset};

/// Resolution policy when two different contents claim the same key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Keep the first record upserted (smallest origin path); report the
    /// rest as dropped.
    #[default]
    KeepFirstSeen,
    /// Keep the largest asset by byte length; first seen wins ties.
    KeepLargest,
}

/// Tunables for one reconciliation run.
#[derive(Clone, Copy, Debug)]
pub struct ReconcileOptions {
    /// Bound on concurrent read+fingerprint tasks.
    pub concurrency: usize,
    /// Key conflict resolution policy.
    pub conflict_policy: ConflictPolicy,
    /// Canonical binary format; sources in other formats are re-encoded
    /// before fingerprinting.
    pub target_format: ImageFormat,
    /// Encode quality (0–100) passed to the encoder.
    pub encode_quality: u8,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            concurrency: 8,
            conflict_policy: ConflictPolicy::default(),
            target_format: ImageFormat::Webp,
            encode_quality: 80,
        }
    }
}

/// Output of one reconciliation run.
#[derive(Clone, Debug)]
pub struct ReconcileOutcome {
    /// The conflict-free catalog.
    pub index: CatalogIndex,
    /// Ordered audit report.
    pub report: ReconciliationReport,
}

/// One resolved, fingerprinted tuple awaiting grouping.
#[derive(Clone, Debug)]
struct Ingested {
    entity: EntityKey,
    color: CanonicalColor,
    fingerprint: Fingerprint,
    byte_len: u64,
    origin_path: String,
    raw_entity_label: String,
    raw_color_label: String,
    renamed: bool,
}

/// The reconciliation pass over one asset source.
pub struct Reconciler {
    source: Arc<dyn AssetSource>,
    encoder: Arc<dyn Encoder>,
    vocabulary: ColorVocabulary,
    entity_aliases: AliasResolver,
    color_aliases: AliasResolver,
    options: ReconcileOptions,
    prior: Option<CatalogIndex>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("options", &self.options)
            .field("has_prior", &self.prior.is_some())
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Creates a pass over `source` with the built-in flower vocabulary
    /// and alias tables.
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        Self {
            source,
            encoder: Arc::new(PassthroughEncoder),
            vocabulary: ColorVocabulary::flower_default(),
            entity_aliases: AliasResolver::flower_entities(),
            color_aliases: AliasResolver::flower_colors(),
            options: ReconcileOptions::default(),
            prior: None,
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

    /// Replaces the entity alias table.
    #[must_use]
    pub fn with_entity_aliases(mut self, aliases: AliasResolver) -> Self {
        self.entity_aliases = aliases;
        self
    }

    /// Replaces the color alias table.
    #[must_use]
    pub fn with_color_aliases(mut self, aliases: AliasResolver) -> Self {
        self.color_aliases = aliases;
        self
    }

    /// Replaces the run tunables.
    #[must_use]
    pub fn with_options(mut self, options: ReconcileOptions) -> Self {
        self.options = options;
        self
    }

    /// Supplies the previous run's index for stable tie-breaking.
    #[must_use]
    pub fn with_prior(mut self, prior: CatalogIndex) -> Self {
        self.prior = Some(prior);
        self
    }

    /// Runs one full pass.
    ///
    /// # Errors
    ///
    /// Only `CatalogError::Discovery` aborts the run; every per-asset
    /// failure is recorded in the report and the run continues.
    pub async fn run(&self) -> Result<ReconcileOutcome> {
        let listing = self.source.discover().await?;

        let mut report = ReconciliationReport {
            discovered: listing.assets.len(),
            ..ReconciliationReport::default()
        };
        for path in listing.unrecognized {
            report.skipped.push(SkippedAsset {
                path,
                reason: SkipReason::UnrecognizedPath,
            });
        }

        tracing::info!(
            discovered = report.discovered,
            unrecognized = report.skipped.len(),
            "starting reconciliation pass"
        );

        // Deterministic processing order regardless of listing order.
        let mut assets = listing.assets;
        assets.sort_by(|a, b| a.origin_path.cmp(&b.origin_path));

        // Parallel phase: read + encode + fingerprint, bounded fan-out.
        // `buffered` preserves input order, so results stay sorted.
        let outcomes: Vec<std::result::Result<Ingested, SkippedAsset>> =
            futures::stream::iter(assets.into_iter().map(|raw| self.ingest(raw)))
                .buffered(self.options.concurrency.max(1))
                .collect()
                .await;

        // Barrier: all fingerprints are in before any grouping happens.
        let mut ingested = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                Ok(tuple) => ingested.push(tuple),
                Err(skip) => report.skipped.push(skip),
            }
        }
        report.skipped.sort_by(|a, b| a.path.cmp(&b.path));

        // Group byte-identical assets and pick one representative each.
        let mut groups: BTreeMap<Fingerprint, Vec<Ingested>> = BTreeMap::new();
        for tuple in ingested {
            groups.entry(tuple.fingerprint).or_default().push(tuple);
        }

        let mut survivors = Vec::with_capacity(groups.len());
        for (fingerprint, members) in groups {
            let representative = members
                .iter()
                .position(|m| {
                    self.prior.as_ref().is_some_and(|prior| {
                        prior
                            .get(&m.entity, &m.color)
                            .is_some_and(|rec| rec.fingerprint == fingerprint)
                    })
                })
                .unwrap_or(0);

            for (i, member) in members.iter().enumerate() {
                if i == representative {
                    continue;
                }
                report.actions.push(ReconcileAction::MergedDuplicate {
                    entity: member.entity.clone(),
                    color: member.color.clone(),
                    kept_path: members[representative].origin_path.clone(),
                    dropped_path: member.origin_path.clone(),
                });
            }

            let mut members = members;
            survivors.push(members.swap_remove(representative));
        }

        // Sequential phase: single writer over the index, upsert in origin
        // path order.
        survivors.sort_by(|a, b| a.origin_path.cmp(&b.origin_path));

        let mut index = CatalogIndex::new();
        let mut provenance: HashMap<String, Ingested> = HashMap::new();

        for tuple in survivors {
            let record = AssetRecord {
                entity: tuple.entity.clone(),
                color: tuple.color.clone(),
                fingerprint: tuple.fingerprint,
                byte_len: tuple.byte_len,
                origin_path: tuple.origin_path.clone(),
            };

            match index.upsert(record) {
                Ok(()) => {
                    provenance.insert(tuple.origin_path.clone(), tuple);
                }
                Err(CatalogError::KeyConflict { .. }) => {
                    self.resolve_conflict(&mut index, &mut provenance, tuple, &mut report);
                }
                Err(other) => return Err(other),
            }
        }

        // Kept/renamed actions, in final index order.
        for record in index.records() {
            let action = match provenance.get(&record.origin_path) {
                Some(tuple) if tuple.renamed => ReconcileAction::RenamedAlias {
                    entity: record.entity.clone(),
                    color: record.color.clone(),
                    path: record.origin_path.clone(),
                    raw_entity_label: tuple.raw_entity_label.clone(),
                    raw_color_label: tuple.raw_color_label.clone(),
                },
                _ => ReconcileAction::Kept {
                    entity: record.entity.clone(),
                    color: record.color.clone(),
                    path: record.origin_path.clone(),
                },
            };
            report.actions.push(action);
        }

        let counts = report.counts();
        tracing::info!(
            kept = counts.kept,
            merged = counts.merged,
            renamed = counts.renamed,
            dropped = counts.dropped,
            skipped = report.skipped.len(),
            records = index.len(),
            "reconciliation pass complete"
        );

        Ok(ReconcileOutcome { index, report })
    }

    /// Reads, re-encodes if needed, and fingerprints one raw asset.
    ///
    /// Bytes are dropped here; only fingerprints and metadata cross the
    /// barrier into the grouping phase.
    async fn ingest(&self, raw: RawAsset) -> std::result::Result<Ingested, SkippedAsset> {
        let bytes = match self.source.read(&raw.origin_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(path = %raw.origin_path, error = %e, "skipping unreadable asset");
                return Err(SkippedAsset {
                    path: raw.origin_path,
                    reason: SkipReason::ReadFailure {
                        message: e.to_string(),
                    },
                });
            }
        };

        let bytes = if ImageFormat::from_path(&raw.origin_path) == Some(self.options.target_format)
        {
            bytes
        } else {
            match self.encoder.encode(
                bytes,
                self.options.target_format,
                self.options.encode_quality,
            ) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(path = %raw.origin_path, error = %e, "skipping unencodable asset");
                    return Err(SkippedAsset {
                        path: raw.origin_path,
                        reason: SkipReason::EncodeFailure {
                            message: e.to_string(),
                        },
                    });
                }
            }
        };

        let fingerprint = Fingerprint::of(&bytes);
        let byte_len = bytes.len() as u64;
        drop(bytes);

        let entity = self.entity_aliases.canonicalize(&raw.entity_label);
        let color_label = self.color_aliases.canonical_label(&raw.color_label);
        let color = self.vocabulary.resolve(&color_label);

        // Canonical on-disk form is `{entity}/{code}.{ext}`, so a raw
        // color label counts as renamed unless it already is the code.
        let renamed = entity.as_str() != raw.entity_label.trim()
            || self.vocabulary.to_code(color.as_str()) != raw.color_label.trim();

        Ok(Ingested {
            entity,
            color,
            fingerprint,
            byte_len,
            origin_path: raw.origin_path,
            raw_entity_label: raw.entity_label,
            raw_color_label: raw.color_label,
            renamed,
        })
    }

    /// Applies the conflict policy after an upsert was refused.
    fn resolve_conflict(
        &self,
        index: &mut CatalogIndex,
        provenance: &mut HashMap<String, Ingested>,
        incoming: Ingested,
        report: &mut ReconciliationReport,
    ) {
        let Some(existing) = index.get(&incoming.entity, &incoming.color).cloned() else {
            // upsert only refuses occupied keys; nothing to resolve.
            return;
        };

        let replace = match self.options.conflict_policy {
            ConflictPolicy::KeepFirstSeen => false,
            ConflictPolicy::KeepLargest => incoming.byte_len > existing.byte_len,
        };

        if replace {
            index.remove(&incoming.entity, &incoming.color);
            provenance.remove(&existing.origin_path);
            let record = AssetRecord {
                entity: incoming.entity.clone(),
                color: incoming.color.clone(),
                fingerprint: incoming.fingerprint,
                byte_len: incoming.byte_len,
                origin_path: incoming.origin_path.clone(),
            };
            if index.upsert(record).is_ok() {
                report.actions.push(ReconcileAction::DroppedConflict {
                    entity: incoming.entity.clone(),
                    color: incoming.color.clone(),
                    kept_path: incoming.origin_path.clone(),
                    dropped_path: existing.origin_path,
                });
                provenance.insert(incoming.origin_path.clone(), incoming);
            }
        } else {
            tracing::debug!(
                entity = %incoming.entity,
                color = %incoming.color,
                kept = %existing.origin_path,
                dropped = %incoming.origin_path,
                "key conflict resolved by policy"
            );
            report.actions.push(ReconcileAction::DroppedConflict {
                entity: incoming.entity,
                color: incoming.color,
                kept_path: existing.origin_path,
                dropped_path: incoming.origin_path,
            });
        }
    }
}
