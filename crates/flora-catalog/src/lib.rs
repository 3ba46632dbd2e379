//! Catalog normalization and deduplication for the Flora asset store.
//!
//! Years of ad-hoc ingestion leave an asset tree with inconsistent folder
//! spellings, mixed-language color labels, and byte-identical copies under
//! different names. This crate converges that tree into a canonical
//! catalog: one asset per `(entity, canonical color)` key, addressed by
//! content fingerprint, with every decision recorded in an ordered run
//! report.
//!
//! # Architecture
//!
//! - [`ColorVocabulary`] — closed name⇄code color table with a default
//!   fallback; label resolution is total and never errors.
//! - [`AliasResolver`] — structural label normalization plus an exact
//!   alias table, producing stable [`EntityKey`]s.
//! - [`Fingerprint`] — whole-content SHA-256 identity.
//! - [`CatalogIndex`] — the one-asset-per-key invariant holder; conflicts
//!   are signalled, never silently resolved.
//! - [`Reconciler`] — the full pass: discover, resolve, fingerprint in
//!   parallel, group, dedup, upsert, report.
//! - [`CatalogPublisher`] — the write side: applies an outcome to storage
//!   and publishes index snapshots.
//!
//! The pass itself is read-only and deterministic; all storage mutation is
//! an explicit, separate apply step.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]

pub mod alias;
pub mod color;
pub mod discovery;
pub mod error;
pub mod fingerprint;
pub mod index;
pub mod publish;
pub mod reconcile;
pub mod report;

pub use alias::{AliasResolver, EntityKey};
pub use color::{CanonicalColor, ColorVocabulary};
pub use discovery::{
    AssetSource, DiscoveryListing, Encoder, ImageFormat, PassthroughEncoder, RawAsset,
    StorageAssetSource,
};
pub use error::{CatalogError, Result};
pub use fingerprint::Fingerprint;
pub use index::{AssetRecord, CatalogIndex};
pub use publish::{load_snapshot, ApplySummary, CatalogPublisher};
pub use reconcile::{ConflictPolicy, ReconcileOptions, ReconcileOutcome, Reconciler};
pub use report::{ActionCounts, ReconcileAction, ReconciliationReport, SkipReason, SkippedAsset};
