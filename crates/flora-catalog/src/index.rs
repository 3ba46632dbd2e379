//! The catalog model: entities owning one asset per canonical color.
//!
//! `CatalogIndex` is a pure structural invariant-holder. It never chooses
//! a winner between conflicting assets: `upsert` signals the conflict to
//! the caller and the resolution policy lives in the reconciliation pass.
//! Iteration order is deterministic (`BTreeMap`) so a serialized index is
//! bit-identical for identical content.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::alias::EntityKey;
use crate::color::CanonicalColor;
use crate::error::{CatalogError, Result};
use crate::fingerprint::Fingerprint;

/// One binary asset bound to an (entity, color) key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Owning entity.
    pub entity: EntityKey,
    /// Canonical color.
    pub color: CanonicalColor,
    /// Whole-content digest of the asset bytes.
    pub fingerprint: Fingerprint,
    /// Asset size in bytes.
    pub byte_len: u64,
    /// Where the asset came from. Provenance, not identity.
    pub origin_path: String,
}

/// The catalog: entity → (canonical color → exactly one asset).
///
/// Exclusively owns all reachable [`AssetRecord`]s; consumers treat a
/// published index as immutable for the duration of one logical version.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogIndex {
    entries: BTreeMap<EntityKey, BTreeMap<CanonicalColor, AssetRecord>>,
}

impl CatalogIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record under its (entity, color) key.
    ///
    /// Enforces the one-asset-per-key invariant: when the key is already
    /// occupied by a record with a **different** fingerprint, returns
    /// `CatalogError::KeyConflict` and leaves the existing record in place
    /// — the caller decides whether to replace via [`Self::remove`] first.
    /// Re-inserting the same content under the same key is a no-op.
    pub fn upsert(&mut self, record: AssetRecord) -> Result<()> {
        let colors = self.entries.entry(record.entity.clone()).or_default();
        if let Some(existing) = colors.get(&record.color) {
            if existing.fingerprint == record.fingerprint {
                return Ok(());
            }
            return Err(CatalogError::KeyConflict {
                entity: record.entity.to_string(),
                color: record.color.to_string(),
                existing_path: existing.origin_path.clone(),
                incoming_path: record.origin_path,
            });
        }
        colors.insert(record.color.clone(), record);
        Ok(())
    }

    /// Returns the record for a key, if present.
    #[must_use]
    pub fn get(&self, entity: &EntityKey, color: &CanonicalColor) -> Option<&AssetRecord> {
        self.entries.get(entity).and_then(|colors| colors.get(color))
    }

    /// Returns the canonical colors present for an entity, in order.
    #[must_use]
    pub fn list(&self, entity: &EntityKey) -> Vec<CanonicalColor> {
        self.entries
            .get(entity)
            .map(|colors| colors.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Removes and returns the record for a key.
    pub fn remove(&mut self, entity: &EntityKey, color: &CanonicalColor) -> Option<AssetRecord> {
        let colors = self.entries.get_mut(entity)?;
        let removed = colors.remove(color);
        if colors.is_empty() {
            self.entries.remove(entity);
        }
        removed
    }

    /// Returns true when the entity has at least one asset.
    #[must_use]
    pub fn contains_entity(&self, entity: &EntityKey) -> bool {
        self.entries.contains_key(entity)
    }

    /// Iterates entity keys in order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityKey> {
        self.entries.keys()
    }

    /// Iterates all records in (entity, color) order.
    pub fn records(&self) -> impl Iterator<Item = &AssetRecord> {
        self.entries.values().flat_map(BTreeMap::values)
    }

    /// Total number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    /// Returns true when the index holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
