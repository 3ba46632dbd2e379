//! The reconciliation run report.
//!
//! Ephemeral audit output, produced once per pass and never persisted as
//! catalog state. The report is fully deterministic for a fixed input set:
//! it carries no wall-clock fields, and every sequence is emitted in a
//! documented order, so two runs over identical input serialize to
//! identical bytes.

use serde::{Deserialize, Serialize};

use crate::alias::EntityKey;
use crate::color::CanonicalColor;

/// One action taken (or recorded) during a reconciliation pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReconcileAction {
    /// The asset was retained under its key unchanged.
    Kept {
        /// Canonical entity key.
        entity: EntityKey,
        /// Canonical color.
        color: CanonicalColor,
        /// Origin path of the retained asset.
        path: String,
    },
    /// A byte-identical copy was collapsed into the representative.
    MergedDuplicate {
        /// Canonical entity key.
        entity: EntityKey,
        /// Canonical color.
        color: CanonicalColor,
        /// Origin path of the retained representative.
        kept_path: String,
        /// Origin path of the collapsed copy.
        dropped_path: String,
    },
    /// The asset was retained but its raw labels differed from canonical.
    RenamedAlias {
        /// Canonical entity key.
        entity: EntityKey,
        /// Canonical color.
        color: CanonicalColor,
        /// Origin path of the retained asset.
        path: String,
        /// Raw entity label as discovered.
        raw_entity_label: String,
        /// Raw color label as discovered.
        raw_color_label: String,
    },
    /// A genuinely different asset lost a key conflict and was dropped.
    DroppedConflict {
        /// Canonical entity key.
        entity: EntityKey,
        /// Canonical color.
        color: CanonicalColor,
        /// Origin path of the winning asset.
        kept_path: String,
        /// Origin path of the dropped asset.
        dropped_path: String,
    },
}

/// One asset skipped before grouping, with the reason.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedAsset {
    /// Origin path of the skipped asset.
    pub path: String,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// Why an asset was skipped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The path did not match the `<entity>/<color>.<ext>` shape.
    UnrecognizedPath,
    /// Reading the asset bytes failed.
    ReadFailure {
        /// Description of the failure.
        message: String,
    },
    /// Re-encoding to the canonical format failed.
    EncodeFailure {
        /// Description of the failure.
        message: String,
    },
}

/// Per-kind action counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ActionCounts {
    /// `kept` actions.
    pub kept: usize,
    /// `merged_duplicate` actions.
    pub merged: usize,
    /// `renamed_alias` actions.
    pub renamed: usize,
    /// `dropped_conflict` actions.
    pub dropped: usize,
}

/// Report from one reconciliation pass.
///
/// Action order is documented and deterministic: merged duplicates first
/// (grouping order), then dropped conflicts (upsert order), then the
/// kept/renamed records in final index order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// Number of raw assets the discovery call yielded.
    pub discovered: usize,
    /// Assets skipped before grouping, ordered by path.
    pub skipped: Vec<SkippedAsset>,
    /// Ordered actions taken.
    pub actions: Vec<ReconcileAction>,
}

impl ReconciliationReport {
    /// Counts actions per kind.
    #[must_use]
    pub fn counts(&self) -> ActionCounts {
        let mut counts = ActionCounts::default();
        for action in &self.actions {
            match action {
                ReconcileAction::Kept { .. } => counts.kept += 1,
                ReconcileAction::MergedDuplicate { .. } => counts.merged += 1,
                ReconcileAction::RenamedAlias { .. } => counts.renamed += 1,
                ReconcileAction::DroppedConflict { .. } => counts.dropped += 1,
            }
        }
        counts
    }

    /// Returns true when every action is `kept` and nothing was skipped
    /// for read or encode failures.
    ///
    /// This is the signature of a pass over an already-converged catalog.
    #[must_use]
    pub fn is_all_kept(&self) -> bool {
        self.actions
            .iter()
            .all(|a| matches!(a, ReconcileAction::Kept { .. }))
            && !self.skipped.iter().any(|s| {
                matches!(
                    s.reason,
                    SkipReason::ReadFailure { .. } | SkipReason::EncodeFailure { .. }
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::AliasResolver;
    use crate::color::ColorVocabulary;

    fn key(s: &str) -> EntityKey {
        AliasResolver::empty().canonicalize(s)
    }

    fn color(s: &str) -> CanonicalColor {
        ColorVocabulary::flower_default().resolve(s)
    }

    #[test]
    fn counts_tally_each_kind() {
        let report = ReconciliationReport {
            discovered: 3,
            skipped: vec![],
            actions: vec![
                ReconcileAction::MergedDuplicate {
                    entity: key("rose"),
                    color: color("화이트"),
                    kept_path: "a".into(),
                    dropped_path: "b".into(),
                },
                ReconcileAction::Kept {
                    entity: key("rose"),
                    color: color("화이트"),
                    path: "a".into(),
                },
                ReconcileAction::Kept {
                    entity: key("tulip"),
                    color: color("레드"),
                    path: "c".into(),
                },
            ],
        };

        let counts = report.counts();
        assert_eq!(counts.kept, 2);
        assert_eq!(counts.merged, 1);
        assert_eq!(counts.dropped, 0);
        assert!(!report.is_all_kept());
    }

    #[test]
    fn all_kept_report() {
        let report = ReconciliationReport {
            discovered: 1,
            skipped: vec![],
            actions: vec![ReconcileAction::Kept {
                entity: key("rose"),
                color: color("화이트"),
                path: "rose/wh.webp".into(),
            }],
        };
        assert!(report.is_all_kept());
    }

    #[test]
    fn actions_serialize_with_snake_case_tags() {
        let action = ReconcileAction::DroppedConflict {
            entity: key("rose"),
            color: color("화이트"),
            kept_path: "a".into(),
            dropped_path: "b".into(),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["action"], "dropped_conflict");
        assert_eq!(json["entity"], "rose");
        assert_eq!(json["kept_path"], "a");

        let merged = ReconcileAction::MergedDuplicate {
            entity: key("rose"),
            color: color("화이트"),
            kept_path: "a".into(),
            dropped_path: "b".into(),
        };
        let json = serde_json::to_value(&merged).unwrap();
        assert_eq!(json["action"], "merged_duplicate");
    }
}
