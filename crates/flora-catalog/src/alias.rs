//! Name canonicalization for entity folders and color labels.
//!
//! Raw labels arrive from years of hand-curated directory names and carry
//! predictable damage: stray case, doubled separators, extension remnants
//! glued onto a folder name, the same word spelled two ways. Resolution is
//! two-stage: structural normalization first (trim, lowercase, separator
//! collapsing), then an exact-match alias table for the known one-off
//! corruptions. Unmatched labels pass through as their own canonical form.
//!
//! Canonicalization must be a pure function of its input: the resulting
//! [`EntityKey`] values are stable identifiers that the external matching
//! service depends on across runs and process restarts.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Canonical identifier for a catalog subject (a flower species/variety).
///
/// Two raw labels that normalize to the same `EntityKey` are the same
/// entity.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(String);

impl EntityKey {
    /// Returns the canonical key string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Structural normalization applied before any alias lookup.
///
/// Trims, lowercases, and collapses runs of whitespace / `-` / `_` / `.`
/// into a single `-`. Non-ASCII text (Korean color and flower names) is
/// left intact apart from separator handling.
#[must_use]
pub fn normalize_label(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_separator = false;

    for ch in raw.trim().to_lowercase().chars() {
        if ch.is_whitespace() || matches!(ch, '-' | '_' | '.') {
            pending_separator = !out.is_empty();
            continue;
        }
        if pending_separator {
            out.push('-');
            pending_separator = false;
        }
        out.push(ch);
    }

    out
}

/// Canonicalizes raw labels via a configurable alias table.
///
/// The table maps known raw variants to their canonical variant; keys are
/// stored in normalized form so lookup happens after structural
/// normalization.
#[derive(Debug, Clone, Default)]
pub struct AliasResolver {
    aliases: HashMap<String, String>,
}

impl AliasResolver {
    /// Builds a resolver from `{raw variant: canonical variant}` entries.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let aliases = entries
            .into_iter()
            .map(|(raw, canonical)| (normalize_label(&raw.into()), canonical.into()))
            .collect();
        Self { aliases }
    }

    /// A resolver with no aliases; labels normalize structurally only.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in table of known flower-folder corruptions.
    #[must_use]
    pub fn flower_entities() -> Self {
        Self::new(vec![
            // Folder names accidentally suffixed with an extension remnant.
            ("rosejpg", "rose"),
            ("tulipjpg", "tulip"),
            ("liliumpng", "lilium"),
            // The same flower spelled two ways.
            ("카네이숀", "카네이션"),
            ("후리지아", "프리지아"),
        ])
    }

    /// The built-in table of legacy color-label spellings.
    #[must_use]
    pub fn flower_colors() -> Self {
        Self::new(vec![
            ("흰색", "화이트"),
            ("하양", "화이트"),
            ("빨강", "레드"),
            ("빨간색", "레드"),
            ("분홍", "핑크"),
            ("노랑", "옐로우"),
            ("노란색", "옐로우"),
            ("주황", "오렌지"),
            ("보라", "퍼플"),
            ("파랑", "블루"),
            ("초록", "그린"),
        ])
    }

    /// Canonicalizes a raw label to its canonical string form.
    ///
    /// Normalizes structurally, then consults the alias table for an exact
    /// match; unmatched labels pass through unchanged.
    #[must_use]
    pub fn canonical_label(&self, raw: &str) -> String {
        let normalized = normalize_label(raw);
        self.aliases
            .get(&normalized)
            .cloned()
            .unwrap_or(normalized)
    }

    /// Canonicalizes a raw entity label to its stable key.
    #[must_use]
    pub fn canonicalize(&self, raw: &str) -> EntityKey {
        EntityKey(self.canonical_label(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_collapses_separators_and_case() {
        assert_eq!(normalize_label("  Rose  "), "rose");
        assert_eq!(normalize_label("White__Rose"), "white-rose");
        assert_eq!(normalize_label("white   rose"), "white-rose");
        assert_eq!(normalize_label("rose.jpg"), "rose-jpg");
        assert_eq!(normalize_label("--rose--"), "rose");
    }

    #[test]
    fn normalization_keeps_korean_intact() {
        assert_eq!(normalize_label("화이트"), "화이트");
        assert_eq!(normalize_label(" 흰색 "), "흰색");
    }

    #[test]
    fn alias_table_resolves_extension_remnants() {
        let resolver = AliasResolver::flower_entities();
        assert_eq!(resolver.canonicalize("Rosejpg").as_str(), "rose");
        assert_eq!(resolver.canonicalize("rosejpg").as_str(), "rose");
    }

    #[test]
    fn same_entity_under_different_raw_labels() {
        let resolver = AliasResolver::flower_entities();
        assert_eq!(
            resolver.canonicalize("rose"),
            resolver.canonicalize("Rosejpg")
        );
        assert_eq!(
            resolver.canonicalize("카네이숀"),
            resolver.canonicalize("카네이션")
        );
    }

    #[test]
    fn unmatched_labels_pass_through() {
        let resolver = AliasResolver::flower_entities();
        assert_eq!(resolver.canonicalize("peony").as_str(), "peony");
    }

    #[test]
    fn canonicalization_is_deterministic() {
        let resolver = AliasResolver::flower_entities();
        let a = resolver.canonicalize(" Rose Garden ");
        let b = resolver.canonicalize(" Rose Garden ");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "rose-garden");
    }

    #[test]
    fn color_aliases_map_to_canonical_names() {
        let resolver = AliasResolver::flower_colors();
        assert_eq!(resolver.canonical_label("흰색"), "화이트");
        assert_eq!(resolver.canonical_label("화이트"), "화이트");
        assert_eq!(resolver.canonical_label("빨강"), "레드");
    }
}
