//! Canonical color vocabulary.
//!
//! A vocabulary is a closed, immutable table of canonical color names and
//! short codes, bijective both ways, with one designated "unmarked" member
//! used as the fallback for labels outside the table. Lookups never fail:
//! the originating data is human-curated and will always contain
//! stragglers, so the system degrades to the default rather than aborting
//! a batch over one bad label.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};

/// One member of the closed color vocabulary.
///
/// Values are only produced by [`ColorVocabulary`] resolution (or
/// deserialized from a snapshot that a vocabulary produced earlier), so a
/// `CanonicalColor` always carries a canonical display name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalColor(String);

impl CanonicalColor {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the canonical display name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CanonicalColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bidirectional canonical color-name ⇄ short-code table.
#[derive(Debug, Clone)]
pub struct ColorVocabulary {
    name_to_code: BTreeMap<String, String>,
    code_to_name: BTreeMap<String, String>,
    default_name: String,
    default_code: String,
}

/// The built-in flower color table: `(canonical name, short code)`.
const FLOWER_COLORS: &[(&str, &str)] = &[
    ("화이트", "wh"),
    ("레드", "rd"),
    ("핑크", "pk"),
    ("옐로우", "yl"),
    ("오렌지", "or"),
    ("퍼플", "pp"),
    ("블루", "bl"),
    ("그린", "gr"),
    ("라벤더", "lv"),
    ("믹스", "mx"),
    ("기타", "et"),
];

/// Default member used for labels outside the vocabulary.
const FLOWER_DEFAULT: &str = "기타";

impl ColorVocabulary {
    /// Builds a vocabulary from `(name, code)` entries and a default member.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidVocabulary` when a name or code appears
    /// twice, or when the default is not a member.
    pub fn new<I, S>(entries: I, default_name: &str) -> Result<Self>
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let mut name_to_code = BTreeMap::new();
        let mut code_to_name = BTreeMap::new();

        for (name, code) in entries {
            let name = name.into();
            let code = code.into();
            if name_to_code.contains_key(&name) {
                return Err(CatalogError::InvalidVocabulary {
                    message: format!("duplicate color name '{name}'"),
                });
            }
            if code_to_name.contains_key(&code) {
                return Err(CatalogError::InvalidVocabulary {
                    message: format!("duplicate color code '{code}'"),
                });
            }
            name_to_code.insert(name.clone(), code.clone());
            code_to_name.insert(code, name);
        }

        let Some(default_code) = name_to_code.get(default_name).cloned() else {
            return Err(CatalogError::InvalidVocabulary {
                message: format!("default color '{default_name}' is not in the vocabulary"),
            });
        };

        Ok(Self {
            name_to_code,
            code_to_name,
            default_name: default_name.to_string(),
            default_code,
        })
    }

    /// The built-in flower color vocabulary.
    #[must_use]
    pub fn flower_default() -> Self {
        let mut name_to_code = BTreeMap::new();
        let mut code_to_name = BTreeMap::new();
        for (name, code) in FLOWER_COLORS {
            name_to_code.insert((*name).to_string(), (*code).to_string());
            code_to_name.insert((*code).to_string(), (*name).to_string());
        }
        let default_code = name_to_code
            .get(FLOWER_DEFAULT)
            .cloned()
            .unwrap_or_default();
        Self {
            name_to_code,
            code_to_name,
            default_name: FLOWER_DEFAULT.to_string(),
            default_code,
        }
    }

    /// Maps a canonical name to its short code.
    ///
    /// Unknown names return the default member's code, never an error.
    #[must_use]
    pub fn to_code(&self, name: &str) -> &str {
        self.name_to_code
            .get(name.trim())
            .map_or(self.default_code.as_str(), String::as_str)
    }

    /// Maps a short code to its canonical name.
    ///
    /// Unknown codes return the default member's name, never an error.
    #[must_use]
    pub fn to_name(&self, code: &str) -> &str {
        self.code_to_name
            .get(code.trim())
            .map_or(self.default_name.as_str(), String::as_str)
    }

    /// Returns true when `name` is a canonical color name.
    #[must_use]
    pub fn is_valid_name(&self, name: &str) -> bool {
        self.name_to_code.contains_key(name.trim())
    }

    /// Returns true when `code` is a canonical short code.
    #[must_use]
    pub fn is_valid_code(&self, code: &str) -> bool {
        self.code_to_name.contains_key(code.trim())
    }

    /// Resolves a raw label to a canonical color.
    ///
    /// Tries a full name first, then a short code (ASCII-lowercased), then
    /// falls back to the default member. Total over all input strings.
    #[must_use]
    pub fn resolve(&self, label: &str) -> CanonicalColor {
        let trimmed = label.trim();
        if self.is_valid_name(trimmed) {
            return CanonicalColor::new(trimmed);
        }
        let code = trimmed.to_ascii_lowercase();
        if let Some(name) = self.code_to_name.get(&code) {
            return CanonicalColor::new(name.clone());
        }
        CanonicalColor::new(self.default_name.clone())
    }

    /// Returns the default ("unmarked") member.
    #[must_use]
    pub fn default_color(&self) -> CanonicalColor {
        CanonicalColor::new(self.default_name.clone())
    }

    /// Iterates canonical `(name, code)` pairs in name order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.name_to_code
            .iter()
            .map(|(n, c)| (n.as_str(), c.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_and_code_are_bijective() {
        let vocab = ColorVocabulary::flower_default();
        let pairs: Vec<(String, String)> = vocab
            .entries()
            .map(|(n, c)| (n.to_string(), c.to_string()))
            .collect();
        assert!(!pairs.is_empty());
        for (name, code) in pairs {
            assert_eq!(vocab.to_code(&name), code);
            assert_eq!(vocab.to_name(&code), name);
        }
    }

    #[test]
    fn unknown_name_falls_back_to_default_code() {
        let vocab = ColorVocabulary::flower_default();
        assert_eq!(vocab.to_code("자홍"), "et");
        assert_eq!(vocab.to_code(""), "et");
    }

    #[test]
    fn unknown_code_falls_back_to_default_name() {
        let vocab = ColorVocabulary::flower_default();
        assert_eq!(vocab.to_name("zz"), "기타");
    }

    #[test]
    fn resolve_tries_name_then_code() {
        let vocab = ColorVocabulary::flower_default();
        assert_eq!(vocab.resolve("화이트").as_str(), "화이트");
        assert_eq!(vocab.resolve("wh").as_str(), "화이트");
        assert_eq!(vocab.resolve("WH").as_str(), "화이트");
        assert_eq!(vocab.resolve("mystery").as_str(), "기타");
    }

    #[test]
    fn construction_rejects_duplicate_names() {
        let err = ColorVocabulary::new(
            vec![("white", "wh"), ("white", "w2")],
            "white",
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidVocabulary { .. }));
    }

    #[test]
    fn construction_rejects_duplicate_codes() {
        let err = ColorVocabulary::new(
            vec![("white", "wh"), ("wheat", "wh")],
            "white",
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidVocabulary { .. }));
    }

    #[test]
    fn construction_rejects_foreign_default() {
        let err = ColorVocabulary::new(vec![("white", "wh")], "black").unwrap_err();
        assert!(matches!(err, CatalogError::InvalidVocabulary { .. }));
    }

    #[test]
    fn alternate_vocabulary_is_injectable() {
        let vocab =
            ColorVocabulary::new(vec![("white", "wh"), ("none", "na")], "none").unwrap();
        assert_eq!(vocab.resolve("white").as_str(), "white");
        assert_eq!(vocab.resolve("화이트").as_str(), "none");
    }
}
