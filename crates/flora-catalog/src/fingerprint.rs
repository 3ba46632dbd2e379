//! Content identity for binary assets.
//!
//! A fingerprint is a whole-content SHA-256 digest compared for exact
//! equality only. Two assets with equal fingerprints are the same
//! underlying image regardless of filename or declared color label; this
//! is the primary signal for collapsing accidental copies left behind by
//! earlier ingestion scripts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

/// Whole-content digest of one asset.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Computes the fingerprint of the given bytes.
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        Self(digest.into())
    }

    /// Returns the raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}

/// Error parsing a fingerprint from its hex form.
#[derive(Debug, thiserror::Error)]
#[error("invalid fingerprint: {0}")]
pub struct FingerprintParseError(String);

impl FromStr for Fingerprint {
    type Err = FingerprintParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 64 {
            return Err(FingerprintParseError(format!(
                "expected 64 hex chars, got {}",
                s.len()
            )));
        }
        let mut bytes = [0u8; 32];
        for (i, chunk) in s.as_bytes().chunks_exact(2).enumerate() {
            let hex = std::str::from_utf8(chunk)
                .map_err(|_| FingerprintParseError("non-ascii input".to_string()))?;
            bytes[i] = u8::from_str_radix(hex, 16)
                .map_err(|_| FingerprintParseError(format!("bad hex pair '{hex}'")))?;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_bytes_share_a_fingerprint() {
        let a = Fingerprint::of(b"white rose");
        let b = Fingerprint::of(b"white rose");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_bytes_differ() {
        assert_ne!(Fingerprint::of(b"white rose"), Fingerprint::of(b"red rose"));
    }

    #[test]
    fn hex_roundtrip() {
        let fp = Fingerprint::of(b"tulip");
        let hex = fp.to_string();
        assert_eq!(hex.len(), 64);
        let parsed: Fingerprint = hex.parse().expect("hex form should parse");
        assert_eq!(parsed, fp);
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!("zz".repeat(32).parse::<Fingerprint>().is_err());
        assert!("abcd".parse::<Fingerprint>().is_err());
    }

    #[test]
    fn serde_uses_hex_string() {
        let fp = Fingerprint::of(b"rose");
        let json = serde_json::to_string(&fp).unwrap();
        assert_eq!(json, format!("\"{fp}\""));
        let back: Fingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fp);
    }
}
