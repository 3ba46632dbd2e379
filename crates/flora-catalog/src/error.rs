//! Error types for flora-catalog operations.
//!
//! Recovery policy follows the curation contract: anything wrong with one
//! asset (unreadable bytes, failed re-encode) skips that asset and records
//! it in the run report; a key conflict is resolved by the configured
//! policy and reported; only a failure to enumerate the input set at all
//! aborts a run.

use thiserror::Error;

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Two distinct contents target the same (entity, color) key.
    #[error(
        "key conflict on ({entity}, {color}): '{existing_path}' vs '{incoming_path}'"
    )]
    KeyConflict {
        /// Canonical entity key involved.
        entity: String,
        /// Canonical color involved.
        color: String,
        /// Origin path of the record already in the index.
        existing_path: String,
        /// Origin path of the record that was rejected.
        incoming_path: String,
    },

    /// The raw asset listing itself is unreachable. Fatal for a run.
    #[error("discovery failed: {message}")]
    Discovery {
        /// Description of the discovery failure.
        message: String,
    },

    /// Reading one asset's bytes failed. That asset is skipped.
    #[error("asset read failed at '{path}': {message}")]
    AssetRead {
        /// Origin path of the unreadable asset.
        path: String,
        /// Description of the read failure.
        message: String,
    },

    /// Re-encoding one asset failed. That asset is skipped.
    #[error("encode failed at '{path}': {message}")]
    Encode {
        /// Origin path of the asset that failed to encode.
        path: String,
        /// Description of the encode failure.
        message: String,
    },

    /// A storage operation failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
    },

    /// Serialization/deserialization failed.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// A color vocabulary table was internally inconsistent.
    #[error("invalid vocabulary: {message}")]
    InvalidVocabulary {
        /// Description of the inconsistency.
        message: String,
    },
}

impl From<flora_core::Error> for CatalogError {
    fn from(value: flora_core::Error) -> Self {
        Self::Storage {
            message: value.to_string(),
        }
    }
}
