//! # flora-core
//!
//! Shared primitives for the Flora flower-asset catalog backend.
//!
//! This crate provides the foundational types used across all Flora
//! components:
//!
//! - **Storage Backends**: one contract over memory, local filesystem, and
//!   remote object storage
//! - **Error Types**: shared error definitions and result aliases
//! - **Observability**: logging initialization and span helpers
//!
//! Catalog semantics (vocabularies, reconciliation) live in `flora-catalog`;
//! this crate knows nothing about flowers or colors, only bytes and paths.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]

pub mod error;
pub mod local;
pub mod observability;
pub mod remote;
pub mod storage;

pub use error::{Error, Result};
pub use local::LocalFsBackend;
pub use observability::{LogFormat, init_logging, reconcile_span};
pub use remote::ObjectStoreBackend;
pub use storage::{MemoryBackend, ObjectMeta, StorageBackend};
