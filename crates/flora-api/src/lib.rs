//! # flora-api
//!
//! HTTP composition layer for the Flora flower-recommendation backend.
//!
//! This crate provides the API surface for Flora, handling:
//!
//! - **Routing**: health, story sampling, and read-only catalog endpoints
//! - **Service wiring**: storage backend + published catalog snapshot
//! - **Observability**: request tracing and health checks
//!
//! ## Design principles
//!
//! This crate is a **thin composition layer** with no domain policy.
//! Catalog semantics live in `flora-catalog`; the only state here is the
//! currently published [`flora_catalog::CatalogIndex`] version, swapped
//! atomically on reload.
//!
//! ## Endpoints
//!
//! ```text
//! GET  /health                        - Health check
//! GET  /ready                         - Readiness check (storage reachable)
//! GET  /api/v1/stories                - Sample stories (count, category)
//! GET  /api/v1/catalog                - List entities
//! GET  /api/v1/catalog/{entity}       - Assets for one entity
//! GET  /api/v1/catalog/{entity}/{color} - One asset record
//! POST /api/v1/catalog/reload         - Re-read the published snapshot
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod routes;
pub mod server;
pub mod stories;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use server::{AppState, Server};
