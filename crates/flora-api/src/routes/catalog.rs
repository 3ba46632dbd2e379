//! Read-only catalog routes.
//!
//! Handlers read one immutable catalog version per request; a reload swaps
//! the published version atomically.
//!
//! ## Routes
//!
//! - `GET  /catalog` - List entities
//! - `GET  /catalog/:entity` - List colors and records for an entity
//! - `GET  /catalog/:entity/:color` - Get one asset record
//! - `POST /catalog/reload` - Re-read the published snapshot from storage

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use flora_catalog::{AliasResolver, AssetRecord, ColorVocabulary};

use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

/// List entities response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ListEntitiesResponse {
    /// Canonical entity keys, in order.
    pub entities: Vec<String>,
}

/// One asset in an entity response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct AssetResponse {
    /// Canonical color name.
    pub color: String,
    /// Short color code.
    pub code: String,
    /// Content fingerprint (hex).
    pub fingerprint: String,
    /// Asset size in bytes.
    pub byte_len: u64,
    /// Storage path of the asset.
    pub path: String,
}

/// Entity response: every color the entity has an asset for.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct EntityResponse {
    /// Canonical entity key.
    pub entity: String,
    /// Assets by canonical color, in color order.
    pub assets: Vec<AssetResponse>,
}

/// Reload response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ReloadResponse {
    /// Whether a snapshot was found and published.
    pub loaded: bool,
    /// Records in the now-current catalog.
    pub records: usize,
}

/// Builds the catalog router.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/catalog", get(list_entities))
        .route("/catalog/reload", post(reload_catalog))
        .route("/catalog/:entity", get(get_entity))
        .route("/catalog/:entity/:color", get(get_asset))
}

fn asset_response(record: &AssetRecord, vocabulary: &ColorVocabulary) -> AssetResponse {
    AssetResponse {
        color: record.color.to_string(),
        code: vocabulary.to_code(record.color.as_str()).to_string(),
        fingerprint: record.fingerprint.to_string(),
        byte_len: record.byte_len,
        path: record.origin_path.clone(),
    }
}

async fn list_entities(State(state): State<Arc<AppState>>) -> ApiResult<Json<ListEntitiesResponse>> {
    let catalog = state.catalog()?;
    Ok(Json(ListEntitiesResponse {
        entities: catalog.entities().map(ToString::to_string).collect(),
    }))
}

async fn get_entity(
    State(state): State<Arc<AppState>>,
    Path(entity): Path<String>,
) -> ApiResult<Json<EntityResponse>> {
    let catalog = state.catalog()?;
    let vocabulary = ColorVocabulary::flower_default();
    let key = AliasResolver::flower_entities().canonicalize(&entity);

    if !catalog.contains_entity(&key) {
        return Err(ApiError::not_found(format!("entity not found: {entity}")));
    }

    let assets = catalog
        .list(&key)
        .iter()
        .filter_map(|color| catalog.get(&key, color))
        .map(|record| asset_response(record, &vocabulary))
        .collect();

    Ok(Json(EntityResponse {
        entity: key.to_string(),
        assets,
    }))
}

async fn get_asset(
    State(state): State<Arc<AppState>>,
    Path((entity, color)): Path<(String, String)>,
) -> ApiResult<Json<AssetResponse>> {
    let catalog = state.catalog()?;
    let vocabulary = ColorVocabulary::flower_default();
    let key = AliasResolver::flower_entities().canonicalize(&entity);
    let label = AliasResolver::flower_colors().canonical_label(&color);
    let canonical = vocabulary.resolve(&label);

    let record = catalog
        .get(&key, &canonical)
        .ok_or_else(|| ApiError::not_found(format!("no asset for ({entity}, {color})")))?;

    Ok(Json(asset_response(record, &vocabulary)))
}

async fn reload_catalog(State(state): State<Arc<AppState>>) -> ApiResult<Json<ReloadResponse>> {
    let loaded = state.load_snapshot().await?;
    let records = state.catalog()?.len();
    Ok(Json(ReloadResponse { loaded, records }))
}
