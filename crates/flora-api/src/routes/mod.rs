//! HTTP route handlers.

pub mod catalog;
pub mod stories;

use std::sync::Arc;

use axum::Router;

use crate::server::AppState;

/// `/api/v1` routes.
pub fn api_v1_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(stories::routes())
        .merge(catalog::routes())
}
