//! Sample-story routes.
//!
//! ## Routes
//!
//! - `GET /stories` - Sample stories from the fixed corpus

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::server::AppState;
use crate::stories::Story;

/// Query parameters for the sample endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct SampleQuery {
    /// Number of stories to return. Clamped, never an error.
    pub count: Option<usize>,
    /// Restrict sampling to one category.
    pub category: Option<String>,
}

/// Sample response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct SampleResponse {
    /// Sampled stories, without replacement.
    pub stories: Vec<Story>,
}

/// Builds the story router.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/stories", get(sample_stories))
}

async fn sample_stories(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SampleQuery>,
) -> ApiResult<Json<SampleResponse>> {
    let mut rng = rand::thread_rng();
    let stories = state
        .corpus()
        .sample(&mut rng, query.count, query.category.as_deref())
        .ok_or_else(|| {
            let category = query.category.as_deref().unwrap_or_default();
            ApiError::not_found(format!("no stories in category '{category}'"))
        })?;
    Ok(Json(SampleResponse { stories }))
}
