//! API server implementation.
//!
//! Provides health, ready, and API endpoints for the Flora catalog.

use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use flora_catalog::CatalogIndex;
use flora_core::{Result, StorageBackend};

use crate::config::{Config, CorsConfig};
use crate::error::ApiError;
use crate::stories::StoryCorpus;

/// Health check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ReadyResponse {
    /// Service readiness status.
    pub ready: bool,
    /// Optional message about readiness state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Shared application state for all request handlers.
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// Storage backend holding assets and the published snapshot.
    storage: Arc<dyn StorageBackend>,
    /// The current catalog version. Swapped atomically on reload; handlers
    /// clone the `Arc` and read one immutable version per request.
    catalog: RwLock<Arc<CatalogIndex>>,
    /// Story corpus for the sample endpoint.
    corpus: StoryCorpus,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("storage", &"<StorageBackend>")
            .field("corpus_len", &self.corpus.len())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Creates application state over the given storage backend.
    #[must_use]
    pub fn new(config: Config, storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            config,
            storage,
            catalog: RwLock::new(Arc::new(CatalogIndex::new())),
            corpus: StoryCorpus::builtin(),
        }
    }

    /// Creates application state with in-memory storage (for testing).
    #[must_use]
    pub fn with_memory_storage(config: Config) -> Self {
        Self::new(config, Arc::new(flora_core::MemoryBackend::new()))
    }

    /// Returns the storage backend.
    #[must_use]
    pub fn storage_backend(&self) -> Arc<dyn StorageBackend> {
        Arc::clone(&self.storage)
    }

    /// Returns the story corpus.
    #[must_use]
    pub fn corpus(&self) -> &StoryCorpus {
        &self.corpus
    }

    /// Returns the current catalog version.
    pub fn catalog(&self) -> std::result::Result<Arc<CatalogIndex>, ApiError> {
        self.catalog
            .read()
            .map(|guard| Arc::clone(&guard))
            .map_err(|_| ApiError::internal("catalog lock poisoned"))
    }

    /// Replaces the published catalog version.
    pub fn publish_catalog(&self, index: CatalogIndex) -> std::result::Result<(), ApiError> {
        let mut guard = self
            .catalog
            .write()
            .map_err(|_| ApiError::internal("catalog lock poisoned"))?;
        *guard = Arc::new(index);
        Ok(())
    }

    /// Loads the published snapshot from storage, if present.
    pub async fn load_snapshot(&self) -> std::result::Result<bool, ApiError> {
        let backend = self.storage_backend();
        match flora_catalog::load_snapshot(&backend, &self.config.snapshot_path).await? {
            Some(index) => {
                let records = index.len();
                self.publish_catalog(index)?;
                tracing::info!(
                    path = %self.config.snapshot_path,
                    records,
                    "catalog snapshot loaded"
                );
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Health check endpoint handler.
///
/// Shallow liveness check; does not verify dependencies.
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness check endpoint handler.
///
/// A `HEAD` on a missing key is sufficient to validate credentials and the
/// network path without listing the bucket.
async fn ready(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> impl IntoResponse {
    let check_key = "__flora/ready-check";
    match state.storage_backend().head(check_key).await {
        Ok(_) => (
            StatusCode::OK,
            Json(ReadyResponse {
                ready: true,
                message: None,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                ready: false,
                message: Some(format!("storage check failed: {e}")),
            }),
        ),
    }
}

/// The Flora API server.
pub struct Server {
    config: Config,
    storage: Arc<dyn StorageBackend>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("storage", &"<StorageBackend>")
            .finish()
    }
}

impl Server {
    /// Creates a new server with in-memory storage.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            storage: Arc::new(flora_core::MemoryBackend::new()),
        }
    }

    /// Creates a new server with an explicit storage backend.
    #[must_use]
    pub fn with_storage_backend(config: Config, storage: Arc<dyn StorageBackend>) -> Self {
        Self { config, storage }
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn create_router(&self) -> (Router, Arc<AppState>) {
        let state = Arc::new(AppState::new(self.config.clone(), Arc::clone(&self.storage)));
        let cors = self.build_cors_layer();

        let router = Router::new()
            .route("/health", get(health))
            .route("/ready", get(ready))
            .nest("/api/v1", crate::routes::api_v1_routes())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::clone(&state));

        (router, state)
    }

    fn build_cors_layer(&self) -> CorsLayer {
        let cors_config = &self.config.cors;
        let cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::HEAD, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
            .max_age(Duration::from_secs(cors_config.max_age_seconds));
        Self::apply_cors_allowed_origins(cors, cors_config)
    }

    fn apply_cors_allowed_origins(cors: CorsLayer, cors_config: &CorsConfig) -> CorsLayer {
        if cors_config.allowed_origins.is_empty() {
            return cors;
        }

        if cors_config.allowed_origins.len() == 1
            && cors_config.allowed_origins.first().is_some_and(|o| o == "*")
        {
            return cors.allow_origin(Any);
        }

        if cors_config.allowed_origins.iter().any(|origin| origin == "*") {
            tracing::error!(
                origins = ?cors_config.allowed_origins,
                "Invalid CORS config: '*' must be the only allowed origin"
            );
            return cors;
        }

        let mut allowed = Vec::new();
        for origin in &cors_config.allowed_origins {
            match HeaderValue::from_str(origin) {
                Ok(value) => allowed.push(value),
                Err(_) => {
                    tracing::error!(
                        origin = %origin,
                        "Invalid CORS origin; expected a valid HeaderValue"
                    );
                }
            }
        }

        if allowed.is_empty() {
            tracing::warn!("All configured CORS origins were invalid; disabling CORS");
            cors
        } else {
            tracing::info!(origins = ?cors_config.allowed_origins, "CORS configured");
            cors.allow_origin(AllowOrigin::list(allowed))
        }
    }

    /// Starts the server and blocks until shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot bind to the port.
    pub async fn serve(&self) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let (router, state) = self.create_router();

        match state.load_snapshot().await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(
                    path = %state.config.snapshot_path,
                    "no catalog snapshot found; serving an empty catalog"
                );
            }
            Err(e) => {
                tracing::error!(error = %e.message(), "failed to load catalog snapshot");
            }
        }

        tracing::info!(http_port = self.config.http_port, "Starting Flora API server");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| flora_core::Error::Internal {
                message: format!("failed to bind to {addr}: {e}"),
            })?;

        axum::serve(listener, router)
            .await
            .map_err(|e| flora_core::Error::Internal {
                message: format!("server error: {e}"),
            })?;

        Ok(())
    }

    /// Creates a router plus its state without binding a socket, for tests.
    #[must_use]
    pub fn test_router(&self) -> (Router, Arc<AppState>) {
        self.create_router()
    }
}
