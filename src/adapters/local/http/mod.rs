//! HTTP inbound adapter.
//!
//! JSON endpoints for search, job submission and polling, plus streaming
//! downloads and static serving of produced artifacts.

mod download;
mod error;
mod health;
mod process;
mod search;
mod status;

pub use error::ApiError;
pub use process::ProcessRequest;
pub use search::{SearchRequest, SearchResponse};

use crate::application::orchestrator::OrchestratorService;
use crate::application::search::SearchService;
use crate::ports::repository::JobRepository;
use crate::ports::slots::SlotController;
use crate::ports::storage::ArtifactStorage;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<OrchestratorService>,
    pub search: Arc<SearchService>,
    pub jobs: Arc<dyn JobRepository>,
    pub slots: Arc<dyn SlotController>,
    pub storage: Arc<dyn ArtifactStorage>,
}

/// CORS layer for a list of allowed origins; `*` (or nothing) allows any.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }
    let origins = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok());
    cors.allow_origin(AllowOrigin::list(origins))
}

/// Build the application router.
///
/// Artifacts under `files_root` are served at `media_prefix` so recorded
/// job locations resolve.
pub fn router(state: AppState, cors: CorsLayer, media_prefix: &str, files_root: &Path) -> Router {
    Router::new()
        .route("/search", post(search::handle))
        .route("/process", post(process::handle))
        .route("/status/:job_id", get(status::handle))
        .route("/download/:job_id", get(download::handle))
        .route("/health", get(health::handle))
        .nest_service(media_prefix, ServeDir::new(files_root))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
