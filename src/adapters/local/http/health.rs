use super::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub redis: bool,
    pub active_downloads: Option<usize>,
}

/// Always answers; a broken backing store shows up as `degraded`.
pub async fn handle(State(state): State<AppState>) -> Json<HealthResponse> {
    let redis = state.jobs.ping().await;
    let active_downloads = match state.slots.active().await {
        Ok(count) => Some(count),
        Err(e) => {
            warn!(error = %e, "Could not count active downloads");
            None
        }
    };
    Json(HealthResponse {
        status: if redis { "ok" } else { "degraded" },
        redis,
        active_downloads,
    })
}
