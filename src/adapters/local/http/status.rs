use super::{ApiError, AppState};
use crate::domain::jobs::Job;
use axum::extract::{Path, State};
use axum::Json;

pub async fn handle(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    state
        .jobs
        .get(&job_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))
}
