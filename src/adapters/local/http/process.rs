use super::{ApiError, AppState};
use crate::application::orchestrator::SubmitResponse;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    pub video_id: String,
    pub mode: String,
    #[serde(default)]
    pub title: Option<String>,
}

pub async fn handle(
    State(state): State<AppState>,
    payload: Result<Json<ProcessRequest>, JsonRejection>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let Json(request) = payload?;
    let title = request
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    let response = state
        .orchestrator
        .submit(&request.video_id, &request.mode, title)
        .await?;
    Ok(Json(response))
}
