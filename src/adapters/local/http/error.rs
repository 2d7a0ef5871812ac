use crate::application::orchestrator::SubmitError;
use crate::application::search::SearchError;
use crate::ports::StoreError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

/// Error returned by every handler; rendered as `{"detail": message}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        }
        let body = Json(serde_json::json!({
            "detail": self.to_string(),
        }));
        (status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Unavailable(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::InvalidMode(_) | SubmitError::InvalidVideoId(_) => {
                ApiError::BadRequest(err.to_string())
            }
            SubmitError::Store(e) => e.into(),
            SubmitError::Dispatch { .. } => ApiError::Unavailable(err.to_string()),
        }
    }
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::EmptyQuery => ApiError::BadRequest(err.to_string()),
            SearchError::Extraction(_) => ApiError::Upstream(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::jobs::InvalidMode;
    use crate::ports::extractor::ExtractionError;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        let invalid: ApiError = SubmitError::InvalidMode(InvalidMode("mp4".into())).into();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let store: ApiError = SubmitError::Store(StoreError::Timeout(Duration::from_secs(2))).into();
        assert_eq!(store.status(), StatusCode::SERVICE_UNAVAILABLE);

        let empty: ApiError = SearchError::EmptyQuery.into();
        assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

        let upstream: ApiError = SearchError::Extraction(ExtractionError::Timeout).into();
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_body_uses_detail_field() {
        let response = ApiError::NotFound("Job not found".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, serde_json::json!({"detail": "Job not found"}));
    }
}
