use super::{ApiError, AppState};
use crate::domain::jobs::{JobMode, JobStatus};
use crate::domain::media::{artifact_file_name, download_file_name};
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use std::io;
use tokio_util::io::ReaderStream;

fn not_found() -> ApiError {
    ApiError::NotFound("File not found".to_string())
}

/// `Content-Disposition` for a download.
///
/// Non-ASCII names get an ASCII `filename` for old clients plus the real
/// name as an RFC 5987 `filename*`.
fn content_disposition(title: Option<&str>, job_id: &str) -> HeaderValue {
    let name = download_file_name(title, job_id);
    let value = if name.is_ascii() {
        format!("attachment; filename=\"{}\"", name)
    } else {
        let fallback: String = name
            .chars()
            .map(|c| if c.is_ascii() { c } else { '_' })
            .collect();
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            urlencoding::encode(&name)
        )
    };
    HeaderValue::from_str(&value).unwrap_or_else(|_| {
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", artifact_file_name(job_id)))
            .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
    })
}

pub async fn handle(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Response, ApiError> {
    let job = state
        .jobs
        .get(&job_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))?;
    if job.mode != JobMode::Audio || job.status != JobStatus::Ready {
        return Err(not_found());
    }

    // Cache-hit jobs point at an artifact produced by an earlier job.
    let path = job
        .url
        .as_deref()
        .and_then(|location| state.storage.resolve(location))
        .unwrap_or_else(|| state.storage.local_path(&job.id));

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => return Err(ApiError::Internal(format!("Could not open artifact: {}", e))),
    };
    let length = file
        .metadata()
        .await
        .map_err(|e| ApiError::Internal(format!("Could not stat artifact: {}", e)))?
        .len();

    let mut response = Body::from_stream(ReaderStream::new(file)).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/mpeg"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    headers.insert(
        header::CONTENT_DISPOSITION,
        content_disposition(job.title.as_deref(), &job.id),
    );
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_uses_sanitized_title() {
        let value = content_disposition(Some("AC/DC: Back in Black"), "j1");
        assert_eq!(value, "attachment; filename=\"AC_DC_ Back in Black.mp3\"");
    }

    #[test]
    fn test_disposition_falls_back_to_job_id() {
        assert_eq!(
            content_disposition(None, "j1"),
            "attachment; filename=\"j1.mp3\""
        );
    }

    #[test]
    fn test_disposition_keeps_unicode_title() {
        assert_eq!(
            content_disposition(Some("Café del Mar – Sunset"), "3f2a"),
            "attachment; filename=\"Caf_ del Mar _ Sunset.mp3\"; \
             filename*=UTF-8''Caf%C3%A9%20del%20Mar%20_%20Sunset.mp3"
        );
        let value = content_disposition(Some("パラボラ"), "3f2a");
        assert!(value
            .to_str()
            .unwrap()
            .ends_with("filename*=UTF-8''%E3%83%91%E3%83%A9%E3%83%9C%E3%83%A9.mp3"));
    }
}
