//! Router-level tests over in-process adapters and a fake extractor.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use mediafetch::adapters::local::channel::ChannelQueue;
use mediafetch::adapters::local::fs::FsAdapter;
use mediafetch::adapters::local::http::cors_layer;
use mediafetch::adapters::memory::MemoryStore;
use mediafetch::application::orchestrator::OrchestratorService;
use mediafetch::application::retry::RetryPolicy;
use mediafetch::application::search::SearchService;
use mediafetch::application::worker::{WorkerDeps, WorkerService};
use mediafetch::domain::search::SearchResult;
use mediafetch::ports::extractor::{ExtractionError, FetchedAudio, MediaExtractor};
use mediafetch::{router, AppState};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

/// Knows one searchable track; fetching `broken` always fails.
#[derive(Default)]
struct FakeExtractor {
    fetches: AtomicUsize,
}

#[async_trait]
impl MediaExtractor for FakeExtractor {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, ExtractionError> {
        if !query.to_lowercase().contains("parabola") {
            return Ok(Vec::new());
        }
        let entry = json!({"id": "abc123", "title": "Parabola", "uploader": "TOOL", "duration": 363});
        Ok(SearchResult::from_catalog_entry(&entry)
            .into_iter()
            .take(limit)
            .collect())
    }

    async fn fetch_audio(&self, video_id: &str, dest: &Path) -> Result<FetchedAudio, ExtractionError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if video_id == "broken" {
            return Err(ExtractionError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "ERROR: Video unavailable".to_string(),
            });
        }
        tokio::fs::write(dest, b"ID3 fake audio").await?;
        Ok(FetchedAudio {
            path: dest.to_path_buf(),
            title: Some("Parabola".to_string()),
        })
    }
}

struct TestApp {
    app: Router,
    extractor: Arc<FakeExtractor>,
    _dir: TempDir,
}

fn spawn_app() -> TestApp {
    let dir = tempdir().unwrap();
    let store = Arc::new(MemoryStore::new(
        Duration::from_secs(3600),
        5,
        Duration::from_secs(3600),
    ));
    let fs = Arc::new(FsAdapter::new(dir.path(), "/media/files"));
    let extractor = Arc::new(FakeExtractor::default());
    let queue = Arc::new(ChannelQueue::new());

    let worker = Arc::new(WorkerService::new(
        WorkerDeps {
            jobs: store.clone(),
            slots: store.clone(),
            audio_cache: store.clone(),
            storage: fs.clone(),
            extractor: extractor.clone(),
            queue: queue.clone(),
        },
        RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        },
        Duration::from_secs(3600),
    ));
    worker.spawn_pool(2);

    let state = AppState {
        orchestrator: Arc::new(OrchestratorService::new(
            store.clone(),
            store.clone(),
            queue,
            fs.clone(),
        )),
        search: Arc::new(SearchService::new(
            extractor.clone(),
            store.clone(),
            6,
            Duration::from_secs(3600),
        )),
        jobs: store.clone(),
        slots: store,
        storage: fs,
    };
    let app = router(state, cors_layer(&["*".to_string()]), "/media/files", dir.path());
    TestApp {
        app,
        extractor,
        _dir: dir,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body.to_vec())
    }

    async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::get(uri).body(Body::empty()).unwrap();
        let (status, _, body) = self.send(request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn post_json(&self, uri: &str, payload: Value) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap();
        let (status, _, body) = self.send(request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    /// Poll `/status` until the job leaves the non-terminal states.
    async fn wait_for_terminal(&self, job_id: &str) -> Value {
        for _ in 0..200 {
            let (status, job) = self.get_json(&format!("/status/{}", job_id)).await;
            assert_eq!(status, StatusCode::OK);
            if job["status"] == "ready" || job["status"] == "failed" {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} never reached a terminal state", job_id);
    }
}

#[tokio::test]
async fn test_video_mode_is_ready_immediately() {
    let app = spawn_app();
    let (status, body) = app
        .post_json("/process", json!({"video_id": "abc123", "mode": "video"}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert!(body["embed_url"].as_str().unwrap().contains("abc123"));

    let job_id = body["job_id"].as_str().unwrap();
    let (_, job) = app.get_json(&format!("/status/{}", job_id)).await;
    assert_eq!(job["status"], "ready");
    assert_eq!(job["mode"], "video");
    assert_eq!(app.extractor.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_invalid_mode_is_bad_request() {
    let app = spawn_app();
    let (status, body) = app
        .post_json("/process", json!({"video_id": "abc123", "mode": "invalid"}))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("invalid"));
}

#[tokio::test]
async fn test_invalid_video_id_is_bad_request() {
    let app = spawn_app();
    let (status, _) = app
        .post_json("/process", json!({"video_id": "../../etc", "mode": "audio"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_bodies_use_detail_errors() {
    let app = spawn_app();
    let (status, body) = app
        .post_json("/process", json!({"video_id": "abc123"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("mode"));

    let request = Request::post("/search")
        .body(Body::from(r#"{"query": "parabola"}"#))
        .unwrap();
    let (status, _, bytes) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["detail"].as_str().unwrap().contains("Content-Type"));
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let app = spawn_app();
    let (status, body) = app.get_json("/status/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"detail": "Job not found"}));

    let (status, _) = app.get_json("/download/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_search_results_and_empty_matches() {
    let app = spawn_app();
    let (status, body) = app
        .post_json("/search", json!({"query": "Parabola Tool"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["id"], "abc123");
    assert_eq!(body["results"][0]["uploader"], "TOOL");
    assert_eq!(body["results"][0]["duration"], 363);
    assert_eq!(
        body["results"][0]["url"],
        "https://www.youtube.com/watch?v=abc123"
    );

    let (status, body) = app
        .post_json("/search", json!({"query": "nothing matches this"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"results": []}));
}

#[tokio::test]
async fn test_empty_search_query_is_bad_request() {
    let app = spawn_app();
    let (status, _) = app.post_json("/search", json!({"query": "  "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_audio_job_downloads_then_serves_file() {
    let app = spawn_app();
    let (status, body) = app
        .post_json("/process", json!({"video_id": "abc123", "mode": "audio"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "queued");
    assert!(body.get("cached").is_none());

    let job_id = body["job_id"].as_str().unwrap().to_string();
    let job = app.wait_for_terminal(&job_id).await;
    assert_eq!(job["status"], "ready");
    assert_eq!(job["title"], "Parabola");
    let url = job["url"].as_str().unwrap();
    assert_eq!(url, format!("/media/files/{}.mp3", job_id));

    let request = Request::get(format!("/download/{}", job_id))
        .body(Body::empty())
        .unwrap();
    let (status, headers, bytes) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"ID3 fake audio");
    assert_eq!(headers[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Parabola.mp3\""
    );

    // The recorded location is served statically as well.
    let (status, _, bytes) = app
        .send(Request::get(url).body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"ID3 fake audio");
}

#[tokio::test]
async fn test_second_audio_request_is_served_from_cache() {
    let app = spawn_app();
    let (_, first) = app
        .post_json("/process", json!({"video_id": "abc123", "mode": "audio"}))
        .await;
    let first_job = app
        .wait_for_terminal(first["job_id"].as_str().unwrap())
        .await;
    assert_eq!(first_job["status"], "ready");

    let (status, second) = app
        .post_json("/process", json!({"video_id": "abc123", "mode": "audio"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["status"], "ready");
    assert_eq!(second["cached"], true);
    assert_eq!(app.extractor.fetches.load(Ordering::SeqCst), 1);

    let second_id = second["job_id"].as_str().unwrap();
    let (_, job) = app.get_json(&format!("/status/{}", second_id)).await;
    assert_eq!(job["url"], first_job["url"]);

    let request = Request::get(format!("/download/{}", second_id))
        .body(Body::empty())
        .unwrap();
    let (status, _, bytes) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bytes, b"ID3 fake audio");
}

#[tokio::test]
async fn test_failed_download_reports_error_and_is_stable() {
    let app = spawn_app();
    let (_, body) = app
        .post_json("/process", json!({"video_id": "broken", "mode": "audio"}))
        .await;
    let job_id = body["job_id"].as_str().unwrap().to_string();

    let job = app.wait_for_terminal(&job_id).await;
    assert_eq!(job["status"], "failed");
    assert!(job["error"].as_str().unwrap().contains("Video unavailable"));
    assert_eq!(app.extractor.fetches.load(Ordering::SeqCst), 2);

    // Terminal payloads do not change between polls.
    let (_, again) = app.get_json(&format!("/status/{}", job_id)).await;
    assert_eq!(again, job);

    let (status, _) = app.get_json(&format!("/download/{}", job_id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health_reports_store_and_slots() {
    let app = spawn_app();
    let (status, body) = app.get_json("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"status": "ok", "redis": true, "active_downloads": 0})
    );
}
