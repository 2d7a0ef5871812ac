use crate::domain::search::SearchResult;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("failed to start extractor: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("extractor exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("extractor reported success but {0:?} was not written")]
    MissingOutput(PathBuf),
    #[error("extractor timed out")]
    Timeout,
}

/// Audio produced for a catalog id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedAudio {
    pub path: PathBuf,
    pub title: Option<String>,
}

/// The external search/extraction engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Resolve a free-text query to at most `limit` catalog candidates.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, ExtractionError>;

    /// Fetch the audio of `video_id` into `dest`.
    async fn fetch_audio(&self, video_id: &str, dest: &Path) -> Result<FetchedAudio, ExtractionError>;
}
