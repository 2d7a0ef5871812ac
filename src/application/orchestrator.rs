use crate::domain::jobs::{DownloadTask, InvalidMode, JobMode, JobStatus, JobUpdate, UpdateOutcome};
use crate::domain::media::{embed_url, is_valid_video_id};
use crate::ports::cache::AudioCache;
use crate::ports::queue::{JobQueuePort, QueueError};
use crate::ports::repository::JobRepository;
use crate::ports::storage::ArtifactStorage;
use crate::ports::StoreError;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    InvalidMode(#[from] InvalidMode),
    #[error("invalid video id: {0:?}")]
    InvalidVideoId(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("job {job_id} could not be dispatched: {source}")]
    Dispatch {
        job_id: String,
        #[source]
        source: QueueError,
    },
}

/// Reply to a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitResponse {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embed_url: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cached: bool,
}

/// Turns a request into a job: embed, cache hit, or background download.
pub struct OrchestratorService {
    jobs: Arc<dyn JobRepository>,
    audio_cache: Arc<dyn AudioCache>,
    queue: Arc<dyn JobQueuePort>,
    storage: Arc<dyn ArtifactStorage>,
}

impl OrchestratorService {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        audio_cache: Arc<dyn AudioCache>,
        queue: Arc<dyn JobQueuePort>,
        storage: Arc<dyn ArtifactStorage>,
    ) -> Self {
        Self {
            jobs,
            audio_cache,
            queue,
            storage,
        }
    }

    pub async fn submit(
        &self,
        video_id: &str,
        mode: &str,
        title: Option<String>,
    ) -> Result<SubmitResponse, SubmitError> {
        // Nothing is created for a request that cannot be served.
        let mode: JobMode = mode.parse()?;
        if !is_valid_video_id(video_id) {
            return Err(SubmitError::InvalidVideoId(video_id.to_string()));
        }

        let job_id = self.jobs.create(video_id, mode, title).await?;
        info!(job_id, video_id, %mode, "Job created");

        match mode {
            JobMode::Video => {
                let embed = embed_url(video_id);
                self.settle(&job_id, JobUpdate::embedded(embed.clone()))
                    .await?;
                Ok(SubmitResponse {
                    job_id,
                    status: JobStatus::Ready,
                    embed_url: Some(embed),
                    cached: false,
                })
            }
            JobMode::Audio => {
                if let Some(location) = self.cached_artifact(video_id).await {
                    self.settle(&job_id, JobUpdate::ready(location)).await?;
                    info!(job_id, video_id, "Audio cache hit");
                    return Ok(SubmitResponse {
                        job_id,
                        status: JobStatus::Ready,
                        embed_url: None,
                        cached: true,
                    });
                }

                let task = DownloadTask {
                    job_id: job_id.clone(),
                    video_id: video_id.to_string(),
                };
                if let Err(source) = self.queue.enqueue_job(task).await {
                    warn!(job_id, error = %source, "Dispatch failed");
                    return Err(SubmitError::Dispatch { job_id, source });
                }
                Ok(SubmitResponse {
                    job_id,
                    status: JobStatus::Queued,
                    embed_url: None,
                    cached: false,
                })
            }
        }
    }

    /// Cached location for `video_id`, if its artifact is still on disk.
    async fn cached_artifact(&self, video_id: &str) -> Option<String> {
        let location = self.audio_cache.lookup(video_id).await.hit()?;
        if self.storage.exists(&location).await {
            Some(location)
        } else {
            warn!(video_id, location, "Cached artifact is gone, downloading again");
            None
        }
    }

    /// Apply a synchronous terminal update to a job created moments ago.
    async fn settle(&self, job_id: &str, update: JobUpdate) -> Result<(), SubmitError> {
        match self.jobs.update(job_id, update).await? {
            UpdateOutcome::Applied(_) => Ok(()),
            UpdateOutcome::Expired => Err(StoreError::Unavailable(format!(
                "job {} vanished right after creation",
                job_id
            ))
            .into()),
            UpdateOutcome::Rejected(e) => Err(StoreError::Unavailable(e.to_string()).into()),
        }
    }
}
