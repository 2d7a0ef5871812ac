use super::retry::RetryPolicy;
use crate::domain::jobs::{DownloadTask, Job, JobStatus, JobUpdate, UpdateOutcome};
use crate::ports::cache::AudioCache;
use crate::ports::extractor::{FetchedAudio, MediaExtractor};
use crate::ports::queue::JobQueuePort;
use crate::ports::repository::JobRepository;
use crate::ports::slots::SlotController;
use crate::ports::storage::ArtifactStorage;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub const SLOTS_BUSY_MESSAGE: &str = "All download slots are busy; submit again shortly";

/// Collaborators of the download worker.
#[derive(Clone)]
pub struct WorkerDeps {
    pub jobs: Arc<dyn JobRepository>,
    pub slots: Arc<dyn SlotController>,
    pub audio_cache: Arc<dyn AudioCache>,
    pub storage: Arc<dyn ArtifactStorage>,
    pub extractor: Arc<dyn MediaExtractor>,
    pub queue: Arc<dyn JobQueuePort>,
}

pub struct WorkerService {
    deps: WorkerDeps,
    retry: RetryPolicy,
    audio_ttl: Duration,
}

impl WorkerService {
    pub fn new(deps: WorkerDeps, retry: RetryPolicy, audio_ttl: Duration) -> Self {
        Self {
            deps,
            retry,
            audio_ttl,
        }
    }

    /// Start `count` workers draining the dispatch queue.
    pub fn spawn_pool(self: &Arc<Self>, count: usize) -> Vec<JoinHandle<()>> {
        (0..count)
            .map(|worker_id| {
                let worker = Arc::clone(self);
                tokio::spawn(async move { worker.run_worker_loop(worker_id).await })
            })
            .collect()
    }

    /// Process tasks until the queue is closed and drained.
    pub async fn run_worker_loop(&self, worker_id: usize) {
        info!(worker_id, "Worker started");
        loop {
            match self.deps.queue.dequeue_job().await {
                Ok(Some(task)) => self.process(&task).await,
                Ok(None) => break,
                Err(e) => {
                    error!(worker_id, error = %e, "Queue error");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
        info!(worker_id, "Worker stopped");
    }

    /// Run one download task. Every failure ends up in the job record.
    pub async fn process(&self, task: &DownloadTask) {
        let job_id = task.job_id.as_str();
        match self.deps.slots.try_acquire(job_id).await {
            Ok(true) => {}
            Ok(false) => {
                info!(job_id, "No free download slot");
                self.record(job_id, JobUpdate::waiting(SLOTS_BUSY_MESSAGE))
                    .await;
                return;
            }
            Err(e) => {
                warn!(job_id, error = %e, "Slot admission unavailable");
                self.record(
                    job_id,
                    JobUpdate::waiting(format!("Download slots unavailable: {}", e)),
                )
                .await;
                return;
            }
        }

        let outcome = AssertUnwindSafe(self.download(task)).catch_unwind().await;
        if let Err(panic) = outcome {
            let reason = panic_message(panic.as_ref());
            error!(job_id, reason, "Download panicked");
            self.discard_partial(job_id).await;
            self.record(job_id, JobUpdate::failed(format!("Download crashed: {}", reason)))
                .await;
        }

        // Held slots must never leak, whatever happened above.
        if let Err(e) = self.deps.slots.release(job_id).await {
            warn!(job_id, error = %e, "Could not release download slot");
        }
    }

    async fn download(&self, task: &DownloadTask) {
        let job_id = task.job_id.as_str();
        let Some(job) = self
            .record(job_id, JobUpdate::status(JobStatus::Downloading))
            .await
        else {
            return;
        };

        let dest = self.deps.storage.local_path(job_id);
        let fetched = self
            .retry
            .run("fetch_audio", |attempt| {
                debug!(job_id, video_id = task.video_id.as_str(), attempt, "Fetching audio");
                self.deps.extractor.fetch_audio(&task.video_id, &dest)
            })
            .await;

        match fetched {
            Ok(audio) if audio.path != dest => {
                warn!(job_id, reported = ?audio.path, expected = ?dest, "Extractor wrote audio elsewhere");
                self.discard_partial(job_id).await;
                self.record(
                    job_id,
                    JobUpdate::failed(format!("Audio was written to {:?} instead of {:?}", audio.path, dest)),
                )
                .await;
            }
            Ok(audio) => self.complete(&job, audio).await,
            Err(e) => {
                warn!(job_id, video_id = task.video_id.as_str(), error = %e, "Download failed");
                self.discard_partial(job_id).await;
                self.record(job_id, JobUpdate::failed(e.to_string())).await;
            }
        }
    }

    async fn complete(&self, job: &Job, audio: FetchedAudio) {
        let location = self.deps.storage.public_location(&job.id);
        let title = if job.title.is_none() { audio.title } else { None };
        let update = JobUpdate::ready(location.clone()).with_title(title);

        if self.record(&job.id, update).await.is_some() {
            info!(job_id = job.id.as_str(), video_id = job.video_id.as_str(), location, "Download ready");
            self.deps
                .audio_cache
                .store(&job.video_id, &location, self.audio_ttl)
                .await;
        }
    }

    async fn discard_partial(&self, job_id: &str) {
        if let Err(e) = self.deps.storage.remove_partial(job_id).await {
            warn!(job_id, error = %e, "Could not remove partial artifact");
        }
    }

    /// Write `update` and return the new record if it was applied.
    async fn record(&self, job_id: &str, update: JobUpdate) -> Option<Job> {
        match self.deps.jobs.update(job_id, update).await {
            Ok(UpdateOutcome::Applied(job)) => {
                debug!(job_id, status = %job.status, "Job updated");
                Some(job)
            }
            Ok(UpdateOutcome::Expired) => {
                info!(job_id, "Job expired, update dropped");
                None
            }
            Ok(UpdateOutcome::Rejected(e)) => {
                warn!(job_id, error = %e, "Job update rejected");
                None
            }
            Err(e) => {
                error!(job_id, error = %e, "Job update failed");
                None
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
