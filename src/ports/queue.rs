use crate::domain::jobs::DownloadTask;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("download queue is closed")]
    Closed,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobQueuePort: Send + Sync {
    /// Hand a task to the worker pool without waiting for it to run.
    async fn enqueue_job(&self, task: DownloadTask) -> Result<(), QueueError>;

    /// Wait for the next task. `Ok(None)` once the queue is closed and drained.
    async fn dequeue_job(&self) -> Result<Option<DownloadTask>, QueueError>;
}
