use super::StoreError;
use crate::domain::jobs::{Job, JobMode, JobUpdate, UpdateOutcome};
use async_trait::async_trait;

#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Create a `queued` job under a fresh random id and return the id.
    async fn create(
        &self,
        video_id: &str,
        mode: JobMode,
        title: Option<String>,
    ) -> Result<String, StoreError>;

    /// Fetch a job. `Ok(None)` means unknown or expired.
    async fn get(&self, job_id: &str) -> Result<Option<Job>, StoreError>;

    /// Read-modify-write merge of `update` into the job, refreshing its TTL.
    async fn update(&self, job_id: &str, update: JobUpdate) -> Result<UpdateOutcome, StoreError>;

    /// Backing store reachability.
    async fn ping(&self) -> bool;
}
