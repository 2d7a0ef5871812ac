use async_trait::async_trait;
use std::io;
use std::path::PathBuf;

/// Where produced artifacts live and how they are addressed publicly.
#[async_trait]
pub trait ArtifactStorage: Send + Sync {
    /// Deterministic local path of the artifact for `job_id`.
    fn local_path(&self, job_id: &str) -> PathBuf;

    /// Public location recorded in the job once the artifact is ready.
    fn public_location(&self, job_id: &str) -> String;

    /// Map a public location back to a file inside the storage root.
    ///
    /// Returns `None` for locations this storage does not own.
    fn resolve(&self, location: &str) -> Option<PathBuf>;

    /// Whether a public location currently points at an existing file.
    async fn exists(&self, location: &str) -> bool;

    /// Delete everything written for `job_id`, including partial downloads.
    async fn remove_partial(&self, job_id: &str) -> io::Result<()>;
}
