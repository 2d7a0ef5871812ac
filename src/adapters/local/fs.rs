use crate::domain::media::artifact_file_name;
use crate::ports::storage::ArtifactStorage;
use async_trait::async_trait;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// Artifacts as flat files under one root directory.
#[derive(Clone, Debug)]
pub struct FsAdapter {
    root: PathBuf,
    url_prefix: String,
}

impl FsAdapter {
    pub fn new(root: impl Into<PathBuf>, url_prefix: &str) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_root(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Delete files in the root last modified more than `max_age` ago.
    ///
    /// Returns the number of files removed.
    pub async fn cleanup_older_than(&self, max_age: Duration) -> io::Result<usize> {
        let cutoff = SystemTime::now()
            .checked_sub(max_age)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let modified = tokio::fs::metadata(&path)
                .await
                .and_then(|m| if m.is_file() { m.modified().map(Some) } else { Ok(None) });
            let modified = match modified {
                Ok(Some(modified)) => modified,
                Ok(None) => continue,
                // Vanished mid-scan or a dangling link.
                Err(e) => {
                    warn!(path = ?path, error = %e, "Could not inspect artifact, skipping");
                    continue;
                }
            };
            if modified <= cutoff {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => removed += 1,
                    Err(e) => warn!(path = ?path, error = %e, "Could not remove old artifact"),
                }
            }
        }
        info!(removed, root = ?self.root, "Old artifacts cleaned up");
        Ok(removed)
    }
}

#[async_trait]
impl ArtifactStorage for FsAdapter {
    fn local_path(&self, job_id: &str) -> PathBuf {
        self.root.join(artifact_file_name(job_id))
    }

    fn public_location(&self, job_id: &str) -> String {
        format!("{}/{}", self.url_prefix, artifact_file_name(job_id))
    }

    fn resolve(&self, location: &str) -> Option<PathBuf> {
        let name = location.strip_prefix(&self.url_prefix)?.strip_prefix('/')?;
        let mut components = Path::new(name).components();
        // Exactly one plain file name; no traversal out of the root.
        match (components.next(), components.next()) {
            (Some(Component::Normal(file)), None) => Some(self.root.join(file)),
            _ => None,
        }
    }

    async fn exists(&self, location: &str) -> bool {
        match self.resolve(location) {
            Some(path) => tokio::fs::metadata(path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false),
            None => false,
        }
    }

    async fn remove_partial(&self, job_id: &str) -> io::Result<()> {
        // The extractor writes intermediates as `<job_id>.<ext>` (and
        // `.part` variants) before producing the final file.
        let prefix = format!("{}.", job_id);
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(&prefix) {
                debug!(path = ?entry.path(), "Removing partial artifact");
                tokio::fs::remove_file(entry.path()).await?;
            }
        }
        Ok(())
    }
}
