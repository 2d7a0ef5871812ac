use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// What the client asked for: a local audio artifact or an embeddable player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobMode {
    Audio,
    Video,
}

impl JobMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobMode::Audio => "audio",
            JobMode::Video => "video",
        }
    }
}

impl fmt::Display for JobMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid mode: {0:?} (expected \"audio\" or \"video\")")]
pub struct InvalidMode(pub String);

impl FromStr for JobMode {
    type Err = InvalidMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(JobMode::Audio),
            "video" => Ok(JobMode::Video),
            other => Err(InvalidMode(other.to_string())),
        }
    }
}

/// Job lifecycle.
///
/// `queued -> downloading -> ready | failed`, plus the cache-hit shortcut
/// `queued -> ready`. `ready` and `failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Downloading,
    Ready,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Ready | JobStatus::Failed)
    }

    /// Whether a record in `self` may be moved to `next`.
    ///
    /// Staying in a non-terminal state is allowed so that other fields (such
    /// as the slot refusal message) can be updated without a status change.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        match (self, next) {
            (Queued, Queued) | (Downloading, Downloading) => true,
            (Queued, Downloading) | (Queued, Ready) => true,
            (Downloading, Ready) | (Downloading, Failed) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Downloading => "downloading",
            JobStatus::Ready => "ready",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("job {job_id}: cannot move from {from} to {to}")]
pub struct TransitionError {
    pub job_id: String,
    pub from: JobStatus,
    pub to: JobStatus,
}

/// Canonical job record, owned by the job repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub video_id: String,
    pub mode: JobMode,
    pub title: Option<String>,
    pub status: JobStatus,
    pub url: Option<String>,
    pub embed_url: Option<String>,
    pub error: Option<String>,
    /// Informational note for non-terminal states (e.g. waiting for a slot).
    #[serde(default)]
    pub message: Option<String>,
}

impl Job {
    pub fn new(id: String, video_id: String, mode: JobMode, title: Option<String>) -> Self {
        Self {
            id,
            video_id,
            mode,
            title,
            status: JobStatus::Queued,
            url: None,
            embed_url: None,
            error: None,
            message: None,
        }
    }

    /// Merge `update` into the record.
    ///
    /// Fields left as `None` in the update keep their current value. A status
    /// change that the state machine does not allow leaves the record
    /// untouched.
    pub fn apply(&mut self, update: &JobUpdate) -> Result<(), TransitionError> {
        let next = update.status.unwrap_or(self.status);
        if self.status.is_terminal() || !self.status.can_transition_to(next) {
            return Err(TransitionError {
                job_id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }

        if next != self.status {
            // A note only describes the state it was written in.
            self.message = None;
        }
        self.status = next;
        if let Some(title) = &update.title {
            self.title = Some(title.clone());
        }
        if let Some(url) = &update.url {
            self.url = Some(url.clone());
        }
        if let Some(embed_url) = &update.embed_url {
            self.embed_url = Some(embed_url.clone());
        }
        if let Some(error) = &update.error {
            self.error = Some(error.clone());
        }
        if let Some(message) = &update.message {
            self.message = Some(message.clone());
        }
        Ok(())
    }
}

/// Partial job fields for a read-modify-write merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub embed_url: Option<String>,
    pub error: Option<String>,
    pub message: Option<String>,
}

impl JobUpdate {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn ready(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::status(JobStatus::Ready)
        }
    }

    pub fn embedded(embed_url: impl Into<String>) -> Self {
        Self {
            embed_url: Some(embed_url.into()),
            ..Self::status(JobStatus::Ready)
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::status(JobStatus::Failed)
        }
    }

    pub fn waiting(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::status(JobStatus::Queued)
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }
}

/// Result of an update against the job repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied(Job),
    /// The record expired (or never existed); nothing was written.
    Expired,
    Rejected(TransitionError),
}

/// Work item handed from the orchestrator to the download workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadTask {
    pub job_id: String,
    pub video_id: String,
}
