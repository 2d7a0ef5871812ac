//! Ports - Trait definitions for every collaborator of the job pipeline.

use std::time::Duration;
use thiserror::Error;

pub mod cache;
pub mod extractor;
pub mod queue;
pub mod repository;
pub mod slots;
pub mod storage;

/// Failure talking to the shared backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backing store unavailable: {0}")]
    Unavailable(String),
    #[error("backing store did not answer within {0:?}")]
    Timeout(Duration),
    #[error("corrupt record: {0}")]
    Corrupt(#[from] serde_json::Error),
}
