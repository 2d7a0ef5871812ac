//! Redis adapter for local deployment.
//!
//! This module provides Redis-backed implementations of:
//! - `JobRepository` for job records
//! - `SlotController` for download admission
//! - `SearchCache` / `AudioCache` for lookup short-circuiting

mod cache;
mod error;
mod pool;
mod repository;
mod slots;

pub use pool::{RedisPool, RedisTtls};

/// Redis key constants
const JOB_PREFIX: &str = "mediafetch:job:";
const ACTIVE_DOWNLOADS: &str = "mediafetch:active_downloads";
const SEARCH_PREFIX: &str = "mediafetch:search:";
const AUDIO_CACHE_PREFIX: &str = "mediafetch:audio_cache:";
