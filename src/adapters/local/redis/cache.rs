//! Redis SearchCache and AudioCache implementations.
//!
//! Failures never reach the caller: reads report `Unavailable`, writes are
//! logged and dropped.

use super::pool::RedisPool;
use super::{AUDIO_CACHE_PREFIX, SEARCH_PREFIX};
use crate::domain::search::{normalize_query, SearchResult};
use crate::ports::cache::{AudioCache, CacheLookup, SearchCache};
use crate::ports::StoreError;
use async_trait::async_trait;
use deadpool_redis::redis::AsyncCommands;
use std::time::Duration;
use tracing::warn;

fn search_key(query: &str) -> String {
    format!("{}{}", SEARCH_PREFIX, normalize_query(query))
}

fn audio_key(video_id: &str) -> String {
    format!("{}{}", AUDIO_CACHE_PREFIX, video_id)
}

impl RedisPool {
    async fn cache_get(&self, key: String) -> Result<Option<String>, StoreError> {
        self.with_conn(|mut conn| async move {
            let value: Option<String> = conn.get(&key).await?;
            Ok(value)
        })
        .await
    }

    async fn cache_set(&self, key: String, value: String, ttl: Duration) -> Result<(), StoreError> {
        let ttl = Self::ttl_secs(ttl);
        self.with_conn(|mut conn| async move {
            let _: () = conn.set_ex(&key, value, ttl).await?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl SearchCache for RedisPool {
    async fn lookup(&self, query: &str) -> CacheLookup<Vec<SearchResult>> {
        let fetched = self
            .cache_get(search_key(query))
            .await
            .and_then(|raw| match raw {
                Some(json) => Ok(Some(serde_json::from_str::<Vec<SearchResult>>(&json)?)),
                None => Ok(None),
            });
        match fetched {
            Ok(Some(results)) => CacheLookup::Hit(results),
            Ok(None) => CacheLookup::Miss,
            Err(e) => {
                warn!(query, error = %e, "Search cache read failed, treating as miss");
                CacheLookup::Unavailable
            }
        }
    }

    async fn store(&self, query: &str, results: &[SearchResult], ttl: Duration) {
        let stored = match serde_json::to_string(results) {
            Ok(json) => self.cache_set(search_key(query), json, ttl).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = stored {
            warn!(query, error = %e, "Search cache write failed");
        }
    }
}

#[async_trait]
impl AudioCache for RedisPool {
    async fn lookup(&self, video_id: &str) -> CacheLookup<String> {
        match self.cache_get(audio_key(video_id)).await {
            Ok(Some(location)) => CacheLookup::Hit(location),
            Ok(None) => CacheLookup::Miss,
            Err(e) => {
                warn!(video_id, error = %e, "Audio cache read failed, treating as miss");
                CacheLookup::Unavailable
            }
        }
    }

    async fn store(&self, video_id: &str, location: &str, ttl: Duration) {
        if let Err(e) = self
            .cache_set(audio_key(video_id), location.to_string(), ttl)
            .await
        {
            warn!(video_id, error = %e, "Audio cache write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_key_is_case_normalized() {
        assert_eq!(search_key("Parabola TOOL"), search_key("parabola tool"));
        assert_eq!(search_key("Q"), "mediafetch:search:q");
    }

    #[test]
    fn test_audio_key_is_by_source_identity() {
        assert_eq!(audio_key("abc123"), "mediafetch:audio_cache:abc123");
    }

    #[tokio::test]
    async fn test_unreachable_store_degrades_to_miss() {
        // Nothing listens on port 1; every call fails fast.
        let pool = RedisPool::new(
            "redis://127.0.0.1:1/",
            Duration::from_millis(200),
            super::super::RedisTtls {
                job: Duration::from_secs(60),
                slots: Duration::from_secs(60),
            },
            5,
        )
        .unwrap();

        assert_eq!(SearchCache::lookup(&pool, "anything").await, CacheLookup::Unavailable);
        assert_eq!(AudioCache::lookup(&pool, "abc123").await, CacheLookup::Unavailable);
        // Writes swallow the failure.
        AudioCache::store(&pool, "abc123", "/media/files/j1.mp3", Duration::from_secs(60)).await;
    }
}
