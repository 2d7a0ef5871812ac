use crate::domain::search::SearchResult;
use crate::ports::cache::SearchCache;
use crate::ports::extractor::{ExtractionError, MediaExtractor};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("query must not be empty")]
    EmptyQuery,
    #[error("search failed: {0}")]
    Extraction(#[from] ExtractionError),
}

/// Catalog search with a write-through result cache.
pub struct SearchService {
    extractor: Arc<dyn MediaExtractor>,
    cache: Arc<dyn SearchCache>,
    max_results: usize,
    ttl: Duration,
}

impl SearchService {
    pub fn new(
        extractor: Arc<dyn MediaExtractor>,
        cache: Arc<dyn SearchCache>,
        max_results: usize,
        ttl: Duration,
    ) -> Self {
        Self {
            extractor,
            cache,
            max_results,
            ttl,
        }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        if let Some(mut cached) = self.cache.lookup(query).await.hit() {
            debug!(query, count = cached.len(), "Search cache hit");
            cached.truncate(self.max_results);
            return Ok(cached);
        }

        let mut results = self.extractor.search(query, self.max_results).await?;
        results.truncate(self.max_results);
        info!(query, count = results.len(), "Search resolved");

        // Empty result lists are cached too.
        self.cache.store(query, &results, self.ttl).await;
        Ok(results)
    }
}
