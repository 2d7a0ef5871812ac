use crate::domain::search::SearchResult;
use async_trait::async_trait;
use std::time::Duration;

/// Outcome of a cache read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup<T> {
    Hit(T),
    Miss,
    /// The backing store could not be reached.
    Unavailable,
}

impl<T> CacheLookup<T> {
    /// The cached value, if any. `Unavailable` is always treated as a miss.
    pub fn hit(self) -> Option<T> {
        match self {
            CacheLookup::Hit(value) => Some(value),
            CacheLookup::Miss | CacheLookup::Unavailable => None,
        }
    }
}

/// Normalized query -> ordered results.
///
/// Implementations never fail the caller: read errors become
/// `CacheLookup::Unavailable` and write errors are logged and dropped.
#[async_trait]
pub trait SearchCache: Send + Sync {
    async fn lookup(&self, query: &str) -> CacheLookup<Vec<SearchResult>>;
    async fn store(&self, query: &str, results: &[SearchResult], ttl: Duration);
}

/// Catalog id -> location of a previously produced artifact.
///
/// Same degrade-to-miss policy as [`SearchCache`].
#[async_trait]
pub trait AudioCache: Send + Sync {
    async fn lookup(&self, video_id: &str) -> CacheLookup<String>;
    async fn store(&self, video_id: &str, location: &str, ttl: Duration);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_reads_as_miss() {
        assert_eq!(CacheLookup::Hit(1).hit(), Some(1));
        assert_eq!(CacheLookup::<i32>::Miss.hit(), None);
        assert_eq!(CacheLookup::<i32>::Unavailable.hit(), None);
    }
}
