//! Redis connection pool.

use crate::ports::StoreError;
use deadpool_redis::{Config, Connection, Pool, PoolConfig, Runtime, Timeouts};
use std::future::Future;
use std::time::Duration;

/// TTLs applied by the Redis adapter.
#[derive(Clone, Copy, Debug)]
pub struct RedisTtls {
    pub job: Duration,
    pub slots: Duration,
}

/// Redis-backed adapter for the job repository, slot set and caches.
#[derive(Clone)]
pub struct RedisPool {
    pub(super) pool: Pool,
    pub(super) op_timeout: Duration,
    pub(super) ttls: RedisTtls,
    pub(super) max_concurrent: usize,
}

impl RedisPool {
    /// Create a new RedisPool with connection pool.
    ///
    /// No connection is opened until the first command.
    pub fn new(
        redis_url: &str,
        op_timeout: Duration,
        ttls: RedisTtls,
        max_concurrent: usize,
    ) -> Result<Self, StoreError> {
        let mut cfg = Config::from_url(redis_url);
        cfg.pool = Some(PoolConfig {
            timeouts: Timeouts {
                wait: Some(op_timeout),
                create: Some(op_timeout),
                recycle: Some(op_timeout),
            },
            ..PoolConfig::default()
        });
        let pool = cfg.create_pool(Some(Runtime::Tokio1))?;
        Ok(Self {
            pool,
            op_timeout,
            ttls,
            max_concurrent,
        })
    }

    /// Run `op` on a pooled connection, bounded by the operation timeout.
    pub(super) async fn with_conn<T, F, Fut>(&self, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(Connection) -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let work = async {
            let conn = self.pool.get().await?;
            op(conn).await
        };
        tokio::time::timeout(self.op_timeout, work)
            .await
            .map_err(|_| StoreError::Timeout(self.op_timeout))?
    }

    pub(super) fn ttl_secs(ttl: Duration) -> u64 {
        ttl.as_secs().max(1)
    }
}

#[cfg(test)]
impl RedisPool {
    /// Pool against `REDIS_URL` for the tests that need a live server.
    pub(super) fn for_tests(max_concurrent: usize) -> Self {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string());
        let ttls = RedisTtls {
            job: Duration::from_secs(3600),
            slots: Duration::from_secs(3600),
        };
        Self::new(&url, Duration::from_secs(5), ttls, max_concurrent).unwrap()
    }
}
