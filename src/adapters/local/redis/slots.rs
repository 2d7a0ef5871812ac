//! Redis SlotController implementation.

use super::pool::RedisPool;
use super::ACTIVE_DOWNLOADS;
use crate::ports::slots::SlotController;
use crate::ports::StoreError;
use async_trait::async_trait;
use deadpool_redis::redis::{AsyncCommands, Script};
use std::sync::OnceLock;

/// Check-and-add in one server-side step.
///
/// KEYS[1] = slot set, ARGV[1] = owner, ARGV[2] = capacity, ARGV[3] = ttl.
/// An owner that already holds a slot keeps it.
const ACQUIRE_SCRIPT: &str = r#"
if redis.call('SISMEMBER', KEYS[1], ARGV[1]) == 1 then
  redis.call('EXPIRE', KEYS[1], ARGV[3])
  return 1
end
if redis.call('SCARD', KEYS[1]) >= tonumber(ARGV[2]) then
  return 0
end
redis.call('SADD', KEYS[1], ARGV[1])
redis.call('EXPIRE', KEYS[1], ARGV[3])
return 1
"#;

fn acquire_script() -> &'static Script {
    static SCRIPT: OnceLock<Script> = OnceLock::new();
    SCRIPT.get_or_init(|| Script::new(ACQUIRE_SCRIPT))
}

#[async_trait]
impl SlotController for RedisPool {
    async fn try_acquire(&self, owner_id: &str) -> Result<bool, StoreError> {
        let capacity = self.max_concurrent;
        let ttl = Self::ttl_secs(self.ttls.slots);
        self.with_conn(|mut conn| async move {
            let granted: i64 = acquire_script()
                .key(ACTIVE_DOWNLOADS)
                .arg(owner_id)
                .arg(capacity)
                .arg(ttl)
                .invoke_async(&mut conn)
                .await?;
            Ok(granted == 1)
        })
        .await
    }

    async fn release(&self, owner_id: &str) -> Result<(), StoreError> {
        self.with_conn(|mut conn| async move {
            let _: () = conn.srem(ACTIVE_DOWNLOADS, owner_id).await?;
            Ok(())
        })
        .await
    }

    async fn active(&self) -> Result<usize, StoreError> {
        self.with_conn(|mut conn| async move {
            let count: usize = conn.scard(ACTIVE_DOWNLOADS).await?;
            Ok(count)
        })
        .await
    }
}
