//! Redis error conversions for the local adapter.

use crate::ports::StoreError;
use deadpool_redis::CreatePoolError;

pub type RedisError = deadpool_redis::redis::RedisError;
pub type PoolError = deadpool_redis::PoolError;

impl From<RedisError> for StoreError {
    fn from(err: RedisError) -> Self {
        StoreError::Unavailable(format!("Redis error: {}", err))
    }
}

impl From<PoolError> for StoreError {
    fn from(err: PoolError) -> Self {
        StoreError::Unavailable(format!("Pool error: {}", err))
    }
}

impl From<CreatePoolError> for StoreError {
    fn from(err: CreatePoolError) -> Self {
        StoreError::Unavailable(format!("Create pool error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deadpool_redis::redis::ErrorKind;

    #[test]
    fn test_redis_error_maps_to_unavailable() {
        let err = RedisError::from((ErrorKind::IoError, "connection refused"));
        let store_err = StoreError::from(err);
        assert!(matches!(store_err, StoreError::Unavailable(ref m) if m.contains("connection refused")));
    }
}
