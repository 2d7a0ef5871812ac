//! Local adapters for single-server deployment.

pub mod channel;
pub mod fs;
pub mod http;
pub mod redis;
pub mod ytdlp;

pub use redis::{RedisPool, RedisTtls};
