// ============================================================================
// Order Cache - Best-Effort Read Accelerator (cache-aside)
// ============================================================================
//
// The application, not the store, populates and invalidates entries:
// - reads consult the cache first and write back after a store hit
// - transitions invalidate only after the store confirmed the write
//
// A miss is `Ok(None)`, distinct from a failure. Callers treat failures as
// misses for control flow; the cache is never a second source of truth.
//
// ============================================================================

mod memory;
mod redis;

pub use self::memory::InMemoryOrderCache;
pub use self::redis::RedisOrderCache;

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::order::Order;

pub const ORDER_KEY_PREFIX: &str = "order:";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CacheError {
    #[error("Cache failure: {0}")]
    Failure(String),
}

impl CacheError {
    pub fn failure(err: impl fmt::Display) -> Self {
        CacheError::Failure(err.to_string())
    }
}

pub fn order_key(id: Uuid) -> String {
    format!("{ORDER_KEY_PREFIX}{id}")
}

#[async_trait]
pub trait OrderCache: Send + Sync {
    /// `Ok(None)` on a miss
    async fn get(&self, id: Uuid) -> Result<Option<Order>, CacheError>;

    /// Unconditional overwrite; the entry expires after `ttl`
    async fn put(&self, order: &Order, ttl: Duration) -> Result<(), CacheError>;

    /// Unconditional delete; an absent entry is not an error
    async fn invalidate(&self, id: Uuid) -> Result<(), CacheError>;

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_key_format() {
        let id = Uuid::parse_str("123e4567-e89b-12d3-a456-426614174000").unwrap();
        assert_eq!(order_key(id), "order:123e4567-e89b-12d3-a456-426614174000");
    }
}
