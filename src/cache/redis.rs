use ::redis::aio::MultiplexedConnection;
use ::redis::AsyncCommands;
use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

use super::{order_key, CacheError, OrderCache};
use crate::domain::order::Order;

/// Redis-backed order cache. Values are the order's JSON, stored with `SET EX`.
///
/// The multiplexed connection pipelines concurrent requests over one socket
/// and is cheap to clone, so every call works on its own handle.
#[derive(Clone)]
pub struct RedisOrderCache {
    connection: MultiplexedConnection,
}

impl RedisOrderCache {
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = ::redis::Client::open(url).map_err(CacheError::failure)?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(CacheError::failure)?;

        tracing::info!("Connected to Redis");
        Ok(Self { connection })
    }
}

#[async_trait]
impl OrderCache for RedisOrderCache {
    async fn get(&self, id: Uuid) -> Result<Option<Order>, CacheError> {
        let mut conn = self.connection.clone();
        let payload: Option<String> = conn.get(order_key(id)).await.map_err(CacheError::failure)?;

        match payload {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| CacheError::Failure(format!("corrupt cache entry for order {id}: {e}"))),
            None => Ok(None),
        }
    }

    async fn put(&self, order: &Order, ttl: Duration) -> Result<(), CacheError> {
        let payload = serde_json::to_string(order).map_err(CacheError::failure)?;
        // SET EX rejects a zero expiry
        let ttl_secs = ttl.as_secs().max(1);

        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(order_key(order.id), payload, ttl_secs)
            .await
            .map_err(CacheError::failure)
    }

    async fn invalidate(&self, id: Uuid) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        conn.del::<_, ()>(order_key(id)).await.map_err(CacheError::failure)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        ::redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(CacheError::failure)?;
        Ok(())
    }
}
