use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

use super::{order_key, CacheError, OrderCache};
use crate::domain::order::Order;

struct Entry {
    payload: String,
    expires_at: Instant,
}

/// In-process cache with per-entry expiry. Entries are kept as serialized
/// blobs, like Redis, so a hit never aliases the caller's aggregate.
#[derive(Clone, Default)]
pub struct InMemoryOrderCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl InMemoryOrderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a live entry exists for `id`
    pub async fn contains(&self, id: Uuid) -> bool {
        self.entries
            .read()
            .await
            .get(&order_key(id))
            .is_some_and(|entry| entry.expires_at > Instant::now())
    }
}

#[async_trait]
impl OrderCache for InMemoryOrderCache {
    async fn get(&self, id: Uuid) -> Result<Option<Order>, CacheError> {
        let key = order_key(id);
        let mut entries = self.entries.write().await;

        let payload = match entries.get(&key) {
            Some(entry) if entry.expires_at > Instant::now() => entry.payload.clone(),
            Some(_) => {
                entries.remove(&key);
                return Ok(None);
            }
            None => return Ok(None),
        };

        serde_json::from_str(&payload).map(Some).map_err(CacheError::failure)
    }

    async fn put(&self, order: &Order, ttl: Duration) -> Result<(), CacheError> {
        let payload = serde_json::to_string(order).map_err(CacheError::failure)?;
        self.entries.write().await.insert(
            order_key(order.id),
            Entry {
                payload,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn invalidate(&self, id: Uuid) -> Result<(), CacheError> {
        self.entries.write().await.remove(&order_key(id));
        Ok(())
    }
}
