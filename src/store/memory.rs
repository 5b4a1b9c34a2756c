use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{paginate, OrderFilter, OrderPage, OrderStore, PageRequest, StoreError};
use crate::domain::order::Order;

/// HashMap-backed store honouring the same compare-and-swap contract as the
/// ScyllaDB store. Clones share the same data.
#[derive(Clone, Debug, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<Uuid, Order>>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.orders.read().await.is_empty()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: &Order) -> Result<(), StoreError> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(StoreError::DuplicateIdentifier(order.id));
        }
        orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Order, StoreError> {
        self.orders
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn find_filtered(&self, filter: &OrderFilter, page: PageRequest) -> Result<OrderPage, StoreError> {
        let orders = self.orders.read().await;
        Ok(paginate(orders.values().cloned(), filter, page))
    }

    async fn update(&self, order: &Order) -> Result<(), StoreError> {
        let expected = order.version - 1;
        let mut orders = self.orders.write().await;

        let stored = orders.get_mut(&order.id).ok_or(StoreError::NotFound(order.id))?;
        if stored.version != expected {
            return Err(StoreError::VersionConflict {
                id: order.id,
                expected,
                actual: stored.version,
            });
        }

        stored.status = order.status;
        stored.version = order.version;
        stored.updated_at = order.updated_at;
        Ok(())
    }
}
