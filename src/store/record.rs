use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::StoreError;
use crate::domain::order::{Order, OrderItem, OrderStatus};

/// Column order of every `SELECT` against the `orders` table
pub type OrderRow = (Uuid, Uuid, String, String, f64, i64, DateTime<Utc>, DateTime<Utc>);

/// Persisted shape of an order: `id` is the primary key, `items` is a JSON
/// array of `{sku, quantity, price}`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: String,
    pub items: String,
    pub total_amount: f64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRecord {
    pub fn from_order(order: &Order) -> Result<Self, StoreError> {
        Ok(Self {
            id: order.id,
            customer_id: order.customer_id,
            status: order.status.as_str().to_string(),
            items: serde_json::to_string(&order.items).map_err(StoreError::failure)?,
            total_amount: order.total_amount,
            version: order.version,
            created_at: order.created_at,
            updated_at: order.updated_at,
        })
    }

    pub fn into_order(self) -> Result<Order, StoreError> {
        let status: OrderStatus = self
            .status
            .parse()
            .map_err(|e| StoreError::Failure(format!("corrupt status for order {}: {e}", self.id)))?;
        let items: Vec<OrderItem> = serde_json::from_str(&self.items)
            .map_err(|e| StoreError::Failure(format!("corrupt items for order {}: {e}", self.id)))?;

        Ok(Order {
            id: self.id,
            customer_id: self.customer_id,
            status,
            items,
            total_amount: self.total_amount,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }

    pub fn into_row(self) -> OrderRow {
        (
            self.id,
            self.customer_id,
            self.status,
            self.items,
            self.total_amount,
            self.version,
            self.created_at,
            self.updated_at,
        )
    }
}

impl From<OrderRow> for OrderRecord {
    fn from(row: OrderRow) -> Self {
        let (id, customer_id, status, items, total_amount, version, created_at, updated_at) = row;
        Self {
            id,
            customer_id,
            status,
            items,
            total_amount,
            version,
            created_at,
            updated_at,
        }
    }
}
