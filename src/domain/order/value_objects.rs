use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::OrderError;

// ============================================================================
// Order Value Objects
// ============================================================================

pub const MIN_SKU_LEN: usize = 3;
pub const MAX_SKU_LEN: usize = 50;
pub const MAX_ITEM_QUANTITY: i32 = 10_000;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct OrderItem {
    pub sku: String,
    pub quantity: i32,
    pub price: f64,
}

impl OrderItem {
    pub fn new(sku: impl Into<String>, quantity: i32, price: f64) -> Self {
        Self {
            sku: sku.into(),
            quantity,
            price,
        }
    }

    pub fn subtotal(&self) -> f64 {
        f64::from(self.quantity) * self.price
    }

    /// Validate a single line item against the order limits
    pub fn validate(&self) -> Result<(), OrderError> {
        let sku_len = self.sku.chars().count();
        if sku_len == 0 {
            return Err(OrderError::invalid("item sku cannot be empty"));
        }
        if !(MIN_SKU_LEN..=MAX_SKU_LEN).contains(&sku_len) {
            return Err(OrderError::invalid(format!(
                "item sku must be between {MIN_SKU_LEN} and {MAX_SKU_LEN} characters: {}",
                self.sku
            )));
        }
        if self.quantity <= 0 || self.quantity > MAX_ITEM_QUANTITY {
            return Err(OrderError::invalid(format!(
                "invalid quantity {} for sku {}",
                self.quantity, self.sku
            )));
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(OrderError::invalid(format!(
                "invalid price {} for sku {}",
                self.price, self.sku
            )));
        }
        Ok(())
    }
}

/// Delivery status. `Delivered` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    InProgress,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::New,
        OrderStatus::InProgress,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::New => "NEW",
            OrderStatus::InProgress => "IN_PROGRESS",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// NEW -> {IN_PROGRESS, CANCELLED}, IN_PROGRESS -> {DELIVERED, CANCELLED}.
    /// Self-transitions and skips are illegal.
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        matches!(
            (self, target),
            (OrderStatus::New, OrderStatus::InProgress)
                | (OrderStatus::New, OrderStatus::Cancelled)
                | (OrderStatus::InProgress, OrderStatus::Delivered)
                | (OrderStatus::InProgress, OrderStatus::Cancelled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(OrderStatus::New),
            "IN_PROGRESS" => Ok(OrderStatus::InProgress),
            "DELIVERED" => Ok(OrderStatus::Delivered),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(OrderError::invalid(format!("unknown order status: {other}"))),
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
