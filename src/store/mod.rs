// ============================================================================
// Order Store - Source of Truth with Optimistic Concurrency
// ============================================================================
//
// The version column is the only concurrency token. `update` is a
// compare-and-swap: it succeeds only while the stored version still equals
// the caller's pre-increment version, so two writers racing from the same
// snapshot can never both win. No row locks, no in-process mutex.
//
// Implementations:
// - ScyllaOrderStore   (lightweight transactions: IF NOT EXISTS / IF version = ?)
// - InMemoryOrderStore (same contract under a write lock, used by tests)
//
// ============================================================================

mod memory;
mod record;
mod scylla;

pub use self::memory::InMemoryOrderStore;
pub use self::record::{OrderRecord, OrderRow};
pub use self::scylla::ScyllaOrderStore;

use async_trait::async_trait;
use std::fmt;
use uuid::Uuid;

use crate::domain::order::{Order, OrderStatus};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Order not found: {0}")]
    NotFound(Uuid),

    /// The record moved on since the writer read it
    #[error("Version conflict on order {id}: expected stored version {expected}, found {actual}")]
    VersionConflict { id: Uuid, expected: i64, actual: i64 },

    #[error("Order with the same id already exists: {0}")]
    DuplicateIdentifier(Uuid),

    #[error("Store failure: {0}")]
    Failure(String),
}

impl StoreError {
    pub fn failure(err: impl fmt::Display) -> Self {
        StoreError::Failure(err.to_string())
    }
}

/// Conjunctive listing filter; `None` matches everything
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub customer_id: Option<Uuid>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.status.map_or(true, |status| order.status == status)
            && self.customer_id.map_or(true, |customer| order.customer_id == customer)
    }
}

/// Offset pagination, 1-based pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    /// Clamp raw paging input instead of rejecting it: a page below 1 becomes 1,
    /// a missing or non-positive size falls back to `default_size`, and sizes
    /// above `max_size` are capped.
    pub fn clamped(page: Option<i64>, page_size: Option<i64>, default_size: u32, max_size: u32) -> Self {
        let page = match page {
            Some(p) if p >= 1 => u32::try_from(p).unwrap_or(u32::MAX),
            _ => 1,
        };
        let page_size = match page_size {
            Some(s) if s >= 1 => u32::try_from(s).unwrap_or(u32::MAX).min(max_size),
            _ => default_size.min(max_size),
        };
        Self::new(page, page_size)
    }

    pub fn skip(&self) -> usize {
        (self.page as usize - 1).saturating_mul(self.page_size as usize)
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.page_size))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderPage {
    pub items: Vec<Order>,
    pub total: u64,
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert a brand-new order; an id collision is `DuplicateIdentifier`
    async fn create(&self, order: &Order) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Order, StoreError>;

    /// Newest first, `total` counts every match regardless of the page
    async fn find_filtered(&self, filter: &OrderFilter, page: PageRequest) -> Result<OrderPage, StoreError>;

    /// Persist a transition. `order.version` must already be incremented:
    /// the write only applies while the stored version is `order.version - 1`.
    async fn update(&self, order: &Order) -> Result<(), StoreError>;

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Filter, sort newest first and slice out one page
pub(crate) fn paginate(
    orders: impl IntoIterator<Item = Order>,
    filter: &OrderFilter,
    page: PageRequest,
) -> OrderPage {
    let mut matching: Vec<Order> = orders.into_iter().filter(|o| filter.matches(o)).collect();
    matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

    let total = matching.len() as u64;
    let items = matching
        .into_iter()
        .skip(page.skip())
        .take(page.page_size as usize)
        .collect();

    OrderPage { items, total }
}

// ============================================================================
// Unit Tests
// ============================================================================
