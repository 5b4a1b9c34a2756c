#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Barrier;
use uuid::Uuid;

use order_lifecycle::cache::{CacheError, InMemoryOrderCache, OrderCache};
use order_lifecycle::domain::order::{Order, OrderEvent, OrderItem};
use order_lifecycle::messaging::{EventPublisher, InMemoryEventPublisher, PublishError};
use order_lifecycle::metrics::Metrics;
use order_lifecycle::service::OrderService;
use order_lifecycle::store::{InMemoryOrderStore, OrderFilter, OrderPage, OrderStore, PageRequest, StoreError};

pub const CUSTOMER_ID: &str = "123e4567-e89b-12d3-a456-426614174000";

pub fn scenario_a_items() -> Vec<OrderItem> {
    vec![
        OrderItem::new("LAPTOP-001", 2, 999.99),
        OrderItem::new("MOUSE-002", 1, 29.99),
    ]
}

// ============================================================================
// Store wrapper: call counters, forced update errors, read barrier
// ============================================================================

#[derive(Default)]
pub struct RecordingStore {
    pub inner: InMemoryOrderStore,
    pub find_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub fail_update_with: Mutex<Option<StoreError>>,
    pub fail_reads_with: Mutex<Option<StoreError>>,
    /// When set, every `find_by_id` waits here after reading
    pub read_barrier: Mutex<Option<Arc<Barrier>>>,
    /// When set, `ping` never completes
    pub hang_ping: Mutex<bool>,
}

impl RecordingStore {
    pub fn finds(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderStore for RecordingStore {
    async fn create(&self, order: &Order) -> Result<(), StoreError> {
        self.inner.create(order).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Order, StoreError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fail_reads_with.lock().unwrap().clone() {
            return Err(err);
        }

        let result = self.inner.find_by_id(id).await;

        let barrier = self.read_barrier.lock().unwrap().clone();
        if let Some(barrier) = barrier {
            barrier.wait().await;
        }
        result
    }

    async fn find_filtered(&self, filter: &OrderFilter, page: PageRequest) -> Result<OrderPage, StoreError> {
        self.inner.find_filtered(filter, page).await
    }

    async fn update(&self, order: &Order) -> Result<(), StoreError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fail_update_with.lock().unwrap().clone() {
            return Err(err);
        }
        self.inner.update(order).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let hang = *self.hang_ping.lock().unwrap();
        if hang {
            std::future::pending::<()>().await;
        }
        match self.fail_reads_with.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Cache wrapper: counts invalidations, can be switched to fail everything
// ============================================================================

#[derive(Default)]
pub struct RecordingCache {
    pub inner: InMemoryOrderCache,
    pub invalidate_calls: AtomicUsize,
    pub failing: Mutex<bool>,
}

impl RecordingCache {
    pub fn invalidations(&self) -> usize {
        self.invalidate_calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    fn check(&self) -> Result<(), CacheError> {
        if *self.failing.lock().unwrap() {
            Err(CacheError::failure("connection refused"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl OrderCache for RecordingCache {
    async fn get(&self, id: Uuid) -> Result<Option<Order>, CacheError> {
        self.check()?;
        self.inner.get(id).await
    }

    async fn put(&self, order: &Order, ttl: Duration) -> Result<(), CacheError> {
        self.check()?;
        self.inner.put(order, ttl).await
    }

    async fn invalidate(&self, id: Uuid) -> Result<(), CacheError> {
        self.invalidate_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.invalidate(id).await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.check()
    }
}

// ============================================================================
// Publisher wrapper: records, or fails with a fixed error
// ============================================================================

#[derive(Default)]
pub struct RecordingPublisher {
    pub inner: InMemoryEventPublisher,
    pub fail_with: Mutex<Option<PublishError>>,
    /// Sleep this long before recording each event
    pub delay: Mutex<Option<Duration>>,
}

impl RecordingPublisher {
    pub async fn events(&self) -> Vec<OrderEvent> {
        self.inner.events().await
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &OrderEvent) -> Result<(), PublishError> {
        if let Some(err) = self.fail_with.lock().unwrap().clone() {
            return Err(err);
        }
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.publish(event).await
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub service: Arc<OrderService>,
    pub store: Arc<RecordingStore>,
    pub cache: Arc<RecordingCache>,
    pub publisher: Arc<RecordingPublisher>,
    pub metrics: Arc<Metrics>,
}

pub fn harness() -> Harness {
    harness_with(|service| service)
}

pub fn harness_with(configure: impl FnOnce(OrderService) -> OrderService) -> Harness {
    let store = Arc::new(RecordingStore::default());
    let cache = Arc::new(RecordingCache::default());
    let publisher = Arc::new(RecordingPublisher::default());
    let metrics = Arc::new(Metrics::new().unwrap());

    let service = Arc::new(configure(OrderService::new(
        store.clone(),
        cache.clone(),
        publisher.clone(),
        metrics.clone(),
    )));

    Harness {
        service,
        store,
        cache,
        publisher,
        metrics,
    }
}
