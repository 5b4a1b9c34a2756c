use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::cache::{CacheError, OrderCache, DEFAULT_CACHE_TTL};
use crate::domain::order::{Order, OrderError, OrderEvent, OrderItem, OrderStatus};
use crate::health::{ComponentHealth, HealthStatus, SystemHealth};
use crate::messaging::{EventPublisher, PublishError};
use crate::metrics::Metrics;
use crate::store::{OrderFilter, OrderPage, OrderStore, PageRequest, StoreError};
use crate::utils::CircuitState;

// ============================================================================
// Order Service - Lifecycle Coordinator
// ============================================================================
//
// Sequences one logical change across three systems that fail independently:
//
//   store (source of truth) -> cache (invalidate) -> publisher (notify)
//
// Anything that fails before the store confirms a write aborts the operation.
// Anything after it is best-effort: logged, counted, and reported back in
// `TransitionOutcome`, but never turned into an error and never rolled back.
// The coordinator itself never retries; a `VersionConflict` goes back to the
// caller, who decides whether to re-read and try again.
//
// ============================================================================

pub const DEFAULT_SIDE_EFFECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ServiceError {
    #[error("Invalid order data: {0}")]
    InvalidData(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order not found: {0}")]
    NotFound(Uuid),

    #[error("Order {0} was modified concurrently, re-read and retry")]
    VersionConflict(Uuid),

    #[error("Order with the same id already exists: {0}")]
    DuplicateIdentifier(Uuid),

    #[error("Store failure: {0}")]
    Store(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

impl ServiceError {
    /// Stable machine-readable kind, used for metrics labels and error codes
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::InvalidData(_) => "invalid_data",
            ServiceError::InvalidTransition { .. } => "invalid_transition",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::VersionConflict(_) => "version_conflict",
            ServiceError::DuplicateIdentifier(_) => "duplicate_identifier",
            ServiceError::Store(_) => "store",
            ServiceError::Timeout(_) => "timeout",
        }
    }
}

impl From<OrderError> for ServiceError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidData(reason) => ServiceError::InvalidData(reason),
            OrderError::InvalidTransition { from, to } => ServiceError::InvalidTransition { from, to },
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ServiceError::NotFound(id),
            StoreError::VersionConflict { id, .. } => ServiceError::VersionConflict(id),
            StoreError::DuplicateIdentifier(id) => ServiceError::DuplicateIdentifier(id),
            StoreError::Failure(reason) => ServiceError::Store(reason),
        }
    }
}

/// A committed transition plus how its side effects went
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub order: Order,
    pub event: OrderEvent,
    pub cache_invalidation: Result<(), CacheError>,
    pub event_publication: Result<(), PublishError>,
}

impl TransitionOutcome {
    pub fn side_effects_succeeded(&self) -> bool {
        self.cache_invalidation.is_ok() && self.event_publication.is_ok()
    }
}

pub struct OrderService {
    store: Arc<dyn OrderStore>,
    cache: Arc<dyn OrderCache>,
    publisher: Arc<dyn EventPublisher>,
    metrics: Arc<Metrics>,
    cache_ttl: Duration,
    side_effect_timeout: Duration,
}

impl OrderService {
    pub fn new(
        store: Arc<dyn OrderStore>,
        cache: Arc<dyn OrderCache>,
        publisher: Arc<dyn EventPublisher>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            store,
            cache,
            publisher,
            metrics,
            cache_ttl: DEFAULT_CACHE_TTL,
            side_effect_timeout: DEFAULT_SIDE_EFFECT_TIMEOUT,
        }
    }

    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    /// Upper bound for each post-commit step (cache invalidation, publish)
    pub fn with_side_effect_timeout(mut self, side_effect_timeout: Duration) -> Self {
        self.side_effect_timeout = side_effect_timeout;
        self
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Validate and persist a new order. Creation touches neither the cache
    /// nor the event stream.
    pub async fn create_order(&self, customer_id: &str, items: Vec<OrderItem>) -> Result<Order, ServiceError> {
        let started = Instant::now();
        let result = self.create_order_inner(customer_id, items).await;
        self.observe("create_order", started, &result);

        if let Ok(order) = &result {
            self.metrics.record_order_created();
            tracing::info!(
                order_id = %order.id,
                customer_id = %order.customer_id,
                total_amount = order.total_amount,
                items = order.items.len(),
                "✅ Order created"
            );
        }
        result
    }

    async fn create_order_inner(&self, customer_id: &str, items: Vec<OrderItem>) -> Result<Order, ServiceError> {
        let order = Order::create(customer_id, items)?;
        self.store.create(&order).await?;
        Ok(order)
    }

    /// Cache-aside read. A cache failure is treated as a miss.
    pub async fn get_order(&self, id: Uuid) -> Result<Order, ServiceError> {
        let started = Instant::now();
        let result = self.get_order_inner(id).await;
        self.observe("get_order", started, &result);
        result
    }

    async fn get_order_inner(&self, id: Uuid) -> Result<Order, ServiceError> {
        match self.cache.get(id).await {
            Ok(Some(order)) => {
                self.metrics.record_cache_lookup("hit");
                tracing::debug!(order_id = %id, "Cache hit");
                return Ok(order);
            }
            Ok(None) => {
                self.metrics.record_cache_lookup("miss");
                tracing::debug!(order_id = %id, "Cache miss");
            }
            Err(e) => {
                self.metrics.record_cache_lookup("error");
                tracing::warn!(order_id = %id, error = %e, "Cache read failed, falling back to store");
            }
        }

        let order = self.store.find_by_id(id).await?;

        if let Err(e) = self.cache.put(&order, self.cache_ttl).await {
            tracing::warn!(order_id = %id, error = %e, "Failed to populate cache");
        }
        Ok(order)
    }

    /// Always served by the store; listings are never cached
    pub async fn list_orders(&self, filter: OrderFilter, page: PageRequest) -> Result<OrderPage, ServiceError> {
        let started = Instant::now();
        let result = self.store.find_filtered(&filter, page).await.map_err(ServiceError::from);
        self.observe("list_orders", started, &result);
        result
    }

    /// Move an order to `target`.
    ///
    /// Read, apply the state machine, compare-and-swap the new version into the
    /// store, then invalidate the cache and publish the event. Once the store
    /// write succeeds the call succeeds, whatever happens to the side effects.
    pub async fn transition_status(&self, id: Uuid, target: OrderStatus) -> Result<TransitionOutcome, ServiceError> {
        self.transition_status_with_deadline(id, target, None).await
    }

    /// Same as `transition_status`, but the read-check-write phase must finish
    /// within `deadline`. The deadline stops at the commit: side effects run
    /// under their own bound and can never turn a committed write into a
    /// `Timeout`.
    pub async fn transition_status_with_deadline(
        &self,
        id: Uuid,
        target: OrderStatus,
        deadline: Option<Duration>,
    ) -> Result<TransitionOutcome, ServiceError> {
        let started = Instant::now();

        let committed = match deadline {
            Some(limit) => tokio::time::timeout(limit, self.commit_transition(id, target))
                .await
                .unwrap_or(Err(ServiceError::Timeout(limit))),
            None => self.commit_transition(id, target).await,
        };

        let result = match committed {
            Ok((order, previous)) => Ok(self.apply_side_effects(order, previous).await),
            Err(e) => Err(e),
        };
        self.observe("transition_status", started, &result);

        if let Err(e) = &result {
            tracing::warn!(order_id = %id, target = %target, error = %e, "Status transition rejected");
        }
        result
    }

    /// Everything up to and including the store write. Returns the committed
    /// order and the status it left.
    async fn commit_transition(&self, id: Uuid, target: OrderStatus) -> Result<(Order, OrderStatus), ServiceError> {
        let mut order = self.store.find_by_id(id).await?;
        let previous = order.transition(target)?;
        self.store.update(&order).await?;

        self.metrics.record_transition(previous.as_str(), target.as_str());
        tracing::info!(
            order_id = %id,
            from = %previous,
            to = %target,
            version = order.version,
            "🔄 Order status changed"
        );
        Ok((order, previous))
    }

    /// Post-commit, best-effort. Each step is bounded by `side_effect_timeout`
    /// and an expiry is reported like any other side-effect failure.
    async fn apply_side_effects(&self, order: Order, previous: OrderStatus) -> TransitionOutcome {
        let id = order.id;
        let limit = self.side_effect_timeout;

        let cache_invalidation = tokio::time::timeout(limit, self.cache.invalidate(id))
            .await
            .unwrap_or_else(|_| Err(CacheError::failure(format!("invalidation timed out after {limit:?}"))));
        if let Err(e) = &cache_invalidation {
            self.metrics.record_side_effect_failure("cache_invalidation");
            tracing::warn!(order_id = %id, error = %e, "Cache invalidation failed, entry may be stale until TTL");
        }

        let event = OrderEvent::status_changed(&order, previous);
        let event_publication = tokio::time::timeout(limit, self.publisher.publish(&event))
            .await
            .unwrap_or(Err(PublishError::Timeout(limit)));
        if let Err(e) = &event_publication {
            self.metrics.record_side_effect_failure("event_publication");
            tracing::error!(
                order_id = %id,
                event_id = %event.event_id,
                error = %e,
                "Event publication failed after commit"
            );
        }

        TransitionOutcome {
            order,
            event,
            cache_invalidation,
            event_publication,
        }
    }

    /// Check each collaborator. Losing the store makes the service unhealthy;
    /// the cache and publisher only degrade it.
    pub async fn health(&self) -> SystemHealth {
        let store = match self.store.ping().await {
            Ok(()) => ComponentHealth::healthy("store"),
            Err(e) => ComponentHealth::new("store", HealthStatus::Unhealthy(e.to_string())),
        };

        let cache = match self.cache.ping().await {
            Ok(()) => ComponentHealth::healthy("cache"),
            Err(e) => ComponentHealth::new("cache", HealthStatus::Degraded(e.to_string())),
        };

        let publisher = match self.publisher.circuit_state().await {
            Some(CircuitState::Open) => ComponentHealth::new(
                "publisher",
                HealthStatus::Degraded("circuit breaker open".to_string()),
            ),
            Some(CircuitState::HalfOpen) => ComponentHealth::new(
                "publisher",
                HealthStatus::Degraded("circuit breaker half-open".to_string()),
            ),
            _ => ComponentHealth::healthy("publisher"),
        };

        SystemHealth::from_components(vec![store, cache, publisher])
    }

    fn observe<T>(&self, operation: &str, started: Instant, result: &Result<T, ServiceError>) {
        self.metrics.observe_duration(operation, started.elapsed().as_secs_f64());
        if let Err(e) = result {
            self.metrics.record_failure(operation, e.kind());
        }
    }
}
