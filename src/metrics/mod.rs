use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

use crate::utils::CircuitState;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Covers:
// - Order lifecycle (creations, status transitions, failures by kind)
// - Cache-aside effectiveness (hit / miss / error)
// - Post-commit side effects that did not land
// - Event publication attempts and circuit breaker state
// - Per-operation latency
//
// Everything lives in one registry owned by `Metrics`, rendered at /metrics.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Lifecycle
    pub orders_created: IntCounter,
    pub status_transitions: IntCounterVec,
    pub operation_failures: IntCounterVec,
    pub operation_duration: HistogramVec,

    // Cache
    pub cache_lookups: IntCounterVec,

    // Side effects and publishing
    pub side_effect_failures: IntCounterVec,
    pub publish_attempts: IntCounterVec,

    // Circuit Breaker
    pub circuit_breaker_state: IntGauge,
    pub circuit_breaker_transitions: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let orders_created = IntCounter::new("orders_created_total", "Total orders created")?;
        registry.register(Box::new(orders_created.clone()))?;

        let status_transitions = IntCounterVec::new(
            Opts::new("order_status_transitions_total", "Committed order status transitions"),
            &["from_status", "to_status"],
        )?;
        registry.register(Box::new(status_transitions.clone()))?;

        let operation_failures = IntCounterVec::new(
            Opts::new("order_operation_failures_total", "Failed order operations by error kind"),
            &["operation", "kind"],
        )?;
        registry.register(Box::new(operation_failures.clone()))?;

        let operation_duration = HistogramVec::new(
            HistogramOpts::new("order_operation_duration_seconds", "Order operation duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        let cache_lookups = IntCounterVec::new(
            Opts::new("order_cache_lookups_total", "Order cache lookups by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(cache_lookups.clone()))?;

        let side_effect_failures = IntCounterVec::new(
            Opts::new(
                "order_side_effect_failures_total",
                "Post-commit side effects that failed after a successful write",
            ),
            &["effect"],
        )?;
        registry.register(Box::new(side_effect_failures.clone()))?;

        let publish_attempts = IntCounterVec::new(
            Opts::new("event_publish_attempts_total", "Broker send attempts by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(publish_attempts.clone()))?;

        let circuit_breaker_state = IntGauge::new(
            "circuit_breaker_state",
            "Circuit breaker state (0=Closed, 1=Open, 2=HalfOpen)",
        )?;
        registry.register(Box::new(circuit_breaker_state.clone()))?;

        let circuit_breaker_transitions = IntCounterVec::new(
            Opts::new("circuit_breaker_transitions_total", "Circuit breaker state transitions"),
            &["from_state", "to_state"],
        )?;
        registry.register(Box::new(circuit_breaker_transitions.clone()))?;

        Ok(Self {
            registry,
            orders_created,
            status_transitions,
            operation_failures,
            operation_duration,
            cache_lookups,
            side_effect_failures,
            publish_attempts,
            circuit_breaker_state,
            circuit_breaker_transitions,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Text exposition format, as served at /metrics
    pub fn render(&self) -> Result<Vec<u8>, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }

    pub fn record_order_created(&self) {
        self.orders_created.inc();
    }

    pub fn record_transition(&self, from_status: &str, to_status: &str) {
        self.status_transitions.with_label_values(&[from_status, to_status]).inc();
    }

    pub fn record_failure(&self, operation: &str, kind: &str) {
        self.operation_failures.with_label_values(&[operation, kind]).inc();
    }

    pub fn observe_duration(&self, operation: &str, duration_secs: f64) {
        self.operation_duration.with_label_values(&[operation]).observe(duration_secs);
    }

    /// `outcome` is one of hit, miss, error
    pub fn record_cache_lookup(&self, outcome: &str) {
        self.cache_lookups.with_label_values(&[outcome]).inc();
    }

    pub fn record_side_effect_failure(&self, effect: &str) {
        self.side_effect_failures.with_label_values(&[effect]).inc();
    }

    pub fn record_publish_attempt(&self, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.publish_attempts.with_label_values(&[outcome]).inc();
    }

    pub fn record_circuit_breaker_transition(&self, from: CircuitState, to: CircuitState) {
        self.circuit_breaker_state.set(to.as_gauge());
        self.circuit_breaker_transitions
            .with_label_values(&[from.as_str(), to.as_str()])
            .inc();
    }
}
