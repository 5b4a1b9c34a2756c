// ============================================================================
// HTTP Boundary - actix-web routes over the order service
// ============================================================================
//
// Thin translation layer: parse and shape requests, run the coordinator call
// under the request deadline, map `ServiceError` to status codes. No order
// semantics live here.
//
//   GET   /health                    component health (200 / 503, bounded by the deadline)
//   GET   /metrics                   Prometheus text format
//   POST  /api/orders                create (201)
//   GET   /api/orders                list with filters and paging
//   GET   /api/orders/{id}           read (cache-aside)
//   PATCH /api/orders/{id}/status    transition
//   PUT   /api/orders/{id}           transition, same semantics as PATCH
//
// ============================================================================

mod error;

pub use self::error::ApiError;

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::Config;
use crate::domain::order::{Order, OrderItem, OrderStatus};
use crate::health::{ComponentHealth, HealthStatus, SystemHealth};
use crate::service::{OrderService, ServiceError};
use crate::store::{OrderFilter, PageRequest};

pub struct AppState {
    pub service: Arc<OrderService>,
    pub request_timeout: Duration,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl AppState {
    pub fn new(service: Arc<OrderService>, config: &Config) -> Self {
        Self {
            service,
            request_timeout: config.request_timeout,
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub customer_id: String,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersQuery {
    pub status: Option<String>,
    pub customer_id: Option<String>,
    /// Kept raw: unparseable paging falls back to the defaults
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderListResponse {
    pub orders: Vec<Order>,
    pub pagination: Pagination,
}

/// Register every route. Expects `web::Data<AppState>` in app data.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::bad_request("INVALID_DATA", err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::bad_request("INVALID_QUERY", err.to_string()).into()),
    )
    .route("/health", web::get().to(health))
    .route("/metrics", web::get().to(metrics))
    .service(
        web::scope("/api/orders")
            .route("", web::post().to(create_order))
            .route("", web::get().to(list_orders))
            .route("/{id}", web::get().to(get_order))
            .route("/{id}", web::put().to(update_status))
            .route("/{id}/status", web::patch().to(update_status)),
    );
}

// ============================================================================
// Handlers
// ============================================================================

async fn create_order(
    state: web::Data<AppState>,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, ApiError> {
    let CreateOrderRequest { customer_id, items } = body.into_inner();
    let order = run(&state, "create_order", state.service.create_order(&customer_id, items)).await?;
    Ok(HttpResponse::Created().json(order))
}

async fn get_order(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let id = parse_order_id(&path)?;
    let order = run(&state, "get_order", state.service.get_order(id)).await?;
    Ok(HttpResponse::Ok().json(order))
}

async fn list_orders(
    state: web::Data<AppState>,
    query: web::Query<ListOrdersQuery>,
) -> Result<HttpResponse, ApiError> {
    let query = query.into_inner();

    let status = query
        .status
        .as_deref()
        .map(OrderStatus::from_str)
        .transpose()
        .map_err(|e| ApiError::bad_request("INVALID_DATA", e.to_string()))?;
    let customer_id = query
        .customer_id
        .as_deref()
        .map(Uuid::parse_str)
        .transpose()
        .map_err(|e| ApiError::bad_request("INVALID_DATA", format!("Invalid customerId: {e}")))?;

    let filter = OrderFilter { status, customer_id };
    let page = PageRequest::clamped(
        parse_paging(query.page.as_deref()),
        parse_paging(query.limit.as_deref()),
        state.default_page_size,
        state.max_page_size,
    );

    let result = run(&state, "list_orders", state.service.list_orders(filter, page)).await?;

    Ok(HttpResponse::Ok().json(OrderListResponse {
        pagination: Pagination {
            page: page.page,
            limit: page.page_size,
            total: result.total,
            total_pages: page.total_pages(result.total),
        },
        orders: result.items,
    }))
}

async fn update_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, ApiError> {
    let id = parse_order_id(&path)?;
    let target = OrderStatus::from_str(&body.status).map_err(ServiceError::from)?;

    // The deadline covers the commit only; side effects have their own bound
    let outcome = state
        .service
        .transition_status_with_deadline(id, target, Some(state.request_timeout))
        .await?;
    Ok(HttpResponse::Ok().json(outcome.order))
}

async fn health(state: web::Data<AppState>) -> HttpResponse {
    let health = match tokio::time::timeout(state.request_timeout, state.service.health()).await {
        Ok(health) => health,
        Err(_) => {
            tracing::warn!(timeout_ms = state.request_timeout.as_millis() as u64, "Health check timed out");
            SystemHealth::from_components(vec![ComponentHealth::new(
                "service",
                HealthStatus::Unhealthy(format!("health check timed out after {:?}", state.request_timeout)),
            )])
        }
    };
    if health.is_available() {
        HttpResponse::Ok().json(health)
    } else {
        HttpResponse::ServiceUnavailable().json(health)
    }
}

async fn metrics(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let body = state
        .service
        .metrics()
        .render()
        .map_err(|e| ApiError::internal(format!("Failed to encode metrics: {e}")))?;

    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(body))
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_paging(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|value| value.trim().parse().ok())
}

fn parse_order_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("INVALID_ID", format!("Invalid order id: {raw}")))
}

/// Run a coordinator call under the request deadline. Dropping the future on
/// expiry cancels whatever round trip is in flight.
async fn run<T>(
    state: &AppState,
    operation: &str,
    call: impl Future<Output = Result<T, ServiceError>>,
) -> Result<T, ApiError> {
    match tokio::time::timeout(state.request_timeout, call).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(_) => {
            let err = ServiceError::Timeout(state.request_timeout);
            state.service.metrics().record_failure(operation, err.kind());
            tracing::warn!(operation = operation, timeout_ms = state.request_timeout.as_millis() as u64, "Request deadline exceeded");
            Err(err.into())
        }
    }
}
