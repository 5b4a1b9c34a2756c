mod common;

use actix_web::{
    http::{header::ContentType, StatusCode},
    test, web, App,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

use common::{harness, Harness, CUSTOMER_ID};
use order_lifecycle::http::{self, AppState};
use order_lifecycle::store::StoreError;

fn state(h: &Harness, request_timeout: Duration) -> web::Data<AppState> {
    web::Data::new(AppState {
        service: h.service.clone(),
        request_timeout,
        default_page_size: 10,
        max_page_size: 100,
    })
}

fn order_body() -> Value {
    json!({
        "customerId": CUSTOMER_ID,
        "items": [
            {"sku": "LAPTOP-001", "quantity": 2, "price": 999.99},
            {"sku": "MOUSE-002", "quantity": 1, "price": 29.99}
        ]
    })
}

macro_rules! app {
    ($h:expr) => {
        app!($h, Duration::from_secs(5))
    };
    ($h:expr, $timeout:expr) => {
        test::init_service(App::new().app_data(state(&$h, $timeout)).configure(http::routes)).await
    };
}

#[actix_web::test]
async fn test_create_then_get_order() {
    let h = harness();
    let app = app!(h);

    let req = test::TestRequest::post().uri("/api/orders").set_json(order_body()).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["status"], "NEW");
    assert_eq!(created["version"], 1);
    assert!((created["totalAmount"].as_f64().unwrap() - 2029.97).abs() < 1e-9);

    let id = created["orderId"].as_str().unwrap();
    let req = test::TestRequest::get().uri(&format!("/api/orders/{id}")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Value = test::read_body_json(resp).await;
    assert_eq!(fetched, created);
}

#[actix_web::test]
async fn test_create_rejects_bad_payloads() {
    let h = harness();
    let app = app!(h);

    let req = test::TestRequest::post()
        .uri("/api/orders")
        .set_json(json!({"customerId": CUSTOMER_ID, "items": []}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], 400);
    assert_eq!(body["code"], "INVALID_DATA");

    let req = test::TestRequest::post()
        .uri("/api/orders")
        .insert_header(ContentType::json())
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "INVALID_DATA");
}

#[actix_web::test]
async fn test_get_with_malformed_or_unknown_id() {
    let h = harness();
    let app = app!(h);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/orders/not-a-uuid").to_request()).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "INVALID_ID");

    let uri = format!("/api/orders/{}", uuid::Uuid::new_v4());
    let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "NOT_FOUND");
}

#[actix_web::test]
async fn test_patch_and_put_transition_status() {
    let h = harness();
    let app = app!(h);
    let order = h.service.create_order(CUSTOMER_ID, common::scenario_a_items()).await.unwrap();

    let req = test::TestRequest::patch()
        .uri(&format!("/api/orders/{}/status", order.id))
        .set_json(json!({"status": "IN_PROGRESS"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "IN_PROGRESS");
    assert_eq!(body["version"], 2);

    let req = test::TestRequest::put()
        .uri(&format!("/api/orders/{}", order.id))
        .set_json(json!({"status": "DELIVERED"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["version"], 3);

    assert_eq!(h.publisher.events().await.len(), 2);
}

#[actix_web::test]
async fn test_transition_error_codes() {
    let h = harness();
    let app = app!(h);
    let order = h.service.create_order(CUSTOMER_ID, common::scenario_a_items()).await.unwrap();
    let uri = format!("/api/orders/{}/status", order.id);

    let cases = [
        (json!({"status": "DELIVERED"}), StatusCode::BAD_REQUEST, "INVALID_TRANSITION"),
        (json!({"status": "SHIPPED"}), StatusCode::BAD_REQUEST, "INVALID_DATA"),
    ];
    for (payload, status, code) in cases {
        let req = test::TestRequest::patch().uri(&uri).set_json(payload).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), status);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], code);
    }

    *h.store.fail_update_with.lock().unwrap() = Some(StoreError::VersionConflict {
        id: order.id,
        expected: 1,
        actual: 2,
    });
    let req = test::TestRequest::patch().uri(&uri).set_json(json!({"status": "CANCELLED"})).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    *h.store.fail_update_with.lock().unwrap() = Some(StoreError::failure("coordinator timeout"));
    let req = test::TestRequest::patch().uri(&uri).set_json(json!({"status": "CANCELLED"})).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "STORE_ERROR");
}

#[actix_web::test]
async fn test_list_clamps_paging_and_validates_filters() {
    let h = harness();
    let app = app!(h);
    for _ in 0..3 {
        h.service.create_order(CUSTOMER_ID, common::scenario_a_items()).await.unwrap();
    }

    let req = test::TestRequest::get().uri("/api/orders?page=0&limit=1000").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["pagination"], json!({"page": 1, "limit": 100, "total": 3, "totalPages": 1}));
    assert_eq!(body["orders"].as_array().unwrap().len(), 3);

    let req = test::TestRequest::get()
        .uri(&format!("/api/orders?status=NEW&customerId={CUSTOMER_ID}&page=2&limit=2"))
        .to_request();
    let body: Value = test::read_body_json(test::call_service(&app, req).await).await;
    assert_eq!(body["pagination"], json!({"page": 2, "limit": 2, "total": 3, "totalPages": 2}));
    assert_eq!(body["orders"].as_array().unwrap().len(), 1);

    for uri in ["/api/orders?status=LOST", "/api/orders?customerId=nope"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[actix_web::test]
async fn test_list_non_numeric_paging_falls_back_to_defaults() {
    let h = harness();
    let app = app!(h);
    h.service.create_order(CUSTOMER_ID, common::scenario_a_items()).await.unwrap();

    let req = test::TestRequest::get().uri("/api/orders?page=abc&limit=ten").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["pagination"], json!({"page": 1, "limit": 10, "total": 1, "totalPages": 1}));
}

#[actix_web::test]
async fn test_slow_store_hits_request_deadline() {
    let h = harness();
    let app = app!(h, Duration::from_millis(50));
    let order = h.service.create_order(CUSTOMER_ID, common::scenario_a_items()).await.unwrap();

    // Nobody else arrives at the barrier, so the read never completes
    *h.store.read_barrier.lock().unwrap() = Some(Arc::new(Barrier::new(2)));

    let req = test::TestRequest::patch()
        .uri(&format!("/api/orders/{}/status", order.id))
        .set_json(json!({"status": "IN_PROGRESS"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "TIMEOUT");
}

#[actix_web::test]
async fn test_slow_publish_does_not_fail_committed_transition() {
    let h = harness();
    let app = app!(h, Duration::from_millis(100));
    let order = h.service.create_order(CUSTOMER_ID, common::scenario_a_items()).await.unwrap();
    *h.publisher.delay.lock().unwrap() = Some(Duration::from_millis(500));

    let req = test::TestRequest::patch()
        .uri(&format!("/api/orders/{}/status", order.id))
        .set_json(json!({"status": "IN_PROGRESS"}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "IN_PROGRESS");
    assert_eq!(body["version"], 2);
    assert_eq!(h.publisher.events().await.len(), 1);
}

#[actix_web::test]
async fn test_hung_health_check_reports_unavailable() {
    let h = harness();
    let app = app!(h, Duration::from_millis(50));
    *h.store.hang_ping.lock().unwrap() = true;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"]["state"], "unhealthy");
}

#[actix_web::test]
async fn test_health_and_metrics_endpoints() {
    let h = harness();
    let app = app!(h);
    h.service.create_order(CUSTOMER_ID, common::scenario_a_items()).await.unwrap();

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"]["state"], "healthy");

    let resp = test::call_service(&app, test::TestRequest::get().uri("/metrics").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let text = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(text.contains("orders_created_total 1"));

    *h.store.fail_reads_with.lock().unwrap() = Some(StoreError::failure("no hosts available"));
    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}
