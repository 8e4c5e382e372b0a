//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use api::DynSupplier;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use procurement::{
    CoordinatorConfig, MockSupplierSimulator, RetryPolicy, ScriptedFaults, SimulatedFault,
};
use serde_json::{Value, json};
use store::InMemoryStore;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

type Simulator = Arc<MockSupplierSimulator<ScriptedFaults>>;

fn setup() -> (axum::Router, Simulator) {
    let simulator = Arc::new(MockSupplierSimulator::new(ScriptedFaults::healthy()));
    let supplier: DynSupplier = simulator.clone();
    let config = CoordinatorConfig {
        retry: RetryPolicy::immediate(3),
        ..CoordinatorConfig::default()
    };
    let state = api::create_state(InMemoryStore::new(), supplier, config);
    (api::create_app(state, get_metrics_handle()), simulator)
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Registers a reseller and a product priced at $10.00.
async fn seed(app: &axum::Router) -> (String, String) {
    let (status, reseller) = send(
        app,
        "POST",
        "/resellers",
        Some(json!({
            "document": "12.345.678/0001-90",
            "company_name": "Distribuidora Ltda",
            "trade_name": "Dist",
            "email": "compras@dist.com.br"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, product) = send(
        app,
        "POST",
        "/products",
        Some(json!({ "name": "Pilsen 600ml", "brand": "Brewery", "unit_price": 1000 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    (
        reseller["id"].as_str().unwrap().to_string(),
        product["id"].as_str().unwrap().to_string(),
    )
}

async fn place_order(app: &axum::Router, reseller_id: &str, product_id: &str, quantity: u32) -> String {
    let (status, order) = send(
        app,
        "POST",
        "/customer-orders",
        Some(json!({
            "reseller_id": reseller_id,
            "customer": { "document": "123.456.789-00", "name": "Bar do Zé" },
            "lines": [{ "product_id": product_id, "quantity": quantity, "unit_price": 1000 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["status"], "Pending");
    order["id"].as_str().unwrap().to_string()
}

async fn create_supplier_order(
    app: &axum::Router,
    reseller_id: &str,
    order_ids: &[String],
) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/supplier-orders",
        Some(json!({ "reseller_id": reseller_id, "customer_order_ids": order_ids })),
    )
    .await
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup();
    let (status, json) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = setup();
    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );
}

#[tokio::test]
async fn test_consolidate_and_send() {
    let (app, simulator) = setup();
    let (reseller_id, product_id) = seed(&app).await;
    let a = place_order(&app, &reseller_id, &product_id, 600).await;
    let b = place_order(&app, &reseller_id, &product_id, 500).await;

    let (status, created) = create_supplier_order(&app, &reseller_id, &[a.clone(), b]).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["order"]["status"], "Confirmed");
    assert_eq!(created["order"]["total_quantity"], 1100);
    assert_eq!(created["order"]["total_amount"], 1_100_000);
    assert_eq!(created["order"]["order_number"], 1000);
    assert_eq!(simulator.submit_calls(), 1);

    let (status, order) = send(&app, "GET", &format!("/customer-orders/{a}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "Consolidated");

    let uri = format!("/resellers/{reseller_id}/customer-orders/pending");
    let (_, pending) = send(&app, "GET", &uri, None).await;
    assert_eq!(pending.as_array().unwrap().len(), 0);

    let (status, page) = send(&app, "GET", "/supplier-orders?page=1&page_size=10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total_count"], 1);
    assert_eq!(page["total_pages"], 1);
    assert_eq!(page["page_size"], 10);

    let uri = format!("/resellers/{reseller_id}/supplier-orders");
    let (_, page) = send(&app, "GET", &uri, None).await;
    assert_eq!(page["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_minimum_quantity_is_enforced() {
    let (app, simulator) = setup();
    let (reseller_id, product_id) = seed(&app).await;
    let a = place_order(&app, &reseller_id, &product_id, 400).await;

    let (status, body) = create_supplier_order(&app, &reseller_id, &[a.clone()]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "minimum order quantity of 1000 units not met, actual 400"
    );
    assert_eq!(simulator.submit_calls(), 0);

    let (_, order) = send(&app, "GET", &format!("/customer-orders/{a}"), None).await;
    assert_eq!(order["status"], "Pending");
}

#[tokio::test]
async fn test_failed_submission_then_retry() {
    let (app, simulator) = setup();
    simulator.faults().fail_submits([SimulatedFault::Declined]);
    let (reseller_id, product_id) = seed(&app).await;
    let a = place_order(&app, &reseller_id, &product_id, 1000).await;

    let (status, created) = create_supplier_order(&app, &reseller_id, &[a]).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["order"]["status"], "Failed");
    assert_eq!(created["order"]["retry_count"], 1);
    let id = created["supplier_order_id"].as_str().unwrap().to_string();

    let (_, failed) = send(&app, "GET", "/supplier-orders/failed", None).await;
    assert_eq!(failed.as_array().unwrap().len(), 1);

    let (status, body) = send(&app, "POST", &format!("/supplier-orders/{id}/retry"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["retried"], true);

    let (_, order) = send(&app, "GET", &format!("/supplier-orders/{id}"), None).await;
    assert_eq!(order["status"], "Confirmed");
    assert_eq!(order["retry_count"], 0);
}

#[tokio::test]
async fn test_retry_unknown_order() {
    let (app, _) = setup();
    let uri = format!("/supplier-orders/{}/retry", common::SupplierOrderId::new());
    let (status, body) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["retried"], false);
}

#[tokio::test]
async fn test_process_pending_reports_counters() {
    let (app, simulator) = setup();
    simulator
        .faults()
        .fail_submits([SimulatedFault::Declined, SimulatedFault::Declined]);
    let (reseller_id, product_id) = seed(&app).await;
    for _ in 0..2 {
        let order = place_order(&app, &reseller_id, &product_id, 1000).await;
        let (status, _) = create_supplier_order(&app, &reseller_id, &[order]).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, report) = send(&app, "POST", "/supplier-orders/process-pending", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["attempted"], 2);
    assert_eq!(report["accepted"], 2);
    assert_eq!(report["failed"], 0);

    let (_, pending) = send(&app, "GET", "/supplier-orders/pending", None).await;
    assert!(pending.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_supplier_status_updates() {
    let (app, _) = setup();
    let (reseller_id, product_id) = seed(&app).await;
    let a = place_order(&app, &reseller_id, &product_id, 1000).await;
    let (_, created) = create_supplier_order(&app, &reseller_id, &[a]).await;
    let id = created["supplier_order_id"].as_str().unwrap().to_string();
    let uri = format!("/supplier-orders/{id}/status");

    let (status, body) = send(&app, "PATCH", &uri, Some(json!({ "status": "Lost" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Unknown supplier order status: Lost");

    let (status, body) = send(&app, "PATCH", &uri, Some(json!({ "status": "InTransit" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "InTransit");

    let (status, _) = send(&app, "PATCH", &uri, Some(json!({ "status": "Pending" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, order) = send(&app, "POST", &format!("/supplier-orders/{id}/refresh"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "InTransit");
    assert!(order["estimated_delivery"].is_string());
}

#[tokio::test]
async fn test_customer_order_lifecycle() {
    let (app, _) = setup();
    let (reseller_id, product_id) = seed(&app).await;
    let a = place_order(&app, &reseller_id, &product_id, 10).await;

    let uri = format!("/customer-orders/{a}/status");
    let (status, body) = send(&app, "PATCH", &uri, Some(json!({ "status": "processing" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Processing");

    let (status, _) = send(&app, "PATCH", &uri, Some(json!({ "status": "Consolidated" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, "POST", &format!("/customer-orders/{a}/cancel"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Cancelled");

    let uri = format!("/resellers/{reseller_id}/customer-orders?page=1&page_size=5");
    let (_, page) = send(&app, "GET", &uri, None).await;
    assert_eq!(page["total_count"], 1);
    assert_eq!(page["items"][0]["status"], "Cancelled");
}

#[tokio::test]
async fn test_not_found_and_bad_ids() {
    let (app, _) = setup();

    let (status, body) = send(&app, "GET", "/products/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid product id"));

    let uri = format!("/products/{}", common::ProductId::new());
    let (status, _) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let uri = format!("/customer-orders/{}/cancel", common::CustomerOrderId::new());
    let (status, _) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_order_for_unknown_product_is_rejected() {
    let (app, _) = setup();
    let (reseller_id, _) = seed(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/customer-orders",
        Some(json!({
            "reseller_id": reseller_id,
            "customer": { "document": "1", "name": "x" },
            "lines": [{ "product_id": common::ProductId::new(), "quantity": 1, "unit_price": 100 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Product not found or inactive"));
}

#[tokio::test]
async fn test_reseller_management() {
    let (app, _) = setup();
    let (reseller_id, product_id) = seed(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/resellers",
        Some(json!({
            "document": "12.345.678/0001-90",
            "company_name": "Outra Ltda",
            "trade_name": "Outra",
            "email": "outra@dist.com.br"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["error"],
        "A reseller with document 12.345.678/0001-90 is already registered"
    );

    let uri = format!("/resellers/{reseller_id}");
    let (status, _) = send(
        &app,
        "PUT",
        &uri,
        Some(json!({
            "document": "12.345.678/0001-90",
            "company_name": "Distribuidora Ltda",
            "trade_name": "Dist Centro",
            "email": "compras@dist.com.br"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "GET", "/resellers/document/12.345.678%2F0001-90", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trade_name"], "Dist Centro");

    let (_, page) = send(&app, "GET", "/resellers?page=1&page_size=10", None).await;
    assert_eq!(page["total_count"], 1);

    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(body["active"], false);

    let (status, body) = send(
        &app,
        "POST",
        "/customer-orders",
        Some(json!({
            "reseller_id": reseller_id,
            "customer": { "document": "1", "name": "x" },
            "lines": [{ "product_id": product_id, "quantity": 1, "unit_price": 1000 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Reseller not found or inactive"));

    let uri = format!("/resellers/{}", common::ResellerId::new());
    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_catalog_and_order_listings() {
    let (app, _) = setup();
    let (reseller_id, product_id) = seed(&app).await;
    place_order(&app, &reseller_id, &product_id, 10).await;
    place_order(&app, &reseller_id, &product_id, 20).await;

    let (status, products) = send(&app, "GET", "/products", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(products["total_count"], 1);

    let (_, by_brand) = send(&app, "GET", "/products/brand/Brewery", None).await;
    assert_eq!(by_brand.as_array().unwrap().len(), 1);
    let (_, by_brand) = send(&app, "GET", "/products/brand/Nobody", None).await;
    assert!(by_brand.as_array().unwrap().is_empty());

    let (status, orders) = send(&app, "GET", "/customer-orders?page_size=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders["total_count"], 2);
    assert_eq!(orders["total_pages"], 2);
    assert_eq!(orders["items"][0]["lines"][0]["quantity"], 20);
}

#[tokio::test]
async fn test_oversized_line_is_rejected() {
    let (app, _) = setup();
    let (reseller_id, product_id) = seed(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/customer-orders",
        Some(json!({
            "reseller_id": reseller_id,
            "customer": { "document": "1", "name": "x" },
            "lines": [{ "product_id": product_id, "quantity": 3_000_000_000u32, "unit_price": 1 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid quantity"));
}

#[tokio::test]
async fn test_retry_of_cancelled_order_is_unprocessable() {
    let (app, simulator) = setup();
    simulator.faults().fail_submits([SimulatedFault::Declined]);
    let (reseller_id, product_id) = seed(&app).await;
    let a = place_order(&app, &reseller_id, &product_id, 1000).await;
    let (_, created) = create_supplier_order(&app, &reseller_id, &[a]).await;
    let id = created["supplier_order_id"].as_str().unwrap().to_string();

    let uri = format!("/supplier-orders/{id}/status");
    let (status, _) = send(&app, "PATCH", &uri, Some(json!({ "status": "Cancelled" }))).await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!("/supplier-orders/{id}/retry");
    let (status, body) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["retried"], false);
    assert_eq!(simulator.submit_calls(), 1);
}
