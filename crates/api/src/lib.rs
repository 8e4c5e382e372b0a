//! HTTP API server for reseller procurement.
//!
//! Exposes catalog registration, customer order placement, and the supplier
//! order workflow over REST, with structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use metrics_exporter_prometheus::PrometheusHandle;
use procurement::{
    CatalogService, CoordinatorConfig, CustomerOrderService, SupplierApi, SupplierOrderCoordinator,
};
use store::ProcurementStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Supplier implementation chosen at startup.
pub type DynSupplier = Arc<dyn SupplierApi>;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub catalog: CatalogService<S>,
    pub customer_orders: CustomerOrderService<S>,
    pub coordinator: Arc<SupplierOrderCoordinator<S, DynSupplier>>,
}

/// Wires the services over one store and one supplier.
pub fn create_state<S: ProcurementStore + Clone + 'static>(
    store: S,
    supplier: DynSupplier,
    config: CoordinatorConfig,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        catalog: CatalogService::new(store.clone()),
        customer_orders: CustomerOrderService::new(store.clone()),
        coordinator: Arc::new(SupplierOrderCoordinator::new(store, supplier, config)),
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: ProcurementStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    use routes::{catalog, customer_orders, supplier_orders};

    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/resellers",
            post(catalog::register_reseller::<S>).get(catalog::list_resellers::<S>),
        )
        .route(
            "/resellers/document/{document}",
            get(catalog::get_reseller_by_document::<S>),
        )
        .route(
            "/resellers/{id}",
            get(catalog::get_reseller::<S>)
                .put(catalog::update_reseller::<S>)
                .delete(catalog::deactivate_reseller::<S>),
        )
        .route(
            "/resellers/{id}/customer-orders",
            get(customer_orders::list_by_reseller::<S>),
        )
        .route(
            "/resellers/{id}/customer-orders/pending",
            get(customer_orders::pending_by_reseller::<S>),
        )
        .route(
            "/resellers/{id}/supplier-orders",
            get(supplier_orders::list_by_reseller::<S>),
        )
        .route(
            "/products",
            post(catalog::register_product::<S>).get(catalog::list_products::<S>),
        )
        .route(
            "/products/brand/{brand}",
            get(catalog::products_by_brand::<S>),
        )
        .route("/products/{id}", get(catalog::get_product::<S>))
        .route(
            "/customer-orders",
            post(customer_orders::place::<S>).get(customer_orders::list::<S>),
        )
        .route("/customer-orders/{id}", get(customer_orders::get::<S>))
        .route(
            "/customer-orders/{id}/status",
            patch(customer_orders::update_status::<S>),
        )
        .route(
            "/customer-orders/{id}/cancel",
            post(customer_orders::cancel::<S>),
        )
        .route(
            "/supplier-orders",
            post(supplier_orders::create::<S>).get(supplier_orders::list::<S>),
        )
        .route(
            "/supplier-orders/pending",
            get(supplier_orders::list_pending::<S>),
        )
        .route(
            "/supplier-orders/failed",
            get(supplier_orders::list_failed::<S>),
        )
        .route(
            "/supplier-orders/process-pending",
            post(supplier_orders::process_pending::<S>),
        )
        .route("/supplier-orders/{id}", get(supplier_orders::get::<S>))
        .route(
            "/supplier-orders/{id}/retry",
            post(supplier_orders::retry::<S>),
        )
        .route(
            "/supplier-orders/{id}/status",
            patch(supplier_orders::update_status::<S>),
        )
        .route(
            "/supplier-orders/{id}/refresh",
            post(supplier_orders::refresh::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
