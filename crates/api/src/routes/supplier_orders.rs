//! Supplier order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{CustomerOrderId, ResellerId, SupplierOrderId};
use domain::{SupplierOrder, SupplierOrderStatus};
use procurement::BatchReport;
use serde::{Deserialize, Serialize};
use store::{Page, ProcurementStore};

use super::{PageParams, StatusUpdateRequest, parse_id};
use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateSupplierOrderRequest {
    pub reseller_id: ResellerId,
    pub customer_order_ids: Vec<CustomerOrderId>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Serialize)]
pub struct SupplierOrderCreatedResponse {
    pub supplier_order_id: String,
    pub order: SupplierOrder,
}

#[derive(Serialize)]
pub struct RetryResponse {
    pub retried: bool,
}

#[derive(Serialize)]
pub struct StatusUpdatedResponse {
    pub id: String,
    pub status: String,
}

/// POST /supplier-orders
///
/// Responds 201 once the order is committed, whatever the submission did;
/// the returned order shows whether the supplier accepted it.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: ProcurementStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateSupplierOrderRequest>,
) -> Result<(StatusCode, Json<SupplierOrderCreatedResponse>), ApiError> {
    let order_id = state
        .coordinator
        .create_and_send(req.reseller_id, &req.customer_order_ids, req.notes)
        .await?;
    let order = state.coordinator.get(order_id).await?.ok_or_else(|| {
        ApiError::Internal(format!("Supplier order {order_id} vanished after creation"))
    })?;

    Ok((
        StatusCode::CREATED,
        Json(SupplierOrderCreatedResponse {
            supplier_order_id: order_id.to_string(),
            order,
        }),
    ))
}

/// GET /supplier-orders
#[tracing::instrument(skip(state))]
pub async fn list<S: ProcurementStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<SupplierOrder>>, ApiError> {
    Ok(Json(state.coordinator.list(params.into()).await?))
}

/// GET /resellers/{id}/supplier-orders
#[tracing::instrument(skip(state))]
pub async fn list_by_reseller<S: ProcurementStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<SupplierOrder>>, ApiError> {
    let reseller_id: ResellerId = parse_id("reseller", &id)?;
    let page = state
        .coordinator
        .list_by_reseller(reseller_id, params.into())
        .await?;
    Ok(Json(page))
}

/// GET /supplier-orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: ProcurementStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<SupplierOrder>, ApiError> {
    let order_id: SupplierOrderId = parse_id("supplier order", &id)?;
    state
        .coordinator
        .get(order_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Supplier order {id} not found")))
}

/// GET /supplier-orders/pending
#[tracing::instrument(skip(state))]
pub async fn list_pending<S: ProcurementStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<SupplierOrder>>, ApiError> {
    Ok(Json(state.coordinator.list_pending().await?))
}

/// GET /supplier-orders/failed
#[tracing::instrument(skip(state))]
pub async fn list_failed<S: ProcurementStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<SupplierOrder>>, ApiError> {
    Ok(Json(state.coordinator.list_failed().await?))
}

/// POST /supplier-orders/{id}/retry
///
/// 200 when the order is accepted or already past submission, 404 when it
/// does not exist, 422 when the attempt failed.
#[tracing::instrument(skip(state))]
pub async fn retry<S: ProcurementStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<RetryResponse>), ApiError> {
    let order_id: SupplierOrderId = parse_id("supplier order", &id)?;
    if state.coordinator.get(order_id).await?.is_none() {
        return Ok((StatusCode::NOT_FOUND, Json(RetryResponse { retried: false })));
    }

    let retried = state.coordinator.retry(order_id).await;
    let status = if retried {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    Ok((status, Json(RetryResponse { retried })))
}

/// PATCH /supplier-orders/{id}/status
#[tracing::instrument(skip(state, req))]
pub async fn update_status<S: ProcurementStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<StatusUpdatedResponse>, ApiError> {
    let order_id: SupplierOrderId = parse_id("supplier order", &id)?;
    let status: SupplierOrderStatus = req.status.parse()?;

    if !state.coordinator.update_status(order_id, status).await? {
        return Err(ApiError::NotFound(format!("Supplier order {id} not found")));
    }
    Ok(Json(StatusUpdatedResponse {
        id,
        status: status.to_string(),
    }))
}

/// POST /supplier-orders/{id}/refresh
#[tracing::instrument(skip(state))]
pub async fn refresh<S: ProcurementStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<SupplierOrder>, ApiError> {
    let order_id: SupplierOrderId = parse_id("supplier order", &id)?;
    Ok(Json(state.coordinator.refresh_status(order_id).await?))
}

/// POST /supplier-orders/process-pending
#[tracing::instrument(skip(state))]
pub async fn process_pending<S: ProcurementStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<BatchReport> {
    Json(state.coordinator.process_all_pending().await)
}
