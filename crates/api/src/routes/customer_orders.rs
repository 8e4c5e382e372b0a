//! Customer order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{CustomerOrderId, ResellerId};
use domain::{CustomerOrder, CustomerOrderStatus};
use procurement::PlaceCustomerOrder;
use serde::Serialize;
use store::{Page, ProcurementStore};

use super::{PageParams, StatusUpdateRequest, parse_id};
use crate::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct StatusUpdatedResponse {
    pub id: String,
    pub status: String,
}

/// POST /customer-orders
#[tracing::instrument(skip(state, req))]
pub async fn place<S: ProcurementStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<PlaceCustomerOrder>,
) -> Result<(StatusCode, Json<CustomerOrder>), ApiError> {
    let order = state.customer_orders.place(req).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /customer-orders
#[tracing::instrument(skip(state))]
pub async fn list<S: ProcurementStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<CustomerOrder>>, ApiError> {
    Ok(Json(state.customer_orders.list(params.into()).await?))
}

/// GET /customer-orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: ProcurementStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<CustomerOrder>, ApiError> {
    let order_id: CustomerOrderId = parse_id("customer order", &id)?;
    state
        .customer_orders
        .get(order_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Customer order {id} not found")))
}

/// GET /resellers/{id}/customer-orders
#[tracing::instrument(skip(state))]
pub async fn list_by_reseller<S: ProcurementStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<CustomerOrder>>, ApiError> {
    let reseller_id: ResellerId = parse_id("reseller", &id)?;
    let page = state
        .customer_orders
        .list_by_reseller(reseller_id, params.into())
        .await?;
    Ok(Json(page))
}

/// GET /resellers/{id}/customer-orders/pending
#[tracing::instrument(skip(state))]
pub async fn pending_by_reseller<S: ProcurementStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<CustomerOrder>>, ApiError> {
    let reseller_id: ResellerId = parse_id("reseller", &id)?;
    let orders = state
        .customer_orders
        .pending_by_reseller(reseller_id)
        .await?;
    Ok(Json(orders))
}

/// PATCH /customer-orders/{id}/status
#[tracing::instrument(skip(state, req))]
pub async fn update_status<S: ProcurementStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<StatusUpdatedResponse>, ApiError> {
    let order_id: CustomerOrderId = parse_id("customer order", &id)?;
    let status: CustomerOrderStatus = req.status.parse()?;

    if !state.customer_orders.update_status(order_id, status).await? {
        return Err(ApiError::NotFound(format!("Customer order {id} not found")));
    }
    Ok(Json(StatusUpdatedResponse {
        id,
        status: status.to_string(),
    }))
}

/// POST /customer-orders/{id}/cancel
#[tracing::instrument(skip(state))]
pub async fn cancel<S: ProcurementStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<StatusUpdatedResponse>, ApiError> {
    let order_id: CustomerOrderId = parse_id("customer order", &id)?;

    if !state.customer_orders.cancel(order_id).await? {
        return Err(ApiError::NotFound(format!("Customer order {id} not found")));
    }
    Ok(Json(StatusUpdatedResponse {
        id,
        status: CustomerOrderStatus::Cancelled.to_string(),
    }))
}
