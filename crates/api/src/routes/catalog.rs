//! Reseller and product registration endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{ProductId, ResellerId};
use domain::{Product, Reseller};
use procurement::{RegisterProduct, RegisterReseller};
use store::{Page, ProcurementStore};

use super::{PageParams, parse_id};
use crate::AppState;
use crate::error::ApiError;

/// POST /resellers
#[tracing::instrument(skip(state, req))]
pub async fn register_reseller<S: ProcurementStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RegisterReseller>,
) -> Result<(StatusCode, Json<Reseller>), ApiError> {
    let reseller = state.catalog.register_reseller(req).await?;
    Ok((StatusCode::CREATED, Json(reseller)))
}

/// GET /resellers/{id}
#[tracing::instrument(skip(state))]
pub async fn get_reseller<S: ProcurementStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Reseller>, ApiError> {
    let reseller_id: ResellerId = parse_id("reseller", &id)?;
    state
        .catalog
        .get_reseller(reseller_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Reseller {id} not found")))
}

/// GET /resellers
#[tracing::instrument(skip(state))]
pub async fn list_resellers<S: ProcurementStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Reseller>>, ApiError> {
    Ok(Json(state.catalog.list_resellers(params.into()).await?))
}

/// GET /resellers/document/{document}
#[tracing::instrument(skip(state))]
pub async fn get_reseller_by_document<S: ProcurementStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(document): Path<String>,
) -> Result<Json<Reseller>, ApiError> {
    state
        .catalog
        .find_reseller_by_document(&document)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Reseller with document {document} not found")))
}

/// PUT /resellers/{id}
#[tracing::instrument(skip(state, req))]
pub async fn update_reseller<S: ProcurementStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<RegisterReseller>,
) -> Result<StatusCode, ApiError> {
    let reseller_id: ResellerId = parse_id("reseller", &id)?;
    if state.catalog.update_reseller(reseller_id, req).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Reseller {id} not found")))
    }
}

/// DELETE /resellers/{id}
///
/// Deactivates the reseller; nothing is removed.
#[tracing::instrument(skip(state))]
pub async fn deactivate_reseller<S: ProcurementStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let reseller_id: ResellerId = parse_id("reseller", &id)?;
    if state.catalog.deactivate_reseller(reseller_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Reseller {id} not found")))
    }
}

/// GET /products
#[tracing::instrument(skip(state))]
pub async fn list_products<S: ProcurementStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Product>>, ApiError> {
    Ok(Json(state.catalog.list_products(params.into()).await?))
}

/// GET /products/brand/{brand}
#[tracing::instrument(skip(state))]
pub async fn products_by_brand<S: ProcurementStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(brand): Path<String>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.catalog.products_by_brand(&brand).await?))
}

/// POST /products
#[tracing::instrument(skip(state, req))]
pub async fn register_product<S: ProcurementStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<RegisterProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state.catalog.register_product(req).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get_product<S: ProcurementStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    let product_id: ProductId = parse_id("product", &id)?;
    state
        .catalog
        .get_product(product_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Product {id} not found")))
}
