//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use procurement::{ProcurementError, SupplierError};
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Procurement workflow error.
    Procurement(ProcurementError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Procurement(err) => (procurement_status(&err), err.to_string()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status.is_server_error() {
            tracing::error!(error = %message, status = status.as_u16(), "request failed");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn procurement_status(err: &ProcurementError) -> StatusCode {
    match err {
        ProcurementError::CustomerOrderNotFound(_) | ProcurementError::SupplierOrderNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        ProcurementError::ResellerUnavailable(_)
        | ProcurementError::ProductUnavailable(_)
        | ProcurementError::CustomerOrderResellerMismatch { .. }
        | ProcurementError::NoCustomerOrders => StatusCode::BAD_REQUEST,
        ProcurementError::NotSubmittable { .. }
        | ProcurementError::NotYetAccepted(_)
        | ProcurementError::DuplicateDocument(_) => StatusCode::CONFLICT,
        ProcurementError::Domain(err) => domain_status(err),
        ProcurementError::Store(err) => store_status(err),
        ProcurementError::Supplier(err) => supplier_status(err),
    }
}

fn domain_status(err: &DomainError) -> StatusCode {
    match err {
        DomainError::InvalidTransition { .. } => StatusCode::CONFLICT,
        _ => StatusCode::BAD_REQUEST,
    }
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::AlreadyExists { .. } | StoreError::ConcurrencyConflict { .. } => {
            StatusCode::CONFLICT
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn supplier_status(err: &SupplierError) -> StatusCode {
    match err {
        SupplierError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl From<ProcurementError> for ApiError {
    fn from(err: ProcurementError) -> Self {
        ApiError::Procurement(err)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Procurement(err.into())
    }
}
