//! Procurement error types.

use common::{CustomerOrderId, ProductId, ResellerId, SupplierOrderId};
use domain::{DomainError, SupplierOrderStatus};
use store::StoreError;
use thiserror::Error;

use crate::supplier::SupplierError;

/// Errors that can occur during procurement operations.
#[derive(Debug, Error)]
pub enum ProcurementError {
    /// Reseller does not exist or is inactive.
    #[error("Reseller not found or inactive: {0}")]
    ResellerUnavailable(ResellerId),

    /// Another reseller is already registered under the document.
    #[error("A reseller with document {0} is already registered")]
    DuplicateDocument(String),

    /// Customer order not found.
    #[error("Customer order not found: {0}")]
    CustomerOrderNotFound(CustomerOrderId),

    /// Customer order belongs to another reseller.
    #[error("Customer order {order_id} does not belong to reseller {reseller_id}")]
    CustomerOrderResellerMismatch {
        order_id: CustomerOrderId,
        reseller_id: ResellerId,
    },

    /// Consolidation was requested without any customer order.
    #[error("No customer orders to consolidate")]
    NoCustomerOrders,

    /// Product does not exist or is inactive.
    #[error("Product not found or inactive: {0}")]
    ProductUnavailable(ProductId),

    /// Supplier order not found.
    #[error("Supplier order not found: {0}")]
    SupplierOrderNotFound(SupplierOrderId),

    /// Supplier order is not in a status that allows submission.
    #[error("Supplier order {order_id} cannot be submitted from {status} status")]
    NotSubmittable {
        order_id: SupplierOrderId,
        status: SupplierOrderStatus,
    },

    /// Supplier order has not been accepted by the supplier yet.
    #[error("Supplier order {0} has no supplier order number yet")]
    NotYetAccepted(SupplierOrderId),

    /// Domain rule violation.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Supplier API error.
    #[error(transparent)]
    Supplier(#[from] SupplierError),
}

/// Convenience type alias for procurement results.
pub type Result<T> = std::result::Result<T, ProcurementError>;
