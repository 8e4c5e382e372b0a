//! Domain error types.

use common::{CustomerOrderId, ProductId};
use thiserror::Error;

use crate::customer_order::CustomerOrderStatus;
use crate::value_objects::{MAX_LINE_QUANTITY, MAX_UNIT_PRICE, Money};

/// Errors raised by domain rules.
///
/// These are business-rule rejections: when one is returned, no entity has
/// been mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// A status string did not name any known status.
    #[error("Unknown {entity} status: {value}")]
    UnknownStatus { entity: &'static str, value: String },

    /// The requested status change is not in the transition table.
    #[error("Invalid state transition for {entity}: cannot move from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: &'static str,
        to: &'static str,
    },

    /// A customer order cannot be merged into a supplier order in its current status.
    #[error("Customer order {order_id} cannot be consolidated from {status} state")]
    NotConsolidatable {
        order_id: CustomerOrderId,
        status: CustomerOrderStatus,
    },

    /// The consolidated quantity is below the supplier's minimum.
    #[error("minimum order quantity of {minimum} units not met, actual {actual}")]
    MinimumQuantityNotMet { minimum: u32, actual: u32 },

    /// Two lines for the same product carry different unit prices.
    #[error("Conflicting unit prices for product {product_id}: {expected} vs {found}")]
    PriceMismatch {
        product_id: ProductId,
        expected: Money,
        found: Money,
    },

    /// An order was built without any line.
    #[error("Order has no lines")]
    NoLines,

    /// A line quantity of zero or above the accepted maximum.
    #[error(
        "Invalid quantity for product {product_id}: {quantity} (must be between 1 and {max})",
        max = MAX_LINE_QUANTITY
    )]
    InvalidQuantity { product_id: ProductId, quantity: u32 },

    /// A unit price that is not positive or exceeds the accepted maximum.
    #[error(
        "Invalid unit price for product {product_id}: {price} (must be greater than 0 and at most {max})",
        max = MAX_UNIT_PRICE
    )]
    InvalidPrice { product_id: ProductId, price: Money },

    /// A negative discount.
    #[error("Invalid discount for product {product_id}: {discount} (must not be negative)")]
    InvalidDiscount {
        product_id: ProductId,
        discount: Money,
    },

    /// A summed quantity or amount does not fit its numeric type.
    #[error("Order {field} total exceeds the supported range")]
    TotalOverflow { field: &'static str },
}
