//! Domain layer for the reseller procurement backend.
//!
//! This crate provides:
//! - Catalog entities (resellers and products)
//! - Customer orders with their status machine
//! - Supplier orders with their status machine
//! - The order consolidation engine and its minimum-quantity gate

pub mod catalog;
pub mod customer_order;
pub mod error;
pub mod supplier_order;
pub mod value_objects;

pub use catalog::{Product, Reseller};
pub use customer_order::{CustomerInfo, CustomerOrder, CustomerOrderStatus};
pub use error::DomainError;
pub use supplier_order::{
    Consolidation, ConsolidationRules, DEFAULT_MINIMUM_QUANTITY, FIRST_SUPPLIER_ORDER_NUMBER,
    PricePolicy, SupplierOrder, SupplierOrderStatus, consolidate,
};
pub use value_objects::{MAX_LINE_QUANTITY, MAX_UNIT_PRICE, Money, OrderLine};
