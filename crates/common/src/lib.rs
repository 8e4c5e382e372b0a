//! Shared identifier and versioning types.

mod types;

pub use types::{CustomerOrderId, ProductId, ResellerId, SupplierOrderId, Version};
