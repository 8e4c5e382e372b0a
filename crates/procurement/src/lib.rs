//! Procurement workflow for resellers.
//!
//! This crate provides:
//! - The supplier API contract, an HTTP client, and a fault-injecting simulator
//! - The submission pipeline with retry and backoff
//! - The supplier order coordinator (consolidate, submit, retry, batch)
//! - Customer order placement and catalog registration
//! - A periodic reprocessor for pending supplier orders

pub mod catalog;
pub mod coordinator;
pub mod customer_orders;
pub mod error;
pub mod locks;
pub mod reprocessor;
pub mod submission;
pub mod supplier;

#[cfg(test)]
mod testing;

pub use catalog::{CatalogService, RegisterProduct, RegisterReseller};
pub use coordinator::{BatchReport, CoordinatorConfig, SupplierOrderCoordinator};
pub use customer_orders::{CustomerOrderService, PlaceCustomerOrder};
pub use error::{ProcurementError, Result};
pub use locks::OrderLocks;
pub use reprocessor::spawn_reprocessor;
pub use submission::{SubmissionOutcome, SubmissionPipeline};
pub use supplier::{
    HttpSupplierClient, MockSupplierSimulator, OrderStatusResponse, RandomFaults, RetryPolicy,
    ScriptedFaults, SimulatedFault, SubmitOrderRequest, SubmitOrderResponse, SupplierApi,
    SupplierError, SupplierSettings,
};
