//! Persistence for the procurement backend.
//!
//! Entities are stored whole, with a version counter for optimistic
//! concurrency. Two implementations share the same traits:
//! [`InMemoryStore`] for tests and local runs, [`PostgresStore`] for
//! production.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{
    CustomerOrderStore, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, Page, PageRequest, ProcurementStore,
    ProductStore, ResellerStore, SupplierOrderStore,
};
