use async_trait::async_trait;
use common::{CustomerOrderId, ProductId, ResellerId, SupplierOrderId, Version};
use domain::{CustomerOrder, Product, Reseller, SupplierOrder};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A request for one page of a listing. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Creates a request, clamping page to at least 1 and page size to
    /// `1..=MAX_PAGE_SIZE`.
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Number of items to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }
}

/// One page of a listing plus the size of the whole listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: u64, request: PageRequest) -> Self {
        let total_pages = total_count.div_ceil(u64::from(request.page_size));
        Self {
            items,
            total_count,
            page: request.page,
            page_size: request.page_size,
            total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
        }
    }

    /// Builds a page by slicing an already sorted, complete listing.
    pub fn from_sorted(all: Vec<T>, request: PageRequest) -> Self {
        let total_count = all.len() as u64;
        let items = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.page_size as usize)
            .collect();
        Self::new(items, total_count, request)
    }

    /// Converts the items, keeping the paging information.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }
}

/// Reseller persistence.
#[async_trait]
pub trait ResellerStore: Send + Sync {
    /// Returns the reseller, or None if it does not exist.
    async fn get_reseller(&self, id: ResellerId) -> Result<Option<Reseller>>;

    /// Returns the reseller registered under a document (CNPJ).
    async fn find_reseller_by_document(&self, document: &str) -> Result<Option<Reseller>>;

    /// Lists resellers, newest first.
    async fn list_resellers(&self, page: PageRequest) -> Result<Page<Reseller>>;

    /// Stores a new reseller and returns its first version.
    async fn create_reseller(&self, reseller: &Reseller) -> Result<Version>;

    /// Replaces a stored reseller with a version check. Returns the new version.
    async fn update_reseller(&self, reseller: &Reseller) -> Result<Version>;
}

/// Product catalog persistence.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Returns the product, or None if it does not exist.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Lists products, newest first.
    async fn list_products(&self, page: PageRequest) -> Result<Page<Product>>;

    /// Active products of a brand, by name.
    async fn products_by_brand(&self, brand: &str) -> Result<Vec<Product>>;

    /// Stores a new product and returns its first version.
    async fn create_product(&self, product: &Product) -> Result<Version>;
}

/// Customer order persistence.
#[async_trait]
pub trait CustomerOrderStore: Send + Sync {
    async fn get_customer_order(&self, id: CustomerOrderId) -> Result<Option<CustomerOrder>>;

    /// Lists all customer orders, newest first.
    async fn list_customer_orders(&self, page: PageRequest) -> Result<Page<CustomerOrder>>;

    /// Lists a reseller's orders, newest first.
    async fn list_customer_orders_by_reseller(
        &self,
        reseller_id: ResellerId,
        page: PageRequest,
    ) -> Result<Page<CustomerOrder>>;

    /// Lists a reseller's Pending orders, oldest first.
    async fn pending_customer_orders_by_reseller(
        &self,
        reseller_id: ResellerId,
    ) -> Result<Vec<CustomerOrder>>;

    /// Stores a new order and returns its first version.
    async fn create_customer_order(&self, order: &CustomerOrder) -> Result<Version>;

    /// Replaces a stored order.
    ///
    /// Fails with `ConcurrencyConflict` unless the stored version equals
    /// `order.version()`. Returns the new version.
    async fn update_customer_order(&self, order: &CustomerOrder) -> Result<Version>;

    /// Allocates the next customer order number.
    async fn next_customer_order_number(&self) -> Result<i64>;
}

/// Supplier order persistence.
#[async_trait]
pub trait SupplierOrderStore: Send + Sync {
    async fn get_supplier_order(&self, id: SupplierOrderId) -> Result<Option<SupplierOrder>>;

    /// Lists all supplier orders, newest first.
    async fn list_supplier_orders(&self, page: PageRequest) -> Result<Page<SupplierOrder>>;

    /// Lists a reseller's supplier orders, newest first.
    async fn list_supplier_orders_by_reseller(
        &self,
        reseller_id: ResellerId,
        page: PageRequest,
    ) -> Result<Page<SupplierOrder>>;

    /// Stores a new supplier order together with its consolidated customer
    /// orders, atomically.
    ///
    /// Every customer order is written with the same version check as
    /// [`CustomerOrderStore::update_customer_order`]. If any check fails
    /// nothing is written. Returns the supplier order's first version.
    async fn commit_consolidation(
        &self,
        supplier_order: &SupplierOrder,
        customer_orders: &[CustomerOrder],
    ) -> Result<Version>;

    /// Replaces a stored supplier order with a version check. Returns the new version.
    async fn update_supplier_order(&self, order: &SupplierOrder) -> Result<Version>;

    /// Orders waiting for (re)submission: Pending or Failed, oldest first.
    async fn pending_supplier_orders(&self) -> Result<Vec<SupplierOrder>>;

    /// Failed orders, most recently updated first.
    async fn failed_supplier_orders(&self) -> Result<Vec<SupplierOrder>>;

    /// Allocates the next local supplier order number.
    async fn next_supplier_order_number(&self) -> Result<i64>;
}

/// Everything the procurement services need from persistence.
pub trait ProcurementStore:
    ResellerStore + ProductStore + CustomerOrderStore + SupplierOrderStore
{
}

impl<T> ProcurementStore for T where
    T: ResellerStore + ProductStore + CustomerOrderStore + SupplierOrderStore
{
}
