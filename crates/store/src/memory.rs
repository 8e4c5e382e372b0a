use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{CustomerOrderId, ProductId, ResellerId, SupplierOrderId, Version};
use domain::{
    CustomerOrder, CustomerOrderStatus, FIRST_SUPPLIER_ORDER_NUMBER, Product, Reseller,
    SupplierOrder, SupplierOrderStatus,
};
use tokio::sync::RwLock;

use crate::{
    Result, StoreError,
    store::{
        CustomerOrderStore, Page, PageRequest, ProductStore, ResellerStore, SupplierOrderStore,
    },
};

#[derive(Default)]
struct Tables {
    resellers: HashMap<ResellerId, Reseller>,
    products: HashMap<ProductId, Product>,
    customer_orders: HashMap<CustomerOrderId, CustomerOrder>,
    supplier_orders: HashMap<SupplierOrderId, SupplierOrder>,
    last_customer_order_number: i64,
    last_supplier_order_number: Option<i64>,
}

impl Tables {
    fn check_customer_order_version(&self, order: &CustomerOrder) -> Result<()> {
        let stored = self
            .customer_orders
            .get(&order.id())
            .ok_or_else(|| StoreError::not_found("Customer order", order.id()))?;
        if stored.version() != order.version() {
            return Err(StoreError::conflict(
                "customer order",
                order.id(),
                order.version(),
                stored.version(),
            ));
        }
        Ok(())
    }

    fn write_customer_order(&mut self, order: &CustomerOrder) -> Version {
        let version = order.version().next();
        let mut stored = order.clone();
        stored.set_version(version);
        self.customer_orders.insert(stored.id(), stored);
        version
    }
}

/// In-memory store implementation for testing and local runs.
///
/// Provides the same interface and version checks as the PostgreSQL
/// implementation. Cloning shares the underlying tables.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored supplier orders.
    pub async fn supplier_order_count(&self) -> usize {
        self.tables.read().await.supplier_orders.len()
    }

    /// Clears all tables and counters.
    pub async fn clear(&self) {
        *self.tables.write().await = Tables::default();
    }
}

#[async_trait]
impl ResellerStore for InMemoryStore {
    async fn get_reseller(&self, id: ResellerId) -> Result<Option<Reseller>> {
        Ok(self.tables.read().await.resellers.get(&id).cloned())
    }

    async fn find_reseller_by_document(&self, document: &str) -> Result<Option<Reseller>> {
        let tables = self.tables.read().await;
        Ok(tables
            .resellers
            .values()
            .find(|r| r.document == document)
            .cloned())
    }

    async fn list_resellers(&self, page: PageRequest) -> Result<Page<Reseller>> {
        let tables = self.tables.read().await;
        let mut resellers: Vec<Reseller> = tables.resellers.values().cloned().collect();
        resellers.sort_by_key(|r| std::cmp::Reverse((r.created_at, r.id)));
        Ok(Page::from_sorted(resellers, page))
    }

    async fn create_reseller(&self, reseller: &Reseller) -> Result<Version> {
        let mut tables = self.tables.write().await;
        if tables.resellers.contains_key(&reseller.id) {
            return Err(StoreError::already_exists("Reseller", reseller.id));
        }
        let mut stored = reseller.clone();
        stored.version = Version::first();
        tables.resellers.insert(stored.id, stored);
        Ok(Version::first())
    }

    async fn update_reseller(&self, reseller: &Reseller) -> Result<Version> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .resellers
            .get_mut(&reseller.id)
            .ok_or_else(|| StoreError::not_found("Reseller", reseller.id))?;
        if stored.version != reseller.version {
            return Err(StoreError::conflict(
                "reseller",
                reseller.id,
                reseller.version,
                stored.version,
            ));
        }
        let version = reseller.version.next();
        *stored = reseller.clone();
        stored.version = version;
        Ok(version)
    }
}

#[async_trait]
impl ProductStore for InMemoryStore {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn list_products(&self, page: PageRequest) -> Result<Page<Product>> {
        let tables = self.tables.read().await;
        let mut products: Vec<Product> = tables.products.values().cloned().collect();
        products.sort_by_key(|p| std::cmp::Reverse((p.created_at, p.id)));
        Ok(Page::from_sorted(products, page))
    }

    async fn products_by_brand(&self, brand: &str) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;
        let mut products: Vec<Product> = tables
            .products
            .values()
            .filter(|p| p.active && p.brand == brand)
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    async fn create_product(&self, product: &Product) -> Result<Version> {
        let mut tables = self.tables.write().await;
        if tables.products.contains_key(&product.id) {
            return Err(StoreError::already_exists("Product", product.id));
        }
        let mut stored = product.clone();
        stored.version = Version::first();
        tables.products.insert(stored.id, stored);
        Ok(Version::first())
    }
}

#[async_trait]
impl CustomerOrderStore for InMemoryStore {
    async fn get_customer_order(&self, id: CustomerOrderId) -> Result<Option<CustomerOrder>> {
        Ok(self.tables.read().await.customer_orders.get(&id).cloned())
    }

    async fn list_customer_orders(&self, page: PageRequest) -> Result<Page<CustomerOrder>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<CustomerOrder> = tables.customer_orders.values().cloned().collect();
        orders.sort_by_key(|o| std::cmp::Reverse((o.created_at(), o.order_number())));
        Ok(Page::from_sorted(orders, page))
    }

    async fn list_customer_orders_by_reseller(
        &self,
        reseller_id: ResellerId,
        page: PageRequest,
    ) -> Result<Page<CustomerOrder>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<CustomerOrder> = tables
            .customer_orders
            .values()
            .filter(|o| o.reseller_id() == reseller_id)
            .cloned()
            .collect();
        orders.sort_by_key(|o| std::cmp::Reverse((o.created_at(), o.order_number())));
        Ok(Page::from_sorted(orders, page))
    }

    async fn pending_customer_orders_by_reseller(
        &self,
        reseller_id: ResellerId,
    ) -> Result<Vec<CustomerOrder>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<CustomerOrder> = tables
            .customer_orders
            .values()
            .filter(|o| {
                o.reseller_id() == reseller_id && o.status() == CustomerOrderStatus::Pending
            })
            .cloned()
            .collect();
        orders.sort_by_key(|o| (o.created_at(), o.order_number()));
        Ok(orders)
    }

    async fn create_customer_order(&self, order: &CustomerOrder) -> Result<Version> {
        let mut tables = self.tables.write().await;
        if tables.customer_orders.contains_key(&order.id()) {
            return Err(StoreError::already_exists("Customer order", order.id()));
        }
        let mut stored = order.clone();
        stored.set_version(Version::first());
        tables.customer_orders.insert(stored.id(), stored);
        Ok(Version::first())
    }

    async fn update_customer_order(&self, order: &CustomerOrder) -> Result<Version> {
        let mut tables = self.tables.write().await;
        tables.check_customer_order_version(order)?;
        Ok(tables.write_customer_order(order))
    }

    async fn next_customer_order_number(&self) -> Result<i64> {
        let mut tables = self.tables.write().await;
        tables.last_customer_order_number += 1;
        Ok(tables.last_customer_order_number)
    }
}

#[async_trait]
impl SupplierOrderStore for InMemoryStore {
    async fn get_supplier_order(&self, id: SupplierOrderId) -> Result<Option<SupplierOrder>> {
        Ok(self.tables.read().await.supplier_orders.get(&id).cloned())
    }

    async fn list_supplier_orders(&self, page: PageRequest) -> Result<Page<SupplierOrder>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<SupplierOrder> = tables.supplier_orders.values().cloned().collect();
        orders.sort_by_key(|o| std::cmp::Reverse((o.created_at(), o.order_number())));
        Ok(Page::from_sorted(orders, page))
    }

    async fn list_supplier_orders_by_reseller(
        &self,
        reseller_id: ResellerId,
        page: PageRequest,
    ) -> Result<Page<SupplierOrder>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<SupplierOrder> = tables
            .supplier_orders
            .values()
            .filter(|o| o.reseller_id() == reseller_id)
            .cloned()
            .collect();
        orders.sort_by_key(|o| std::cmp::Reverse((o.created_at(), o.order_number())));
        Ok(Page::from_sorted(orders, page))
    }

    async fn commit_consolidation(
        &self,
        supplier_order: &SupplierOrder,
        customer_orders: &[CustomerOrder],
    ) -> Result<Version> {
        let mut tables = self.tables.write().await;
        if tables.supplier_orders.contains_key(&supplier_order.id()) {
            return Err(StoreError::already_exists(
                "Supplier order",
                supplier_order.id(),
            ));
        }
        for order in customer_orders {
            tables.check_customer_order_version(order)?;
        }

        for order in customer_orders {
            tables.write_customer_order(order);
        }
        let mut stored = supplier_order.clone();
        stored.set_version(Version::first());
        tables.supplier_orders.insert(stored.id(), stored);
        Ok(Version::first())
    }

    async fn update_supplier_order(&self, order: &SupplierOrder) -> Result<Version> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .supplier_orders
            .get_mut(&order.id())
            .ok_or_else(|| StoreError::not_found("Supplier order", order.id()))?;
        if stored.version() != order.version() {
            return Err(StoreError::conflict(
                "supplier order",
                order.id(),
                order.version(),
                stored.version(),
            ));
        }
        let version = order.version().next();
        *stored = order.clone();
        stored.set_version(version);
        Ok(version)
    }

    async fn pending_supplier_orders(&self) -> Result<Vec<SupplierOrder>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<SupplierOrder> = tables
            .supplier_orders
            .values()
            .filter(|o| o.status().is_submittable())
            .cloned()
            .collect();
        orders.sort_by_key(|o| (o.created_at(), o.order_number()));
        Ok(orders)
    }

    async fn failed_supplier_orders(&self) -> Result<Vec<SupplierOrder>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<SupplierOrder> = tables
            .supplier_orders
            .values()
            .filter(|o| o.status() == SupplierOrderStatus::Failed)
            .cloned()
            .collect();
        orders.sort_by_key(|o| std::cmp::Reverse((o.updated_at(), o.order_number())));
        Ok(orders)
    }

    async fn next_supplier_order_number(&self) -> Result<i64> {
        let mut tables = self.tables.write().await;
        let next = tables
            .last_supplier_order_number
            .map_or(FIRST_SUPPLIER_ORDER_NUMBER, |n| n + 1);
        tables.last_supplier_order_number = Some(next);
        Ok(next)
    }
}
