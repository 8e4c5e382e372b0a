//! Customer order placement and lifecycle.

use common::{CustomerOrderId, ResellerId};
use domain::{CustomerInfo, CustomerOrder, CustomerOrderStatus, OrderLine};
use serde::Deserialize;
use store::{Page, PageRequest, ProcurementStore};
use tracing::info;

use crate::error::{ProcurementError, Result};

/// Request to place a customer order.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceCustomerOrder {
    pub reseller_id: ResellerId,
    pub customer: CustomerInfo,
    pub lines: Vec<OrderLine>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Places and manages customer orders.
pub struct CustomerOrderService<S> {
    store: S,
}

impl<S: ProcurementStore> CustomerOrderService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Places a new Pending order.
    ///
    /// The reseller and every product must exist and be active.
    #[tracing::instrument(skip(self, request), fields(reseller_id = %request.reseller_id))]
    pub async fn place(&self, request: PlaceCustomerOrder) -> Result<CustomerOrder> {
        match self.store.get_reseller(request.reseller_id).await? {
            Some(reseller) if reseller.active => {}
            _ => return Err(ProcurementError::ResellerUnavailable(request.reseller_id)),
        }

        for line in &request.lines {
            line.validate()?;
            match self.store.get_product(line.product_id).await? {
                Some(product) if product.active => {}
                _ => return Err(ProcurementError::ProductUnavailable(line.product_id)),
            }
        }

        let order_number = self.store.next_customer_order_number().await?;
        let mut order = CustomerOrder::place(
            request.reseller_id,
            order_number,
            request.customer,
            request.lines,
            request.notes,
        )?;
        let version = self.store.create_customer_order(&order).await?;
        order.set_version(version);

        metrics::counter!("customer_orders_placed_total").increment(1);
        info!(order_id = %order.id(), order_number, "customer order placed");
        Ok(order)
    }

    pub async fn get(&self, id: CustomerOrderId) -> Result<Option<CustomerOrder>> {
        Ok(self.store.get_customer_order(id).await?)
    }

    /// Lists every order, newest first.
    pub async fn list(&self, page: PageRequest) -> Result<Page<CustomerOrder>> {
        Ok(self.store.list_customer_orders(page).await?)
    }

    /// Lists a reseller's orders, newest first.
    pub async fn list_by_reseller(
        &self,
        reseller_id: ResellerId,
        page: PageRequest,
    ) -> Result<Page<CustomerOrder>> {
        Ok(self
            .store
            .list_customer_orders_by_reseller(reseller_id, page)
            .await?)
    }

    /// Orders that can still be consolidated, oldest first.
    pub async fn pending_by_reseller(&self, reseller_id: ResellerId) -> Result<Vec<CustomerOrder>> {
        Ok(self
            .store
            .pending_customer_orders_by_reseller(reseller_id)
            .await?)
    }

    /// Applies a manual status change. Returns false when the order does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: CustomerOrderId,
        status: CustomerOrderStatus,
    ) -> Result<bool> {
        let Some(mut order) = self.store.get_customer_order(id).await? else {
            return Ok(false);
        };
        order.update_status(status)?;
        self.store.update_customer_order(&order).await?;
        Ok(true)
    }

    /// Cancels an order. Returns false when the order does not exist.
    pub async fn cancel(&self, id: CustomerOrderId) -> Result<bool> {
        self.update_status(id, CustomerOrderStatus::Cancelled).await
    }
}
