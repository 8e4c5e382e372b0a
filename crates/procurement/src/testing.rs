//! Shared fixtures for unit tests.

use std::sync::Arc;

use common::{CustomerOrderId, ResellerId};
use domain::{CustomerInfo, CustomerOrder, Money, OrderLine, Product, Reseller};
use store::{CustomerOrderStore, InMemoryStore, ProductStore, ResellerStore};

use crate::coordinator::{CoordinatorConfig, SupplierOrderCoordinator};
use crate::supplier::{MockSupplierSimulator, RetryPolicy, ScriptedFaults};

pub(crate) type Simulator = Arc<MockSupplierSimulator<ScriptedFaults>>;

pub(crate) struct Fixture {
    pub store: InMemoryStore,
    pub supplier: Simulator,
    pub coordinator: SupplierOrderCoordinator<InMemoryStore, Simulator>,
    pub reseller: Reseller,
    pub product: Product,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_faults(ScriptedFaults::healthy()).await
    }

    pub async fn with_faults(faults: ScriptedFaults) -> Self {
        let store = InMemoryStore::new();
        let supplier = Arc::new(MockSupplierSimulator::new(faults));
        let config = CoordinatorConfig {
            retry: RetryPolicy::immediate(3),
            ..CoordinatorConfig::default()
        };
        let coordinator = SupplierOrderCoordinator::new(store.clone(), supplier.clone(), config);

        let reseller = Reseller::new("12.345.678/0001-90", "Distribuidora Ltda", "Dist", "a@b.com");
        store.create_reseller(&reseller).await.unwrap();
        let product = Product::new("Pilsen 600ml", "Brewery", Money::from_cents(500)).unwrap();
        store.create_product(&product).await.unwrap();

        Self {
            store,
            supplier,
            coordinator,
            reseller,
            product,
        }
    }

    pub fn reseller_id(&self) -> ResellerId {
        self.reseller.id
    }

    /// Persists a Pending customer order with one line of the fixture product.
    pub async fn customer_order(&self, quantity: u32) -> CustomerOrderId {
        let number = self.store.next_customer_order_number().await.unwrap();
        let order = CustomerOrder::place(
            self.reseller.id,
            number,
            CustomerInfo {
                document: "123.456.789-00".to_string(),
                name: "Bar do Zé".to_string(),
                ..CustomerInfo::default()
            },
            vec![OrderLine::new(self.product.id, quantity, self.product.unit_price)],
            None,
        )
        .unwrap();
        self.store.create_customer_order(&order).await.unwrap();
        order.id()
    }
}
