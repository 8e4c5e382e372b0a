//! Reseller and product registration.

use common::{ProductId, ResellerId};
use domain::{Money, Product, Reseller};
use serde::Deserialize;
use store::{Page, PageRequest, ProcurementStore};
use tracing::info;

use crate::error::{ProcurementError, Result};

/// Registration details of a reseller; also the body of a full update.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterReseller {
    pub document: String,
    pub company_name: String,
    pub trade_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterProduct {
    pub name: String,
    pub brand: String,
    pub unit_price: Money,
}

/// Thin service over reseller and product persistence.
pub struct CatalogService<S> {
    store: S,
}

impl<S: ProcurementStore> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Registers a reseller. Documents are unique across resellers.
    pub async fn register_reseller(&self, request: RegisterReseller) -> Result<Reseller> {
        self.ensure_document_free(&request.document, None).await?;
        let mut reseller = Reseller::new(
            request.document,
            request.company_name,
            request.trade_name,
            request.email,
        );
        reseller.version = self.store.create_reseller(&reseller).await?;
        info!(reseller_id = %reseller.id, "reseller registered");
        Ok(reseller)
    }

    pub async fn get_reseller(&self, id: ResellerId) -> Result<Option<Reseller>> {
        Ok(self.store.get_reseller(id).await?)
    }

    pub async fn find_reseller_by_document(&self, document: &str) -> Result<Option<Reseller>> {
        Ok(self.store.find_reseller_by_document(document).await?)
    }

    pub async fn list_resellers(&self, page: PageRequest) -> Result<Page<Reseller>> {
        Ok(self.store.list_resellers(page).await?)
    }

    /// Replaces a reseller's registration details.
    ///
    /// Returns false when the reseller does not exist.
    pub async fn update_reseller(&self, id: ResellerId, request: RegisterReseller) -> Result<bool> {
        let Some(mut reseller) = self.store.get_reseller(id).await? else {
            return Ok(false);
        };
        self.ensure_document_free(&request.document, Some(id)).await?;
        reseller.update_details(
            request.document,
            request.company_name,
            request.trade_name,
            request.email,
        );
        self.store.update_reseller(&reseller).await?;
        info!(reseller_id = %id, "reseller updated");
        Ok(true)
    }

    /// Marks a reseller inactive. It can no longer place or consolidate
    /// orders; existing orders are kept.
    ///
    /// Returns false when the reseller does not exist.
    pub async fn deactivate_reseller(&self, id: ResellerId) -> Result<bool> {
        let Some(mut reseller) = self.store.get_reseller(id).await? else {
            return Ok(false);
        };
        if reseller.active {
            reseller.deactivate();
            self.store.update_reseller(&reseller).await?;
            info!(reseller_id = %id, "reseller deactivated");
        }
        Ok(true)
    }

    pub async fn register_product(&self, request: RegisterProduct) -> Result<Product> {
        let mut product = Product::new(request.name, request.brand, request.unit_price)?;
        product.version = self.store.create_product(&product).await?;
        Ok(product)
    }

    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.store.get_product(id).await?)
    }

    pub async fn list_products(&self, page: PageRequest) -> Result<Page<Product>> {
        Ok(self.store.list_products(page).await?)
    }

    /// Active products of one brand.
    pub async fn products_by_brand(&self, brand: &str) -> Result<Vec<Product>> {
        Ok(self.store.products_by_brand(brand).await?)
    }

    async fn ensure_document_free(&self, document: &str, owner: Option<ResellerId>) -> Result<()> {
        match self.store.find_reseller_by_document(document).await? {
            Some(existing) if Some(existing.id) != owner => {
                Err(ProcurementError::DuplicateDocument(document.to_string()))
            }
            _ => Ok(()),
        }
    }
}
