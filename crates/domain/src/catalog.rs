//! Resellers and the products they sell.

use chrono::{DateTime, Utc};
use common::{ProductId, ResellerId, Version};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::{MAX_UNIT_PRICE, Money};

/// A reseller registered in the system. Owns customer and supplier orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reseller {
    pub id: ResellerId,
    /// CNPJ, forwarded to the supplier on every order.
    pub document: String,
    pub company_name: String,
    pub trade_name: String,
    pub email: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version: Version,
}

impl Reseller {
    /// Creates an active reseller.
    pub fn new(
        document: impl Into<String>,
        company_name: impl Into<String>,
        trade_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ResellerId::new(),
            document: document.into(),
            company_name: company_name.into(),
            trade_name: trade_name.into(),
            email: email.into(),
            active: true,
            created_at: now,
            updated_at: now,
            version: Version::initial(),
        }
    }

    /// Replaces the registration details.
    pub fn update_details(
        &mut self,
        document: impl Into<String>,
        company_name: impl Into<String>,
        trade_name: impl Into<String>,
        email: impl Into<String>,
    ) {
        self.document = document.into();
        self.company_name = company_name.into();
        self.trade_name = trade_name.into();
        self.email = email.into();
        self.updated_at = Utc::now();
    }

    /// Marks the reseller inactive. Inactive resellers cannot order.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.updated_at = Utc::now();
    }
}

/// A product in the catalog.
///
/// The catalog price is a suggestion for new orders; consolidation always
/// uses the price recorded on each order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub brand: String,
    pub unit_price: Money,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub version: Version,
}

impl Product {
    /// Creates an active product.
    pub fn new(
        name: impl Into<String>,
        brand: impl Into<String>,
        unit_price: Money,
    ) -> Result<Self, DomainError> {
        let id = ProductId::new();
        if !unit_price.is_positive() || unit_price > MAX_UNIT_PRICE {
            return Err(DomainError::InvalidPrice {
                product_id: id,
                price: unit_price,
            });
        }
        Ok(Self {
            id,
            name: name.into(),
            brand: brand.into(),
            unit_price,
            active: true,
            created_at: Utc::now(),
            version: Version::initial(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_reseller_is_active() {
        let mut reseller = Reseller::new(
            "12.345.678/0001-90",
            "Distribuidora Ltda",
            "Dist",
            "contato@dist.com.br",
        );
        assert!(reseller.active);
        assert_eq!(reseller.version, Version::initial());

        reseller.update_details("98.765.432/0001-10", "Nova Ltda", "Nova", "nova@dist.com.br");
        assert_eq!(reseller.trade_name, "Nova");
        assert!(reseller.active);

        reseller.deactivate();
        assert!(!reseller.active);
    }

    #[test]
    fn product_requires_positive_price() {
        assert!(Product::new("Pilsen 600ml", "Brewery", Money::from_cents(899)).is_ok());
        assert!(matches!(
            Product::new("Pilsen 600ml", "Brewery", Money::zero()),
            Err(DomainError::InvalidPrice { .. })
        ));
        assert!(matches!(
            Product::new(
                "Pilsen 600ml",
                "Brewery",
                Money::from_cents(MAX_UNIT_PRICE.cents() + 1)
            ),
            Err(DomainError::InvalidPrice { .. })
        ));
    }
}
