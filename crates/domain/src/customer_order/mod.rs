//! Customer orders placed against a reseller.

mod state;

pub use state::CustomerOrderStatus;

use chrono::{DateTime, Utc};
use common::{CustomerOrderId, ResellerId, Version};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::{self, Money, OrderLine};

/// Identification of the end customer who placed an order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CustomerInfo {
    /// CPF or CNPJ of the customer.
    pub document: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// An order placed by a customer of a reseller.
///
/// Totals are always derived from the lines. Orders are never deleted;
/// cancellation is a status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerOrder {
    id: CustomerOrderId,
    reseller_id: ResellerId,
    order_number: i64,
    customer: CustomerInfo,
    lines: Vec<OrderLine>,
    status: CustomerOrderStatus,
    #[serde(default)]
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    version: Version,
}

impl CustomerOrder {
    /// Creates a new pending order after validating every line.
    pub fn place(
        reseller_id: ResellerId,
        order_number: i64,
        customer: CustomerInfo,
        lines: Vec<OrderLine>,
        notes: Option<String>,
    ) -> Result<Self, DomainError> {
        if lines.is_empty() {
            return Err(DomainError::NoLines);
        }
        for line in &lines {
            line.validate()?;
        }
        value_objects::total_quantity(&lines)?;
        value_objects::total_amount(&lines)?;

        let now = Utc::now();
        Ok(Self {
            id: CustomerOrderId::new(),
            reseller_id,
            order_number,
            customer,
            lines,
            status: CustomerOrderStatus::Pending,
            notes,
            created_at: now,
            updated_at: now,
            version: Version::initial(),
        })
    }

    pub fn id(&self) -> CustomerOrderId {
        self.id
    }

    pub fn reseller_id(&self) -> ResellerId {
        self.reseller_id
    }

    pub fn order_number(&self) -> i64 {
        self.order_number
    }

    pub fn customer(&self) -> &CustomerInfo {
        &self.customer
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn status(&self) -> CustomerOrderStatus {
        self.status
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Sets the version after a successful write.
    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    /// Returns the sum of all line quantities.
    ///
    /// Overflowing totals are rejected by `place`.
    pub fn total_quantity(&self) -> u32 {
        value_objects::total_quantity(&self.lines).unwrap_or(u32::MAX)
    }

    /// Returns the sum of all line totals.
    pub fn total_amount(&self) -> Money {
        value_objects::total_amount(&self.lines).unwrap_or(Money::from_cents(i64::MAX))
    }

    /// Applies a manual status change.
    ///
    /// `Consolidated` is only reachable through [`CustomerOrder::mark_consolidated`].
    pub fn update_status(&mut self, next: CustomerOrderStatus) -> Result<(), DomainError> {
        if next == CustomerOrderStatus::Consolidated {
            return Err(DomainError::InvalidTransition {
                entity: "customer order",
                from: self.status.as_str(),
                to: next.as_str(),
            });
        }
        self.status = self.status.transition_to(next)?;
        self.touch();
        Ok(())
    }

    /// Cancels the order.
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        self.update_status(CustomerOrderStatus::Cancelled)
    }

    /// Checks that the order can be merged into a supplier order.
    pub fn ensure_consolidatable(&self) -> Result<(), DomainError> {
        if self.status.can_consolidate() {
            Ok(())
        } else {
            Err(DomainError::NotConsolidatable {
                order_id: self.id,
                status: self.status,
            })
        }
    }

    /// Marks the order as merged into a supplier order.
    pub fn mark_consolidated(&mut self) -> Result<(), DomainError> {
        self.ensure_consolidatable()?;
        self.status = CustomerOrderStatus::Consolidated;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
