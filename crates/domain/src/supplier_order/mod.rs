//! Consolidated purchase orders sent to the supplier.

mod consolidation;
mod state;

pub use consolidation::{
    Consolidation, ConsolidationRules, DEFAULT_MINIMUM_QUANTITY, PricePolicy, consolidate,
};
pub use state::SupplierOrderStatus;

use chrono::{DateTime, NaiveDate, Utc};
use common::{CustomerOrderId, ResellerId, SupplierOrderId, Version};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::{Money, OrderLine};

/// First local order number handed out for supplier orders.
pub const FIRST_SUPPLIER_ORDER_NUMBER: i64 = 1000;

/// A bulk order merging several customer orders of one reseller.
///
/// Created once per consolidation and mutated by every submission attempt.
/// Lines and totals never change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierOrder {
    id: SupplierOrderId,
    reseller_id: ResellerId,
    order_number: i64,
    #[serde(default)]
    supplier_order_number: Option<i64>,
    customer_order_ids: Vec<CustomerOrderId>,
    lines: Vec<OrderLine>,
    total_amount: Money,
    total_quantity: u32,
    status: SupplierOrderStatus,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    retry_count: u32,
    #[serde(default)]
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    confirmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    estimated_delivery: Option<NaiveDate>,
    #[serde(default)]
    version: Version,
}

impl SupplierOrder {
    /// Builds a pending supplier order from a consolidation result.
    pub fn from_consolidation(
        reseller_id: ResellerId,
        order_number: i64,
        consolidation: Consolidation,
        notes: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: SupplierOrderId::new(),
            reseller_id,
            order_number,
            supplier_order_number: None,
            customer_order_ids: consolidation.customer_order_ids,
            lines: consolidation.lines,
            total_amount: consolidation.total_amount,
            total_quantity: consolidation.total_quantity,
            status: SupplierOrderStatus::Pending,
            notes,
            retry_count: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
            sent_at: None,
            confirmed_at: None,
            estimated_delivery: None,
            version: Version::initial(),
        }
    }

    pub fn id(&self) -> SupplierOrderId {
        self.id
    }

    pub fn reseller_id(&self) -> ResellerId {
        self.reseller_id
    }

    /// Local, monotonic order number.
    pub fn order_number(&self) -> i64 {
        self.order_number
    }

    /// Number assigned by the supplier once it accepted the order.
    pub fn supplier_order_number(&self) -> Option<i64> {
        self.supplier_order_number
    }

    pub fn customer_order_ids(&self) -> &[CustomerOrderId] {
        &self.customer_order_ids
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn total_quantity(&self) -> u32 {
        self.total_quantity
    }

    pub fn status(&self) -> SupplierOrderStatus {
        self.status
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        self.sent_at
    }

    pub fn confirmed_at(&self) -> Option<DateTime<Utc>> {
        self.confirmed_at
    }

    pub fn estimated_delivery(&self) -> Option<NaiveDate> {
        self.estimated_delivery
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Sets the version after a successful write.
    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    /// Records that the supplier accepted the order.
    ///
    /// The reported status must be reachable from the current one. Clears
    /// the retry counter and the last error.
    pub fn record_submission_success(
        &mut self,
        supplier_order_number: i64,
        status: SupplierOrderStatus,
    ) -> Result<(), DomainError> {
        self.status = self.status.transition_to(status)?;
        let now = Utc::now();
        self.supplier_order_number = Some(supplier_order_number);
        self.sent_at = Some(now);
        if status == SupplierOrderStatus::Confirmed {
            self.confirmed_at = Some(now);
        }
        self.retry_count = 0;
        self.last_error = None;
        self.updated_at = now;
        Ok(())
    }

    /// Records a failed submission attempt.
    pub fn record_submission_failure(&mut self, reason: impl Into<String>) {
        self.status = SupplierOrderStatus::Failed;
        self.retry_count = self.retry_count.saturating_add(1);
        self.last_error = Some(reason.into());
        self.updated_at = Utc::now();
    }

    /// Records an acceptance whose status could not be applied.
    ///
    /// The order is failed like any other attempt, but keeps the number the
    /// supplier assigned so a later resubmission can be matched to it.
    pub fn record_unusable_acceptance(
        &mut self,
        supplier_order_number: i64,
        reason: impl Into<String>,
    ) {
        self.record_submission_failure(reason);
        self.supplier_order_number = Some(supplier_order_number);
    }

    /// Applies a status change through the transition table.
    pub fn apply_status(&mut self, next: SupplierOrderStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(next)?;
        let now = Utc::now();
        if next == SupplierOrderStatus::Confirmed {
            self.confirmed_at = Some(now);
        }
        self.updated_at = now;
        Ok(())
    }

    /// Records the delivery estimate reported by the supplier.
    pub fn record_estimated_delivery(&mut self, date: NaiveDate) {
        self.estimated_delivery = Some(date);
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ProductId;

    fn pending_order() -> SupplierOrder {
        let consolidation = Consolidation {
            customer_order_ids: vec![CustomerOrderId::new()],
            lines: vec![OrderLine::new(ProductId::new(), 1000, Money::from_units(3))],
            total_quantity: 1000,
            total_amount: Money::from_units(3000),
        };
        SupplierOrder::from_consolidation(
            ResellerId::new(),
            FIRST_SUPPLIER_ORDER_NUMBER,
            consolidation,
            None,
        )
    }

    #[test]
    fn test_from_consolidation_is_pending() {
        let order = pending_order();
        assert_eq!(order.status(), SupplierOrderStatus::Pending);
        assert_eq!(order.order_number(), 1000);
        assert_eq!(order.retry_count(), 0);
        assert!(order.supplier_order_number().is_none());
        assert!(order.sent_at().is_none());
    }

    #[test]
    fn test_success_after_failures_resets_counters() {
        let mut order = pending_order();
        order.record_submission_failure("supplier unreachable");
        order.record_submission_failure("supplier unreachable");
        assert_eq!(order.status(), SupplierOrderStatus::Failed);
        assert_eq!(order.retry_count(), 2);
        assert_eq!(order.last_error(), Some("supplier unreachable"));

        order
            .record_submission_success(42_000, SupplierOrderStatus::Confirmed)
            .unwrap();
        assert_eq!(order.status(), SupplierOrderStatus::Confirmed);
        assert_eq!(order.supplier_order_number(), Some(42_000));
        assert_eq!(order.retry_count(), 0);
        assert!(order.last_error().is_none());
        assert!(order.sent_at().is_some());
        assert!(order.confirmed_at().is_some());
    }

    #[test]
    fn test_success_with_sent_leaves_confirmed_at_empty() {
        let mut order = pending_order();
        order
            .record_submission_success(1, SupplierOrderStatus::Sent)
            .unwrap();
        assert!(order.sent_at().is_some());
        assert!(order.confirmed_at().is_none());
    }

    #[test]
    fn test_success_with_unreachable_status_is_rejected() {
        let mut order = pending_order();
        let err = order
            .record_submission_success(1, SupplierOrderStatus::Pending)
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
        assert_eq!(order.status(), SupplierOrderStatus::Pending);
        assert!(order.supplier_order_number().is_none());
    }

    #[test]
    fn test_unusable_acceptance_keeps_supplier_number() {
        let mut order = pending_order();
        order.record_unusable_acceptance(48213, "unusable status Pending");

        assert_eq!(order.status(), SupplierOrderStatus::Failed);
        assert_eq!(order.retry_count(), 1);
        assert_eq!(order.supplier_order_number(), Some(48213));
        assert_eq!(order.last_error(), Some("unusable status Pending"));
    }

    #[test]
    fn test_apply_status() {
        let mut order = pending_order();
        order.apply_status(SupplierOrderStatus::Confirmed).unwrap();
        assert!(order.confirmed_at().is_some());
        order.apply_status(SupplierOrderStatus::InTransit).unwrap();
        assert!(order.apply_status(SupplierOrderStatus::Cancelled).is_err());
        order.apply_status(SupplierOrderStatus::Delivered).unwrap();
        assert!(order.status().is_terminal());
    }

    #[test]
    fn test_serde_preserves_state() {
        let mut order = pending_order();
        order.record_submission_failure("boom");
        order.set_version(Version::new(3));

        let json = serde_json::to_string(&order).unwrap();
        let back: SupplierOrder = serde_json::from_str(&json).unwrap();
        assert_eq!(back, order);
    }
}
