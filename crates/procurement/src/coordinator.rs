//! Supplier order coordinator.
//!
//! Drives consolidation, submission, retries, and status changes of
//! supplier orders.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::{CustomerOrderId, ResellerId, SupplierOrderId};
use domain::{ConsolidationRules, CustomerOrder, SupplierOrder, SupplierOrderStatus, consolidate};
use futures_util::StreamExt;
use serde::Serialize;
use store::{Page, PageRequest, ProcurementStore};
use tracing::{error, info, warn};

use crate::error::{ProcurementError, Result};
use crate::submission::{SubmissionOutcome, SubmissionPipeline};
use crate::supplier::{RetryPolicy, SupplierApi, SupplierError};

/// Coordinator settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub rules: ConsolidationRules,
    pub retry: RetryPolicy,
    /// Orders submitted at the same time by a batch run.
    pub batch_concurrency: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            rules: ConsolidationRules::default(),
            retry: RetryPolicy::default(),
            batch_concurrency: 1,
        }
    }
}

/// Counters from one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// Orders the run tried to submit.
    pub attempted: usize,
    pub accepted: usize,
    /// Clean supplier failures.
    pub failed: usize,
    /// Unexpected errors.
    pub errored: usize,
    /// Orders another writer moved out of Pending/Failed first.
    pub skipped: usize,
}

#[derive(Default)]
struct BatchCounters {
    attempted: AtomicUsize,
    accepted: AtomicUsize,
    failed: AtomicUsize,
    errored: AtomicUsize,
    skipped: AtomicUsize,
}

impl BatchCounters {
    fn report(&self) -> BatchReport {
        BatchReport {
            attempted: self.attempted.load(Ordering::SeqCst),
            accepted: self.accepted.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            errored: self.errored.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
        }
    }
}

/// Entry point for every supplier order operation.
pub struct SupplierOrderCoordinator<S, C> {
    store: S,
    pipeline: SubmissionPipeline<S, C>,
    config: CoordinatorConfig,
}

impl<S, C> SupplierOrderCoordinator<S, C>
where
    S: ProcurementStore + Clone,
    C: SupplierApi,
{
    pub fn new(store: S, supplier: C, config: CoordinatorConfig) -> Self {
        let pipeline = SubmissionPipeline::new(store.clone(), supplier, config.retry);
        Self {
            store,
            pipeline,
            config,
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &SubmissionPipeline<S, C> {
        &self.pipeline
    }

    /// Consolidates customer orders into a new supplier order and submits it.
    ///
    /// Validation and business-rule failures leave every order untouched.
    /// Once the supplier order is committed its id is returned even if the
    /// supplier call failed cleanly; the order is then Failed and waits for
    /// a retry.
    #[tracing::instrument(
        skip(self, customer_order_ids, notes),
        fields(orders = customer_order_ids.len())
    )]
    pub async fn create_and_send(
        &self,
        reseller_id: ResellerId,
        customer_order_ids: &[CustomerOrderId],
        notes: Option<String>,
    ) -> Result<SupplierOrderId> {
        match self.store.get_reseller(reseller_id).await? {
            Some(reseller) if reseller.active => {}
            _ => return Err(ProcurementError::ResellerUnavailable(reseller_id)),
        }

        let mut seen = HashSet::new();
        let ids: Vec<CustomerOrderId> = customer_order_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();
        if ids.is_empty() {
            return Err(ProcurementError::NoCustomerOrders);
        }

        let mut orders: Vec<CustomerOrder> = Vec::with_capacity(ids.len());
        for id in ids {
            let order = self
                .store
                .get_customer_order(id)
                .await?
                .ok_or(ProcurementError::CustomerOrderNotFound(id))?;
            if order.reseller_id() != reseller_id {
                return Err(ProcurementError::CustomerOrderResellerMismatch {
                    order_id: id,
                    reseller_id,
                });
            }
            orders.push(order);
        }

        let consolidation = consolidate(&orders, &self.config.rules)?;
        let order_number = self.store.next_supplier_order_number().await?;
        let mut supplier_order =
            SupplierOrder::from_consolidation(reseller_id, order_number, consolidation, notes);
        for order in &mut orders {
            order.mark_consolidated()?;
        }

        let version = self
            .store
            .commit_consolidation(&supplier_order, &orders)
            .await?;
        supplier_order.set_version(version);
        let order_id = supplier_order.id();

        metrics::counter!("supplier_orders_created_total").increment(1);
        info!(
            %order_id,
            order_number,
            total_quantity = supplier_order.total_quantity(),
            "supplier order created"
        );

        match self.pipeline.submit(order_id).await {
            Ok(outcome) => {
                info!(%order_id, accepted = outcome.is_accepted(), "initial submission finished");
                Ok(order_id)
            }
            Err(err) => {
                error!(%order_id, error = %err, "initial submission errored");
                Err(err)
            }
        }
    }

    /// Resubmits one order.
    ///
    /// Returns false when the order does not exist, is Cancelled, or the
    /// attempt failed. Other orders that are no longer Pending or Failed
    /// were already accepted and return true without contacting the
    /// supplier.
    #[tracing::instrument(skip(self), fields(order_id = %order_id))]
    pub async fn retry(&self, order_id: SupplierOrderId) -> bool {
        let order = match self.store.get_supplier_order(order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => return false,
            Err(err) => {
                error!(error = %err, "could not load supplier order");
                return false;
            }
        };
        if !order.status().is_submittable() {
            return order.status() != SupplierOrderStatus::Cancelled;
        }

        match self.pipeline.submit(order_id).await {
            Ok(outcome) => outcome.is_accepted(),
            Err(ProcurementError::NotSubmittable { status, .. }) => {
                status != SupplierOrderStatus::Cancelled
            }
            Err(err) => {
                error!(error = %err, "retry errored");
                false
            }
        }
    }

    /// Resubmits every Pending or Failed order, oldest first.
    ///
    /// A failure on one order never stops the others.
    #[tracing::instrument(skip(self))]
    pub async fn process_all_pending(&self) -> BatchReport {
        metrics::counter!("batch_runs_total").increment(1);

        let pending = match self.store.pending_supplier_orders().await {
            Ok(pending) => pending,
            Err(err) => {
                error!(error = %err, "could not load pending supplier orders");
                return BatchReport::default();
            }
        };

        let counters = BatchCounters::default();
        let tally = &counters;
        futures_util::stream::iter(pending)
            .for_each_concurrent(self.config.batch_concurrency.max(1), move |order| async move {
                tally.attempted.fetch_add(1, Ordering::SeqCst);
                match self.pipeline.submit(order.id()).await {
                    Ok(SubmissionOutcome::Accepted { .. }) => {
                        tally.accepted.fetch_add(1, Ordering::SeqCst);
                    }
                    Ok(SubmissionOutcome::Failed { .. }) => {
                        tally.failed.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(ProcurementError::NotSubmittable { .. }) => {
                        tally.skipped.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(err) => {
                        tally.errored.fetch_add(1, Ordering::SeqCst);
                        error!(order_id = %order.id(), error = %err, "batch submission errored");
                    }
                }
            })
            .await;

        let report = counters.report();
        info!(?report, "batch run finished");
        report
    }

    /// Moves an order to `status` through the transition table.
    ///
    /// Returns false when the order does not exist.
    #[tracing::instrument(skip(self), fields(order_id = %order_id))]
    pub async fn update_status(
        &self,
        order_id: SupplierOrderId,
        status: SupplierOrderStatus,
    ) -> Result<bool> {
        let _guard = self.pipeline.locks().lock(order_id).await;

        let Some(mut order) = self.store.get_supplier_order(order_id).await? else {
            return Ok(false);
        };
        order.apply_status(status)?;
        self.store.update_supplier_order(&order).await?;

        info!(%status, "supplier order status updated");
        Ok(true)
    }

    /// Polls the supplier for the order's status and records it.
    ///
    /// A reported status that is not a valid next step is ignored; the
    /// delivery estimate is recorded either way.
    #[tracing::instrument(skip(self), fields(order_id = %order_id))]
    pub async fn refresh_status(&self, order_id: SupplierOrderId) -> Result<SupplierOrder> {
        let _guard = self.pipeline.locks().lock(order_id).await;

        let mut order = self
            .store
            .get_supplier_order(order_id)
            .await?
            .ok_or(ProcurementError::SupplierOrderNotFound(order_id))?;
        let number = order
            .supplier_order_number()
            .ok_or(ProcurementError::NotYetAccepted(order_id))?;

        let supplier = self.pipeline.supplier();
        let response = self
            .pipeline
            .policy()
            .run("status", || supplier.get_status(number))
            .await?;
        if !response.success {
            return Err(SupplierError::Declined(
                response
                    .message
                    .unwrap_or_else(|| "status unavailable".to_string()),
            )
            .into());
        }

        let reported: SupplierOrderStatus = match response.status {
            Some(raw) => raw
                .parse()
                .map_err(|_| SupplierError::UnrecognizedStatus(raw))?,
            None => order.status(),
        };
        if reported != order.status() {
            if order.status().can_transition_to(reported) {
                order.apply_status(reported)?;
            } else {
                warn!(current = %order.status(), %reported, "ignoring reported status");
            }
        }
        if let Some(date) = response.estimated_delivery_date {
            order.record_estimated_delivery(date);
        }

        let version = self.store.update_supplier_order(&order).await?;
        order.set_version(version);
        Ok(order)
    }

    pub async fn get(&self, order_id: SupplierOrderId) -> Result<Option<SupplierOrder>> {
        Ok(self.store.get_supplier_order(order_id).await?)
    }

    pub async fn list(&self, page: PageRequest) -> Result<Page<SupplierOrder>> {
        Ok(self.store.list_supplier_orders(page).await?)
    }

    pub async fn list_by_reseller(
        &self,
        reseller_id: ResellerId,
        page: PageRequest,
    ) -> Result<Page<SupplierOrder>> {
        Ok(self
            .store
            .list_supplier_orders_by_reseller(reseller_id, page)
            .await?)
    }

    /// Orders waiting for submission (Pending or Failed), oldest first.
    pub async fn list_pending(&self) -> Result<Vec<SupplierOrder>> {
        Ok(self.store.pending_supplier_orders().await?)
    }

    /// Failed orders, most recently updated first.
    pub async fn list_failed(&self) -> Result<Vec<SupplierOrder>> {
        Ok(self.store.failed_supplier_orders().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supplier::{ScriptedFaults, SimulatedFault};
    use crate::testing::Fixture;
    use domain::{CustomerOrderStatus, DomainError};
    use store::{CustomerOrderStore, SupplierOrderStore};

    #[tokio::test]
    async fn test_create_and_send_consolidates_and_submits() {
        let fixture = Fixture::new().await;
        let a = fixture.customer_order(600).await;
        let b = fixture.customer_order(500).await;

        let order_id = fixture
            .coordinator
            .create_and_send(fixture.reseller_id(), &[a, b], None)
            .await
            .unwrap();

        let order = fixture.coordinator.get(order_id).await.unwrap().unwrap();
        assert_eq!(order.total_quantity(), 1100);
        assert_eq!(order.lines().len(), 1);
        assert_eq!(order.status(), SupplierOrderStatus::Confirmed);
        assert_eq!(order.order_number(), 1000);

        for id in [a, b] {
            let customer_order = fixture.store.get_customer_order(id).await.unwrap().unwrap();
            assert_eq!(customer_order.status(), CustomerOrderStatus::Consolidated);
        }
    }

    #[tokio::test]
    async fn test_minimum_not_met_changes_nothing() {
        let fixture = Fixture::new().await;
        let a = fixture.customer_order(400).await;

        let result = fixture
            .coordinator
            .create_and_send(fixture.reseller_id(), &[a], None)
            .await;
        assert!(matches!(
            result,
            Err(ProcurementError::Domain(DomainError::MinimumQuantityNotMet {
                minimum: 1000,
                actual: 400
            }))
        ));

        let order = fixture.store.get_customer_order(a).await.unwrap().unwrap();
        assert_eq!(order.status(), CustomerOrderStatus::Pending);
        assert!(fixture.coordinator.list_pending().await.unwrap().is_empty());
        assert_eq!(fixture.supplier.submit_calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_and_foreign_orders_are_rejected() {
        let fixture = Fixture::new().await;
        let missing = CustomerOrderId::new();
        let result = fixture
            .coordinator
            .create_and_send(fixture.reseller_id(), &[missing], None)
            .await;
        assert!(matches!(result, Err(ProcurementError::CustomerOrderNotFound(id)) if id == missing));

        let a = fixture.customer_order(1500).await;
        let other = ResellerId::new();
        let result = fixture.coordinator.create_and_send(other, &[a], None).await;
        assert!(matches!(result, Err(ProcurementError::ResellerUnavailable(_))));

        let result = fixture
            .coordinator
            .create_and_send(fixture.reseller_id(), &[], None)
            .await;
        assert!(matches!(result, Err(ProcurementError::NoCustomerOrders)));
    }

    #[tokio::test]
    async fn test_failed_submission_still_returns_id() {
        let fixture = Fixture::with_faults(ScriptedFaults::healthy()).await;
        fixture.supplier.faults().fail_submits([SimulatedFault::Declined]);
        let a = fixture.customer_order(1000).await;

        let order_id = fixture
            .coordinator
            .create_and_send(fixture.reseller_id(), &[a], None)
            .await
            .unwrap();

        let failed = fixture.coordinator.list_failed().await.unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].id(), order_id);

        assert!(fixture.coordinator.retry(order_id).await);
        let order = fixture.coordinator.get(order_id).await.unwrap().unwrap();
        assert_eq!(order.status(), SupplierOrderStatus::Confirmed);
        assert_eq!(order.retry_count(), 0);
        assert!(order.last_error().is_none());
    }

    #[tokio::test]
    async fn test_retry_of_accepted_order_skips_supplier() {
        let fixture = Fixture::new().await;
        let a = fixture.customer_order(1000).await;
        let order_id = fixture
            .coordinator
            .create_and_send(fixture.reseller_id(), &[a], None)
            .await
            .unwrap();

        assert!(fixture.coordinator.retry(order_id).await);
        assert_eq!(fixture.supplier.submit_calls(), 1);
        assert!(!fixture.coordinator.retry(SupplierOrderId::new()).await);
    }

    #[tokio::test]
    async fn test_retry_of_cancelled_order_reports_failure() {
        let fixture = Fixture::new().await;
        fixture.supplier.faults().fail_submits([SimulatedFault::Declined]);
        let a = fixture.customer_order(1000).await;
        let order_id = fixture
            .coordinator
            .create_and_send(fixture.reseller_id(), &[a], None)
            .await
            .unwrap();
        fixture
            .coordinator
            .update_status(order_id, SupplierOrderStatus::Cancelled)
            .await
            .unwrap();

        assert!(!fixture.coordinator.retry(order_id).await);
        assert_eq!(fixture.supplier.submit_calls(), 1);
    }

    #[tokio::test]
    async fn test_batch_isolates_failures() {
        let fixture = Fixture::new().await;
        fixture.supplier.faults().fail_submits([
            SimulatedFault::Declined,
            SimulatedFault::Declined,
            SimulatedFault::Declined,
        ]);
        let mut ids = Vec::new();
        for _ in 0..3 {
            let a = fixture.customer_order(1000).await;
            ids.push(
                fixture
                    .coordinator
                    .create_and_send(fixture.reseller_id(), &[a], None)
                    .await
                    .unwrap(),
            );
        }
        assert_eq!(fixture.coordinator.list_pending().await.unwrap().len(), 3);

        fixture.supplier.faults().fail_submits([SimulatedFault::Malformed]);
        let report = fixture.coordinator.process_all_pending().await;
        assert_eq!(
            report,
            BatchReport {
                attempted: 3,
                accepted: 2,
                failed: 0,
                errored: 1,
                skipped: 0,
            }
        );

        let first = fixture.coordinator.get(ids[0]).await.unwrap().unwrap();
        assert_eq!(first.status(), SupplierOrderStatus::Failed);
        assert_eq!(first.retry_count(), 2);
        assert_eq!(fixture.coordinator.list_pending().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_status_follows_transition_table() {
        let fixture = Fixture::new().await;
        let a = fixture.customer_order(1000).await;
        let order_id = fixture
            .coordinator
            .create_and_send(fixture.reseller_id(), &[a], None)
            .await
            .unwrap();

        assert!(
            fixture
                .coordinator
                .update_status(order_id, SupplierOrderStatus::InTransit)
                .await
                .unwrap()
        );
        let result = fixture
            .coordinator
            .update_status(order_id, SupplierOrderStatus::Pending)
            .await;
        assert!(matches!(
            result,
            Err(ProcurementError::Domain(DomainError::InvalidTransition { .. }))
        ));
        assert!(
            !fixture
                .coordinator
                .update_status(SupplierOrderId::new(), SupplierOrderStatus::Delivered)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_refresh_status_records_supplier_report() {
        let fixture = Fixture::new().await;
        let a = fixture.customer_order(1000).await;
        let order_id = fixture
            .coordinator
            .create_and_send(fixture.reseller_id(), &[a], None)
            .await
            .unwrap();

        let order = fixture.coordinator.refresh_status(order_id).await.unwrap();
        assert_eq!(order.status(), SupplierOrderStatus::InTransit);
        assert!(order.estimated_delivery().is_some());
        assert_eq!(fixture.supplier.status_calls(), 1);

        let stored = fixture.store.get_supplier_order(order_id).await.unwrap().unwrap();
        assert_eq!(stored.version(), order.version());
    }

    #[tokio::test]
    async fn test_refresh_status_requires_supplier_number() {
        let fixture = Fixture::new().await;
        fixture.supplier.faults().fail_submits([SimulatedFault::Declined]);
        let a = fixture.customer_order(1000).await;
        let order_id = fixture
            .coordinator
            .create_and_send(fixture.reseller_id(), &[a], None)
            .await
            .unwrap();

        let result = fixture.coordinator.refresh_status(order_id).await;
        assert!(matches!(result, Err(ProcurementError::NotYetAccepted(_))));
        assert_eq!(fixture.supplier.status_calls(), 0);
    }
}
