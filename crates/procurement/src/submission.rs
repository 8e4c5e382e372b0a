//! Supplier submission pipeline.
//!
//! Sends one persisted supplier order to the supplier and records the
//! outcome on the order.

use std::time::Instant;

use common::SupplierOrderId;
use domain::{SupplierOrder, SupplierOrderStatus};
use serde::Serialize;
use store::ProcurementStore;
use tracing::{error, info, warn};

use crate::error::{ProcurementError, Result};
use crate::locks::OrderLocks;
use crate::supplier::{
    Acceptance, RetryPolicy, SubmitOrderRequest, SubmitOrderResponse, SupplierApi, SupplierError,
};

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    /// The supplier accepted the order.
    Accepted {
        status: SupplierOrderStatus,
        supplier_order_number: i64,
    },
    /// The attempt failed; the order is now Failed.
    Failed { reason: String, retry_count: u32 },
}

impl SubmissionOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmissionOutcome::Accepted { .. })
    }
}

/// Submits supplier orders and persists what happened.
pub struct SubmissionPipeline<S, C> {
    store: S,
    supplier: C,
    policy: RetryPolicy,
    locks: OrderLocks,
}

impl<S, C> SubmissionPipeline<S, C>
where
    S: ProcurementStore,
    C: SupplierApi,
{
    pub fn new(store: S, supplier: C, policy: RetryPolicy) -> Self {
        Self {
            store,
            supplier,
            policy,
            locks: OrderLocks::new(),
        }
    }

    pub fn supplier(&self) -> &C {
        &self.supplier
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Locks shared with every other writer of supplier orders.
    pub fn locks(&self) -> &OrderLocks {
        &self.locks
    }

    /// Submits the order with the given id.
    ///
    /// Only Pending and Failed orders are submitted; anything else is
    /// refused with [`ProcurementError::NotSubmittable`] before any network
    /// call. A clean supplier failure is reported as
    /// [`SubmissionOutcome::Failed`]. Unexpected supplier errors are recorded
    /// on the order and then returned.
    #[tracing::instrument(skip(self), fields(order_id = %order_id))]
    pub async fn submit(&self, order_id: SupplierOrderId) -> Result<SubmissionOutcome> {
        let _guard = self.locks.lock(order_id).await;

        let mut order = self
            .store
            .get_supplier_order(order_id)
            .await?
            .ok_or(ProcurementError::SupplierOrderNotFound(order_id))?;

        if !order.status().is_submittable() {
            return Err(ProcurementError::NotSubmittable {
                order_id,
                status: order.status(),
            });
        }

        let reseller = self
            .store
            .get_reseller(order.reseller_id())
            .await?
            .ok_or(ProcurementError::ResellerUnavailable(order.reseller_id()))?;
        let request = SubmitOrderRequest::new(&order, &reseller);

        let started = Instant::now();
        let result = self
            .policy
            .run("submit", || self.supplier.submit(&request))
            .await
            .and_then(SubmitOrderResponse::into_acceptance)
            .and_then(|acceptance| Self::check_reachable(&order, acceptance));
        metrics::histogram!("supplier_submission_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(acceptance) => self.record_success(&mut order, acceptance).await,
            Err(err) => self.record_failure(&mut order, err).await,
        }
    }

    fn check_reachable(
        order: &SupplierOrder,
        acceptance: Acceptance,
    ) -> std::result::Result<Acceptance, SupplierError> {
        if order.status().can_transition_to(acceptance.status) {
            Ok(acceptance)
        } else {
            Err(SupplierError::UnreachableStatus {
                supplier_order_number: acceptance.supplier_order_number,
                status: acceptance.status,
            })
        }
    }

    async fn record_success(
        &self,
        order: &mut SupplierOrder,
        acceptance: Acceptance,
    ) -> Result<SubmissionOutcome> {
        order.record_submission_success(acceptance.supplier_order_number, acceptance.status)?;
        let version = self.store.update_supplier_order(order).await?;
        order.set_version(version);

        metrics::counter!("supplier_submissions_total", "outcome" => "accepted").increment(1);
        info!(
            supplier_order_number = acceptance.supplier_order_number,
            status = %acceptance.status,
            "supplier accepted order"
        );

        Ok(SubmissionOutcome::Accepted {
            status: acceptance.status,
            supplier_order_number: acceptance.supplier_order_number,
        })
    }

    async fn record_failure(
        &self,
        order: &mut SupplierOrder,
        err: SupplierError,
    ) -> Result<SubmissionOutcome> {
        let reason = if err.is_retryable() {
            format!(
                "supplier unreachable after {} attempts: {err}",
                self.policy.max_attempts
            )
        } else {
            err.to_string()
        };

        match &err {
            &SupplierError::UnreachableStatus {
                supplier_order_number,
                status,
            } => {
                error!(
                    supplier_order_number,
                    %status,
                    "supplier accepted order with unreachable status; resubmission may duplicate it"
                );
                order.record_unusable_acceptance(supplier_order_number, reason.clone());
            }
            _ => order.record_submission_failure(reason.clone()),
        }
        let version = self.store.update_supplier_order(order).await?;
        order.set_version(version);

        if err.is_unexpected() {
            metrics::counter!("supplier_submissions_total", "outcome" => "error").increment(1);
            error!(error = %err, retry_count = order.retry_count(), "unexpected supplier error");
            return Err(err.into());
        }

        metrics::counter!("supplier_submissions_total", "outcome" => "failed").increment(1);
        warn!(
            reason = %reason,
            retry_count = order.retry_count(),
            "supplier submission failed"
        );

        Ok(SubmissionOutcome::Failed {
            reason,
            retry_count: order.retry_count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supplier::{ScriptedFaults, SimulatedFault};
    use crate::testing::Fixture;
    use domain::{ConsolidationRules, consolidate};
    use store::{CustomerOrderStore, SupplierOrderStore};

    async fn persisted_order(fixture: &Fixture) -> SupplierOrderId {
        let id = fixture.customer_order(1200).await;
        let customer_order = fixture.store.get_customer_order(id).await.unwrap().unwrap();
        let consolidation =
            consolidate(&[customer_order], &ConsolidationRules::default()).unwrap();
        let order = SupplierOrder::from_consolidation(fixture.reseller_id(), 1000, consolidation, None);
        fixture.store.commit_consolidation(&order, &[]).await.unwrap();
        order.id()
    }

    #[tokio::test]
    async fn test_accepted_submission_is_recorded() {
        let fixture = Fixture::new().await;
        let order_id = persisted_order(&fixture).await;

        let outcome = fixture.coordinator.pipeline().submit(order_id).await.unwrap();
        assert!(outcome.is_accepted());

        let order = fixture.store.get_supplier_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.status(), SupplierOrderStatus::Confirmed);
        assert!(order.supplier_order_number().is_some());
        assert!(order.sent_at().is_some());
        assert_eq!(order.retry_count(), 0);
    }

    #[tokio::test]
    async fn test_declined_submission_marks_order_failed() {
        let fixture = Fixture::new().await;
        fixture.supplier.faults().fail_submits([SimulatedFault::Declined]);
        let order_id = persisted_order(&fixture).await;

        let outcome = fixture.coordinator.pipeline().submit(order_id).await.unwrap();
        assert!(matches!(
            outcome,
            SubmissionOutcome::Failed { retry_count: 1, .. }
        ));
        assert_eq!(fixture.supplier.submit_calls(), 1);

        let order = fixture.store.get_supplier_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.status(), SupplierOrderStatus::Failed);
        assert_eq!(order.last_error(), Some("supplier declined the order: order declined by supplier"));
    }

    #[tokio::test]
    async fn test_transport_failures_use_attempt_budget() {
        let fixture = Fixture::new().await;
        fixture.supplier.faults().fail_submits([SimulatedFault::Transport; 3]);
        let order_id = persisted_order(&fixture).await;

        let outcome = fixture.coordinator.pipeline().submit(order_id).await.unwrap();
        assert_eq!(fixture.supplier.submit_calls(), 3);
        match outcome {
            SubmissionOutcome::Failed { reason, .. } => {
                assert!(reason.starts_with("supplier unreachable after 3 attempts"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_acceptance_keeps_supplier_number() {
        let fixture = Fixture::with_faults(
            ScriptedFaults::healthy().with_submit_status(SupplierOrderStatus::Pending),
        )
        .await;
        let order_id = persisted_order(&fixture).await;

        let outcome = fixture.coordinator.pipeline().submit(order_id).await.unwrap();
        assert!(matches!(
            outcome,
            SubmissionOutcome::Failed { retry_count: 1, .. }
        ));

        let order = fixture.store.get_supplier_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.status(), SupplierOrderStatus::Failed);
        assert_eq!(order.supplier_order_number(), Some(10_000));
        assert_eq!(
            order.last_error(),
            Some("supplier accepted the order as number 10000 with unreachable status Pending")
        );
    }

    #[tokio::test]
    async fn test_malformed_response_is_recorded_then_returned() {
        let fixture = Fixture::new().await;
        fixture.supplier.faults().fail_submits([SimulatedFault::Malformed]);
        let order_id = persisted_order(&fixture).await;

        let result = fixture.coordinator.pipeline().submit(order_id).await;
        assert!(matches!(
            result,
            Err(ProcurementError::Supplier(SupplierError::InvalidResponse(_)))
        ));

        let order = fixture.store.get_supplier_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.status(), SupplierOrderStatus::Failed);
        assert_eq!(order.retry_count(), 1);
    }

    #[tokio::test]
    async fn test_confirmed_order_is_not_resubmitted() {
        let fixture = Fixture::new().await;
        let order_id = persisted_order(&fixture).await;
        fixture.coordinator.pipeline().submit(order_id).await.unwrap();

        let result = fixture.coordinator.pipeline().submit(order_id).await;
        assert!(matches!(
            result,
            Err(ProcurementError::NotSubmittable {
                status: SupplierOrderStatus::Confirmed,
                ..
            })
        ));
        assert_eq!(fixture.supplier.submit_calls(), 1);
    }
}
