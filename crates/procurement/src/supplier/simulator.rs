//! In-process stand-in for the supplier API.
//!
//! Behaves like the real supplier, including its failures. What goes wrong
//! and when is decided by an injectable [`FaultSource`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use domain::SupplierOrderStatus;
use rand::Rng;
use tracing::info;

use super::{
    OrderStatusResponse, SubmitOrderRequest, SubmitOrderResponse, SupplierApi, SupplierError,
};

/// A failure the simulator can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedFault {
    /// Connection-level failure.
    Transport,
    /// `success = false` answer.
    Declined,
    /// Non-2xx HTTP answer.
    Rejected,
    /// Body that does not parse.
    Malformed,
}

/// What the simulator does on one submit call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitPlan {
    pub latency: Duration,
    pub fault: Option<SimulatedFault>,
    pub order_number: i64,
    pub status: SupplierOrderStatus,
}

/// What the simulator does on one status call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPlan {
    pub latency: Duration,
    pub fault: Option<SimulatedFault>,
    pub status: SupplierOrderStatus,
    pub delivery_in_days: i64,
}

/// Decides latency, faults, and answers for each simulated call.
pub trait FaultSource: Send + Sync {
    fn plan_submit(&self) -> SubmitPlan;
    fn plan_status(&self) -> StatusPlan;
}

/// Randomized behavior modeled on an unreliable production supplier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomFaults {
    pub submit_failure_rate: f64,
    pub status_failure_rate: f64,
    pub submit_latency_ms: (u64, u64),
    pub status_latency_ms: (u64, u64),
}

impl Default for RandomFaults {
    fn default() -> Self {
        Self {
            submit_failure_rate: 0.2,
            status_failure_rate: 0.1,
            submit_latency_ms: (500, 2000),
            status_latency_ms: (200, 1000),
        }
    }
}

impl FaultSource for RandomFaults {
    fn plan_submit(&self) -> SubmitPlan {
        let mut rng = rand::rng();
        let (min, max) = self.submit_latency_ms;
        SubmitPlan {
            latency: Duration::from_millis(rng.random_range(min..=max)),
            fault: rng
                .random_bool(self.submit_failure_rate)
                .then_some(SimulatedFault::Transport),
            order_number: rng.random_range(10_000..=99_999),
            status: if rng.random_bool(0.5) {
                SupplierOrderStatus::Sent
            } else {
                SupplierOrderStatus::Confirmed
            },
        }
    }

    fn plan_status(&self) -> StatusPlan {
        const REPORTED: [SupplierOrderStatus; 3] = [
            SupplierOrderStatus::Confirmed,
            SupplierOrderStatus::InTransit,
            SupplierOrderStatus::Delivered,
        ];
        let mut rng = rand::rng();
        let (min, max) = self.status_latency_ms;
        StatusPlan {
            latency: Duration::from_millis(rng.random_range(min..=max)),
            fault: rng
                .random_bool(self.status_failure_rate)
                .then_some(SimulatedFault::Transport),
            status: REPORTED[rng.random_range(0..REPORTED.len())],
            delivery_in_days: rng.random_range(1..=7),
        }
    }
}

/// Deterministic behavior for tests.
///
/// Each call pops the next queued fault; an empty queue means success.
/// Order numbers are sequential and there is no latency.
#[derive(Debug)]
pub struct ScriptedFaults {
    submit_faults: Mutex<VecDeque<SimulatedFault>>,
    status_faults: Mutex<VecDeque<SimulatedFault>>,
    next_order_number: AtomicI64,
    submit_status: SupplierOrderStatus,
    reported_status: SupplierOrderStatus,
}

impl Default for ScriptedFaults {
    fn default() -> Self {
        Self {
            submit_faults: Mutex::new(VecDeque::new()),
            status_faults: Mutex::new(VecDeque::new()),
            next_order_number: AtomicI64::new(10_000),
            submit_status: SupplierOrderStatus::Confirmed,
            reported_status: SupplierOrderStatus::InTransit,
        }
    }
}

impl ScriptedFaults {
    /// Always succeeds.
    pub fn healthy() -> Self {
        Self::default()
    }

    /// Status the supplier reports when accepting an order.
    pub fn with_submit_status(mut self, status: SupplierOrderStatus) -> Self {
        self.submit_status = status;
        self
    }

    /// Status the supplier reports when polled.
    pub fn with_reported_status(mut self, status: SupplierOrderStatus) -> Self {
        self.reported_status = status;
        self
    }

    /// Queues faults for upcoming submit calls, in order.
    pub fn fail_submits(&self, faults: impl IntoIterator<Item = SimulatedFault>) {
        self.submit_faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(faults);
    }

    /// Queues faults for upcoming status calls, in order.
    pub fn fail_status_checks(&self, faults: impl IntoIterator<Item = SimulatedFault>) {
        self.status_faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(faults);
    }

    fn pop(queue: &Mutex<VecDeque<SimulatedFault>>) -> Option<SimulatedFault> {
        queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }
}

impl FaultSource for ScriptedFaults {
    fn plan_submit(&self) -> SubmitPlan {
        let fault = Self::pop(&self.submit_faults);
        let order_number = if fault.is_none() {
            self.next_order_number.fetch_add(1, Ordering::SeqCst)
        } else {
            0
        };
        SubmitPlan {
            latency: Duration::ZERO,
            fault,
            order_number,
            status: self.submit_status,
        }
    }

    fn plan_status(&self) -> StatusPlan {
        StatusPlan {
            latency: Duration::ZERO,
            fault: Self::pop(&self.status_faults),
            status: self.reported_status,
            delivery_in_days: 3,
        }
    }
}

/// Supplier simulator with the same contract as the HTTP client.
#[derive(Debug, Default)]
pub struct MockSupplierSimulator<F: FaultSource> {
    faults: F,
    submit_calls: AtomicUsize,
    status_calls: AtomicUsize,
}

impl<F: FaultSource> MockSupplierSimulator<F> {
    pub fn new(faults: F) -> Self {
        Self {
            faults,
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
        }
    }

    pub fn faults(&self) -> &F {
        &self.faults
    }

    /// Number of submit calls received so far.
    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    /// Number of status calls received so far.
    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

fn fault_error(fault: SimulatedFault) -> Option<SupplierError> {
    match fault {
        SimulatedFault::Transport => Some(SupplierError::Transport(
            "simulated supplier instability".to_string(),
        )),
        SimulatedFault::Rejected => Some(SupplierError::Rejected {
            status: 422,
            body: "simulated rejection".to_string(),
        }),
        SimulatedFault::Malformed => Some(SupplierError::InvalidResponse(
            "simulated malformed body".to_string(),
        )),
        SimulatedFault::Declined => None,
    }
}

#[async_trait]
impl<F: FaultSource> SupplierApi for MockSupplierSimulator<F> {
    async fn submit(
        &self,
        request: &SubmitOrderRequest,
    ) -> Result<SubmitOrderResponse, SupplierError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        let plan = self.faults.plan_submit();
        if !plan.latency.is_zero() {
            tokio::time::sleep(plan.latency).await;
        }

        if let Some(fault) = plan.fault {
            return match fault_error(fault) {
                Some(err) => Err(err),
                None => Ok(SubmitOrderResponse {
                    success: false,
                    message: Some("order declined by supplier".to_string()),
                    ..Default::default()
                }),
            };
        }

        info!(
            order_number = plan.order_number,
            idempotency_key = %request.idempotency_key,
            "mock supplier accepted order"
        );
        Ok(SubmitOrderResponse {
            success: true,
            order_number: Some(plan.order_number),
            status: Some(plan.status.as_str().to_string()),
            message: Some("Order created successfully".to_string()),
        })
    }

    async fn get_status(&self, order_number: i64) -> Result<OrderStatusResponse, SupplierError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let plan = self.faults.plan_status();
        if !plan.latency.is_zero() {
            tokio::time::sleep(plan.latency).await;
        }

        if let Some(fault) = plan.fault {
            return match fault_error(fault) {
                Some(err) => Err(err),
                None => Ok(OrderStatusResponse {
                    success: false,
                    order_number: Some(order_number),
                    message: Some("order unknown to supplier".to_string()),
                    ..Default::default()
                }),
            };
        }

        let estimated =
            Utc::now().date_naive() + chrono::Days::new(plan.delivery_in_days.unsigned_abs());
        Ok(OrderStatusResponse {
            success: true,
            order_number: Some(order_number),
            status: Some(plan.status.as_str().to_string()),
            message: Some(format!("Order is {}", plan.status.as_str().to_lowercase())),
            estimated_delivery_date: Some(estimated),
        })
    }
}
