//! Contract with the upstream supplier API and its implementations.

pub mod http;
pub mod retry;
pub mod simulator;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::{ProductId, ResellerId, SupplierOrderId};
use domain::{Money, Reseller, SupplierOrder, SupplierOrderStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use http::HttpSupplierClient;
pub use retry::RetryPolicy;
pub use simulator::{
    FaultSource, MockSupplierSimulator, RandomFaults, ScriptedFaults, SimulatedFault,
};

/// Errors returned by a supplier API call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SupplierError {
    /// The request never got a response (connection refused, reset, DNS).
    #[error("supplier transport error: {0}")]
    Transport(String),

    /// The request did not complete within the attempt timeout.
    #[error("supplier call timed out after {0:?}")]
    Timeout(Duration),

    /// The supplier answered with a non-success HTTP status.
    #[error("supplier rejected the request: HTTP {status} - {body}")]
    Rejected { status: u16, body: String },

    /// The supplier answered `success = false`.
    #[error("supplier declined the order: {0}")]
    Declined(String),

    /// The supplier reported a status this system does not accept.
    #[error("supplier reported unusable status: {0}")]
    UnrecognizedStatus(String),

    /// The supplier accepted the order with a status the order cannot move to.
    #[error(
        "supplier accepted the order as number {supplier_order_number} with unreachable status {status}"
    )]
    UnreachableStatus {
        supplier_order_number: i64,
        status: SupplierOrderStatus,
    },

    /// The response body could not be understood.
    #[error("invalid supplier response: {0}")]
    InvalidResponse(String),

    /// The client is not usable as configured.
    #[error("supplier client misconfigured: {0}")]
    Config(String),
}

impl SupplierError {
    /// Transport-level failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SupplierError::Transport(_) | SupplierError::Timeout(_))
    }

    /// Failures that point at a bug or misconfiguration rather than at the
    /// supplier's answer.
    pub fn is_unexpected(&self) -> bool {
        matches!(
            self,
            SupplierError::InvalidResponse(_) | SupplierError::Config(_)
        )
    }
}

/// One consolidated line as sent to the supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
    pub discount: Money,
}

/// Body of `POST {base}/create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOrderRequest {
    /// Stable across retries of the same supplier order.
    pub idempotency_key: SupplierOrderId,
    pub reseller_id: ResellerId,
    /// Reseller CNPJ.
    pub reseller_document: String,
    pub order_number: i64,
    pub items: Vec<SubmitOrderItem>,
    pub total_quantity: u32,
    pub total_amount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SubmitOrderRequest {
    pub fn new(order: &SupplierOrder, reseller: &Reseller) -> Self {
        Self {
            idempotency_key: order.id(),
            reseller_id: order.reseller_id(),
            reseller_document: reseller.document.clone(),
            order_number: order.order_number(),
            items: order
                .lines()
                .iter()
                .map(|line| SubmitOrderItem {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    discount: line.discount,
                })
                .collect(),
            total_quantity: order.total_quantity(),
            total_amount: order.total_amount(),
            notes: order.notes().map(str::to_string),
        }
    }
}

/// Answer to a submission.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOrderResponse {
    pub success: bool,
    #[serde(default)]
    pub order_number: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// An accepted submission, after checking the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acceptance {
    pub supplier_order_number: i64,
    pub status: SupplierOrderStatus,
}

impl SubmitOrderResponse {
    /// Interprets the response.
    ///
    /// `success = false` becomes [`SupplierError::Declined`]; a missing order
    /// number is an invalid response; a status that does not parse is
    /// [`SupplierError::UnrecognizedStatus`]. A success without a status
    /// means the order was sent.
    pub fn into_acceptance(self) -> Result<Acceptance, SupplierError> {
        if !self.success {
            return Err(SupplierError::Declined(
                self.message
                    .unwrap_or_else(|| "no reason given".to_string()),
            ));
        }
        let supplier_order_number = self.order_number.ok_or_else(|| {
            SupplierError::InvalidResponse("success response without order number".to_string())
        })?;
        let status = match self.status {
            Some(raw) => raw
                .parse()
                .map_err(|_| SupplierError::UnrecognizedStatus(raw))?,
            None => SupplierOrderStatus::Sent,
        };
        Ok(Acceptance {
            supplier_order_number,
            status,
        })
    }
}

/// Answer to a status poll.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusResponse {
    pub success: bool,
    #[serde(default)]
    pub order_number: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub estimated_delivery_date: Option<NaiveDate>,
}

/// The upstream supplier.
#[async_trait]
pub trait SupplierApi: Send + Sync {
    /// Submits a consolidated order. One call, no retries.
    async fn submit(
        &self,
        request: &SubmitOrderRequest,
    ) -> Result<SubmitOrderResponse, SupplierError>;

    /// Polls the status of an accepted order.
    async fn get_status(&self, order_number: i64) -> Result<OrderStatusResponse, SupplierError>;
}

#[async_trait]
impl<T: SupplierApi + ?Sized> SupplierApi for Arc<T> {
    async fn submit(
        &self,
        request: &SubmitOrderRequest,
    ) -> Result<SubmitOrderResponse, SupplierError> {
        (**self).submit(request).await
    }

    async fn get_status(&self, order_number: i64) -> Result<OrderStatusResponse, SupplierError> {
        (**self).get_status(order_number).await
    }
}

/// Supplier client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierSettings {
    /// Base URL of the supplier API. None selects the simulator.
    pub base_url: Option<String>,
    pub use_mock: bool,
    pub timeout: Duration,
    pub retry_attempts: usize,
    pub retry_delay: Duration,
}

impl Default for SupplierSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            use_mock: false,
            timeout: Duration::from_secs(30),
            retry_attempts: 3,
            retry_delay: Duration::from_millis(2000),
        }
    }
}

impl SupplierSettings {
    /// Reads settings from the environment.
    ///
    /// - `SUPPLIER_BASE_URL`: supplier API root (unset selects the simulator)
    /// - `SUPPLIER_USE_MOCK`: force the simulator (default: false)
    /// - `SUPPLIER_TIMEOUT_SECS`: per-attempt timeout (default: 30)
    /// - `SUPPLIER_RETRY_ATTEMPTS`: total attempts per call (default: 3)
    /// - `SUPPLIER_RETRY_DELAY_MS`: backoff base delay (default: 2000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("SUPPLIER_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            use_mock: std::env::var("SUPPLIER_USE_MOCK")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.use_mock),
            timeout: std::env::var("SUPPLIER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            retry_attempts: std::env::var("SUPPLIER_RETRY_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.retry_attempts),
            retry_delay: std::env::var("SUPPLIER_RETRY_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_delay),
        }
    }

    /// Whether the simulator should stand in for the real supplier.
    pub fn uses_simulator(&self) -> bool {
        self.use_mock || self.base_url.is_none()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts.max(1),
            base_delay: self.retry_delay,
            attempt_timeout: self.timeout,
        }
    }

    /// Builds the configured supplier: the HTTP client, or the simulator
    /// with random faults.
    pub fn build(&self) -> Result<Arc<dyn SupplierApi>, SupplierError> {
        match &self.base_url {
            Some(base_url) if !self.use_mock => {
                Ok(Arc::new(HttpSupplierClient::new(base_url, self.timeout)?))
            }
            _ => Ok(Arc::new(MockSupplierSimulator::new(RandomFaults::default()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(SupplierError::Transport("reset".into()).is_retryable());
        assert!(SupplierError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(
            !SupplierError::Rejected {
                status: 400,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(!SupplierError::Declined("no stock".into()).is_retryable());
        assert!(SupplierError::InvalidResponse("eof".into()).is_unexpected());
        assert!(SupplierError::Config("bad url".into()).is_unexpected());
        assert!(!SupplierError::Transport("reset".into()).is_unexpected());
    }

    #[test]
    fn test_acceptance() {
        let response = SubmitOrderResponse {
            success: true,
            order_number: Some(12345),
            status: Some("Confirmed".into()),
            message: None,
        };
        assert_eq!(
            response.into_acceptance().unwrap(),
            Acceptance {
                supplier_order_number: 12345,
                status: SupplierOrderStatus::Confirmed
            }
        );
    }

    #[test]
    fn test_declined_and_unrecognized() {
        let declined = SubmitOrderResponse {
            success: false,
            message: Some("out of stock".into()),
            ..Default::default()
        };
        assert_eq!(
            declined.into_acceptance().unwrap_err(),
            SupplierError::Declined("out of stock".into())
        );

        let odd = SubmitOrderResponse {
            success: true,
            order_number: Some(1),
            status: Some("Teleported".into()),
            message: None,
        };
        assert_eq!(
            odd.into_acceptance().unwrap_err(),
            SupplierError::UnrecognizedStatus("Teleported".into())
        );

        let missing = SubmitOrderResponse {
            success: true,
            ..Default::default()
        };
        assert!(missing.into_acceptance().unwrap_err().is_unexpected());
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let response: OrderStatusResponse = serde_json::from_str(
            r#"{"success":true,"orderNumber":42,"status":"InTransit","estimatedDeliveryDate":"2026-01-05"}"#,
        )
        .unwrap();
        assert_eq!(response.order_number, Some(42));
        assert_eq!(
            response.estimated_delivery_date,
            NaiveDate::from_ymd_opt(2026, 1, 5)
        );
    }

    #[test]
    fn test_settings_select_simulator_without_url() {
        let settings = SupplierSettings::default();
        assert!(settings.uses_simulator());

        let settings = SupplierSettings {
            base_url: Some("http://supplier".into()),
            ..Default::default()
        };
        assert!(!settings.uses_simulator());
        assert_eq!(settings.retry_policy().max_attempts, 3);
    }
}
