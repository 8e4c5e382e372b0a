//! HTTP client for the supplier API.
//!
//! `POST {base}/create` submits an order; `GET {base}/status/{number}`
//! polls it. One call per method invocation; retries are the caller's job.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{
    OrderStatusResponse, SubmitOrderRequest, SubmitOrderResponse, SupplierApi, SupplierError,
};

const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Longest response body excerpt kept in error messages.
const BODY_EXCERPT: usize = 200;

/// Supplier API over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSupplierClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpSupplierClient {
    /// Creates a client. `timeout` bounds each request.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SupplierError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(SupplierError::Config(
                "supplier base URL not configured".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SupplierError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_send_error(&self, err: reqwest::Error) -> SupplierError {
        if err.is_timeout() {
            SupplierError::Timeout(self.timeout)
        } else if err.is_builder() {
            SupplierError::Config(err.to_string())
        } else {
            SupplierError::Transport(err.to_string())
        }
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, SupplierError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SupplierError::Transport(e.to_string()))?;

        if !status.is_success() {
            warn!(status = %status, body = %excerpt(&body), "supplier returned error status");
            return Err(SupplierError::Rejected {
                status: status.as_u16(),
                body: excerpt(&body),
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| SupplierError::InvalidResponse(format!("{e}: {}", excerpt(&body))))
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT).collect()
}

#[async_trait]
impl SupplierApi for HttpSupplierClient {
    async fn submit(
        &self,
        request: &SubmitOrderRequest,
    ) -> Result<SubmitOrderResponse, SupplierError> {
        let url = format!("{}/create", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(IDEMPOTENCY_KEY_HEADER, request.idempotency_key.to_string())
            .json(request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        debug!(url = %url, status = %response.status(), "supplier submit answered");
        Self::read_json(response).await
    }

    async fn get_status(&self, order_number: i64) -> Result<OrderStatusResponse, SupplierError> {
        let url = format!("{}/status/{}", self.base_url, order_number);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        debug!(url = %url, status = %response.status(), "supplier status answered");
        Self::read_json(response).await
    }
}
