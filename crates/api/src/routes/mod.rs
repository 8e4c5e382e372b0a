//! Route handlers.

pub mod catalog;
pub mod customer_orders;
pub mod health;
pub mod metrics;
pub mod supplier_orders;

use std::fmt::Display;
use std::str::FromStr;

use serde::Deserialize;
use store::{DEFAULT_PAGE_SIZE, PageRequest};

use crate::error::ApiError;

/// Parses an identifier taken from the path.
pub(crate) fn parse_id<T>(kind: &str, raw: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid {kind} id: {e}")))
}

/// `?page=&page_size=` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl From<PageParams> for PageRequest {
    fn from(params: PageParams) -> Self {
        PageRequest::new(
            params.page.unwrap_or(1),
            params.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
    }
}

/// Body of the status update endpoints.
#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}
