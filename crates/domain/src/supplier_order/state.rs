//! Supplier order status machine.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The status of a consolidated order at the supplier.
///
/// State transitions:
/// ```text
/// Pending   ──► Sent | Confirmed | InTransit | Delivered | Cancelled | Failed
/// Failed    ──► Pending | Sent | Confirmed | InTransit | Delivered | Cancelled | Failed
/// Sent      ──► Confirmed | InTransit | Delivered | Cancelled | Failed
/// Confirmed ──► InTransit | Delivered | Cancelled
/// InTransit ──► Delivered
/// ```
///
/// `Failed ──► Failed` is allowed so repeated submission failures can be
/// recorded without leaving the failed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SupplierOrderStatus {
    /// Created locally, not yet accepted by the supplier.
    #[default]
    Pending,

    /// Accepted by the supplier.
    Sent,

    /// Confirmed by the supplier.
    Confirmed,

    /// Shipped by the supplier.
    InTransit,

    /// Delivered to the reseller (terminal).
    Delivered,

    /// Cancelled (terminal).
    Cancelled,

    /// Last submission attempt failed.
    Failed,
}

impl SupplierOrderStatus {
    pub const ALL: [SupplierOrderStatus; 7] = [
        SupplierOrderStatus::Pending,
        SupplierOrderStatus::Sent,
        SupplierOrderStatus::Confirmed,
        SupplierOrderStatus::InTransit,
        SupplierOrderStatus::Delivered,
        SupplierOrderStatus::Cancelled,
        SupplierOrderStatus::Failed,
    ];

    /// Returns true if the transition table allows moving to `next`.
    pub fn can_transition_to(&self, next: SupplierOrderStatus) -> bool {
        use SupplierOrderStatus::*;
        match self {
            Pending => !matches!(next, Pending),
            Failed => true,
            Sent => matches!(next, Confirmed | InTransit | Delivered | Cancelled | Failed),
            Confirmed => matches!(next, InTransit | Delivered | Cancelled),
            InTransit => matches!(next, Delivered),
            Delivered | Cancelled => false,
        }
    }

    /// Validates a transition, returning the target status.
    pub fn transition_to(&self, next: SupplierOrderStatus) -> Result<Self, DomainError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::InvalidTransition {
                entity: "supplier order",
                from: self.as_str(),
                to: next.as_str(),
            })
        }
    }

    /// Returns true if the order may be (re)submitted to the supplier.
    pub fn is_submittable(&self) -> bool {
        matches!(self, SupplierOrderStatus::Pending | SupplierOrderStatus::Failed)
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SupplierOrderStatus::Delivered | SupplierOrderStatus::Cancelled
        )
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SupplierOrderStatus::Pending => "Pending",
            SupplierOrderStatus::Sent => "Sent",
            SupplierOrderStatus::Confirmed => "Confirmed",
            SupplierOrderStatus::InTransit => "InTransit",
            SupplierOrderStatus::Delivered => "Delivered",
            SupplierOrderStatus::Cancelled => "Cancelled",
            SupplierOrderStatus::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for SupplierOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SupplierOrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DomainError::UnknownStatus {
                entity: "supplier order",
                value: s.to_string(),
            })
    }
}
