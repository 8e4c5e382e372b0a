//! Customer order status machine.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The status of a customer order in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending      ──► Processing | Consolidated | Cancelled
/// Processing   ──► Consolidated | Sent | Cancelled
/// Consolidated ──► Sent | Cancelled
/// Sent         ──► Delivered
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CustomerOrderStatus {
    /// Placed, waiting to be picked up.
    #[default]
    Pending,

    /// Being handled by the reseller.
    Processing,

    /// Merged into a supplier order.
    Consolidated,

    /// Shipped to the customer.
    Sent,

    /// Received by the customer (terminal).
    Delivered,

    /// Cancelled (terminal).
    Cancelled,
}

impl CustomerOrderStatus {
    pub const ALL: [CustomerOrderStatus; 6] = [
        CustomerOrderStatus::Pending,
        CustomerOrderStatus::Processing,
        CustomerOrderStatus::Consolidated,
        CustomerOrderStatus::Sent,
        CustomerOrderStatus::Delivered,
        CustomerOrderStatus::Cancelled,
    ];

    /// Returns true if the transition table allows moving to `next`.
    pub fn can_transition_to(&self, next: CustomerOrderStatus) -> bool {
        use CustomerOrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing | Consolidated | Cancelled)
                | (Processing, Consolidated | Sent | Cancelled)
                | (Consolidated, Sent | Cancelled)
                | (Sent, Delivered)
        )
    }

    /// Validates a transition, returning the target status.
    pub fn transition_to(&self, next: CustomerOrderStatus) -> Result<Self, DomainError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::InvalidTransition {
                entity: "customer order",
                from: self.as_str(),
                to: next.as_str(),
            })
        }
    }

    /// Returns true if the order can be merged into a supplier order.
    pub fn can_consolidate(&self) -> bool {
        matches!(
            self,
            CustomerOrderStatus::Pending | CustomerOrderStatus::Processing
        )
    }

    /// Returns true if the order can be cancelled.
    pub fn can_cancel(&self) -> bool {
        self.can_transition_to(CustomerOrderStatus::Cancelled)
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CustomerOrderStatus::Delivered | CustomerOrderStatus::Cancelled
        )
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerOrderStatus::Pending => "Pending",
            CustomerOrderStatus::Processing => "Processing",
            CustomerOrderStatus::Consolidated => "Consolidated",
            CustomerOrderStatus::Sent => "Sent",
            CustomerOrderStatus::Delivered => "Delivered",
            CustomerOrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for CustomerOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CustomerOrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DomainError::UnknownStatus {
                entity: "customer order",
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CustomerOrderStatus::*;

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(CustomerOrderStatus::default(), Pending);
    }

    #[test]
    fn test_transition_table() {
        assert!(Pending.can_transition_to(Processing));
        assert!(Pending.can_transition_to(Consolidated));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Sent));
        assert!(!Pending.can_transition_to(Delivered));

        assert!(Processing.can_transition_to(Consolidated));
        assert!(Processing.can_transition_to(Sent));
        assert!(!Processing.can_transition_to(Pending));

        assert!(Consolidated.can_transition_to(Sent));
        assert!(Consolidated.can_transition_to(Cancelled));
        assert!(!Consolidated.can_transition_to(Processing));

        assert!(Sent.can_transition_to(Delivered));
        assert!(!Sent.can_transition_to(Cancelled));
    }

    #[test]
    fn test_terminal_statuses_have_no_exits() {
        for next in CustomerOrderStatus::ALL {
            assert!(!Delivered.can_transition_to(next));
            assert!(!Cancelled.can_transition_to(next));
        }
        assert!(Delivered.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(!Sent.is_terminal());
    }

    #[test]
    fn test_only_open_orders_consolidate() {
        assert!(Pending.can_consolidate());
        assert!(Processing.can_consolidate());
        assert!(!Consolidated.can_consolidate());
        assert!(!Sent.can_consolidate());
        assert!(!Cancelled.can_consolidate());
    }

    #[test]
    fn test_invalid_transition_error() {
        let err = Sent.transition_to(Pending).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid state transition for customer order: cannot move from Sent to Pending"
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!("Pending".parse::<CustomerOrderStatus>().unwrap(), Pending);
        assert_eq!(
            "consolidated".parse::<CustomerOrderStatus>().unwrap(),
            Consolidated
        );
        assert!(matches!(
            "Shipped".parse::<CustomerOrderStatus>(),
            Err(DomainError::UnknownStatus { .. })
        ));
    }
}
