//! Value objects shared by customer and supplier orders.

use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Largest quantity accepted on a single order line.
pub const MAX_LINE_QUANTITY: u32 = 1_000_000;

/// Largest unit price accepted on an order line or in the catalog.
pub const MAX_UNIT_PRICE: Money = Money(100_000_000);

/// Money amount represented in cents to avoid floating point issues.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates an amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Creates an amount from whole currency units.
    pub fn from_units(units: i64) -> Self {
        Self(units * 100)
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self(0)
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Returns true if the amount is greater than zero.
    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Returns true if the amount is below zero.
    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies by a quantity, or None on overflow.
    pub fn checked_multiply(&self, quantity: u32) -> Option<Money> {
        self.0.checked_mul(i64::from(quantity)).map(Money)
    }

    pub fn checked_add(&self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    pub fn checked_sub(&self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// A product line on an order.
///
/// The unit price is the price agreed on this order, not the catalog price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
    #[serde(default)]
    pub discount: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl OrderLine {
    /// Creates a line without discount or notes.
    pub fn new(product_id: ProductId, quantity: u32, unit_price: Money) -> Self {
        Self {
            product_id,
            quantity,
            unit_price,
            discount: Money::zero(),
            notes: None,
        }
    }

    /// Sets the discount applied to the whole line.
    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount = discount;
        self
    }

    /// Attaches free-form notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Returns `unit_price * quantity - discount`.
    pub fn total_price(&self) -> Result<Money, DomainError> {
        self.unit_price
            .checked_multiply(self.quantity)
            .and_then(|gross| gross.checked_sub(self.discount))
            .ok_or(DomainError::TotalOverflow { field: "amount" })
    }

    /// Checks quantity, price, and discount bounds.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.quantity == 0 || self.quantity > MAX_LINE_QUANTITY {
            return Err(DomainError::InvalidQuantity {
                product_id: self.product_id,
                quantity: self.quantity,
            });
        }
        if !self.unit_price.is_positive() || self.unit_price > MAX_UNIT_PRICE {
            return Err(DomainError::InvalidPrice {
                product_id: self.product_id,
                price: self.unit_price,
            });
        }
        if self.discount.is_negative() {
            return Err(DomainError::InvalidDiscount {
                product_id: self.product_id,
                discount: self.discount,
            });
        }
        Ok(())
    }
}

/// Sums the quantities of a set of lines.
pub(crate) fn total_quantity(lines: &[OrderLine]) -> Result<u32, DomainError> {
    lines.iter().try_fold(0u32, |total, line| {
        total
            .checked_add(line.quantity)
            .ok_or(DomainError::TotalOverflow { field: "quantity" })
    })
}

/// Sums the line totals of a set of lines.
pub(crate) fn total_amount(lines: &[OrderLine]) -> Result<Money, DomainError> {
    lines.iter().try_fold(Money::zero(), |total, line| {
        total
            .checked_add(line.total_price()?)
            .ok_or(DomainError::TotalOverflow { field: "amount" })
    })
}
