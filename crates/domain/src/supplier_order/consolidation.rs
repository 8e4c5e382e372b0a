//! Order consolidation engine.
//!
//! Merges the lines of several customer orders into one line per product.
//! Pure: it reads orders and returns a [`Consolidation`]; nothing is mutated.

use std::collections::{HashMap, HashSet};

use common::{CustomerOrderId, ProductId};
use serde::{Deserialize, Serialize};

use crate::customer_order::CustomerOrder;
use crate::error::DomainError;
use crate::value_objects::{self, Money, OrderLine};

/// Default minimum number of units the supplier accepts per order.
pub const DEFAULT_MINIMUM_QUANTITY: u32 = 1000;

/// What to do when two lines for the same product disagree on unit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PricePolicy {
    /// Fail with [`DomainError::PriceMismatch`].
    #[default]
    Reject,
    /// Keep the first price seen for the product.
    KeepFirst,
}

impl std::str::FromStr for PricePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reject" => Ok(PricePolicy::Reject),
            "keep-first" | "keep_first" => Ok(PricePolicy::KeepFirst),
            other => Err(format!("unknown price policy: {other}")),
        }
    }
}

/// Business rules applied when consolidating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsolidationRules {
    pub minimum_quantity: u32,
    pub price_policy: PricePolicy,
}

impl Default for ConsolidationRules {
    fn default() -> Self {
        Self {
            minimum_quantity: DEFAULT_MINIMUM_QUANTITY,
            price_policy: PricePolicy::default(),
        }
    }
}

/// Result of merging a set of customer orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consolidation {
    /// Source orders, deduplicated, in input order.
    pub customer_order_ids: Vec<CustomerOrderId>,
    /// One line per distinct product, in first-seen order.
    pub lines: Vec<OrderLine>,
    pub total_quantity: u32,
    pub total_amount: Money,
}

/// Merges customer orders into consolidated lines.
///
/// Every order must be in a consolidatable status. Orders appearing more
/// than once are counted once. Quantities and discounts are summed per
/// product; the unit price follows `rules.price_policy`. The merged total
/// quantity must reach `rules.minimum_quantity`.
pub fn consolidate(
    orders: &[CustomerOrder],
    rules: &ConsolidationRules,
) -> Result<Consolidation, DomainError> {
    let mut seen_orders = HashSet::new();
    let mut customer_order_ids = Vec::with_capacity(orders.len());
    let mut lines: Vec<OrderLine> = Vec::new();
    let mut index: HashMap<ProductId, usize> = HashMap::new();

    for order in orders {
        if !seen_orders.insert(order.id()) {
            continue;
        }
        order.ensure_consolidatable()?;
        customer_order_ids.push(order.id());

        for line in order.lines() {
            match index.get(&line.product_id) {
                Some(&position) => {
                    let merged = &mut lines[position];
                    if merged.unit_price != line.unit_price
                        && rules.price_policy == PricePolicy::Reject
                    {
                        return Err(DomainError::PriceMismatch {
                            product_id: line.product_id,
                            expected: merged.unit_price,
                            found: line.unit_price,
                        });
                    }
                    merged.quantity = merged
                        .quantity
                        .checked_add(line.quantity)
                        .ok_or(DomainError::TotalOverflow { field: "quantity" })?;
                    merged.discount = merged
                        .discount
                        .checked_add(line.discount)
                        .ok_or(DomainError::TotalOverflow { field: "amount" })?;
                }
                None => {
                    index.insert(line.product_id, lines.len());
                    lines.push(
                        OrderLine::new(line.product_id, line.quantity, line.unit_price)
                            .with_discount(line.discount),
                    );
                }
            }
        }
    }

    let total_quantity = value_objects::total_quantity(&lines)?;
    if total_quantity < rules.minimum_quantity {
        return Err(DomainError::MinimumQuantityNotMet {
            minimum: rules.minimum_quantity,
            actual: total_quantity,
        });
    }

    tracing::debug!(
        orders = customer_order_ids.len(),
        products = lines.len(),
        total_quantity,
        "consolidated customer orders"
    );

    Ok(Consolidation {
        customer_order_ids,
        total_amount: value_objects::total_amount(&lines)?,
        total_quantity,
        lines,
    })
}
