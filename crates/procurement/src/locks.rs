//! Per-order async locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use common::SupplierOrderId;
use tokio::sync::OwnedMutexGuard;

/// Entries beyond this count trigger a sweep of unused locks.
const SWEEP_THRESHOLD: usize = 1024;

/// One async mutex per supplier order.
///
/// Every read-modify-write of a supplier order happens under its lock, so
/// a manual retry and a batch run on the same order take turns.
#[derive(Debug, Clone, Default)]
pub struct OrderLocks {
    locks: Arc<Mutex<HashMap<SupplierOrderId, Arc<tokio::sync::Mutex<()>>>>>,
}

impl OrderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `order_id`. Released on drop.
    pub async fn lock(&self, order_id: SupplierOrderId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            if locks.len() > SWEEP_THRESHOLD {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            locks.entry(order_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Number of orders with a lock entry.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
