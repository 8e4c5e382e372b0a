//! Periodic resubmission of pending supplier orders.

use std::sync::Arc;
use std::time::Duration;

use store::ProcurementStore;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::coordinator::SupplierOrderCoordinator;
use crate::supplier::SupplierApi;

/// Runs [`SupplierOrderCoordinator::process_all_pending`] every `interval`.
///
/// The first run happens one interval after spawning. Ticks missed while a
/// run is still going are skipped. Abort the handle to stop.
pub fn spawn_reprocessor<S, C>(
    coordinator: Arc<SupplierOrderCoordinator<S, C>>,
    interval: Duration,
) -> JoinHandle<()>
where
    S: ProcurementStore + Clone + 'static,
    C: SupplierApi + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let report = coordinator.process_all_pending().await;
            tracing::debug!(?report, "reprocessor tick");
        }
    })
}
