//! One reconciliation pass against a live inventory

use crate::error::Result;
use crate::provider::{InstanceRecord, InventoryProvider, ReservationRecord};
use crate::reconcile::{
    compute_diff, count_reservations, count_running_instances, fold_regional_reservations,
    InstanceDiff, InstanceNameIndex, ReservedCount, RunningInstanceCount,
};
use tracing::info;

/// Everything a report needs from one pass
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub running: RunningInstanceCount,
    pub names: InstanceNameIndex,
    pub reserved: ReservedCount,
    /// Final per-bucket difference, regional reservations already folded
    pub diff: InstanceDiff,
}

impl Reconciliation {
    /// Build from already-fetched inventories
    pub fn from_inventory(
        instances: &[InstanceRecord],
        reservations: &[ReservationRecord],
    ) -> Self {
        let (running, names) = count_running_instances(instances);
        let reserved = count_reservations(reservations);
        let diff = fold_regional_reservations(compute_diff(&running, &reserved));

        Self {
            running,
            names,
            reserved,
            diff,
        }
    }

    pub fn total_running(&self) -> u64 {
        self.running.total()
    }

    pub fn total_reserved(&self) -> u64 {
        self.reserved.total()
    }

    pub fn total_unused(&self) -> u64 {
        self.diff.total_unused()
    }
}

/// Fetch both inventories and reconcile them.
///
/// Provider errors abort the pass; nothing is retried.
pub async fn check_reservations(provider: &dyn InventoryProvider) -> Result<Reconciliation> {
    let instances = provider.list_instances().await?;
    let reservations = provider.list_reservations().await?;

    let reconciliation = Reconciliation::from_inventory(&instances, &reservations);
    info!(
        "{}: {} running, {} reserved, {} unused",
        provider.name(),
        reconciliation.total_running(),
        reconciliation.total_reserved(),
        reconciliation.total_unused()
    );
    Ok(reconciliation)
}
