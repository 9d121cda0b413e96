//! Provider-agnostic inventory definitions
//!
//! The reconciler only ever talks to an `InventoryProvider`. Records coming
//! out of it are already flattened: every field the reconciler needs is a
//! plain value or an `Option`, and nothing here touches the network.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Resource identifier (instance ID, reservation ID)
pub type ResourceId = String;

/// A compute instance as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub id: ResourceId,
    pub state: InstanceState,
    /// Launched through the spot market (lifecycle flag or spot request id)
    pub spot: bool,
    pub instance_type: String,
    pub availability_zone: String,
    /// Raw OS/platform attribute, `None` when the provider leaves it blank
    pub platform: Option<String>,
    pub tags: Vec<(String, String)>,
}

/// A capacity reservation as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRecord {
    pub id: ResourceId,
    pub state: ReservationState,
    pub instance_type: String,
    /// Set only for zone-scoped reservations
    pub availability_zone: Option<String>,
    /// Declared scope, e.g. `Region` or `Availability Zone`
    pub scope: Option<String>,
    /// Free-text product description, e.g. `Linux/UNIX` or `Windows (Amazon VPC)`
    pub product_description: Option<String>,
    pub instance_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstanceState {
    Running,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationState {
    Active,
    Other(String),
}

/// Normalize a provider instance state string
pub fn normalize_instance_state(state_str: &str) -> InstanceState {
    if state_str.eq_ignore_ascii_case("running") {
        InstanceState::Running
    } else {
        InstanceState::Other(state_str.to_lowercase())
    }
}

/// Normalize a provider reservation state string
pub fn normalize_reservation_state(state_str: &str) -> ReservationState {
    if state_str.eq_ignore_ascii_case("active") {
        ReservationState::Active
    } else {
        ReservationState::Other(state_str.to_lowercase())
    }
}

impl InstanceRecord {
    /// Value of the first non-empty `Name` tag, else the instance id.
    pub fn display_name(&self) -> &str {
        self.tags
            .iter()
            .find(|(k, v)| k == "Name" && !v.is_empty())
            .map(|(_, v)| v.as_str())
            .unwrap_or(self.id.as_str())
    }
}

/// Read-only access to the two inventories of one account/region
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InventoryProvider: Send + Sync {
    /// Provider name (e.g., "aws")
    fn name(&self) -> &'static str;

    /// Every instance visible to the caller, in provider enumeration order
    async fn list_instances(&self) -> Result<Vec<InstanceRecord>>;

    /// Every reservation visible to the caller, in any state
    async fn list_reservations(&self) -> Result<Vec<ReservationRecord>>;
}
