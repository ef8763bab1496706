//! Report records produced by a reconciliation pass

use super::quantity::Quantity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role shown for nodes without a `node-role.kubernetes.io/` label
pub const NO_ROLE: &str = "<none>";

/// Capacity and headroom of a node.
///
/// `available_*` is allocatable minus the summed requests of the pods bound
/// to the node. It is not clamped, so an overcommitted node reports a
/// negative value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeCapacity {
    pub total_cpu: Quantity,
    pub available_cpu: Quantity,
    pub total_memory: Quantity,
    pub available_memory: Quantity,
    pub total_storage: Quantity,
    pub available_storage: Quantity,
}

/// Tally of identical devices on one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSummary {
    /// Product name, or the driver identifier when the driver has no naming rule
    pub display_name: String,
    /// Per-device memory, zero when not declared
    pub memory: Quantity,
    pub total_count: u32,
    /// Always `<= total_count`
    pub available_count: u32,
}

impl DeviceSummary {
    pub fn allocated_count(&self) -> u32 {
        self.total_count - self.available_count
    }

    /// `name` or `name+memory`, the label used by the table view
    pub fn label(&self) -> String {
        if self.memory.is_zero() {
            self.display_name.clone()
        } else {
            format!("{}+{}", self.display_name, self.memory)
        }
    }
}

/// Aggregate view of one cluster node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub name: String,
    pub role: String,
    pub capacity: NodeCapacity,
    /// Sorted by display name, then memory
    pub devices: Vec<DeviceSummary>,
}

impl NodeRecord {
    /// Look up a device tally by display name
    pub fn device(&self, display_name: &str) -> Option<&DeviceSummary> {
        self.devices.iter().find(|d| d.display_name == display_name)
    }
}

/// One physical device and whether a claim holds it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    pub node: String,
    pub driver: String,
    pub pool: String,
    pub device: String,
    pub display_name: String,
    pub memory: Quantity,
    pub allocated: bool,
}

impl DeviceStatus {
    pub fn status(&self) -> &'static str {
        if self.allocated {
            "Allocated"
        } else {
            "Available"
        }
    }
}

/// Everything a single run reports, as serialized for JSON/YAML output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterReport {
    pub generated_at: DateTime<Utc>,
    pub nodes: Vec<NodeRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devices: Option<Vec<DeviceStatus>>,
}

impl ClusterReport {
    pub fn new(nodes: Vec<NodeRecord>, devices: Option<Vec<DeviceStatus>>) -> Self {
        Self {
            generated_at: Utc::now(),
            nodes,
            devices,
        }
    }
}
