//! ResourceSlice
//!
//! Inventory published by a DRA driver: the devices of one pool, usually
//! scoped to a single node.

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// ResourceSlice
// =============================================================================

/// A slice of a driver's device pool.
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "resource.k8s.io",
    version = "v1beta1",
    kind = "ResourceSlice",
    plural = "resourceslices",
    printcolumn = r#"{"name": "Node", "type": "string", "jsonPath": ".spec.nodeName"}"#,
    printcolumn = r#"{"name": "Driver", "type": "string", "jsonPath": ".spec.driver"}"#,
    printcolumn = r#"{"name": "Pool", "type": "string", "jsonPath": ".spec.pool.name"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSliceSpec {
    /// Driver that owns the devices (e.g. `gpu.nvidia.com`)
    #[serde(default)]
    pub driver: String,

    /// Pool the devices belong to
    #[serde(default)]
    pub pool: ResourcePool,

    /// Node the devices are attached to, unset for network-attached pools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,

    /// Devices are reachable from every node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_nodes: Option<bool>,

    #[serde(default)]
    pub devices: Vec<Device>,
}

impl ResourceSliceSpec {
    /// Node name, treating an empty string as unset
    pub fn node(&self) -> Option<&str> {
        self.node_name.as_deref().filter(|n| !n.is_empty())
    }
}

// =============================================================================
// Sub-Types
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePool {
    #[serde(default)]
    pub name: String,

    /// Bumped by the driver whenever the pool is republished
    #[serde(default)]
    pub generation: i64,

    /// Number of slices the pool is split across
    #[serde(default)]
    pub resource_slice_count: i64,
}

/// One device instance
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Unique within the pool
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic: Option<BasicDevice>,
}

impl Device {
    /// String-valued attribute, if declared
    pub fn string_attribute(&self, name: &str) -> Option<&str> {
        self.basic
            .as_ref()?
            .attributes
            .get(name)?
            .string_value
            .as_deref()
    }

    /// Declared capacity entry, if any
    pub fn capacity(&self, name: &str) -> Option<&Quantity> {
        self.basic
            .as_ref()?
            .capacity
            .get(name)
            .map(|c| &c.value)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BasicDevice {
    #[serde(default)]
    pub attributes: BTreeMap<String, DeviceAttribute>,

    #[serde(default)]
    pub capacity: BTreeMap<String, DeviceCapacity>,
}

/// Exactly one of the values is set on a well-formed attribute
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct DeviceAttribute {
    #[serde(rename = "bool", default, skip_serializing_if = "Option::is_none")]
    pub bool_value: Option<bool>,

    #[serde(rename = "int", default, skip_serializing_if = "Option::is_none")]
    pub int_value: Option<i64>,

    #[serde(rename = "string", default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,

    #[serde(rename = "version", default, skip_serializing_if = "Option::is_none")]
    pub version_value: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct DeviceCapacity {
    #[serde(default)]
    pub value: Quantity,
}
