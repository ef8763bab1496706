//! ResourceClaim
//!
//! A request for devices. Once the scheduler satisfies it the status carries
//! the exact (driver, pool, device) triples that were handed out.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "resource.k8s.io",
    version = "v1beta1",
    kind = "ResourceClaim",
    plural = "resourceclaims",
    namespaced,
    status = "ResourceClaimStatus",
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ResourceClaimSpec {
    #[serde(default)]
    pub devices: DeviceClaim,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceClaim {
    #[serde(default)]
    pub requests: Vec<DeviceRequest>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRequest {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub device_class_name: String,

    /// `ExactCount` or `All`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation_mode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
}

// =============================================================================
// Status
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceClaimStatus {
    /// Unset until the claim is allocated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation: Option<AllocationResult>,

    /// Consumers currently holding the claim
    #[serde(default)]
    pub reserved_for: Vec<ResourceClaimConsumerReference>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AllocationResult {
    #[serde(default)]
    pub devices: DeviceAllocationResult,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceAllocationResult {
    #[serde(default)]
    pub results: Vec<DeviceRequestAllocationResult>,
}

/// A single device handed out to a request
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRequestAllocationResult {
    #[serde(default)]
    pub request: String,

    #[serde(default)]
    pub driver: String,

    #[serde(default)]
    pub pool: String,

    #[serde(default)]
    pub device: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_access: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceClaimConsumerReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_group: Option<String>,

    #[serde(default)]
    pub resource: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub uid: String,
}

impl ResourceClaim {
    /// Devices allocated to this claim. Empty while the claim is pending.
    pub fn allocated_devices(&self) -> &[DeviceRequestAllocationResult] {
        self.status
            .as_ref()
            .and_then(|s| s.allocation.as_ref())
            .map(|a| a.devices.results.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_allocated_claim() {
        let claim: ResourceClaim = serde_json::from_value(json!({
            "apiVersion": "resource.k8s.io/v1beta1",
            "kind": "ResourceClaim",
            "metadata": { "name": "claim-1", "namespace": "default" },
            "spec": { "devices": { "requests": [{ "name": "gpu", "deviceClassName": "gpu.nvidia.com" }] } },
            "status": {
                "allocation": {
                    "devices": {
                        "results": [
                            { "request": "gpu", "driver": "gpu.nvidia.com", "pool": "pool-a", "device": "gpu-0" },
                            { "request": "gpu", "driver": "gpu.nvidia.com", "pool": "pool-a", "device": "gpu-1" }
                        ]
                    }
                },
                "reservedFor": [{ "resource": "pods", "name": "trainer", "uid": "1234" }]
            }
        }))
        .unwrap();

        let devices: Vec<_> = claim.allocated_devices().iter().map(|r| r.device.as_str()).collect();
        assert_eq!(devices, vec!["gpu-0", "gpu-1"]);
    }

    #[test]
    fn test_pending_claim_has_no_devices() {
        let claim: ResourceClaim = serde_json::from_value(json!({
            "apiVersion": "resource.k8s.io/v1beta1",
            "kind": "ResourceClaim",
            "metadata": { "name": "pending", "namespace": "default" },
            "spec": {}
        }))
        .unwrap();

        assert!(claim.allocated_devices().is_empty());
    }
}
