//! Allocation Index
//!
//! Which devices are currently held by a ResourceClaim, keyed by the pool
//! they were drawn from.

use crate::crd::ResourceClaim;
use std::collections::{HashMap, HashSet};
use tracing::trace;

// =============================================================================
// Pool Key
// =============================================================================

/// A driver's pool. Device names are only unique within one of these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolKey {
    pub driver: String,
    pub pool: String,
}

impl PoolKey {
    pub fn new(driver: impl Into<String>, pool: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            pool: pool.into(),
        }
    }
}

impl std::fmt::Display for PoolKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.driver, self.pool)
    }
}

// =============================================================================
// Allocation Index
// =============================================================================

/// Allocated device names per pool, built once per reconciliation pass.
///
/// Pools are not qualified by node: two nodes publishing the same
/// (driver, pool) pair share one entry.
#[derive(Debug, Clone, Default)]
pub struct AllocationIndex {
    allocated: HashMap<PoolKey, HashSet<String>>,
}

impl AllocationIndex {
    /// Index every allocation result of every claim.
    ///
    /// Pending claims and results without a device name contribute nothing.
    pub fn build(claims: &[ResourceClaim]) -> Self {
        let mut allocated: HashMap<PoolKey, HashSet<String>> = HashMap::new();

        for claim in claims {
            for result in claim.allocated_devices() {
                if result.device.is_empty() {
                    continue;
                }
                trace!(
                    "Claim {:?} holds {}/{}/{}",
                    claim.metadata.name,
                    result.driver,
                    result.pool,
                    result.device
                );
                allocated
                    .entry(PoolKey::new(&result.driver, &result.pool))
                    .or_default()
                    .insert(result.device.clone());
            }
        }

        Self { allocated }
    }

    /// Check whether `device` in `pool` is held by some claim
    pub fn is_allocated(&self, pool: &PoolKey, device: &str) -> bool {
        self.allocated
            .get(pool)
            .map_or(false, |devices| devices.contains(device))
    }

    /// Number of distinct allocated devices
    pub fn len(&self) -> usize {
        self.allocated.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claim(name: &str, results: serde_json::Value) -> ResourceClaim {
        serde_json::from_value(json!({
            "apiVersion": "resource.k8s.io/v1beta1",
            "kind": "ResourceClaim",
            "metadata": { "name": name, "namespace": "default" },
            "spec": {},
            "status": { "allocation": { "devices": { "results": results } } }
        }))
        .unwrap()
    }

    #[test]
    fn test_index_multiple_results() {
        let claims = vec![
            claim(
                "two-gpus",
                json!([
                    { "request": "gpu", "driver": "gpu.nvidia.com", "pool": "pool-a", "device": "gpu-0" },
                    { "request": "gpu", "driver": "gpu.nvidia.com", "pool": "pool-b", "device": "gpu-0" }
                ]),
            ),
            claim(
                "fpga",
                json!([{ "request": "fpga", "driver": "fpga.example.com", "pool": "pool-a", "device": "fpga-3" }]),
            ),
        ];

        let index = AllocationIndex::build(&claims);
        assert_eq!(index.len(), 3);
        assert!(index.is_allocated(&PoolKey::new("gpu.nvidia.com", "pool-a"), "gpu-0"));
        assert!(index.is_allocated(&PoolKey::new("gpu.nvidia.com", "pool-b"), "gpu-0"));
        assert!(index.is_allocated(&PoolKey::new("fpga.example.com", "pool-a"), "fpga-3"));
        assert!(!index.is_allocated(&PoolKey::new("gpu.nvidia.com", "pool-a"), "gpu-1"));
    }

    #[test]
    fn test_pending_and_malformed_claims_ignored() {
        let pending: ResourceClaim = serde_json::from_value(json!({
            "apiVersion": "resource.k8s.io/v1beta1",
            "kind": "ResourceClaim",
            "metadata": { "name": "pending", "namespace": "default" },
            "spec": {}
        }))
        .unwrap();
        let nameless = claim("nameless", json!([{ "driver": "gpu.nvidia.com", "pool": "pool-a" }]));

        let index = AllocationIndex::build(&[pending, nameless]);
        assert!(index.is_empty());
    }

    #[test]
    fn test_separator_in_names_does_not_collide() {
        // "a-b" + "c" and "a" + "b-c" both flatten to "a-b-c"
        let claims = vec![claim(
            "collide",
            json!([{ "driver": "a-b", "pool": "c", "device": "dev-0" }]),
        )];

        let index = AllocationIndex::build(&claims);
        assert!(index.is_allocated(&PoolKey::new("a-b", "c"), "dev-0"));
        assert!(!index.is_allocated(&PoolKey::new("a", "b-c"), "dev-0"));
    }
}
