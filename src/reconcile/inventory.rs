//! Per-device listing
//!
//! Flat view of every device on a known node and whether a claim holds it.

use super::allocation::{AllocationIndex, PoolKey};
use super::devices::{device_memory, DisplayNameResolver};
use crate::domain::{ClusterSnapshot, DeviceStatus};
use std::collections::HashSet;

/// One entry per device, sorted by node, driver, pool and device name.
///
/// Slices whose node is not in the snapshot are dropped.
pub fn list_devices(
    snapshot: &ClusterSnapshot,
    names: &DisplayNameResolver,
    allocations: &AllocationIndex,
) -> Vec<DeviceStatus> {
    let known: HashSet<&str> = snapshot
        .nodes
        .iter()
        .filter_map(|n| n.metadata.name.as_deref())
        .collect();

    let mut devices: Vec<DeviceStatus> = snapshot
        .resource_slices
        .iter()
        .filter_map(|slice| {
            let node = slice.spec.node().filter(|n| known.contains(n))?;
            Some((node, &slice.spec))
        })
        .flat_map(move |(node, spec)| {
            let pool = PoolKey::new(&spec.driver, &spec.pool.name);
            spec.devices.iter().map(move |device| DeviceStatus {
                node: node.to_string(),
                driver: spec.driver.clone(),
                pool: spec.pool.name.clone(),
                device: device.name.clone(),
                display_name: names.display_name(&spec.driver, device),
                memory: device_memory(device),
                allocated: allocations.is_allocated(&pool, &device.name),
            })
        })
        .collect();

    devices.sort_by(|a, b| {
        (&a.node, &a.driver, &a.pool, &a.device).cmp(&(&b.node, &b.driver, &b.pool, &b.device))
    });
    devices
}
