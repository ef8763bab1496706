//! Device Summarizer
//!
//! Resolves a display name and memory size for each device in a slice and
//! tallies identical devices per node, discounting those held by a claim.

use super::allocation::{AllocationIndex, PoolKey};
use super::quantity_or_zero;
use crate::crd::{Device, ResourceSliceSpec};
use crate::domain::{DeviceSummary, Quantity};
use crate::error::{Error, Result};
use std::collections::{BTreeMap, HashMap};

/// Capacity entry holding a device's own memory
pub const MEMORY_CAPACITY: &str = "memory";

/// Driver whose devices are named by their `productName` attribute
pub const NVIDIA_GPU_DRIVER: &str = "gpu.nvidia.com";

/// Attribute carrying the product name on NVIDIA GPUs
pub const PRODUCT_NAME_ATTRIBUTE: &str = "productName";

// =============================================================================
// Naming Strategy
// =============================================================================

/// How a driver's devices are labelled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamingRule {
    /// Use the driver identifier
    Driver,
    /// Use this string attribute, falling back to the driver identifier
    Attribute(String),
}

static DRIVER_RULE: NamingRule = NamingRule::Driver;

/// Per-driver naming rules. Drivers without a rule use [`NamingRule::Driver`].
#[derive(Debug, Clone)]
pub struct DisplayNameResolver {
    rules: HashMap<String, NamingRule>,
}

impl DisplayNameResolver {
    /// A resolver with no rules at all
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    pub fn with_rule(mut self, driver: impl Into<String>, rule: NamingRule) -> Self {
        self.rules.insert(driver.into(), rule);
        self
    }

    /// Parse a `driver=attribute` rule as given on the command line
    pub fn parse_rule(spec: &str) -> Result<(String, NamingRule)> {
        match spec.split_once('=') {
            Some((driver, attribute)) if !driver.trim().is_empty() => {
                let attribute = attribute.trim();
                let rule = if attribute.is_empty() {
                    NamingRule::Driver
                } else {
                    NamingRule::Attribute(attribute.to_string())
                };
                Ok((driver.trim().to_string(), rule))
            }
            _ => Err(Error::Configuration(format!(
                "invalid naming rule {:?}, expected DRIVER=ATTRIBUTE",
                spec
            ))),
        }
    }

    pub fn rule(&self, driver: &str) -> &NamingRule {
        self.rules.get(driver).unwrap_or(&DRIVER_RULE)
    }

    pub fn display_name(&self, driver: &str, device: &Device) -> String {
        match self.rule(driver) {
            NamingRule::Attribute(attribute) => device
                .string_attribute(attribute)
                .unwrap_or(driver)
                .to_string(),
            NamingRule::Driver => driver.to_string(),
        }
    }
}

impl Default for DisplayNameResolver {
    fn default() -> Self {
        Self::empty().with_rule(
            NVIDIA_GPU_DRIVER,
            NamingRule::Attribute(PRODUCT_NAME_ATTRIBUTE.to_string()),
        )
    }
}

/// Declared memory of a device, zero if absent
pub fn device_memory(device: &Device) -> Quantity {
    quantity_or_zero(device.capacity(MEMORY_CAPACITY), &device.name)
}

// =============================================================================
// Per-Node Tally
// =============================================================================

/// Devices are grouped by name and memory so that e.g. 40GB and 80GB
/// variants of one product stay apart.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct DeviceKey {
    display_name: String,
    memory: Quantity,
}

#[derive(Debug, Clone, Copy, Default)]
struct DeviceCounts {
    total: u32,
    available: u32,
}

/// Device tallies of one node, accumulated across all of its slices
#[derive(Debug, Clone, Default)]
pub struct NodeDevices {
    counts: BTreeMap<DeviceKey, DeviceCounts>,
}

impl NodeDevices {
    fn record(&mut self, key: DeviceKey, allocated: bool) {
        let counts = self.counts.entry(key).or_default();
        counts.total += 1;
        counts.available += 1;
        if allocated {
            counts.available = counts.available.saturating_sub(1);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Summaries sorted by display name, then memory
    pub fn into_summaries(self) -> Vec<DeviceSummary> {
        self.counts
            .into_iter()
            .map(|(key, counts)| DeviceSummary {
                display_name: key.display_name,
                memory: key.memory,
                total_count: counts.total,
                available_count: counts.available,
            })
            .collect()
    }
}

// =============================================================================
// Summarizer
// =============================================================================

/// Folds slices into per-node tallies
pub struct DeviceSummarizer<'a> {
    names: &'a DisplayNameResolver,
    allocations: &'a AllocationIndex,
}

impl<'a> DeviceSummarizer<'a> {
    pub fn new(names: &'a DisplayNameResolver, allocations: &'a AllocationIndex) -> Self {
        Self { names, allocations }
    }

    /// Add every device of `slice` to `tally`
    pub fn summarize_slice(&self, slice: &ResourceSliceSpec, tally: &mut NodeDevices) {
        let pool = PoolKey::new(&slice.driver, &slice.pool.name);

        for device in &slice.devices {
            let key = DeviceKey {
                display_name: self.names.display_name(&slice.driver, device),
                memory: device_memory(device),
            };
            tally.record(key, self.allocations.is_allocated(&pool, &device.name));
        }
    }
}
