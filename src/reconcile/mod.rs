//! Reconciliation Engine
//!
//! Joins nodes, resource slices, resource claims and pods into one record
//! per node:
//!
//! ```text
//!   claims ──► AllocationIndex ──┐
//!   pods   ──► DemandTable ──┐   │
//!   nodes  ──► capacity ─────┴─► │ ──► NodeRecord skeletons
//!   slices ──► devices ◄─────────┘ ──► device tallies per node
//! ```
//!
//! Every pass builds its own tables from a [`ClusterSnapshot`] and drops them
//! when it returns. Inconsistent data (unknown nodes, dangling claims,
//! malformed quantities) degrades to zero or is skipped, never an error.

pub mod allocation;
pub mod capacity;
pub mod demand;
pub mod devices;
pub mod inventory;

pub use allocation::*;
pub use capacity::*;
pub use demand::*;
pub use devices::*;

use crate::domain::{ClusterSnapshot, ClusterSource, DeviceStatus, NodeRecord, Quantity};
use crate::error::Result;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity as K8sQuantity;
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const RESOURCE_CPU: &str = "cpu";
pub const RESOURCE_MEMORY: &str = "memory";
pub const RESOURCE_STORAGE: &str = "storage";

/// Parse a quantity from cluster data, treating absent or malformed values as zero
pub(crate) fn quantity_or_zero(raw: Option<&K8sQuantity>, owner: &str) -> Quantity {
    match raw.map(Quantity::try_from) {
        Some(Ok(quantity)) => quantity,
        Some(Err(e)) => {
            debug!("Ignoring quantity on {}: {}", owner, e);
            Quantity::zero()
        }
        None => Quantity::zero(),
    }
}

// =============================================================================
// Reconciler
// =============================================================================

/// Builds the per-node report
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    names: DisplayNameResolver,
}

impl Reconciler {
    pub fn new(names: DisplayNameResolver) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &DisplayNameResolver {
        &self.names
    }

    /// Fetch all four collections from `source` and reconcile them.
    ///
    /// Any fetch failure aborts the pass; there is no partial result.
    pub async fn reconcile(&self, source: &dyn ClusterSource) -> Result<Vec<NodeRecord>> {
        let snapshot = ClusterSnapshot::fetch(source).await?;
        Ok(self.reconcile_snapshot(&snapshot))
    }

    /// One record per named node, sorted by node name
    pub fn reconcile_snapshot(&self, snapshot: &ClusterSnapshot) -> Vec<NodeRecord> {
        let allocations = AllocationIndex::build(&snapshot.resource_claims);
        let demand = DemandTable::build(&snapshot.pods);

        let mut nodes: BTreeMap<&str, (NodeRecord, NodeDevices)> = BTreeMap::new();
        for node in &snapshot.nodes {
            let Some(name) = node.metadata.name.as_deref().filter(|n| !n.is_empty()) else {
                debug!("Skipping node without a name");
                continue;
            };
            nodes.entry(name).or_insert_with(|| {
                let record = NodeRecord {
                    name: name.to_string(),
                    role: node_role(node),
                    capacity: resolve_capacity(node, demand.get(name)),
                    devices: Vec::new(),
                };
                (record, NodeDevices::default())
            });
        }

        let summarizer = DeviceSummarizer::new(&self.names, &allocations);
        let mut dropped = 0usize;
        for slice in &snapshot.resource_slices {
            match slice.spec.node().and_then(|n| nodes.get_mut(n)) {
                Some((_, tally)) => summarizer.summarize_slice(&slice.spec, tally),
                None => {
                    debug!(
                        "Dropping slice {:?}: node {:?} not found",
                        slice.metadata.name, slice.spec.node_name
                    );
                    dropped += 1;
                }
            }
        }

        info!(
            nodes = nodes.len(),
            allocated_devices = allocations.len(),
            dropped_slices = dropped,
            "Reconciled cluster state"
        );

        nodes
            .into_values()
            .map(|(mut record, tally)| {
                record.devices = tally.into_summaries();
                record
            })
            .collect()
    }

    /// Every device on a known node with its allocation state
    pub fn inventory(&self, snapshot: &ClusterSnapshot) -> Vec<DeviceStatus> {
        let allocations = AllocationIndex::build(&snapshot.resource_claims);
        inventory::list_devices(snapshot, &self.names, &allocations)
    }
}
