//! Demand Table
//!
//! Sums the container requests of every scheduled pod per node.

use super::{quantity_or_zero, RESOURCE_CPU, RESOURCE_MEMORY, RESOURCE_STORAGE};
use crate::domain::Quantity;
use k8s_openapi::api::core::v1::Pod;
use std::collections::HashMap;

/// Requested resources summed over a set of containers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceDemand {
    pub cpu: Quantity,
    pub memory: Quantity,
    pub storage: Quantity,
}

/// Requests per node name
#[derive(Debug, Clone, Default)]
pub struct DemandTable {
    by_node: HashMap<String, ResourceDemand>,
}

impl DemandTable {
    /// Straight sum over all regular containers of every bound pod.
    ///
    /// Unscheduled pods are skipped. Init containers and pod overhead are
    /// not counted.
    pub fn build(pods: &[Pod]) -> Self {
        let mut by_node: HashMap<String, ResourceDemand> = HashMap::new();

        for pod in pods {
            let Some(spec) = pod.spec.as_ref() else {
                continue;
            };
            let node = match spec.node_name.as_deref() {
                Some(node) if !node.is_empty() => node,
                _ => continue,
            };

            let demand = by_node.entry(node.to_string()).or_default();
            for container in &spec.containers {
                let Some(requests) = container
                    .resources
                    .as_ref()
                    .and_then(|r| r.requests.as_ref())
                else {
                    continue;
                };

                let context = pod.metadata.name.as_deref().unwrap_or_default();
                demand.cpu += quantity_or_zero(requests.get(RESOURCE_CPU), context);
                demand.memory += quantity_or_zero(requests.get(RESOURCE_MEMORY), context);
                demand.storage += quantity_or_zero(requests.get(RESOURCE_STORAGE), context);
            }
        }

        Self { by_node }
    }

    pub fn get(&self, node: &str) -> Option<&ResourceDemand> {
        self.by_node.get(node)
    }

    /// Number of nodes with at least one scheduled pod
    pub fn len(&self) -> usize {
        self.by_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_node.is_empty()
    }
}
