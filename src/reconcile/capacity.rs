//! Node Capacity Resolver
//!
//! Derives the role label and the total/available capacity of a node.

use super::demand::ResourceDemand;
use super::{quantity_or_zero, RESOURCE_CPU, RESOURCE_MEMORY, RESOURCE_STORAGE};
use crate::domain::{NodeCapacity, NO_ROLE};
use k8s_openapi::api::core::v1::Node;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity as K8sQuantity;
use std::collections::BTreeMap;

/// Label prefix that marks a node role (`node-role.kubernetes.io/worker`)
pub const ROLE_LABEL_PREFIX: &str = "node-role.kubernetes.io/";

/// Role of a node, or `<none>`.
///
/// Labels are kept sorted, so with several role labels the lexicographically
/// smallest role wins.
pub fn node_role(node: &Node) -> String {
    node.metadata
        .labels
        .iter()
        .flatten()
        .filter_map(|(key, _)| key.strip_prefix(ROLE_LABEL_PREFIX))
        .find(|role| !role.is_empty())
        .unwrap_or(NO_ROLE)
        .to_string()
}

/// Total capacity and what is left after subtracting pod requests.
///
/// Resource types missing from the node status count as zero. Available
/// values are not clamped and go negative on an overcommitted node.
pub fn resolve_capacity(node: &Node, demand: Option<&ResourceDemand>) -> NodeCapacity {
    let name = node.metadata.name.as_deref().unwrap_or_default();
    let status = node.status.as_ref();
    let capacity = status.and_then(|s| s.capacity.as_ref());
    let allocatable = status.and_then(|s| s.allocatable.as_ref());

    let lookup = |list: Option<&BTreeMap<String, K8sQuantity>>, resource: &str| {
        quantity_or_zero(list.and_then(|l| l.get(resource)), name)
    };

    let mut resolved = NodeCapacity {
        total_cpu: lookup(capacity, RESOURCE_CPU),
        available_cpu: lookup(allocatable, RESOURCE_CPU),
        total_memory: lookup(capacity, RESOURCE_MEMORY),
        available_memory: lookup(allocatable, RESOURCE_MEMORY),
        total_storage: lookup(capacity, RESOURCE_STORAGE),
        available_storage: lookup(allocatable, RESOURCE_STORAGE),
    };

    if let Some(demand) = demand {
        resolved.available_cpu -= demand.cpu;
        resolved.available_memory -= demand.memory;
        resolved.available_storage -= demand.storage;
    }

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Quantity;
    use serde_json::json;

    fn node(labels: serde_json::Value, status: serde_json::Value) -> Node {
        serde_json::from_value(json!({
            "apiVersion": "v1",
            "kind": "Node",
            "metadata": { "name": "node-1", "labels": labels },
            "status": status
        }))
        .unwrap()
    }

    fn q(s: &str) -> Quantity {
        Quantity::parse(s).unwrap()
    }

    #[test]
    fn test_role_from_label() {
        let n = node(
            json!({ "kubernetes.io/hostname": "node-1", "node-role.kubernetes.io/worker": "" }),
            json!({}),
        );
        assert_eq!(node_role(&n), "worker");
    }

    #[test]
    fn test_role_default() {
        let n = node(json!({ "kubernetes.io/hostname": "node-1" }), json!({}));
        assert_eq!(node_role(&n), "<none>");

        let unlabeled: Node = serde_json::from_value(json!({
            "apiVersion": "v1",
            "kind": "Node",
            "metadata": { "name": "bare" }
        }))
        .unwrap();
        assert_eq!(node_role(&unlabeled), "<none>");
    }

    #[test]
    fn test_role_is_deterministic() {
        let n = node(
            json!({
                "node-role.kubernetes.io/worker": "",
                "node-role.kubernetes.io/control-plane": ""
            }),
            json!({}),
        );
        assert_eq!(node_role(&n), "control-plane");
    }

    #[test]
    fn test_capacity_subtracts_demand() {
        let n = node(
            json!({}),
            json!({
                "capacity": { "cpu": "4", "memory": "16Gi", "storage": "100Gi" },
                "allocatable": { "cpu": "3", "memory": "14Gi", "storage": "90Gi" }
            }),
        );
        let demand = ResourceDemand {
            cpu: q("1"),
            memory: q("2Gi"),
            storage: Quantity::zero(),
        };

        let capacity = resolve_capacity(&n, Some(&demand));
        assert_eq!(capacity.total_cpu, q("4"));
        assert_eq!(capacity.available_cpu, q("2"));
        assert_eq!(capacity.total_memory, q("16Gi"));
        assert_eq!(capacity.available_memory.to_string(), "12Gi");
        assert_eq!(capacity.available_storage, q("90Gi"));
    }

    #[test]
    fn test_capacity_without_pods() {
        let n = node(json!({}), json!({ "allocatable": { "cpu": "3" } }));

        let capacity = resolve_capacity(&n, None);
        assert_eq!(capacity.available_cpu, q("3"));
        assert!(capacity.total_cpu.is_zero());
        assert!(capacity.available_memory.is_zero());
    }

    #[test]
    fn test_capacity_overcommit_negative() {
        let n = node(json!({}), json!({ "allocatable": { "cpu": "1" } }));
        let demand = ResourceDemand {
            cpu: q("1500m"),
            ..Default::default()
        };

        let capacity = resolve_capacity(&n, Some(&demand));
        assert_eq!(capacity.available_cpu.to_string(), "-500m");
    }
}
