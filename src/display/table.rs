//! Table rendering

use crate::domain::{DeviceStatus, NodeRecord};
use tabled::{settings::Style, Table, Tabled};

/// Shown in the devices column of a node without devices
pub const NO_DEVICES: &str = "None";

#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "NODE")]
    node: String,
    #[tabled(rename = "ROLE")]
    role: String,
    #[tabled(rename = "CPU(TOTAL/AVAIL)")]
    cpu: String,
    #[tabled(rename = "MEMORY(TOTAL/AVAIL GiB)")]
    memory: String,
    #[tabled(rename = "STORAGE(TOTAL/AVAIL)")]
    storage: String,
    #[tabled(rename = "DEVICES")]
    devices: String,
}

impl From<&NodeRecord> for NodeRow {
    fn from(record: &NodeRecord) -> Self {
        let c = &record.capacity;
        Self {
            node: record.name.clone(),
            role: record.role.clone(),
            cpu: format!("{}/{}", c.total_cpu, c.available_cpu),
            memory: format!(
                "{}/{}",
                c.total_memory.as_gib_string(),
                c.available_memory.as_gib_string()
            ),
            storage: format!("{}/{}", c.total_storage, c.available_storage),
            devices: devices_column(record),
        }
    }
}

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "NODE")]
    node: String,
    #[tabled(rename = "DRIVER")]
    driver: String,
    #[tabled(rename = "POOL")]
    pool: String,
    #[tabled(rename = "DEVICE")]
    device: String,
    #[tabled(rename = "PRODUCT")]
    product: String,
    #[tabled(rename = "MEMORY")]
    memory: String,
    #[tabled(rename = "STATUS")]
    status: String,
}

impl DeviceRow {
    fn none(node: &str) -> Self {
        Self {
            node: node.to_string(),
            driver: String::new(),
            pool: String::new(),
            device: NO_DEVICES.to_string(),
            product: String::new(),
            memory: String::new(),
            status: String::new(),
        }
    }
}

impl From<&DeviceStatus> for DeviceRow {
    fn from(d: &DeviceStatus) -> Self {
        Self {
            node: d.node.clone(),
            driver: d.driver.clone(),
            pool: d.pool.clone(),
            device: d.device.clone(),
            product: d.display_name.clone(),
            memory: if d.memory.is_zero() {
                String::new()
            } else {
                d.memory.to_string()
            },
            status: d.status().to_string(),
        }
    }
}

/// `Vendor X+8Gi: 2 total, 1 available; ...` or `None`
pub fn devices_column(record: &NodeRecord) -> String {
    if record.devices.is_empty() {
        return NO_DEVICES.to_string();
    }
    record
        .devices
        .iter()
        .map(|d| {
            format!(
                "{}: {} total, {} available",
                d.label(),
                d.total_count,
                d.available_count
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// One row per node
pub fn node_table(nodes: &[NodeRecord]) -> String {
    let rows: Vec<NodeRow> = nodes.iter().map(NodeRow::from).collect();
    Table::new(rows).with(Style::blank()).to_string()
}

/// One row per device, plus a `None` row for each node without devices
pub fn device_table(nodes: &[NodeRecord], devices: &[DeviceStatus]) -> String {
    let mut rows = Vec::with_capacity(devices.len() + nodes.len());
    for node in nodes {
        let mut on_node = devices.iter().filter(|d| d.node == node.name).peekable();
        if on_node.peek().is_none() {
            rows.push(DeviceRow::none(&node.name));
        }
        rows.extend(on_node.map(DeviceRow::from));
    }
    Table::new(rows).with(Style::blank()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DeviceSummary, NodeCapacity, Quantity};

    fn q(s: &str) -> Quantity {
        Quantity::parse(s).unwrap()
    }

    fn record(devices: Vec<DeviceSummary>) -> NodeRecord {
        NodeRecord {
            name: "node-1".into(),
            role: "worker".into(),
            capacity: NodeCapacity {
                total_cpu: q("4"),
                available_cpu: q("3") - q("1"),
                total_memory: q("16Gi"),
                available_memory: q("14Gi") - q("2Gi"),
                total_storage: q("100Gi"),
                available_storage: q("90Gi"),
            },
            devices,
        }
    }

    #[test]
    fn test_devices_column() {
        let r = record(vec![
            DeviceSummary {
                display_name: "Vendor X".into(),
                memory: q("8Gi"),
                total_count: 2,
                available_count: 1,
            },
            DeviceSummary {
                display_name: "fpga.example.com".into(),
                memory: Quantity::zero(),
                total_count: 1,
                available_count: 1,
            },
        ]);
        assert_eq!(
            devices_column(&r),
            "Vendor X+8Gi: 2 total, 1 available; fpga.example.com: 1 total, 1 available"
        );
        assert_eq!(devices_column(&record(vec![])), "None");
    }

    #[test]
    fn test_node_table_columns() {
        let out = node_table(&[record(vec![])]);
        assert!(out.contains("CPU(TOTAL/AVAIL)"));
        assert!(out.contains("4/2"));
        assert!(out.contains("16.00Gi/12.00Gi"));
        assert!(out.contains("100Gi/90Gi"));
        assert!(out.contains("None"));
    }

    #[test]
    fn test_device_table_marks_empty_nodes() {
        let mut other = record(vec![]);
        other.name = "node-2".into();
        let devices = vec![DeviceStatus {
            node: "node-1".into(),
            driver: "gpu.nvidia.com".into(),
            pool: "pool-a".into(),
            device: "gpu-0".into(),
            display_name: "Vendor X".into(),
            memory: q("8Gi"),
            allocated: true,
        }];

        let out = device_table(&[record(vec![]), other], &devices);
        assert!(out.contains("gpu-0"));
        assert!(out.contains("Allocated"));
        let marker = out.lines().find(|l| l.contains("node-2")).unwrap();
        assert!(marker.contains("None"));
    }
}
