//! Output formatting
//!
//! Renders a [`ClusterReport`] as a kubectl-style table, JSON or YAML.

pub mod table;

pub use table::*;

use crate::domain::ClusterReport;
use crate::error::Result;
use clap::ValueEnum;

/// Output format for the report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned table (default)
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
    /// YAML
    Yaml,
}

/// Render the whole report in `format`
pub fn render(report: &ClusterReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Table => {
            let mut out = node_table(&report.nodes);
            if let Some(devices) = &report.devices {
                out.push_str("\n\n");
                out.push_str(&device_table(&report.nodes, devices));
            }
            Ok(out)
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(report)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NodeCapacity, NodeRecord};

    fn report() -> ClusterReport {
        ClusterReport::new(
            vec![NodeRecord {
                name: "node-1".into(),
                role: "worker".into(),
                capacity: NodeCapacity::default(),
                devices: vec![],
            }],
            None,
        )
    }

    #[test]
    fn test_render_json() {
        let out = render(&report(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["nodes"][0]["name"], "node-1");
        assert_eq!(value["nodes"][0]["role"], "worker");
    }

    #[test]
    fn test_render_yaml() {
        let out = render(&report(), OutputFormat::Yaml).unwrap();
        assert!(out.contains("name: node-1"));
        assert!(out.contains("generatedAt:"));
    }

    #[test]
    fn test_render_table() {
        let out = render(&report(), OutputFormat::Table).unwrap();
        assert!(out.contains("NODE"));
        assert!(out.contains("node-1"));
        assert!(!out.contains("DRIVER"));
    }
}
