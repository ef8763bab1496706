//! Domain Ports - the boundary between the reconciliation engine and the cluster
//!
//! The engine never talks to the API server. It consumes a [`ClusterSnapshot`],
//! which any [`ClusterSource`] can produce.

use crate::crd::{ResourceClaim, ResourceSlice};
use crate::error::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

// =============================================================================
// Collections
// =============================================================================

/// The four collections a report is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Nodes,
    ResourceSlices,
    ResourceClaims,
    Pods,
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Collection::Nodes => write!(f, "nodes"),
            Collection::ResourceSlices => write!(f, "resourceslices"),
            Collection::ResourceClaims => write!(f, "resourceclaims"),
            Collection::Pods => write!(f, "pods"),
        }
    }
}

// =============================================================================
// Cluster Source Port
// =============================================================================

/// Port for listing cluster state.
///
/// Implementations own connection handling, pagination and retries. A
/// failure must identify the collection (see [`crate::Error::Fetch`]).
#[async_trait]
pub trait ClusterSource: Send + Sync {
    async fn list_nodes(&self) -> Result<Vec<Node>>;

    async fn list_resource_slices(&self) -> Result<Vec<ResourceSlice>>;

    /// Claims across all namespaces
    async fn list_resource_claims(&self) -> Result<Vec<ResourceClaim>>;

    /// Pods across all namespaces
    async fn list_pods(&self) -> Result<Vec<Pod>>;
}

pub type ClusterSourceRef = Arc<dyn ClusterSource>;

// =============================================================================
// Snapshot
// =============================================================================

/// Point-in-time copy of the four collections
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSnapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub resource_slices: Vec<ResourceSlice>,
    #[serde(default)]
    pub resource_claims: Vec<ResourceClaim>,
    #[serde(default)]
    pub pods: Vec<Pod>,
}

impl ClusterSnapshot {
    /// List all four collections concurrently.
    ///
    /// The first failure drops the outstanding requests and is returned as is.
    pub async fn fetch(source: &dyn ClusterSource) -> Result<Self> {
        info!("Fetching node and resource info");

        let (nodes, resource_slices, resource_claims, pods) = futures::try_join!(
            source.list_nodes(),
            source.list_resource_slices(),
            source.list_resource_claims(),
            source.list_pods(),
        )?;

        debug!(
            nodes = nodes.len(),
            slices = resource_slices.len(),
            claims = resource_claims.len(),
            pods = pods.len(),
            "Snapshot complete"
        );

        Ok(Self {
            nodes,
            resource_slices,
            resource_claims,
            pods,
        })
    }

    /// Load a snapshot saved as JSON (`.json`) or YAML (anything else)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;

        let snapshot: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&raw)?,
            _ => serde_yaml::from_str(&raw)?,
        };

        info!(
            "Loaded snapshot from {} ({} nodes)",
            path.display(),
            snapshot.nodes.len()
        );
        Ok(snapshot)
    }
}

#[async_trait]
impl ClusterSource for ClusterSnapshot {
    async fn list_nodes(&self) -> Result<Vec<Node>> {
        Ok(self.nodes.clone())
    }

    async fn list_resource_slices(&self) -> Result<Vec<ResourceSlice>> {
        Ok(self.resource_slices.clone())
    }

    async fn list_resource_claims(&self) -> Result<Vec<ResourceClaim>> {
        Ok(self.resource_claims.clone())
    }

    async fn list_pods(&self) -> Result<Vec<Pod>> {
        Ok(self.pods.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use assert_matches::assert_matches;
    use kube::core::ErrorResponse;
    use std::io::Write;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Source whose claim listing fails and whose pod listing never finishes
    struct BrokenClaims {
        pods_completed: AtomicBool,
    }

    #[async_trait]
    impl ClusterSource for BrokenClaims {
        async fn list_nodes(&self) -> Result<Vec<Node>> {
            Ok(vec![])
        }

        async fn list_resource_slices(&self) -> Result<Vec<ResourceSlice>> {
            Ok(vec![])
        }

        async fn list_resource_claims(&self) -> Result<Vec<ResourceClaim>> {
            Err(Error::fetch(
                Collection::ResourceClaims,
                kube::Error::Api(ErrorResponse {
                    status: "Failure".into(),
                    message: "resourceclaims is forbidden".into(),
                    reason: "Forbidden".into(),
                    code: 403,
                }),
            ))
        }

        async fn list_pods(&self) -> Result<Vec<Pod>> {
            futures::future::pending::<()>().await;
            self.pods_completed.store(true, Ordering::SeqCst);
            Ok(vec![])
        }
    }

    #[test]
    fn test_collection_display() {
        assert_eq!(format!("{}", Collection::Nodes), "nodes");
        assert_eq!(format!("{}", Collection::ResourceSlices), "resourceslices");
        assert_eq!(format!("{}", Collection::ResourceClaims), "resourceclaims");
        assert_eq!(format!("{}", Collection::Pods), "pods");
    }

    #[tokio::test]
    async fn test_fetch_fails_fast() {
        let source = BrokenClaims {
            pods_completed: AtomicBool::new(false),
        };

        let err = ClusterSnapshot::fetch(&source).await.unwrap_err();
        assert_matches!(
            err,
            Error::Fetch {
                collection: Collection::ResourceClaims,
                ..
            }
        );
        assert!(!source.pods_completed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_snapshot_is_a_source() {
        let snapshot: ClusterSnapshot = serde_json::from_value(serde_json::json!({
            "nodes": [{ "apiVersion": "v1", "kind": "Node", "metadata": { "name": "node-1" } }]
        }))
        .unwrap();

        let fetched = tokio_test::block_on(ClusterSnapshot::fetch(&snapshot)).unwrap();
        assert_eq!(fetched.nodes.len(), 1);
        assert!(fetched.resource_slices.is_empty());
        assert!(fetched.pods.is_empty());
    }

    #[test]
    fn test_snapshot_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            r#"
nodes:
  - apiVersion: v1
    kind: Node
    metadata:
      name: node-1
resourceSlices:
  - apiVersion: resource.k8s.io/v1beta1
    kind: ResourceSlice
    metadata:
      name: slice-1
    spec:
      driver: gpu.nvidia.com
      nodeName: node-1
      pool:
        name: pool-a
      devices:
        - name: gpu-0
"#
        )
        .unwrap();

        let snapshot = ClusterSnapshot::from_file(file.path()).unwrap();
        assert_eq!(snapshot.nodes.len(), 1);
        assert_eq!(snapshot.resource_slices[0].spec.devices[0].name, "gpu-0");
        assert!(snapshot.resource_claims.is_empty());
    }

    #[test]
    fn test_snapshot_from_missing_file() {
        let err = ClusterSnapshot::from_file("/nonexistent/snapshot.json").unwrap_err();
        assert_matches!(err, Error::Io(_));
    }
}
