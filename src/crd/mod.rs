//! Typed views of the Dynamic Resource Allocation API
//!
//! `resource.k8s.io/v1beta1` is newer than the `k8s-openapi` release the
//! rest of the crate builds against, so the two kinds the reporter reads
//! are declared here with `kube::CustomResource`:
//! - ResourceSlice: devices a driver advertises for a node and pool
//! - ResourceClaim: which of those devices have been handed out
//!
//! Every optional field defaults when absent so partially populated
//! objects still deserialize.

pub mod resource_claim;
pub mod resource_slice;

pub use resource_claim::*;
pub use resource_slice::*;

/// API group of the DRA kinds
pub const RESOURCE_GROUP: &str = "resource.k8s.io";

/// API version of the DRA kinds
pub const RESOURCE_VERSION: &str = "v1beta1";
