//! DRA Resources - cluster device and capacity report
//!
//! A read-only snapshot of what every Kubernetes node offers: CPU, memory
//! and storage headroom next to the Dynamic Resource Allocation devices
//! (GPUs, FPGAs, ...) it advertises and how many of them are still free.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         dra-resources CLI                         │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────┐   ┌───────────────────┐   ┌──────────────┐ │
//! │  │   KubeSource     │──►│  ClusterSnapshot  │──►│  Reconciler  │ │
//! │  │ (paged, retried) │   │ nodes/slices/     │   │              │ │
//! │  └──────────────────┘   │ claims/pods       │   └──────┬───────┘ │
//! │                         └───────────────────┘          │         │
//! │                                                  NodeRecord[]     │
//! │                                                        │         │
//! │                                           ┌────────────┴───────┐ │
//! │                                           │ table / json / yaml│ │
//! │                                           └────────────────────┘ │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`reconcile`]: the reconciliation engine
//! - [`domain`]: quantities, report records and the fetch port
//! - [`crd`]: `resource.k8s.io/v1beta1` ResourceSlice and ResourceClaim
//! - [`client`]: Kubernetes fetch adapter
//! - [`display`]: report rendering
//! - [`error`]: Error types and handling

pub mod client;
pub mod crd;
pub mod display;
pub mod domain;
pub mod error;
pub mod reconcile;

// Re-export commonly used types
pub use client::{KubeSource, KubeSourceConfig};

pub use crd::{ResourceClaim, ResourceClaimSpec, ResourceSlice, ResourceSliceSpec};

pub use display::{render, OutputFormat};

pub use domain::{
    ClusterReport, ClusterSnapshot, ClusterSource, Collection, DeviceStatus, DeviceSummary,
    NodeCapacity, NodeRecord, Quantity,
};

pub use error::{Error, Result};

pub use reconcile::{AllocationIndex, DemandTable, DisplayNameResolver, NamingRule, Reconciler};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
