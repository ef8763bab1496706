//! Kubernetes Fetch Adapter
//!
//! Implements the [`ClusterSource`](crate::domain::ClusterSource) port
//! against a live API server.

pub mod kube_source;

pub use kube_source::*;
