//! Error types for the DRA resource reporter
//!
//! Only fetch and configuration problems are errors. Inconsistent cluster
//! data is absorbed by the reconciliation engine and never surfaces here.

use crate::domain::ports::Collection;
use thiserror::Error;

/// Unified error type for the reporter
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Kubernetes Errors
    // =========================================================================
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("failed to list {collection}: {source}")]
    Fetch {
        collection: Collection,
        #[source]
        source: kube::Error,
    },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("Quantity parse error: {0}")]
    QuantityParse(String),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap a Kubernetes client error with the collection being listed
    pub fn fetch(collection: Collection, source: kube::Error) -> Self {
        Error::Fetch { collection, source }
    }

    /// The collection whose retrieval failed, if this is a fetch failure
    pub fn collection(&self) -> Option<Collection> {
        match self {
            Error::Fetch { collection, .. } => Some(*collection),
            _ => None,
        }
    }

    /// Check if this error is transient and worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Kube(err) | Error::Fetch { source: err, .. } => is_transient_kube(err),
            _ => false,
        }
    }
}

/// Throttling, server-side failures and broken transports are transient.
/// Auth, not-found and decode failures are not.
pub(crate) fn is_transient_kube(err: &kube::Error) -> bool {
    match err {
        kube::Error::Api(resp) => resp.code == 429 || resp.code >= 500,
        kube::Error::HyperError(_) | kube::Error::Service(_) => true,
        _ => false,
    }
}

/// Result type alias for the reporter
pub type Result<T> = std::result::Result<T, Error>;
