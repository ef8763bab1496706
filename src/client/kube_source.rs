//! Live cluster source backed by `kube`
//!
//! Lists each collection page by page and retries throttled or failed
//! requests with exponential backoff before giving up.

use crate::crd::{ResourceClaim, ResourceSlice};
use crate::domain::ports::{ClusterSource, Collection};
use crate::error::{is_transient_kube, Error, Result};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the Kubernetes source
#[derive(Debug, Clone)]
pub struct KubeSourceConfig {
    /// Explicit kubeconfig file; inferred when unset
    pub kubeconfig: Option<PathBuf>,
    /// Kubeconfig context to use instead of the current one
    pub context: Option<String>,
    /// Objects requested per list call
    pub page_size: u32,
    /// Give up retrying transient failures after this long
    pub retry_timeout: Duration,
}

impl Default for KubeSourceConfig {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            context: None,
            page_size: 500,
            retry_timeout: Duration::from_secs(30),
        }
    }
}

// =============================================================================
// Kube Source
// =============================================================================

/// [`ClusterSource`] that lists objects from the API server
pub struct KubeSource {
    client: Client,
    config: KubeSourceConfig,
}

impl KubeSource {
    pub fn new(client: Client, config: KubeSourceConfig) -> Self {
        Self { client, config }
    }

    /// Build a client from the configured kubeconfig, or infer one
    /// (in-cluster service account, then `~/.kube/config`).
    pub async fn connect(config: KubeSourceConfig) -> Result<Self> {
        let kube_config = Self::load_config(&config).await?;
        info!("Connecting to cluster at {}", kube_config.cluster_url);

        let client = Client::try_from(kube_config)?;
        Ok(Self::new(client, config))
    }

    async fn load_config(config: &KubeSourceConfig) -> Result<Config> {
        let options = KubeConfigOptions {
            context: config.context.clone(),
            ..Default::default()
        };

        match (&config.kubeconfig, &config.context) {
            (Some(path), _) => {
                let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                    Error::Configuration(format!(
                        "failed to read kubeconfig {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Config::from_custom_kubeconfig(kubeconfig, &options)
                    .await
                    .map_err(|e| {
                        Error::Configuration(format!(
                            "failed to load kubeconfig {}: {}",
                            path.display(),
                            e
                        ))
                    })
            }
            (None, Some(_)) => Config::from_kubeconfig(&options)
                .await
                .map_err(|e| Error::Configuration(format!("failed to load kubeconfig: {}", e))),
            (None, None) => Config::infer().await.map_err(|e| {
                Error::Configuration(format!("failed to infer cluster config: {}", e))
            }),
        }
    }

    /// List every object of `api`, following continue tokens
    async fn list_all<K>(&self, api: Api<K>, collection: Collection) -> Result<Vec<K>>
    where
        K: Resource + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
    {
        let mut items = Vec::new();
        let mut continue_token: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let mut params = ListParams::default().limit(self.config.page_size);
            if let Some(token) = &continue_token {
                params = params.continue_token(token);
            }

            let page = self.with_retry(collection, || api.list(&params)).await?;
            pages += 1;
            debug!("Listed {} {} (page {})", page.items.len(), collection, pages);
            items.extend(page.items);

            match page.metadata.continue_ {
                Some(token) if !token.is_empty() => continue_token = Some(token),
                _ => break,
            }
        }

        Ok(items)
    }

    /// Run a request, retrying transient failures until the retry timeout
    async fn with_retry<T, F, Fut>(&self, collection: Collection, mut request: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, kube::Error>>,
    {
        let policy = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(self.config.retry_timeout))
            .build();

        backoff::future::retry_notify(
            policy,
            || {
                let attempt = request();
                async move {
                    attempt.await.map_err(|e| {
                        if is_transient_kube(&e) {
                            backoff::Error::transient(e)
                        } else {
                            backoff::Error::permanent(e)
                        }
                    })
                }
            },
            |err: kube::Error, wait: Duration| {
                warn!("Listing {} failed, retrying in {:?}: {}", collection, wait, err);
            },
        )
        .await
        .map_err(|e| Error::fetch(collection, e))
    }
}

#[async_trait]
impl ClusterSource for KubeSource {
    async fn list_nodes(&self) -> Result<Vec<Node>> {
        self.list_all(Api::all(self.client.clone()), Collection::Nodes)
            .await
    }

    async fn list_resource_slices(&self) -> Result<Vec<ResourceSlice>> {
        self.list_all(Api::all(self.client.clone()), Collection::ResourceSlices)
            .await
    }

    async fn list_resource_claims(&self) -> Result<Vec<ResourceClaim>> {
        self.list_all(Api::all(self.client.clone()), Collection::ResourceClaims)
            .await
    }

    async fn list_pods(&self) -> Result<Vec<Pod>> {
        self.list_all(Api::all(self.client.clone()), Collection::Pods)
            .await
    }
}
