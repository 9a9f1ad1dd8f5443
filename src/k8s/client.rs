//! Kubernetes client wrapper for copypod

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::{
    api::{Api, DeleteParams, ListParams, PostParams},
    config::KubeConfigOptions,
    Client, Config,
};
use tracing::{info, instrument};

/// Cluster operations the copy lifecycle needs.
///
/// `K8sClient` is the production implementation; tests substitute an
/// in-memory fake. All operations are scoped to the namespace the
/// implementation was constructed with.
#[async_trait]
pub trait PodApi {
    async fn read_pod(&self, name: &str) -> kube::Result<Pod>;
    async fn list_pods(&self, label_selector: &str) -> kube::Result<Vec<Pod>>;
    async fn create_pod(&self, pod: &Pod) -> kube::Result<Pod>;
    async fn delete_pod(&self, name: &str, grace_period_seconds: u32) -> kube::Result<()>;
}

/// Wrapper around `kube::Client` scoped to a single namespace
#[derive(Clone)]
pub struct K8sClient {
    client: Client,
    namespace: String,
}

impl K8sClient {
    /// Create a client for the given namespace, honoring an explicit
    /// kubeconfig context when one is provided; otherwise configuration is
    /// inferred from the environment (kubeconfig or in-cluster).
    #[instrument(skip_all)]
    pub async fn new(context: Option<&str>, namespace: &str) -> anyhow::Result<Self> {
        let config = match context {
            Some(context) => {
                let options = KubeConfigOptions {
                    context: Some(context.to_string()),
                    ..Default::default()
                };
                Config::from_kubeconfig(&options).await?
            }
            None => Config::infer().await?,
        };
        let client = Client::try_from(config)?;

        info!(namespace, "Connected to Kubernetes cluster");

        Ok(Self {
            client,
            namespace: namespace.to_string(),
        })
    }

    /// Get the namespace this client operates in
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Get a typed API for pods in the configured namespace
    fn pods(&self) -> Api<Pod> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
}

#[async_trait]
impl PodApi for K8sClient {
    async fn read_pod(&self, name: &str) -> kube::Result<Pod> {
        self.pods().get(name).await
    }

    async fn list_pods(&self, label_selector: &str) -> kube::Result<Vec<Pod>> {
        let list = self
            .pods()
            .list(&ListParams::default().labels(label_selector))
            .await?;
        Ok(list.items)
    }

    #[instrument(skip(self, pod), fields(pod_name = %pod.metadata.name.as_deref().unwrap_or("unknown")))]
    async fn create_pod(&self, pod: &Pod) -> kube::Result<Pod> {
        let created = self.pods().create(&PostParams::default(), pod).await?;
        info!("Created pod");
        Ok(created)
    }

    #[instrument(skip(self))]
    async fn delete_pod(&self, name: &str, grace_period_seconds: u32) -> kube::Result<()> {
        let params = DeleteParams {
            grace_period_seconds: Some(grace_period_seconds),
            ..Default::default()
        };
        self.pods().delete(name, &params).await?;
        info!(name, "Deleted pod");
        Ok(())
    }
}
