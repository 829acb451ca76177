//! kubectl-backed inventory and action executor

use async_trait::async_trait;
use sfb_config::DaemonConfig;
use sfb_platform_api::{ActionExecutor, CandidateResource, Inventory, PlatformResult};
use sfb_util::ResourceName;
use tracing::{debug, info};

use crate::{Kubectl, parse_namespace_list};

const LIST_ARGS: [&str; 4] = ["get", "namespaces", "-o", "json"];

/// Arguments deleting one namespace without waiting for finalizers
pub fn delete_args(name: &ResourceName) -> [&str; 5] {
    ["delete", "namespace", name.as_str(), "--wait=false", "--ignore-not-found"]
}

/// Cluster namespaces as seen through kubectl
pub struct KubectlCluster {
    kubectl: Kubectl,
}

impl KubectlCluster {
    pub fn new(kubectl: Kubectl) -> Self {
        Self { kubectl }
    }

    /// Build from the daemon section of the configuration
    pub fn from_config(daemon: &DaemonConfig) -> Self {
        let kubectl = Kubectl::new(daemon.kubectl.clone(), daemon.command_timeout)
            .with_context(daemon.kube_context.clone());
        Self::new(kubectl)
    }
}

#[async_trait]
impl Inventory for KubectlCluster {
    async fn list(&self) -> PlatformResult<Vec<CandidateResource>> {
        let stdout = self.kubectl.run(&LIST_ARGS).await?;
        let candidates = parse_namespace_list(&stdout)?;
        debug!(count = candidates.len(), "Namespaces listed");
        Ok(candidates)
    }
}

#[async_trait]
impl ActionExecutor for KubectlCluster {
    async fn delete(&self, name: &ResourceName) -> PlatformResult<()> {
        self.kubectl.run(&delete_args(name)).await?;
        info!(namespace = %name, "Namespace deletion requested");
        Ok(())
    }
}
