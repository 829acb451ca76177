//! Configuration-backed policy store

use async_trait::async_trait;
use sfb_config::{Config, StaleBranchPolicy};
use sfb_platform_api::{PlatformError, PlatformResult, PolicyStore};
use sfb_util::PolicyRef;
use std::collections::BTreeMap;
use std::sync::RwLock;
use tracing::info;

/// Policies loaded from the configuration file, swappable on reload
#[derive(Debug, Default)]
pub struct SharedPolicyStore {
    policies: RwLock<BTreeMap<PolicyRef, StaleBranchPolicy>>,
}

impl SharedPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config) -> Self {
        let store = Self::new();
        store.replace(config);
        store
    }

    /// Replace every policy with the ones in `config`.
    ///
    /// Returns the references now present, in sorted order.
    pub fn replace(&self, config: &Config) -> Vec<PolicyRef> {
        let policies: BTreeMap<_, _> = config
            .policies
            .iter()
            .map(|p| (p.reference.clone(), p.clone()))
            .collect();
        let references: Vec<_> = policies.keys().cloned().collect();

        let mut guard = self.policies.write().unwrap_or_else(|e| e.into_inner());
        *guard = policies;

        info!(policy_count = references.len(), "Policies replaced");
        references
    }

    /// References of all known policies, in sorted order
    pub fn references(&self) -> Vec<PolicyRef> {
        self.policies
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PolicyStore for SharedPolicyStore {
    async fn get(&self, reference: &PolicyRef) -> PlatformResult<StaleBranchPolicy> {
        let policies = self
            .policies
            .read()
            .map_err(|_| PlatformError::Internal("policy store lock poisoned".into()))?;

        policies
            .get(reference)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(reference.to_string()))
    }
}
