//! Mock platform for testing

use async_trait::async_trait;
use sfb_config::StaleBranchPolicy;
use sfb_util::{PolicyRef, ResourceName};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::{
    ActionExecutor, CandidateResource, Inventory, PlatformError, PlatformResult, PolicyStore,
};

type DeleteHook = Box<dyn Fn(&ResourceName) + Send + Sync>;

/// In-memory platform implementing every collaborator trait
pub struct MockPlatform {
    policies: Arc<Mutex<HashMap<PolicyRef, StaleBranchPolicy>>>,
    resources: Arc<Mutex<Vec<CandidateResource>>>,
    deleted: Arc<Mutex<Vec<ResourceName>>>,
    list_calls: AtomicUsize,
    delete_hook: Mutex<Option<DeleteHook>>,
    stall_list: AtomicBool,
    stall_delete: Mutex<HashSet<ResourceName>>,

    /// Configure policy reads to fail with an internal error
    pub fail_policy_read: Arc<Mutex<bool>>,

    /// Configure list to fail
    pub fail_list: Arc<Mutex<bool>>,

    /// Resources whose deletion fails
    pub fail_delete: Arc<Mutex<HashSet<ResourceName>>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            policies: Arc::new(Mutex::new(HashMap::new())),
            resources: Arc::new(Mutex::new(Vec::new())),
            deleted: Arc::new(Mutex::new(Vec::new())),
            list_calls: AtomicUsize::new(0),
            delete_hook: Mutex::new(None),
            stall_list: AtomicBool::new(false),
            stall_delete: Mutex::new(HashSet::new()),
            fail_policy_read: Arc::new(Mutex::new(false)),
            fail_list: Arc::new(Mutex::new(false)),
            fail_delete: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn with_policy(self, policy: StaleBranchPolicy) -> Self {
        self.put_policy(policy);
        self
    }

    pub fn with_resource(self, resource: CandidateResource) -> Self {
        self.add_resource(resource);
        self
    }

    /// Create or replace a policy
    pub fn put_policy(&self, policy: StaleBranchPolicy) {
        self.policies
            .lock()
            .unwrap()
            .insert(policy.reference.clone(), policy);
    }

    pub fn remove_policy(&self, reference: &PolicyRef) {
        self.policies.lock().unwrap().remove(reference);
    }

    pub fn add_resource(&self, resource: CandidateResource) {
        self.resources.lock().unwrap().push(resource);
    }

    /// Names of resources still present, in inventory order
    pub fn resource_names(&self) -> Vec<ResourceName> {
        self.resources
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.name.clone())
            .collect()
    }

    /// Names deleted so far, in deletion order
    pub fn deleted(&self) -> Vec<ResourceName> {
        self.deleted.lock().unwrap().clone()
    }

    /// Number of times the inventory has been listed
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn set_fail_list(&self, fail: bool) {
        *self.fail_list.lock().unwrap() = fail;
    }

    pub fn set_fail_delete(&self, name: impl Into<ResourceName>) {
        self.fail_delete.lock().unwrap().insert(name.into());
    }

    /// Make list calls hang forever
    pub fn set_stall_list(&self, stall: bool) {
        self.stall_list.store(stall, Ordering::SeqCst);
    }

    /// Make deletion of `name` hang forever
    pub fn set_stall_delete(&self, name: impl Into<ResourceName>) {
        self.stall_delete.lock().unwrap().insert(name.into());
    }

    /// Run `hook` after every successful deletion
    pub fn set_delete_hook(&self, hook: impl Fn(&ResourceName) + Send + Sync + 'static) {
        *self.delete_hook.lock().unwrap() = Some(Box::new(hook));
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PolicyStore for MockPlatform {
    async fn get(&self, reference: &PolicyRef) -> PlatformResult<StaleBranchPolicy> {
        if *self.fail_policy_read.lock().unwrap() {
            return Err(PlatformError::Internal("Mock policy read failure".into()));
        }

        self.policies
            .lock()
            .unwrap()
            .get(reference)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(reference.to_string()))
    }
}

#[async_trait]
impl Inventory for MockPlatform {
    async fn list(&self) -> PlatformResult<Vec<CandidateResource>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if self.stall_list.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        if *self.fail_list.lock().unwrap() {
            return Err(PlatformError::Internal("Mock list failure".into()));
        }

        Ok(self.resources.lock().unwrap().clone())
    }
}

#[async_trait]
impl ActionExecutor for MockPlatform {
    async fn delete(&self, name: &ResourceName) -> PlatformResult<()> {
        let stall = self.stall_delete.lock().unwrap().contains(name);
        if stall {
            std::future::pending::<()>().await;
        }

        if self.fail_delete.lock().unwrap().contains(name) {
            return Err(PlatformError::Internal(format!("Mock delete failure for {}", name)));
        }

        {
            let mut resources = self.resources.lock().unwrap();
            let before = resources.len();
            resources.retain(|r| &r.name != name);
            if resources.len() == before {
                return Err(PlatformError::NotFound(name.to_string()));
            }
        }

        self.deleted.lock().unwrap().push(name.clone());

        if let Some(hook) = self.delete_hook.lock().unwrap().as_ref() {
            hook(name);
        }

        Ok(())
    }
}
