//! Reconciliation engine
//!
//! One call to [`Reconciler::reconcile`] is one complete pass for one policy
//! instance: load the policy, list candidates, delete every stale candidate
//! and report when the policy should be evaluated again. Nothing is carried
//! over between passes.

use chrono::{DateTime, Utc};
use sfb_platform_api::{ActionExecutor, Inventory, PlatformError, PolicyStore};
use sfb_store::{AuditEvent, AuditEventType, Store};
use sfb_util::{Clock, PassId, PolicyRef, ResourceName};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{Verdict, evaluate};

/// Errors that abort a pass
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to list candidate resources: {source}")]
    InventoryList {
        #[source]
        source: PlatformError,
    },

    #[error("failed to delete resource '{resource}': {source}")]
    Delete {
        resource: ResourceName,
        /// Resources deleted earlier in the same pass; they stay deleted
        deleted: Vec<ResourceName>,
        #[source]
        source: PlatformError,
    },

    #[error("pass cancelled after {} deletion(s)", deleted.len())]
    Cancelled { deleted: Vec<ResourceName> },
}

impl ReconcileError {
    /// Resources deleted by the pass before it aborted
    pub fn deleted(&self) -> &[ResourceName] {
        match self {
            Self::InventoryList { .. } => &[],
            Self::Delete { deleted, .. } | Self::Cancelled { deleted } => deleted,
        }
    }
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Result of a successful pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub pass_id: PassId,

    /// When to run the next pass; None when the policy could not be loaded
    pub requeue_after: Option<Duration>,

    /// Resources deleted during the pass, in deletion order
    pub deleted: Vec<ResourceName>,
}

impl ReconcileOutcome {
    fn policy_unavailable(pass_id: PassId) -> Self {
        Self {
            pass_id,
            requeue_after: None,
            deleted: Vec::new(),
        }
    }
}

/// Settings fixed for the lifetime of the engine
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileSettings {
    /// Treat every managed resource as stale regardless of age
    pub debug: bool,
}

/// The reconciliation engine
pub struct Reconciler {
    policies: Arc<dyn PolicyStore>,
    inventory: Arc<dyn Inventory>,
    executor: Arc<dyn ActionExecutor>,
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    settings: ReconcileSettings,
}

impl Reconciler {
    pub fn new(
        policies: Arc<dyn PolicyStore>,
        inventory: Arc<dyn Inventory>,
        executor: Arc<dyn ActionExecutor>,
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        settings: ReconcileSettings,
    ) -> Self {
        if settings.debug {
            warn!("Debug mode enabled: every managed resource will be deleted regardless of age");
        }

        Self {
            policies,
            inventory,
            executor,
            store,
            clock,
            settings,
        }
    }

    /// Run one pass for the policy at `reference`.
    ///
    /// A missing or unreadable policy is not an error: the pass ends with no
    /// requeue. Listing and deletion failures abort the pass; deletions
    /// already made are not undone. Cancelling `cancel` abandons an in-flight
    /// list or delete call and ends the pass.
    pub async fn reconcile(
        &self,
        reference: &PolicyRef,
        cancel: &CancellationToken,
    ) -> ReconcileResult<ReconcileOutcome> {
        let pass_id = PassId::new();

        let policy = match self.policies.get(reference).await {
            Ok(policy) => policy,
            Err(e) => {
                if e.is_not_found() {
                    warn!(policy = %reference, pass_id = %pass_id, "Policy not found, nothing to do");
                } else {
                    error!(policy = %reference, pass_id = %pass_id, error = %e, "Unable to load policy");
                }
                self.audit(AuditEventType::PolicyMissing {
                    pass_id,
                    policy: reference.clone(),
                    reason: e.to_string(),
                });
                return Ok(ReconcileOutcome::policy_unavailable(pass_id));
            }
        };

        info!(
            policy = %reference,
            pass_id = %pass_id,
            namespace_substring = %policy.namespace_substring,
            after_days_without_deploy = policy.after_days_without_deploy,
            check_every_minutes = policy.check_every_minutes,
            debug = self.settings.debug,
            "Reconciling policy"
        );

        let listed = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(self.cancelled(pass_id, reference, Vec::new()));
            }
            listed = self.inventory.list() => listed,
        };

        let candidates = match listed {
            Ok(candidates) => candidates,
            Err(source) => {
                error!(policy = %reference, pass_id = %pass_id, error = %source, "Unable to list candidate resources");
                let err = ReconcileError::InventoryList { source };
                self.audit_failure(pass_id, reference, &err);
                return Err(err);
            }
        };

        let now = self.clock.now();
        let mut deleted = Vec::new();

        for candidate in &candidates {
            if cancel.is_cancelled() {
                return Err(self.cancelled(pass_id, reference, deleted));
            }

            let verdict = evaluate(&policy, candidate, now, self.settings.debug);
            match verdict {
                Verdict::Unmanaged => continue,
                Verdict::Fresh { age_days } => {
                    debug!(
                        policy = %reference,
                        resource = %candidate.name,
                        age_days,
                        "Resource within threshold"
                    );
                    continue;
                }
                Verdict::Forced | Verdict::Stale { .. } => {}
            }

            info!(
                policy = %reference,
                pass_id = %pass_id,
                resource = %candidate.name,
                created_at = %candidate.created_at,
                verdict = ?verdict,
                "Deleting stale resource"
            );

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(self.cancelled(pass_id, reference, deleted));
                }
                result = self.executor.delete(&candidate.name) => result,
            };

            if let Err(source) = result {
                error!(
                    policy = %reference,
                    pass_id = %pass_id,
                    resource = %candidate.name,
                    error = %source,
                    "Unable to delete resource"
                );
                let err = ReconcileError::Delete {
                    resource: candidate.name.clone(),
                    deleted,
                    source,
                };
                self.audit_failure(pass_id, reference, &err);
                return Err(err);
            }

            self.audit_at(
                AuditEventType::ResourceDeleted {
                    pass_id,
                    policy: reference.clone(),
                    resource: candidate.name.clone(),
                    age_days: verdict.age_days(),
                },
                now,
            );
            info!(policy = %reference, resource = %candidate.name, "Resource deleted");
            deleted.push(candidate.name.clone());
        }

        let requeue_after = policy.check_every();
        info!(
            policy = %reference,
            pass_id = %pass_id,
            candidates = candidates.len(),
            deleted = deleted.len(),
            requeue_after_secs = requeue_after.as_secs(),
            "Pass complete"
        );
        self.audit_at(
            AuditEventType::PassCompleted {
                pass_id,
                policy: reference.clone(),
                deleted: deleted.len(),
                requeue_after,
            },
            now,
        );

        Ok(ReconcileOutcome {
            pass_id,
            requeue_after: Some(requeue_after),
            deleted,
        })
    }

    fn cancelled(
        &self,
        pass_id: PassId,
        reference: &PolicyRef,
        deleted: Vec<ResourceName>,
    ) -> ReconcileError {
        info!(policy = %reference, pass_id = %pass_id, deleted = deleted.len(), "Pass cancelled");
        let err = ReconcileError::Cancelled { deleted };
        self.audit_failure(pass_id, reference, &err);
        err
    }

    fn audit_failure(&self, pass_id: PassId, reference: &PolicyRef, err: &ReconcileError) {
        self.audit(AuditEventType::PassFailed {
            pass_id,
            policy: reference.clone(),
            reason: err.to_string(),
        });
    }

    fn audit(&self, event: AuditEventType) {
        self.audit_at(event, self.clock.now());
    }

    // Audit trail failures never fail the pass.
    fn audit_at(&self, event: AuditEventType, at: DateTime<Utc>) {
        if let Err(e) = self.store.append_audit(AuditEvent::at(event, at)) {
            warn!(error = %e, "Failed to append audit event");
        }
    }
}
