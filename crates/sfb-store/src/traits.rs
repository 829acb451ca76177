//! Store trait definitions

use sfb_util::PolicyRef;

use crate::{AuditEvent, StoreResult};

/// Main store trait
pub trait Store: Send + Sync {
    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    /// Get recent audit events concerning one policy, newest first
    fn get_policy_audits(&self, policy: &PolicyRef, limit: usize) -> StoreResult<Vec<AuditEvent>>;
}
