//! Audit event types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sfb_util::{PassId, PolicyRef, ResourceName};
use std::time::Duration;

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Daemon started
    DaemonStarted { policy_count: usize },

    /// Daemon stopped
    DaemonStopped,

    /// Config reload requested
    ConfigReloaded { success: bool, policy_count: usize },

    /// The policy of a pass could not be loaded
    PolicyMissing {
        pass_id: PassId,
        policy: PolicyRef,
        reason: String,
    },

    /// A stale resource was deleted
    ResourceDeleted {
        pass_id: PassId,
        policy: PolicyRef,
        resource: ResourceName,
        /// Whole days since creation; None when forced by debug mode
        age_days: Option<i64>,
    },

    /// Pass finished and asked to be requeued
    PassCompleted {
        pass_id: PassId,
        policy: PolicyRef,
        deleted: usize,
        requeue_after: Duration,
    },

    /// Pass aborted
    PassFailed {
        pass_id: PassId,
        policy: PolicyRef,
        reason: String,
    },
}

impl AuditEventType {
    /// Policy this event concerns, if any
    pub fn policy(&self) -> Option<&PolicyRef> {
        match self {
            Self::PolicyMissing { policy, .. }
            | Self::ResourceDeleted { policy, .. }
            | Self::PassCompleted { policy, .. }
            | Self::PassFailed { policy, .. } => Some(policy),
            Self::DaemonStarted { .. } | Self::DaemonStopped | Self::ConfigReloaded { .. } => None,
        }
    }
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Utc>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self::at(event, Utc::now())
    }

    /// Event stamped with an explicit time
    pub fn at(event: AuditEventType, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp,
            event,
        }
    }
}
