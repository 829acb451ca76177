//! Platform collaborator traits

use async_trait::async_trait;
use sfb_config::StaleBranchPolicy;
use sfb_util::{PolicyRef, ResourceName};
use std::time::Duration;
use thiserror::Error;

use crate::CandidateResource;

/// Errors from platform operations
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Command failed ({status}): {stderr}")]
    CommandFailed { status: String, stderr: String },

    #[error("Command timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed platform data: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlatformError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type PlatformResult<T> = Result<T, PlatformError>;

/// Source of policy definitions
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Load a policy by reference.
    ///
    /// Returns [`PlatformError::NotFound`] when no such policy exists.
    async fn get(&self, reference: &PolicyRef) -> PlatformResult<StaleBranchPolicy>;
}

/// Enumerates every resource visible to the controller
#[async_trait]
pub trait Inventory: Send + Sync {
    /// List all candidate resources. Membership filtering is the caller's job.
    async fn list(&self) -> PlatformResult<Vec<CandidateResource>>;
}

/// Performs actions on resources
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Delete a resource. Not transactional; there is no undo.
    async fn delete(&self, name: &ResourceName) -> PlatformResult<()>;
}
