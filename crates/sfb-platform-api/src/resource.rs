//! Candidate resources as reported by an inventory

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sfb_util::ResourceName;

/// An inventory entry that may be managed by a policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateResource {
    pub name: ResourceName,
    pub created_at: DateTime<Utc>,
}

impl CandidateResource {
    pub fn new(name: impl Into<ResourceName>, created_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            created_at,
        }
    }
}
