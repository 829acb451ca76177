//! Staleness predicate
//!
//! Decides, for one policy and one candidate resource, whether the resource
//! is managed by the policy and whether it has outlived the policy's age
//! threshold. Pure: the current time and the debug override are inputs.

use chrono::{DateTime, Utc};
use sfb_config::StaleBranchPolicy;
use sfb_platform_api::CandidateResource;
use sfb_util::whole_days_between;

/// Outcome of evaluating one resource against a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Name does not contain the policy's substring; never touched
    Unmanaged,
    /// Managed, and debug mode forces deletion regardless of age
    Forced,
    /// Managed and older than the threshold
    Stale { age_days: i64 },
    /// Managed but still within the threshold
    Fresh { age_days: i64 },
}

impl Verdict {
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Forced | Self::Stale { .. })
    }

    /// Truncated age in days, when age was considered
    pub fn age_days(&self) -> Option<i64> {
        match self {
            Self::Stale { age_days } | Self::Fresh { age_days } => Some(*age_days),
            Self::Unmanaged | Self::Forced => None,
        }
    }
}

/// Evaluate `resource` against `policy` at instant `now`.
///
/// Age is counted in whole days, truncated, and must be strictly greater
/// than `after_days_without_deploy`. With a 1-day threshold a resource is
/// kept until it is 48 hours old.
pub fn evaluate(
    policy: &StaleBranchPolicy,
    resource: &CandidateResource,
    now: DateTime<Utc>,
    debug: bool,
) -> Verdict {
    if !resource.name.contains(&policy.namespace_substring) {
        return Verdict::Unmanaged;
    }

    if debug {
        return Verdict::Forced;
    }

    let age_days = whole_days_between(resource.created_at, now);
    if age_days > i64::from(policy.after_days_without_deploy) {
        Verdict::Stale { age_days }
    } else {
        Verdict::Fresh { age_days }
    }
}

/// Whether `resource` should be deleted under `policy` at instant `now`
pub fn is_stale(
    policy: &StaleBranchPolicy,
    resource: &CandidateResource,
    now: DateTime<Utc>,
    debug: bool,
) -> bool {
    evaluate(policy, resource, now, debug).is_stale()
}
