//! Validated policy structures

use crate::schema::{RawConfig, RawDaemonConfig, RawPolicy};
use crate::validation::policy_ref;
use sfb_util::PolicyRef;
use std::path::PathBuf;
use std::time::Duration;

/// Default kubectl invocation timeout
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Validated configuration ready for use by the daemon
#[derive(Debug, Clone)]
pub struct Config {
    /// Daemon configuration
    pub daemon: DaemonConfig,

    /// Validated policies
    pub policies: Vec<StaleBranchPolicy>,
}

impl Config {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            daemon: DaemonConfig::from_raw(raw.daemon),
            policies: raw.policies.into_iter().map(StaleBranchPolicy::from_raw).collect(),
        }
    }
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// None means the platform default data directory
    pub data_dir: Option<PathBuf>,
    pub kubectl: PathBuf,
    pub kube_context: Option<String>,
    pub command_timeout: Duration,
}

impl DaemonConfig {
    fn from_raw(raw: RawDaemonConfig) -> Self {
        Self {
            data_dir: raw.data_dir,
            kubectl: raw.kubectl.unwrap_or_else(|| PathBuf::from("kubectl")),
            kube_context: raw.kube_context,
            command_timeout: raw
                .command_timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_COMMAND_TIMEOUT),
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self::from_raw(RawDaemonConfig::default())
    }
}

/// A stale feature branch policy.
///
/// Resources whose name contains `namespace_substring` are managed by the
/// policy and removed once they are older than `after_days_without_deploy`
/// whole days. The policy is re-evaluated every `check_every_minutes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleBranchPolicy {
    pub reference: PolicyRef,
    pub namespace_substring: String,
    pub after_days_without_deploy: u32,
    pub check_every_minutes: u32,
}

impl StaleBranchPolicy {
    pub fn new(
        reference: PolicyRef,
        namespace_substring: impl Into<String>,
        after_days_without_deploy: u32,
        check_every_minutes: u32,
    ) -> Self {
        Self {
            reference,
            namespace_substring: namespace_substring.into(),
            after_days_without_deploy,
            check_every_minutes,
        }
    }

    fn from_raw(raw: RawPolicy) -> Self {
        Self {
            reference: policy_ref(&raw),
            namespace_substring: raw.namespace_substring,
            after_days_without_deploy: to_u32(raw.after_days_without_deploy),
            check_every_minutes: to_u32(raw.check_every_minutes),
        }
    }

    /// Delay before the next pass
    pub fn check_every(&self) -> Duration {
        Duration::from_secs(u64::from(self.check_every_minutes) * 60)
    }
}

// Range is enforced by validation; clamping keeps the conversion total.
fn to_u32(value: i64) -> u32 {
    value.clamp(1, i64::from(u32::MAX)) as u32
}
