//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Global daemon settings
    #[serde(default)]
    pub daemon: RawDaemonConfig,

    /// Stale feature branch policies
    #[serde(default)]
    pub policies: Vec<RawPolicy>,
}

/// Daemon-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawDaemonConfig {
    /// Data directory for the audit store
    pub data_dir: Option<PathBuf>,

    /// kubectl program (default: "kubectl" from PATH)
    pub kubectl: Option<PathBuf>,

    /// kubeconfig context to use instead of the current one
    pub kube_context: Option<String>,

    /// Timeout for a single kubectl invocation
    pub command_timeout_seconds: Option<u64>,
}

/// Raw policy definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawPolicy {
    /// Policy name
    pub name: String,

    /// Namespace the policy object lives in (default: "default")
    pub namespace: Option<String>,

    /// Substring identifying feature branch resources
    pub namespace_substring: String,

    /// Age threshold in whole days
    pub after_days_without_deploy: i64,

    /// Delay between passes, in minutes
    #[serde(default = "default_check_every_minutes")]
    pub check_every_minutes: i64,
}

/// Default pass interval, in minutes
pub const DEFAULT_CHECK_EVERY_MINUTES: i64 = 30;

fn default_check_every_minutes() -> i64 {
    DEFAULT_CHECK_EVERY_MINUTES
}
