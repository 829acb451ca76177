//! sfbd - The stale feature-branch background service
//!
//! This is the main entry point for the sfbd service.
//! It wires together all the components:
//! - Configuration loading
//! - Store initialization
//! - Cluster adapter (kubectl)
//! - Reconciliation engine
//! - Per-policy scheduler

mod scheduler;

use anyhow::{Context, Result};
use clap::Parser;
use clap::builder::BoolValueParser;
use scheduler::Scheduler;
use sfb_config::{Config, load_config};
use sfb_core::{ReconcileSettings, Reconciler, SharedPolicyStore};
use sfb_platform_kubectl::KubectlCluster;
use sfb_store::{AuditEvent, AuditEventType, SqliteStore, Store};
use sfb_util::{
    PolicyRef, SystemClock, default_config_path, default_data_dir, is_mock_time_active,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// sfbd - Removes feature-branch namespaces nobody has deployed to in a while
#[derive(Parser, Debug)]
#[command(name = "sfbd")]
#[command(about = "Removes stale feature-branch namespaces", long_about = None)]
struct Args {
    /// Configuration file path (or set SFB_CONFIG env var)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set SFB_DATA_DIR env var)
    #[arg(short, long, env = "SFB_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Delete every matching namespace regardless of age (IS_DEBUG must be "true" or "false")
    #[arg(long, env = "IS_DEBUG", value_parser = BoolValueParser::new())]
    debug: bool,
}

/// Main service state
struct Service {
    config_path: PathBuf,
    policies: Arc<SharedPolicyStore>,
    store: Arc<dyn Store>,
    scheduler: Scheduler,
}

impl Service {
    fn new(args: &Args) -> Result<Self> {
        // Load configuration
        let config = load_config(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(
            config_path = %args.config.display(),
            policy_count = config.policies.len(),
            "Configuration loaded"
        );

        let data_dir = args
            .data_dir
            .clone()
            .or_else(|| config.daemon.data_dir.clone())
            .unwrap_or_else(default_data_dir);

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        // Initialize store
        let db_path = data_dir.join("sfbd.db");
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        store.append_audit(AuditEvent::new(AuditEventType::DaemonStarted {
            policy_count: config.policies.len(),
        }))?;

        let cluster = Arc::new(KubectlCluster::from_config(&config.daemon));
        info!(
            kubectl = %config.daemon.kubectl.display(),
            kube_context = config.daemon.kube_context.as_deref().unwrap_or("<current>"),
            timeout_secs = config.daemon.command_timeout.as_secs(),
            "Cluster adapter initialized"
        );

        if is_mock_time_active() {
            warn!("Mock time is active, ages are computed against a shifted clock");
        }

        let policies = Arc::new(SharedPolicyStore::from_config(&config));
        let reconciler = Arc::new(Reconciler::new(
            policies.clone(),
            cluster.clone(),
            cluster,
            store.clone(),
            Arc::new(SystemClock),
            ReconcileSettings { debug: args.debug },
        ));

        let scheduler = Scheduler::new(reconciler, CancellationToken::new());

        Ok(Self {
            config_path: args.config.clone(),
            policies,
            store,
            scheduler,
        })
    }

    async fn run(mut self) -> Result<()> {
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
        let mut sighup =
            signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

        self.scheduler.sync(&self.policies.references());

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }

                // SIGHUP: re-read policies without dropping in-flight passes
                _ = sighup.recv() => {
                    info!("Received SIGHUP, reloading configuration");
                    self.reload();
                }
            }
        }

        info!("Shutting down sfbd");
        self.scheduler.shutdown().await;

        if let Err(e) = self
            .store
            .append_audit(AuditEvent::new(AuditEventType::DaemonStopped))
        {
            warn!(error = %e, "Failed to log service shutdown");
        }

        info!("Shutdown complete");
        Ok(())
    }

    /// Reload policies from disk.
    ///
    /// Only the `[[policies]]` table is applied; `[daemon]` settings take
    /// effect on restart. A config that fails to load leaves the current
    /// policies in place.
    fn reload(&mut self) {
        let (success, policy_count) = match load_config(&self.config_path) {
            Ok(config) => {
                let references = self.apply(&config);
                (true, references.len())
            }
            Err(e) => {
                error!(
                    config_path = %self.config_path.display(),
                    error = %e,
                    "Config reload failed, keeping current policies"
                );
                (false, self.policies.references().len())
            }
        };

        if let Err(e) = self
            .store
            .append_audit(AuditEvent::new(AuditEventType::ConfigReloaded {
                success,
                policy_count,
            }))
        {
            warn!(error = %e, "Failed to log config reload");
        }
    }

    fn apply(&mut self, config: &Config) -> Vec<PolicyRef> {
        let references = self.policies.replace(config);
        self.scheduler.sync(&references);
        info!(
            policy_count = references.len(),
            active_workers = self.scheduler.active_workers(),
            "Configuration reloaded"
        );
        references
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if args.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), debug = args.debug, "sfbd starting");

    let service = Service::new(&args)?;
    service.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::sync::{Mutex, MutexGuard};

    // Args read IS_DEBUG and SFB_DATA_DIR, so parsing is serialised with
    // tests that change them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_lock() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    struct DebugEnv;

    impl DebugEnv {
        fn set(value: &str) -> Self {
            unsafe { std::env::set_var("IS_DEBUG", value) };
            DebugEnv
        }
    }

    impl Drop for DebugEnv {
        fn drop(&mut self) {
            unsafe { std::env::remove_var("IS_DEBUG") };
        }
    }

    #[test]
    fn test_args_defaults() {
        let _env = env_lock();
        let args = Args::try_parse_from(["sfbd", "--config", "/etc/sfbd/config.toml"]).unwrap();
        assert_eq!(args.config, PathBuf::from("/etc/sfbd/config.toml"));
        assert_eq!(args.log_level, "info");
        assert!(!args.log_json);
    }

    #[test]
    fn test_debug_flag() {
        let _env = env_lock();
        let args = Args::try_parse_from(["sfbd", "--debug"]).unwrap();
        assert!(args.debug);

        let args = Args::try_parse_from(["sfbd", "--log-level", "debug"]).unwrap();
        assert!(!args.debug);
    }

    #[test]
    fn test_debug_env_must_be_exactly_true() {
        let _env = env_lock();

        let _debug = DebugEnv::set("true");
        assert!(Args::try_parse_from(["sfbd"]).unwrap().debug);

        let _debug = DebugEnv::set("false");
        assert!(!Args::try_parse_from(["sfbd"]).unwrap().debug);

        for value in ["disabled", "1", "yes", "on"] {
            let _debug = DebugEnv::set(value);
            let parsed = Args::try_parse_from(["sfbd"]);
            assert!(
                parsed.is_err(),
                "IS_DEBUG={} must not parse, got {:?}",
                value,
                parsed.map(|a| a.debug)
            );
        }
    }

    #[test]
    fn test_service_starts_from_config() {
        let _env = env_lock();
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
            config_version = 1

            [[policies]]
            name = "cleanup"
            namespace_substring = "-pr-"
            after_days_without_deploy = 1
            "#,
        )
        .unwrap();

        let data_dir = dir.path().join("data");
        let args = Args::try_parse_from([
            OsString::from("sfbd"),
            OsString::from("--config"),
            config_path.into_os_string(),
            OsString::from("--data-dir"),
            data_dir.clone().into_os_string(),
        ])
        .unwrap();

        let service = Service::new(&args).unwrap();

        assert!(data_dir.join("sfbd.db").exists());
        assert_eq!(service.policies.references().len(), 1);

        let audits = service.store.get_recent_audits(10).unwrap();
        assert!(matches!(
            audits[0].event,
            AuditEventType::DaemonStarted { policy_count: 1 }
        ));
    }

    #[test]
    fn test_service_rejects_missing_config() {
        let _env = env_lock();
        let dir = tempfile::tempdir().unwrap();
        let args = Args::try_parse_from([
            OsString::from("sfbd"),
            OsString::from("--config"),
            dir.path().join("absent.toml").into_os_string(),
        ])
        .unwrap();

        assert!(Service::new(&args).is_err());
    }
}
