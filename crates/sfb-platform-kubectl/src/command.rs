//! kubectl process invocation

use sfb_platform_api::{PlatformError, PlatformResult};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// How to run kubectl
#[derive(Debug, Clone)]
pub struct Kubectl {
    program: PathBuf,
    context: Option<String>,
    timeout: Duration,
}

impl Kubectl {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            context: None,
            timeout,
        }
    }

    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }

    /// Full argument list for `args`, including global flags
    pub fn argv(&self, args: &[&str]) -> Vec<String> {
        let mut argv = Vec::with_capacity(args.len() + 2);
        if let Some(context) = &self.context {
            argv.push("--context".to_string());
            argv.push(context.clone());
        }
        argv.extend(args.iter().map(|a| a.to_string()));
        argv
    }

    /// Run kubectl with `args` and return its stdout.
    ///
    /// A non-zero exit becomes [`PlatformError::CommandFailed`] carrying the
    /// trimmed stderr. The child is killed if the timeout elapses.
    pub async fn run(&self, args: &[&str]) -> PlatformResult<Vec<u8>> {
        let argv = self.argv(args);
        debug!(program = %self.program.display(), args = ?argv, "Running kubectl");

        let child = Command::new(&self.program)
            .args(&argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => return Err(PlatformError::Timeout(self.timeout)),
        };

        if !output.status.success() {
            return Err(PlatformError::CommandFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}
