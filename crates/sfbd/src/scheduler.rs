//! Per-policy pass scheduling
//!
//! Each policy instance gets one worker task, so passes for the same policy
//! never overlap. A worker runs a pass, then sleeps for the requested delay.
//! Failed passes are retried with exponential backoff.

use sfb_core::{ReconcileError, Reconciler};
use sfb_util::PolicyRef;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Delay before the first retry of a failed pass
pub const RETRY_INITIAL: Duration = Duration::from_secs(5);

/// Upper bound on the retry delay
pub const RETRY_MAX: Duration = Duration::from_secs(300);

/// Exponential retry delay: 5s, 10s, 20s, ... capped at 5 minutes
#[derive(Debug, Clone)]
pub struct RetryBackoff {
    initial: Duration,
    max: Duration,
    current: Option<Duration>,
}

impl RetryBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: None,
        }
    }

    /// Delay to wait before the next retry
    pub fn next_delay(&mut self) -> Duration {
        let delay = match self.current {
            None => self.initial,
            Some(previous) => previous.saturating_mul(2).min(self.max),
        };
        self.current = Some(delay);
        delay
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}

impl Default for RetryBackoff {
    fn default() -> Self {
        Self::new(RETRY_INITIAL, RETRY_MAX)
    }
}

struct Worker {
    wake: Arc<Notify>,
    handle: JoinHandle<()>,
}

/// Owns one worker per policy instance
pub struct Scheduler {
    reconciler: Arc<Reconciler>,
    cancel: CancellationToken,
    workers: HashMap<PolicyRef, Worker>,
}

impl Scheduler {
    pub fn new(reconciler: Arc<Reconciler>, cancel: CancellationToken) -> Self {
        Self {
            reconciler,
            cancel,
            workers: HashMap::new(),
        }
    }

    /// Bring workers in line with the current set of policies.
    ///
    /// Every live worker is woken so it re-reads its policy immediately;
    /// workers whose policy disappeared find nothing and exit. Workers are
    /// started for references that have none.
    pub fn sync(&mut self, references: &[PolicyRef]) {
        self.workers.retain(|reference, worker| {
            if worker.handle.is_finished() {
                debug!(policy = %reference, "Pruning finished worker");
                false
            } else {
                worker.wake.notify_one();
                true
            }
        });

        for reference in references {
            if self.workers.contains_key(reference) {
                continue;
            }

            info!(policy = %reference, "Starting policy worker");
            let wake = Arc::new(Notify::new());
            let handle = tokio::spawn(run_worker(
                self.reconciler.clone(),
                reference.clone(),
                wake.clone(),
                self.cancel.child_token(),
            ));
            self.workers.insert(reference.clone(), Worker { wake, handle });
        }
    }

    /// Number of workers that have not exited
    pub fn active_workers(&self) -> usize {
        self.workers
            .values()
            .filter(|w| !w.handle.is_finished())
            .count()
    }

    /// Cancel every worker and wait for in-flight passes to stop
    pub async fn shutdown(self) {
        self.cancel.cancel();

        for (reference, worker) in self.workers {
            if let Err(e) = worker.handle.await {
                error!(policy = %reference, error = %e, "Policy worker panicked");
            }
        }
    }
}

async fn run_worker(
    reconciler: Arc<Reconciler>,
    reference: PolicyRef,
    wake: Arc<Notify>,
    cancel: CancellationToken,
) {
    let mut backoff = RetryBackoff::default();

    loop {
        let delay = match reconciler.reconcile(&reference, &cancel).await {
            Ok(outcome) => {
                backoff.reset();
                match outcome.requeue_after {
                    Some(delay) => delay,
                    None => {
                        info!(policy = %reference, "Policy unavailable, worker stopping until next reload");
                        return;
                    }
                }
            }
            Err(ReconcileError::Cancelled { .. }) => return,
            Err(e) => {
                let delay = backoff.next_delay();
                warn!(
                    policy = %reference,
                    error = %e,
                    deleted = e.deleted().len(),
                    retry_in_secs = delay.as_secs(),
                    "Pass failed, will retry"
                );
                delay
            }
        };

        debug!(policy = %reference, delay_secs = delay.as_secs(), "Next pass scheduled");

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = wake.notified() => {
                debug!(policy = %reference, "Worker woken early");
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
