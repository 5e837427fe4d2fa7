// src/grid/backend.rs

//! Pluggable grid backend abstraction.
//!
//! The scheduler talks to a `GridBackend` instead of spawning processes
//! itself. This makes it easy to swap in a fake grid in tests while keeping
//! the production runner in [`runner`](super::runner).
//!
//! - `ProcessGrid` is the implementation used by `gogo`. Each job runs as a
//!   child process (wrapped by the SGE/LSF submit tool when configured) in
//!   its own Tokio task.
//! - Tests can provide their own `GridBackend` that, for example, records
//!   which jobs were submitted and directly emits `JobCompletion`s.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::errors::{GogoError, Result};
use crate::grid::runner::run_job;
use crate::grid::submit::SubmitPolicy;
use crate::grid::{GridJob, JobCompletion};

/// Trait abstracting how prepared jobs are executed.
///
/// Submission returns as soon as the job is handed off; completion arrives
/// later on the channel the backend was built with.
pub trait GridBackend: Send {
    fn submit(&mut self, job: GridJob) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Stop every job still running. No completions are sent for them.
    fn abort_all(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Internal handle for a running job process.
struct ActiveJob {
    cancel: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

/// Grid backend that runs jobs as child processes.
pub struct ProcessGrid {
    completions: mpsc::Sender<JobCompletion>,
    policy: SubmitPolicy,
    active: HashMap<String, ActiveJob>,
}

impl ProcessGrid {
    pub fn new(completions: mpsc::Sender<JobCompletion>, policy: SubmitPolicy) -> Self {
        Self {
            completions,
            policy,
            active: HashMap::new(),
        }
    }

    /// Number of job processes that have not finished yet.
    pub fn running(&self) -> usize {
        self.active
            .values()
            .filter(|a| !a.handle.is_finished())
            .count()
    }

    fn forget_finished(&mut self) {
        self.active.retain(|_, a| !a.handle.is_finished());
    }
}

impl GridBackend for ProcessGrid {
    fn submit(&mut self, job: GridJob) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.forget_finished();
            if self.active.contains_key(&job.name) {
                return Err(GogoError::Internal(format!(
                    "gadget '{}' submitted while already running",
                    job.name
                )));
            }

            let command = self.policy.command_for(&job);
            let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
            let completions = self.completions.clone();
            let name = job.name.clone();
            let spawn_name = name.clone();

            let handle = tokio::spawn(async move {
                run_job(job, command, completions, cancel_rx).await;
                debug!(gadget = %spawn_name, "job runner future finished");
            });

            self.active.insert(
                name,
                ActiveJob {
                    cancel: Some(cancel_tx),
                    handle,
                },
            );
            Ok(())
        })
    }

    fn abort_all(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.forget_finished();
            if !self.active.is_empty() {
                info!(jobs = self.active.len(), "aborting running jobs");
            }

            for (name, mut job) in self.active.drain() {
                if let Some(cancel) = job.cancel.take() {
                    if cancel.send(()).is_err() {
                        debug!(gadget = %name, "job already finished while aborting");
                    }
                }
                if let Err(e) = job.handle.await {
                    debug!(gadget = %name, error = %e, "job runner task ended abnormally");
                }
            }
            Ok(())
        })
    }
}
