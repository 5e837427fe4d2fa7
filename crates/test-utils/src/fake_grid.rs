use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::debug;

use gogo::errors::Result;
use gogo::grid::{GridBackend, GridJob, JobCompletion, JobOutcome};

/// A fake grid that:
/// - records every submitted job
/// - reports a completion for it right away (success unless told otherwise)
/// - counts `abort_all` calls.
pub struct FakeGrid {
    completions: mpsc::Sender<JobCompletion>,
    submitted: Arc<Mutex<Vec<GridJob>>>,
    exit_codes: HashMap<String, i32>,
    aborts: Arc<AtomicUsize>,
}

impl FakeGrid {
    pub fn new(
        completions: mpsc::Sender<JobCompletion>,
        submitted: Arc<Mutex<Vec<GridJob>>>,
    ) -> Self {
        Self {
            completions,
            submitted,
            exit_codes: HashMap::new(),
            aborts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Report `code` for the job named `name`.
    pub fn with_exit_code(mut self, name: &str, code: i32) -> Self {
        self.exit_codes.insert(name.to_string(), code);
        self
    }

    pub fn aborts(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.aborts)
    }
}

impl GridBackend for FakeGrid {
    fn submit(&mut self, job: GridJob) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.completions.clone();
        let submitted = Arc::clone(&self.submitted);
        let code = self.exit_codes.get(&job.name).copied().unwrap_or(0);

        Box::pin(async move {
            let name = job.name.clone();
            {
                let mut guard = submitted.lock().unwrap();
                guard.push(job);
            }

            // Completions are delivered from a task so a large batch cannot
            // fill the channel while the scheduler is still submitting.
            tokio::spawn(async move {
                let done = JobCompletion {
                    job: name,
                    outcome: JobOutcome::from_code(code),
                };
                if tx.send(done).await.is_err() {
                    debug!("completion receiver dropped");
                }
            });
            Ok(())
        })
    }

    fn abort_all(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.aborts.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }
}

/// Names of the jobs submitted so far, in order.
pub fn submitted_names(submitted: &Arc<Mutex<Vec<GridJob>>>) -> Vec<String> {
    submitted
        .lock()
        .unwrap()
        .iter()
        .map(|j| j.name.clone())
        .collect()
}
