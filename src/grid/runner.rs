// src/grid/runner.rs

//! Individual job process runner.

use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::grid::submit::SubmitCommand;
use crate::grid::{GridJob, JobCompletion, JobOutcome};

/// Run a single job process and send a [`JobCompletion`] when it exits.
///
/// - Errors before or while waiting (spawn failure, unwritable log file) are
///   reported as a failed completion with exit code -1.
/// - If the cancel channel fires, the child is killed and **no** completion
///   is sent; the scheduler is already unwinding at that point.
pub async fn run_job(
    job: GridJob,
    command: SubmitCommand,
    completions: mpsc::Sender<JobCompletion>,
    cancel_rx: oneshot::Receiver<()>,
) {
    let job_name = job.name.clone();
    if let Err(err) = run_job_inner(job, command, &completions, cancel_rx).await {
        error!(gadget = %job_name, error = %err, "job execution error");
        let _ = completions
            .send(JobCompletion {
                job: job_name,
                outcome: JobOutcome::Failed(-1),
            })
            .await;
    }
}

async fn run_job_inner(
    job: GridJob,
    command: SubmitCommand,
    completions: &mpsc::Sender<JobCompletion>,
    mut cancel_rx: oneshot::Receiver<()>,
) -> Result<()> {
    info!(
        gadget = %job.name,
        program = %command.program,
        cmd = %job.cmd,
        "submitting job"
    );

    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args).kill_on_drop(true);
    if let Some(cwd) = &job.cwd {
        cmd.current_dir(cwd);
    }

    let piped = if job.interactive {
        cmd.stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        false
    } else if let Some(log) = &job.log {
        if let Some(parent) = log.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating log dir {:?}", parent))?;
        }
        let out = std::fs::File::create(log)
            .with_context(|| format!("creating log file {:?}", log))?;
        let err = out
            .try_clone()
            .with_context(|| format!("duplicating log file handle {:?}", log))?;
        cmd.stdin(Stdio::null())
            .stdout(Stdio::from(out))
            .stderr(Stdio::from(err));
        false
    } else {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        true
    };

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for gadget '{}'", job.name))?;

    if piped {
        if let Some(stdout) = child.stdout.take() {
            forward_lines(job.name.clone(), "stdout", stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(job.name.clone(), "stderr", stderr);
        }
    }

    tokio::select! {
        status_res = child.wait() => {
            let status = status_res.with_context(|| {
                format!("waiting for process of gadget '{}'", job.name)
            })?;

            let code = status.code().unwrap_or(-1);
            let outcome = if status.success() {
                JobOutcome::Success
            } else {
                JobOutcome::Failed(code)
            };

            info!(
                gadget = %job.name,
                exit_code = code,
                success = status.success(),
                "job process exited"
            );

            completions
                .send(JobCompletion {
                    job: job.name.clone(),
                    outcome,
                })
                .await
                .with_context(|| {
                    format!("sending completion for gadget '{}' to scheduler", job.name)
                })?;
        }

        cancel = &mut cancel_rx => {
            match cancel {
                Ok(()) => {
                    info!(gadget = %job.name, "abort requested; killing job process");
                    if let Err(e) = child.kill().await {
                        warn!(gadget = %job.name, error = %e, "failed to kill job process");
                    }
                }
                Err(e) => {
                    debug!(
                        gadget = %job.name,
                        error = %e,
                        "cancel channel closed without explicit abort"
                    );
                    // Child will be killed on drop due to kill_on_drop(true).
                }
            }
        }
    }

    Ok(())
}

/// Log a child's output line by line at debug level so pipe buffers never
/// fill.
fn forward_lines<R>(name: String, stream: &'static str, reader: R)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(gadget = %name, stream, "{}", line);
        }
    });
}
