// src/gadget/mod.rs

//! Gadgets: schedulable units of work.
//!
//! A gadget declares one phase and goes through a fixed lifecycle driven by
//! the scheduler:
//! 1. `check_dependencies`: must it run at all?
//! 2. `prepare`: turn configuration into a job command (may register more
//!    gadgets into the context).
//! 3. `pre_launch`: last-moment coordination before submission.
//! 4. `completed`: interpret the exit status.
//!
//! - [`command`] holds the `Command` type and job script rendering.
//! - [`kinds`] holds the concrete gadgets.

pub mod command;
pub mod kinds;

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::errors::{GogoError, Result};
use crate::grid::{GridJob, JobOutcome};
use crate::schedule::SchedulerContext;
use crate::types::Phase;

pub use command::{Command, render_script, shell_quote};

/// The mutable job side of a gadget, filled in by `prepare`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobSpec {
    /// Command line handed to the grid. `None` means nothing to run.
    pub cmd: Option<String>,
    /// Prepared but not submitted.
    pub do_not_launch: bool,
    /// Transient artifacts, deleted by the flush at the end of the run.
    pub turds: Vec<PathBuf>,
    pub cwd: Option<PathBuf>,
    pub queue: Option<String>,
    pub resources: Vec<String>,
    pub interactive: bool,
    pub modules: Vec<String>,
    pub log: Option<PathBuf>,
}

impl JobSpec {
    /// Whether the scheduler should submit this job.
    pub fn is_launchable(&self) -> bool {
        !self.do_not_launch && self.cmd.as_deref().is_some_and(|c| !c.trim().is_empty())
    }

    pub fn grid_job(&self, name: &str) -> Option<GridJob> {
        let cmd = self.cmd.clone()?;
        Some(GridJob {
            name: name.to_string(),
            cmd,
            cwd: self.cwd.clone(),
            queue: self.queue.clone(),
            resources: self.resources.clone(),
            interactive: self.interactive,
            log: self.log.clone(),
        })
    }
}

/// Answer of `pre_launch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchGate {
    Ready,
    /// Hold the launch until these gadgets have completed. Names that are
    /// not part of the same batch are ignored.
    WaitFor(Vec<String>),
}

pub trait Gadget: Send + fmt::Debug {
    /// Unique display name.
    fn name(&self) -> &str;

    fn phase(&self) -> Phase;

    fn job(&self) -> &JobSpec;

    fn job_mut(&mut self) -> &mut JobSpec;

    /// Returns true if this gadget must run, false if it can be skipped.
    ///
    /// The scheduler context caches the answer, so this is called at most
    /// once per run.
    fn check_dependencies(&mut self, _ctx: &mut SchedulerContext) -> Result<bool> {
        Ok(true)
    }

    /// The commands this gadget runs. Empty means nothing to submit.
    fn create_commands(&mut self, _ctx: &mut SchedulerContext) -> Result<Vec<Command>> {
        Ok(Vec::new())
    }

    /// Materialize the job command. Defaults to [`install_commands`].
    fn prepare(&mut self, ctx: &mut SchedulerContext) -> Result<()> {
        install_commands(self, ctx)
    }

    fn pre_launch(&mut self, _ctx: &SchedulerContext) -> Result<LaunchGate> {
        Ok(LaunchGate::Ready)
    }

    /// Called once the grid reports this gadget's exit status.
    fn completed(&mut self, outcome: JobOutcome, _ctx: &mut SchedulerContext) -> Result<()> {
        check_outcome(self.name(), outcome, None)
    }
}

/// Render a gadget's commands into `<gogo_dir>/.<name>.sh`, record the script
/// as a turd and point the job at it.
///
/// No commands leaves the job without a command, so the scheduler drops it.
pub fn install_commands<G>(gadget: &mut G, ctx: &mut SchedulerContext) -> Result<()>
where
    G: Gadget + ?Sized,
{
    let commands = gadget.create_commands(ctx)?;
    let name = gadget.name().to_string();
    if commands.is_empty() {
        debug!(gadget = %name, "no commands");
        gadget.job_mut().cmd = None;
        return Ok(());
    }

    let script = render_script(&commands, &ctx.project().module_tool, &gadget.job().modules);
    let path = ctx.project().script_path(&name);
    let fs = ctx.fs();
    fs.write(&path, script.as_bytes())?;
    fs.set_executable(&path)?;
    debug!(gadget = %name, script = %path.display(), commands = commands.len(), "job script written");
    info!("Running {name}");

    let job = gadget.job_mut();
    job.cmd = Some(format!("sh {}", shell_quote(&path.to_string_lossy())));
    job.turds.push(path);
    Ok(())
}

/// Remove the done marker of a failed job and build the failure detail.
///
/// A marker that cannot be removed is named in the detail next to the log.
pub fn failure_detail(
    ctx: &mut SchedulerContext,
    marker: Option<&Path>,
    log: Option<&Path>,
) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(log) = log {
        parts.push(format!("See {}", log.display()));
    }
    if let Some(marker) = marker {
        if let Err(err) = ctx.remove_marker(marker) {
            warn!(marker = %marker.display(), error = %err, "could not remove done marker");
            parts.push(err.to_string());
        }
    }
    (!parts.is_empty()).then(|| parts.join(". "))
}

/// Turn a non-zero exit status into [`GogoError::GadgetFailed`].
pub fn check_outcome(name: &str, outcome: JobOutcome, detail: Option<String>) -> Result<()> {
    match outcome {
        JobOutcome::Success => Ok(()),
        JobOutcome::Failed(code) => Err(GogoError::GadgetFailed {
            name: name.to_string(),
            code,
            detail,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launchable_needs_a_command_and_no_hold() {
        let mut job = JobSpec::default();
        assert!(!job.is_launchable());
        job.cmd = Some("sh /p/.gogo/.x.sh".into());
        assert!(job.is_launchable());
        job.do_not_launch = true;
        assert!(!job.is_launchable());
    }

    #[test]
    fn failure_carries_name_and_code() {
        assert!(check_outcome("simv", JobOutcome::Success, None).is_ok());
        let err = check_outcome("simv", JobOutcome::Failed(3), Some("see sim.log".into()))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Gadget simv failed with exit status 3. see sim.log"
        );
        assert!(err.is_gadget_failure());
    }
}
