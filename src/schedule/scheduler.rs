// src/schedule/scheduler.rs

use std::collections::BTreeMap;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::errors::{GogoError, Result};
use crate::gadget::LaunchGate;
use crate::grid::{GridBackend, JobCompletion, JobOutcome};
use crate::schedule::batch::BatchState;
use crate::schedule::context::{GadgetId, SchedulerContext};
use crate::types::{Phase, PhaseSet};

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Gadgets handed to the grid, per phase, in submission order.
    pub submitted: BTreeMap<Phase, Vec<String>>,
    /// Gadgets whose dependency check said they could be skipped.
    pub skipped: Vec<String>,
    /// Gadgets prepared without a launchable command.
    pub dropped: Vec<String>,
}

impl RunReport {
    pub fn submitted_in(&self, phase: Phase) -> &[String] {
        self.submitted.get(&phase).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn total_submitted(&self) -> usize {
        self.submitted.values().map(Vec::len).sum()
    }

    /// All submitted gadget names in submission order.
    pub fn submission_order(&self) -> Vec<&str> {
        self.submitted
            .values()
            .flat_map(|names| names.iter().map(String::as_str))
            .collect()
    }
}

/// Sweeps phases in order and drives every gadget through its lifecycle.
///
/// Within a phase, gadgets are checked and prepared one at a time in
/// registration order; the launchable ones are submitted as a batch and the
/// phase does not end before the whole batch has completed. The first
/// failing completion aborts the remaining jobs and ends the run.
pub struct Scheduler<G: GridBackend> {
    grid: G,
    completions: mpsc::Receiver<JobCompletion>,
}

impl<G: GridBackend> Scheduler<G> {
    /// `completions` must be the receiving end of the channel `grid` reports
    /// to.
    pub fn new(grid: G, completions: mpsc::Receiver<JobCompletion>) -> Self {
        Self { grid, completions }
    }

    pub fn grid(&self) -> &G {
        &self.grid
    }

    pub async fn run(&mut self, ctx: &mut SchedulerContext, phases: &PhaseSet) -> Result<RunReport> {
        let mut report = RunReport::default();

        for phase in Phase::ALL {
            if !phases.contains(phase) {
                if ctx.has_queued(phase) {
                    debug!(phase = %phase, "phase not selected; skipping its gadgets");
                }
                continue;
            }
            ctx.begin_phase(phase)?;
            self.sweep(ctx, phase, &mut report).await?;
        }

        info!(submitted = report.total_submitted(), "run complete");
        Ok(report)
    }

    /// Drain `phase`'s queue until nothing new shows up.
    async fn sweep(
        &mut self,
        ctx: &mut SchedulerContext,
        phase: Phase,
        report: &mut RunReport,
    ) -> Result<()> {
        let mut wave_no = 0;
        loop {
            let wave = ctx.take_queue(phase);
            if wave.is_empty() {
                break;
            }
            wave_no += 1;
            debug!(phase = %phase, wave = wave_no, gadgets = wave.len(), "sweeping");

            let mut survivors = Vec::with_capacity(wave.len());
            for id in wave {
                if ctx.check(id)? {
                    survivors.push(id);
                } else {
                    info!(gadget = %ctx.name_of(id), "up to date; skipping");
                    report.skipped.push(ctx.name_of(id).to_string());
                }
            }

            for &id in &survivors {
                debug!(gadget = %ctx.name_of(id), phase = %phase, "preparing");
                ctx.prepare(id)?;
            }

            let mut batch = BatchState::new();
            for id in survivors {
                let name = ctx.name_of(id).to_string();
                if ctx.job(id).is_some_and(|job| job.is_launchable()) {
                    batch.push(id, name);
                } else {
                    debug!(gadget = %name, "nothing to launch");
                    report.dropped.push(name);
                }
            }
            if batch.is_empty() {
                continue;
            }

            self.run_batch(ctx, phase, batch, report).await?;
        }
        Ok(())
    }

    async fn run_batch(
        &mut self,
        ctx: &mut SchedulerContext,
        phase: Phase,
        mut batch: BatchState,
        report: &mut RunReport,
    ) -> Result<()> {
        let members: Vec<(GadgetId, String)> = batch.members();
        for (id, name) in &members {
            if let LaunchGate::WaitFor(names) = ctx.pre_launch(*id)? {
                batch.set_wait_for(name, names);
                let waits = batch.wait_list(name);
                if !waits.is_empty() {
                    info!(gadget = %name, waiting_for = ?waits, "holding launch");
                }
            }
        }

        loop {
            for (id, name) in batch.take_ready() {
                let Some(job) = ctx.job(id).and_then(|j| j.grid_job(&name)) else {
                    self.abort().await;
                    return Err(GogoError::Internal(format!(
                        "gadget '{name}' lost its command before launch"
                    )));
                };
                debug!(gadget = %name, phase = %phase, cmd = %job.cmd, "launching");
                if let Err(err) = self.grid.submit(job).await {
                    self.abort().await;
                    return Err(err);
                }
                report.submitted.entry(phase).or_default().push(name);
            }

            if batch.is_finished() {
                return Ok(());
            }
            if batch.is_stalled() {
                self.abort().await;
                return Err(GogoError::Internal(format!(
                    "gadgets in phase {phase} are waiting on each other: {:?}",
                    batch.pending()
                )));
            }

            let Some(done) = self.completions.recv().await else {
                return Err(GogoError::Internal(
                    "grid closed the completion channel".to_string(),
                ));
            };
            let Some(id) = batch.mark_done(&done.job) else {
                warn!(gadget = %done.job, "completion for a job that is not running; ignoring");
                continue;
            };

            match done.outcome {
                JobOutcome::Success => info!(gadget = %done.job, "completed"),
                JobOutcome::Failed(code) => warn!(gadget = %done.job, exit_code = code, "failed"),
            }
            if let Err(err) = ctx.completed(id, done.outcome) {
                error!(gadget = %done.job, error = %err, "aborting run");
                self.abort().await;
                return Err(err);
            }
        }
    }

    /// Kill every job still running on the grid.
    pub async fn abort(&mut self) {
        if let Err(err) = self.grid.abort_all().await {
            warn!(error = %err, "failed to abort running jobs");
        }
    }
}
