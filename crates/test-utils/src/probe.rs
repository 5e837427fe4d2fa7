#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use gogo::errors::Result;
use gogo::gadget::{Gadget, JobSpec, LaunchGate, check_outcome};
use gogo::grid::JobOutcome;
use gogo::schedule::SchedulerContext;
use gogo::types::Phase;

/// Shared record of lifecycle calls, as `"<call>:<gadget>"` strings.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

/// A scriptable gadget that records its lifecycle into a [`Journal`].
///
/// `prepare` sets the job command directly instead of writing a script, so
/// probes need no filesystem.
#[derive(Debug)]
pub struct ProbeGadget {
    name: String,
    phase: Phase,
    journal: Journal,
    job: JobSpec,

    must_run: bool,
    cmd: Option<String>,
    do_not_launch: bool,
    depends_on: Vec<String>,
    wait_for: Vec<String>,
    spawns: Vec<ProbeGadget>,
}

impl ProbeGadget {
    pub fn new(name: &str, phase: Phase, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            phase,
            journal: Arc::clone(journal),
            job: JobSpec::default(),
            must_run: true,
            cmd: Some(format!("run {name}")),
            do_not_launch: false,
            depends_on: Vec::new(),
            wait_for: Vec::new(),
            spawns: Vec::new(),
        }
    }

    /// Answer of `check_dependencies`, unless a dependency must run.
    pub fn must_run(mut self, val: bool) -> Self {
        self.must_run = val;
        self
    }

    /// Leave the job without a command.
    pub fn no_command(mut self) -> Self {
        self.cmd = None;
        self
    }

    pub fn do_not_launch(mut self) -> Self {
        self.do_not_launch = true;
        self
    }

    /// Must run whenever the named gadget must run.
    pub fn depends_on(mut self, name: &str) -> Self {
        self.depends_on.push(name.to_string());
        self
    }

    /// Hold the launch until the named gadget is done.
    pub fn wait_for(mut self, name: &str) -> Self {
        self.wait_for.push(name.to_string());
        self
    }

    /// Register `other` while being prepared.
    pub fn spawns(mut self, other: ProbeGadget) -> Self {
        self.spawns.push(other);
        self
    }

    pub fn boxed(self) -> Box<dyn Gadget> {
        Box::new(self)
    }

    fn record(&self, call: &str) {
        self.journal
            .lock()
            .unwrap()
            .push(format!("{call}:{}", self.name));
    }
}

impl Gadget for ProbeGadget {
    fn name(&self) -> &str {
        &self.name
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn job(&self) -> &JobSpec {
        &self.job
    }

    fn job_mut(&mut self) -> &mut JobSpec {
        &mut self.job
    }

    fn check_dependencies(&mut self, ctx: &mut SchedulerContext) -> Result<bool> {
        self.record("check");
        for dep in &self.depends_on {
            if ctx.check_by_name(dep)? {
                return Ok(true);
            }
        }
        Ok(self.must_run)
    }

    fn prepare(&mut self, ctx: &mut SchedulerContext) -> Result<()> {
        self.record("prepare");
        for other in self.spawns.drain(..) {
            ctx.add_gadget(Box::new(other))?;
        }
        self.job.cmd = self.cmd.clone();
        self.job.do_not_launch = self.do_not_launch;
        Ok(())
    }

    fn pre_launch(&mut self, ctx: &SchedulerContext) -> Result<LaunchGate> {
        let pending: Vec<String> = self
            .wait_for
            .iter()
            .filter(|w| !ctx.is_finished(w))
            .cloned()
            .collect();
        if pending.is_empty() {
            Ok(LaunchGate::Ready)
        } else {
            Ok(LaunchGate::WaitFor(pending))
        }
    }

    fn completed(&mut self, outcome: JobOutcome, _ctx: &mut SchedulerContext) -> Result<()> {
        self.record("completed");
        check_outcome(&self.name, outcome, None)
    }
}
