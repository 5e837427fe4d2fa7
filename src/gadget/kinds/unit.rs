// src/gadget/kinds/unit.rs

//! Compile units: one `UnitGadget` per `[unit.<name>]`, registered in level
//! order by the `build` gadget while the build phase is being swept.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{ProjectSettings, UnitConfig};
use crate::dag::{Levels, levelize, sort_by_level};
use crate::errors::{GogoError, Result};
use crate::gadget::{
    Command, Gadget, JobSpec, LaunchGate, check_outcome, failure_detail, install_commands,
};
use crate::grid::JobOutcome;
use crate::schedule::SchedulerContext;
use crate::staleness::glob_files;
use crate::types::Phase;

/// All configured compile units.
#[derive(Debug, Clone, Default)]
pub struct UnitSet {
    units: BTreeMap<String, UnitConfig>,
}

impl UnitSet {
    pub fn new(units: BTreeMap<String, UnitConfig>) -> Self {
        Self { units }
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn get(&self, name: &str) -> Option<&UnitConfig> {
        self.units.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(String::as_str)
    }

    /// Unit name -> names of the units it is compiled against.
    pub fn deps(&self) -> BTreeMap<String, Vec<String>> {
        self.units
            .iter()
            .map(|(name, unit)| (name.clone(), unit.after.clone()))
            .collect()
    }

    pub fn levels(&self) -> Result<Levels> {
        levelize(&self.deps())
    }

    /// Unit names with dependencies first.
    pub fn build_order(&self) -> Result<Vec<String>> {
        Ok(sort_by_level(&self.levels()?))
    }

    /// Source directory of a unit.
    pub fn dir(&self, ctx: &SchedulerContext, name: &str) -> Result<PathBuf> {
        let unit = self
            .get(name)
            .ok_or_else(|| GogoError::GadgetNotFound(name.to_string()))?;
        ctx.expand_path(&unit.dir)
    }

    /// Every source file of a unit.
    pub fn sources(&self, ctx: &SchedulerContext, name: &str) -> Result<Vec<PathBuf>> {
        let unit = self
            .get(name)
            .ok_or_else(|| GogoError::GadgetNotFound(name.to_string()))?;
        let dir = self.dir(ctx, name)?;
        let patterns = unit
            .sources
            .clone()
            .unwrap_or_else(|| ctx.project().unit_sources.clone());
        let exclude: Vec<PathBuf> = unit.exclude_dirs.iter().map(|d| dir.join(d)).collect();
        let fs = ctx.fs();
        glob_files(fs.as_ref(), &[dir], &patterns, true, &exclude)
    }

    /// Generated artifacts of a unit: its output library and done marker.
    pub fn artifacts(&self, project: &ProjectSettings, name: &str) -> (PathBuf, PathBuf) {
        (project.unit_lib(name), project.unit_marker(name))
    }
}

/// Registers one [`UnitGadget`] per configured unit, dependencies first.
#[derive(Debug)]
pub struct UnitsGadget {
    units: Arc<UnitSet>,
    job: JobSpec,
}

impl UnitsGadget {
    pub const NAME: &'static str = "build";

    pub fn new(units: Arc<UnitSet>) -> Self {
        Self {
            units,
            job: JobSpec::default(),
        }
    }
}

impl Gadget for UnitsGadget {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn phase(&self) -> Phase {
        Phase::Build
    }

    fn job(&self) -> &JobSpec {
        &self.job
    }

    fn job_mut(&mut self) -> &mut JobSpec {
        &mut self.job
    }

    fn check_dependencies(&mut self, _ctx: &mut SchedulerContext) -> Result<bool> {
        Ok(!self.units.is_empty())
    }

    fn prepare(&mut self, ctx: &mut SchedulerContext) -> Result<()> {
        let order = self.units.build_order()?;
        for name in &order {
            ctx.add_gadget(Box::new(UnitGadget::new(name, Arc::clone(&self.units))?))?;
        }
        info!(units = order.len(), "compile units scheduled");
        Ok(())
    }
}

/// Compiles one unit into its library.
///
/// Must run if its done marker is missing or older than one of its sources
/// or dependency markers, or if any unit it depends on must run. Its launch
/// is held until the dependency units of the same batch have completed.
#[derive(Debug)]
pub struct UnitGadget {
    name: String,
    units: Arc<UnitSet>,
    after: Vec<String>,
    job: JobSpec,
}

impl UnitGadget {
    pub fn new(name: &str, units: Arc<UnitSet>) -> Result<Self> {
        let after = units
            .get(name)
            .ok_or_else(|| GogoError::GadgetNotFound(name.to_string()))?
            .after
            .clone();
        Ok(Self {
            name: name.to_string(),
            units,
            after,
            job: JobSpec::default(),
        })
    }

    fn config(&self) -> Result<&UnitConfig> {
        self.units
            .get(&self.name)
            .ok_or_else(|| GogoError::GadgetNotFound(self.name.clone()))
    }

    /// Variables only unit commands see.
    fn unit_vars(&self, ctx: &SchedulerContext) -> Result<BTreeMap<String, String>> {
        let mut dep_dirs = Vec::with_capacity(self.after.len());
        for dep in &self.after {
            dep_dirs.push(self.units.dir(ctx, dep)?.to_string_lossy().into_owned());
        }

        let mut extra = BTreeMap::new();
        extra.insert("UNIT".to_string(), self.name.clone());
        extra.insert(
            "UNIT_DIR".to_string(),
            self.units.dir(ctx, &self.name)?.to_string_lossy().into_owned(),
        );
        extra.insert(
            "UNIT_LIB".to_string(),
            ctx.project().unit_lib(&self.name).to_string_lossy().into_owned(),
        );
        extra.insert("DEP_DIRS".to_string(), dep_dirs.join(" "));
        Ok(extra)
    }
}

impl Gadget for UnitGadget {
    fn name(&self) -> &str {
        &self.name
    }

    fn phase(&self) -> Phase {
        Phase::Build
    }

    fn job(&self) -> &JobSpec {
        &self.job
    }

    fn job_mut(&mut self) -> &mut JobSpec {
        &mut self.job
    }

    fn check_dependencies(&mut self, ctx: &mut SchedulerContext) -> Result<bool> {
        for dep in &self.after {
            if ctx.find(dep).is_some() && ctx.check_by_name(dep)? {
                debug!(unit = %self.name, dependency = %dep, "dependency is rebuilt");
                return Ok(true);
            }
        }

        let mut sources = self.units.sources(ctx, &self.name)?;
        sources.extend(self.after.iter().map(|dep| ctx.project().unit_marker(dep)));

        let marker = ctx.project().unit_marker(&self.name);
        let answer = ctx.checker().is_stale(&[marker], &sources)?;
        debug!(unit = %self.name, stale = answer.stale, cause = %answer.cause, "marker check");
        Ok(answer.stale)
    }

    fn create_commands(&mut self, ctx: &mut SchedulerContext) -> Result<Vec<Command>> {
        let extra = self.unit_vars(ctx)?;
        self.config()?
            .commands
            .iter()
            .map(|entry| {
                let text = ctx.vars().expand_with(entry.command(), &extra)?;
                Ok(Command::from_entry(entry, text))
            })
            .collect()
    }

    fn prepare(&mut self, ctx: &mut SchedulerContext) -> Result<()> {
        let unit = self.config()?.clone();
        let extra = self.unit_vars(ctx)?;

        self.job.cwd = Some(self.units.dir(ctx, &self.name)?);
        self.job.queue = unit
            .queue
            .as_deref()
            .map(|q| ctx.vars().expand_with(q, &extra))
            .transpose()?;
        self.job.resources = unit
            .resources
            .iter()
            .map(|r| ctx.vars().expand_with(r, &extra))
            .collect::<Result<_>>()?;
        self.job.modules = unit.modules.clone();
        self.job.log = match &unit.log {
            Some(log) => Some(ctx.project().resolve(ctx.vars().expand_with(&log.to_string_lossy(), &extra)?)),
            None => Some(ctx.project().gogo_dir.join("logs").join(format!("{}.log", self.name))),
        };

        ctx.fs().create_dir_all(&ctx.project().unit_lib(&self.name))?;
        install_commands(self, ctx)
    }

    fn pre_launch(&mut self, ctx: &SchedulerContext) -> Result<LaunchGate> {
        let pending: Vec<String> = self
            .after
            .iter()
            .filter(|dep| !ctx.is_finished(dep))
            .cloned()
            .collect();
        if pending.is_empty() {
            Ok(LaunchGate::Ready)
        } else {
            Ok(LaunchGate::WaitFor(pending))
        }
    }

    fn completed(&mut self, outcome: JobOutcome, ctx: &mut SchedulerContext) -> Result<()> {
        let marker = ctx.project().unit_marker(&self.name);
        if outcome == JobOutcome::Success {
            return ctx.touch_marker(&marker);
        }

        let detail = failure_detail(ctx, Some(&marker), self.job.log.as_deref());
        check_outcome(&self.name, outcome, detail)
    }
}
