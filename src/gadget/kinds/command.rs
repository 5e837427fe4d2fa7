// src/gadget/kinds/command.rs

use std::path::PathBuf;

use tracing::{debug, info};

use crate::config::GadgetConfig;
use crate::errors::{GogoError, Result};
use crate::gadget::{Command, Gadget, JobSpec, check_outcome, failure_detail, install_commands};
use crate::grid::JobOutcome;
use crate::schedule::SchedulerContext;
use crate::types::Phase;

/// A gadget described by a `[gadget.<name>]` section.
///
/// With a `done_marker`, the gadget only runs while the marker is missing or
/// older than one of its `sources`; success touches the marker and failure
/// removes it.
#[derive(Debug)]
pub struct CommandGadget {
    name: String,
    phase: Phase,
    config: GadgetConfig,
    job: JobSpec,
}

impl CommandGadget {
    pub fn from_config(name: &str, config: &GadgetConfig) -> Result<Self> {
        let phase = config
            .phase
            .as_deref()
            .ok_or_else(|| GogoError::ConfigError(format!("gadget '{name}' has no phase")))?
            .parse()?;

        Ok(Self {
            name: name.to_string(),
            phase,
            config: config.clone(),
            job: JobSpec::default(),
        })
    }

    fn marker(&self, ctx: &SchedulerContext) -> Result<Option<PathBuf>> {
        self.config
            .done_marker
            .as_deref()
            .map(|m| ctx.expand_path(m))
            .transpose()
    }

    fn expand_all(ctx: &SchedulerContext, paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
        paths.iter().map(|p| ctx.expand_path(p)).collect()
    }

    /// Fill in the job hints from the config.
    fn fill_job(&mut self, ctx: &SchedulerContext) -> Result<()> {
        let vars = ctx.vars();
        let job = &mut self.job;
        job.cwd = self.config.cwd.as_deref().map(|p| ctx.expand_path(p)).transpose()?;
        job.log = self.config.log.as_deref().map(|p| ctx.expand_path(p)).transpose()?;
        job.queue = self.config.queue.as_deref().map(|q| vars.expand(q)).transpose()?;
        job.resources = self
            .config
            .resources
            .iter()
            .map(|r| vars.expand(r))
            .collect::<Result<_>>()?;
        job.interactive = self.config.interactive;
        job.modules = self.config.modules.clone();
        job.turds.extend(Self::expand_all(ctx, &self.config.turds)?);
        Ok(())
    }
}

impl Gadget for CommandGadget {
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
        let Some(marker) = self.marker(ctx)? else {
            return Ok(true);
        };
        let sources = Self::expand_all(ctx, &self.config.sources)?;
        let answer = ctx.checker().is_stale(&[marker], &sources)?;
        debug!(gadget = %self.name, stale = answer.stale, cause = %answer.cause, "marker check");
        Ok(answer.stale)
    }

    fn create_commands(&mut self, ctx: &mut SchedulerContext) -> Result<Vec<Command>> {
        let required = Self::expand_all(ctx, &self.config.requires)?;
        let fs = ctx.fs();
        let missing: Vec<PathBuf> = required.into_iter().filter(|p| !fs.exists(p)).collect();
        if !missing.is_empty() {
            return Err(GogoError::MissingFiles {
                gadget: self.name.clone(),
                files: missing,
            });
        }

        self.config
            .commands
            .iter()
            .map(|entry| {
                let text = ctx.vars().expand(entry.command())?;
                Ok(Command::from_entry(entry, text))
            })
            .collect()
    }

    fn prepare(&mut self, ctx: &mut SchedulerContext) -> Result<()> {
        self.fill_job(ctx)?;

        let fs = ctx.fs();
        for dir in Self::expand_all(ctx, &self.config.mkdirs)? {
            fs.create_dir_all(&dir)?;
        }

        install_commands(self, ctx)?;

        if !self.config.launch {
            if let Some(script) = self.job.turds.last() {
                info!(gadget = %self.name, script = %script.display(), "script written; not launching");
            }
            self.job.do_not_launch = true;
        }
        Ok(())
    }

    fn completed(&mut self, outcome: JobOutcome, ctx: &mut SchedulerContext) -> Result<()> {
        let marker = self.marker(ctx)?;
        if outcome == JobOutcome::Success {
            if let Some(marker) = &marker {
                ctx.touch_marker(marker)?;
            }
            return Ok(());
        }

        let detail = failure_detail(ctx, marker.as_deref(), self.job.log.as_deref());
        check_outcome(&self.name, outcome, detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CommandEntry, ProjectSection, ProjectSettings};
    use crate::fs::mock::MockFileSystem;
    use crate::vars::Vars;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn ctx(fs: &MockFileSystem) -> SchedulerContext {
        let mut vars = BTreeMap::new();
        vars.insert("TEST".to_string(), "basic".to_string());
        SchedulerContext::new(
            Arc::new(fs.clone()),
            Vars::new(vars),
            ProjectSettings::from_section(&ProjectSection::default(), "/tb"),
        )
    }

    fn config() -> GadgetConfig {
        GadgetConfig {
            phase: Some("simulate".into()),
            commands: vec![
                CommandEntry::Plain("./simv +UVM_TESTNAME=${TEST}".into()),
                CommandEntry::Plain("check_log sim.log".into()),
            ],
            done_marker: Some(PathBuf::from("sim/.done")),
            sources: vec![PathBuf::from("simv")],
            log: Some(PathBuf::from("sim/${TEST}.log")),
            ..GadgetConfig::default()
        }
    }

    #[test]
    fn fresh_marker_skips_and_stale_marker_runs() {
        let fs = MockFileSystem::new();
        fs.add_file_at("/tb/simv", 100);
        fs.add_file_at("/tb/sim/.done", 200);

        let mut gadget = CommandGadget::from_config("simv", &config()).unwrap();
        assert!(!gadget.check_dependencies(&mut ctx(&fs)).unwrap());

        fs.add_file_at("/tb/simv", 300);
        assert!(gadget.check_dependencies(&mut ctx(&fs)).unwrap());
    }

    #[test]
    fn prepare_writes_an_expanded_script() {
        let fs = MockFileSystem::new();
        let mut ctx = ctx(&fs);
        let mut gadget = CommandGadget::from_config("simv", &config()).unwrap();

        gadget.prepare(&mut ctx).unwrap();

        let script = fs.file_content("/tb/.gogo/.simv.sh").unwrap();
        assert!(script.contains("./simv +UVM_TESTNAME=basic\n"));
        assert_eq!(gadget.job().cmd.as_deref(), Some("sh /tb/.gogo/.simv.sh"));
        assert_eq!(gadget.job().log, Some(PathBuf::from("/tb/sim/basic.log")));
        assert_eq!(gadget.job().turds, vec![PathBuf::from("/tb/.gogo/.simv.sh")]);
        assert!(gadget.job().is_launchable());
    }

    #[test]
    fn missing_required_files_fail_prepare() {
        let fs = MockFileSystem::new();
        let mut cfg = config();
        cfg.requires = vec![PathBuf::from("simv")];
        let mut gadget = CommandGadget::from_config("simv", &cfg).unwrap();

        match gadget.prepare(&mut ctx(&fs)) {
            Err(GogoError::MissingFiles { gadget, files }) => {
                assert_eq!(gadget, "simv");
                assert_eq!(files, vec![PathBuf::from("/tb/simv")]);
            }
            other => panic!("expected MissingFiles, got {other:?}"),
        }
    }

    #[test]
    fn launch_false_prepares_without_launching() {
        let fs = MockFileSystem::new();
        let mut cfg = config();
        cfg.launch = false;
        let mut gadget = CommandGadget::from_config("rerun", &cfg).unwrap();

        gadget.prepare(&mut ctx(&fs)).unwrap();
        assert!(fs.file_content("/tb/.gogo/.rerun.sh").is_some());
        assert!(gadget.job().do_not_launch);
        assert!(!gadget.job().is_launchable());
    }

    #[test]
    fn completion_commits_or_removes_the_marker() {
        let fs = MockFileSystem::new();
        let mut ctx = ctx(&fs);
        let mut gadget = CommandGadget::from_config("simv", &config()).unwrap();
        gadget.prepare(&mut ctx).unwrap();

        gadget.completed(JobOutcome::Success, &mut ctx).unwrap();
        assert!(fs.file_content("/tb/sim/.done").is_some());

        let err = gadget.completed(JobOutcome::Failed(2), &mut ctx).unwrap_err();
        assert!(fs.file_content("/tb/sim/.done").is_none());
        assert_eq!(
            err.to_string(),
            "Gadget simv failed with exit status 2. See /tb/sim/basic.log"
        );
    }

    #[test]
    fn stuck_marker_is_named_in_the_failure() {
        let fs = MockFileSystem::new();
        // A directory where the marker should be cannot be unlinked.
        fs.add_dir("/tb/sim/.done");
        let mut ctx = ctx(&fs);
        let mut gadget = CommandGadget::from_config("simv", &config()).unwrap();
        gadget.prepare(&mut ctx).unwrap();

        let err = gadget.completed(JobOutcome::Failed(1), &mut ctx).unwrap_err();
        assert!(err.is_gadget_failure());
        let msg = err.to_string();
        assert!(msg.starts_with("Gadget simv failed with exit status 1. See /tb/sim/basic.log. "));
        assert!(msg.contains("Unable to update done marker /tb/sim/.done"), "{msg}");
    }
}
