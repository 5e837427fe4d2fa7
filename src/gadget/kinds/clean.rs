// src/gadget/kinds/clean.rs

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::errors::Result;
use crate::gadget::kinds::UnitSet;
use crate::gadget::{Gadget, JobSpec};
use crate::schedule::SchedulerContext;
use crate::types::Phase;

/// Wipes generated state: configured clean dirs and files, every unit's
/// library and done marker, and the gogo directory itself.
///
/// Removal is best effort; failures are logged and the run goes on. Nothing
/// is submitted to the grid.
#[derive(Debug)]
pub struct CleanGadget {
    units: Arc<UnitSet>,
    job: JobSpec,
}

impl CleanGadget {
    pub const NAME: &'static str = "clean";

    pub fn new(units: Arc<UnitSet>) -> Self {
        Self {
            units,
            job: JobSpec::default(),
        }
    }

    fn targets(&self, ctx: &SchedulerContext) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
        let project = ctx.project();
        let mut dirs = Vec::new();
        for dir in &project.clean_dirs {
            dirs.push(ctx.expand_path(dir)?);
        }
        let mut files = Vec::new();
        for file in &project.clean_files {
            files.push(ctx.expand_path(file)?);
        }

        for unit in self.units.names() {
            let (lib, marker) = self.units.artifacts(project, unit);
            dirs.push(lib);
            files.push(marker);
        }
        dirs.push(project.gogo_dir.clone());
        Ok((dirs, files))
    }
}

impl Gadget for CleanGadget {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn phase(&self) -> Phase {
        Phase::Clean
    }

    fn job(&self) -> &JobSpec {
        &self.job
    }

    fn job_mut(&mut self) -> &mut JobSpec {
        &mut self.job
    }

    fn prepare(&mut self, ctx: &mut SchedulerContext) -> Result<()> {
        let (dirs, files) = self.targets(ctx)?;
        let fs = ctx.fs();
        info!("Cleaning...");

        for dir in &dirs {
            match fs.remove_dir_all(dir) {
                Ok(true) => info!("Removed dir {}", dir.display()),
                Ok(false) => {}
                Err(err) => warn!(dir = %dir.display(), error = %err, "could not remove directory"),
            }
            ctx.checker().invalidate(dir);
        }
        for file in &files {
            match fs.remove_file(file) {
                Ok(true) => info!("Removed file {}", file.display()),
                Ok(false) => {}
                Err(err) => warn!(file = %file.display(), error = %err, "could not remove file"),
            }
            ctx.checker().invalidate(file);
        }

        self.job.cmd = None;
        Ok(())
    }
}
