// src/gadget/kinds/flush.rs

use tracing::{debug, info};

use crate::errors::Result;
use crate::gadget::{Gadget, JobSpec};
use crate::schedule::SchedulerContext;
use crate::types::Phase;

/// Deletes the turds of every registered gadget at the end of the run.
#[derive(Debug, Default)]
pub struct FlushGadget {
    job: JobSpec,
}

impl FlushGadget {
    pub const NAME: &'static str = "flush";

    pub fn new() -> Self {
        Self::default()
    }
}

impl Gadget for FlushGadget {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn phase(&self) -> Phase {
        Phase::FinalCleanup
    }

    fn job(&self) -> &JobSpec {
        &self.job
    }

    fn job_mut(&mut self) -> &mut JobSpec {
        &mut self.job
    }

    fn prepare(&mut self, ctx: &mut SchedulerContext) -> Result<()> {
        let fs = ctx.fs();
        let mut removed = 0;
        for (gadget, turds) in ctx.turds() {
            for turd in turds {
                debug!(gadget = %gadget, turd = %turd.display(), "removing turd");
                // Already gone is fine; anything else is not.
                if fs.remove_file(&turd)? {
                    removed += 1;
                }
            }
        }
        info!(removed, "turds flushed");
        self.job.cmd = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProjectSection, ProjectSettings};
    use crate::fs::FileSystem;
    use crate::fs::mock::MockFileSystem;
    use crate::vars::Vars;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    #[derive(Debug)]
    struct Messy {
        name: &'static str,
        job: JobSpec,
    }

    impl Gadget for Messy {
        fn name(&self) -> &str {
            self.name
        }
        fn phase(&self) -> Phase {
            Phase::Simulate
        }
        fn job(&self) -> &JobSpec {
            &self.job
        }
        fn job_mut(&mut self) -> &mut JobSpec {
            &mut self.job
        }
    }

    fn messy(name: &'static str, turds: &[&str]) -> Box<dyn Gadget> {
        Box::new(Messy {
            name,
            job: JobSpec {
                turds: turds.iter().map(PathBuf::from).collect(),
                ..JobSpec::default()
            },
        })
    }

    fn ctx(fs: &MockFileSystem) -> SchedulerContext {
        SchedulerContext::new(
            Arc::new(fs.clone()),
            Vars::default(),
            ProjectSettings::from_section(&ProjectSection::default(), "/tb"),
        )
    }

    #[test]
    fn removes_turds_and_ignores_missing_ones() {
        let fs = MockFileSystem::new();
        fs.add_file("/tb/.gogo/.simv.sh", "#!/bin/sh\n");
        fs.add_file("/tb/sim/ucli.key", "");
        fs.add_file("/tb/sim/keep.log", "");

        let mut ctx = ctx(&fs);
        ctx.add_gadget(messy("simv", &["/tb/.gogo/.simv.sh", "/tb/sim/ucli.key"]))
            .unwrap();
        ctx.add_gadget(messy("gone", &["/tb/sim/never_written"])).unwrap();

        FlushGadget::new().prepare(&mut ctx).unwrap();
        assert!(!fs.exists(Path::new("/tb/.gogo/.simv.sh")));
        assert!(!fs.exists(Path::new("/tb/sim/ucli.key")));
        assert!(fs.exists(Path::new("/tb/sim/keep.log")));
    }

    #[test]
    fn other_removal_errors_are_fatal() {
        let fs = MockFileSystem::new();
        fs.add_dir("/tb/sim");

        let mut ctx = ctx(&fs);
        ctx.add_gadget(messy("simv", &["/tb/sim"])).unwrap();
        assert!(FlushGadget::new().prepare(&mut ctx).is_err());
    }
}
