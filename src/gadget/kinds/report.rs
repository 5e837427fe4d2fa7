// src/gadget/kinds/report.rs

//! Diagnostic gadgets. They report on the unit tree and never submit jobs.

use std::sync::Arc;

use tracing::info;

use crate::dag::format_levels;
use crate::errors::Result;
use crate::gadget::kinds::UnitSet;
use crate::gadget::{Gadget, JobSpec};
use crate::schedule::SchedulerContext;
use crate::types::Phase;

/// Logs the newest unit source, i.e. the file most likely to trigger the
/// next compile.
#[derive(Debug)]
pub struct LatestGadget {
    units: Arc<UnitSet>,
    job: JobSpec,
}

impl LatestGadget {
    pub const NAME: &'static str = "latest";

    pub fn new(units: Arc<UnitSet>) -> Self {
        Self {
            units,
            job: JobSpec::default(),
        }
    }
}

impl Gadget for LatestGadget {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn phase(&self) -> Phase {
        Phase::PreClean
    }

    fn job(&self) -> &JobSpec {
        &self.job
    }

    fn job_mut(&mut self) -> &mut JobSpec {
        &mut self.job
    }

    fn prepare(&mut self, ctx: &mut SchedulerContext) -> Result<()> {
        let mut sources = Vec::new();
        for unit in self.units.names() {
            sources.extend(self.units.sources(ctx, unit)?);
        }

        match ctx.checker().newest(&sources)? {
            Some((_, path)) => info!("Latest source is {}", path.display()),
            None => info!("No unit sources found"),
        }
        self.job.cmd = None;
        Ok(())
    }
}

/// Prints the unit dependency levels.
#[derive(Debug)]
pub struct TreeGadget {
    units: Arc<UnitSet>,
    job: JobSpec,
}

impl TreeGadget {
    pub const NAME: &'static str = "tree";

    pub fn new(units: Arc<UnitSet>) -> Self {
        Self {
            units,
            job: JobSpec::default(),
        }
    }

    pub fn render(&self) -> Result<String> {
        let levels = self.units.levels()?;
        Ok(format!(
            "Unit tree:\n{}\nBuild order: {}",
            format_levels(&levels),
            self.units.build_order()?.join(" ")
        ))
    }
}

impl Gadget for TreeGadget {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn phase(&self) -> Phase {
        Phase::PreBuild
    }

    fn job(&self) -> &JobSpec {
        &self.job
    }

    fn job_mut(&mut self) -> &mut JobSpec {
        &mut self.job
    }

    fn prepare(&mut self, _ctx: &mut SchedulerContext) -> Result<()> {
        println!("{}", self.render()?);
        self.job.cmd = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProjectSection, ProjectSettings, UnitConfig};
    use crate::fs::mock::MockFileSystem;
    use crate::vars::Vars;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn units() -> Arc<UnitSet> {
        let unit = |dir: &str, after: &[&str]| UnitConfig {
            dir: PathBuf::from(dir),
            after: after.iter().map(|s| s.to_string()).collect(),
            ..UnitConfig::default()
        };
        let mut map = BTreeMap::new();
        map.insert("uvm".to_string(), unit("vkits/uvm", &[]));
        map.insert("cn".to_string(), unit("vkits/cn", &["uvm"]));
        map.insert("top".to_string(), unit("vkits/top", &["cn", "uvm"]));
        Arc::new(UnitSet::new(map))
    }

    #[test]
    fn tree_lists_levels_and_build_order() {
        let tree = TreeGadget::new(units());
        let text = tree.render().unwrap();
        assert_eq!(
            text,
            "Unit tree:\n  0 : uvm\n  1 : cn\n  2 : top\nBuild order: uvm cn top"
        );
    }

    #[test]
    fn latest_reads_every_unit() {
        let fs = MockFileSystem::new();
        fs.add_file_at("/tb/vkits/uvm/uvm_pkg.sv", 100);
        fs.add_file_at("/tb/vkits/cn/cn_pkg.sv", 500);
        fs.add_file_at("/tb/vkits/top/top.sv", 300);
        let mut ctx = SchedulerContext::new(
            Arc::new(fs.clone()),
            Vars::default(),
            ProjectSettings::from_section(&ProjectSection::default(), "/tb"),
        );

        let mut latest = LatestGadget::new(units());
        latest.prepare(&mut ctx).unwrap();
        assert!(!latest.job().is_launchable());
        assert_eq!(fs.stat_count(), 3);
    }
}
