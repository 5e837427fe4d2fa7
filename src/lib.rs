// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod fs;
pub mod gadget;
pub mod grid;
pub mod logging;
pub mod schedule;
pub mod staleness;
pub mod types;
pub mod vars;

use std::sync::Arc;

use anyhow::{Result, bail};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Selection, resolve_gadgets, split_args};
use crate::config::{ConfigFile, ProjectSettings, config_root_dir, load_and_validate};
use crate::fs::RealFileSystem;
use crate::gadget::kinds::{
    CleanGadget, CommandGadget, FlushGadget, LatestGadget, TreeGadget, UnitSet, UnitsGadget,
};
use crate::grid::{JobCompletion, ProcessGrid, SubmitPolicy};
use crate::schedule::{Scheduler, SchedulerContext};
use crate::types::Phase;
use crate::vars::Vars;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and variable overrides
/// - gadget registration
/// - the phase scheduler and the process grid
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.clone();
    let cfg = load_and_validate(&config_path)?;

    let (names, overrides) = split_args(&args.args);
    let selection = resolve_gadgets(&names)?;
    let vars = Vars::new(cfg.vars.clone()).with_overrides(overrides)?;
    let project = ProjectSettings::from_section(&cfg.project, config_root_dir(&config_path));
    debug!(root = %project.root.display(), grid = ?project.grid, "project settings");

    let mut ctx = SchedulerContext::new(Arc::new(RealFileSystem), vars, project);
    register_gadgets(&mut ctx, &cfg, &selection, !args.noflush)?;

    if args.dry_run {
        print_dry_run(&ctx, &selection);
        return Ok(());
    }

    let (tx, rx) = mpsc::channel::<JobCompletion>(64);
    let grid = ProcessGrid::new(tx, SubmitPolicy::from_settings(ctx.project()));
    let mut scheduler = Scheduler::new(grid, rx);

    tokio::select! {
        report = scheduler.run(&mut ctx, &selection.phases) => {
            let report = report?;
            info!(
                submitted = report.total_submitted(),
                skipped = report.skipped.len(),
                "gogo done"
            );
            Ok(())
        }
        _ = interrupted() => {
            warn!("interrupted; killing running jobs");
            scheduler.abort().await;
            bail!("interrupted")
        }
    }
}

/// Resolves on Ctrl-C. Never resolves if the signal cannot be watched.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

/// Register every gadget a run may need, in the order they should run
/// within a phase.
///
/// Gadgets in phases the selection leaves out are registered too; the
/// scheduler never sweeps them.
pub fn register_gadgets(
    ctx: &mut SchedulerContext,
    cfg: &ConfigFile,
    selection: &Selection,
    flush: bool,
) -> errors::Result<()> {
    let units = Arc::new(UnitSet::new(cfg.unit.clone()));

    if selection.latest {
        ctx.add_gadget(Box::new(LatestGadget::new(Arc::clone(&units))))?;
    }
    if selection.tree {
        ctx.add_gadget(Box::new(TreeGadget::new(Arc::clone(&units))))?;
    }
    ctx.add_gadget(Box::new(CleanGadget::new(Arc::clone(&units))))?;
    if !units.is_empty() {
        ctx.add_gadget(Box::new(UnitsGadget::new(Arc::clone(&units))))?;
    }
    for (name, gadget) in &cfg.gadget {
        ctx.add_gadget(Box::new(CommandGadget::from_config(name, gadget)?))?;
    }
    if flush {
        ctx.add_gadget(Box::new(FlushGadget::new()))?;
    }

    debug!(gadgets = ctx.len(), units = units.len(), "gadgets registered");
    Ok(())
}

/// Dry-run output: the registered gadgets of every selected phase.
fn print_dry_run(ctx: &SchedulerContext, selection: &Selection) {
    println!("gogo dry-run");
    println!("  root = {}", ctx.project().root.display());
    println!("  gogo_dir = {}", ctx.project().gogo_dir.display());
    println!("  grid = {:?}", ctx.project().grid);
    if !ctx.vars().overrides().is_empty() {
        println!("  overrides = {:?}", ctx.vars().overrides());
    }
    println!();

    for phase in Phase::ALL {
        if !selection.phases.contains(phase) {
            continue;
        }
        let names: Vec<&str> = ctx
            .gadgets()
            .filter(|(_, p)| *p == phase)
            .map(|(name, _)| name)
            .collect();
        if names.is_empty() {
            continue;
        }
        println!("{phase}:");
        for name in names {
            println!("  - {name}");
        }
    }

    debug!("dry-run complete (no execution)");
}
