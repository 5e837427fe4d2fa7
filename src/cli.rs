// src/cli.rs

//! CLI argument parsing using `clap`, plus resolution of the positional
//! arguments into variable overrides and the phases to sweep.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;

use crate::errors::{GogoError, Result};
use crate::types::{MainPhase, Phase, PhaseSet};
use crate::vars::is_override;

/// Command-line arguments for `gogo`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "gogo",
    version,
    about = "Run a testbench's clean, build, vlog and simulate jobs in phase order.",
    long_about = None
)]
pub struct CliArgs {
    /// Gadgets to run (`clean`, `build`, `vlog`, `sim`, `latest`, `tree`,
    /// or `no<gadget>`) and `NAME=value` variable overrides.
    #[arg(value_name = "ARGS")]
    pub args: Vec<String>,

    /// Path to the project file (TOML).
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `--dbg`, then `GOGO_LOG`, then `info` are used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Debug output.
    #[arg(long)]
    pub dbg: bool,

    /// Keep turd files.
    #[arg(long)]
    pub noflush: bool,

    /// Load and validate, print the schedule, but run nothing.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

/// What the positional gadget names select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub phases: PhaseSet,
    pub latest: bool,
    pub tree: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Main(MainPhase),
    Latest,
    Tree,
}

fn shortcut(name: &str) -> Option<Target> {
    let target = match name {
        "c" | "cln" | "clean" => Target::Main(MainPhase::Clean),
        "b" | "bld" | "build" => Target::Main(MainPhase::Build),
        "v" | "vlog" => Target::Main(MainPhase::Vlog),
        "s" | "sim" | "simu" | "simulate" => Target::Main(MainPhase::Simulate),
        "latest" => Target::Latest,
        "tree" => Target::Tree,
        _ => return None,
    };
    Some(target)
}

fn expand(name: &str) -> Result<Target> {
    shortcut(name).ok_or_else(|| GogoError::ConfigError(format!("Unknown gadget: {name}")))
}

/// Split positional arguments into `(gadget names, NAME=value overrides)`.
pub fn split_args(args: &[String]) -> (Vec<&str>, Vec<&str>) {
    args.iter()
        .map(String::as_str)
        .partition(|arg| !is_override(arg))
}

/// Resolve gadget names into the phases to sweep.
///
/// Names are processed left to right; `no<name>` drops what was selected so
/// far for `name`. No names at all means `build vlog sim`.
pub fn resolve_gadgets(names: &[&str]) -> Result<Selection> {
    let defaults = ["build", "vlog", "sim"];
    let names: &[&str] = if names.is_empty() { &defaults } else { names };

    let mut picked: Vec<Target> = Vec::new();
    for name in names {
        match name.strip_prefix("no") {
            Some(negated) if !negated.is_empty() => {
                let target = expand(negated)?;
                picked.retain(|t| *t != target);
            }
            _ => picked.push(expand(name)?),
        }
    }

    let mut selection = Selection {
        phases: PhaseSet::new(),
        latest: false,
        tree: false,
    };
    for target in picked {
        match target {
            Target::Main(main) => selection.phases.insert_main(main),
            Target::Latest => {
                selection.latest = true;
                selection.phases.insert(Phase::PreClean);
            }
            Target::Tree => {
                selection.tree = true;
                selection.phases.insert(Phase::PreBuild);
            }
        }
    }
    selection.phases.insert_main(MainPhase::FinalCleanup);
    Ok(selection)
}
