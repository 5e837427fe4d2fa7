// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [project]
/// grid = "sge"
///
/// [vars]
/// VLOG_TOOL = "vcs"
///
/// [gadget.simv]
/// phase = "simulate"
/// commands = ["./simv +UVM_TESTNAME=${TEST}"]
///
/// [unit.cn]
/// dir = "vkits/cn"
/// after = ["uvm"]
/// commands = ["vlogan -work ${UNIT_LIB} -f ${UNIT_DIR}/${UNIT}.flist"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub project: ProjectSection,

    /// Run variables from `[vars]`.
    #[serde(default)]
    pub vars: BTreeMap<String, String>,

    /// Command gadgets from `[gadget.<name>]`.
    #[serde(default)]
    pub gadget: BTreeMap<String, GadgetConfig>,

    /// Compile units from `[unit.<name>]`.
    #[serde(default)]
    pub unit: BTreeMap<String, UnitConfig>,
}

/// Validated configuration.
///
/// Built from a [`RawConfigFile`] via `TryFrom`, so holding one means the
/// phases parse, unit dependencies are known and acyclic, and no gadget name
/// is used twice.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub project: ProjectSection,
    pub vars: BTreeMap<String, String>,
    pub gadget: BTreeMap<String, GadgetConfig>,
    pub unit: BTreeMap<String, UnitConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            project: raw.project,
            vars: raw.vars,
            gadget: raw.gadget,
            unit: raw.unit,
        }
    }
}

/// Which batch system runs the jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GridKind {
    /// Plain child processes on this machine.
    #[default]
    Local,
    Sge,
    Lsf,
}

/// `[project]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    /// Scratch directory for generated scripts and done markers.
    #[serde(default = "default_gogo_dir")]
    pub gogo_dir: PathBuf,

    #[serde(default)]
    pub grid: GridKind,

    /// Replaces the grid's own submit tool (`qrsh` / `bsub`).
    #[serde(default)]
    pub submit_tool: Option<String>,

    /// Wrapper used to load tool modules in front of a command.
    #[serde(default = "default_module_tool")]
    pub module_tool: String,

    /// Directories removed by the `clean` gadget.
    #[serde(default)]
    pub clean_dirs: Vec<PathBuf>,

    /// Files removed by the `clean` gadget.
    #[serde(default)]
    pub clean_files: Vec<PathBuf>,

    /// Default source patterns for compile units.
    #[serde(default = "default_unit_sources")]
    pub unit_sources: Vec<String>,
}

fn default_gogo_dir() -> PathBuf {
    PathBuf::from(".gogo")
}

fn default_module_tool() -> String {
    "runmod".to_string()
}

fn default_unit_sources() -> Vec<String> {
    vec!["*.sv".to_string(), "*.svh".to_string(), "*.v".to_string()]
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            gogo_dir: default_gogo_dir(),
            grid: GridKind::default(),
            submit_tool: None,
            module_tool: default_module_tool(),
            clean_dirs: Vec::new(),
            clean_files: Vec::new(),
            unit_sources: default_unit_sources(),
        }
    }
}

/// One entry of a `commands` list: either a plain string or a table.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CommandEntry {
    Plain(String),
    Detailed {
        command: String,
        #[serde(default)]
        comment: Option<String>,
        /// Stop the script if this command fails.
        #[serde(default = "default_true")]
        check_exit: bool,
        /// Prefix the command with the module tool.
        #[serde(default = "default_true")]
        use_modules: bool,
    },
}

fn default_true() -> bool {
    true
}

impl CommandEntry {
    pub fn command(&self) -> &str {
        match self {
            CommandEntry::Plain(cmd) => cmd,
            CommandEntry::Detailed { command, .. } => command,
        }
    }
}

/// `[gadget.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct GadgetConfig {
    /// One of the fixed phases, e.g. `"simulate"`. Required.
    #[serde(default)]
    pub phase: Option<String>,

    #[serde(default)]
    pub commands: Vec<CommandEntry>,

    /// Working directory of the job.
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    #[serde(default)]
    pub queue: Option<String>,

    /// Extra submit-tool arguments, e.g. `["-l", "mem=4G"]`.
    #[serde(default)]
    pub resources: Vec<String>,

    /// Run attached to the terminal.
    #[serde(default)]
    pub interactive: bool,

    /// Tool modules loaded through the module tool.
    #[serde(default)]
    pub modules: Vec<String>,

    /// Output file for the job's stdout and stderr.
    #[serde(default)]
    pub log: Option<PathBuf>,

    /// Touched on success; the gadget is skipped while it is newer than
    /// every file in `sources`.
    #[serde(default)]
    pub done_marker: Option<PathBuf>,

    #[serde(default)]
    pub sources: Vec<PathBuf>,

    /// Files that must exist before the commands are produced.
    #[serde(default)]
    pub requires: Vec<PathBuf>,

    /// Directories created while preparing.
    #[serde(default)]
    pub mkdirs: Vec<PathBuf>,

    /// Extra artifacts deleted by the flush at the end of the run.
    #[serde(default)]
    pub turds: Vec<PathBuf>,

    /// Write the job script but do not submit it.
    #[serde(default = "default_true")]
    pub launch: bool,
}

impl Default for GadgetConfig {
    fn default() -> Self {
        Self {
            phase: None,
            commands: Vec::new(),
            cwd: None,
            queue: None,
            resources: Vec::new(),
            interactive: false,
            modules: Vec::new(),
            log: None,
            done_marker: None,
            sources: Vec::new(),
            requires: Vec::new(),
            mkdirs: Vec::new(),
            turds: Vec::new(),
            launch: true,
        }
    }
}

/// `[unit.<name>]` section: a compile unit (library).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UnitConfig {
    /// Directory holding the unit's sources.
    pub dir: PathBuf,

    /// Units this one is compiled against.
    #[serde(default)]
    pub after: Vec<String>,

    /// Source patterns; `[project].unit_sources` when absent.
    #[serde(default)]
    pub sources: Option<Vec<String>>,

    /// Subdirectories of `dir` that hold generated files, not sources.
    #[serde(default)]
    pub exclude_dirs: Vec<PathBuf>,

    #[serde(default)]
    pub commands: Vec<CommandEntry>,

    #[serde(default)]
    pub queue: Option<String>,

    #[serde(default)]
    pub resources: Vec<String>,

    #[serde(default)]
    pub modules: Vec<String>,

    #[serde(default)]
    pub log: Option<PathBuf>,
}
