// src/config/settings.rs

use std::path::{Path, PathBuf};

use crate::config::model::{GridKind, ProjectSection};

/// `[project]` with every path made absolute against the project root.
#[derive(Debug, Clone)]
pub struct ProjectSettings {
    /// Directory holding the config file.
    pub root: PathBuf,
    pub gogo_dir: PathBuf,
    pub grid: GridKind,
    pub submit_tool: Option<String>,
    pub module_tool: String,
    pub clean_dirs: Vec<PathBuf>,
    pub clean_files: Vec<PathBuf>,
    pub unit_sources: Vec<String>,
}

impl ProjectSettings {
    pub fn from_section(section: &ProjectSection, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let resolve = |p: &PathBuf| root.join(p);

        Self {
            gogo_dir: resolve(&section.gogo_dir),
            grid: section.grid,
            submit_tool: section.submit_tool.clone(),
            module_tool: section.module_tool.clone(),
            clean_dirs: section.clean_dirs.iter().map(resolve).collect(),
            clean_files: section.clean_files.iter().map(resolve).collect(),
            unit_sources: section.unit_sources.clone(),
            root,
        }
    }

    /// Resolve a config-relative path. Absolute paths are kept as they are.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    /// Where a gadget's generated job script lives.
    pub fn script_path(&self, gadget: &str) -> PathBuf {
        self.gogo_dir.join(format!(".{gadget}.sh"))
    }

    /// Done marker of a compile unit.
    pub fn unit_marker(&self, unit: &str) -> PathBuf {
        self.gogo_dir.join("done").join(format!("{unit}.done"))
    }

    /// Output library directory of a compile unit.
    pub fn unit_lib(&self, unit: &str) -> PathBuf {
        self.gogo_dir.join("libs").join(unit)
    }
}
