#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use gogo::config::{
    CommandEntry, ConfigFile, GadgetConfig, ProjectSection, RawConfigFile, UnitConfig,
};
use gogo::errors::Result;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                project: ProjectSection::default(),
                vars: BTreeMap::new(),
                gadget: BTreeMap::new(),
                unit: BTreeMap::new(),
            },
        }
    }

    pub fn with_var(mut self, name: &str, value: &str) -> Self {
        self.config.vars.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_gadget(mut self, name: &str, gadget: GadgetConfig) -> Self {
        self.config.gadget.insert(name.to_string(), gadget);
        self
    }

    pub fn with_unit(mut self, name: &str, unit: UnitConfig) -> Self {
        self.config.unit.insert(name.to_string(), unit);
        self
    }

    pub fn with_clean_dir(mut self, dir: &str) -> Self {
        self.config.project.clean_dirs.push(PathBuf::from(dir));
        self
    }

    pub fn with_gogo_dir(mut self, dir: &str) -> Self {
        self.config.project.gogo_dir = PathBuf::from(dir);
        self
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `GadgetConfig`.
pub struct GadgetConfigBuilder {
    gadget: GadgetConfig,
}

impl GadgetConfigBuilder {
    pub fn new(phase: &str) -> Self {
        Self {
            gadget: GadgetConfig {
                phase: Some(phase.to_string()),
                ..GadgetConfig::default()
            },
        }
    }

    pub fn command(mut self, cmd: &str) -> Self {
        self.gadget.commands.push(CommandEntry::Plain(cmd.to_string()));
        self
    }

    pub fn done_marker(mut self, path: &str) -> Self {
        self.gadget.done_marker = Some(PathBuf::from(path));
        self
    }

    pub fn source(mut self, path: &str) -> Self {
        self.gadget.sources.push(PathBuf::from(path));
        self
    }

    pub fn requires(mut self, path: &str) -> Self {
        self.gadget.requires.push(PathBuf::from(path));
        self
    }

    pub fn log(mut self, path: &str) -> Self {
        self.gadget.log = Some(PathBuf::from(path));
        self
    }

    pub fn turd(mut self, path: &str) -> Self {
        self.gadget.turds.push(PathBuf::from(path));
        self
    }

    pub fn launch(mut self, val: bool) -> Self {
        self.gadget.launch = val;
        self
    }

    pub fn build(self) -> GadgetConfig {
        self.gadget
    }
}

/// Builder for `UnitConfig`.
pub struct UnitConfigBuilder {
    unit: UnitConfig,
}

impl UnitConfigBuilder {
    pub fn new(dir: &str) -> Self {
        Self {
            unit: UnitConfig {
                dir: PathBuf::from(dir),
                ..UnitConfig::default()
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.unit.after.push(dep.to_string());
        self
    }

    pub fn command(mut self, cmd: &str) -> Self {
        self.unit.commands.push(CommandEntry::Plain(cmd.to_string()));
        self
    }

    pub fn exclude_dir(mut self, dir: &str) -> Self {
        self.unit.exclude_dirs.push(PathBuf::from(dir));
        self
    }

    pub fn build(self) -> UnitConfig {
        self.unit
    }
}
