// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{CommandEntry, ConfigFile, RawConfigFile};
use crate::errors::{GogoError, Result};
use crate::types::Phase;

/// Names taken by the gadgets every run registers itself.
pub const RESERVED_NAMES: &[&str] = &["clean", "build", "flush", "latest", "tree"];

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = GogoError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_project(cfg)?;
    validate_gadgets(cfg)?;
    validate_unit_dependencies(cfg)?;
    validate_names(cfg)?;
    validate_unit_dag(cfg)?;
    Ok(())
}

fn validate_project(cfg: &RawConfigFile) -> Result<()> {
    if cfg.project.module_tool.trim().is_empty() {
        return Err(GogoError::ConfigError(
            "[project].module_tool must not be empty".to_string(),
        ));
    }
    if cfg.project.gogo_dir.as_os_str().is_empty() {
        return Err(GogoError::ConfigError(
            "[project].gogo_dir must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn ensure_commands(owner: &str, commands: &[CommandEntry]) -> Result<()> {
    for (idx, entry) in commands.iter().enumerate() {
        if entry.command().trim().is_empty() {
            return Err(GogoError::ConfigError(format!(
                "{owner}: command #{} is empty",
                idx + 1
            )));
        }
    }
    Ok(())
}

fn validate_gadgets(cfg: &RawConfigFile) -> Result<()> {
    for (name, gadget) in cfg.gadget.iter() {
        let Some(phase) = gadget.phase.as_deref() else {
            return Err(GogoError::ConfigError(format!(
                "gadget '{name}' has no phase"
            )));
        };
        phase.parse::<Phase>().map_err(|_| {
            GogoError::ConfigError(format!("gadget '{name}' has unknown phase '{phase}'"))
        })?;
        ensure_commands(&format!("gadget '{name}'"), &gadget.commands)?;

        if gadget.done_marker.is_none() && !gadget.sources.is_empty() {
            return Err(GogoError::ConfigError(format!(
                "gadget '{name}' lists sources but no done_marker"
            )));
        }
    }
    Ok(())
}

fn validate_unit_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, unit) in cfg.unit.iter() {
        ensure_commands(&format!("unit '{name}'"), &unit.commands)?;
        for dep in unit.after.iter() {
            if dep == name {
                return Err(GogoError::ConfigError(format!(
                    "unit '{name}' cannot depend on itself in `after`"
                )));
            }
            if !cfg.unit.contains_key(dep) {
                return Err(GogoError::ConfigError(format!(
                    "unit '{name}' has unknown dependency '{dep}' in `after`"
                )));
            }
        }
    }
    Ok(())
}

fn validate_names(cfg: &RawConfigFile) -> Result<()> {
    for name in cfg.gadget.keys().chain(cfg.unit.keys()) {
        if RESERVED_NAMES.contains(&name.as_str()) {
            return Err(GogoError::ConfigError(format!(
                "'{name}' is a built-in gadget name"
            )));
        }
    }
    if let Some(name) = cfg.gadget.keys().find(|n| cfg.unit.contains_key(*n)) {
        return Err(GogoError::ConfigError(format!(
            "'{name}' is defined both as a gadget and as a unit"
        )));
    }
    Ok(())
}

fn validate_unit_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: dep -> unit.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.unit.keys() {
        graph.add_node(name.as_str());
    }
    for (name, unit) in cfg.unit.iter() {
        for dep in unit.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(GogoError::ConfigError(format!(
            "dependency cycle between units involving '{}'",
            cycle.node_id()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::{GadgetConfig, UnitConfig};
    use std::path::PathBuf;

    fn gadget(phase: Option<&str>, commands: &[&str]) -> GadgetConfig {
        GadgetConfig {
            phase: phase.map(str::to_string),
            commands: commands.iter().map(|c| CommandEntry::Plain(c.to_string())).collect(),
            ..GadgetConfig::default()
        }
    }

    fn unit(after: &[&str]) -> UnitConfig {
        UnitConfig {
            dir: PathBuf::from("vkits/x"),
            after: after.iter().map(|s| s.to_string()).collect(),
            sources: None,
            exclude_dirs: Vec::new(),
            commands: vec![CommandEntry::Plain("vlogan".to_string())],
            queue: None,
            resources: Vec::new(),
            modules: Vec::new(),
            log: None,
        }
    }

    fn expect_config_error(raw: RawConfigFile, needle: &str) {
        match ConfigFile::try_from(raw) {
            Err(GogoError::ConfigError(msg)) => {
                assert!(msg.contains(needle), "message {msg:?} lacks {needle:?}")
            }
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn accepts_a_small_project() {
        let mut raw = RawConfigFile::default();
        raw.gadget.insert("simv".into(), gadget(Some("simulate"), &["./simv"]));
        raw.unit.insert("uvm".into(), unit(&[]));
        raw.unit.insert("cn".into(), unit(&["uvm"]));
        assert!(ConfigFile::try_from(raw).is_ok());
    }

    #[test]
    fn missing_and_unknown_phases_are_rejected() {
        let mut raw = RawConfigFile::default();
        raw.gadget.insert("simv".into(), gadget(None, &["./simv"]));
        expect_config_error(raw, "has no phase");

        let mut raw = RawConfigFile::default();
        raw.gadget.insert("simv".into(), gadget(Some("genip"), &["./simv"]));
        expect_config_error(raw, "unknown phase 'genip'");
    }

    #[test]
    fn empty_command_is_rejected() {
        let mut raw = RawConfigFile::default();
        raw.gadget.insert("simv".into(), gadget(Some("simulate"), &["./simv", "  "]));
        expect_config_error(raw, "command #2 is empty");
    }

    #[test]
    fn unit_dependency_errors() {
        let mut raw = RawConfigFile::default();
        raw.unit.insert("cn".into(), unit(&["nope"]));
        expect_config_error(raw, "unknown dependency 'nope'");

        let mut raw = RawConfigFile::default();
        raw.unit.insert("cn".into(), unit(&["cn"]));
        expect_config_error(raw, "cannot depend on itself");

        let mut raw = RawConfigFile::default();
        raw.unit.insert("a".into(), unit(&["c"]));
        raw.unit.insert("b".into(), unit(&["a"]));
        raw.unit.insert("c".into(), unit(&["b"]));
        expect_config_error(raw, "dependency cycle");
    }

    #[test]
    fn name_collisions_are_rejected() {
        let mut raw = RawConfigFile::default();
        raw.gadget.insert("cn".into(), gadget(Some("vlog"), &["vcs"]));
        raw.unit.insert("cn".into(), unit(&[]));
        expect_config_error(raw, "both as a gadget and as a unit");

        let mut raw = RawConfigFile::default();
        raw.gadget.insert("flush".into(), gadget(Some("vlog"), &["vcs"]));
        expect_config_error(raw, "built-in gadget name");
    }
}
