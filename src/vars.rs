// src/vars.rs

//! Run variables: `[vars]` from the config, overridden by `NAME=value`
//! arguments on the command line, and `${NAME}` expansion in templates.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::errors::{GogoError, Result};

static OVERRIDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)=(.*)$").expect("valid regex"));

static REFERENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));

/// Whether a command-line argument is a variable assignment.
pub fn is_override(arg: &str) -> bool {
    OVERRIDE_RE.is_match(arg)
}

/// Split `NAME=value` into its parts.
pub fn parse_override(arg: &str) -> Result<(String, String)> {
    let caps = OVERRIDE_RE.captures(arg).ok_or_else(|| {
        GogoError::ConfigError(format!(
            "invalid variable assignment '{arg}' (expected NAME=value)"
        ))
    })?;
    Ok((caps[1].to_string(), caps[2].to_string()))
}

#[derive(Debug, Clone, Default)]
pub struct Vars {
    values: BTreeMap<String, String>,
    /// Assignments given on the command line, in order.
    overrides: Vec<(String, String)>,
}

impl Vars {
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self {
            values,
            overrides: Vec::new(),
        }
    }

    /// Apply command-line assignments on top of the configured values.
    pub fn with_overrides<'a>(mut self, args: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        for arg in args {
            let (name, value) = parse_override(arg)?;
            self.values.insert(name.clone(), value.clone());
            self.overrides.push((name, value));
        }
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn overrides(&self) -> &[(String, String)] {
        &self.overrides
    }

    /// Expand `${NAME}` references.
    pub fn expand(&self, template: &str) -> Result<String> {
        self.expand_with(template, &BTreeMap::new())
    }

    /// Expand `${NAME}` references, looking in `extra` before the run
    /// variables. An unknown name is a configuration error.
    pub fn expand_with(&self, template: &str, extra: &BTreeMap<String, String>) -> Result<String> {
        let mut missing = None;
        let expanded = REFERENCE_RE.replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            match extra.get(name).or_else(|| self.values.get(name)) {
                Some(v) => v.clone(),
                None => {
                    missing.get_or_insert_with(|| name.to_string());
                    String::new()
                }
            }
        });

        match missing {
            Some(name) => Err(GogoError::ConfigError(format!(
                "missing required variable '{name}' in '{template}'"
            ))),
            None => Ok(expanded.into_owned()),
        }
    }
}
