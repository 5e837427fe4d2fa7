// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::Phase;

#[derive(Error, Debug)]
pub enum GogoError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unknown phase: {0}")]
    UnknownPhase(String),

    #[error("Gadget not found: {0}")]
    GadgetNotFound(String),

    /// Two or more entities depend on each other.
    #[error("Dependency cycle between {}", .members.join(" and "))]
    DependencyCycle { members: Vec<String> },

    /// A declared source file does not exist. This is a broken dependency
    /// declaration, not a reason to rebuild.
    #[error("Cannot find source file {}", .0.display())]
    MissingSource(PathBuf),

    #[error("Gadget {gadget}: file(s) are missing: {files:?}")]
    MissingFiles { gadget: String, files: Vec<PathBuf> },

    #[error("Gadget {name} failed with exit status {code}{}", .detail.as_deref().map(|d| format!(". {d}")).unwrap_or_default())]
    GadgetFailed {
        name: String,
        code: i32,
        detail: Option<String>,
    },

    /// A done marker could not be written or removed.
    #[error("Unable to update done marker {}: {source}", .path.display())]
    MarkerIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Gadget {gadget} cannot join phase {phase}: it was already swept (now in {current})")]
    PhaseClosed {
        gadget: String,
        phase: Phase,
        current: Phase,
    },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GogoError {
    /// Whether this error came from a job's exit status.
    pub fn is_gadget_failure(&self) -> bool {
        matches!(self, GogoError::GadgetFailed { .. })
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, GogoError>;
