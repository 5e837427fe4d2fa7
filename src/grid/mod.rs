// src/grid/mod.rs

//! Grid submission boundary.
//!
//! The scheduler hands prepared jobs to a [`GridBackend`] and learns about
//! their exit status through [`JobCompletion`] messages on an mpsc channel
//! created by the caller.
//!
//! - [`backend`] provides the `GridBackend` trait and `ProcessGrid`, the
//!   production implementation.
//! - [`submit`] turns a job into the argv of the configured submit tool.
//! - [`runner`] runs one job process and reports its completion.

pub mod backend;
pub mod runner;
pub mod submit;

use std::path::PathBuf;

pub use backend::{GridBackend, ProcessGrid};
pub use submit::SubmitPolicy;

/// Result of a job process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    Failed(i32), // exit code
}

impl JobOutcome {
    pub fn from_code(code: i32) -> Self {
        if code == 0 {
            JobOutcome::Success
        } else {
            JobOutcome::Failed(code)
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            JobOutcome::Success => 0,
            JobOutcome::Failed(code) => *code,
        }
    }
}

/// A job as the grid sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridJob {
    /// Gadget name; unique within a run.
    pub name: String,
    pub cmd: String,
    pub cwd: Option<PathBuf>,
    pub queue: Option<String>,
    pub resources: Vec<String>,
    pub interactive: bool,
    /// Where stdout and stderr go. Logged at debug level when absent.
    pub log: Option<PathBuf>,
}

impl GridJob {
    pub fn new(name: impl Into<String>, cmd: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cmd: cmd.into(),
            cwd: None,
            queue: None,
            resources: Vec::new(),
            interactive: false,
            log: None,
        }
    }
}

/// Sent by a backend once a submitted job has finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobCompletion {
    pub job: String,
    pub outcome: JobOutcome,
}
