// src/grid/submit.rs

use crate::config::{GridKind, ProjectSettings};
use crate::grid::GridJob;

/// Program and arguments that launch a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitCommand {
    pub program: String,
    pub args: Vec<String>,
}

/// How jobs reach the grid.
///
/// - `Local`: `sh -c <cmd>` on this machine.
/// - `Sge`: `qrsh -now no -cwd -V [-q queue] [resources] <cmd>`, which blocks
///   until the remote job exits and returns its status.
/// - `Lsf`: `bsub -K [-q queue] [resources] <cmd>` (`-Is` for interactive
///   jobs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitPolicy {
    kind: GridKind,
    tool: Option<String>,
}

impl SubmitPolicy {
    pub fn new(kind: GridKind, tool: Option<String>) -> Self {
        Self { kind, tool }
    }

    pub fn local() -> Self {
        Self::new(GridKind::Local, None)
    }

    pub fn from_settings(settings: &ProjectSettings) -> Self {
        Self::new(settings.grid, settings.submit_tool.clone())
    }

    pub fn kind(&self) -> GridKind {
        self.kind
    }

    fn tool_or(&self, default: &str) -> String {
        self.tool.clone().unwrap_or_else(|| default.to_string())
    }

    pub fn command_for(&self, job: &GridJob) -> SubmitCommand {
        match self.kind {
            GridKind::Local => SubmitCommand {
                program: "sh".to_string(),
                args: vec!["-c".to_string(), job.cmd.clone()],
            },
            GridKind::Sge => {
                let mut args: Vec<String> = ["-now", "no", "-cwd", "-V"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect();
                push_queue(&mut args, job);
                args.extend(job.resources.iter().cloned());
                args.push(job.cmd.clone());
                SubmitCommand {
                    program: self.tool_or("qrsh"),
                    args,
                }
            }
            GridKind::Lsf => {
                let wait_flag = if job.interactive { "-Is" } else { "-K" };
                let mut args = vec![wait_flag.to_string()];
                push_queue(&mut args, job);
                args.extend(job.resources.iter().cloned());
                args.push(job.cmd.clone());
                SubmitCommand {
                    program: self.tool_or("bsub"),
                    args,
                }
            }
        }
    }
}

fn push_queue(args: &mut Vec<String>, job: &GridJob) {
    if let Some(queue) = &job.queue {
        args.push("-q".to_string());
        args.push(queue.clone());
    }
}
