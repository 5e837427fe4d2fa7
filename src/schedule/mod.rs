// src/schedule/mod.rs

//! Phased scheduling.
//!
//! - [`context`] owns the gadget registry, per-phase work queues and the
//!   shared run state gadgets see.
//! - [`batch`] tracks which jobs of a batch may launch.
//! - [`scheduler`] sweeps the phases and talks to the grid.

pub mod batch;
pub mod context;
pub mod scheduler;

pub use batch::BatchState;
pub use context::{GadgetId, SchedulerContext};
pub use scheduler::{RunReport, Scheduler};
