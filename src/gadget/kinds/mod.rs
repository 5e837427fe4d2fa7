// src/gadget/kinds/mod.rs

//! Concrete gadgets.
//!
//! - [`command`]: `[gadget.<name>]` sections.
//! - [`unit`]: compile units and the `build` gadget that expands them.
//! - [`clean`] and [`flush`]: housekeeping at both ends of a run.
//! - [`report`]: `latest` and `tree` diagnostics.

pub mod clean;
pub mod command;
pub mod flush;
pub mod report;
pub mod unit;

pub use clean::CleanGadget;
pub use command::CommandGadget;
pub use flush::FlushGadget;
pub use report::{LatestGadget, TreeGadget};
pub use unit::{UnitGadget, UnitSet, UnitsGadget};
