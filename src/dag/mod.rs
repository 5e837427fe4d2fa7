// src/dag/mod.rs

//! Dependency graphs between named entities (compile units).
//!
//! - [`graph`] holds adjacency information and cycle extraction.
//! - [`levelize`] assigns each entity a level above all of its dependencies.

pub mod graph;
pub mod levelize;

pub use graph::DependencyGraph;
pub use levelize::{Levels, format_levels, group_by_level, levelize, sort_by_level};
