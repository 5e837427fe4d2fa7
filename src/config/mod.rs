// src/config/mod.rs

//! Configuration loading and validation for gogo.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate phases, unit dependencies and names (`validate.rs`).
//! - Resolve project paths against the config location (`settings.rs`).

pub mod loader;
pub mod model;
pub mod settings;
pub mod validate;

pub use loader::{config_root_dir, default_config_path, load_and_validate, load_from_path};
pub use model::{
    CommandEntry, ConfigFile, GadgetConfig, GridKind, ProjectSection, RawConfigFile, UnitConfig,
};
pub use settings::ProjectSettings;
pub use validate::RESERVED_NAMES;
