// src/config/mod.rs

//! Plan and settings handling for jobdag.
//!
//! Responsibilities:
//! - Define the JSON plan and TOML settings data model (`model.rs`).
//! - Convert raw plan entries into typed jobs (`validate.rs`).
//! - Parse the inline `--actions` mini-language (`actions.rs`).
//! - Load files from disk and resolve settings precedence (`loader.rs`).

pub mod actions;
pub mod loader;
pub mod model;
pub mod validate;

pub use actions::parse_actions;
pub use loader::{RunSettings, load_plan, load_settings, resolve_settings};
pub use model::{Plan, RawJob, RawPlanFile, RawTask, SchedulerSection, SettingsFile};
