// src/config/mod.rs

//! Configuration loading and validation for sitedag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate basic invariants like glob syntax (`validate.rs`).
//!
//! Task-graph correctness (unknown dependencies, cycles) is not checked here;
//! the orchestrator checks it before every run.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{CommandTaskConfig, PagesSection, PathsSection, RawSiteConfig, SiteConfig};
