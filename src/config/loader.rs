// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::model::{RawSiteConfig, SiteConfig};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw
/// `RawSiteConfig`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawSiteConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawSiteConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<SiteConfig> {
    let raw_config = load_from_path(&path)?;
    let config = SiteConfig::try_from(raw_config)?;
    Ok(config)
}

/// Load the config at `path`, falling back to the built-in layout when the
/// file does not exist and the path was not given explicitly.
pub fn load_or_default(path: impl AsRef<Path>, explicit: bool) -> Result<SiteConfig> {
    let path = path.as_ref();
    if !explicit && !path.exists() {
        info!(path = %path.display(), "no config file found; using default layout");
        return Ok(SiteConfig::default());
    }
    load_and_validate(path)
}

/// Default config path: `Sitedag.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Sitedag.toml")
}
