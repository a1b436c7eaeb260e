// src/config/validate.rs

use globset::Glob;

use crate::config::model::{RawSiteConfig, SiteConfig};
use crate::errors::{Result, SitedagError};

impl TryFrom<RawSiteConfig> for SiteConfig {
    type Error = SitedagError;

    fn try_from(raw: RawSiteConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(SiteConfig::new_unchecked(raw.paths, raw.pages, raw.task))
    }
}

fn validate_raw_config(cfg: &RawSiteConfig) -> Result<()> {
    validate_paths(cfg)?;
    validate_pages(cfg)?;
    validate_command_tasks(cfg)?;
    Ok(())
}

fn validate_paths(cfg: &RawSiteConfig) -> Result<()> {
    let paths = &cfg.paths;

    for (key, pattern) in [
        ("content", &paths.content),
        ("scripts", &paths.scripts),
        ("styles", &paths.styles),
        ("graphics", &paths.graphics),
    ] {
        if pattern.trim().is_empty() {
            return Err(SitedagError::ConfigError(format!(
                "[paths].{key} must not be empty"
            )));
        }
        if let Err(e) = Glob::new(pattern) {
            return Err(SitedagError::ConfigError(format!(
                "[paths].{key} is not a valid glob ({pattern}): {e}"
            )));
        }
    }

    for (key, dir) in [
        ("template", &paths.template),
        ("build", &paths.build),
        ("dist", &paths.dist),
    ] {
        if dir.trim().is_empty() {
            return Err(SitedagError::ConfigError(format!(
                "[paths].{key} must not be empty"
            )));
        }
    }

    Ok(())
}

fn validate_pages(cfg: &RawSiteConfig) -> Result<()> {
    let ext = &cfg.pages.extension;
    if ext.is_empty() || ext.starts_with('.') || ext.contains('/') {
        return Err(SitedagError::ConfigError(format!(
            "[pages].extension must be a bare extension like \"html\" (got {ext:?})"
        )));
    }
    Ok(())
}

fn validate_command_tasks(cfg: &RawSiteConfig) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if task.cmd.trim().is_empty() {
            return Err(SitedagError::ConfigError(format!(
                "task '{name}' has an empty `cmd`"
            )));
        }
    }
    Ok(())
}
